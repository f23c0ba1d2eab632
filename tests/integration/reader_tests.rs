//! Region reader integration tests.
//!
//! Tests verify:
//! - Region reads never exceed level bounds, even when the decoder returns
//!   whole tiles
//! - Only the covering region is requested from tiled levels
//! - The level inventory is scanned only when the cheap query cannot tell
//! - Dispose is idempotent and releases the handle once
//! - I/O failures propagate unchanged
//! - Embedded orientation and compression are reported from the source
//! - Real PNG and JPEG sources read through the raster codec

use std::collections::HashSet;

use pyramid_region::{
    ColorTransform, Compression, Crop, Hint, IoError, MemoryReader, OperationListBuilder, Orientation,
    RasterCodec, ReadError, Rectangle, RegionReader, Rotate, Scale,
};

use super::test_utils::{
    create_test_jpeg, create_test_jpeg_with_orientation, create_test_png, mock_pixel, FailingReader, MockPyramidCodec, Request,
};

fn source() -> MemoryReader {
    MemoryReader::new(vec![0u8; 16], "pyramid.tif")
}

// =============================================================================
// Region bounds
// =============================================================================

#[tokio::test]
async fn test_region_is_clipped_to_level_bounds() {
    let codec = MockPyramidCodec::halving(1000, 800, 3).with_tiles(256, 256);
    let mut reader = RegionReader::new(codec.clone(), source());
    let mut hints = HashSet::new();

    let image = reader
        .read_region(1, Rectangle::new(400, 300, 500, 500), &mut hints)
        .await
        .unwrap();

    // Level 1 is 500x400
    assert_eq!((image.width(), image.height()), (100, 100));
    assert_eq!(
        codec.requests(),
        vec![Request::Region {
            level: 1,
            region: Rectangle::new(400, 300, 100, 100)
        }]
    );
    assert!(hints.contains(&Hint::AlreadyCropped));
}

#[tokio::test]
async fn test_oversized_tile_result_is_cropped() {
    let codec = MockPyramidCodec::halving(1024, 1024, 1)
        .with_tiles(256, 256)
        .with_oversized_regions();
    let mut reader = RegionReader::new(codec.clone(), source());
    let mut hints = HashSet::new();

    let image = reader
        .read_region(0, Rectangle::new(10, 20, 30, 40), &mut hints)
        .await
        .unwrap();

    assert_eq!((image.width(), image.height()), (30, 40));
    assert_eq!(image.to_rgb8().get_pixel(0, 0), &mock_pixel(10, 20, 0));
    assert_eq!(image.to_rgb8().get_pixel(29, 39), &mock_pixel(39, 59, 0));
}

#[tokio::test]
async fn test_region_read_never_requests_whole_level() {
    let codec = MockPyramidCodec::halving(4096, 4096, 1).with_tiles(512, 512);
    let mut reader = RegionReader::new(codec.clone(), source());
    let mut hints = HashSet::new();

    reader
        .read_region(0, Rectangle::new(1000, 1000, 100, 100), &mut hints)
        .await
        .unwrap();

    for request in codec.requests() {
        assert!(matches!(request, Request::Region { .. }));
    }
}

#[tokio::test]
async fn test_empty_result_is_unsupported() {
    let codec = MockPyramidCodec::halving(64, 64, 1).with_empty_results();
    let mut reader = RegionReader::new(codec, source());
    let mut hints = HashSet::new();

    let result = reader
        .read_region(0, Rectangle::new(0, 0, 10, 10), &mut hints)
        .await;

    match result {
        Err(ReadError::UnsupportedFormat { format, .. }) => assert_eq!(format, "mock"),
        other => panic!("Expected UnsupportedFormat, got {:?}", other),
    }
}

#[tokio::test]
#[should_panic(expected = "out of range")]
async fn test_level_past_count_panics() {
    let codec = MockPyramidCodec::halving(64, 64, 2);
    let mut reader = RegionReader::new(codec, source());
    let mut hints = HashSet::new();
    let _ = reader.read_full(2, &mut hints).await;
}

// =============================================================================
// Level inventory
// =============================================================================

#[tokio::test]
async fn test_known_level_count_does_not_scan() {
    let codec = MockPyramidCodec::halving(256, 256, 4);
    let mut reader = RegionReader::new(codec.clone(), source());

    assert_eq!(reader.level_count().await.unwrap(), 4);
    assert_eq!(codec.scan_count(), 0);
}

#[tokio::test]
async fn test_unknown_level_count_scans_once() {
    let codec = MockPyramidCodec::halving(256, 256, 4).with_unknown_level_count();
    let mut reader = RegionReader::new(codec.clone(), source());

    assert_eq!(reader.level_count().await.unwrap(), 4);
    assert_eq!(reader.level_count().await.unwrap(), 4);
    assert_eq!(reader.level_dimensions().await.unwrap().len(), 4);
    assert_eq!(codec.scan_count(), 1);
}

#[tokio::test]
async fn test_unknown_level_count_still_selects_pyramid_level() {
    let codec = MockPyramidCodec::halving(256, 256, 4).with_unknown_level_count();
    let mut reader = RegionReader::new(codec.clone(), source());

    let mut b = OperationListBuilder::with_identifier("pyramid.tif");
    b.push(Scale::Percent(0.25));
    let read = reader.read(&b.freeze(), Orientation::Rotate0).await.unwrap();

    assert_eq!(read.level, 2);
    assert_eq!(codec.scan_count(), 1);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_dispose_releases_handle_once() {
    let codec = MockPyramidCodec::halving(64, 64, 1);
    let mut reader = RegionReader::new(codec.clone(), source());
    reader.open().await.unwrap();

    reader.dispose();
    reader.dispose();
    drop(reader);

    assert_eq!(codec.dispose_count(), 1);
}

#[tokio::test]
async fn test_drop_disposes() {
    let codec = MockPyramidCodec::halving(64, 64, 1);
    {
        let mut reader = RegionReader::new(codec.clone(), source());
        reader.full_size().await.unwrap();
    }
    assert_eq!(codec.dispose_count(), 1);
}

#[tokio::test]
async fn test_dispose_before_open() {
    let codec = MockPyramidCodec::halving(64, 64, 1);
    let mut reader = RegionReader::new(codec.clone(), source());
    reader.dispose();

    assert_eq!(codec.dispose_count(), 0);
    assert!(matches!(reader.level_count().await, Err(ReadError::Disposed)));
}

#[tokio::test]
async fn test_read_after_dispose() {
    let codec = MockPyramidCodec::halving(64, 64, 1);
    let mut reader = RegionReader::new(codec, source());
    reader.open().await.unwrap();
    reader.dispose();

    let ops = OperationListBuilder::new().freeze();
    assert!(matches!(
        reader.read(&ops, Orientation::Rotate0).await,
        Err(ReadError::Disposed)
    ));
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_io_failure_propagates_unchanged() {
    let codec = MockPyramidCodec::halving(64, 64, 1);
    let mut reader = RegionReader::new(codec, FailingReader::new(100));

    match reader.open().await {
        Err(ReadError::Io(IoError::Read(message))) => assert_eq!(message, "connection reset"),
        other => panic!("Expected Io(Read), got {:?}", other),
    }
}

#[tokio::test]
async fn test_raster_codec_io_failure() {
    let mut reader = RegionReader::new(RasterCodec::new(), FailingReader::new(100));
    assert!(matches!(
        reader.full_size().await,
        Err(ReadError::Io(IoError::Read(_)))
    ));
}

#[tokio::test]
async fn test_validation_happens_before_decode() {
    let codec = MockPyramidCodec::halving(100, 100, 2);
    let mut reader = RegionReader::new(codec.clone(), source());

    let mut b = OperationListBuilder::new();
    b.push(Crop::pixels(150, 0, 10, 10));
    let result = reader.read(&b.freeze(), Orientation::Rotate0).await;

    assert!(matches!(result, Err(ReadError::Validation(_))));
    assert!(codec.requests().is_empty());
}

// =============================================================================
// Pixel normalization
// =============================================================================

#[tokio::test]
async fn test_sixteen_bit_pixels_are_normalized() {
    let codec = MockPyramidCodec::halving(32, 32, 1).with_sixteen_bit();
    let mut reader = RegionReader::new(codec, source());

    let mut b = OperationListBuilder::new();
    b.push(Crop::pixels(4, 4, 8, 8));
    let read = reader.read(&b.freeze(), Orientation::Rotate0).await.unwrap();

    assert_eq!(read.image.color(), image::ColorType::Rgb8);
    assert!(read.hints.contains(&Hint::PixelLayoutConverted));
    assert!(read.hints.contains(&Hint::AlreadyCropped));
    assert_eq!(read.image.to_rgb8().get_pixel(0, 0), &mock_pixel(4, 4, 0));
}

// =============================================================================
// Orientation
// =============================================================================

#[tokio::test]
async fn test_rotate180_crop_maps_to_opposite_corner() {
    let codec = MockPyramidCodec::halving(100, 50, 1);
    let mut reader = RegionReader::new(codec.clone(), source());

    let mut b = OperationListBuilder::new();
    b.push(Crop::pixels(0, 0, 10, 5));
    reader.read(&b.freeze(), Orientation::Rotate180).await.unwrap();

    assert_eq!(
        codec.requests(),
        vec![Request::Region {
            level: 0,
            region: Rectangle::new(90, 45, 10, 5)
        }]
    );
}

#[tokio::test]
async fn test_rotate270_crop() {
    // Raw 100x50, displayed as 50x100
    let codec = MockPyramidCodec::halving(100, 50, 1);
    let mut reader = RegionReader::new(codec.clone(), source());

    let mut b = OperationListBuilder::new();
    b.push(Crop::pixels(0, 0, 10, 20));
    reader.read(&b.freeze(), Orientation::Rotate270).await.unwrap();

    assert_eq!(
        codec.requests(),
        vec![Request::Region {
            level: 0,
            region: Rectangle::new(80, 0, 20, 10)
        }]
    );
}

#[tokio::test]
async fn test_read_oriented_uses_embedded_orientation() {
    let codec = MockPyramidCodec::halving(100, 50, 1).with_orientation(Orientation::Rotate180);
    let mut reader = RegionReader::new(codec.clone(), source());

    assert_eq!(reader.orientation().await.unwrap(), Orientation::Rotate180);

    let mut b = OperationListBuilder::new();
    b.push(Crop::pixels(0, 0, 10, 5));
    reader.read_oriented(&b.freeze()).await.unwrap();

    assert_eq!(
        codec.requests(),
        vec![Request::Region {
            level: 0,
            region: Rectangle::new(90, 45, 10, 5)
        }]
    );
}

#[tokio::test]
async fn test_level_compression() {
    let codec = MockPyramidCodec::halving(100, 50, 2).with_compression(Compression::Lzw);
    let mut reader = RegionReader::new(codec, source());

    assert_eq!(reader.compression(0).await.unwrap(), Compression::Lzw);
    assert_eq!(reader.compression(1).await.unwrap(), Compression::Lzw);
}

#[tokio::test]
#[should_panic(expected = "out of range")]
async fn test_compression_past_count_panics() {
    let codec = MockPyramidCodec::halving(100, 50, 1);
    let mut reader = RegionReader::new(codec, source());
    let _ = reader.compression(1).await;
}

// =============================================================================
// Real sources
// =============================================================================

#[tokio::test]
async fn test_png_region_read() {
    let data = create_test_png(120, 80);
    let mut reader = RegionReader::new(RasterCodec::new(), MemoryReader::new(data, "fixture.png"));

    let mut b = OperationListBuilder::with_identifier("fixture.png");
    b.push(Crop::pixels(100, 60, 50, 50))
        .push(Rotate::new(90.0))
        .push(ColorTransform::Gray);
    let read = reader.read(&b.freeze(), Orientation::Rotate0).await.unwrap();

    assert_eq!(read.level, 0);
    assert_eq!((read.image.width(), read.image.height()), (20, 20));
    assert_eq!(read.image.to_rgb8().get_pixel(0, 0), &mock_pixel(100, 60, 0));
}

#[tokio::test]
async fn test_jpeg_full_read() {
    let data = create_test_jpeg(64, 48, 90);
    let mut reader = RegionReader::new(RasterCodec::new(), MemoryReader::new(data, "fixture.jpg"))
        .with_format_hint(Some(pyramid_region::Format::Jpg));

    assert_eq!(reader.format_name().await.unwrap(), "jpg");

    let mut b = OperationListBuilder::with_identifier("fixture.jpg");
    b.push(Scale::Percent(0.5));
    let read = reader.read(&b.freeze(), Orientation::Rotate0).await.unwrap();

    assert_eq!((read.image.width(), read.image.height()), (64, 48));
    assert!(!read.hints.contains(&Hint::AlreadyCropped));
}

#[tokio::test]
async fn test_jpeg_exif_orientation_drives_read() {
    // Raw 64x48, EXIF 6 displays it as 48x64
    let data = create_test_jpeg_with_orientation(64, 48, 6);
    let mut reader = RegionReader::new(RasterCodec::new(), MemoryReader::new(data, "exif.jpg"));

    assert_eq!(reader.orientation().await.unwrap(), Orientation::Rotate90);
    assert_eq!(reader.compression(0).await.unwrap(), Compression::Jpeg);

    let mut b = OperationListBuilder::with_identifier("exif.jpg");
    b.push(Crop::pixels(0, 60, 10, 4));
    let ops = b.freeze();

    // Outside the raw 64x48 frame, inside the displayed 48x64 one
    assert!(matches!(
        reader.read(&ops, Orientation::Rotate0).await,
        Err(ReadError::Validation(_))
    ));

    let read = reader.read_oriented(&ops).await.unwrap();
    assert_eq!((read.image.width(), read.image.height()), (4, 10));
}

#[tokio::test]
async fn test_png_has_no_embedded_orientation() {
    let data = create_test_png(16, 16);
    let mut reader = RegionReader::new(RasterCodec::new(), MemoryReader::new(data, "plain.png"));

    assert_eq!(reader.orientation().await.unwrap(), Orientation::Rotate0);
    assert_eq!(reader.compression(0).await.unwrap(), Compression::Deflate);
}
