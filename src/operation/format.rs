use std::fmt;

use serde::Serialize;

// =============================================================================
// Format
// =============================================================================

/// Image formats known to the operation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Bmp,
    Gif,
    Jp2,
    Jpg,
    Pdf,
    Png,
    Tif,
    Webp,
}

impl Format {
    pub const ALL: [Format; 8] = [
        Format::Bmp,
        Format::Gif,
        Format::Jp2,
        Format::Jpg,
        Format::Pdf,
        Format::Png,
        Format::Tif,
        Format::Webp,
    ];

    /// Every filename extension that identifies this format. The first entry
    /// is the preferred one.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Format::Bmp => &["bmp", "dib"],
            Format::Gif => &["gif"],
            Format::Jp2 => &["jp2", "j2k", "jpx", "jpf"],
            Format::Jpg => &["jpg", "jpeg", "jpe", "jif", "jfif"],
            Format::Pdf => &["pdf"],
            Format::Png => &["png"],
            Format::Tif => &["tif", "tiff", "ptif", "tf8"],
            Format::Webp => &["webp"],
        }
    }

    pub fn preferred_extension(&self) -> &'static str {
        self.extensions()[0]
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            Format::Bmp => "image/bmp",
            Format::Gif => "image/gif",
            Format::Jp2 => "image/jp2",
            Format::Jpg => "image/jpeg",
            Format::Pdf => "application/pdf",
            Format::Png => "image/png",
            Format::Tif => "image/tiff",
            Format::Webp => "image/webp",
        }
    }

    /// Look up a format by filename extension, ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.extensions().contains(&ext.as_str()))
    }

    /// The `image` crate format used to decode or encode this format, if the
    /// crate handles it.
    pub fn image_format(&self) -> Option<image::ImageFormat> {
        match self {
            Format::Bmp => Some(image::ImageFormat::Bmp),
            Format::Gif => Some(image::ImageFormat::Gif),
            Format::Jpg => Some(image::ImageFormat::Jpeg),
            Format::Png => Some(image::ImageFormat::Png),
            Format::Tif => Some(image::ImageFormat::Tiff),
            Format::Webp => Some(image::ImageFormat::WebP),
            Format::Jp2 | Format::Pdf => None,
        }
    }

    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Bmp => Some(Format::Bmp),
            image::ImageFormat::Gif => Some(Format::Gif),
            image::ImageFormat::Jpeg => Some(Format::Jpg),
            image::ImageFormat::Png => Some(Format::Png),
            image::ImageFormat::Tiff => Some(Format::Tif),
            image::ImageFormat::WebP => Some(Format::Webp),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.preferred_extension())
    }
}

// =============================================================================
// Compression
// =============================================================================

/// Output compression scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compression {
    Deflate,
    Jpeg,
    Jpeg2000,
    Lzw,
    Rle,
    Uncompressed,
    Undefined,
}

impl Compression {
    pub fn name(&self) -> &'static str {
        match self {
            Compression::Deflate => "DEFLATE",
            Compression::Jpeg => "JPEG",
            Compression::Jpeg2000 => "JPEG2000",
            Compression::Lzw => "LZW",
            Compression::Rle => "RLE",
            Compression::Uncompressed => "UNCOMPRESSED",
            Compression::Undefined => "UNDEFINED",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Identifier
// =============================================================================

/// Opaque name of a source image, e.g. an object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Source format inferred from the identifier's extension.
    ///
    /// Returns `None` when there is no extension after the last path segment
    /// or the extension is not recognized.
    pub fn inferred_format(&self) -> Option<Format> {
        let name = self.0.rsplit('/').next().unwrap_or(&self.0);
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Format::from_extension(ext)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}
