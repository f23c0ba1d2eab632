//! Byte sources.
//!
//! Everything above this module sees a source only as a [`RangeReader`]: a
//! sized, named blob that can be read at arbitrary offsets.

mod file;
mod memory;
mod range_reader;

pub use file::FileReader;
pub use memory::MemoryReader;
pub use range_reader::RangeReader;
