//! File input and output.

pub mod reader;
pub mod writer;

pub use reader::{LoadResult, LoadStatistics, SourceFile, SourceLoader};
pub use writer::{OutputWriter, WriteOptions, WriteStatistics};
