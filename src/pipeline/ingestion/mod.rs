// Pipeline ingestion: reading the source file into a table

pub mod source_reader;

pub use source_reader::{read_source, read_source_async, SourceFormat};
