//! Utility functions and helpers

pub mod file_io;

pub use file_io::{program_statistics, FileEncoding, GcodeFileReader, ProgramStatistics};
