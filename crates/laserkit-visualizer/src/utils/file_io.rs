//! Program file reading
//!
//! Loads a G-code program produced by the external compiler and gathers
//! quick statistics before it is previewed or streamed.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::gcode::{CommandKind, GcodeDecoder};

/// Programs above this size are logged before being read into memory (64 MB)
const LARGE_FILE_BYTES: u64 = 64 * 1024 * 1024;

/// Supported file encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileEncoding {
    /// UTF-8 encoding
    Utf8,
    /// ASCII encoding (7-bit)
    Ascii,
}

impl FileEncoding {
    /// Detect encoding from file bytes
    pub fn detect(data: &[u8]) -> Self {
        if data.is_ascii() {
            FileEncoding::Ascii
        } else {
            FileEncoding::Utf8
        }
    }
}

/// Summary of a decoded program
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramStatistics {
    /// Lines in the file, including blanks and comments
    pub total_lines: usize,
    /// Lines that decoded to a command
    pub commands: usize,
    /// Number of G0 moves
    pub rapid_moves: usize,
    /// Number of G1 moves
    pub linear_moves: usize,
    /// Blank or comment-only lines
    pub skipped_lines: usize,
    /// Lines dropped for malformed words
    pub rejected_lines: usize,
    /// Whether the program ends with M2
    pub has_program_end: bool,
}

impl ProgramStatistics {
    /// Total motion commands
    pub fn total_motion_commands(&self) -> usize {
        self.rapid_moves + self.linear_moves
    }
}

/// G-code program file reader
#[derive(Debug, Clone)]
pub struct GcodeFileReader {
    path: PathBuf,
    file_size: u64,
}

impl GcodeFileReader {
    /// Open a program file for reading
    ///
    /// # Errors
    /// Returns error if the path does not exist or is not a regular file
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(anyhow!("File does not exist: {}", path.display()));
        }

        if !path.is_file() {
            return Err(anyhow!("Path is not a file: {}", path.display()));
        }

        let file_size = fs::metadata(&path)?.len();

        Ok(Self { path, file_size })
    }

    /// Get file size in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Get file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole program
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not valid UTF-8
    pub fn read_all(&self) -> Result<String> {
        if self.file_size > LARGE_FILE_BYTES {
            tracing::warn!(
                "Reading very large program ({}MB) into memory",
                self.file_size / (1024 * 1024)
            );
        }

        let bytes = fs::read(&self.path).map_err(|e| anyhow!("Failed to read file: {}", e))?;
        tracing::debug!(
            "Read {} bytes from {} ({:?})",
            bytes.len(),
            self.path.display(),
            FileEncoding::detect(&bytes)
        );
        String::from_utf8(bytes)
            .map_err(|e| anyhow!("{} is not valid UTF-8: {}", self.path.display(), e))
    }

    /// Decode the program with a fresh decoder and summarise it
    pub fn statistics(&self) -> Result<ProgramStatistics> {
        Ok(program_statistics(&self.read_all()?))
    }
}

/// Summarise a program held in memory
pub fn program_statistics(program: &str) -> ProgramStatistics {
    let decoded = GcodeDecoder::new().decode_program(program);

    let mut stats = ProgramStatistics {
        total_lines: program.lines().count(),
        commands: decoded.commands.len(),
        skipped_lines: decoded.skipped,
        rejected_lines: decoded.rejected,
        ..Default::default()
    };

    for command in &decoded.commands {
        match command.kind() {
            CommandKind::RapidMove => stats.rapid_moves += 1,
            CommandKind::LinearMove => stats.linear_moves += 1,
            CommandKind::ProgramEnd => stats.has_program_end = true,
            _ => {}
        }
    }

    stats
}
