//! G-Code decoding
//!
//! This module provides:
//! - Decoded command types
//! - A per-line decoder with sticky modal state (G0/G1, F, S, M3/M5)

pub mod command;
pub mod parser;

pub use command::*;
pub use parser::*;
