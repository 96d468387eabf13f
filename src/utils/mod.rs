//! Generic utility primitives with zero domain knowledge.
//!
//! - `archive` - Zip extraction
//! - `io` - File system operations with consistent error handling

pub mod archive;
pub mod io;
