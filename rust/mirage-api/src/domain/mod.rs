//! Core domain models.
//!
//! This module contains the machine records, snapshots and shell transcript.

pub mod machine;
pub mod transcript;

pub use machine::*;
pub use transcript::*;
