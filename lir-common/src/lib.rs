//! Little IR - Common Types and Utilities
//!
//! This crate contains shared types, error definitions, and utilities
//! used across all components of the Little IR toolkit.

pub mod error;
pub mod source_loc;

pub use error::IrError;
pub use source_loc::{LocationTracker, TextLocation};

/// Temporary value identifier for IR
pub type TempId = u32;
