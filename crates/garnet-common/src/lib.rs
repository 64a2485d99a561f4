//! Shared types for the Garnet type checker.
//!
//! Source positions are byte ranges (`rowan::TextRange`) everywhere inside
//! the checker. This crate converts them to the 0-based line/column pairs
//! used when reporting, and defines the error type produced when a syntax
//! tree dump cannot be read.

pub mod error;
pub mod span;

pub use rowan::{TextRange, TextSize};
