//! Pure grocery algorithms.
//!
//! # Responsibility
//! - Turn quick-add text into item drafts.
//! - Order items and lists deterministically.
//! - Rank history suggestions and infer categories.
//! - Validate untrusted import payloads.
//!
//! # Invariants
//! - Nothing in this module performs I/O or reads the clock.

pub mod history;
pub mod import;
pub mod parse;
pub mod sort;
