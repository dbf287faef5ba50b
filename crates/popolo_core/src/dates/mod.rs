//! Partial dates and the validity windows built on them.
//!
//! # Responsibility
//! - Parse incomplete dates (year, month, day, date-time) into comparable values.
//! - Measure overlap between partial-date windows.
//! - Gate creation of dated records whose windows would cross.
//!
//! # Invariants
//! - Everything in this module is pure: no I/O, no shared state.

pub mod interval;
pub mod partial_date;
pub mod validity;
