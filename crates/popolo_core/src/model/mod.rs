//! Popolo entity model.
//!
//! # Responsibility
//! - Define persons, organizations, posts, memberships, ownerships,
//!   personal relationships, areas and events.
//! - Keep every validation rule an explicit `validate()` call.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID.
//! - Dated entities implement `Dateframeable` and reject inverted windows.
//! - "Person or organization" references are sum types (`Member`, `Owner`).

pub mod area;
pub mod event;
pub mod membership;
pub mod organization;
pub mod person;
pub mod relation;
pub mod validation;
