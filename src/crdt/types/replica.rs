//! Author identifier type.
//!
//! This module contains the definition of AuthorId, which names each
//! participant that mints operation ids in a shared document.

/// A unique identifier for each author (collaborator) in the distributed system.
///
/// Author ids are free-form strings (user ids, emails, device names). They are
/// the final tie-breaker of the [`OpId`](super::OpId) comparator, so two
/// collaborators must never share one within a document.
pub type AuthorId = String;
