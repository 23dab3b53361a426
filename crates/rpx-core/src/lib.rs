//! # rpx-core — Foundational Types for the Caching Gateway
//!
//! This crate is the leaf of the workspace. It defines the identifiers and
//! the freshness model that the upstream client and the gateway share, and
//! it performs no I/O of its own.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for request identifiers.** `RepositoryName` and
//!    `CachePath` have validated constructors. A `CachePath` can never name a
//!    location outside its repository tree, so storage code may join it onto a
//!    root directory without further checks.
//!
//! 2. **One normalized fingerprint.** `Fingerprint` strips the weak-validator
//!    prefix from entity tags at construction, so a probe and a stored
//!    descriptor are always compared in the same form.
//!
//! 3. **Pure classification.** `classify()` decides HIT or MISS from values
//!    already gathered by the caller. Index failures arrive as an explicit
//!    `IndexLookup::Unavailable` and classify as a named MISS reason.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `rpx-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod descriptor;
pub mod error;
pub mod freshness;
pub mod identity;

pub use descriptor::{normalize_etag, Descriptor, Fingerprint, WEAK_ETAG_PREFIX};
pub use error::ValidationError;
pub use freshness::{classify, Freshness, IndexLookup, MissReason};
pub use identity::{CachePath, RepositoryName, MAX_REPOSITORY_NAME_LEN};
