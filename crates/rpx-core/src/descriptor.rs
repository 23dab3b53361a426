//! # Freshness Descriptors
//!
//! A `Fingerprint` is the triple of upstream-supplied validators that decides
//! whether a cached copy is still current: the `Last-Modified` string, the
//! content length, and the entity tag. A `Descriptor` is a fingerprint as it
//! sits in the metadata index, stamped with the time it was written.
//!
//! `last_modified` is compared as an opaque string. Two spellings of the same
//! instant are treated as different values.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Prefix marking a weak entity tag (`W/"abc"`).
pub const WEAK_ETAG_PREFIX: &str = "W/";

/// Strip the weak-validator prefix from an entity tag, if present.
pub fn normalize_etag(raw: &str) -> &str {
    raw.strip_prefix(WEAK_ETAG_PREFIX).unwrap_or(raw)
}

/// Upstream validators for one object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Fingerprint {
    last_modified: String,
    file_size: u64,
    etag: String,
}

impl Fingerprint {
    /// Build a fingerprint, normalizing the entity tag.
    pub fn new(last_modified: impl Into<String>, file_size: u64, etag: &str) -> Self {
        Self {
            last_modified: last_modified.into(),
            file_size,
            etag: normalize_etag(etag).to_string(),
        }
    }

    pub fn last_modified(&self) -> &str {
        &self.last_modified
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn etag(&self) -> &str {
        &self.etag
    }

    /// Copy of this fingerprint with a different size.
    pub fn with_file_size(mut self, file_size: u64) -> Self {
        self.file_size = file_size;
        self
    }
}

/// A fingerprint as stored in the metadata index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    pub fingerprint: Fingerprint,
    /// When the descriptor was last written. Bookkeeping only.
    pub updated_at: DateTime<Utc>,
}

impl Descriptor {
    /// Stamp a fingerprint with the current time.
    pub fn now(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            updated_at: Utc::now(),
        }
    }
}
