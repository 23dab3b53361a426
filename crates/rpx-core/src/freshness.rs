//! # HIT/MISS Classification
//!
//! A request is a HIT only when all three hold:
//!
//! 1. the metadata index has a descriptor for the key,
//! 2. its fingerprint equals the probe's fingerprint field for field, and
//! 3. the blob is present in the blob store.
//!
//! Anything else is a MISS. The reason is kept so the gateway can log and
//! count the degraded paths (an unreachable index in particular) instead of
//! folding them into "not cached".

use crate::descriptor::Fingerprint;

/// Outcome of a metadata index read, as seen by the classifier.
#[derive(Debug, Clone, Copy)]
pub enum IndexLookup<'a> {
    /// A descriptor exists for the key.
    Found(&'a Fingerprint),
    /// No descriptor exists for the key.
    Absent,
    /// The index could not be read.
    Unavailable,
}

/// Why a request was classified as a MISS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    NotIndexed,
    IndexUnavailable,
    Changed,
    BlobMissing,
}

impl MissReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotIndexed => "not_indexed",
            Self::IndexUnavailable => "index_unavailable",
            Self::Changed => "changed",
            Self::BlobMissing => "blob_missing",
        }
    }
}

/// Freshness classification of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Hit,
    Miss(MissReason),
}

impl Freshness {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit)
    }

    /// Value for the `X-Cache` response header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss(_) => "MISS",
        }
    }
}

/// Classify a request from its index lookup, probe result, and blob presence.
pub fn classify(lookup: IndexLookup<'_>, probe: &Fingerprint, blob_present: bool) -> Freshness {
    let stored = match lookup {
        IndexLookup::Unavailable => return Freshness::Miss(MissReason::IndexUnavailable),
        IndexLookup::Absent => return Freshness::Miss(MissReason::NotIndexed),
        IndexLookup::Found(stored) => stored,
    };
    if stored != probe {
        return Freshness::Miss(MissReason::Changed);
    }
    if !blob_present {
        return Freshness::Miss(MissReason::BlobMissing);
    }
    Freshness::Hit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(etag: &str) -> Fingerprint {
        Fingerprint::new("Mon", 100, etag)
    }

    #[test]
    fn identical_fingerprint_with_blob_is_hit() {
        let stored = fp("abc");
        assert_eq!(
            classify(IndexLookup::Found(&stored), &fp("abc"), true),
            Freshness::Hit
        );
    }

    #[test]
    fn absent_descriptor_is_miss_even_with_blob() {
        assert_eq!(
            classify(IndexLookup::Absent, &fp("abc"), true),
            Freshness::Miss(MissReason::NotIndexed)
        );
    }

    #[test]
    fn unavailable_index_is_miss() {
        assert_eq!(
            classify(IndexLookup::Unavailable, &fp("abc"), true),
            Freshness::Miss(MissReason::IndexUnavailable)
        );
    }

    #[test]
    fn changed_etag_is_miss() {
        let stored = fp("abc");
        assert_eq!(
            classify(IndexLookup::Found(&stored), &fp("xyz"), true),
            Freshness::Miss(MissReason::Changed)
        );
    }

    #[test]
    fn changed_size_or_date_is_miss() {
        let stored = fp("abc");
        let bigger = fp("abc").with_file_size(101);
        let later = Fingerprint::new("Tue", 100, "abc");
        assert!(!classify(IndexLookup::Found(&stored), &bigger, true).is_hit());
        assert!(!classify(IndexLookup::Found(&stored), &later, true).is_hit());
    }

    #[test]
    fn missing_blob_is_miss() {
        let stored = fp("abc");
        assert_eq!(
            classify(IndexLookup::Found(&stored), &fp("abc"), false),
            Freshness::Miss(MissReason::BlobMissing)
        );
    }

    #[test]
    fn weak_probe_matches_stored_strong_tag() {
        let stored = fp("\"abc\"");
        let probe = fp("W/\"abc\"");
        assert!(classify(IndexLookup::Found(&stored), &probe, true).is_hit());
    }

    #[test]
    fn header_values() {
        assert_eq!(Freshness::Hit.as_str(), "HIT");
        assert_eq!(Freshness::Miss(MissReason::Changed).as_str(), "MISS");
        assert_eq!(MissReason::IndexUnavailable.as_str(), "index_unavailable");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Without a stored descriptor the result is never a HIT.
            #[test]
            fn no_descriptor_never_hits(
                lm in "[A-Za-z0-9 ,:]{0,30}",
                size in any::<u64>(),
                etag in "[a-z0-9\"]{0,12}",
                blob in any::<bool>(),
            ) {
                let probe = Fingerprint::new(lm, size, &etag);
                prop_assert!(!classify(IndexLookup::Absent, &probe, blob).is_hit());
                prop_assert!(!classify(IndexLookup::Unavailable, &probe, blob).is_hit());
            }

            /// A stored copy of the probe hits exactly when the blob is present.
            #[test]
            fn self_match_hits_iff_blob(
                lm in "[A-Za-z0-9 ,:]{0,30}",
                size in any::<u64>(),
                blob in any::<bool>(),
            ) {
                let probe = Fingerprint::new(lm, size, "\"t\"");
                let stored = probe.clone();
                prop_assert_eq!(classify(IndexLookup::Found(&stored), &probe, blob).is_hit(), blob);
            }
        }
    }
}
