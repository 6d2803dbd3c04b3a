//! Recipient filtering applied before a message is composed.
//!
//! This is best-effort filtering, not access control. Once an envelope is
//! signed it is broadcast to public relays, so the filter only decides which
//! recipients this service bothers to notify. It must never be relied on to
//! keep content away from anyone.

use std::collections::HashSet;

use crate::error::ResolveError;
use crate::identity::decode_npub;
use crate::types::CanonicalIdentity;

/// Policy hook deciding whether a recipient receives a notification.
pub trait AccessFilter: Send + Sync {
    fn allowed(&self, identity: &CanonicalIdentity) -> bool;
}

/// Default policy: every recipient is eligible.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessFilter for AllowAll {
    fn allowed(&self, _identity: &CanonicalIdentity) -> bool {
        true
    }
}

/// Only recipients in a fixed, process-configured set are eligible.
///
/// Entries and lookups are compared as lowercase hex.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    members: HashSet<String>,
}

impl AllowList {
    /// Build the set from hex or `npub` entries.
    ///
    /// Blank entries are skipped. Fails on an `npub` that does not decode.
    pub fn new<I, S>(entries: I) -> Result<Self, ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut members = HashSet::new();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            let hex = if entry.starts_with("npub1") {
                decode_npub(entry)?.as_str().to_string()
            } else {
                entry.to_ascii_lowercase()
            };
            members.insert(hex);
        }
        Ok(Self { members })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl AccessFilter for AllowList {
    fn allowed(&self, identity: &CanonicalIdentity) -> bool {
        self.members
            .contains(&identity.as_str().to_ascii_lowercase())
    }
}
