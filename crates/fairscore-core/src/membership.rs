use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A set of category or client-account tags attached to an account or post.
///
/// Merging is always a union: adding a tag that is already present is a
/// no-op, and nothing is ever removed by an ingest or sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipSet(BTreeSet<String>);

impl MembershipSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag. Returns `true` if the set changed.
    ///
    /// Surrounding whitespace is trimmed and blank tags are ignored.
    pub fn insert(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() {
            return false;
        }
        self.0.insert(tag.to_string())
    }

    /// Union of `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &MembershipSet) -> MembershipSet {
        MembershipSet(self.0.union(&other.0).cloned().collect())
    }

    /// Fold `other` into `self`, returning `true` if anything was added.
    pub fn merge(&mut self, other: &MembershipSet) -> bool {
        let before = self.0.len();
        self.0.extend(other.0.iter().cloned());
        self.0.len() != before
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag.trim())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Parse a comma-joined tag list such as `"beauty,skincare"`.
    #[must_use]
    pub fn from_joined(joined: &str) -> Self {
        joined.split(',').collect()
    }

    /// Render as a comma-joined list in sorted order.
    #[must_use]
    pub fn to_joined(&self) -> String {
        self.0.iter().cloned().collect::<Vec<_>>().join(",")
    }

    /// Sorted tags, suitable for binding to a `TEXT[]` column.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for MembershipSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = MembershipSet::new();
        for tag in iter {
            set.insert(tag.as_ref());
        }
        set
    }
}

impl From<Vec<String>> for MembershipSet {
    fn from(tags: Vec<String>) -> Self {
        tags.into_iter().collect()
    }
}
