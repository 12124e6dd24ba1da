//! In-memory form of the persisted store
//!
//! [`LinkIndex`] maps a normalized page identity to the links created on that
//! page. Keys keep the order in which they were first created and links keep
//! insertion order; both survive a serialization round trip.
//!
//! Invariants maintained here:
//! - every link under a key has `source_url` equal to that key
//! - no key maps to an empty list

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::Link;

/// Ordered mapping from page identity to its links
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkIndex {
    entries: Vec<(String, Vec<Link>)>,
}

impl LinkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from links, keyed by each link's `source_url`
    pub fn from_links(links: impl IntoIterator<Item = Link>) -> Self {
        let mut index = Self::new();
        for link in links {
            index.push(link);
        }
        index
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of page identities with at least one link
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// Total number of links
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, links)| links.len()).sum()
    }

    /// Links stored under `key`
    pub fn get(&self, key: &str) -> &[Link] {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, links)| links.as_slice())
            .unwrap_or(&[])
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// All links, key by key in key order
    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.entries.iter().flat_map(|(_, links)| links.iter())
    }

    pub fn to_vec(&self) -> Vec<Link> {
        self.iter().cloned().collect()
    }

    pub fn find(&self, id: &str) -> Option<&Link> {
        self.iter().find(|link| link.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Link> {
        self.entries
            .iter_mut()
            .flat_map(|(_, links)| links.iter_mut())
            .find(|link| link.id == id)
    }

    /// Append a link under its `source_url`, creating the key if needed
    pub fn push(&mut self, link: Link) {
        match self.entries.iter_mut().find(|(k, _)| *k == link.source_url) {
            Some((_, links)) => links.push(link),
            None => self.entries.push((link.source_url.clone(), vec![link])),
        }
    }

    /// Remove the link with `id`, dropping its key if it becomes empty
    pub fn remove(&mut self, id: &str) -> Option<Link> {
        let (entry_pos, link_pos) = self.entries.iter().enumerate().find_map(|(i, (_, links))| {
            links.iter().position(|link| link.id == id).map(|j| (i, j))
        })?;

        let links = &mut self.entries[entry_pos].1;
        let removed = links.remove(link_pos);
        if links.is_empty() {
            self.entries.remove(entry_pos);
        }
        Some(removed)
    }

    /// Check whether some link under `source_key` already points at `target_key`
    pub fn contains_route(&self, target_key: &str, source_key: &str) -> bool {
        self.get(source_key)
            .iter()
            .any(|link| crate::normalize::normalize_url(&link.url) == target_key)
    }

    /// Size of the serialized index in bytes
    pub fn serialized_len(&self) -> usize {
        serde_json::to_vec(self).map(|bytes| bytes.len()).unwrap_or(0)
    }
}

impl Serialize for LinkIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, links)| (k, links)))
    }
}

impl<'de> Deserialize<'de> for LinkIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(LinkIndexVisitor)
    }
}

struct LinkIndexVisitor;

impl<'de> Visitor<'de> for LinkIndexVisitor {
    type Value = LinkIndex;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of page identities to link lists")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut index = LinkIndex::new();
        while let Some((key, links)) = map.next_entry::<String, Vec<Link>>()? {
            // The key is authoritative; older records don't carry sourceUrl
            for mut link in links {
                link.source_url = key.clone();
                index.push(link);
            }
        }
        Ok(index)
    }
}
