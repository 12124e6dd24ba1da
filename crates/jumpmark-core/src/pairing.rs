//! Bidirectional pairing
//!
//! Two links A and B are a pair when A points at B's page and B points at
//! A's page:
//!
//! ```text
//! normalize(A.url) == B.source_url && normalize(B.url) == A.source_url
//! ```
//!
//! Pairing is derived from the current set of links every time it is
//! needed. Nothing about it is stored on the link itself.

use serde::{Deserialize, Serialize};

use crate::models::Link;
use crate::normalize::normalize_url;

/// Whether a link currently has a partner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkKind {
    Bidirectional,
    Single,
}

impl LinkKind {
    pub fn label(&self) -> &'static str {
        match self {
            LinkKind::Bidirectional => "Bidirectional",
            LinkKind::Single => "Single",
        }
    }
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Check whether two links point at each other's pages
pub fn is_pair(a: &Link, b: &Link) -> bool {
    a.id != b.id
        && normalize_url(&a.url) == b.source_url
        && normalize_url(&b.url) == a.source_url
}

/// Find the partner of `link` among `candidates`
///
/// When several candidates qualify, the first one in iteration order wins.
pub fn find_partner_in<'a, I>(link: &Link, candidates: I) -> Option<&'a Link>
where
    I: IntoIterator<Item = &'a Link>,
{
    let target = normalize_url(&link.url);
    candidates.into_iter().find(|other| {
        other.id != link.id
            && other.source_url == target
            && normalize_url(&other.url) == link.source_url
    })
}

/// Classify `link` against the full set of links
pub fn kind_of<'a, I>(link: &Link, all: I) -> LinkKind
where
    I: IntoIterator<Item = &'a Link>,
{
    if find_partner_in(link, all).is_some() {
        LinkKind::Bidirectional
    } else {
        LinkKind::Single
    }
}
