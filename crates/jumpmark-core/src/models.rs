//! Data models for Jumpmark
//!
//! Defines the stored [`Link`] record and the inputs and summaries passed
//! to and from [`LinkStore`](crate::store::LinkStore) operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::new_id;

/// Icon used when a link has none
pub const DEFAULT_ICON: &str = "🔗";

/// Prefix of the generated title for reciprocal links
pub const BACK_REFERENCE_PREFIX: &str = "← ";

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

/// A jump link attached to a page
///
/// Older stored data carried a `bidirectional` flag; it is not part of the
/// model and is dropped when such a record is read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Unique identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Destination URL
    pub url: String,
    /// Short display glyph
    #[serde(default = "default_icon")]
    pub icon: String,
    /// When this link was created
    pub created: DateTime<Utc>,
    /// Normalized identity of the page this link lives on
    #[serde(default)]
    pub source_url: String,
}

impl Link {
    /// Create a link stored under `source_key` with a fresh ID and timestamp
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        icon: Option<&str>,
        source_key: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            url: url.into(),
            icon: icon_or_default(icon),
            created: Utc::now(),
            source_url: source_key.into(),
        }
    }

    /// Icon to display, falling back to the default for empty icons
    pub fn display_icon(&self) -> &str {
        if self.icon.is_empty() {
            DEFAULT_ICON
        } else {
            &self.icon
        }
    }
}

/// Resolve an optional icon to the stored value
pub(crate) fn icon_or_default(icon: Option<&str>) -> String {
    match icon.map(str::trim) {
        Some(icon) if !icon.is_empty() => icon.to_string(),
        _ => default_icon(),
    }
}

/// Input for creating a link on a page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewLink {
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    /// Full URL of the page the link is created on
    pub source_url: String,
    /// Title of that page, used to label the reciprocal link
    pub source_title: Option<String>,
    /// Also create a link from the destination back to the source page
    pub create_reciprocal: bool,
    pub reciprocal_title: Option<String>,
}

impl NewLink {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            source_url: source_url.into(),
            ..Default::default()
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_source_title(mut self, title: impl Into<String>) -> Self {
        self.source_title = Some(title.into());
        self
    }

    /// Request a reciprocal link, optionally with an explicit title
    pub fn with_reciprocal(mut self, title: Option<String>) -> Self {
        self.create_reciprocal = true;
        self.reciprocal_title = title;
        self
    }

    /// Title for the reciprocal link
    ///
    /// An explicit reciprocal title wins, then a back reference to the
    /// source page's title, then a back reference to its identity.
    pub(crate) fn reciprocal_label(&self, source_key: &str) -> String {
        if let Some(title) = self.reciprocal_title.as_deref().map(str::trim) {
            if !title.is_empty() {
                return title.to_string();
            }
        }

        let page = self
            .source_title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(source_key);
        format!("{}{}", BACK_REFERENCE_PREFIX, page)
    }
}

/// Fields to change on an existing link
///
/// `None` leaves the field as is. The ID, creation time and source page of a
/// link never change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
}

impl LinkPatch {
    /// Check whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.url.is_none() && self.icon.is_none()
    }
}

/// How an import combines with existing links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Keep existing links; when false the store is replaced
    pub merge: bool,
    /// In merge mode, skip links whose destination and source pages already
    /// have a link
    pub skip_duplicates: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            merge: true,
            skip_duplicates: true,
        }
    }
}

/// Outcome of an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Store-wide counts and size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_count: usize,
    pub url_key_count: usize,
    /// Links that currently have a partner
    pub paired_count: usize,
    /// Serialized size of the whole store
    pub approx_storage_bytes: usize,
}

impl StoreStats {
    /// Fraction of `quota` in use
    pub fn usage_ratio(&self, quota: usize) -> f64 {
        if quota == 0 {
            return 1.0;
        }
        self.approx_storage_bytes as f64 / quota as f64
    }

    pub fn is_near_quota(&self, quota: usize, threshold: f64) -> bool {
        self.usage_ratio(quota) >= threshold
    }

    /// Human-readable storage size (e.g. "1.2 KB")
    pub fn storage_human(&self) -> String {
        let bytes = self.approx_storage_bytes as f64;
        if bytes < 1024.0 {
            format!("{} B", self.approx_storage_bytes)
        } else {
            format!("{:.2} KB", bytes / 1024.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_new() {
        let link = Link::new("Docs", "https://docs.rs", None, "example.com");
        assert_eq!(link.title, "Docs");
        assert_eq!(link.url, "https://docs.rs");
        assert_eq!(link.icon, DEFAULT_ICON);
        assert_eq!(link.source_url, "example.com");
        assert!(!link.id.is_empty());
    }

    #[test]
    fn test_link_blank_icon_uses_default() {
        let link = Link::new("Docs", "https://docs.rs", Some("  "), "example.com");
        assert_eq!(link.icon, DEFAULT_ICON);

        let link = Link::new("Docs", "https://docs.rs", Some("📚"), "example.com");
        assert_eq!(link.icon, "📚");
    }

    #[test]
    fn test_link_serialization_is_camel_case() {
        let link = Link::new("Docs", "https://docs.rs", None, "example.com");
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["sourceUrl"], "example.com");
        assert!(json.get("source_url").is_none());

        let back: Link = serde_json::from_value(json).unwrap();
        assert_eq!(back, link);
    }

    #[test]
    fn test_legacy_record_is_accepted() {
        let json = r#"{
            "id": "jm-1700000000000-abc",
            "title": "Old",
            "url": "https://b.com",
            "bidirectional": true,
            "created": "2024-01-02T03:04:05.678Z"
        }"#;

        let link: Link = serde_json::from_str(json).unwrap();
        assert_eq!(link.icon, DEFAULT_ICON);
        assert_eq!(link.source_url, "");

        let written = serde_json::to_string(&link).unwrap();
        assert!(!written.contains("bidirectional"));
    }

    #[test]
    fn test_reciprocal_label() {
        let input = NewLink::new("T", "https://b.com", "https://a.com");
        assert_eq!(input.reciprocal_label("a.com"), "← a.com");

        let input = input.with_source_title("Page A");
        assert_eq!(input.reciprocal_label("a.com"), "← Page A");

        let input = input.with_reciprocal(Some("Back to A".to_string()));
        assert_eq!(input.reciprocal_label("a.com"), "Back to A");
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(LinkPatch::default().is_empty());
        let patch = LinkPatch {
            icon: Some("⭐".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_stats_quota() {
        let stats = StoreStats {
            approx_storage_bytes: 95_000,
            ..Default::default()
        };
        assert!(stats.is_near_quota(102_400, 0.9));
        assert!(!stats.is_near_quota(204_800, 0.9));
        assert_eq!(stats.storage_human(), "92.77 KB");
    }
}
