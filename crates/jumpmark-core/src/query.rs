//! Search, filter, sort and pagination over link lists
//!
//! These helpers work on the flattened output of
//! [`LinkStore::get_all`](crate::store::LinkStore::get_all). Pairing is always
//! judged against the full list passed in, so filtering by kind stays correct
//! when a search narrows the result.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::Serialize;

use crate::config::DEFAULT_PER_PAGE;
use crate::models::Link;
use crate::normalize::normalize_url;
use crate::pairing::{kind_of, LinkKind};

/// Which links to keep by pairing state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KindFilter {
    #[default]
    All,
    Bidirectional,
    Single,
}

impl KindFilter {
    fn matches(&self, kind: LinkKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Bidirectional => kind == LinkKind::Bidirectional,
            KindFilter::Single => kind == LinkKind::Single,
        }
    }
}

impl FromStr for KindFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(KindFilter::All),
            "bidirectional" | "paired" => Ok(KindFilter::Bidirectional),
            "single" => Ok(KindFilter::Single),
            other => Err(format!(
                "unknown kind '{}' (expected all, bidirectional or single)",
                other
            )),
        }
    }
}

/// Ordering of query results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Newest first
    #[default]
    Created,
    Title,
    Url,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" | "date" => Ok(SortKey::Created),
            "title" => Ok(SortKey::Title),
            "url" => Ok(SortKey::Url),
            other => Err(format!(
                "unknown sort '{}' (expected created, title or url)",
                other
            )),
        }
    }
}

/// A search over the link list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkQuery {
    /// Only links created on this page (any URL form of it)
    pub page: Option<String>,
    /// Case-insensitive text matched against title, URL and source page
    pub search: Option<String>,
    pub kind: KindFilter,
    pub sort: SortKey,
}

impl LinkQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page_url: impl Into<String>) -> Self {
        self.page = Some(page_url.into());
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn kind(mut self, kind: KindFilter) -> Self {
        self.kind = kind;
        self
    }

    pub fn sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    /// Filter and sort `all`, returning the matching links
    pub fn apply(&self, all: &[Link]) -> Vec<Link> {
        let needle = self
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let page_key = self.page.as_deref().map(normalize_url);

        let mut matched: Vec<Link> = all
            .iter()
            .filter(|link| match page_key {
                Some(ref key) => link.source_url == *key,
                None => true,
            })
            .filter(|link| match needle {
                Some(ref needle) => matches_text(link, needle),
                None => true,
            })
            .filter(|link| self.kind.matches(kind_of(link, all)))
            .cloned()
            .collect();

        matched.sort_by(|a, b| compare(self.sort, a, b));
        matched
    }
}

fn matches_text(link: &Link, needle: &str) -> bool {
    link.title.to_lowercase().contains(needle)
        || link.url.to_lowercase().contains(needle)
        || link.source_url.to_lowercase().contains(needle)
}

fn compare(sort: SortKey, a: &Link, b: &Link) -> Ordering {
    match sort {
        SortKey::Created => b.created.cmp(&a.created),
        SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortKey::Url => a.url.to_lowercase().cmp(&b.url.to_lowercase()),
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually returned
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

/// Slice out one page of `items`
///
/// Pages are 1-based. A page number past either end is clamped to the
/// nearest page, and a page size of zero means the default size. An empty
/// list has one empty page.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let per_page = if per_page == 0 {
        DEFAULT_PER_PAGE
    } else {
        per_page
    };
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);

    let items = items
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    Page {
        items,
        page,
        per_page,
        total_items,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn link(title: &str, url: &str, source_key: &str, age_days: i64) -> Link {
        let mut link = Link::new(title, url, None, source_key);
        link.created = Utc::now() - Duration::days(age_days);
        link
    }

    fn sample() -> Vec<Link> {
        vec![
            link("Rust Book", "https://doc.rust-lang.org/book", "notes.com", 3),
            link("← Notes", "https://notes.com", "doc.rust-lang.org/book", 2),
            link("crates", "https://crates.io", "notes.com", 1),
        ]
    }

    fn titles(links: &[Link]) -> Vec<&str> {
        links.iter().map(|l| l.title.as_str()).collect()
    }

    #[test]
    fn test_default_query_sorts_newest_first() {
        let result = LinkQuery::new().apply(&sample());
        assert_eq!(titles(&result), vec!["crates", "← Notes", "Rust Book"]);
    }

    #[test]
    fn test_search_is_case_insensitive_over_fields() {
        let all = sample();

        let by_title = LinkQuery::new().search("RUST book").apply(&all);
        assert_eq!(titles(&by_title), vec!["Rust Book"]);

        let by_url = LinkQuery::new().search("crates.IO").apply(&all);
        assert_eq!(titles(&by_url), vec!["crates"]);

        let by_source = LinkQuery::new().search("notes.com").apply(&all);
        assert_eq!(by_source.len(), 3);

        let blank = LinkQuery::new().search("   ").apply(&all);
        assert_eq!(blank.len(), 3);
    }

    #[test]
    fn test_kind_filter_uses_full_list() {
        let all = sample();

        let paired = LinkQuery::new().kind(KindFilter::Bidirectional).apply(&all);
        assert_eq!(paired.len(), 2);

        // The partner is filtered out by the search but still counts
        let narrowed = LinkQuery::new()
            .search("rust book")
            .kind(KindFilter::Bidirectional)
            .apply(&all);
        assert_eq!(titles(&narrowed), vec!["Rust Book"]);

        let single = LinkQuery::new().kind(KindFilter::Single).apply(&all);
        assert_eq!(titles(&single), vec!["crates"]);
    }

    #[test]
    fn test_page_filter_normalizes() {
        let all = sample();

        let on_notes = LinkQuery::new().page("https://www.notes.com/").apply(&all);
        assert_eq!(titles(&on_notes), vec!["crates", "Rust Book"]);

        // Pairing still sees the partner on the other page
        let paired = LinkQuery::new()
            .page("http://notes.com")
            .kind(KindFilter::Bidirectional)
            .apply(&all);
        assert_eq!(titles(&paired), vec!["Rust Book"]);
    }

    #[test]
    fn test_sort_by_title_and_url() {
        let all = sample();

        let by_title = LinkQuery::new().sort(SortKey::Title).apply(&all);
        assert_eq!(titles(&by_title), vec!["crates", "Rust Book", "← Notes"]);

        let by_url = LinkQuery::new().sort(SortKey::Url).apply(&all);
        assert_eq!(titles(&by_url), vec!["crates", "Rust Book", "← Notes"]);
    }

    #[test]
    fn test_parse_filters() {
        assert_eq!("Bidirectional".parse::<KindFilter>(), Ok(KindFilter::Bidirectional));
        assert_eq!("single".parse::<KindFilter>(), Ok(KindFilter::Single));
        assert!("both".parse::<KindFilter>().is_err());
        assert_eq!("TITLE".parse::<SortKey>(), Ok(SortKey::Title));
        assert!("size".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (1..=45).collect();

        let first = paginate(items.clone(), 1, 20);
        assert_eq!(first.items.len(), 20);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_next());
        assert!(!first.has_prev());

        let last = paginate(items.clone(), 3, 20);
        assert_eq!(last.items, (41..=45).collect::<Vec<_>>());
        assert!(!last.has_next());

        let past_end = paginate(items.clone(), 99, 20);
        assert_eq!(past_end.page, 3);

        let zero = paginate(items, 0, 0);
        assert_eq!(zero.page, 1);
        assert_eq!(zero.per_page, DEFAULT_PER_PAGE);
    }

    #[test]
    fn test_paginate_empty() {
        let page = paginate(Vec::<u32>::new(), 2, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_items, 0);
    }
}
