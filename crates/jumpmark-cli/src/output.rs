//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use jumpmark_core::{find_partner_in, pairing::kind_of, Link, LinkKind, Page, StoreStats};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// A link with its pairing state, as printed in JSON output
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkView<'a> {
    #[serde(flatten)]
    link: &'a Link,
    kind: LinkKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    partner_id: Option<&'a str>,
}

impl<'a> LinkView<'a> {
    fn new(link: &'a Link, all: &'a [Link]) -> Self {
        let partner_id = find_partner_in(link, all).map(|p| p.id.as_str());
        Self {
            link,
            kind: if partner_id.is_some() {
                LinkKind::Bidirectional
            } else {
                LinkKind::Single
            },
            partner_id,
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single link and its partner
    pub fn print_link(&self, link: &Link, partner: Option<&Link>) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", link.id);
                println!("Title:       {} {}", link.display_icon(), link.title);
                println!("URL:         {}", link.url);
                println!("On page:     {}", link.source_url);
                println!("Created:     {}", link.created.format("%Y-%m-%d %H:%M"));
                match partner {
                    Some(partner) => {
                        println!("Type:        {}", LinkKind::Bidirectional);
                        println!();
                        println!("── Partner ──");
                        println!("ID:          {}", partner.id);
                        println!("Title:       {} {}", partner.display_icon(), partner.title);
                        println!("On page:     {}", partner.source_url);
                    }
                    None => println!("Type:        {}", LinkKind::Single),
                }
            }
            OutputFormat::Json => {
                print_json(&serde_json::json!({
                    "link": link,
                    "partner": partner,
                }));
            }
            OutputFormat::Quiet => {
                println!("{}", link.id);
            }
        }
    }

    /// Print a page of links, labelling pairs against `all`
    pub fn print_page(&self, page: &Page<Link>, all: &[Link]) {
        match self.format {
            OutputFormat::Human => {
                if page.items.is_empty() {
                    println!("No links found.");
                    return;
                }
                for link in &page.items {
                    let marker = match kind_of(link, all) {
                        LinkKind::Bidirectional => "⇄",
                        LinkKind::Single => "→",
                    };
                    println!(
                        "{} | {} {} | {} {}",
                        link.id,
                        link.display_icon(),
                        truncate(&link.title, 35),
                        marker,
                        truncate(&link.url, 45)
                    );
                }
                if page.total_pages > 1 {
                    println!(
                        "\n{} link(s), page {}/{}",
                        page.total_items, page.page, page.total_pages
                    );
                } else {
                    println!("\n{} link(s)", page.total_items);
                }
            }
            OutputFormat::Json => {
                let items: Vec<_> = page.items.iter().map(|l| LinkView::new(l, all)).collect();
                print_json(&serde_json::json!({
                    "items": items,
                    "page": page.page,
                    "perPage": page.per_page,
                    "totalItems": page.total_items,
                    "totalPages": page.total_pages,
                }));
            }
            OutputFormat::Quiet => {
                for link in &page.items {
                    println!("{}", link.id);
                }
            }
        }
    }

    /// Print the number of links on a page
    pub fn print_count(&self, page_url: &str, count: usize) {
        match self.format {
            OutputFormat::Human => {
                if count == 0 {
                    println!("No links on {}", page_url);
                } else {
                    println!("{} link(s) on {}", count, page_url);
                }
            }
            OutputFormat::Json => {
                print_json(&serde_json::json!({"page": page_url, "count": count}));
            }
            OutputFormat::Quiet => println!("{}", count),
        }
    }

    /// Print store statistics
    pub fn print_stats(&self, stats: &StoreStats, quota: usize) {
        match self.format {
            OutputFormat::Human => {
                println!("Contents:");
                println!("  Links:  {}", stats.total_count);
                println!("  Pages:  {}", stats.url_key_count);
                println!("  Paired: {}", stats.paired_count);
                println!();
                println!("Storage:");
                println!(
                    "  Used:   {} of {} bytes ({:.1}%)",
                    stats.storage_human(),
                    quota,
                    stats.usage_ratio(quota) * 100.0
                );
            }
            OutputFormat::Json => {
                print_json(&serde_json::json!({
                    "stats": stats,
                    "quota_bytes": quota,
                    "usage_ratio": stats.usage_ratio(quota),
                }));
            }
            OutputFormat::Quiet => println!("{}", stats.total_count),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr
    pub fn warn(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to format JSON output: {}", e),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        // Counts characters, not bytes
        assert_eq!(truncate("← ← ← ← ← ←", 5), "← ...");
    }

    #[test]
    fn test_link_view_json() {
        let all = vec![
            Link::new("B", "https://b.com", None, "a.com"),
            Link::new("← A", "https://a.com", None, "b.com"),
        ];
        let value = serde_json::to_value(LinkView::new(&all[0], &all)).unwrap();

        assert_eq!(value["kind"], "Bidirectional");
        assert_eq!(value["partnerId"], all[1].id.as_str());
        assert_eq!(value["sourceUrl"], "a.com");
    }
}
