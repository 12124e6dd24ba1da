//! Command handlers

use anyhow::{bail, Result};

use jumpmark_core::{FileBackend, Link, LinkStore};

pub mod config;
pub mod link;
pub mod status;
pub mod transfer;
pub mod watch;

/// The store every command works on
pub type Store = LinkStore<FileBackend>;

/// Resolve a link ID given in full or as a unique prefix
pub async fn resolve_id(store: &Store, id: &str) -> Result<String> {
    let links = store.get_all().await?;
    match_id(&links, id)
}

fn match_id(links: &[Link], id: &str) -> Result<String> {
    if links.iter().any(|l| l.id == id) {
        return Ok(id.to_string());
    }

    let matches: Vec<_> = links.iter().filter(|l| l.id.starts_with(id)).collect();

    match matches.len() {
        0 => bail!("No link found matching: {}", id),
        1 => Ok(matches[0].id.clone()),
        _ => {
            eprintln!("Multiple links match '{}':", id);
            for link in &matches {
                eprintln!("  {} - {}", link.id, link.title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}
