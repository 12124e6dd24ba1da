//! Link command handlers

use anyhow::{bail, Context, Result};

use jumpmark_core::{
    find_partner_in, paginate, validate_url, KindFilter, LinkPatch, LinkQuery, NewLink, SortKey,
};

use crate::commands::{resolve_id, Store};
use crate::metadata::fetch_title;
use crate::output::Output;
use crate::prompt::{confirm, prompt_with_default};

/// Arguments of `add`
pub struct AddOptions {
    pub url: String,
    /// Page the link is created on
    pub from: String,
    pub title: Option<String>,
    pub icon: Option<String>,
    pub reciprocal: bool,
    pub reciprocal_title: Option<String>,
    pub source_title: Option<String>,
}

/// Create a new link
pub async fn add(store: &Store, opts: AddOptions, output: &Output) -> Result<()> {
    if !validate_url(opts.url.trim()) {
        bail!("Not a valid URL: {}", opts.url);
    }

    // Fall back to the destination's title, then the URL itself
    let title = match opts.title {
        Some(title) => title,
        None => fetch_title(&opts.url)
            .await
            .unwrap_or_else(|| opts.url.clone()),
    };

    let mut input = NewLink::new(title, &opts.url, &opts.from);
    if let Some(icon) = opts.icon {
        input = input.with_icon(icon);
    }
    if opts.reciprocal {
        let source_title = match opts.source_title {
            Some(title) => Some(title),
            None if opts.reciprocal_title.is_none() => fetch_title(&opts.from).await,
            None => None,
        };
        if let Some(source_title) = source_title {
            input = input.with_source_title(source_title);
        }
        input = input.with_reciprocal(opts.reciprocal_title);
    }

    let link = store.create(input).await.context("Failed to create link")?;
    let partner = if opts.reciprocal {
        store.find_partner(&link).await
    } else {
        None
    };

    output.success(&format!("Created link: {}", link.id));
    output.print_link(&link, partner.as_ref());

    Ok(())
}

/// Arguments of `list`
pub struct ListOptions {
    pub page: Option<String>,
    pub search: Option<String>,
    pub kind: KindFilter,
    pub sort: SortKey,
    pub page_num: usize,
    pub per_page: usize,
}

/// List links, filtered, sorted and paginated
pub async fn list(store: &Store, opts: ListOptions, output: &Output) -> Result<()> {
    let all = store.get_all().await?;

    let query = LinkQuery {
        page: opts.page,
        search: opts.search,
        kind: opts.kind,
        sort: opts.sort,
    };
    let page = paginate(query.apply(&all), opts.page_num, opts.per_page);

    output.print_page(&page, &all);
    Ok(())
}

/// Show a single link and its partner
pub async fn show(store: &Store, id: String, output: &Output) -> Result<()> {
    let id = resolve_id(store, &id).await?;

    let link = store
        .get(&id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Link not found: {}", id))?;
    let partner = store.find_partner(&link).await;

    output.print_link(&link, partner.as_ref());
    Ok(())
}

/// Edit a link
///
/// Without any field flags, prompts for each field in turn. `pairing` keeps
/// (`Some(true)`) or drops (`Some(false)`) the link back from the destination
/// in the same write; `None` edits the link alone.
pub async fn edit(
    store: &Store,
    id: String,
    patch: LinkPatch,
    pairing: Option<bool>,
    output: &Output,
) -> Result<()> {
    let id = resolve_id(store, &id).await?;

    let patch = if patch.is_empty() && pairing.is_none() && output.should_prompt() {
        let link = store
            .get(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Link not found: {}", id))?;

        println!("Editing link: {}", link.id);
        println!("Press Enter to keep current value, or type new value.\n");

        LinkPatch {
            title: prompt_with_default("Title", &link.title)?,
            url: prompt_with_default("URL", &link.url)?,
            icon: prompt_with_default("Icon", &link.icon)?,
        }
    } else {
        patch
    };

    if patch.is_empty() && pairing.is_none() {
        output.message("Nothing to change.");
        return Ok(());
    }

    let (link, partner) = match pairing {
        Some(keep) => store
            .update_with_partner(&id, patch, keep)
            .await
            .context("Failed to update link")?,
        None => {
            let link = store
                .update(&id, patch)
                .await
                .context("Failed to update link")?;
            let partner = store.find_partner(&link).await;
            (link, partner)
        }
    };

    output.success("Link updated");
    output.print_link(&link, partner.as_ref());

    Ok(())
}

/// Delete one or more links
///
/// With `pair`, each link's partner is deleted along with it.
pub async fn delete(
    store: &Store,
    ids: Vec<String>,
    pair: bool,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let all = store.get_all().await?;
    let mut targets = Vec::with_capacity(ids.len());
    for id in &ids {
        let id = super::match_id(&all, id)?;
        if !targets.contains(&id) {
            targets.push(id);
        }
    }

    // Confirm deletion
    if output.should_prompt() && !yes {
        for id in &targets {
            if let Some(link) = all.iter().find(|l| &l.id == id) {
                println!("Delete link: {} - {}", link.id, link.title);
                if pair {
                    if let Some(partner) = find_partner_in(link, &all) {
                        println!("  and partner: {} - {}", partner.id, partner.title);
                    }
                }
            }
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let removed = match targets.as_slice() {
        [id] if pair => store
            .delete_with_partner(id)
            .await
            .context("Failed to delete link")?,
        [id] => {
            store.delete_one(id).await.context("Failed to delete link")?;
            1
        }
        _ => {
            let mut doomed = targets.clone();
            if pair {
                for id in &targets {
                    let partner = all
                        .iter()
                        .find(|l| &l.id == id)
                        .and_then(|link| find_partner_in(link, &all));
                    if let Some(partner) = partner {
                        if !doomed.contains(&partner.id) {
                            doomed.push(partner.id.clone());
                        }
                    }
                }
            }
            store
                .delete_many(doomed.as_slice())
                .await
                .context("Failed to delete links")?
        }
    };

    output.success(&format!("Deleted {} link(s)", removed));

    Ok(())
}

/// Open a link's destination in the default browser
pub async fn open(store: &Store, id: String, output: &Output) -> Result<()> {
    let id = resolve_id(store, &id).await?;
    let link = store
        .get(&id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Link not found: {}", id))?;

    ::open::that(&link.url).with_context(|| format!("Failed to open {}", link.url))?;
    output.message(&format!("Opened {}", link.url));

    Ok(())
}

/// Count the links on a page
pub async fn count(store: &Store, page_url: String, output: &Output) -> Result<()> {
    let count = store.count_for_page(&page_url).await?;
    output.print_count(&page_url, count);
    Ok(())
}
