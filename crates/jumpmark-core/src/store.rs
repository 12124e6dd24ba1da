//! Link store
//!
//! [`LinkStore`] owns the link data model on top of a [`KeyValueBackend`].
//! The whole store lives under one top-level key as a map from normalized
//! page identity to the links created on that page.
//!
//! ## Transactions
//!
//! Every operation reads the whole store once, computes the new value in
//! memory and writes the whole store back once. There is no locking and no
//! version check: when two writers both read before either writes, the
//! second write wins and the first is lost. Callers that need to observe
//! changes made elsewhere register with [`LinkStore::on_change`] and re-read.
//!
//! ## Usage
//!
//! ```ignore
//! let store = LinkStore::new(FileBackend::from_config(&config));
//!
//! let link = store
//!     .create(NewLink::new("Docs", "https://docs.rs", "https://example.com").with_reciprocal(None))
//!     .await?;
//!
//! let partner = store.find_partner(&link).await;
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::events::HandlerId;
use crate::export::{ImportPayload, ImportRecord};
use crate::id::new_id;
use crate::index::LinkIndex;
use crate::models::{
    icon_or_default, ImportOptions, ImportSummary, Link, LinkPatch, NewLink, StoreStats,
    BACK_REFERENCE_PREFIX,
};
use crate::normalize::{is_internal_page, normalize_url, validate_url};
use crate::pairing::{find_partner_in, is_pair};
use crate::storage::{KeyValueBackend, StorageChange, StorageError, JUMPMARKS_KEY};

/// Link storage over a key-value backend
pub struct LinkStore<B> {
    backend: Arc<B>,
}

impl<B> Clone for LinkStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: KeyValueBackend> LinkStore<B> {
    /// Create a store over `backend`
    pub fn new(backend: B) -> Self {
        Self::with_shared(Arc::new(backend))
    }

    /// Create a store over a backend shared with other stores
    pub fn with_shared(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Get the backing store
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    // ==================== Transactions ====================

    /// Read the whole store
    pub async fn load(&self) -> Result<LinkIndex> {
        match self.backend.read(JUMPMARKS_KEY).await? {
            None | Some(Value::Null) => Ok(LinkIndex::new()),
            Some(value) => Ok(serde_json::from_value(value).map_err(StorageError::from)?),
        }
    }

    /// Replace the whole store
    pub async fn save(&self, index: &LinkIndex) -> Result<()> {
        let value = serde_json::to_value(index).map_err(StorageError::from)?;
        self.backend.write(JUMPMARKS_KEY, value).await?;
        Ok(())
    }

    // ==================== Queries ====================

    /// Links stored under a normalized page identity
    pub async fn get_for_key(&self, key: &str) -> Result<Vec<Link>> {
        Ok(self.load().await?.get(key).to_vec())
    }

    /// Links created on the page at `page_url`
    pub async fn get_for_page(&self, page_url: &str) -> Result<Vec<Link>> {
        self.get_for_key(&normalize_url(page_url)).await
    }

    /// Number of links on a page, zero for the browser's internal pages
    pub async fn count_for_page(&self, page_url: &str) -> Result<usize> {
        if is_internal_page(page_url) {
            return Ok(0);
        }
        Ok(self.load().await?.get(&normalize_url(page_url)).len())
    }

    /// Every link, page by page in the order pages were first used
    pub async fn get_all(&self) -> Result<Vec<Link>> {
        Ok(self.load().await?.to_vec())
    }

    /// Get a link by ID
    pub async fn get(&self, id: &str) -> Result<Option<Link>> {
        Ok(self.load().await?.find(id).cloned())
    }

    /// Find the link that pairs with `link`
    ///
    /// Returns the first match in [`get_all`](Self::get_all) order. A failed
    /// read is logged and treated as "no partner".
    pub async fn find_partner(&self, link: &Link) -> Option<Link> {
        match self.load().await {
            Ok(index) => find_partner_in(link, index.iter()).cloned(),
            Err(e) => {
                warn!("Partner lookup for {} failed: {}", link.id, e);
                None
            }
        }
    }

    /// Counts and approximate size of the store
    pub async fn stats(&self) -> Result<StoreStats> {
        let index = self.load().await?;
        let paired_count = index
            .iter()
            .filter(|link| find_partner_in(link, index.iter()).is_some())
            .count();

        Ok(StoreStats {
            total_count: index.len(),
            url_key_count: index.key_count(),
            paired_count,
            approx_storage_bytes: index.serialized_len(),
        })
    }

    // ==================== Mutations ====================

    /// Create a link on a page, optionally with a reciprocal link back
    ///
    /// The link is stored under the normalized identity of
    /// `input.source_url`. A reciprocal link is stored under the normalized
    /// destination and points at the full source URL. Returns the primary
    /// link.
    pub async fn create(&self, input: NewLink) -> Result<Link> {
        let title = required(&input.title, "title")?;
        let url = required(&input.url, "url")?;
        if !validate_url(url) {
            return Err(Error::InvalidInput(format!("not a valid URL: {}", url)));
        }
        let source_url = required(&input.source_url, "source page")?;

        let mut index = self.load().await?;

        let source_key = normalize_url(source_url);
        let link = Link::new(title, url, input.icon.as_deref(), source_key.clone());
        index.push(link.clone());

        if input.create_reciprocal {
            let reciprocal = Link::new(
                input.reciprocal_label(&source_key),
                source_url,
                input.icon.as_deref(),
                normalize_url(url),
            );
            debug!(
                "Adding reciprocal link {} under {}",
                reciprocal.id, reciprocal.source_url
            );
            index.push(reciprocal);
        }

        self.save(&index).await?;
        debug!("Created link {} under {}", link.id, link.source_url);
        Ok(link)
    }

    /// Change the title, URL or icon of a link
    ///
    /// The link stays under the page it was created on even when its URL
    /// changes. Returns the updated link.
    pub async fn update(&self, id: &str, patch: LinkPatch) -> Result<Link> {
        check_patch(&patch)?;

        let mut index = self.load().await?;
        let link = index
            .find_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        apply_patch(link, patch);
        let updated = link.clone();

        self.save(&index).await?;
        debug!("Updated link {}", id);
        Ok(updated)
    }

    /// Update a link and bring its link back in line, in one write
    ///
    /// The partner the link had before the edit is removed unless it still
    /// pairs afterwards. With `keep_reciprocal`, a missing partner is then
    /// rebuilt under the new destination: it keeps the old partner's title
    /// and URL when there was one, and otherwise points back at the link's
    /// page. Returns the updated link and its partner.
    pub async fn update_with_partner(
        &self,
        id: &str,
        patch: LinkPatch,
        keep_reciprocal: bool,
    ) -> Result<(Link, Option<Link>)> {
        check_patch(&patch)?;

        let mut index = self.load().await?;
        let before = index
            .find(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let old_partner = find_partner_in(&before, index.iter()).cloned();

        let mut updated = before;
        apply_patch(&mut updated, patch);
        if let Some(link) = index.find_mut(id) {
            *link = updated.clone();
        }

        let partner = match old_partner {
            Some(partner) if keep_reciprocal && is_pair(&updated, &partner) => Some(partner),
            old_partner => {
                if let Some(ref stale) = old_partner {
                    debug!("Removing stale link back {} under {}", stale.id, stale.source_url);
                    index.remove(&stale.id);
                }
                if keep_reciprocal {
                    let reciprocal = rebuild_reciprocal(&updated, old_partner.as_ref())?;
                    debug!(
                        "Adding link back {} under {}",
                        reciprocal.id, reciprocal.source_url
                    );
                    index.push(reciprocal.clone());
                    Some(reciprocal)
                } else {
                    None
                }
            }
        };

        self.save(&index).await?;
        debug!("Updated link {} with partner {:?}", id, partner.as_ref().map(|p| &p.id));
        Ok((updated, partner))
    }

    /// Delete one link
    pub async fn delete_one(&self, id: &str) -> Result<()> {
        let mut index = self.load().await?;
        index
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        self.save(&index).await?;
        debug!("Deleted link {}", id);
        Ok(())
    }

    /// Delete every listed link that exists, returning how many were removed
    ///
    /// Unknown IDs are skipped. Nothing is written when nothing matched.
    pub async fn delete_many<S: AsRef<str>>(&self, ids: &[S]) -> Result<usize> {
        let mut index = self.load().await?;
        let removed = ids
            .iter()
            .filter(|id| index.remove(id.as_ref()).is_some())
            .count();

        if removed > 0 {
            self.save(&index).await?;
        }
        info!("Deleted {} of {} requested links", removed, ids.len());
        Ok(removed)
    }

    /// Delete both sides of a pair in one write
    ///
    /// Each side is removed if it exists, independently of the other.
    pub async fn delete_pair(&self, id_a: &str, id_b: &str) -> Result<usize> {
        self.delete_many(&[id_a, id_b]).await
    }

    /// Delete a link together with its partner, if it has one
    pub async fn delete_with_partner(&self, id: &str) -> Result<usize> {
        let mut index = self.load().await?;
        let link = index
            .find(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let partner_id = find_partner_in(&link, index.iter()).map(|p| p.id.clone());

        let mut removed = usize::from(index.remove(id).is_some());
        if let Some(ref partner_id) = partner_id {
            removed += usize::from(index.remove(partner_id).is_some());
        }

        self.save(&index).await?;
        debug!("Deleted link {} with partner {:?}", id, partner_id);
        Ok(removed)
    }

    // ==================== Import ====================

    /// Import raw link records
    ///
    /// Every imported link gets a new ID. Records that are not objects, lack
    /// an ID, title, URL, creation time or source page, or carry an invalid URL
    /// are skipped. With `merge` and `skip_duplicates`, a record is also
    /// skipped when a link from the same source page to the same destination
    /// already exists, including one imported earlier in the same batch.
    /// Without `merge`, the imported links replace the whole store.
    pub async fn import_merge(
        &self,
        records: &[Value],
        options: ImportOptions,
    ) -> Result<ImportSummary> {
        let mut index = if options.merge {
            self.load().await?
        } else {
            LinkIndex::new()
        };

        let mut summary = ImportSummary::default();
        for (position, raw) in records.iter().enumerate() {
            let record = match ImportRecord::from_value(raw) {
                Ok(record) => record,
                Err(reason) => {
                    warn!("Skipping import record {}: {}", position, reason);
                    summary.skipped += 1;
                    continue;
                }
            };

            let source_key = normalize_url(&record.source_url);
            if options.merge
                && options.skip_duplicates
                && index.contains_route(&normalize_url(&record.url), &source_key)
            {
                debug!("Skipping duplicate {} -> {}", source_key, record.url);
                summary.skipped += 1;
                continue;
            }

            index.push(Link {
                id: new_id(),
                title: record.title,
                url: record.url,
                icon: icon_or_default(record.icon.as_deref()),
                created: record.created,
                source_url: source_key,
            });
            summary.imported += 1;
        }

        self.save(&index).await?;
        info!(
            "Imported {} links, skipped {} (merge={})",
            summary.imported, summary.skipped, options.merge
        );
        Ok(summary)
    }

    /// Import an exported JSON document
    ///
    /// Fails with `Validation` without touching the store when the text is
    /// not a JSON object with a `jumpmarks` array.
    pub async fn import_json(&self, text: &str, options: ImportOptions) -> Result<ImportSummary> {
        let payload = ImportPayload::parse(text)?;
        self.import_merge(&payload.jumpmarks, options).await
    }

    // ==================== Change notification ====================

    /// Register a listener called after every write to the store
    pub fn on_change<F>(&self, listener: F) -> HandlerId
    where
        F: Fn(&StorageChange) + Send + Sync + 'static,
    {
        self.backend.on_change(JUMPMARKS_KEY, Arc::new(listener))
    }

    /// Remove a listener registered with [`on_change`](Self::on_change)
    pub fn remove_listener(&self, id: HandlerId) -> bool {
        self.backend.remove_listener(JUMPMARKS_KEY, id)
    }
}

/// Reject a patch that would leave a link without a title or a valid URL
fn check_patch(patch: &LinkPatch) -> Result<()> {
    if let Some(ref title) = patch.title {
        required(title, "title")?;
    }
    if let Some(ref url) = patch.url {
        if !validate_url(required(url, "url")?) {
            return Err(Error::InvalidInput(format!("not a valid URL: {}", url)));
        }
    }
    Ok(())
}

fn apply_patch(link: &mut Link, patch: LinkPatch) {
    if let Some(title) = patch.title {
        link.title = title.trim().to_string();
    }
    if let Some(url) = patch.url {
        link.url = url.trim().to_string();
    }
    if let Some(icon) = patch.icon {
        link.icon = icon_or_default(Some(&icon));
    }
}

/// New link back from the destination of `link` to the page it is on
fn rebuild_reciprocal(link: &Link, old: Option<&Link>) -> Result<Link> {
    let (title, url) = match old {
        Some(old) => (old.title.clone(), old.url.clone()),
        None => (
            format!("{}{}", BACK_REFERENCE_PREFIX, link.source_url),
            format!("https://{}", link.source_url),
        ),
    };
    // Only the page identity is stored, so it must survive the round trip
    if normalize_url(&url) != link.source_url {
        return Err(Error::InvalidInput(format!(
            "cannot link back to {}",
            link.source_url
        )));
    }

    Ok(Link::new(
        title,
        url,
        Some(&link.icon),
        normalize_url(&link.url),
    ))
}

/// Trim a required field, rejecting empty values
fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed)
}
