//! Watch command handler

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use jumpmark_core::{paginate, LinkQuery};

use crate::commands::Store;
use crate::output::Output;

/// Print links and print them again whenever the store changes
///
/// Runs until interrupted. Changes made by other processes are picked up
/// through the store's file watcher.
pub async fn watch(
    store: &Store,
    page: Option<String>,
    per_page: usize,
    output: &Output,
) -> Result<()> {
    store
        .backend()
        .watch()
        .context("Failed to watch the store")?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = store.on_change(move |_| {
        let _ = tx.send(());
    });

    output.message("Watching for changes, press Ctrl-C to stop.");
    print_links(store, page.as_deref(), per_page, output).await?;

    loop {
        tokio::select! {
            Some(()) = rx.recv() => {
                // One reprint per burst of changes
                while rx.try_recv().is_ok() {}
                print_links(store, page.as_deref(), per_page, output).await?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    store.remove_listener(listener);
    Ok(())
}

async fn print_links(
    store: &Store,
    page: Option<&str>,
    per_page: usize,
    output: &Output,
) -> Result<()> {
    let all = store.get_all().await?;
    let query = match page {
        Some(page) => LinkQuery::new().page(page),
        None => LinkQuery::new(),
    };
    output.print_page(&paginate(query.apply(&all), 1, per_page), &all);
    Ok(())
}
