//! Status command handler

use anyhow::Result;

use jumpmark_core::Config;

use crate::commands::Store;
use crate::output::Output;

/// Fraction of the quota at which status warns
const QUOTA_WARNING_RATIO: f64 = 0.9;

/// Show store statistics
pub async fn show(store: &Store, config: &Config, output: &Output) -> Result<()> {
    let stats = store.stats().await?;

    if output.should_prompt() {
        println!("Jumpmark Status");
        println!("===============");
        println!();
        println!("Store: {}", store.backend().path().display());
        println!();
    }
    output.print_stats(&stats, config.quota_bytes);

    if stats.is_near_quota(config.quota_bytes, QUOTA_WARNING_RATIO) {
        output.warn(&format!(
            "Storage is {:.0}% full. Export and prune old links to stay under the quota.",
            stats.usage_ratio(config.quota_bytes) * 100.0
        ));
    }

    Ok(())
}
