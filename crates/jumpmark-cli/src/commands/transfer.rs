//! Export and import command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;

use jumpmark_core::export::render;
use jumpmark_core::{ExportFormat, ImportOptions, Link};

use crate::commands::{match_id, Store};
use crate::output::{print_json, Output, OutputFormat};
use crate::prompt::confirm;

/// Export links to a file or stdout
///
/// With `ids`, only those links are exported; their type is still judged
/// against the whole store. An `output` directory gets a dated file name.
pub async fn export(
    store: &Store,
    format: ExportFormat,
    output_path: Option<PathBuf>,
    ids: Vec<String>,
    output: &Output,
) -> Result<()> {
    let all = store.get_all().await?;
    let selection = select(&all, &ids)?;

    let text = render(format, &selection, &all).context("Failed to render export")?;

    match output_path {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(format.file_name(Utc::now()))
            } else {
                path
            };
            std::fs::write(&path, text)
                .with_context(|| format!("Failed to write export file: {:?}", path))?;
            output.success(&format!(
                "Exported {} link(s) to {}",
                selection.len(),
                path.display()
            ));
        }
        None => print!("{}", text),
    }

    Ok(())
}

fn select(all: &[Link], ids: &[String]) -> Result<Vec<Link>> {
    if ids.is_empty() {
        return Ok(all.to_vec());
    }

    let mut wanted = Vec::with_capacity(ids.len());
    for id in ids {
        let id = match_id(all, id)?;
        if !wanted.contains(&id) {
            wanted.push(id);
        }
    }
    Ok(all
        .iter()
        .filter(|link| wanted.contains(&link.id))
        .cloned()
        .collect())
}

/// Import links from an exported JSON file
pub async fn import(
    store: &Store,
    file: PathBuf,
    replace: bool,
    keep_duplicates: bool,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let text = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read import file: {:?}", file))?;

    if replace && output.should_prompt() && !yes {
        println!("Importing with --replace discards every existing link.");
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let options = ImportOptions {
        merge: !replace,
        skip_duplicates: !keep_duplicates,
    };
    let summary = store
        .import_json(&text, options)
        .await
        .with_context(|| format!("Failed to import {:?}", file))?;

    match output.format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Quiet => {}
        OutputFormat::Human => {
            output.success(&format!(
                "Imported {} link(s), skipped {}",
                summary.imported, summary.skipped
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jumpmark_core::{FileBackend, LinkStore, NewLink};
    use tempfile::TempDir;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    #[test]
    fn test_select_keeps_store_order() {
        let all = vec![
            Link::new("a", "https://a.com", None, "x.com"),
            Link::new("b", "https://b.com", None, "x.com"),
            Link::new("c", "https://c.com", None, "y.com"),
        ];

        let ids = vec![all[2].id.clone(), all[0].id.clone(), all[0].id.clone()];
        let picked = select(&all, &ids).unwrap();
        assert_eq!(picked, vec![all[0].clone(), all[2].clone()]);

        assert_eq!(select(&all, &[]).unwrap().len(), 3);
        assert!(select(&all, &["nope".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_export_then_import_into_fresh_store() {
        let temp_dir = TempDir::new().unwrap();
        let source = LinkStore::new(FileBackend::new(temp_dir.path().join("a.json")));
        source
            .create(
                NewLink::new("Docs", "https://docs.rs", "https://example.com")
                    .with_reciprocal(None),
            )
            .await
            .unwrap();

        let export_path = temp_dir.path().join("export.json");
        export(
            &source,
            ExportFormat::Json,
            Some(export_path.clone()),
            vec![],
            &quiet(),
        )
        .await
        .unwrap();

        let target = LinkStore::new(FileBackend::new(temp_dir.path().join("b.json")));
        import(&target, export_path.clone(), false, false, true, &quiet())
            .await
            .unwrap();
        assert_eq!(target.get_all().await.unwrap().len(), 2);

        // Importing again skips both as duplicates
        import(&target, export_path, false, false, true, &quiet())
            .await
            .unwrap();
        let imported = target.get_all().await.unwrap();
        assert_eq!(imported.len(), 2);
        assert!(target.find_partner(&imported[0]).await.is_some());
    }

    #[tokio::test]
    async fn test_export_to_directory_uses_dated_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = LinkStore::new(FileBackend::new(temp_dir.path().join("store.json")));

        export(
            &store,
            ExportFormat::Csv,
            Some(temp_dir.path().to_path_buf()),
            vec![],
            &quiet(),
        )
        .await
        .unwrap();

        let expected = temp_dir.path().join(ExportFormat::Csv.file_name(Utc::now()));
        let text = std::fs::read_to_string(expected).unwrap();
        assert!(text.starts_with("ID,Title,URL,Icon,Source URL,Type,Created"));
    }
}
