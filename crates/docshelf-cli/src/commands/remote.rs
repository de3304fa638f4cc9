//! Remote corpus command handlers

use anyhow::{anyhow, Context, Result};
use tracing::warn;

use docshelf_core::SearchOutcome;

use super::Shelf;
use crate::output::Output;

/// Search the remote catalog
pub async fn search(
    shelf: &Shelf,
    query: String,
    doc_type: Option<String>,
    output: &Output,
) -> Result<()> {
    let doc_type = doc_type.unwrap_or_else(|| shelf.config.default_search_type.clone());
    let (sync, _) = shelf.sync_controller().await?;

    match sync.search_remote(&query, &doc_type).await? {
        SearchOutcome::Applied(results) => output.print_remote_results(&results),
        SearchOutcome::Superseded(token) => {
            output.message(&format!("Search {} was superseded", token.value()))
        }
    }
    Ok(())
}

/// Copy a remote result into the library
pub async fn promote(shelf: &Shelf, id: String, output: &Output) -> Result<()> {
    let (sync, catalog) = shelf.sync_controller().await?;
    let result = catalog
        .get(&id)
        .ok_or_else(|| anyhow!("Not in remote catalog: {}", id))?;

    let doc = sync.promote(result);
    shelf.save()?;

    output.success(&format!("Added to library: {}", doc.id));
    output.print_document(&doc);
    Ok(())
}

/// Pull the latest content for one document, or all of them
pub async fn refresh(shelf: &Shelf, id: Option<String>, output: &Output) -> Result<()> {
    let (sync, _) = shelf.sync_controller().await?;

    match id {
        Some(id) => {
            let doc = sync
                .refresh(&id)
                .await
                .with_context(|| format!("Failed to refresh {}", id))?;
            shelf.save()?;
            output.success(&format!("Refreshed: {}", doc.id));
        }
        None => {
            let outcomes = sync.refresh_all().await;
            shelf.save()?;

            let mut failed = 0;
            for (id, outcome) in &outcomes {
                match outcome {
                    Ok(_) => output.message(&format!("Refreshed: {}", id)),
                    Err(e) => {
                        failed += 1;
                        warn!("Refresh of {} failed: {}", id, e);
                        output.message(&format!("Failed: {} ({})", id, e));
                    }
                }
            }
            output.success(&format!(
                "Refreshed {} of {} document(s)",
                outcomes.len() - failed,
                outcomes.len()
            ));
        }
    }
    Ok(())
}
