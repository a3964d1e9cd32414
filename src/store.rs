use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::model::Dataset;

/// Write the dataset artifact, creating the parent directory if needed.
pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let json = serde_json::to_string_pretty(dataset)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote {} records to {}", dataset.documents.len(), path.display());
    Ok(())
}

/// Load a dataset from a file path or an http(s) URL. URL loads go out with
/// a cache-busting query parameter; any failure here is terminal for the
/// load attempt.
pub async fn load_dataset(source: &str) -> Result<Dataset> {
    let payload = if source.starts_with("http://") || source.starts_with("https://") {
        fetch_payload(source).await?
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("failed to read dataset {source}"))?
    };

    serde_json::from_str(&payload).with_context(|| format!("failed to decode dataset {source}"))
}

async fn fetch_payload(source: &str) -> Result<String> {
    let url = cache_busted(source);
    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("dataset request failed: {source}"))?;

    let status = response.status();
    if !status.is_success() {
        bail!("failed to load dataset {source}: {status}");
    }

    response.text().await.context("failed to read dataset body")
}

fn cache_busted(url: &str) -> String {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    if url.contains('?') {
        format!("{url}&t={stamp}")
    } else {
        format!("{url}?t={stamp}")
    }
}

// ── Tests ──
