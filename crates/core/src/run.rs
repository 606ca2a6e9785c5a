use crate::domain::ticker::Ticker;
use crate::pipeline::Pipeline;
use crate::report::write_category;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Category {
    pub label: String,
    pub tickers: Vec<Ticker>,
}

impl Category {
    pub fn new(label: impl Into<String>, tickers: &[&str]) -> Self {
        Self {
            label: label.into(),
            tickers: tickers.iter().map(|t| Ticker::new(*t)).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub categories: Vec<Category>,
    /// Pause between consecutive categories.
    pub delay: Duration,
}

impl RunConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.categories.is_empty(), "at least one category is required");
        for category in &self.categories {
            anyhow::ensure!(
                !category.label.trim().is_empty(),
                "category label must be non-empty"
            );
            anyhow::ensure!(
                !category.label.contains(['\t', '\n']),
                "category label must not contain tabs or newlines: {:?}",
                category.label
            );
            anyhow::ensure!(
                !category.tickers.is_empty(),
                "category {} has no tickers",
                category.label
            );
            anyhow::ensure!(
                category.tickers.iter().all(|t| !t.as_str().is_empty()),
                "category {} has an empty ticker",
                category.label
            );
        }
        Ok(())
    }
}

/// Parses `[{"label": "...", "tickers": ["...", ...]}, ...]`.
pub fn parse_categories(json: &str) -> anyhow::Result<Vec<Category>> {
    serde_json::from_str::<Vec<Category>>(json).context("categories must be a JSON array of {label, tickers}")
}

/// Processes categories in order, pausing between them. The first failing category aborts the
/// rest; nothing is written for it. Returns the number of categories written.
pub async fn run_categories<W>(
    pipeline: &Pipeline,
    config: &RunConfig,
    out: &mut W,
) -> anyhow::Result<usize>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    config.validate()?;

    let total = config.categories.len();
    for (idx, category) in config.categories.iter().enumerate() {
        if idx != 0 && !config.delay.is_zero() {
            tracing::info!(delay = ?config.delay, next = %category.label, "pausing between categories");
            tokio::time::sleep(config.delay).await;
        }

        tracing::info!(
            category = %category.label,
            tickers = category.tickers.len(),
            position = idx + 1,
            total,
            "processing category"
        );

        let batch = pipeline
            .summarize_all(&category.tickers)
            .await
            .with_context(|| format!("category {} failed", category.label))?;

        write_category(out, &category.label, &batch, &category.tickers)
            .await
            .with_context(|| format!("failed to write category {}", category.label))?;
    }

    Ok(total)
}

/// Runs every category into a freshly truncated file at `path`. The file is flushed and closed
/// on both the success and the failure path.
pub async fn run_to_file(
    pipeline: &Pipeline,
    config: &RunConfig,
    path: &Path,
) -> anyhow::Result<usize> {
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("failed to create report file {}", path.display()))?;

    let result = run_categories(pipeline, config, &mut file).await;
    let closed = file.shutdown().await;

    match (result, closed) {
        (Ok(written), Ok(())) => {
            tracing::info!(path = %path.display(), categories = written, "report complete");
            Ok(written)
        }
        (Ok(_), Err(err)) => {
            Err(err).with_context(|| format!("failed to close report file {}", path.display()))
        }
        (Err(err), closed) => {
            if let Err(close_err) = closed {
                tracing::warn!(path = %path.display(), error = %close_err, "failed to close report file");
            }
            Err(err)
        }
    }
}
