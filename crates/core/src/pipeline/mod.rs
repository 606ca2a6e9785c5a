use crate::browser::{Browser, BrowserLauncher};
use crate::config::Settings;
use crate::domain::summary::{Batch, QuoteRecord, Summary};
use crate::domain::ticker::Ticker;
use crate::error::{BatchError, TickerError};
use crate::sites::{self, AlphaSpread, SiteAdapter, YahooFinance, Zacks};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Merges the required quote source and the best-effort prediction sources for one ticker.
pub struct Aggregator {
    quote: Box<dyn SiteAdapter<Output = QuoteRecord>>,
    predictions: Vec<Box<dyn SiteAdapter<Output = f64>>>,
}

impl Aggregator {
    pub fn new(
        quote: Box<dyn SiteAdapter<Output = QuoteRecord>>,
        predictions: Vec<Box<dyn SiteAdapter<Output = f64>>>,
    ) -> Self {
        Self { quote, predictions }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Box::new(YahooFinance::from_settings(settings)),
            vec![
                Box::new(Zacks::from_settings(settings)),
                Box::new(AlphaSpread::from_settings(settings)),
            ],
        )
    }

    /// Runs every source for `ticker` concurrently and waits for all of them. A quote failure, or
    /// any prediction failure other than a timeout, fails the ticker.
    pub async fn summarize(
        &self,
        browser: &dyn Browser,
        ticker: &Ticker,
    ) -> Result<Summary, TickerError> {
        let quote = sites::fetch(self.quote.as_ref(), browser, ticker);
        let predictions = join_all(
            self.predictions
                .iter()
                .map(|adapter| sites::fetch_prediction(adapter.as_ref(), browser, ticker)),
        );
        let (quote, outcomes) = tokio::join!(quote, predictions);

        let quote = quote.map_err(|error| TickerError {
            ticker: ticker.clone(),
            site: self.quote.source().name(),
            error,
        })?;

        let mut merged = BTreeMap::new();
        let mut degraded = BTreeSet::new();
        for (adapter, outcome) in self.predictions.iter().zip(outcomes) {
            let source = adapter.source();
            if outcome.is_degraded() {
                degraded.insert(source);
            }
            let value = outcome.into_result().map_err(|error| TickerError {
                ticker: ticker.clone(),
                site: source.name(),
                error,
            })?;
            merged.insert(source, value);
        }
        merged.insert(self.quote.source(), quote.prediction);

        tracing::debug!(
            %ticker,
            price = quote.price,
            predictions = merged.len(),
            degraded = degraded.len(),
            "ticker summarized"
        );

        Ok(Summary {
            quote,
            predictions: merged,
            degraded,
        })
    }
}

/// Summarizes a batch of tickers on one shared browser session.
pub struct Pipeline {
    launcher: Box<dyn BrowserLauncher>,
    aggregator: Aggregator,
}

impl Pipeline {
    pub fn new(launcher: Box<dyn BrowserLauncher>, aggregator: Aggregator) -> Self {
        Self {
            launcher,
            aggregator,
        }
    }

    /// Every ticker runs concurrently and all are awaited before the session closes; the first
    /// failure in ticker order is returned.
    pub async fn summarize_all(&self, tickers: &[Ticker]) -> Result<Batch, BatchError> {
        let started = Instant::now();
        let browser = self.launcher.launch().await.map_err(BatchError::Launch)?;

        let results = join_all(
            tickers
                .iter()
                .map(|ticker| self.aggregator.summarize(browser.as_ref(), ticker)),
        )
        .await;

        if let Err(err) = browser.close().await {
            tracing::warn!(error = %err, "failed to close browser session");
        }

        let mut batch = Batch::with_capacity(tickers.len());
        let mut first_failure = None;
        for (ticker, result) in tickers.iter().zip(results) {
            match result {
                Ok(summary) => {
                    batch.insert(ticker.clone(), summary);
                }
                Err(err) => {
                    tracing::error!(
                        ticker = %err.ticker,
                        site = err.site,
                        error = %err.error,
                        "ticker aggregation failed"
                    );
                    first_failure.get_or_insert(err);
                }
            }
        }

        if let Some(err) = first_failure {
            return Err(err.into());
        }

        tracing::info!(
            tickers = tickers.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "batch summarized"
        );
        Ok(batch)
    }
}
