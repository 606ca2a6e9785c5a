pub mod alphaspread;
pub mod yahoo;
pub mod zacks;

use crate::browser::Browser;
use crate::browser::Page;
use crate::domain::summary::PredictionSource;
use crate::domain::ticker::Ticker;
use crate::error::ScrapeError;

pub use alphaspread::AlphaSpread;
pub use yahoo::YahooFinance;
pub use zacks::Zacks;

/// Prediction reported for a best-effort source whose page did not answer in time.
pub const SENTINEL_PREDICTION: f64 = 0.0;

/// One data source: how to turn a page for a ticker into a typed value.
#[async_trait::async_trait]
pub trait SiteAdapter: Send + Sync {
    type Output: Send;

    fn source(&self) -> PredictionSource;

    /// Navigates `page` and extracts this source's value. The page is opened and closed by
    /// [`fetch`].
    async fn scrape(&self, page: &dyn Page, ticker: &Ticker) -> Result<Self::Output, ScrapeError>;
}

/// Runs `adapter` on a fresh script-less page that is closed before returning, on every path.
pub async fn fetch<A>(
    adapter: &A,
    browser: &dyn Browser,
    ticker: &Ticker,
) -> Result<A::Output, ScrapeError>
where
    A: SiteAdapter + ?Sized,
{
    let page = browser.new_page().await?;

    let result = match page.set_javascript_enabled(false).await {
        Ok(()) => adapter.scrape(page.as_ref(), ticker).await,
        Err(err) => Err(err.into()),
    };

    if let Err(err) = page.close().await {
        tracing::warn!(%ticker, site = %adapter.source(), error = %err, "failed to close page");
    }

    result
}

/// Result of a best-effort source.
#[derive(Debug)]
pub enum SourceOutcome {
    Ok(f64),
    Degraded { sentinel: f64, reason: ScrapeError },
    Fatal(ScrapeError),
}

impl SourceOutcome {
    /// Timeouts degrade to `sentinel`; every other failure stays fatal.
    pub fn absorb_timeout(result: Result<f64, ScrapeError>, sentinel: f64) -> Self {
        match result {
            Ok(value) => SourceOutcome::Ok(value),
            Err(err) if err.is_timeout() => SourceOutcome::Degraded {
                sentinel,
                reason: err,
            },
            Err(err) => SourceOutcome::Fatal(err),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SourceOutcome::Degraded { .. })
    }

    pub fn into_result(self) -> Result<f64, ScrapeError> {
        match self {
            SourceOutcome::Ok(value) => Ok(value),
            SourceOutcome::Degraded { sentinel, .. } => Ok(sentinel),
            SourceOutcome::Fatal(err) => Err(err),
        }
    }
}

/// Fetches a secondary prediction, degrading a slow or missing target element to the sentinel.
pub async fn fetch_prediction(
    adapter: &dyn SiteAdapter<Output = f64>,
    browser: &dyn Browser,
    ticker: &Ticker,
) -> SourceOutcome {
    let outcome =
        SourceOutcome::absorb_timeout(fetch(adapter, browser, ticker).await, SENTINEL_PREDICTION);

    if let SourceOutcome::Degraded { reason, sentinel } = &outcome {
        tracing::warn!(
            %ticker,
            site = %adapter.source(),
            error = %reason,
            sentinel,
            "prediction unavailable; using sentinel"
        );
    }

    outcome
}
