use crate::domain::ticker::Ticker;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Fields read from the primary quote site for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRecord {
    pub price: f64,
    pub earnings_date: String,
    pub dividend_and_yield: String,
    pub ex_dividend_date: String,
    /// The quote site's own one-year target estimate.
    pub prediction: f64,
    pub week_growth_percentage: f64,
}

/// Where a price target came from. Declaration order is report column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PredictionSource {
    Zacks,
    AlphaSpread,
    Yahoo,
}

impl PredictionSource {
    pub fn name(self) -> &'static str {
        match self {
            PredictionSource::Zacks => "zacks",
            PredictionSource::AlphaSpread => "alphaspread",
            PredictionSource::Yahoo => "yahoo",
        }
    }
}

impl fmt::Display for PredictionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub quote: QuoteRecord,
    pub predictions: BTreeMap<PredictionSource, f64>,
    /// Sources whose value is the sentinel because the page did not answer in time.
    pub degraded: BTreeSet<PredictionSource>,
}

impl Summary {
    /// Growth implied by each prediction, in column order, at full precision.
    pub fn growths(&self) -> Vec<(PredictionSource, f64, f64)> {
        self.predictions
            .iter()
            .map(|(source, predicted)| {
                (
                    *source,
                    *predicted,
                    growth_percentage(self.quote.price, *predicted),
                )
            })
            .collect()
    }

    /// Mean of the unfloored growth percentages; `None` when there are no predictions.
    pub fn average_growth(&self) -> Option<f64> {
        if self.predictions.is_empty() {
            return None;
        }
        let sum: f64 = self.growths().iter().map(|(_, _, g)| g).sum();
        Some(sum / self.predictions.len() as f64)
    }
}

pub type Batch = HashMap<Ticker, Summary>;

/// `((predicted / price) - 1) * 100`, arranged so whole-number inputs stay exact.
pub fn growth_percentage(price: f64, predicted: f64) -> f64 {
    (predicted - price) * 100.0 / price
}
