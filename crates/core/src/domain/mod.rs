pub mod summary;
pub mod ticker;

pub use summary::{Batch, PredictionSource, QuoteRecord, Summary};
pub use ticker::Ticker;
