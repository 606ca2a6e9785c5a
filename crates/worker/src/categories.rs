use anyhow::Context;
use pricewatch_core::run::{parse_categories, Category};
use std::path::Path;

/// Groups used when no `--categories` file is given.
const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    ("Technology", &["AAPL", "MSFT", "NVDA", "GOOGL", "META"]),
    ("Financials", &["JPM", "BAC", "BRK.B", "V", "MA"]),
    ("Healthcare", &["JNJ", "UNH", "PFE", "ABBV", "MRK"]),
    ("Energy", &["XOM", "CVX", "COP", "SLB"]),
    ("Consumer", &["AMZN", "WMT", "KO", "PEP", "MCD"]),
];

pub fn default_categories() -> Vec<Category> {
    DEFAULT_CATEGORIES
        .iter()
        .map(|(label, tickers)| Category::new(*label, tickers))
        .collect()
}

pub fn load_categories(path: Option<&Path>) -> anyhow::Result<Vec<Category>> {
    let Some(path) = path else {
        return Ok(default_categories());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read categories file {}", path.display()))?;
    parse_categories(&raw).with_context(|| format!("invalid categories file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_non_empty() {
        let categories = default_categories();
        assert_eq!(categories.len(), DEFAULT_CATEGORIES.len());
        assert!(categories.iter().all(|c| !c.tickers.is_empty()));
        assert_eq!(categories[1].tickers[2].as_str(), "BRK.B");
    }

    #[test]
    fn loads_categories_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"label": "Chips", "tickers": ["nvda", "AMD"]}}, {{"label": "Banks", "tickers": ["JPM"]}}]"#
        )
        .unwrap();

        let categories = load_categories(Some(file.path())).unwrap();
        assert_eq!(
            categories,
            vec![
                Category::new("Chips", &["NVDA", "AMD"]),
                Category::new("Banks", &["JPM"]),
            ]
        );
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_categories(Some(Path::new("/nonexistent/categories.json"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/categories.json"));
    }
}
