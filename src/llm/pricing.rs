use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;

/// USD per million tokens.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct PriceEntry {
    pub input: f64,
    pub output: f64,
}

/// USD per web search performed by the server-side tool.
pub const WEB_SEARCH_PRICE_USD: f64 = 0.01;

#[derive(Deserialize)]
struct PricingFile {
    models: HashMap<String, PriceEntry>,
}

fn builtin_prices() -> HashMap<String, PriceEntry> {
    [
        ("claude-sonnet-4-20250514", 3.0, 15.0),
        ("claude-sonnet-4-5-20250929", 3.0, 15.0),
        ("claude-opus-4-1-20250805", 15.0, 75.0),
        ("claude-haiku-4-5-20251001", 1.0, 5.0),
    ]
    .into_iter()
    .map(|(model, input, output)| (model.to_string(), PriceEntry { input, output }))
    .collect()
}

pub static PRICING: LazyLock<HashMap<String, PriceEntry>> = LazyLock::new(|| {
    let mut prices = builtin_prices();
    let path = std::env::var("PRICING_JSON_PATH").unwrap_or_default();
    if path.is_empty() {
        return prices;
    }
    match std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|data| serde_json::from_str::<PricingFile>(&data).map_err(|e| e.to_string()))
    {
        Ok(parsed) => prices.extend(parsed.models),
        Err(error) => {
            tracing::warn!(%path, %error, "pricing override unreadable, using built-in prices")
        }
    }
    prices
});

pub fn calculate_cost(
    model: &str,
    input_tokens: u32,
    output_tokens: u32,
    web_search_requests: u32,
) -> f64 {
    let searches = f64::from(web_search_requests) * WEB_SEARCH_PRICE_USD;
    match PRICING.get(model) {
        Some(entry) => {
            (f64::from(input_tokens) * entry.input / 1_000_000.0)
                + (f64::from(output_tokens) * entry.output / 1_000_000.0)
                + searches
        }
        None => searches,
    }
}
