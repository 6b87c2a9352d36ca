//! The two demo tools: `get_stock_price` (fixed price table) and `buy_stocks`,
//! which waits for a human decision before "buying".

use async_trait::async_trait;
use serde_json::{json, Value};
use tollgraph::{
    ArgSchema, ArgType, Tool, ToolError, ToolInvocation, ToolOutcome, ToolRegistry, ToolSpec,
};

/// Known tickers and their prices.
pub const STOCK_PRICES: [(&str, f64); 5] = [
    ("AAPL", 150.25),
    ("GOOGL", 2750.50),
    ("MSFT", 299.00),
    ("RIL", 2200.75),
    ("AMZN", 135.00),
];

/// Price for `symbol` (case-insensitive); unknown symbols cost 0.0.
pub fn stock_price(symbol: &str) -> f64 {
    let symbol = symbol.trim().to_uppercase();
    STOCK_PRICES
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, p)| *p)
        .unwrap_or(0.0)
}

/// Float text with at least one decimal: `135.0`, `2750.5`, `1350.0`.
pub fn format_price(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Whether a resume value approves the purchase. Only the exact string `"yes"` does.
pub fn is_approval(value: &Value) -> bool {
    value.as_str() == Some("yes")
}

pub struct GetStockPrice;

#[async_trait]
impl Tool for GetStockPrice {
    fn name(&self) -> &str {
        "get_stock_price"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            self.name(),
            "Return the current price of a stock for the given stock symbol. \
             AAPL is Apple Inc., GOOGL is Alphabet Inc. (Google), MSFT is Microsoft Corporation, \
             RIL is Reliance Industries Limited, AMZN is Amazon, Inc.",
            ArgSchema::new().required("symbol", ArgType::String, "The stock symbol to look up"),
        )
    }

    async fn call(&self, inv: ToolInvocation) -> Result<ToolOutcome, ToolError> {
        let symbol = inv.arg_str("symbol")?;
        let price = stock_price(symbol);
        tracing::debug!(symbol, price, "stock price lookup");
        Ok(ToolOutcome::text(format_price(price)))
    }
}

/// Buys after approval. First call suspends with the approval prompt; the
/// resumed call reports the purchase or the decline.
pub struct BuyStocks;

#[async_trait]
impl Tool for BuyStocks {
    fn name(&self) -> &str {
        "buy_stocks"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            self.name(),
            "Buy stocks for the given symbol and quantity",
            ArgSchema::new()
                .required("symbol", ArgType::String, "The stock symbol to buy")
                .required("quantity", ArgType::Integer, "Number of shares")
                .required("total_price", ArgType::Number, "Total cost of the purchase"),
        )
        .suspendable()
    }

    async fn call(&self, inv: ToolInvocation) -> Result<ToolOutcome, ToolError> {
        let symbol = inv.arg_str("symbol")?;
        let quantity = inv.arg_i64("quantity")?;
        let total_price = inv.arg_f64("total_price")?;

        let Some(decision) = inv.resume_value() else {
            return Ok(ToolOutcome::suspend(
                format!("Approve buying {quantity} of {symbol} stocks for ${total_price:.2}"),
                json!({ "symbol": symbol, "quantity": quantity, "total_price": total_price }),
            ));
        };
        if is_approval(decision) {
            tracing::info!(symbol, quantity, total_price, "purchase approved");
            Ok(ToolOutcome::text(format!(
                "you have {quantity} shares of {symbol} for a total price of {}.",
                format_price(total_price)
            )))
        } else {
            tracing::info!(symbol, quantity, "purchase declined");
            Ok(ToolOutcome::text("Buying declined"))
        }
    }
}

/// Registry holding both demo tools.
pub fn stock_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(GetStockPrice));
    registry.register(Box::new(BuyStocks));
    registry
}
