//! Offline stand-in for the hosted model (`--mock`).
//!
//! Reads the last user request for a company or ticker and a quantity, asks
//! for the price, then either answers with the total or requests a purchase
//! when the request starts with "buy". Tool results of `buy_stocks` are
//! relayed as the final answer.

use serde_json::json;
use tollgraph::{LlmResponse, Message, MockLlm, ToolCall};

use crate::stocks::{format_price, STOCK_PRICES};

const COMPANY_NAMES: [(&str, &str); 7] = [
    ("amazon", "AMZN"),
    ("apple", "AAPL"),
    ("google", "GOOGL"),
    ("alphabet", "GOOGL"),
    ("microsoft", "MSFT"),
    ("reliance", "RIL"),
    ("ril", "RIL"),
];

const HELP_TEXT: &str =
    "I can look up stock prices (AAPL, GOOGL, MSFT, RIL, AMZN) and buy stocks with your approval.";

/// What a user message asks for.
#[derive(Debug, Clone, PartialEq)]
pub struct StockRequest {
    pub symbol: String,
    pub quantity: i64,
    pub buy: bool,
}

/// Extracts ticker, quantity (default 1) and intent from free text.
pub fn parse_request(text: &str) -> Option<StockRequest> {
    let words: Vec<String> = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    let symbol = words.iter().find_map(|w| {
        let lower = w.to_ascii_lowercase();
        COMPANY_NAMES
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, sym)| sym.to_string())
            .or_else(|| {
                let upper = w.to_ascii_uppercase();
                STOCK_PRICES
                    .iter()
                    .any(|(s, _)| *s == upper)
                    .then_some(upper)
            })
    })?;
    let quantity = words
        .iter()
        .find_map(|w| w.parse::<i64>().ok())
        .filter(|q| *q > 0)
        .unwrap_or(1);
    let buy = words
        .iter()
        .any(|w| w.eq_ignore_ascii_case("buy") || w.eq_ignore_ascii_case("purchase"));
    Some(StockRequest {
        symbol,
        quantity,
        buy,
    })
}

fn last_user_text(messages: &[Message]) -> Option<&str> {
    messages.iter().rev().find_map(|m| match m {
        Message::User { content } => Some(content.as_str()),
        _ => None,
    })
}

/// One scripted model turn for the given log.
pub fn respond(messages: &[Message]) -> LlmResponse {
    let request = last_user_text(messages).and_then(parse_request);
    match (messages.last(), request) {
        (Some(Message::Tool { name, content, is_error, .. }), _) if *is_error => {
            LlmResponse::text(format!("The {name} tool failed: {content}"))
        }
        (Some(Message::Tool { name, content, .. }), Some(req)) if name == "get_stock_price" => {
            let unit: f64 = content.trim().parse().unwrap_or(0.0);
            let total = unit * req.quantity as f64;
            if req.buy {
                let args = json!({
                    "symbol": req.symbol,
                    "quantity": req.quantity,
                    "total_price": total,
                });
                LlmResponse::with_tool_calls(
                    "",
                    vec![ToolCall::new("", "buy_stocks", args.to_string())],
                )
            } else {
                LlmResponse::text(format!(
                    "The price of {} {} stock is ${:.2} (${} each).",
                    req.quantity,
                    req.symbol,
                    total,
                    format_price(unit)
                ))
            }
        }
        (Some(Message::Tool { content, .. }), _) => LlmResponse::text(content.clone()),
        (Some(Message::User { .. }), Some(req)) => LlmResponse::with_tool_calls(
            "",
            vec![ToolCall::new(
                "",
                "get_stock_price",
                json!({ "symbol": req.symbol }).to_string(),
            )],
        ),
        _ => LlmResponse::text(HELP_TEXT),
    }
}

/// Mock gateway driven by [`respond`].
pub fn scripted_llm() -> MockLlm {
    MockLlm::with_responder(|messages, _tools| Ok(respond(messages)))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Company names and tickers are recognized with quantity and intent.
    #[test]
    fn parse_request_reads_symbol_quantity_intent() {
        assert_eq!(
            parse_request("What is the price of 10 Amazon stock?"),
            Some(StockRequest { symbol: "AMZN".into(), quantity: 10, buy: false })
        );
        assert_eq!(
            parse_request("Buy 10  Amazon stocks at current price"),
            Some(StockRequest { symbol: "AMZN".into(), quantity: 10, buy: true })
        );
        assert_eq!(
            parse_request("price of msft"),
            Some(StockRequest { symbol: "MSFT".into(), quantity: 1, buy: false })
        );
        assert_eq!(parse_request("hello there"), None);
    }

    /// **Scenario**: A user request leads to a price lookup.
    #[test]
    fn user_request_asks_for_price() {
        let r = respond(&[Message::user("What is the price of 10 Amazon stock?")]);
        assert_eq!(r.tool_calls.len(), 1);
        assert_eq!(r.tool_calls[0].name, "get_stock_price");
        assert_eq!(r.tool_calls[0].arguments, r#"{"symbol":"AMZN"}"#);
    }

    /// **Scenario**: After the price, a question gets the total; a buy request gets a purchase call.
    #[test]
    fn price_result_answers_or_buys() {
        let call = ToolCall::new("c1", "get_stock_price", r#"{"symbol":"AMZN"}"#);
        let mut log = vec![
            Message::user("What is the price of 10 Amazon stock?"),
            Message::assistant_with_tool_calls("", vec![call.clone()]),
            Message::tool_result(&call, "135.0"),
        ];
        let r = respond(&log);
        assert!(r.tool_calls.is_empty());
        assert_eq!(r.content, "The price of 10 AMZN stock is $1350.00 ($135.0 each).");

        log[0] = Message::user("Buy 10 Amazon stocks");
        let r = respond(&log);
        assert_eq!(r.tool_calls[0].name, "buy_stocks");
        let args: serde_json::Value = serde_json::from_str(&r.tool_calls[0].arguments).unwrap();
        assert_eq!(args["total_price"], 1350.0);
        assert_eq!(args["quantity"], 10);
    }

    /// **Scenario**: Small talk gets the help text.
    #[test]
    fn unrelated_message_gets_help() {
        assert_eq!(respond(&[Message::user("hi")]).content, HELP_TEXT);
    }
}
