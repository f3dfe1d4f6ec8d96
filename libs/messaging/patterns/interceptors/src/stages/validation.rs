//! Structural and semantic checks on well-formed messages

use crate::chain::Interceptor;
use crate::context::{keys, InterceptorContext, Verdict};
use types::{MarketData, Message, MessageType, Order};

/// Rejects messages with unassigned header fields or invalid order / quote
/// fields. Records `validation=passed` on success, `error=<reason>` otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidationInterceptor;

impl ValidationInterceptor {
    pub fn new() -> Self {
        Self
    }

    /// First failing rule, or `None` when the message is valid
    pub fn check(message: &Message) -> Option<&'static str> {
        if let Err(reason) = message.validate_header() {
            return Some(reason);
        }
        match message.message_type() {
            // Fills report executions and are not re-checked here
            MessageType::OrderNew | MessageType::OrderCancel | MessageType::OrderReplace => {
                message.as_order().and_then(check_order)
            }
            MessageType::MarketData => message.as_market_data().and_then(check_quote),
            _ => None,
        }
    }
}

fn check_order(order: &Order) -> Option<&'static str> {
    if order.order_id == 0 {
        Some("Invalid order ID")
    } else if order.symbol.is_empty() {
        Some("Empty symbol")
    } else if !(order.price > 0.0) {
        Some("Invalid price")
    } else if order.quantity == 0 {
        Some("Invalid quantity")
    } else {
        None
    }
}

fn check_quote(quote: &MarketData) -> Option<&'static str> {
    if quote.symbol.is_empty() {
        Some("Empty symbol")
    } else if quote.bid < 0.0 || quote.ask < 0.0 {
        Some("Invalid bid/ask")
    } else if quote.bid >= quote.ask {
        Some("Bid >= Ask")
    } else {
        None
    }
}

impl Interceptor for ValidationInterceptor {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn process(&self, context: &mut InterceptorContext) -> Verdict {
        match Self::check(context.message()) {
            Some(reason) => {
                context.set(keys::ERROR, reason);
                Verdict::Reject
            }
            None => {
                context.set(keys::VALIDATION, "passed");
                Verdict::Accept
            }
        }
    }
}
