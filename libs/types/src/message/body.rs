//! Type-specific message bodies

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Order side flag, encoded as one byte (1 = buy, 0 = sell)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
pub enum Side {
    Sell = 0,
    Buy = 1,
}

impl Side {
    pub fn is_buy(self) -> bool {
        self == Side::Buy
    }
}

/// Body shared by order-new, order-cancel, order-replace and order-fill
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: u64,
    pub symbol: String,
    pub price: f64,
    pub quantity: u32,
    pub side: Side,
}

impl Order {
    pub fn new(order_id: u64, symbol: impl Into<String>, price: f64, quantity: u32, side: Side) -> Self {
        Self {
            order_id,
            symbol: symbol.into(),
            price,
            quantity,
            side,
        }
    }

    /// Price times quantity
    pub fn notional(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// Top-of-book quote
#[derive(Debug, Clone, PartialEq)]
pub struct MarketData {
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    pub bid_size: u32,
    pub ask_size: u32,
}

impl MarketData {
    pub fn new(symbol: impl Into<String>, bid: f64, ask: f64, bid_size: u32, ask_size: u32) -> Self {
        Self {
            symbol: symbol.into(),
            bid,
            ask,
            bid_size,
            ask_size,
        }
    }

    pub fn is_crossed(&self) -> bool {
        self.bid >= self.ask
    }
}

/// Error report body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub code: u32,
    pub text: String,
}

impl ErrorReport {
    pub fn new(code: u32, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_wire_values() {
        assert_eq!(u8::from(Side::Buy), 1);
        assert_eq!(u8::from(Side::Sell), 0);
        assert!(Side::try_from(2u8).is_err());
    }

    #[test]
    fn test_order_notional() {
        let order = Order::new(1, "AAPL", 150.50, 100, Side::Buy);
        assert!((order.notional() - 15_050.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_market_data_crossed() {
        assert!(MarketData::new("AAPL", 151.0, 150.0, 1, 1).is_crossed());
        assert!(MarketData::new("AAPL", 150.0, 150.0, 1, 1).is_crossed());
        assert!(!MarketData::new("AAPL", 150.45, 150.55, 1, 1).is_crossed());
    }
}
