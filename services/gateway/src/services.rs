//! Reference consumer services
//!
//! Minimal business logic behind the three standard service names. Each runs
//! on its own [`ThreadedService`] thread; state is behind a lock only so
//! operators and tests can read it.

use dispatch::{names, MessageProcessor, ThreadedService};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use types::{MarketData, Message, MessageType, Order, Side};

#[derive(Debug, Clone, PartialEq)]
pub struct RestingOrder {
    pub symbol: String,
    pub side: Side,
    pub price: f64,
    pub remaining: u32,
}

/// Resting orders keyed by order id
#[derive(Debug, Default)]
pub struct OrderBook {
    orders: Mutex<HashMap<u64, RestingOrder>>,
    fills: AtomicU64,
}

impl OrderBook {
    pub fn resting(&self, order_id: u64) -> Option<RestingOrder> {
        self.orders.lock().get(&order_id).cloned()
    }

    pub fn resting_count(&self, symbol: &str) -> usize {
        self.orders.lock().values().filter(|o| o.symbol == symbol).count()
    }

    pub fn total_resting(&self) -> usize {
        self.orders.lock().len()
    }

    pub fn fills(&self) -> u64 {
        self.fills.load(Ordering::Relaxed)
    }

    fn apply(&self, kind: MessageType, order: &Order) {
        let mut orders = self.orders.lock();
        match kind {
            MessageType::OrderNew => {
                orders.insert(
                    order.order_id,
                    RestingOrder {
                        symbol: order.symbol.clone(),
                        side: order.side,
                        price: order.price,
                        remaining: order.quantity,
                    },
                );
            }
            MessageType::OrderCancel => {
                if orders.remove(&order.order_id).is_none() {
                    debug!(order_id = order.order_id, "Cancel for unknown order");
                }
            }
            MessageType::OrderReplace => match orders.get_mut(&order.order_id) {
                Some(resting) => {
                    resting.price = order.price;
                    resting.remaining = order.quantity;
                }
                None => debug!(order_id = order.order_id, "Replace for unknown order"),
            },
            MessageType::OrderFill => {
                self.fills.fetch_add(1, Ordering::Relaxed);
                if let Some(resting) = orders.get_mut(&order.order_id) {
                    resting.remaining = resting.remaining.saturating_sub(order.quantity);
                    if resting.remaining == 0 {
                        orders.remove(&order.order_id);
                    }
                }
            }
            _ => {}
        }
    }
}

impl MessageProcessor for OrderBook {
    fn handle(&self, message: &Message) {
        if let Some(order) = message.as_order() {
            self.apply(message.message_type(), order);
        }
    }
}

/// Last quote per symbol
#[derive(Debug, Default)]
pub struct QuoteBoard {
    quotes: Mutex<HashMap<String, MarketData>>,
    updates: AtomicU64,
}

impl QuoteBoard {
    pub fn last_quote(&self, symbol: &str) -> Option<MarketData> {
        self.quotes.lock().get(symbol).cloned()
    }

    pub fn symbols(&self) -> usize {
        self.quotes.lock().len()
    }

    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }
}

impl MessageProcessor for QuoteBoard {
    fn handle(&self, message: &Message) {
        if let Some(quote) = message.as_market_data() {
            self.quotes.lock().insert(quote.symbol.clone(), quote.clone());
            self.updates.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Default per-client gross notional limit
pub const DEFAULT_NOTIONAL_LIMIT: f64 = 10_000_000.0;

/// Per-client gross notional of new orders, flagged past a limit
#[derive(Debug)]
pub struct RiskBook {
    limit: f64,
    exposure: Mutex<HashMap<u64, f64>>,
    breaches: AtomicU64,
}

impl Default for RiskBook {
    fn default() -> Self {
        Self::with_limit(DEFAULT_NOTIONAL_LIMIT)
    }
}

impl RiskBook {
    pub fn with_limit(limit: f64) -> Self {
        Self {
            limit,
            exposure: Mutex::new(HashMap::new()),
            breaches: AtomicU64::new(0),
        }
    }

    pub fn exposure(&self, client_id: u64) -> f64 {
        self.exposure.lock().get(&client_id).copied().unwrap_or_default()
    }

    pub fn breaches(&self) -> u64 {
        self.breaches.load(Ordering::Relaxed)
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }
}

impl MessageProcessor for RiskBook {
    fn handle(&self, message: &Message) {
        if message.message_type() != MessageType::OrderNew {
            return;
        }
        let Some(order) = message.as_order() else {
            return;
        };
        let total = {
            let mut exposure = self.exposure.lock();
            let entry = exposure.entry(message.client_id()).or_default();
            *entry += order.notional();
            *entry
        };
        if total > self.limit {
            self.breaches.fetch_add(1, Ordering::Relaxed);
            warn!(
                client_id = message.client_id(),
                exposure = total,
                limit = self.limit,
                "Notional limit breached"
            );
        }
    }
}

pub type OrderMatchingService = ThreadedService<OrderBook>;
pub type MarketDataService = ThreadedService<QuoteBoard>;
pub type RiskManagementService = ThreadedService<RiskBook>;

pub fn order_matching() -> OrderMatchingService {
    ThreadedService::new(names::ORDER_MATCHING, OrderBook::default())
}

pub fn market_data() -> MarketDataService {
    ThreadedService::new(names::MARKET_DATA, QuoteBoard::default())
}

pub fn risk_management(limit: f64) -> RiskManagementService {
    ThreadedService::new(names::RISK_MANAGEMENT, RiskBook::with_limit(limit))
}
