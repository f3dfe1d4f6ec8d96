//! Message type to target service mapping

use std::collections::HashMap;
use std::sync::Arc;
use types::MessageType;

/// Well-known service names
pub mod names {
    pub const ORDER_MATCHING: &str = "OrderMatching";
    pub const MARKET_DATA: &str = "MarketData";
    pub const RISK_MANAGEMENT: &str = "RiskManagement";
}

/// Which services receive each message type. Types without an entry are
/// unroutable.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: HashMap<MessageType, Vec<Arc<str>>>,
}

impl RoutingTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// New orders go to matching and risk; cancels, replaces and fills to
    /// matching; quotes to market data. Session, heartbeat and error frames
    /// have no consumer.
    pub fn standard() -> Self {
        Self::empty()
            .route(MessageType::OrderNew, names::ORDER_MATCHING)
            .route(MessageType::OrderNew, names::RISK_MANAGEMENT)
            .route(MessageType::OrderCancel, names::ORDER_MATCHING)
            .route(MessageType::OrderReplace, names::ORDER_MATCHING)
            .route(MessageType::OrderFill, names::ORDER_MATCHING)
            .route(MessageType::MarketData, names::MARKET_DATA)
    }

    /// Add a target for `msg_type`; duplicates are ignored
    pub fn route(mut self, msg_type: MessageType, service: &str) -> Self {
        let targets = self.routes.entry(msg_type).or_default();
        if !targets.iter().any(|t| &**t == service) {
            targets.push(Arc::from(service));
        }
        self
    }

    pub fn targets(&self, msg_type: MessageType) -> &[Arc<str>] {
        self.routes.get(&msg_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_routable(&self, msg_type: MessageType) -> bool {
        !self.targets(msg_type).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_routes() {
        let table = RoutingTable::standard();
        let names = |t| -> Vec<String> { table.targets(t).iter().map(|s| s.to_string()).collect() };

        assert_eq!(names(MessageType::OrderNew), vec!["OrderMatching", "RiskManagement"]);
        assert_eq!(names(MessageType::OrderFill), vec!["OrderMatching"]);
        assert_eq!(names(MessageType::MarketData), vec!["MarketData"]);
        for unroutable in [
            MessageType::Heartbeat,
            MessageType::Login,
            MessageType::Logout,
            MessageType::Error,
        ] {
            assert!(!table.is_routable(unroutable));
        }
    }

    #[test]
    fn test_duplicate_route_ignored() {
        let table = RoutingTable::empty()
            .route(MessageType::Heartbeat, "a")
            .route(MessageType::Heartbeat, "a");
        assert_eq!(table.targets(MessageType::Heartbeat).len(), 1);
    }
}
