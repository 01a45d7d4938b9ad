//! Order intents: what a strategy asks the execution engine to do.
//!
//! Intents are ephemeral: the engine applies them in the order a strategy
//! returns them and never stores them.

use serde::{Deserialize, Serialize};

use super::metadata::Metadata;

/// Action carried by an order intent.
///
/// Entry actions carry the fraction of *current* cash to commit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum OrderAction {
    /// Open a long position.
    Buy { cash_allocation: f64 },
    /// Open a short position.
    Sell { cash_allocation: f64 },
    /// Close the open position, whatever its direction.
    Close,
}

impl OrderAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Buy { .. } => "buy",
            Self::Sell { .. } => "sell",
            Self::Close => "close",
        }
    }
}

/// A single order intent for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub symbol: String,
    #[serde(flatten)]
    pub action: OrderAction,
    /// Fill price override; defaults to the current bar's close.
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Order {
    pub fn new(symbol: impl Into<String>, action: OrderAction) -> Self {
        Self {
            symbol: symbol.into(),
            action,
            price: None,
            metadata: Metadata::new(),
        }
    }

    pub fn buy(symbol: impl Into<String>, cash_allocation: f64) -> Self {
        Self::new(symbol, OrderAction::Buy { cash_allocation })
    }

    pub fn sell(symbol: impl Into<String>, cash_allocation: f64) -> Self {
        Self::new(symbol, OrderAction::Sell { cash_allocation })
    }

    pub fn close(symbol: impl Into<String>) -> Self {
        Self::new(symbol, OrderAction::Close)
    }

    /// Fill at an explicit price instead of the bar close.
    pub fn at_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata.extend(metadata);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builders_set_action_and_overrides() {
        let order = Order::buy("SPY", 0.5)
            .at_price(101.25)
            .with_meta("or_high", 101.0);
        assert_eq!(order.action, OrderAction::Buy { cash_allocation: 0.5 });
        assert_eq!(order.price, Some(101.25));
        assert_eq!(order.metadata["or_high"], json!(101.0));
        assert_eq!(Order::close("SPY").action, OrderAction::Close);
    }

    #[test]
    fn order_deserializes_from_tagged_json() {
        let order: Order = serde_json::from_str(
            r#"{"symbol":"QQQ","action":"sell","cash_allocation":0.25,"price":400.0}"#,
        )
        .unwrap();
        assert_eq!(order.action, OrderAction::Sell { cash_allocation: 0.25 });
        assert_eq!(order.action.name(), "sell");
        assert_eq!(order.price, Some(400.0));

        let close: Order = serde_json::from_str(r#"{"symbol":"QQQ","action":"close"}"#).unwrap();
        assert_eq!(close.action, OrderAction::Close);
        assert!(close.metadata.is_empty());
    }
}
