//! Order lifecycle state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The lifecycle state of an order.
///
/// Line-item mutations are independent of the state; state transitions are
/// an order-level edit guarded by the order's row version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
    Pending,
    Processed,
    Shipped,
    Delivered,
}

impl OrderState {
    /// Returns the canonical string form, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Pending => "Pending",
            OrderState::Processed => "Processed",
            OrderState::Shipped => "Shipped",
            OrderState::Delivered => "Delivered",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a persisted order state string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order state: {0:?}")]
pub struct ParseOrderStateError(pub String);

impl std::str::FromStr for OrderState {
    type Err = ParseOrderStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderState::Pending),
            "Processed" => Ok(OrderState::Processed),
            "Shipped" => Ok(OrderState::Shipped),
            "Delivered" => Ok(OrderState::Delivered),
            other => Err(ParseOrderStateError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_roundtrip() {
        for state in [
            OrderState::Pending,
            OrderState::Processed,
            OrderState::Shipped,
            OrderState::Delivered,
        ] {
            let parsed: OrderState = state.as_str().parse().unwrap();
            assert_eq!(parsed, state);
        }
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!("Cancelled".parse::<OrderState>().is_err());
    }
}
