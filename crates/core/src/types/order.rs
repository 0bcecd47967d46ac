//! Order payloads.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{OrderId, OrderStatus, Price, UserId, wire};

/// An order row from `GET /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub total_amount: Price,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(with = "wire::timestamp")]
    pub created_at: NaiveDateTime,
}

/// Response of `POST /checkout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub message: String,
    pub order_id: OrderId,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_from_api_row() {
        let json = r#"{
            "id": 12,
            "user_id": 4,
            "total_amount": 59.97000000000001,
            "status": "pending",
            "created_at": "2025-06-02 18:04:11"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, OrderId::new(12));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount.to_string(), "$59.97");
    }
}
