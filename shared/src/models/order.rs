//! Canonical Order Model
//!
//! Stable shape produced by the record normalizer. Documents written by
//! older clients differ wildly (`phoneNumber` vs `customerPhone`,
//! `deliveryLocation` vs nested `address` coordinates, `priceAtPurchase`
//! vs `price`); everything downstream of the normalizer sees only these
//! types. Field names serialize in camelCase to match the stored documents.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Known order status codes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Accepted,
    Cooking,
    ReadyForDelivery,
    OnTheWay,
    Delivered,
    DineIn,
    Canceled,
    Refunded,
    Draft,
}

impl OrderStatus {
    /// All known statuses, in lifecycle order
    pub const ALL: [OrderStatus; 11] = [
        OrderStatus::Draft,
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Accepted,
        OrderStatus::Cooking,
        OrderStatus::ReadyForDelivery,
        OrderStatus::OnTheWay,
        OrderStatus::Delivered,
        OrderStatus::DineIn,
        OrderStatus::Canceled,
        OrderStatus::Refunded,
    ];

    /// Wire code for this status (kebab-case)
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Cooking => "cooking",
            OrderStatus::ReadyForDelivery => "ready-for-delivery",
            OrderStatus::OnTheWay => "on-the-way",
            OrderStatus::Delivered => "delivered",
            OrderStatus::DineIn => "dine-in",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Draft => "draft",
        }
    }

    /// Parse a raw status code; `None` for codes this panel does not know
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "accepted" => Some(OrderStatus::Accepted),
            "cooking" => Some(OrderStatus::Cooking),
            "ready-for-delivery" => Some(OrderStatus::ReadyForDelivery),
            "on-the-way" => Some(OrderStatus::OnTheWay),
            "delivered" => Some(OrderStatus::Delivered),
            "dine-in" => Some(OrderStatus::DineIn),
            "canceled" => Some(OrderStatus::Canceled),
            "refunded" => Some(OrderStatus::Refunded),
            "draft" => Some(OrderStatus::Draft),
            _ => None,
        }
    }

    /// Label shown on status badges
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Accepted => "Accepted",
            OrderStatus::Cooking => "Cooking",
            OrderStatus::ReadyForDelivery => "Ready for Delivery",
            OrderStatus::OnTheWay => "On the Way",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::DineIn => "Dine-In",
            OrderStatus::Canceled => "Canceled",
            OrderStatus::Refunded => "Refunded",
            OrderStatus::Draft => "Draft",
        }
    }
}

/// Display label for a raw status code.
///
/// Unknown legacy codes are shown capitalized as-is instead of being hidden.
pub fn status_label(code: &str) -> String {
    match OrderStatus::from_code(code) {
        Some(status) => status.label().to_string(),
        None => {
            let mut chars = code.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        }
    }
}

/// Geographic point for the delivery map pin
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Order line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderItem {
    /// Product reference (`productId` in older records)
    pub id: String,
    pub name: String,
    /// Unit price in currency unit (`priceAtPurchase` in older records)
    pub price: f64,
    pub quantity: i64,
    pub image: String,
    pub variations: Vec<serde_json::Value>,
    pub addons: Vec<serde_json::Value>,
    /// Line total; `price * quantity` unless the source record carried its own
    pub subtotal: f64,
}

/// Canonical order document
///
/// Every field has a deterministic default, so any raw record normalizes to
/// exactly one of these. Timestamps serialize as RFC 3339.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub owner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    pub delivery_instructions: String,
    pub coordinates: Coordinates,
    /// Raw status code; unknown legacy codes survive normalization unchanged
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub total: f64,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub tip_amount: f64,
    pub items: Vec<OrderItem>,
    pub notes: String,
    pub order_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_confirmed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_confirmed_at: Option<DateTime<Utc>>,
    pub restaurant_id: String,
    pub order_type: String,
}

impl Order {
    /// Known status for this order, when the code is recognized
    pub fn status_enum(&self) -> Option<OrderStatus> {
        OrderStatus::from_code(&self.status)
    }

    /// Label for the status badge
    pub fn status_label(&self) -> String {
        status_label(&self.status)
    }
}

/// Order enriched with the owning account's contact info (global listings)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithOwner {
    #[serde(flatten)]
    pub order: Order,
    pub owner_name: String,
    pub owner_email: String,
}

/// Per-status order counts
///
/// Serializes flat: `{"pending": 2, "delivered": 1, "total": 3}`. Orders
/// whose status code is not a known [`OrderStatus`] are excluded from both
/// the per-status counts and `total`, so the counts always sum to `total`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OrderStatistics {
    #[serde(flatten)]
    pub by_status: BTreeMap<String, u64>,
    pub total: u64,
    /// Set when a best-effort aggregation had to skip unreadable partitions
    #[serde(default, skip_serializing_if = "is_false")]
    pub partial: bool,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl OrderStatistics {
    /// Count one order under its raw status code
    pub fn record(&mut self, code: &str) {
        if let Some(status) = OrderStatus::from_code(code) {
            *self
                .by_status
                .entry(status.as_str().to_string())
                .or_insert(0) += 1;
            self.total += 1;
        }
    }

    /// Fold another partition's counts into this one
    pub fn merge(&mut self, other: OrderStatistics) {
        for (code, count) in other.by_status {
            *self.by_status.entry(code).or_insert(0) += count;
        }
        self.total += other.total;
        self.partial = self.partial || other.partial;
    }

    /// Count for a single status code
    pub fn count(&self, status: OrderStatus) -> u64 {
        self.by_status.get(status.as_str()).copied().unwrap_or(0)
    }
}
