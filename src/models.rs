//! Domain types for the self-order gateway.
//!
//! Plain entities mirroring the backend's order store, plus the small
//! enumerations (ordering mode, settlement mode, payment status) the
//! resolver and order flows branch on.

use serde::{Deserialize, Serialize};

/// Operating mode of a self-order endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderingMode {
    Mobile,
    Kiosk,
    Nothing,
    Consultation,
}

impl OrderingMode {
    /// Parse a stored mode string. Unknown values degrade to `Nothing`
    /// (self-ordering disabled) rather than failing the read.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "mobile" => OrderingMode::Mobile,
            "kiosk" => OrderingMode::Kiosk,
            "consultation" => OrderingMode::Consultation,
            _ => OrderingMode::Nothing,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderingMode::Mobile => "mobile",
            OrderingMode::Kiosk => "kiosk",
            OrderingMode::Nothing => "nothing",
            OrderingMode::Consultation => "consultation",
        }
    }

    /// Modes that serve customers directly (redirect targets).
    pub fn is_self_service(&self) -> bool {
        matches!(self, OrderingMode::Mobile | OrderingMode::Kiosk)
    }
}

/// When the customer settles: after every meal, or once per order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayAfter {
    Meal,
    Each,
}

impl PayAfter {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "each" => PayAfter::Each,
            _ => PayAfter::Meal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayAfter::Meal => "meal",
            PayAfter::Each => "each",
        }
    }

    /// Settlement modes offered in configuration, with display labels.
    /// Both options are always selectable.
    pub fn selection() -> Vec<(PayAfter, &'static str)> {
        vec![(PayAfter::Meal, "After each meal"), (PayAfter::Each, "Once per order")]
    }
}

/// One kiosk/mobile self-ordering endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfOrderConfig {
    pub id: i64,
    pub name: String,
    pub ordering_mode: OrderingMode,
    pub pay_after: PayAfter,
    /// Opaque credential granting customer-session access. May be empty.
    pub access_token: String,
}

/// Payment status of an order. `Paid` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "paid" => PaymentStatus::Paid,
            _ => PaymentStatus::Unpaid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
        }
    }
}

/// Order header as stored. Lines live in `OrderLine`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub config_id: i64,
    /// Human-facing tracking reference, e.g. "Self-Order 00003-001-0048".
    pub order_number: String,
    /// Number of ordering sessions so far; starts at 1, incremented each
    /// time the customer continues ordering.
    pub session_count: u32,
    pub payment_status: PaymentStatus,
    /// Whether the order has been sent to the kitchen at least once.
    pub submitted: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Order {
    pub fn is_unpaid(&self) -> bool {
        self.payment_status == PaymentStatus::Unpaid
    }
}

/// One line of an order, tagged with the session it was added in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    /// 1-based session tag; never exceeds the order's `session_count`.
    pub session: u32,
    pub product_name: String,
    pub quantity: f64,
    pub unit_price: f64,
    /// Insertion order within the whole order.
    pub position: i64,
}

impl OrderLine {
    /// quantity × unit price.
    pub fn line_total(&self) -> f64 {
        self.quantity * self.unit_price
    }
}
