//! Cart line records as exchanged with the cart API

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-issued identifier of a cart line
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(String);

impl LineId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LineId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for LineId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A single cart line
///
/// `unit_price` always comes from the server. `stock` is the catalog's
/// upper bound at fetch time and may be stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Line identifier
    pub line_id: LineId,

    /// Product reference (absent in update responses)
    #[serde(default)]
    pub product_id: String,

    /// Product display name, when the API includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Requested quantity
    pub quantity: u32,

    /// Price per unit
    pub unit_price: Decimal,

    /// Maximum quantity allowed for this line
    pub stock: u32,
}

impl CartLine {
    /// Create a line with an empty product reference
    pub fn new(line_id: impl Into<LineId>, quantity: u32, unit_price: Decimal, stock: u32) -> Self {
        Self {
            line_id: line_id.into(),
            product_id: String::new(),
            name: None,
            quantity,
            unit_price,
            stock,
        }
    }

    /// Set the product reference
    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = product_id.into();
        self
    }

    /// Whether `quantity` is an acceptable value for this line
    pub fn accepts(&self, quantity: u32) -> bool {
        (1..=self.stock).contains(&quantity)
    }

    /// Price of the whole line
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Label shown to the user
    pub fn label(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ if !self.product_id.is_empty() => &self.product_id,
            _ => self.line_id.as_str(),
        }
    }
}

/// Totals derived from the current snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    /// Sum of line quantities
    pub item_count: u64,

    /// Sum of line subtotals
    pub total_price: Decimal,

    /// Total reported by the server on the last fetch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_total: Option<Decimal>,
}
