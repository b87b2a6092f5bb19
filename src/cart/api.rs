//! Remote cart API abstraction
//!
//! The sync engine only talks to the server through [`CartApi`], so the
//! HTTP client can be swapped for a scripted one in tests.

use crate::cart::line::{CartLine, LineId};
use crate::error::CartResult;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Full cart as returned by `GET /cart`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartPayload {
    pub items: Vec<CartLine>,
    pub total_price: Option<Decimal>,
}

impl CartPayload {
    /// Find a single line in the payload
    pub fn line(&self, id: &LineId) -> Option<&CartLine> {
        self.items.iter().find(|l| &l.line_id == id)
    }
}

/// Server answer to a quantity update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateReply {
    /// The write was accepted; this is the authoritative line
    Confirmed(CartLine),
    /// The line no longer exists on the server
    Gone,
    /// The server refused the quantity
    Rejected {
        message: String,
        max_quantity: Option<u32>,
    },
}

/// Abstract remote cart interface
#[async_trait]
pub trait CartApi: Send + Sync {
    /// `GET /cart`
    async fn fetch_cart(&self) -> CartResult<CartPayload>;

    /// `PUT /cart/items/{lineId}`
    async fn update_item(&self, id: &LineId, quantity: u32) -> CartResult<UpdateReply>;

    /// `DELETE /cart/items/{lineId}`
    async fn remove_item(&self, id: &LineId) -> CartResult<()>;
}

/// Body of `PUT /cart/items/{lineId}` responses
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub line: Option<CartLine>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub max_quantity: Option<u32>,
}

impl UpdateResponse {
    pub(crate) fn into_reply(self) -> UpdateReply {
        match (self.success, self.line) {
            (true, Some(line)) => UpdateReply::Confirmed(line),
            (true, None) => UpdateReply::Gone,
            (false, _) => UpdateReply::Rejected {
                message: self
                    .message
                    .unwrap_or_else(|| "Quantity not accepted".to_string()),
                max_quantity: self.max_quantity,
            },
        }
    }
}

/// Body of `DELETE /cart/items/{lineId}` and error responses
#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SummaryResponse {
    pub total_price: Decimal,
}

/// Body of `GET /cart` responses
#[derive(Debug, Deserialize)]
pub(crate) struct CartResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub summary: Option<SummaryResponse>,
    #[serde(default)]
    pub message: Option<String>,
}

impl From<CartResponse> for CartPayload {
    fn from(response: CartResponse) -> Self {
        Self {
            items: response.items,
            total_price: response.summary.map(|s| s.total_price),
        }
    }
}
