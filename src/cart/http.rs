//! HTTP implementation of the cart API
//!
//! Uses a blocking `ureq` agent driven from `spawn_blocking`. Status codes
//! are interpreted here instead of being surfaced as transport errors, so
//! validation rejections can be read from the response body.

use crate::cart::api::{
    CartApi, CartPayload, CartResponse, StatusResponse, UpdateReply, UpdateResponse,
};
use crate::cart::line::LineId;
use crate::config::schema::ApiConfig;
use crate::error::{CartError, CartResult};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Statuses that carry a validation rejection body
const VALIDATION_STATUSES: [u16; 3] = [400, 409, 422];

#[derive(Serialize)]
struct UpdateBody {
    quantity: u32,
}

/// Cart API client over HTTPS with a cookie session
#[derive(Clone)]
pub struct HttpCartApi {
    agent: ureq::Agent,
    base_url: String,
    session_cookie: Option<String>,
}

impl HttpCartApi {
    /// Create a client from API settings
    pub fn new(config: &ApiConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_millis(config.timeout_ms)))
            .http_status_as_error(false)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session_cookie: config.session_cookie.clone(),
        }
    }

    fn cart_url(&self) -> String {
        format!("{}/cart", self.base_url)
    }

    fn item_url(&self, id: &LineId) -> String {
        format!("{}/cart/items/{}", self.base_url, urlencoding::encode(id.as_str()))
    }
}

#[async_trait]
impl CartApi for HttpCartApi {
    async fn fetch_cart(&self) -> CartResult<CartPayload> {
        let agent = self.agent.clone();
        let url = self.cart_url();
        let cookie = self.session_cookie.clone();
        let request_id = Uuid::new_v4();

        debug!(%request_id, "GET {}", url);
        blocking(move || {
            let context = "fetching cart";
            let mut response = with_headers(agent.get(&url), cookie.as_deref(), request_id)
                .call()
                .map_err(|e| transport_error(context, e))?;
            let status = response.status().as_u16();
            debug!(%request_id, status, "GET /cart answered");

            if !(200..300).contains(&status) {
                return Err(api_error(status, context, &mut response));
            }

            let body: CartResponse = response
                .body_mut()
                .read_json()
                .map_err(|e| CartError::decode(context, e.to_string()))?;
            if !body.success {
                return Err(CartError::Api {
                    status,
                    context: context.to_string(),
                    message: body
                        .message
                        .unwrap_or_else(|| "Cart request failed".to_string()),
                });
            }

            Ok(CartPayload::from(body))
        })
        .await
    }

    async fn update_item(&self, id: &LineId, quantity: u32) -> CartResult<UpdateReply> {
        let agent = self.agent.clone();
        let url = self.item_url(id);
        let cookie = self.session_cookie.clone();
        let request_id = Uuid::new_v4();
        let context = format!("updating line {}", id);

        debug!(%request_id, line = %id, quantity, "PUT {}", url);
        blocking(move || {
            let mut response = with_headers(agent.put(&url), cookie.as_deref(), request_id)
                .send_json(UpdateBody { quantity })
                .map_err(|e| transport_error(&context, e))?;
            let status = response.status().as_u16();
            debug!(%request_id, status, "PUT answered");

            if status == 404 {
                return Ok(UpdateReply::Gone);
            }
            let validation = VALIDATION_STATUSES.contains(&status);
            if !(200..300).contains(&status) && !validation {
                return Err(api_error(status, &context, &mut response));
            }

            let mut body: UpdateResponse = response
                .body_mut()
                .read_json()
                .map_err(|e| CartError::decode(&context, e.to_string()))?;
            if validation {
                body.success = false;
            }

            Ok(body.into_reply())
        })
        .await
    }

    async fn remove_item(&self, id: &LineId) -> CartResult<()> {
        let agent = self.agent.clone();
        let url = self.item_url(id);
        let cookie = self.session_cookie.clone();
        let request_id = Uuid::new_v4();
        let context = format!("removing line {}", id);

        debug!(%request_id, line = %id, "DELETE {}", url);
        blocking(move || {
            let mut response = with_headers(agent.delete(&url), cookie.as_deref(), request_id)
                .call()
                .map_err(|e| transport_error(&context, e))?;
            let status = response.status().as_u16();
            debug!(%request_id, status, "DELETE answered");

            match status {
                // Already gone is as good as deleted
                404 => Ok(()),
                200..=299 => {
                    let body: StatusResponse = response
                        .body_mut()
                        .read_json()
                        .map_err(|e| CartError::decode(&context, e.to_string()))?;
                    if body.success {
                        Ok(())
                    } else {
                        Err(CartError::Api {
                            status,
                            context,
                            message: body
                                .message
                                .unwrap_or_else(|| "Delete not accepted".to_string()),
                        })
                    }
                }
                _ => Err(api_error(status, &context, &mut response)),
            }
        })
        .await
    }
}

/// Run a blocking request off the async runtime
async fn blocking<T, F>(f: F) -> CartResult<T>
where
    F: FnOnce() -> CartResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CartError::Internal(format!("Request task failed: {}", e)))?
}

fn with_headers<B>(
    request: ureq::RequestBuilder<B>,
    cookie: Option<&str>,
    request_id: Uuid,
) -> ureq::RequestBuilder<B> {
    let request = request
        .header("Accept", "application/json")
        .header("X-Request-Id", request_id.to_string());
    match cookie {
        Some(cookie) => request.header("Cookie", cookie),
        None => request,
    }
}

fn transport_error(context: &str, err: ureq::Error) -> CartError {
    match err {
        ureq::Error::Timeout(_) => CartError::Timeout(context.to_string()),
        other => CartError::network(context, other.to_string()),
    }
}

fn api_error(
    status: u16,
    context: &str,
    response: &mut ureq::http::Response<ureq::Body>,
) -> CartError {
    let message = response
        .body_mut()
        .read_json::<StatusResponse>()
        .ok()
        .and_then(|body| body.message)
        .or_else(|| response.status().canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "Unexpected response".to_string());

    CartError::Api {
        status,
        context: context.to_string(),
        message,
    }
}
