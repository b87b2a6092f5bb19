//! Scripted in-memory cart API for tests

use crate::cart::api::{CartApi, CartPayload, UpdateReply};
use crate::cart::line::{CartLine, LineId};
use crate::error::{CartError, CartResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A request the mock received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch,
    Update(LineId, u32),
    Remove(LineId),
}

#[derive(Default)]
struct MockState {
    lines: Vec<CartLine>,
    calls: Vec<Call>,
    fail_updates: u32,
    fail_fetches: u32,
    fail_removes: u32,
    in_flight: HashMap<LineId, usize>,
    max_in_flight: usize,
}

/// Cart server double holding its own copy of the lines
pub struct MockCartApi {
    state: Mutex<MockState>,
    latency: Duration,
    fetch_latency: Duration,
}

impl MockCartApi {
    pub fn new(lines: Vec<CartLine>) -> Self {
        Self {
            state: Mutex::new(MockState {
                lines,
                ..MockState::default()
            }),
            latency: Duration::ZERO,
            fetch_latency: Duration::ZERO,
        }
    }

    /// Delay every write by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Answer fetches `latency` after reading the cart
    pub fn with_fetch_latency(mut self, latency: Duration) -> Self {
        self.fetch_latency = latency;
        self
    }

    pub fn fail_updates(&self, count: u32) {
        self.state.lock().unwrap().fail_updates = count;
    }

    pub fn fail_fetches(&self, count: u32) {
        self.state.lock().unwrap().fail_fetches = count;
    }

    pub fn fail_removes(&self, count: u32) {
        self.state.lock().unwrap().fail_removes = count;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Every update and removal, in arrival order
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Fetch))
            .collect()
    }

    /// Highest number of concurrent writes seen for any single line
    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    pub fn server_quantity(&self, id: &str) -> Option<u32> {
        let state = self.state.lock().unwrap();
        state
            .lines
            .iter()
            .find(|l| l.line_id.as_str() == id)
            .map(|l| l.quantity)
    }

    /// Change the stock the server enforces for a line
    pub fn set_stock(&self, id: &str, stock: u32) {
        let mut state = self.state.lock().unwrap();
        if let Some(line) = state.lines.iter_mut().find(|l| l.line_id.as_str() == id) {
            line.stock = stock;
        }
    }

    /// Forget a line server-side
    pub fn drop_line(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.lines.retain(|l| l.line_id.as_str() != id);
    }

    async fn write_started(&self, call: Call, id: &LineId) {
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call);
            let count = state.in_flight.entry(id.clone()).or_insert(0);
            *count += 1;
            let count = *count;
            state.max_in_flight = state.max_in_flight.max(count);
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(count) = state.in_flight.get_mut(id) {
            *count -= 1;
        }
    }
}

fn offline(context: &str) -> CartError {
    CartError::network(context, "connection refused")
}

#[async_trait]
impl CartApi for MockCartApi {
    async fn fetch_cart(&self) -> CartResult<CartPayload> {
        let answer = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Fetch);

            if state.fail_fetches > 0 {
                state.fail_fetches -= 1;
                Err(offline("fetching cart"))
            } else {
                let total = state.lines.iter().map(|l| l.subtotal()).sum();
                Ok(CartPayload {
                    items: state.lines.clone(),
                    total_price: Some(total),
                })
            }
        };

        if !self.fetch_latency.is_zero() {
            tokio::time::sleep(self.fetch_latency).await;
        }
        answer
    }

    async fn update_item(&self, id: &LineId, quantity: u32) -> CartResult<UpdateReply> {
        self.write_started(Call::Update(id.clone(), quantity), id).await;

        let mut state = self.state.lock().unwrap();
        if state.fail_updates > 0 {
            state.fail_updates -= 1;
            return Err(offline("updating line"));
        }

        let Some(line) = state.lines.iter_mut().find(|l| &l.line_id == id) else {
            return Ok(UpdateReply::Gone);
        };
        if quantity == 0 || quantity > line.stock {
            return Ok(UpdateReply::Rejected {
                message: format!("Only {} left in stock", line.stock),
                max_quantity: Some(line.stock),
            });
        }

        line.quantity = quantity;
        Ok(UpdateReply::Confirmed(line.clone()))
    }

    async fn remove_item(&self, id: &LineId) -> CartResult<()> {
        self.write_started(Call::Remove(id.clone()), id).await;

        let mut state = self.state.lock().unwrap();
        if state.fail_removes > 0 {
            state.fail_removes -= 1;
            return Err(offline("removing line"));
        }

        state.lines.retain(|l| &l.line_id != id);
        Ok(())
    }
}
