//! Outbound transport to gateway HTTP APIs.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::GatewayError;

/// Posts a signed form to a gateway endpoint and returns the parsed
/// key-value response.
///
/// Adapters bound every call with their configured timeout; a transport
/// does not need to enforce one itself.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn post_form(
        &self,
        endpoint: &str,
        params: BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, GatewayError>;
}

#[derive(Debug, Default)]
struct TransportState {
    response: BTreeMap<String, String>,
    requests: Vec<(String, BTreeMap<String, String>)>,
    unavailable: bool,
    delay: Option<Duration>,
}

/// In-memory transport for testing and default wiring.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGatewayTransport {
    state: Arc<RwLock<TransportState>>,
}

impl InMemoryGatewayTransport {
    /// Creates a new transport that answers with an empty response map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the response map returned by subsequent calls.
    pub fn set_response(&self, response: BTreeMap<String, String>) {
        self.state.write().unwrap().response = response;
    }

    /// Configures the transport to fail calls as unavailable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unwrap().unavailable = unavailable;
    }

    /// Delays each call, for exercising caller-side timeouts.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().unwrap().delay = delay;
    }

    /// Returns every request posted so far.
    pub fn requests(&self) -> Vec<(String, BTreeMap<String, String>)> {
        self.state.read().unwrap().requests.clone()
    }
}

#[async_trait]
impl GatewayTransport for InMemoryGatewayTransport {
    async fn post_form(
        &self,
        endpoint: &str,
        params: BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, GatewayError> {
        let (delay, unavailable, response) = {
            let mut state = self.state.write().unwrap();
            state.requests.push((endpoint.to_string(), params));
            (state.delay, state.unavailable, state.response.clone())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if unavailable {
            return Err(GatewayError::Unavailable(format!(
                "connection to {endpoint} refused"
            )));
        }
        Ok(response)
    }
}
