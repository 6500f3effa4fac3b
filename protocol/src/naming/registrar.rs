//! Off-chain subdomain registrar client.
//!
//! The registrar batches subdomain registrations into on-chain
//! transactions. It exposes a status lookup and a single submission
//! endpoint; neither is retried here.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{REGISTRAR_NOT_REGISTERED, ZONEFILE_TTL_SECS};
use crate::error::CruxError;
use crate::network::transport::{join_url, JsonResponse, JsonTransport};

pub struct RegistrarClient {
    transport: Arc<dyn JsonTransport>,
    base_url: String,
}

impl RegistrarClient {
    pub fn new(transport: Arc<dyn JsonTransport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Zonefile pointing a subdomain at its storage hub.
    pub fn zonefile(name: &str, write_url: &str) -> String {
        format!("$ORIGIN {name}\n$TTL {ZONEFILE_TTL_SECS}\n_https._tcp URI 10 1 {write_url}")
    }

    /// The registrar's free-text status for `subdomain`, if it sent one.
    pub async fn status(&self, subdomain: &str) -> Result<Option<String>, CruxError> {
        let url = join_url(&self.base_url, &format!("status/{subdomain}"));
        debug!(%url, "registrar status query");
        let response = self
            .transport
            .get(&url)
            .await
            .map_err(|e| CruxError::RegistrarUnreachable(e.to_string()))?;
        if !response.is_success() {
            return Err(http_failure(&url, &response));
        }
        Ok(response.str_field("status").map(str::to_string))
    }

    /// True iff the registrar has never seen `subdomain`.
    pub async fn is_available(&self, subdomain: &str) -> Result<bool, CruxError> {
        Ok(self.status(subdomain).await?.as_deref() == Some(REGISTRAR_NOT_REGISTERED))
    }

    /// Submit a registration. Succeeds only on an explicit `status: true`.
    pub async fn register(
        &self,
        name: &str,
        owner_address: &str,
        write_url: &str,
    ) -> Result<(), CruxError> {
        let url = join_url(&self.base_url, "register");
        let body = json!({
            "name": name,
            "owner_address": owner_address,
            "zonefile": Self::zonefile(name, write_url),
        });
        debug!(%url, %name, %owner_address, "submitting registration");
        let response = self
            .transport
            .post(&url, &body, None)
            .await
            .map_err(|e| CruxError::RegistrarUnreachable(e.to_string()))?;
        if !response.is_success() {
            return Err(http_failure(&url, &response));
        }

        let acknowledged = response
            .body
            .as_ref()
            .and_then(|b| b.get("status"))
            .and_then(Value::as_bool)
            == Some(true);
        if !acknowledged {
            let raw = response
                .body
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_else(|| format!("<status {} with no JSON body>", response.status));
            return Err(CruxError::RegistrationAcknowledgementFailed { response: raw });
        }
        info!(%name, "registrar accepted registration");
        Ok(())
    }
}

/// A non-2xx answer is an infrastructure failure, never a registrar verdict.
fn http_failure(url: &str, response: &JsonResponse) -> CruxError {
    warn!(%url, status = response.status, "registrar answered with an HTTP error");
    CruxError::RegistrarUnreachable(format!(
        "{url} answered status {}: {}",
        response.status,
        response.body_text()
    ))
}
