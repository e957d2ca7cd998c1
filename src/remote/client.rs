//! PostgREST RPC client.
//!
//! Every procedure is invoked as `POST {base}/rest/v1/rpc/{name}` with the
//! anon key in both the `apikey` and bearer headers.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::BackendConfig;
use crate::gate::code::AccessCode;
use crate::gate::outcome::RawVerificationRow;
use crate::remote::{RemoteAuthority, RemoteError};

/// Error body returned by PostgREST.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Remote authority reached over HTTP.
#[derive(Clone)]
pub struct PostgrestClient {
    http: reqwest::Client,
    base_url: Option<String>,
    anon_key: SecretString,
    login_rpc: String,
    verify_rpc: String,
}

impl PostgrestClient {
    pub fn from_config(config: &BackendConfig) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        if config.base_url().is_none() {
            tracing::warn!("Backend URL not configured; remote calls will fail");
        }

        Ok(Self {
            http,
            base_url: config
                .base_url()
                .map(|url| url.trim_end_matches('/').to_string()),
            anon_key: SecretString::from(config.anon_key.clone()),
            login_rpc: config.login_rpc.clone(),
            verify_rpc: config.verify_rpc.clone(),
        })
    }

    fn rpc_url(&self, name: &str) -> Result<String, RemoteError> {
        let base = self.base_url.as_deref().ok_or(RemoteError::NotConfigured)?;
        Ok(format!("{base}/rest/v1/rpc/{name}"))
    }

    fn headers(&self) -> Result<HeaderMap, RemoteError> {
        let key = self.anon_key.expose_secret();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if !key.is_empty() {
            let invalid = |_| RemoteError::Transport("anon key is not a valid header value".into());
            let mut apikey = HeaderValue::from_str(key).map_err(invalid)?;
            apikey.set_sensitive(true);
            let mut bearer = HeaderValue::from_str(&format!("Bearer {key}")).map_err(invalid)?;
            bearer.set_sensitive(true);
            headers.insert("apikey", apikey);
            headers.insert(AUTHORIZATION, bearer);
        }
        Ok(headers)
    }

    /// Invoke a procedure and return its JSON result.
    async fn call(&self, name: &str, args: Value) -> Result<Value, RemoteError> {
        let url = self.rpc_url(name)?;
        tracing::debug!(rpc = %name, "Calling remote procedure");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&args)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let err = RemoteError::Remote {
            status: status.as_u16(),
            code: body.code,
            message: body.message.unwrap_or(text),
        };
        tracing::error!(rpc = %name, error = %err, "Remote procedure failed");
        Err(err)
    }
}

impl RemoteAuthority for PostgrestClient {
    async fn validate_credentials(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<bool, RemoteError> {
        let args = json!({
            "p_mail": email,
            "p_password": password.expose_secret(),
        });
        let result = self.call(&self.login_rpc, args).await?;
        Ok(result == Value::Bool(true))
    }

    async fn verify_code(
        &self,
        code: &AccessCode,
        operator_email: &str,
    ) -> Result<Vec<RawVerificationRow>, RemoteError> {
        let args = json!({
            "p_codigo": code.as_str(),
            "p_counter_email": operator_email,
        });
        match self.call(&self.verify_rpc, args).await? {
            Value::Array(rows) => Ok(rows.into_iter().map(row_from_value).collect()),
            other => {
                tracing::warn!(kind = %json_kind(&other), "Verify procedure returned a non-array; treating as no rows");
                Ok(Vec::new())
            }
        }
    }
}

/// A row that is not an object carries no columns, so it normalizes to a
/// generic denial.
fn row_from_value(value: Value) -> RawVerificationRow {
    match value {
        Value::Object(map) => RawVerificationRow::from(map),
        other => {
            tracing::warn!(kind = %json_kind(&other), "Verify procedure returned a non-object row");
            RawVerificationRow::from(Map::new())
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl std::fmt::Debug for PostgrestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgrestClient")
            .field("base_url", &self.base_url)
            .field("login_rpc", &self.login_rpc)
            .field("verify_rpc", &self.verify_rpc)
            .finish_non_exhaustive()
    }
}
