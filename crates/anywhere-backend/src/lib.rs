use anyhow::{Result, anyhow};
use anywhere_core::{
    BackendConfig, CategoryCount, DispatchError, DispatchTicket, GameEntry, NewGame,
    extract_detail,
};
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::error::Error as StdError;
use std::time::Duration;

/// The two backend capabilities the session workflow depends on.
///
/// Calls block; the session driver runs them off the UI thread.
pub trait ProxyBackend: Send + Sync {
    /// Send one proxy request. A 2xx body comes back verbatim.
    fn dispatch(&self, ticket: &DispatchTicket) -> std::result::Result<String, DispatchError>;

    /// Look up search suggestions for `query`. Any failure is an `Err`; the
    /// caller decides how to degrade.
    fn suggestions(&self, query: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct SuggestionsPayload {
    suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    message: String,
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    cfg: BackendConfig,
    client: Client,
}

impl HttpBackend {
    pub fn new(cfg: BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .user_agent(cfg.user_agent.clone())
            .build()?;
        Ok(Self { cfg, client })
    }

    /// `GET /`: the backend greeting, used as a health check.
    pub fn health(&self) -> Result<String> {
        let url = self.url("/", &[])?;
        let payload: MessagePayload = self.send_json(self.client.get(url))?;
        Ok(payload.message)
    }

    pub fn games(&self, category: Option<&str>) -> Result<Vec<GameEntry>> {
        let params: Vec<(&str, &str)> = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| vec![("category", c)])
            .unwrap_or_default();
        let url = self.url("/games", &params)?;
        self.send_json(self.client.get(url))
    }

    pub fn categories(&self) -> Result<Vec<CategoryCount>> {
        let url = self.url("/games/categories", &[])?;
        self.send_json(self.client.get(url))
    }

    /// Replace the whole catalog with the backend's built-in defaults.
    pub fn init_default_games(&self) -> Result<String> {
        let url = self.url("/games/init-defaults", &[])?;
        let payload: MessagePayload = self.send_json(self.client.post(url))?;
        Ok(payload.message)
    }

    pub fn add_game(&self, game: &NewGame) -> Result<GameEntry> {
        let url = self.url("/games", &[])?;
        self.send_json(self.client.post(url).json(game))
    }

    pub fn delete_game(&self, id: &str) -> Result<String> {
        let mut url = self.url("/games", &[])?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("backend url '{}' cannot address a game", self.cfg.base_url))?
            .push(id);
        let payload: MessagePayload = self.send_json(self.client.delete(url))?;
        Ok(payload.message)
    }

    /// Absolute URL of a portal page the backend serves as-is.
    pub fn portal_url(&self, path: &str) -> String {
        self.cfg.endpoint_url(path)
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let raw = self.cfg.endpoint_url(path);
        let url = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        url.map_err(|e| anyhow!("invalid backend url '{raw}': {e}"))
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let resp = request
            .send()
            .map_err(|e| anyhow!(format_transport_error(&e)))?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            let detail = extract_detail(&body).unwrap_or_else(|| body.chars().take(200).collect());
            return Err(anyhow!(
                "backend error (HTTP {}): {}",
                status.as_u16(),
                detail
            ));
        }
        serde_json::from_str(&body).map_err(|e| anyhow!("unexpected backend payload: {e}"))
    }
}

impl ProxyBackend for HttpBackend {
    fn dispatch(&self, ticket: &DispatchTicket) -> std::result::Result<String, DispatchError> {
        let url = self.cfg.endpoint_url(ticket.endpoint.path());
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "url": ticket.input }))
            .send()
            .map_err(|e| DispatchError::Transport(format_transport_error(&e)))?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| DispatchError::Body(e.to_string()))?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(DispatchError::from_response(status.as_u16(), &body))
        }
    }

    fn suggestions(&self, query: &str) -> Result<Vec<String>> {
        let url = self.url("/search-suggestions", &[("q", query)])?;
        let payload: SuggestionsPayload = self.send_json(self.client.get(url))?;
        Ok(payload.suggestions)
    }
}

/// Describe a transport failure in terms a user can act on.
fn format_transport_error(err: &reqwest::Error) -> String {
    let inner_msg = err
        .source()
        .map(|e| e.to_string())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let is_dns = inner_msg.contains("dns")
        || inner_msg.contains("resolve")
        || inner_msg.contains("name or service not known")
        || inner_msg.contains("no such host");

    if err.is_timeout() {
        "request timed out; the backend did not respond in time (see backend.timeout_seconds)"
            .to_string()
    } else if is_dns {
        "DNS resolution failed; could not resolve the backend hostname".to_string()
    } else if err.is_connect() {
        "connection refused; could not reach the backend at the configured base_url".to_string()
    } else {
        format!("network error: {err}")
    }
}
