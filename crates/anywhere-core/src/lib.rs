use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

mod classify;
mod config;
mod error;

pub use classify::classify;
pub use config::{
    AppConfig, BACKEND_URL_ENV, BackendConfig, DispatchConfig, SuggestionsConfig, UiConfig,
};
pub use error::{DispatchError, extract_detail};

pub type Result<T> = anyhow::Result<T>;

/// Message shown when a failed dispatch carries no usable `detail`.
pub const GENERIC_DISPATCH_ERROR: &str = "Failed to load website";

/// Suggestions are only looked up for queries strictly longer than two characters.
pub const MIN_SUGGESTION_QUERY_CHARS: usize = 3;

/// Pre-built portals the backend serves verbatim; the client only links them.
pub const PORTALS: &[(&str, &str)] = &[("gnmath", "/gnmath-proxy"), ("clever", "/clever-proxy")];

pub fn runtime_dir(workspace: &Path) -> PathBuf {
    workspace.join(".anywhere")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// A website location to fetch and display.
    Address,
    /// Free text resolved through the backend's search capability.
    Query,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Address => "address",
            Classification::Query => "query",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The "Enhanced Mode" toggle. Only changes which direct endpoint is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    #[default]
    Standard,
    Enhanced,
}

impl ProxyMode {
    pub fn from_enhanced(enhanced: bool) -> Self {
        if enhanced {
            ProxyMode::Enhanced
        } else {
            ProxyMode::Standard
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ProxyMode::Standard => ProxyMode::Enhanced,
            ProxyMode::Enhanced => ProxyMode::Standard,
        }
    }
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyMode::Standard => f.write_str("standard"),
            ProxyMode::Enhanced => f.write_str("enhanced"),
        }
    }
}

/// Whether the backend or the client decides how input is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStrategy {
    /// Everything goes to `/smart-proxy`, which routes server-side.
    Smart,
    /// Addresses go straight to `/proxy` or `/proxy-enhanced`.
    #[default]
    Direct,
}

impl DispatchStrategy {
    pub fn toggled(self) -> Self {
        match self {
            DispatchStrategy::Smart => DispatchStrategy::Direct,
            DispatchStrategy::Direct => DispatchStrategy::Smart,
        }
    }
}

impl fmt::Display for DispatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchStrategy::Smart => f.write_str("smart"),
            DispatchStrategy::Direct => f.write_str("direct"),
        }
    }
}

impl std::str::FromStr for DispatchStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smart" => Ok(DispatchStrategy::Smart),
            "direct" => Ok(DispatchStrategy::Direct),
            other => Err(anyhow::anyhow!(
                "unknown dispatch strategy '{other}' (expected smart or direct)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Endpoint {
    Proxy,
    ProxyEnhanced,
    SmartProxy,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Proxy => "/proxy",
            Endpoint::ProxyEnhanced => "/proxy-enhanced",
            Endpoint::SmartProxy => "/smart-proxy",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Pick the backend endpoint for a classified input.
///
/// Queries always go to `/smart-proxy`: it is the only capability that
/// resolves free text. The proxy mode only matters for direct addresses.
pub fn route(
    classification: Classification,
    strategy: DispatchStrategy,
    mode: ProxyMode,
) -> Endpoint {
    match (strategy, classification, mode) {
        (DispatchStrategy::Smart, _, _) => Endpoint::SmartProxy,
        (DispatchStrategy::Direct, Classification::Query, _) => Endpoint::SmartProxy,
        (DispatchStrategy::Direct, Classification::Address, ProxyMode::Standard) => Endpoint::Proxy,
        (DispatchStrategy::Direct, Classification::Address, ProxyMode::Enhanced) => {
            Endpoint::ProxyEnhanced
        }
    }
}

/// Outcome slot of the proxy dispatcher. Exactly one variant is active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ProxyResult {
    #[default]
    Empty,
    Loading,
    Content {
        html: String,
        source_input: String,
        classification: Classification,
    },
    Error {
        message: String,
    },
}

impl ProxyResult {
    pub fn is_loading(&self) -> bool {
        matches!(self, ProxyResult::Loading)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    #[default]
    Idle,
    Typing,
    Loading,
    Content,
    Error,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Typing => "typing",
            SessionPhase::Loading => "loading",
            SessionPhase::Content => "content",
            SessionPhase::Error => "error",
        })
    }
}

pub fn is_valid_phase_transition(from: SessionPhase, to: SessionPhase) -> bool {
    if from == to {
        return true;
    }
    if to == SessionPhase::Idle {
        return true;
    }
    match from {
        SessionPhase::Idle => matches!(to, SessionPhase::Typing),
        SessionPhase::Typing => matches!(to, SessionPhase::Loading),
        SessionPhase::Loading => matches!(to, SessionPhase::Content | SessionPhase::Error),
        SessionPhase::Content | SessionPhase::Error => {
            matches!(to, SessionPhase::Typing | SessionPhase::Loading)
        }
    }
}

/// One proxy request, tagged with the session-local sequence number that
/// decides whether its outcome is still wanted when it arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchTicket {
    pub seq: u64,
    pub endpoint: Endpoint,
    pub input: String,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub game_url: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Body of `POST /games`; the backend assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGame {
    pub title: String,
    pub description: String,
    pub category: String,
    pub game_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_table() {
        use Classification::*;
        use DispatchStrategy::*;
        use ProxyMode::*;

        assert_eq!(route(Address, Direct, Standard), Endpoint::Proxy);
        assert_eq!(route(Address, Direct, Enhanced), Endpoint::ProxyEnhanced);
        assert_eq!(route(Query, Direct, Standard), Endpoint::SmartProxy);
        assert_eq!(route(Query, Direct, Enhanced), Endpoint::SmartProxy);
        assert_eq!(route(Address, Smart, Enhanced), Endpoint::SmartProxy);
        assert_eq!(route(Query, Smart, Standard), Endpoint::SmartProxy);
    }

    #[test]
    fn phase_transitions_follow_the_lifecycle() {
        use SessionPhase::*;

        assert!(is_valid_phase_transition(Idle, Typing));
        assert!(is_valid_phase_transition(Typing, Loading));
        assert!(is_valid_phase_transition(Loading, Content));
        assert!(is_valid_phase_transition(Loading, Error));
        assert!(is_valid_phase_transition(Content, Typing));
        assert!(is_valid_phase_transition(Error, Loading));
        assert!(is_valid_phase_transition(Loading, Idle));

        assert!(!is_valid_phase_transition(Idle, Loading));
        assert!(!is_valid_phase_transition(Idle, Content));
        assert!(!is_valid_phase_transition(Typing, Error));
        assert!(!is_valid_phase_transition(Loading, Typing));
    }

    #[test]
    fn proxy_result_serializes_with_state_tag() {
        let value = serde_json::to_value(ProxyResult::Content {
            html: "<h1>Reddit</h1>".to_string(),
            source_input: "reddit.com".to_string(),
            classification: Classification::Address,
        })
        .expect("serialize");
        assert_eq!(value["state"], "content");
        assert_eq!(value["classification"], "address");

        let empty = serde_json::to_value(ProxyResult::Empty).expect("serialize");
        assert_eq!(empty["state"], "empty");
    }

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!(
            " Smart ".parse::<DispatchStrategy>().expect("parse"),
            DispatchStrategy::Smart
        );
        assert!("sideways".parse::<DispatchStrategy>().is_err());
    }

    #[test]
    fn game_entry_tolerates_missing_thumbnail() {
        let game: GameEntry = serde_json::from_str(
            r#"{"id":"1","title":"2048","description":"Slide tiles","category":"Puzzle","game_url":"https://play2048.co/"}"#,
        )
        .expect("parse game");
        assert_eq!(game.thumbnail, None);
        assert_eq!(game.category, "Puzzle");
    }
}
