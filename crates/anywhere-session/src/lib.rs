//! The classify/suggest/dispatch workflow behind the address bar.
//!
//! [`Session`] is plain state owned by one thread. It never performs I/O:
//! operations that need the backend return an [`Effect`], and the outcome
//! comes back later as a [`SessionEvent`] passed to [`Session::apply`].
//! [`SessionDriver`] is the stock way to run effects on worker threads.

use anywhere_core::{
    Classification, DispatchConfig, DispatchError, DispatchStrategy, DispatchTicket, Endpoint,
    ProxyMode, ProxyResult, SessionPhase, SuggestionsConfig, is_valid_phase_transition,
};
use serde::Serialize;
use std::time::Instant;

mod dispatch;
mod driver;
mod suggest;

pub use dispatch::{InFlight, ProxyDispatcher, resolve_route};
pub use driver::SessionDriver;
pub use suggest::{SuggestionOutcome, SuggestionProvider, wants_lookup};

/// Caller-supplied toggles. They only pick the endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSettings {
    pub mode: ProxyMode,
    pub strategy: DispatchStrategy,
}

impl From<&DispatchConfig> for SessionSettings {
    fn from(cfg: &DispatchConfig) -> Self {
        Self {
            mode: cfg.mode(),
            strategy: cfg.strategy,
        }
    }
}

/// I/O the session wants performed on its behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchSuggestions { query: String },
    Dispatch(DispatchTicket),
}

/// Completion of an [`Effect`], fed back through [`Session::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SuggestionsSettled {
        query: String,
        outcome: Result<Vec<String>, String>,
    },
    DispatchSettled {
        seq: u64,
        outcome: Result<String, DispatchError>,
    },
}

/// How [`Session::apply`] used an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Suggestions,
    SuggestionsFailed,
    Content,
    Error,
    /// Superseded before it arrived; dropped without touching state.
    Stale,
}

/// Everything a view needs to render, detached from the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub input: String,
    pub classification: Classification,
    pub endpoint: Endpoint,
    pub suggestions: Vec<String>,
    pub suggestions_visible: bool,
    pub highlighted: Option<usize>,
    pub result: ProxyResult,
    pub phase: SessionPhase,
    pub mode: ProxyMode,
    pub strategy: DispatchStrategy,
}

#[derive(Debug, Clone)]
pub struct Session {
    input: String,
    result: ProxyResult,
    phase: SessionPhase,
    settings: SessionSettings,
    suggestions: SuggestionProvider,
    dispatcher: ProxyDispatcher,
}

impl Session {
    pub fn new(settings: SessionSettings, suggestions: SuggestionsConfig) -> Self {
        Self {
            input: String::new(),
            result: ProxyResult::Empty,
            phase: SessionPhase::Idle,
            settings,
            suggestions: SuggestionProvider::new(suggestions),
            dispatcher: ProxyDispatcher::default(),
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Classification of what a submit would send. Recomputed on every call.
    pub fn classification(&self) -> Classification {
        self.route().0
    }

    pub fn suggestions(&self) -> &[String] {
        self.suggestions.items()
    }

    pub fn suggestions_visible(&self) -> bool {
        self.suggestions.is_visible()
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.suggestions.highlighted()
    }

    pub fn result(&self) -> &ProxyResult {
        &self.result
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub fn set_mode(&mut self, mode: ProxyMode) {
        self.settings.mode = mode;
    }

    pub fn set_strategy(&mut self, strategy: DispatchStrategy) {
        self.settings.strategy = strategy;
    }

    /// Replace the input buffer. A displayed result stays until replaced.
    pub fn edit(&mut self, text: impl Into<String>, now: Instant) {
        self.input = text.into();
        self.suggestions.on_edit(&self.input, now);
        if self.phase != SessionPhase::Loading {
            self.transition(SessionPhase::Typing);
        }
    }

    /// Advance timers. Emits the debounced suggestion lookup when it is due.
    pub fn tick(&mut self, now: Instant) -> Option<Effect> {
        self.suggestions
            .poll(&self.input, now)
            .map(|query| Effect::FetchSuggestions { query })
    }

    /// Fire a pending suggestion lookup without waiting for the debounce.
    pub fn flush_suggestions(&mut self) -> Option<Effect> {
        self.suggestions
            .flush(&self.input)
            .map(|query| Effect::FetchSuggestions { query })
    }

    pub fn blur(&mut self, now: Instant) {
        self.suggestions.blur(now);
    }

    pub fn focus(&mut self) {
        self.suggestions.focus();
    }

    pub fn highlight_next(&mut self) {
        self.suggestions.highlight_next();
    }

    pub fn highlight_previous(&mut self) {
        self.suggestions.highlight_previous();
    }

    /// Put a suggestion into the input. Never dispatches.
    pub fn select_suggestion(&mut self, index: usize) -> bool {
        let Some(chosen) = self.suggestions.select(index) else {
            return false;
        };
        self.input = chosen;
        if self.phase != SessionPhase::Loading {
            self.transition(SessionPhase::Typing);
        }
        true
    }

    pub fn accept_highlighted(&mut self) -> bool {
        match self.suggestions.highlighted() {
            Some(index) if self.suggestions.is_visible() => self.select_suggestion(index),
            _ => false,
        }
    }

    /// Submit the current input. `None` when there is nothing to send or the
    /// same request is already in flight.
    pub fn submit(&mut self) -> Option<Effect> {
        let ticket =
            self.dispatcher
                .begin(&self.input, self.settings.strategy, self.settings.mode)?;
        self.suggestions.dismiss();
        self.result = ProxyResult::Loading;
        self.transition(SessionPhase::Loading);
        Some(Effect::Dispatch(ticket))
    }

    pub fn apply(&mut self, event: SessionEvent) -> Applied {
        match event {
            SessionEvent::SuggestionsSettled { query, outcome } => {
                match self.suggestions.settle(&query, &self.input, outcome) {
                    SuggestionOutcome::Applied => Applied::Suggestions,
                    SuggestionOutcome::Failed => Applied::SuggestionsFailed,
                    SuggestionOutcome::Stale => Applied::Stale,
                }
            }
            SessionEvent::DispatchSettled { seq, outcome } => {
                let Some(request) = self.dispatcher.settle(seq) else {
                    return Applied::Stale;
                };
                match outcome {
                    Ok(html) => {
                        self.result = ProxyResult::Content {
                            html,
                            source_input: request.input,
                            classification: request.classification,
                        };
                        self.transition(SessionPhase::Content);
                        Applied::Content
                    }
                    Err(err) => {
                        self.result = ProxyResult::Error {
                            message: err.user_message(),
                        };
                        self.transition(SessionPhase::Error);
                        Applied::Error
                    }
                }
            }
        }
    }

    /// Back to idle: empty input, no suggestions, no result.
    pub fn clear(&mut self) {
        self.input.clear();
        self.suggestions.reset();
        self.dispatcher.abandon();
        self.result = ProxyResult::Empty;
        self.transition(SessionPhase::Idle);
    }

    pub fn view(&self) -> SessionView {
        let (classification, endpoint) = self.route();
        SessionView {
            input: self.input.clone(),
            classification,
            endpoint,
            suggestions: self.suggestions.items().to_vec(),
            suggestions_visible: self.suggestions.is_visible(),
            highlighted: self.suggestions.highlighted(),
            result: self.result.clone(),
            phase: self.phase,
            mode: self.settings.mode,
            strategy: self.settings.strategy,
        }
    }

    fn route(&self) -> (Classification, Endpoint) {
        resolve_route(&self.input, self.settings.strategy, self.settings.mode)
    }

    fn transition(&mut self, to: SessionPhase) {
        debug_assert!(
            is_valid_phase_transition(self.phase, to),
            "invalid session transition {:?} -> {:?}",
            self.phase,
            to
        );
        self.phase = to;
    }
}
