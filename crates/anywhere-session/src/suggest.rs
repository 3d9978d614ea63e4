use anywhere_core::{Classification, MIN_SUGGESTION_QUERY_CHARS, SuggestionsConfig, classify};
use std::time::{Duration, Instant};

/// Whether `text` deserves a suggestion lookup at all.
pub fn wants_lookup(text: &str) -> bool {
    classify(text) == Classification::Query && text.chars().count() >= MIN_SUGGESTION_QUERY_CHARS
}

/// Suggestion list plus the two timers around it: the lookup debounce and
/// the delayed hide after the input loses focus.
#[derive(Debug, Clone)]
pub struct SuggestionProvider {
    cfg: SuggestionsConfig,
    items: Vec<String>,
    visible: bool,
    focused: bool,
    highlighted: Option<usize>,
    /// Closed by a submit; only the next edit reopens the list.
    dismissed: bool,
    armed_at: Option<Instant>,
    hide_at: Option<Instant>,
}

/// What happened to a suggestion response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionOutcome {
    Applied,
    Failed,
    Stale,
}

impl SuggestionProvider {
    pub fn new(cfg: SuggestionsConfig) -> Self {
        Self {
            cfg,
            items: Vec::new(),
            visible: false,
            focused: true,
            highlighted: None,
            dismissed: false,
            armed_at: None,
            hide_at: None,
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    /// React to a new input value: either re-arm the debounce or clear at once.
    pub fn on_edit(&mut self, text: &str, now: Instant) {
        self.highlighted = None;
        self.dismissed = false;
        if !self.cfg.enabled || !wants_lookup(text) {
            self.reset();
            return;
        }
        self.armed_at = Some(now);
    }

    /// Fire the debounced lookup once it is due. Returns the text to look up.
    pub fn poll(&mut self, text: &str, now: Instant) -> Option<String> {
        if let Some(hide_at) = self.hide_at
            && now >= hide_at
        {
            self.hide_at = None;
            self.visible = false;
            self.highlighted = None;
        }

        let armed_at = self.armed_at?;
        if now.saturating_duration_since(armed_at) < Duration::from_millis(self.cfg.debounce_ms) {
            return None;
        }
        self.armed_at = None;
        Some(text.to_string())
    }

    /// Skip the debounce and fire the pending lookup now, if any.
    pub fn flush(&mut self, text: &str) -> Option<String> {
        self.armed_at.take().map(|_| text.to_string())
    }

    /// Apply a lookup result issued for `query` against the current input.
    pub fn settle(
        &mut self,
        query: &str,
        current_input: &str,
        outcome: Result<Vec<String>, String>,
    ) -> SuggestionOutcome {
        if query != current_input {
            return SuggestionOutcome::Stale;
        }
        self.highlighted = None;
        match outcome {
            Ok(items) => {
                self.items = items;
                self.visible = self.focused && !self.dismissed && !self.items.is_empty();
                SuggestionOutcome::Applied
            }
            Err(_) => {
                self.items.clear();
                self.visible = false;
                SuggestionOutcome::Failed
            }
        }
    }

    pub fn select(&mut self, index: usize) -> Option<String> {
        let chosen = self.items.get(index).cloned()?;
        self.armed_at = None;
        self.hide();
        Some(chosen)
    }

    pub fn highlight_next(&mut self) {
        if !self.visible || self.items.is_empty() {
            return;
        }
        self.highlighted = Some(match self.highlighted {
            Some(idx) => (idx + 1) % self.items.len(),
            None => 0,
        });
    }

    pub fn highlight_previous(&mut self) {
        if !self.visible || self.items.is_empty() {
            return;
        }
        self.highlighted = Some(match self.highlighted {
            Some(0) | None => self.items.len() - 1,
            Some(idx) => idx - 1,
        });
    }

    pub fn blur(&mut self, now: Instant) {
        self.focused = false;
        self.hide_at = Some(now + Duration::from_millis(self.cfg.blur_hide_ms));
    }

    pub fn focus(&mut self) {
        self.focused = true;
        self.hide_at = None;
        self.visible = !self.dismissed && !self.items.is_empty();
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.highlighted = None;
    }

    /// Close the list for a submit: drop the armed lookup and keep the list
    /// shut even if a lookup already running comes back.
    pub fn dismiss(&mut self) {
        self.armed_at = None;
        self.dismissed = true;
        self.hide();
    }

    pub fn reset(&mut self) {
        self.items.clear();
        self.visible = false;
        self.highlighted = None;
        self.dismissed = false;
        self.armed_at = None;
        self.hide_at = None;
    }
}
