use crate::{Applied, Effect, Session, SessionEvent};
use anywhere_backend::ProxyBackend;
use anywhere_observe::{EventKind, Observer};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// Runs session effects on worker threads and feeds the outcomes back.
///
/// Workers only talk to the backend; every session mutation happens in
/// [`SessionDriver::pump`] or [`SessionDriver::wait`] on the owning thread.
pub struct SessionDriver<B> {
    backend: Arc<B>,
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
    observer: Option<Observer>,
    pending: usize,
}

impl<B: ProxyBackend + 'static> SessionDriver<B> {
    pub fn new(backend: Arc<B>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            backend,
            tx,
            rx,
            observer: None,
            pending: 0,
        }
    }

    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn observer(&self) -> Option<&Observer> {
        self.observer.as_ref()
    }

    /// Effects started but not yet applied.
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn run(&mut self, effect: Effect) {
        let tx = self.tx.clone();
        let backend = Arc::clone(&self.backend);
        self.pending += 1;
        match effect {
            Effect::FetchSuggestions { query } => {
                self.record(EventKind::SuggestionsRequested {
                    query: query.clone(),
                });
                thread::spawn(move || {
                    let outcome = backend
                        .suggestions(&query)
                        .map_err(|err| format!("{err:#}"));
                    let _ = tx.send(SessionEvent::SuggestionsSettled { query, outcome });
                });
            }
            Effect::Dispatch(ticket) => {
                self.record(EventKind::DispatchStarted {
                    seq: ticket.seq,
                    endpoint: ticket.endpoint,
                    classification: ticket.classification,
                });
                self.verbose(&format!(
                    "dispatch #{} {} -> {}",
                    ticket.seq, ticket.input, ticket.endpoint
                ));
                thread::spawn(move || {
                    let outcome = backend.dispatch(&ticket);
                    let _ = tx.send(SessionEvent::DispatchSettled {
                        seq: ticket.seq,
                        outcome,
                    });
                });
            }
        }
    }

    pub fn run_all(&mut self, effects: impl IntoIterator<Item = Effect>) {
        for effect in effects {
            self.run(effect);
        }
    }

    /// Apply every outcome that has already arrived. Never blocks.
    pub fn pump(&mut self, session: &mut Session) -> Vec<Applied> {
        let mut applied = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            applied.push(self.apply(session, event));
        }
        applied
    }

    /// Block until one outcome arrives and apply it. `None` on timeout.
    pub fn wait(&mut self, session: &mut Session, timeout: Duration) -> Option<Applied> {
        if self.pending == 0 {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(self.apply(session, event)),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Clear the session and note it in the event log.
    pub fn clear(&mut self, session: &mut Session) {
        session.clear();
        self.record(EventKind::SessionCleared);
    }

    fn apply(&mut self, session: &mut Session, event: SessionEvent) -> Applied {
        self.pending = self.pending.saturating_sub(1);
        let (label, failure, seq) = match &event {
            SessionEvent::SuggestionsSettled { query, outcome } => (
                format!("suggestions for '{query}'"),
                outcome.as_ref().err().cloned(),
                None,
            ),
            SessionEvent::DispatchSettled { seq, outcome } => (
                format!("dispatch #{seq}"),
                outcome.as_ref().err().map(ToString::to_string),
                Some(*seq),
            ),
        };
        let query = match &event {
            SessionEvent::SuggestionsSettled { query, .. } => query.clone(),
            SessionEvent::DispatchSettled { .. } => String::new(),
        };

        let applied = session.apply(event);
        match applied {
            Applied::Suggestions => self.record(EventKind::SuggestionsApplied {
                query,
                count: session.suggestions().len(),
            }),
            Applied::SuggestionsFailed => {
                self.verbose(&format!(
                    "{label} failed: {}",
                    failure.unwrap_or_default()
                ));
            }
            Applied::Content | Applied::Error => {
                let ok = applied == Applied::Content;
                self.record(EventKind::DispatchSettled {
                    seq: seq.unwrap_or_default(),
                    ok,
                });
                if !ok && let Some(observer) = &self.observer {
                    observer.warn_log(&format!(
                        "{label} failed: {}",
                        failure.unwrap_or_default()
                    ));
                }
            }
            Applied::Stale => {
                self.record(EventKind::StaleDropped {
                    what: label.clone(),
                });
                self.verbose(&format!("dropped stale {label}"));
            }
        }
        applied
    }

    fn record(&self, kind: EventKind) {
        if let Some(observer) = &self.observer {
            let _ = observer.record(kind);
        }
    }

    fn verbose(&self, msg: &str) {
        if let Some(observer) = &self.observer {
            observer.verbose_log(msg);
        }
    }
}
