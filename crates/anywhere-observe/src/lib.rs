use anyhow::Result;
use anywhere_core::{Classification, Endpoint, runtime_dir};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub seq_no: u64,
    pub at: DateTime<Utc>,
    pub session_id: Uuid,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventKind {
    SessionStarted {
        base_url: String,
    },
    SuggestionsRequested {
        query: String,
    },
    SuggestionsApplied {
        query: String,
        count: usize,
    },
    DispatchStarted {
        seq: u64,
        endpoint: Endpoint,
        classification: Classification,
    },
    DispatchSettled {
        seq: u64,
        ok: bool,
    },
    /// A response that lost to a newer request. Informational.
    StaleDropped {
        what: String,
    },
    SessionCleared,
}

pub struct Observer {
    log_path: PathBuf,
    session_id: Uuid,
    seq_no: AtomicU64,
    verbose: bool,
    stderr: bool,
}

impl Observer {
    pub fn new(workspace: &Path) -> Result<Self> {
        let dir = runtime_dir(workspace);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            log_path: dir.join("observe.log"),
            session_id: Uuid::now_v7(),
            seq_no: AtomicU64::new(0),
            verbose: false,
            stderr: true,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Wrap `kind` in an envelope for this session and append it.
    pub fn record(&self, kind: EventKind) -> Result<()> {
        let event = EventEnvelope {
            seq_no: self.seq_no.fetch_add(1, Ordering::Relaxed) + 1,
            at: Utc::now(),
            session_id: self.session_id,
            kind,
        };
        self.record_event(&event)
    }

    pub fn record_event(&self, event: &EventEnvelope) -> Result<()> {
        self.append_log_line(&format!(
            "{} EVENT {}",
            Utc::now().to_rfc3339(),
            serde_json::to_string(event)?
        ))
    }

    /// Enable or disable verbose logging to stderr.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Keep stderr quiet while a full-screen UI owns the terminal.
    /// The log file still receives everything.
    pub fn set_stderr(&mut self, enabled: bool) {
        self.stderr = enabled;
    }

    /// Log a message with `[anywhere]` prefix when verbose mode is on.
    pub fn verbose_log(&self, msg: &str) {
        if !self.verbose {
            return;
        }
        if self.stderr {
            eprintln!("[anywhere] {msg}");
        }
        let _ = self.append_log_line(&format!("{} DEBUG {msg}", Utc::now().to_rfc3339()));
    }

    /// Log a warning to the log file, and to stderr unless silenced.
    pub fn warn_log(&self, msg: &str) {
        if self.stderr {
            eprintln!("[anywhere WARN] {msg}");
        }
        let _ = self.append_log_line(&format!("{} WARN {msg}", Utc::now().to_rfc3339()));
    }

    fn append_log_line(&self, line: &str) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}
