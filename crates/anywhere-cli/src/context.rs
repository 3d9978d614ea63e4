use crate::DispatchArgs;
use anyhow::Result;
use anywhere_backend::HttpBackend;
use anywhere_core::{AppConfig, DispatchStrategy, ProxyMode};
use anywhere_observe::{EventKind, Observer};
use anywhere_session::{Session, SessionDriver, SessionSettings};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Everything a command needs: merged config plus the global flags.
pub(crate) struct CliContext {
    pub cwd: PathBuf,
    pub cfg: AppConfig,
    pub json: bool,
    pub verbose: bool,
}

impl CliContext {
    pub fn load(cwd: &Path, json: bool, verbose: bool, backend_url: Option<&str>) -> Result<Self> {
        let mut cfg = AppConfig::load(cwd)?;
        if let Some(url) = backend_url.map(str::trim).filter(|url| !url.is_empty()) {
            cfg.backend.base_url = url.to_string();
        }
        Ok(Self {
            cwd: cwd.to_path_buf(),
            cfg,
            json,
            verbose,
        })
    }

    pub fn backend(&self) -> Result<HttpBackend> {
        HttpBackend::new(self.cfg.backend.clone())
    }

    pub fn settings(&self, args: &DispatchArgs) -> SessionSettings {
        let mut settings = SessionSettings::from(&self.cfg.dispatch);
        if args.enhanced {
            settings.mode = ProxyMode::Enhanced;
        }
        if args.smart {
            settings.strategy = DispatchStrategy::Smart;
        } else if args.direct {
            settings.strategy = DispatchStrategy::Direct;
        }
        settings
    }

    pub fn session(&self, args: &DispatchArgs) -> Session {
        Session::new(self.settings(args), self.cfg.suggestions.clone())
    }

    /// Driver over the HTTP backend, logging to `.anywhere/observe.log`.
    pub fn driver(&self, stderr: bool) -> Result<SessionDriver<HttpBackend>> {
        let mut observer = Observer::new(&self.cwd)?;
        observer.set_verbose(self.verbose);
        observer.set_stderr(stderr);
        let _ = observer.record(EventKind::SessionStarted {
            base_url: self.cfg.backend.base_url.clone(),
        });
        Ok(SessionDriver::new(Arc::new(self.backend()?)).with_observer(observer))
    }

    /// Upper bound for one-shot commands waiting on the backend.
    pub fn wait_limit(&self) -> Duration {
        Duration::from_secs(self.cfg.backend.timeout_seconds.saturating_add(5))
    }
}
