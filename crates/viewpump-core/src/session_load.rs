//! Session loading: navigation, cookie preload and readiness tracking.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{debug, info, warn};

use viewpump_protocols::{EmbeddedView, ViewLoadOptions};
use viewpump_runloop::CycleMode;

use crate::error::ViewError;
use crate::events::{PreloadState, ReadyState, SessionEvent, SessionState};
use crate::navigation::NavigationPolicy;
use crate::options::LoadOptions;
use crate::script::cookie_script;
use crate::session::Session;

/// Reports `interactive` or `complete` once the DOM is parsed.
const READY_STATE_SCRIPT: &str = r#"function(done) {
  if (/interactive|complete/.test(document.readyState)) done(null, document.readyState);
  else document.addEventListener('DOMContentLoaded', function() { done(null, 'interactive'); }, false);
}"#;

/// Reports `complete` once the window load event fired.
const LOAD_SCRIPT: &str = r#"function(done) {
  if (document.readyState == 'complete') done(null, 'complete');
  else window.addEventListener('load', function() { done(null, 'complete'); }, false);
}"#;

/// Whose readiness is being tracked.
#[derive(Debug, Clone, Copy)]
enum Phase {
    Preload,
    /// The document started by the load with this generation.
    Document(u64),
}

impl Session {
    /// Navigate to `uri`.
    ///
    /// Completes once the document is committed; readiness is tracked in the
    /// background and reported as [`SessionEvent::Ready`] then
    /// [`SessionEvent::Load`]. A committed document answering with a status
    /// outside [200, 400) yields [`ViewError::HttpStatus`].
    pub async fn load(&self, uri: &str, options: LoadOptions) -> Result<(), ViewError> {
        self.ensure_open()?;
        let view = self.view()?;
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let preload = {
            let mut navigation = self.shared.navigation.lock();
            let allow = options
                .allow
                .clone()
                .unwrap_or_else(|| self.shared.options.allow.clone());
            navigation.policy = NavigationPolicy::new(allow);
            navigation.target = Some(uri.to_string());
            navigation.status = None;
            navigation.status_armed = true;
            !options.cookies.is_empty() && navigation.preload == PreloadState::Idle
        };

        let view_options = view_options(&options).await?;
        if preload {
            self.preload(&view, uri, &view_options, &options.cookies)
                .await?;
        }

        self.set_state(SessionState::Loading);
        debug!("Loading {}", uri);
        let loaded = {
            let _hold = self.shared.pump.hold(CycleMode::NonBlocking);
            view.load(uri, &view_options).await
        };
        if let Err(e) = loaded {
            warn!("Failed to load {}: {}", uri, e);
            self.set_state(SessionState::LoadFailed(e.to_string()));
            return Err(e.into());
        }

        let session = self.clone();
        tokio::spawn(async move {
            if let Err(e) = session.track_readiness(Phase::Document(generation)).await {
                session.fail_readiness(generation, e);
            }
        });

        let status = self.shared.navigation.lock().status;
        match status {
            Some(status) => Err(ViewError::HttpStatus(status)),
            None => Ok(()),
        }
    }

    /// Navigate to `about:blank` and forget the previous document.
    pub async fn unload(&self) -> Result<(), ViewError> {
        let result = self.load("about:blank", LoadOptions::default()).await;
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        {
            let mut navigation = self.shared.navigation.lock();
            navigation.target = None;
            navigation.status = None;
            navigation.status_armed = false;
        }
        self.set_state(SessionState::Unloaded);
        result
    }

    /// Load the target once to get a document the cookies can be set on.
    async fn preload(
        &self,
        view: &Arc<dyn EmbeddedView>,
        uri: &str,
        view_options: &ViewLoadOptions,
        cookies: &[String],
    ) -> Result<(), ViewError> {
        info!("Preloading {} to set {} cookies", uri, cookies.len());
        self.shared.navigation.lock().preload = PreloadState::Active;
        let result = self.run_preload(view, uri, view_options, cookies).await;
        self.shared.navigation.lock().preload = PreloadState::Done;
        result
    }

    async fn run_preload(
        &self,
        view: &Arc<dyn EmbeddedView>,
        uri: &str,
        view_options: &ViewLoadOptions,
        cookies: &[String],
    ) -> Result<(), ViewError> {
        {
            let _hold = self.shared.pump.hold(CycleMode::NonBlocking);
            view.load(uri, view_options).await?;
        }
        self.track_readiness(Phase::Preload).await?;
        self.run(&cookie_script(cookies)).await?;
        Ok(())
    }

    async fn track_readiness(&self, phase: Phase) -> Result<(), ViewError> {
        let reached = self.query_ready_state(READY_STATE_SCRIPT).await?;
        if !self.reach(phase, ReadyState::Interactive) {
            return Ok(());
        }
        if reached < ReadyState::Complete {
            self.query_ready_state(LOAD_SCRIPT).await?;
        }
        self.reach(phase, ReadyState::Complete);
        Ok(())
    }

    /// A readiness query of the current load failed or timed out. Artifact
    /// waiters would otherwise wait for a state that is never reached.
    fn fail_readiness(&self, generation: u64, error: ViewError) {
        if self.is_closed() || self.shared.generation.load(Ordering::SeqCst) != generation {
            debug!("Readiness of a superseded load failed: {}", error);
            return;
        }
        warn!("Readiness tracking failed: {}", error);
        self.set_state(SessionState::LoadFailed(format!("readiness: {}", error)));
    }

    async fn query_ready_state(&self, script: &str) -> Result<ReadyState, ViewError> {
        let value = self.run(script).await?;
        value
            .as_str()
            .and_then(|state| state.parse().ok())
            .ok_or_else(|| ViewError::UnexpectedReply(format!("ready state {}", value)))
    }

    /// Record that `phase` reached `ready`. Returns `false` when the load was
    /// superseded.
    fn reach(&self, phase: Phase, ready: ReadyState) -> bool {
        let generation = match phase {
            Phase::Preload => {
                self.shared.router.emit(match ready {
                    ReadyState::Complete => SessionEvent::PreLoad,
                    _ => SessionEvent::PreReady,
                });
                return true;
            }
            Phase::Document(generation) => generation,
        };

        if self.is_closed() || self.shared.generation.load(Ordering::SeqCst) != generation {
            debug!("Dropping readiness of a superseded load");
            return false;
        }
        let (state, event) = match ready {
            ReadyState::Loading => (SessionState::Loading, None),
            ReadyState::Interactive => (SessionState::Ready, Some(SessionEvent::Ready)),
            ReadyState::Complete => (SessionState::Loaded, Some(SessionEvent::Load)),
        };
        self.set_state(state);
        if let Some(event) = event {
            self.shared.router.emit(event);
        }
        true
    }
}

/// Native load options, with the stylesheet file read into `css`.
async fn view_options(options: &LoadOptions) -> Result<ViewLoadOptions, ViewError> {
    let mut view_options = options.view.clone();
    if let Some(path) = &options.stylesheet {
        if view_options.css.is_some() {
            warn!("Both css and stylesheet given, using {}", path.display());
        }
        view_options.css = Some(tokio::fs::read_to_string(path).await?);
    }
    Ok(view_options)
}
