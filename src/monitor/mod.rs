//! Query monitor.
//!
//! The monitor receives query-lifecycle events from the driver layer (pool
//! hooks and the client core) and either renders them through a [`Theme`] to
//! `tracing`, or hands them to a redirect hook installed with
//! [`Monitor::set_log`].
//!
//! A [`Monitor`] is a cheap cloneable handle onto a single attachment slot. At
//! most one attachment is live at a time: attaching twice fails with
//! [`MonitorError::AlreadyAttached`], detaching with nothing attached fails with
//! [`MonitorError::NotAttached`].

pub mod event;
pub mod logger;
pub mod theme;

pub use event::{EventInfo, EventSet, MonitorEvent};
pub use logger::{BestEffort, DbLogger, TracingLogger};
pub use theme::Theme;

use crate::db::DriverOptions;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Output redirect. Clearing `display` suppresses the monitor's own rendering.
pub type LogHook = Arc<dyn Fn(&mut EventInfo) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    #[error("Monitor is not attached")]
    NotAttached,

    #[error("Monitor is already attached to '{source_name}'; repeated attachments are not supported")]
    AlreadyAttached { source_name: String },
}

#[derive(Debug)]
struct Attachment {
    source_name: String,
    events: EventSet,
}

#[derive(Default)]
struct MonitorState {
    attachment: Option<Attachment>,
    theme: Theme,
    hook: Option<LogHook>,
}

#[derive(Clone, Default)]
pub struct Monitor {
    state: Arc<Mutex<MonitorState>>,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Monitor")
            .field("attachment", &state.attachment)
            .field("theme", &state.theme)
            .field("has_hook", &state.hook.is_some())
            .finish()
    }
}

impl Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start observing `events` raised by the driver configured with `options`.
    pub fn attach(&self, options: &DriverOptions, events: EventSet) -> Result<(), MonitorError> {
        let mut state = self.lock();
        if let Some(existing) = &state.attachment {
            return Err(MonitorError::AlreadyAttached {
                source_name: existing.source_name.clone(),
            });
        }
        debug!(
            source = %options.application_name,
            events = %events,
            "Monitor attached"
        );
        state.attachment = Some(Attachment {
            source_name: options.application_name.clone(),
            events,
        });
        Ok(())
    }

    pub fn detach(&self) -> Result<(), MonitorError> {
        let mut state = self.lock();
        match state.attachment.take() {
            Some(attachment) => {
                debug!(source = %attachment.source_name, "Monitor detached");
                Ok(())
            }
            None => Err(MonitorError::NotAttached),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.lock().attachment.is_some()
    }

    /// Events observed by the current attachment, if any.
    pub fn events(&self) -> Option<EventSet> {
        self.lock().attachment.as_ref().map(|a| a.events.clone())
    }

    pub fn set_theme(&self, theme: Theme) {
        self.lock().theme = theme;
    }

    pub fn theme(&self) -> Theme {
        self.lock().theme
    }

    /// Install an output redirect; it replaces any previous one.
    pub fn set_log(&self, hook: impl Fn(&mut EventInfo) + Send + Sync + 'static) {
        self.lock().hook = Some(Arc::new(hook));
    }

    pub fn clear_log(&self) {
        self.lock().hook = None;
    }

    /// Report one event.
    ///
    /// Returns `None` when the monitor is detached or the event is not
    /// observed. Otherwise the redirect hook sees the event exactly once, and
    /// the returned info tells whether the monitor rendered it.
    pub fn notify(&self, event: MonitorEvent, text: impl Into<String>) -> Option<EventInfo> {
        let (source_name, theme, hook) = {
            let state = self.lock();
            let attachment = state.attachment.as_ref()?;
            if !attachment.events.contains(event) {
                return None;
            }
            (
                attachment.source_name.clone(),
                state.theme,
                state.hook.clone(),
            )
        };

        let mut info = EventInfo {
            event,
            text: text.into(),
            display: true,
        };

        // The hook runs outside the lock so it may use the monitor itself.
        if let Some(hook) = hook {
            hook(&mut info);
        }

        if info.display {
            info!(
                target: "chain_db::monitor",
                source = %source_name,
                "{}",
                theme.render(&info)
            );
        }

        Some(info)
    }
}
