//! Events manager: kernel-wide publish/subscribe with fired-event history.

use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::EventKind;
use crate::error::EventError;

/// Handler invoked each time its event kind fires.
pub type EventHandler = Arc<dyn Fn(&EventContext) -> anyhow::Result<()> + Send + Sync>;

/// Token returned by registration; needed to unregister the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerId(pub u64);

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handler-{}", self.0)
    }
}

/// What a handler gets to see about the event being fired.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub kind: EventKind,
    pub args: Vec<Value>,
    pub fired_at: DateTime<Utc>,
}

impl EventContext {
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Argument `index` as a string slice, if it is one.
    pub fn arg_str(&self, index: usize) -> Option<&str> {
        self.arg(index).and_then(Value::as_str)
    }
}

/// One entry in the fired-event history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiredEvent {
    pub label: String,
    pub kind: EventKind,
    pub args: Vec<Value>,
    pub fired_at: DateTime<Utc>,
}

/// Configuration for the events manager.
#[derive(Debug, Clone, Default)]
pub struct EventsManagerConfig {
    /// Keep at most this many history entries (oldest evicted first).
    /// `None` keeps everything until `clear_fired`.
    pub history_limit: Option<usize>,
}

/// Kernel event bus.
///
/// Handlers for a kind run synchronously on the firing thread, in
/// registration order. The handler list is snapshotted before invocation, so
/// a handler may register or unregister handlers without deadlocking.
pub struct EventsManager {
    handlers: Mutex<HashMap<EventKind, Vec<(HandlerId, EventHandler)>>>,
    history: Mutex<VecDeque<FiredEvent>>,
    next_handler: AtomicU64,
    config: EventsManagerConfig,
}

impl EventsManager {
    pub fn new() -> Self {
        Self::with_config(EventsManagerConfig::default())
    }

    pub fn with_config(config: EventsManagerConfig) -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
            history: Mutex::new(VecDeque::new()),
            next_handler: AtomicU64::new(1),
            config,
        }
    }

    fn handlers(&self) -> MutexGuard<'_, HashMap<EventKind, Vec<(HandlerId, EventHandler)>>> {
        self.handlers.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn history(&self) -> MutexGuard<'_, VecDeque<FiredEvent>> {
        self.history.lock().unwrap_or_else(|p| p.into_inner())
    }

    // ── Registration ────────────────────────────────────────────────────────

    /// Register a handler for `kind`.
    pub fn register<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&EventContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_handler.fetch_add(1, Ordering::Relaxed));
        self.handlers()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        debug!(event = %kind, handler = %id, "Event handler registered");
        id
    }

    /// Register by event name, failing on names outside the catalog.
    pub fn register_by_name<F>(&self, name: &str, handler: F) -> Result<HandlerId, EventError>
    where
        F: Fn(&EventContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let kind = parse_kind(name)?;
        Ok(self.register(kind, handler))
    }

    /// Remove a previously registered handler.
    pub fn unregister(&self, kind: EventKind, handler: HandlerId) -> Result<(), EventError> {
        let mut handlers = self.handlers();
        let list = handlers.entry(kind).or_default();
        let before = list.len();
        list.retain(|(id, _)| *id != handler);
        if list.len() == before {
            return Err(EventError::HandlerNotFound {
                event: kind.to_string(),
                handler: handler.0,
            });
        }
        debug!(event = %kind, handler = %handler, "Event handler unregistered");
        Ok(())
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers().get(&kind).map_or(0, Vec::len)
    }

    // ── Firing ──────────────────────────────────────────────────────────────

    /// Fire `kind`: record it, then run its handlers in registration order.
    ///
    /// A handler that errors or panics is logged and skipped; the remaining
    /// handlers still run and the caller never sees the failure.
    pub fn fire(&self, kind: EventKind, args: Vec<Value>) {
        let fired_at = Utc::now();
        {
            let mut history = self.history();
            history.push_back(FiredEvent {
                label: kind.label().to_string(),
                kind,
                args: args.clone(),
                fired_at,
            });
            if let Some(limit) = self.config.history_limit {
                while history.len() > limit {
                    history.pop_front();
                }
            }
        }

        let snapshot: Vec<(HandlerId, EventHandler)> = self
            .handlers()
            .get(&kind)
            .cloned()
            .unwrap_or_default();
        debug!(event = %kind, handlers = snapshot.len(), "Firing event");

        let ctx = EventContext { kind, args, fired_at };
        for (id, handler) in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&ctx))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(event = %kind, handler = %id, error = %format!("{e:#}"), "Event handler failed");
                }
                Err(_) => {
                    warn!(event = %kind, handler = %id, "Event handler panicked");
                }
            }
        }
    }

    /// Fire by event name; unknown names fail and record nothing.
    pub fn fire_by_name(&self, name: &str, args: Vec<Value>) -> Result<(), EventError> {
        let kind = parse_kind(name)?;
        self.fire(kind, args);
        Ok(())
    }

    /// Fire by numeric kind; numbers outside the catalog fail and record nothing.
    pub fn fire_by_number(&self, number: u32, args: Vec<Value>) -> Result<(), EventError> {
        let kind = EventKind::from_repr(number)
            .ok_or_else(|| EventError::NoSuchEvent(number.to_string()))?;
        self.fire(kind, args);
        Ok(())
    }

    // ── History ─────────────────────────────────────────────────────────────

    /// Every fired `(label, args)` pair whose label contains `search`.
    pub fn list_fired(&self, search: &str) -> Vec<(String, Vec<Value>)> {
        self.history()
            .iter()
            .filter(|e| e.label.contains(search))
            .map(|e| (e.label.clone(), e.args.clone()))
            .collect()
    }

    /// Full history entries, oldest first.
    pub fn fired_events(&self) -> Vec<FiredEvent> {
        self.history().iter().cloned().collect()
    }

    pub fn fired_count(&self) -> usize {
        self.history().len()
    }

    /// Forget the history. Registered handlers stay.
    pub fn clear_fired(&self) {
        let cleared = {
            let mut history = self.history();
            let n = history.len();
            history.clear();
            n
        };
        debug!(cleared, "Fired event history cleared");
    }
}

impl Default for EventsManager {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_kind(name: &str) -> Result<EventKind, EventError> {
    EventKind::from_str(name).map_err(|_| EventError::NoSuchEvent(name.to_string()))
}
