//! Webview Readiness State Machine
//!
//! One state per rendering surface, driven only by lifecycle events:
//!
//! ```text
//! NotRunning --started--> RunningNoDom --dom-ready--> DomOnlookEnabled
//!                              ^              \-----> DomNoOnlook
//!                              |
//!     any state --navigation---+        any state --stopped--> NotRunning
//! ```
//!
//! Observers run after the state lock is released, so a callback may query
//! the machine or unobserve itself.

use crate::config::RetryPolicy;
use onlook_common::SurfaceId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebviewState {
    #[default]
    NotRunning,
    RunningNoDom,
    DomNoOnlook,
    DomOnlookEnabled,
}

/// DOM lifecycle signal from a rendering surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    ProcessStarted,
    DomReady { instrumented: bool },
    NavigationStarted,
    ProcessStopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub surface_id: SurfaceId,
    pub previous: WebviewState,
    pub current: WebviewState,
}

pub type Observer = Arc<dyn Fn(&StateChange) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Debug, Default)]
struct SurfaceRecord {
    state: WebviewState,
    /// Bumped on every transition
    generation: u64,
    reload_attempts: u32,
}

#[derive(Default)]
struct Inner {
    surfaces: HashMap<SurfaceId, SurfaceRecord>,
    observers: HashMap<SurfaceId, Vec<(ObserverId, Observer)>>,
    next_observer: u64,
}

pub struct ReadinessMachine {
    inner: Mutex<Inner>,
    events: broadcast::Sender<StateChange>,
}

impl ReadinessMachine {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Mutex::new(Inner::default()),
            events,
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts tracking a surface in `NotRunning`; a no-op if already tracked
    pub fn register(&self, surface_id: &str) {
        self.inner()
            .surfaces
            .entry(surface_id.to_string())
            .or_default();
    }

    /// Stops tracking a surface and drops its observers
    pub fn remove(&self, surface_id: &str) {
        let mut inner = self.inner();
        inner.surfaces.remove(surface_id);
        inner.observers.remove(surface_id);
    }

    pub fn current_state(&self, surface_id: &str) -> WebviewState {
        self.inner()
            .surfaces
            .get(surface_id)
            .map(|record| record.state)
            .unwrap_or_default()
    }

    pub fn is_editable(&self, surface_id: &str) -> bool {
        self.current_state(surface_id) == WebviewState::DomOnlookEnabled
    }

    /// Changes every time the surface changes state
    pub fn generation(&self, surface_id: &str) -> u64 {
        self.inner()
            .surfaces
            .get(surface_id)
            .map(|record| record.generation)
            .unwrap_or_default()
    }

    /// Applies a lifecycle event. Returns the transition, if any.
    pub fn handle(&self, surface_id: &str, event: LifecycleEvent) -> Option<StateChange> {
        let (change, observers) = {
            let mut inner = self.inner();
            let record = inner.surfaces.entry(surface_id.to_string()).or_default();
            let previous = record.state;
            let next = transition(previous, event)?;
            if next == previous {
                return None;
            }

            record.state = next;
            record.generation += 1;
            if matches!(next, WebviewState::DomOnlookEnabled | WebviewState::NotRunning) {
                record.reload_attempts = 0;
            }

            let change = StateChange {
                surface_id: surface_id.to_string(),
                previous,
                current: next,
            };
            let observers: Vec<Observer> = inner
                .observers
                .get(surface_id)
                .map(|list| list.iter().map(|(_, observer)| observer.clone()).collect())
                .unwrap_or_default();
            (change, observers)
        };

        tracing::debug!(
            surface = %surface_id,
            from = ?change.previous,
            to = ?change.current,
            "surface state changed"
        );
        for observer in observers {
            observer(&change);
        }
        // No receivers is fine
        let _ = self.events.send(change.clone());
        Some(change)
    }

    pub fn observe<F>(&self, surface_id: &str, observer: F) -> ObserverId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let mut inner = self.inner();
        let id = ObserverId(inner.next_observer);
        inner.next_observer += 1;
        inner
            .observers
            .entry(surface_id.to_string())
            .or_default()
            .push((id, Arc::new(observer)));
        id
    }

    /// Safe to call repeatedly and after the surface is removed
    pub fn unobserve(&self, id: ObserverId) {
        let mut inner = self.inner();
        for list in inner.observers.values_mut() {
            list.retain(|(observer_id, _)| *observer_id != id);
        }
        inner.observers.retain(|_, list| !list.is_empty());
    }

    /// Every transition on every surface
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.events.subscribe()
    }

    /// Consumes one reload attempt. `None` once the policy is exhausted.
    pub fn next_reload_delay(&self, surface_id: &str, policy: &RetryPolicy) -> Option<Duration> {
        let mut inner = self.inner();
        let record = inner.surfaces.get_mut(surface_id)?;
        let delay = policy.delay(record.reload_attempts)?;
        record.reload_attempts += 1;
        Some(delay)
    }

    pub fn reload_attempts(&self, surface_id: &str) -> u32 {
        self.inner()
            .surfaces
            .get(surface_id)
            .map(|record| record.reload_attempts)
            .unwrap_or_default()
    }
}

impl Default for ReadinessMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn transition(state: WebviewState, event: LifecycleEvent) -> Option<WebviewState> {
    use WebviewState::*;
    match (state, event) {
        (NotRunning, LifecycleEvent::ProcessStarted) => Some(RunningNoDom),
        (_, LifecycleEvent::ProcessStarted) => None,
        (RunningNoDom, LifecycleEvent::DomReady { instrumented: true }) => Some(DomOnlookEnabled),
        (RunningNoDom, LifecycleEvent::DomReady { instrumented: false }) => Some(DomNoOnlook),
        // A loaded page only changes after a navigation
        (_, LifecycleEvent::DomReady { .. }) => None,
        (_, LifecycleEvent::NavigationStarted) => Some(RunningNoDom),
        (_, LifecycleEvent::ProcessStopped) => Some(NotRunning),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_lifecycle_transitions() {
        let machine = ReadinessMachine::new();
        machine.register("frame");
        assert_eq!(machine.current_state("frame"), WebviewState::NotRunning);

        // dom-ready without a running process is ignored
        assert!(machine
            .handle("frame", LifecycleEvent::DomReady { instrumented: true })
            .is_none());

        machine.handle("frame", LifecycleEvent::ProcessStarted);
        assert_eq!(machine.current_state("frame"), WebviewState::RunningNoDom);

        machine.handle("frame", LifecycleEvent::DomReady { instrumented: false });
        assert_eq!(machine.current_state("frame"), WebviewState::DomNoOnlook);

        machine.handle("frame", LifecycleEvent::NavigationStarted);
        machine.handle("frame", LifecycleEvent::DomReady { instrumented: true });
        assert!(machine.is_editable("frame"));

        machine.handle("frame", LifecycleEvent::ProcessStopped);
        assert_eq!(machine.current_state("frame"), WebviewState::NotRunning);
    }

    #[test]
    fn test_dom_ready_only_after_navigation() {
        let machine = ReadinessMachine::new();
        machine.register("frame");
        machine.handle("frame", LifecycleEvent::ProcessStarted);
        machine.handle("frame", LifecycleEvent::DomReady { instrumented: false });
        let generation = machine.generation("frame");

        assert!(machine
            .handle("frame", LifecycleEvent::DomReady { instrumented: true })
            .is_none());
        assert_eq!(machine.current_state("frame"), WebviewState::DomNoOnlook);
        assert_eq!(machine.generation("frame"), generation);

        machine.handle("frame", LifecycleEvent::NavigationStarted);
        machine.handle("frame", LifecycleEvent::DomReady { instrumented: true });
        assert!(machine
            .handle("frame", LifecycleEvent::DomReady { instrumented: false })
            .is_none());
        assert!(machine.is_editable("frame"));
    }

    #[test]
    fn test_unknown_surface_is_not_running() {
        let machine = ReadinessMachine::new();
        assert_eq!(machine.current_state("nope"), WebviewState::NotRunning);
        assert!(!machine.is_editable("nope"));
    }

    #[test]
    fn test_observers_and_idempotent_unobserve() {
        let machine = ReadinessMachine::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let id = {
            let calls = calls.clone();
            machine.observe("frame", move |change| {
                assert_eq!(change.surface_id, "frame");
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        machine.handle("frame", LifecycleEvent::ProcessStarted);
        // No transition, no call
        machine.handle("frame", LifecycleEvent::ProcessStarted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        machine.unobserve(id);
        machine.unobserve(id);
        machine.handle("frame", LifecycleEvent::ProcessStopped);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        machine.remove("frame");
        machine.unobserve(id);
    }

    #[test]
    fn test_observer_may_query_machine() {
        let machine = Arc::new(ReadinessMachine::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let machine_ref = Arc::downgrade(&machine);
            let seen = seen.clone();
            machine.observe("frame", move |change| {
                if let Some(machine) = machine_ref.upgrade() {
                    seen.lock().unwrap().push(machine.current_state(&change.surface_id));
                }
            });
        }
        machine.handle("frame", LifecycleEvent::ProcessStarted);
        assert_eq!(*seen.lock().unwrap(), vec![WebviewState::RunningNoDom]);
    }

    #[test]
    fn test_broadcast_receives_changes() {
        let machine = ReadinessMachine::new();
        let mut events = machine.subscribe();
        machine.handle("frame", LifecycleEvent::ProcessStarted);

        let change = events.try_recv().unwrap();
        assert_eq!(change.previous, WebviewState::NotRunning);
        assert_eq!(change.current, WebviewState::RunningNoDom);
    }

    #[test]
    fn test_reload_budget_resets_when_enabled() {
        let machine = ReadinessMachine::new();
        let policy = RetryPolicy {
            max_attempts: 2,
            ..RetryPolicy::default()
        };
        machine.register("frame");
        assert_eq!(
            machine.next_reload_delay("frame", &policy),
            Some(Duration::from_millis(3000))
        );
        assert_eq!(
            machine.next_reload_delay("frame", &policy),
            Some(Duration::from_millis(6000))
        );
        assert_eq!(machine.next_reload_delay("frame", &policy), None);

        machine.handle("frame", LifecycleEvent::ProcessStarted);
        machine.handle("frame", LifecycleEvent::DomReady { instrumented: true });
        assert_eq!(machine.reload_attempts("frame"), 0);
    }

    #[test]
    fn test_state_wire_format() {
        let json = serde_json::to_string(&WebviewState::DomOnlookEnabled).unwrap();
        assert_eq!(json, "\"DOM_ONLOOK_ENABLED\"");
    }

    #[test]
    fn test_generation_bumps_on_transition() {
        let machine = ReadinessMachine::new();
        let before = machine.generation("frame");
        machine.handle("frame", LifecycleEvent::ProcessStarted);
        assert_ne!(machine.generation("frame"), before);
    }
}
