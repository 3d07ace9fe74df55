//! A single-threaded, cooperative event dispatcher for the cache's internal
//! event traffic. Where `procedure_engine.rs` returns one `TickResult` per
//! call and lets its caller act on it directly, this dispatcher generalizes
//! that to a queue of typed events and a list of interested observers, since
//! a single cache re-evaluation can produce several events (a new message,
//! a score changing, several scores changing at once) that must all be
//! delivered in the order they were raised.
//!
//! There is no threading and no channel here — `emit` enqueues, `drain`
//! runs every observer against every queued event on the caller's own call
//! stack, in FIFO order. This mirrors the single-threaded cooperative
//! scheduling the originating `circuits`-based design relied on, without
//! adopting its name-based dispatch: events are a closed `enum`, not strings.

use std::collections::VecDeque;

/// Dispatcher traffic. Unlike `NewMessage` (per group), `NewScore` and
/// `UpdateScore` both describe the cache's single aggregate priority score
/// (spec.md §1/§4.3: "reflecting the worst active 'here' alert" — one
/// number for the whole cache, not one per group). Whenever a
/// re-evaluation finds the tracked `(here_ids, elsewhere_ids, score)`
/// snapshot has changed, the cache raises `NewScore` (the new aggregate
/// value) immediately followed by `UpdateScore` (naming the message that
/// triggered the re-evaluation) — always as a pair, per spec.md §4.3's
/// `new_score(score, m)` / `update_score(m)` pairing, never one without
/// the other.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertEvent {
    NewMessage { event_id: String },
    Tick { now: i64 },
    NewScore { score: i32, triggering_event_id: Option<String> },
    UpdateScore { triggering_event_id: Option<String> },
    Shutdown,
}

/// An observer of dispatcher traffic. `handle` is called once per queued
/// event, in registration-priority order, then FIFO within that.
pub trait AlertObserver {
    fn handle(&mut self, event: &AlertEvent);
}

struct Registration {
    priority: i32,
    observer: Box<dyn AlertObserver>,
}

/// Owns the observer list and the pending event queue. Nothing here ever
/// spawns a thread; `drain` runs to completion on the calling stack.
pub struct Dispatcher {
    registrations: Vec<Registration>,
    queue: VecDeque<AlertEvent>,
    shutdown: bool,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self { registrations: Vec::new(), queue: VecDeque::new(), shutdown: false }
    }

    /// Register an observer. Higher `priority` observers see each event
    /// first; observers with equal priority run in registration order.
    pub fn register(&mut self, priority: i32, observer: Box<dyn AlertObserver>) {
        let pos = self.registrations.iter().position(|r| r.priority < priority).unwrap_or(self.registrations.len());
        self.registrations.insert(pos, Registration { priority, observer });
    }

    /// Queue an event for delivery on the next `drain`. A no-op after
    /// shutdown has been emitted and drained.
    pub fn emit(&mut self, event: AlertEvent) {
        if self.shutdown {
            return;
        }
        self.queue.push_back(event);
    }

    /// Deliver every queued event, in FIFO order, to every observer in
    /// priority order. Stops queuing further events once `Shutdown` is
    /// drained, though events already queued ahead of it are still
    /// delivered first.
    pub fn drain(&mut self) {
        while let Some(event) = self.queue.pop_front() {
            for reg in &mut self.registrations {
                reg.observer.handle(&event);
            }
            if matches!(event, AlertEvent::Shutdown) {
                self.shutdown = true;
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }
}
