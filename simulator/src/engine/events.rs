/*
 * Event Log
 *
 * Append-only, timestamped stream of simulation events: one line per tick
 * summary and one per state transition. The engine and the memory manager
 * share a single log so their lines interleave in causal order.
 *
 * Lines are mirrored to the `log` facade at debug level; registered
 * listeners receive each line as it is appended. Listener panics are caught
 * and must not take the simulation down.
 */

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

type Listener = Arc<dyn Fn(&str) + Send + Sync>;

pub struct EventLog {
    started: Instant,
    events: Mutex<Vec<String>>,
    listeners: Mutex<Vec<Listener>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            events: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn lock<'a, T>(m: &'a Mutex<T>) -> MutexGuard<'a, T> {
        m.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a line stamped with the elapsed wall-clock time, then fans it
    /// out to listeners with the internal lock released.
    pub fn log(&self, message: impl AsRef<str>) {
        let line = format!(
            "[+{:.3}s] {}",
            self.started.elapsed().as_secs_f64(),
            message.as_ref()
        );
        Self::lock(&self.events).push(line.clone());
        log::debug!("{}", line);

        let listeners: Vec<Listener> = Self::lock(&self.listeners).clone();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(&line))).is_err() {
                log::warn!("event log listener panicked; dropping the event");
            }
        }
    }

    /// Snapshot copy of every line logged so far.
    pub fn events(&self) -> Vec<String> {
        Self::lock(&self.events).clone()
    }

    pub fn len(&self) -> usize {
        Self::lock(&self.events).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add_listener(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        Self::lock(&self.listeners).push(Arc::new(listener));
    }

    pub fn clear(&self) {
        Self::lock(&self.events).clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn lines_are_recorded_and_stamped() {
        let log = EventLog::new();
        log.log("hello");
        let events = log.events();
        assert_eq!(events.len(), 1);
        assert!(events[0].starts_with("[+"));
        assert!(events[0].ends_with("hello"));
    }

    #[test]
    fn listeners_see_every_line() {
        let log = EventLog::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        log.add_listener(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        log.log("one");
        log.log("two");
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panicking_listener_does_not_poison_the_log() {
        let log = EventLog::new();
        log.add_listener(|_| panic!("bad listener"));
        log.log("survives");
        assert_eq!(log.len(), 1);
        log.clear();
        assert!(log.is_empty());
    }
}
