//! Debounced free-text search.
//!
//! Keystrokes arrive faster than a query is worth running. A [`Debouncer`]
//! holds the latest input until nothing new has arrived for the quiet period,
//! then hands it on once. New input always replaces (cancels) the pending one.
use log::debug;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

enum Msg {
    Input(String),
    Clear,
}

/// Coalesces rapid input on a background thread.
///
/// Dropping the debouncer stops the thread; a value still waiting out its
/// quiet period is discarded.
pub struct Debouncer {
    tx: Option<Sender<Msg>>,
    worker: Option<JoinHandle<()>>,
}

impl Debouncer {
    /// Start a debouncer that calls `on_settle` with each settled value.
    pub fn spawn<F>(quiet: Duration, mut on_settle: F) -> Self
    where
        F: FnMut(String) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Msg>();
        let worker = thread::spawn(move || {
            let mut pending: Option<String> = None;
            loop {
                let next = if pending.is_some() {
                    rx.recv_timeout(quiet)
                } else {
                    rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
                };
                match next {
                    Ok(Msg::Input(s)) => pending = Some(s),
                    Ok(Msg::Clear) => {
                        pending = None;
                        on_settle(String::new());
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        if let Some(s) = pending.take() {
                            debug!("search settled on {:?}", s);
                            on_settle(s);
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    /// Feed the latest input, restarting the quiet period.
    pub fn push(&self, input: impl Into<String>) {
        if let Some(tx) = &self.tx {
            // The worker only exits once the sender is gone, so this cannot fail
            // while `self` is alive.
            let _ = tx.send(Msg::Input(input.into()));
        }
    }

    /// Drop any pending input and deliver an empty term right away.
    pub fn clear(&self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Msg::Clear);
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn collector() -> (Arc<Mutex<Vec<String>>>, impl FnMut(String) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |s| sink.lock().unwrap().push(s))
    }

    #[test]
    fn rapid_input_settles_once_on_the_last_value() {
        let (seen, sink) = collector();
        let d = Debouncer::spawn(Duration::from_millis(80), sink);
        for term in ["f", "fr", "fra", "fran"] {
            d.push(term);
            thread::sleep(Duration::from_millis(5));
        }
        thread::sleep(Duration::from_millis(400));
        assert_eq!(*seen.lock().unwrap(), vec!["fran".to_string()]);
    }

    #[test]
    fn separated_inputs_each_settle() {
        let (seen, sink) = collector();
        let d = Debouncer::spawn(Duration::from_millis(30), sink);
        d.push("ind");
        thread::sleep(Duration::from_millis(300));
        d.push("indo");
        thread::sleep(Duration::from_millis(300));
        assert_eq!(*seen.lock().unwrap(), vec!["ind".to_string(), "indo".to_string()]);
    }

    #[test]
    fn clear_cancels_pending_and_delivers_empty() {
        let (seen, sink) = collector();
        let d = Debouncer::spawn(Duration::from_millis(200), sink);
        d.push("bra");
        d.clear();
        thread::sleep(Duration::from_millis(500));
        assert_eq!(*seen.lock().unwrap(), vec![String::new()]);
    }

    #[test]
    fn drop_discards_pending_input() {
        let (seen, sink) = collector();
        {
            let d = Debouncer::spawn(Duration::from_secs(5), sink);
            d.push("never");
        }
        assert!(seen.lock().unwrap().is_empty());
    }
}
