//! Log and progress channels out of the installer.
//!
//! The installer never renders anything itself. It pushes human-readable log
//! lines, per-asset percentages and stage transitions into an
//! [`InstallObserver`] supplied by the caller. A failing or panicking
//! observer never affects the install.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender};

use tracing::{debug, warn};

use super::installer::InstallStage;

/// Receives installer output.
pub trait InstallObserver {
    /// A human-readable log line.
    fn log(&self, line: &str);

    /// Whole-percent progress for one asset.
    fn progress(&self, asset: &str, percent: u8);

    /// The installer entered a new stage.
    fn stage(&self, _stage: InstallStage) {}
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl InstallObserver for NullObserver {
    fn log(&self, _line: &str) {}

    fn progress(&self, _asset: &str, _percent: u8) {}
}

/// An event delivered through a [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallEvent {
    /// Stage transition.
    Stage(InstallStage),
    /// Log line.
    Log(String),
    /// Asset progress.
    Progress { asset: String, percent: u8 },
}

/// Observer forwarding events over a bounded channel.
///
/// Sending never blocks: events are dropped when the channel is full or the
/// receiver has gone away.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: SyncSender<InstallEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel.
    pub fn new(capacity: usize) -> (Self, Receiver<InstallEvent>) {
        let (tx, rx) = mpsc::sync_channel(capacity);
        (Self { tx }, rx)
    }

    fn send(&self, event: InstallEvent) {
        let _ = self.tx.try_send(event);
    }
}

impl InstallObserver for ChannelObserver {
    fn log(&self, line: &str) {
        self.send(InstallEvent::Log(line.to_string()));
    }

    fn progress(&self, asset: &str, percent: u8) {
        self.send(InstallEvent::Progress {
            asset: asset.to_string(),
            percent,
        });
    }

    fn stage(&self, stage: InstallStage) {
        self.send(InstallEvent::Stage(stage));
    }
}

/// Observer built from a pair of closures.
pub struct FnObserver<L, P>
where
    L: Fn(&str),
    P: Fn(&str, u8),
{
    on_log: L,
    on_progress: P,
}

impl<L, P> FnObserver<L, P>
where
    L: Fn(&str),
    P: Fn(&str, u8),
{
    /// Create an observer calling `on_log` and `on_progress`.
    pub fn new(on_log: L, on_progress: P) -> Self {
        Self {
            on_log,
            on_progress,
        }
    }
}

impl<L, P> InstallObserver for FnObserver<L, P>
where
    L: Fn(&str),
    P: Fn(&str, u8),
{
    fn log(&self, line: &str) {
        (self.on_log)(line)
    }

    fn progress(&self, asset: &str, percent: u8) {
        (self.on_progress)(asset, percent)
    }
}

/// Installer-side handle that isolates the caller's observer.
///
/// Every call is wrapped in `catch_unwind`, and log lines and stages are
/// mirrored to `tracing`.
#[derive(Clone, Copy)]
pub(crate) struct Reporter<'a> {
    observer: &'a dyn InstallObserver,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(observer: &'a dyn InstallObserver) -> Self {
        Self { observer }
    }

    pub(crate) fn log(&self, line: &str) {
        debug!(target: "launchkit::install", "{}", line);
        self.guard(|o| o.log(line));
    }

    pub(crate) fn progress(&self, asset: &str, percent: u8) {
        self.guard(|o| o.progress(asset, percent));
    }

    pub(crate) fn stage(&self, stage: InstallStage) {
        debug!(stage = stage.name(), "install stage");
        self.guard(|o| o.stage(stage));
    }

    fn guard(&self, f: impl FnOnce(&dyn InstallObserver)) {
        let observer = self.observer;
        if panic::catch_unwind(AssertUnwindSafe(|| f(observer))).is_err() {
            warn!("install observer panicked; event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_channel_observer_delivers_events() {
        let (observer, rx) = ChannelObserver::new(8);
        observer.stage(InstallStage::FetchRelease);
        observer.log("hello");
        observer.progress("a.7z.001", 42);

        let events: Vec<InstallEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                InstallEvent::Stage(InstallStage::FetchRelease),
                InstallEvent::Log("hello".to_string()),
                InstallEvent::Progress {
                    asset: "a.7z.001".to_string(),
                    percent: 42
                },
            ]
        );
    }

    #[test]
    fn test_channel_observer_drops_when_full() {
        let (observer, rx) = ChannelObserver::new(1);
        observer.log("first");
        observer.log("second");
        let events: Vec<InstallEvent> = rx.try_iter().collect();
        assert_eq!(events, vec![InstallEvent::Log("first".to_string())]);
    }

    #[test]
    fn test_channel_observer_survives_dropped_receiver() {
        let (observer, rx) = ChannelObserver::new(4);
        drop(rx);
        observer.log("nobody listening");
        observer.progress("a", 1);
    }

    #[test]
    fn test_fn_observer() {
        let logs = RefCell::new(Vec::new());
        let progress = RefCell::new(Vec::new());
        let observer = FnObserver::new(
            |line: &str| logs.borrow_mut().push(line.to_string()),
            |asset: &str, pct: u8| progress.borrow_mut().push((asset.to_string(), pct)),
        );

        observer.log("line");
        observer.progress("b.7z.002", 100);

        assert_eq!(logs.into_inner(), vec!["line".to_string()]);
        assert_eq!(progress.into_inner(), vec![("b.7z.002".to_string(), 100)]);
    }

    #[test]
    fn test_reporter_contains_panics() {
        let observer = FnObserver::new(|_: &str| panic!("sink exploded"), |_: &str, _: u8| {});
        let reporter = Reporter::new(&observer);
        reporter.log("does not propagate");
        reporter.progress("a", 5);
    }
}
