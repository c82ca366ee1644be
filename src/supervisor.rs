//! Hot reload: keeps the program running, rebuilding and restarting it when
//! its sources change.
//!
//! The loop is a small state machine fed by the watch listener's channel:
//!
//! ```text
//! Idle -> Running -> RestartPending -> Rebuilding -> Running -> ... -> Exited
//!                                           |
//!                                           +-> Waiting (build failed) -> RestartPending
//! ```
//!
//! A program killed for a restart is expected and never reported; only a
//! program exiting on its own ends the loop.

use crate::runner::RunHandle;
use crate::watch::Event;
use std::path::Path;
use std::process::ExitStatus;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

/// How long to wait for a change before checking on the program again.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The build and run steps, as seen by the supervisor.
pub trait Launcher {
    /// Rebuild the program.  Returns false if the toolchain failed; the
    /// failure has already been reported to the user.
    fn rebuild(&mut self) -> anyhow::Result<bool>;

    /// Start the program.
    fn start(&mut self) -> anyhow::Result<RunHandle>;

    /// Whether a change to `path` leaves the current binary out of date.
    fn is_stale(&self, path: &Path) -> bool;
}

enum State {
    /// Nothing started yet.
    Idle,
    Running(RunHandle),
    /// A change was seen; the program (if any) must go.
    RestartPending(Option<RunHandle>),
    Rebuilding,
    /// The last rebuild failed; nothing runs until the next change.
    Waiting,
    Exited(ExitStatus),
}

struct Supervisor<'a, L: Launcher> {
    launcher: &'a mut L,
    events: &'a Receiver<Event>,
}

impl<'a, L: Launcher> Supervisor<'a, L> {
    /// Wait up to `timeout` for one event.  Returns true if it was a change
    /// that requires a rebuild.
    fn wait_for_change(&mut self, timeout: Duration) -> anyhow::Result<bool> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Ok(self.handle(event)),
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => anyhow::bail!("file watcher stopped"),
        }
    }

    fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Changed(path) => {
                if self.launcher.is_stale(&path) {
                    tracing::info!("{} changed, restarting", path.display());
                    true
                } else {
                    tracing::debug!("{} unchanged since build", path.display());
                    false
                }
            }
            Event::Error(err) => {
                tracing::warn!("watch error: {}", err);
                false
            }
        }
    }

    /// Discard events queued behind the one that triggered a restart; they
    /// are all served by the same rebuild.
    fn drain(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            if let Event::Error(err) = event {
                tracing::warn!("watch error: {}", err);
            }
        }
    }

    fn step(&mut self, state: State) -> anyhow::Result<State> {
        Ok(match state {
            State::Idle => State::Running(self.launcher.start()?),
            State::Running(mut handle) => {
                let changed = match self.wait_for_change(POLL_INTERVAL) {
                    Ok(changed) => changed,
                    Err(err) => {
                        handle.kill()?;
                        return Err(err);
                    }
                };
                if changed {
                    State::RestartPending(Some(handle))
                } else {
                    match handle.try_wait()? {
                        Some(status) => State::Exited(status),
                        None => State::Running(handle),
                    }
                }
            }
            State::RestartPending(handle) => {
                self.drain();
                if let Some(handle) = handle {
                    handle.kill()?;
                }
                State::Rebuilding
            }
            State::Rebuilding => {
                if self.launcher.rebuild()? {
                    State::Running(self.launcher.start()?)
                } else {
                    tracing::warn!("build failed, waiting for changes");
                    State::Waiting
                }
            }
            State::Waiting => {
                if self.wait_for_change(POLL_INTERVAL)? {
                    State::RestartPending(None)
                } else {
                    State::Waiting
                }
            }
            State::Exited(status) => State::Exited(status),
        })
    }
}

/// Run the (already built) program under supervision until it exits on its
/// own, returning its exit status.  `events` carries changes from the
/// watch listener.
pub fn supervise<L: Launcher>(
    launcher: &mut L,
    events: &Receiver<Event>,
) -> anyhow::Result<ExitStatus> {
    let mut supervisor = Supervisor { launcher, events };
    let mut state = State::Idle;
    loop {
        state = supervisor.step(state)?;
        if let State::Exited(status) = state {
            return Ok(status);
        }
    }
}
