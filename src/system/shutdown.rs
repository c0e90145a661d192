use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::engine::ProbeEngine;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

pub type ShutdownSender = broadcast::Sender<()>;
pub type ShutdownReceiver = broadcast::Receiver<()>;

/// Broadcast channel size for the "work finished" notification.
const SHUTDOWN_CHANNEL_CAPACITY: usize = 1;

#[must_use]
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    broadcast::channel::<()>(SHUTDOWN_CHANNEL_CAPACITY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownAction {
    /// Stop dispatching and let in-flight requests finish.
    StopRuns,
    /// Abort everything still in flight.
    CancelAll,
}

/// First interrupt drains, every later one aborts.
#[derive(Debug, Default)]
pub struct SignalEscalation {
    received: u32,
}

impl SignalEscalation {
    pub fn next_action(&mut self) -> ShutdownAction {
        self.received = self.received.saturating_add(1);
        if self.received == 1 {
            ShutdownAction::StopRuns
        } else {
            ShutdownAction::CancelAll
        }
    }

    pub fn apply(&mut self, engine: &ProbeEngine) -> ShutdownAction {
        let action = self.next_action();
        match action {
            ShutdownAction::StopRuns => {
                info!("Interrupt received; draining in-flight requests (interrupt again to abort)");
                engine.stop_runs();
            }
            ShutdownAction::CancelAll => {
                let cancelled = engine.cancel_all();
                warn!("Interrupt received again; cancelled {} in-flight requests", cancelled);
            }
        }
        action
    }
}

/// Listens for Ctrl-C and SIGTERM until `done` fires, escalating on repeats.
pub fn setup_signal_handler(
    engine: Arc<ProbeEngine>,
    mut done: ShutdownReceiver,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut escalation = SignalEscalation::default();

        #[cfg(unix)]
        let mut term_signal = match signal(SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(err) => {
                warn!("Failed to register SIGTERM handler: {}", err);
                None
            }
        };

        loop {
            #[cfg(unix)]
            let interrupted = tokio::select! {
                _ = done.recv() => false,
                result = tokio::signal::ctrl_c() => result.is_ok(),
                () = async {
                    if let Some(signal) = term_signal.as_mut() {
                        signal.recv().await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                } => true,
            };

            #[cfg(not(unix))]
            let interrupted = tokio::select! {
                _ = done.recv() => false,
                result = tokio::signal::ctrl_c() => result.is_ok(),
            };

            if !interrupted {
                break;
            }
            escalation.apply(&engine);
        }
    })
}
