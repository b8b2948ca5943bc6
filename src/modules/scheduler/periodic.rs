// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::{common::signal::SIGNAL_MANAGER, error::RelayResult};
use std::{future::Future, time::Duration};
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

pub struct PeriodicTask {
    name: String,
}

pub struct TaskHandle {
    cancel_sender: oneshot::Sender<()>,
    join_handle: tokio::task::JoinHandle<()>,
}

impl TaskHandle {
    pub async fn cancel(self) {
        let _ = self.cancel_sender.send(());
        let _ = self.join_handle.await;
    }

    /// Waits for the loop to end on its own, i.e. on the shutdown signal.
    pub async fn join(self) {
        let _ = self.join_handle.await;
    }
}

impl PeriodicTask {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
        }
    }

    /// Runs `task` every `interval` until cancelled or the process shuts down.
    /// A run that overshoots the interval delays the next one instead of
    /// triggering a burst.
    pub fn start<F, T>(self, task: T, interval: Duration, run_immediately: bool) -> TaskHandle
    where
        T: Fn() -> F + Send + Sync + 'static,
        F: Future<Output = RelayResult<()>> + Send + 'static,
    {
        info!("Task '{}' started", &self.name);

        let (cancel_sender, cancel_receiver) = oneshot::channel::<()>();
        let name = self.name;

        let join_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut shutdown = SIGNAL_MANAGER.subscribe();

            if !run_immediately {
                interval.tick().await; // discard first immediate tick
            }
            let mut cancel_receiver = Some(cancel_receiver);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = task().await {
                            warn!("Task '{}' failed: {:?}", name, e);
                        }
                    }
                    cancelled = async {
                        match cancel_receiver.as_mut() {
                            Some(rx) => rx.await.is_ok(),
                            None => futures::future::pending().await,
                        }
                    } => {
                        if cancelled {
                            info!("Task '{}' received cancellation signal", name);
                            break;
                        }
                        // handle dropped without cancelling
                        cancel_receiver = None;
                    }
                    _ = shutdown.recv() => {
                        info!("Task '{}' shutting down due to shutdown signal", name);
                        break;
                    }
                }
            }

            info!("Task '{}' stopped", name);
        });

        TaskHandle {
            cancel_sender,
            join_handle,
        }
    }
}
