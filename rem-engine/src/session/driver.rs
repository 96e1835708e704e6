//! Runs controller effects on the tokio runtime.
//!
//! Measurement results are posted back over a channel and only applied when
//! the caller settles them, so the controller itself is never shared across
//! tasks.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use super::controller::{Command, Dispatch, Effect, SessionController};
use crate::service::RemService;

pub struct MeasurementDriver<S> {
    controller: SessionController<S>,
    tx: UnboundedSender<Command>,
    rx: UnboundedReceiver<Command>,
    pending: usize,
}

impl<S: RemService> MeasurementDriver<S> {
    pub fn new(controller: SessionController<S>) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            controller,
            tx,
            rx,
            pending: 0,
        }
    }

    pub fn controller(&self) -> &SessionController<S> {
        &self.controller
    }

    /// Dispatch a command and start any effect it produced.
    pub fn send(&mut self, command: Command) -> Dispatch {
        let dispatch = self.controller.dispatch(command);
        if let Some(effect) = dispatch.effect.clone() {
            self.spawn(effect);
        }
        dispatch
    }

    fn spawn(&mut self, effect: Effect) {
        match effect {
            Effect::Measure { ticket, request } => {
                let service = self.controller.service();
                let tx = self.tx.clone();
                self.pending += 1;
                debug!("Spawning measurement task for {:?}", ticket);
                tokio::spawn(async move {
                    let result = service.perform_measurement(request).await;
                    // Receiver only goes away with the driver
                    let _ = tx.send(Command::MeasurementFinished { ticket, result });
                });
            }
        }
    }

    /// Wait for the next measurement result and apply it.
    ///
    /// Returns `None` when nothing is pending.
    pub async fn settle(&mut self) -> Option<Dispatch> {
        if self.pending == 0 {
            return None;
        }
        let command = self.rx.recv().await?;
        self.pending -= 1;
        Some(self.send(command))
    }

    /// Apply a result that has already arrived, without waiting.
    pub fn try_settle(&mut self) -> Option<Dispatch> {
        let command = self.rx.try_recv().ok()?;
        self.pending = self.pending.saturating_sub(1);
        Some(self.send(command))
    }

    /// Dispatch a command and wait for every measurement it started.
    pub async fn send_and_settle(&mut self, command: Command) -> Dispatch {
        let mut last = self.send(command);
        while let Some(dispatch) = self.settle().await {
            last = dispatch;
        }
        last
    }
}
