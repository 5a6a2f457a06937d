//! Control loop, request channel and notification publisher

pub mod controller;
pub mod publisher;

pub use controller::Controller;
pub use publisher::Publisher;

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

use crate::error::ControlError;
use crate::protocol::{Ack, Request};

/// A request plus the slot its acknowledgement goes to
#[derive(Debug)]
pub struct ControlRequest {
    pub request: Request,
    pub reply: oneshot::Sender<Ack>,
}

/// Cloneable submit side of the control loop
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlRequest>,
}

impl ControlHandle {
    /// Queue a request and wait for its acknowledgement
    pub async fn submit(&self, request: Request) -> Result<Ack, ControlError> {
        let (reply, ack) = oneshot::channel();
        self.tx
            .send(ControlRequest { request, reply })
            .await
            .map_err(|_| ControlError::LoopClosed)?;
        ack.await.map_err(|_| ControlError::LoopClosed)
    }
}

/// Bounded request channel; requests beyond `depth` wait in `submit`
pub fn channel(depth: usize) -> (ControlHandle, mpsc::Receiver<ControlRequest>) {
    let (tx, rx) = mpsc::channel(depth);
    (ControlHandle { tx }, rx)
}

/// Process-wide stop signal
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`Shutdown::trigger`] has been called
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as `self`, so this only returns on trigger.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
