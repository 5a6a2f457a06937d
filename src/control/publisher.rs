//! Fire-and-forget notification broadcast

use tokio::sync::broadcast;

use crate::protocol::{Notification, Publication};

/// Broadcasts notifications to every current subscriber.
///
/// Nobody listening is not an error; subscribers that fall more than the
/// channel capacity behind lose the oldest messages.
#[derive(Debug, Clone)]
pub struct Publisher {
    tx: broadcast::Sender<Publication>,
}

impl Publisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish one notification, returning how many subscribers got it
    pub fn publish(&self, notification: &Notification) -> usize {
        let publication = Publication::new(notification);
        tracing::debug!("notify {} {:?}", notification.target(), publication.message);

        self.tx.send(publication).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Publication> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
