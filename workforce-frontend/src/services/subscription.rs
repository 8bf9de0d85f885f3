use super::provider::{AuthEvent, AuthEventStream};
use futures::StreamExt;

/// Scoped ownership of an auth event feed.
///
/// The underlying stream is released when the guard goes out of scope, on
/// every exit path of the owner.
pub struct Subscription {
    stream: Option<AuthEventStream>,
}

impl Subscription {
    pub fn new(stream: AuthEventStream) -> Self {
        tracing::debug!("Subscribed to auth events");
        Self {
            stream: Some(stream),
        }
    }

    /// Next event, or `None` once the feed has ended or been released.
    pub async fn next(&mut self) -> Option<AuthEvent> {
        let event = match self.stream.as_mut() {
            Some(stream) => stream.next().await,
            None => return None,
        };
        if event.is_none() {
            self.release();
        }
        event
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn release(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("Auth event subscription released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::provider::event_stream;
    use tokio::sync::broadcast;

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let (tx, rx) = broadcast::channel::<AuthEvent>(4);
        let subscription = Subscription::new(event_stream(rx));
        assert_eq!(tx.receiver_count(), 1);

        drop(subscription);
        assert_eq!(tx.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_end_releases() {
        let (tx, rx) = broadcast::channel::<AuthEvent>(4);
        let mut subscription = Subscription::new(event_stream(rx));
        drop(tx);

        assert!(subscription.next().await.is_none());
        assert!(!subscription.is_active());
        assert!(subscription.next().await.is_none());
    }
}
