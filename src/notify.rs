use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteInserted {
    pub user_id: Uuid,
    pub election_id: Uuid,
    pub option_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wakeup {
    Inserted(VoteInserted),
    /// The subscriber fell behind and missed `n` events; recompute anyway.
    Lagged(u64),
}

/// Fan-out of vote-insert events to per-identity subscribers.
#[derive(Clone)]
pub struct VoteNotifier {
    tx: broadcast::Sender<VoteInserted>,
}

impl VoteNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        VoteNotifier { tx }
    }

    pub fn publish(&self, event: VoteInserted) {
        // no receivers is not an error
        let _ = self.tx.send(event);
    }

    /// Subscribes to inserts for one identity. Dropping the returned
    /// subscription unsubscribes.
    pub fn subscribe(&self, user_id: Uuid) -> VoteSubscription {
        VoteSubscription {
            user_id,
            rx: self.tx.subscribe(),
        }
    }

    pub fn active_subscriptions(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for VoteNotifier {
    fn default() -> Self {
        Self::new(100)
    }
}

pub struct VoteSubscription {
    user_id: Uuid,
    rx: broadcast::Receiver<VoteInserted>,
}

impl VoteSubscription {
    /// Waits for the next insert belonging to this identity. `None` once the
    /// notifier is gone.
    pub async fn next(&mut self) -> Option<Wakeup> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.user_id == self.user_id => return Some(Wakeup::Inserted(event)),
                Ok(_) => continue,
                Err(RecvError::Lagged(n)) => return Some(Wakeup::Lagged(n)),
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn inserted(user_id: Uuid) -> VoteInserted {
        VoteInserted {
            user_id,
            election_id: Uuid::new_v4(),
            option_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn subscription_only_sees_its_own_identity() {
        let notifier = VoteNotifier::default();
        let me = Uuid::new_v4();
        let mut sub = notifier.subscribe(me);

        notifier.publish(inserted(Uuid::new_v4()));
        let mine = inserted(me);
        notifier.publish(mine.clone());

        assert_eq!(sub.next().await, Some(Wakeup::Inserted(mine)));
    }

    #[tokio::test]
    async fn other_identities_do_not_wake_the_subscriber() {
        let notifier = VoteNotifier::default();
        let mut sub = notifier.subscribe(Uuid::new_v4());
        notifier.publish(inserted(Uuid::new_v4()));

        let woke = tokio::time::timeout(Duration::from_millis(50), sub.next()).await;
        assert!(woke.is_err());
    }

    #[tokio::test]
    async fn dropping_the_subscription_releases_it() {
        let notifier = VoteNotifier::default();
        let sub = notifier.subscribe(Uuid::new_v4());
        assert_eq!(notifier.active_subscriptions(), 1);
        drop(sub);
        assert_eq!(notifier.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn lagging_subscriber_is_told_to_recompute() {
        let notifier = VoteNotifier::new(2);
        let me = Uuid::new_v4();
        let mut sub = notifier.subscribe(me);
        for _ in 0..5 {
            notifier.publish(inserted(me));
        }
        assert!(matches!(sub.next().await, Some(Wakeup::Lagged(_))));
    }
}
