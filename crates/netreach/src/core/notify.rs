//! Change notification
//!
//! Two channels fire after every successful snapshot write: local listeners
//! registered on the writing store handle, and a cross-context broadcast to
//! every other handle joined to the same [`BroadcastHub`]. Notices carry no
//! payload beyond who wrote and when; receivers re-read the store.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{trace, warn};

/// Default broadcast buffer size
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

/// Identifies one execution context (one store handle)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate a process-unique ID
    pub fn next() -> Self {
        ContextId(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// "Something changed" notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeNotice {
    /// Context that performed the write
    pub origin: ContextId,
    /// When the write happened
    pub at: DateTime<Utc>,
}

impl ChangeNotice {
    pub fn now(origin: ContextId) -> Self {
        Self {
            origin,
            at: Utc::now(),
        }
    }
}

/// Shared broadcast channel between contexts
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    sender: broadcast::Sender<ChangeNotice>,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send a notice to every subscriber
    ///
    /// Returns the number of receivers reached. Having none is normal.
    pub fn publish(&self, notice: ChangeNotice) -> usize {
        match self.sender.send(notice) {
            Ok(receivers) => {
                trace!(origin = %notice.origin, receivers, "Change broadcast");
                receivers
            }
            Err(_) => 0,
        }
    }

    /// Subscribe on behalf of `context`; its own notices are skipped
    pub fn subscribe(&self, context: ContextId) -> ChangeSubscription {
        ChangeSubscription {
            context,
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Receiving end for one context
#[derive(Debug)]
pub struct ChangeSubscription {
    context: ContextId,
    receiver: broadcast::Receiver<ChangeNotice>,
}

impl ChangeSubscription {
    /// The context this subscription belongs to
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Next notice from another context, without blocking
    ///
    /// A lagged receiver skips the notices it missed and keeps going; since
    /// notices carry no data, one notice is as good as many.
    pub fn try_next(&mut self) -> Option<ChangeNotice> {
        loop {
            match self.receiver.try_recv() {
                Ok(notice) if notice.origin == self.context => continue,
                Ok(notice) => return Some(notice),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(context = %self.context, skipped, "Change subscription lagged");
                    continue;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Take every pending notice from other contexts
    pub fn drain(&mut self) -> Vec<ChangeNotice> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

/// Local listener callback
pub type Listener = Box<dyn Fn(&ChangeNotice) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_ids_are_unique() {
        let a = ContextId::next();
        let b = ContextId::next();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("ctx-"));
    }

    #[test]
    fn test_subscription_skips_own_notices() {
        let hub = BroadcastHub::default();
        let me = ContextId::next();
        let other = ContextId::next();
        let mut mine = hub.subscribe(me);
        let mut theirs = hub.subscribe(other);

        hub.publish(ChangeNotice::now(me));

        assert!(mine.try_next().is_none());
        assert_eq!(theirs.try_next().map(|n| n.origin), Some(me));
        assert!(theirs.try_next().is_none());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = BroadcastHub::new(4);
        assert_eq!(hub.publish(ChangeNotice::now(ContextId::next())), 0);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_lagged_subscription_recovers() {
        let hub = BroadcastHub::new(2);
        let writer = ContextId::next();
        let mut sub = hub.subscribe(ContextId::next());
        for _ in 0..5 {
            hub.publish(ChangeNotice::now(writer));
        }
        let drained = sub.drain();
        assert_eq!(drained.len(), 2);
        assert!(sub.try_next().is_none());
    }
}
