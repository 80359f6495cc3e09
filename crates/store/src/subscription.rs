use serde_json::Value;
use shared::keys::{Collection, EntityKey};
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};
use tracing::warn;

/// New value of one key after a patch was applied; `None` means removed.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub key: EntityKey,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyFilter {
    Key(EntityKey),
    Collection(Collection),
}

impl KeyFilter {
    pub fn matches(&self, key: &EntityKey) -> bool {
        match self {
            KeyFilter::Key(expected) => expected == key,
            KeyFilter::Collection(collection) => key.belongs_to(*collection),
        }
    }
}

impl From<EntityKey> for KeyFilter {
    fn from(value: EntityKey) -> Self {
        KeyFilter::Key(value)
    }
}

impl From<Collection> for KeyFilter {
    fn from(value: Collection) -> Self {
        KeyFilter::Collection(value)
    }
}

pub struct Subscription {
    filter: KeyFilter,
    initial: Vec<(EntityKey, Value)>,
    receiver: broadcast::Receiver<StoreChange>,
}

impl Subscription {
    pub(crate) fn new(
        filter: KeyFilter,
        initial: Vec<(EntityKey, Value)>,
        receiver: broadcast::Receiver<StoreChange>,
    ) -> Self {
        Self {
            filter,
            initial,
            receiver,
        }
    }

    pub fn filter(&self) -> &KeyFilter {
        &self.filter
    }

    /// Values that matched the filter when the subscription was registered.
    pub fn initial(&self) -> &[(EntityKey, Value)] {
        &self.initial
    }

    /// Next matching change, or `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<StoreChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if self.filter.matches(&change.key) => return Some(change),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "store: subscriber lagged behind; skipping ahead");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching change that is already queued.
    pub fn try_recv(&mut self) -> Option<StoreChange> {
        loop {
            match self.receiver.try_recv() {
                Ok(change) if self.filter.matches(&change.key) => return Some(change),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "store: subscriber lagged behind; skipping ahead");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = StoreChange> + Send {
        let filter = self.filter;
        BroadcastStream::new(self.receiver).filter_map(move |item| match item {
            Ok(change) if filter.matches(&change.key) => Some(change),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "store: subscriber stream lagged behind; skipping ahead");
                None
            }
        })
    }
}
