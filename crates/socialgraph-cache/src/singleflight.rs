use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::broadcast;

const FLIGHT_CHANNEL_CAPACITY: usize = 1;

/// Outcome a flight leader publishes to its followers.
#[derive(Debug, Clone)]
pub enum FlightOutcome<V> {
    Completed(V),
    Failed,
}

/// Role assigned when joining a flight for a key.
pub enum FlightRole<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// First caller for this key: compute the value and publish it through
    /// the guard.
    Leader(FlightGuard<K, V>),
    /// A computation for this key is already in flight: await its outcome.
    Follower(broadcast::Receiver<FlightOutcome<V>>),
}

/// Collapses concurrent computations of the same missing key into one
/// in-flight computation whose result is shared with all waiters.
///
/// A leader that fails (or is dropped mid-computation) publishes `Failed`;
/// followers then recompute independently, which is wasteful but never
/// incorrect.
pub struct Flight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    inflight: Arc<DashMap<K, broadcast::Sender<FlightOutcome<V>>>>,
}

impl<K, V> Flight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(DashMap::new()),
        }
    }

    /// Join the flight for `key`. The entry guard is held while assigning
    /// roles, so a follower always subscribes before the leader can publish.
    pub fn join(&self, key: K) -> FlightRole<K, V> {
        match self.inflight.entry(key.clone()) {
            Entry::Occupied(existing) => FlightRole::Follower(existing.get().subscribe()),
            Entry::Vacant(vacant) => {
                let (tx, _) = broadcast::channel(FLIGHT_CHANNEL_CAPACITY);
                vacant.insert(tx.clone());
                FlightRole::Leader(FlightGuard {
                    inflight: Arc::clone(&self.inflight),
                    key,
                    tx,
                    finished: false,
                })
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }
}

impl<K, V> Default for Flight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Leader handle for one in-flight computation.
pub struct FlightGuard<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    inflight: Arc<DashMap<K, broadcast::Sender<FlightOutcome<V>>>>,
    key: K,
    tx: broadcast::Sender<FlightOutcome<V>>,
    finished: bool,
}

impl<K, V> FlightGuard<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn complete(mut self, value: V) {
        self.finish(FlightOutcome::Completed(value));
    }

    pub fn fail(mut self) {
        self.finish(FlightOutcome::Failed);
    }

    fn finish(&mut self, outcome: FlightOutcome<V>) {
        if self.finished {
            return;
        }
        self.finished = true;
        // Remove the entry before publishing: a caller arriving afterwards
        // starts a fresh flight instead of subscribing to a closed one.
        self.inflight.remove(&self.key);
        let _ = self.tx.send(outcome);
    }
}

impl<K, V> Drop for FlightGuard<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn drop(&mut self) {
        self.finish(FlightOutcome::Failed);
    }
}
