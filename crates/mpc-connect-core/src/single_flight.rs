//! Keyed single-flight execution
//!
//! Concurrent callers asking for the same key share one in-flight unit of
//! work and all observe its result. The work runs on its own task, so a
//! caller that stops waiting neither aborts it nor strands other waiters.
//!
//! One mutex guards the whole in-flight map. It is held only for lookup,
//! insert and removal, never across an await.

use crate::{Error, Result};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;

type Flight<V> = Shared<BoxFuture<'static, Result<V>>>;

/// Deduplicates concurrent work per key
pub struct SingleFlight<K, V> {
    in_flight: Arc<Mutex<HashMap<K, Flight<V>>>>,
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty group
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `make_work` for `key` unless a flight for `key` is already running,
    /// in which case the caller joins that flight instead.
    ///
    /// `make_work` is only invoked for the caller that starts the flight.
    pub async fn run<F, Fut>(&self, key: K, make_work: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let flight = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(&key) {
                Some(flight) => {
                    debug!(key = ?key, "Joining in-flight request");
                    flight.clone()
                }
                None => {
                    debug!(key = ?key, "Starting new flight");
                    let flight = self.launch(key.clone(), make_work());
                    in_flight.insert(key, flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    fn launch<Fut>(&self, key: K, work: Fut) -> Flight<V>
    where
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let landing = Landing {
            in_flight: Arc::clone(&self.in_flight),
            key,
        };
        // The entry is removed by the task before any waiter sees the result,
        // so a caller arriving afterwards starts a fresh flight. The guard also
        // fires when the work panics.
        let task = tokio::spawn(async move {
            let _landing = landing;
            work.await
        });

        async move {
            task.await
                .map_err(|e| Error::Internal(format!("single-flight task failed: {}", e)))?
        }
        .boxed()
        .shared()
    }

    /// Whether a flight for `key` is currently running
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.in_flight.lock().contains_key(key)
    }

    /// Number of keys with a running flight
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }
}

/// Removes a flight's map entry when its task ends, normally or by unwinding
struct Landing<K, V>
where
    K: Eq + Hash,
{
    in_flight: Arc<Mutex<HashMap<K, Flight<V>>>>,
    key: K,
}

impl<K, V> Drop for Landing<K, V>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
