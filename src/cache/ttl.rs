use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Slot<V> {
    value: V,
    inserted_at: Instant,
    last_access: AtomicU64,
}

/// Concurrent map with a capacity bound (least-recently-used eviction) and a
/// time-to-live measured from insertion.
pub struct TtlCache<K, V> {
    entries: DashMap<K, Slot<V>>,
    capacity: usize,
    ttl: Duration,
    clock: AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            ttl,
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// 期限切れのエントリは取得時に削除する
    pub fn get(&self, key: &K) -> Option<V> {
        {
            let slot = self.entries.get(key)?;
            if slot.inserted_at.elapsed() <= self.ttl {
                slot.last_access.store(self.tick(), Ordering::Relaxed);
                return Some(slot.value.clone());
            }
        }
        self.entries
            .remove_if(key, |_, slot| slot.inserted_at.elapsed() > self.ttl);
        None
    }

    pub fn insert(&self, key: K, value: V) {
        let slot = Slot {
            value,
            inserted_at: Instant::now(),
            last_access: AtomicU64::new(self.tick()),
        };
        self.entries.insert(key.clone(), slot);

        while self.entries.len() > self.capacity {
            let victim = self
                .entries
                .iter()
                .filter(|entry| entry.key() != &key)
                .min_by_key(|entry| entry.value().last_access.load(Ordering::Relaxed))
                .map(|entry| entry.key().clone());
            match victim {
                Some(victim) => {
                    self.entries.remove(&victim);
                }
                None => break,
            }
        }
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, slot)| slot.value)
    }

    /// 期限内の全エントリのスナップショット（アクセス時刻は更新しない）
    pub fn entries(&self) -> Vec<(K, V)> {
        self.entries
            .iter()
            .filter(|entry| entry.value().inserted_at.elapsed() <= self.ttl)
            .map(|entry| (entry.key().clone(), entry.value().value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
