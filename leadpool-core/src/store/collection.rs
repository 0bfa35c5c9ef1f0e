//! Keyed collection backing each datastore table
//!
//! Point reads are lock-free. Scans take each bucket's lock in turn, so they
//! briefly contend with writers on that bucket. Writes to a single key are
//! serialized by the map's entry lock, which is what makes conditional
//! updates atomic.

use scc::hash_map::Entry;
use scc::HashMap as SccHashMap;
use std::sync::Arc;

pub(crate) struct Collection<V>
where
    V: Clone + Send + Sync + 'static,
{
    map: Arc<SccHashMap<String, V>>,
}

impl<V> Collection<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self { map: Arc::new(SccHashMap::new()) }
    }

    /// Insert only when the key is free; hands the value back otherwise
    pub async fn insert_new(&self, key: String, value: V) -> Result<(), V> {
        self.map.insert_async(key, value).await.map_err(|(_, v)| v)
    }

    /// Insert or replace, computing the stored value from the previous one
    ///
    /// `build` runs under the entry lock. It may veto the write by
    /// returning an error, in which case the entry is left unchanged.
    pub async fn upsert_with<E>(
        &self,
        key: String,
        build: impl FnOnce(Option<&V>) -> Result<V, E>,
    ) -> Result<V, E> {
        match self.map.entry_async(key).await {
            Entry::Occupied(mut occupied) => {
                let next = build(Some(occupied.get()))?;
                *occupied.get_mut() = next.clone();
                Ok(next)
            }
            Entry::Vacant(vacant) => {
                let next = build(None)?;
                vacant.insert_entry(next.clone());
                Ok(next)
            }
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.map.read_async(key, |_, v| v.clone()).await
    }

    /// Mutate in place under the entry lock; `None` if the key is absent
    pub async fn update<R>(&self, key: &str, updater: impl FnOnce(&mut V) -> R) -> Option<R> {
        self.map.update_async(key, |_, v| updater(v)).await
    }

    pub async fn remove(&self, key: &str) -> Option<V> {
        self.map.remove_async(key).await.map(|(_, v)| v)
    }

    /// Remove under the entry lock when `guard` returns `Ok(true)`
    ///
    /// `Ok(false)` keeps the entry; an error vetoes the removal and is
    /// returned as is.
    pub async fn remove_with<E>(
        &self,
        key: &str,
        guard: impl FnOnce(&V) -> Result<bool, E>,
    ) -> Result<Option<V>, E> {
        match self.map.entry_async(key.to_string()).await {
            Entry::Occupied(occupied) => {
                if !guard(occupied.get())? {
                    return Ok(None);
                }
                let (_, value) = occupied.remove_entry();
                Ok(Some(value))
            }
            Entry::Vacant(_) => Ok(None),
        }
    }

    /// Visit every value; entries are never removed
    pub async fn scan(&self, mut visit: impl FnMut(&V)) {
        self.map
            .retain_async(|_, v| {
                visit(v);
                true
            })
            .await;
    }

    /// Clone every value matching `keep`
    pub async fn collect(&self, mut keep: impl FnMut(&V) -> bool) -> Vec<V> {
        let mut out = Vec::new();
        self.scan(|v| {
            if keep(v) {
                out.push(v.clone());
            }
        })
        .await;
        out
    }

    pub async fn count(&self, mut keep: impl FnMut(&V) -> bool) -> u64 {
        let mut n = 0u64;
        self.scan(|v| {
            if keep(v) {
                n += 1;
            }
        })
        .await;
        n
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

impl<V> Default for Collection<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_operations() {
        let coll = Collection::<String>::new();
        coll.insert_new("k".to_string(), "v1".to_string()).await.unwrap();
        assert_eq!(coll.insert_new("k".to_string(), "v2".to_string()).await, Err("v2".to_string()));
        assert_eq!(coll.get("k").await, Some("v1".to_string()));

        let len = coll.update("k", |v| {
            v.push('!');
            v.len()
        });
        assert_eq!(len.await, Some(3));
        assert_eq!(coll.remove("k").await, Some("v1!".to_string()));
        assert!(coll.get("k").await.is_none());
        assert!(coll.update("k", |_| ()).await.is_none());
    }

    #[tokio::test]
    async fn test_upsert_sees_previous_value() {
        let coll = Collection::<u32>::new();
        let first = coll.upsert_with::<()>("n".to_string(), |prev| Ok(prev.copied().unwrap_or(0) + 1));
        assert_eq!(first.await, Ok(1));
        let second = coll.upsert_with::<()>("n".to_string(), |prev| Ok(prev.copied().unwrap_or(0) + 1));
        assert_eq!(second.await, Ok(2));

        let vetoed = coll.upsert_with("n".to_string(), |_| Err("no"));
        assert_eq!(vetoed.await, Err("no"));
        assert_eq!(coll.get("n").await, Some(2));
    }

    #[tokio::test]
    async fn test_remove_with_guard() {
        let coll = Collection::<u32>::new();
        coll.insert_new("a".to_string(), 1).await.unwrap();

        assert_eq!(coll.remove_with::<()>("a", |v| Ok(*v == 2)).await, Ok(None));
        assert_eq!(coll.remove_with("a", |_| Err("vetoed")).await, Err("vetoed"));
        assert_eq!(coll.get("a").await, Some(1));

        assert_eq!(coll.remove_with::<()>("a", |v| Ok(*v == 1)).await, Ok(Some(1)));
        assert_eq!(coll.remove_with::<()>("a", |_| Ok(true)).await, Ok(None));
    }

    #[tokio::test]
    async fn test_concurrent_updates_serialize_per_key() {
        let coll = Arc::new(Collection::<u64>::new());
        coll.insert_new("counter".to_string(), 0).await.unwrap();

        let mut handles = vec![];
        for _ in 0..50 {
            let coll = coll.clone();
            handles.push(tokio::spawn(async move {
                coll.update("counter", |v| *v += 1).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(coll.get("counter").await, Some(50));
    }

    #[tokio::test]
    async fn test_collect_and_count() {
        let coll = Collection::<u32>::new();
        for i in 0..10u32 {
            coll.insert_new(i.to_string(), i).await.unwrap();
        }
        assert_eq!(coll.len(), 10);
        assert_eq!(coll.count(|v| v % 2 == 0).await, 5);
        let mut big = coll.collect(|v| *v >= 7).await;
        big.sort();
        assert_eq!(big, vec![7, 8, 9]);
    }
}
