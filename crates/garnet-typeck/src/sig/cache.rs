//! Memo of built definitions, shared between checks of one environment.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::sig::definition::{Definition, DefinitionKind};
use crate::ty::TypeName;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub name: TypeName,
    pub kind: DefinitionKind,
    pub generation: u64,
}

/// A concurrent memo keyed by `(name, kind, generation)`.
///
/// Values are computed outside the lock. Two threads racing on one key may
/// both compute; the first insert wins and both get that entry.
#[derive(Debug, Default)]
pub struct DefinitionCache {
    entries: RwLock<FxHashMap<CacheKey, Arc<Definition>>>,
}

impl DefinitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Definition>> {
        self.entries.read().get(key).cloned()
    }

    pub fn get_or_try_insert_with<E>(
        &self,
        key: CacheKey,
        build: impl FnOnce() -> Result<Definition, E>,
    ) -> Result<Arc<Definition>, E> {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let built = Arc::new(build()?);
        let mut entries = self.entries.write();
        Ok(entries.entry(key).or_insert(built).clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop entries built for generations before `generation`.
    pub fn evict_before(&self, generation: u64) {
        self.entries.write().retain(|k, _| k.generation >= generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str, generation: u64) -> CacheKey {
        CacheKey {
            name: name.to_string(),
            kind: DefinitionKind::Instance,
            generation,
        }
    }

    #[test]
    fn first_insert_wins() {
        let cache = DefinitionCache::new();
        let a = cache
            .get_or_try_insert_with::<()>(key("Foo", 1), || Ok(Definition::empty("Foo", DefinitionKind::Instance)))
            .unwrap();
        let b = cache
            .get_or_try_insert_with::<()>(key("Foo", 1), || panic!("must not rebuild"))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = DefinitionCache::new();
        let r = cache.get_or_try_insert_with(key("Foo", 1), || Err("boom"));
        assert_eq!(r.unwrap_err(), "boom");
        assert!(cache.is_empty());
    }

    #[test]
    fn generations_are_separate() {
        let cache = DefinitionCache::new();
        for generation in [1, 2] {
            cache
                .get_or_try_insert_with::<()>(key("Foo", generation), || {
                    Ok(Definition::empty("Foo", DefinitionKind::Instance))
                })
                .unwrap();
        }
        assert_eq!(cache.len(), 2);
        cache.evict_before(2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key("Foo", 2)).is_some());
    }

    #[test]
    fn concurrent_population() {
        let cache = Arc::new(DefinitionCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache
                        .get_or_try_insert_with::<()>(key("Shared", 3), || {
                            Ok(Definition::empty("Shared", DefinitionKind::Instance))
                        })
                        .unwrap()
                })
            })
            .collect();
        let results: Vec<Arc<Definition>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.len(), 1);
    }
}
