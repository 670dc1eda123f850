// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A content-addressed, reference-counted store of shared pipeline resources.
//!
//! Entries live in an arena of generational slots. Callers never see the slot
//! directly: [`ResourceCache::acquire`] hands back an opaque [`CacheHandle`] and a
//! shared pointer to the resource, and [`ResourceCache::release`] gives the
//! reference back. When the last reference is released the resource is unloaded
//! and the slot is recycled under a new generation, so a stale handle can never
//! release someone else's entry.

mod key;

pub use self::key::CacheKey;

use std::any::Any;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A resource that can be shared through the [`ResourceCache`].
pub trait CacheResource: Send + Sync + 'static {
    /// Frees the resource's memory. Called once, when the last reference is released.
    fn unload(&self);

    /// CPU memory held by the resource, reported by [`ResourceCache::statistics`].
    fn byte_length(&self) -> u64 {
        0
    }

    /// GPU memory owned by the resource, reported by [`ResourceCache::statistics`].
    fn gpu_byte_length(&self) -> u64 {
        0
    }
}

/// An opaque reference to a cache entry, returned by [`ResourceCache::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheHandle {
    index: u32,
    generation: u32,
}

/// Errors returned by the [`ResourceCache`].
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The key is already bound to a resource of another type.
    #[error("Cache entry '{key}' holds a different resource type")]
    TypeMismatch {
        /// The key that was requested.
        key: CacheKey,
    },
    /// The handle refers to an entry that has already been released.
    #[error("Stale cache handle")]
    StaleHandle,
    /// The factory failed to build the resource; nothing was inserted.
    #[error("Failed to create cache entry '{key}': {source}")]
    Factory {
        /// The key that was requested.
        key: CacheKey,
        /// The factory's error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

/// Memory accounted by the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatistics {
    /// CPU bytes held by resident resources.
    pub images_byte_length: u64,
    /// GPU bytes owned by resident resources.
    pub textures_byte_length: u64,
    /// Number of resident entries.
    pub entry_count: usize,
}

struct Entry {
    key: CacheKey,
    resource: Arc<dyn CacheResource>,
    typed: Arc<dyn Any + Send + Sync>,
    ref_count: usize,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Default)]
struct CacheInner {
    slots: Vec<Slot>,
    free: Vec<u32>,
    index: HashMap<CacheKey, u32>,
}

impl CacheInner {
    fn entry_mut(&mut self, handle: CacheHandle) -> Option<&mut Entry> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    /// Adds a reference to the entry under `key`, if resident.
    fn hit<R: CacheResource>(
        &mut self,
        key: &CacheKey,
    ) -> Result<Option<(CacheHandle, Arc<R>)>, CacheError> {
        let Some(&index) = self.index.get(key) else {
            return Ok(None);
        };
        let slot = &mut self.slots[index as usize];
        let generation = slot.generation;
        let Some(entry) = slot.entry.as_mut() else {
            return Ok(None);
        };
        let typed = Arc::clone(&entry.typed)
            .downcast::<R>()
            .map_err(|_| CacheError::TypeMismatch { key: key.clone() })?;
        entry.ref_count += 1;
        log::debug!("Cache hit for '{key}' (refs: {})", entry.ref_count);
        Ok(Some((CacheHandle { index, generation }, typed)))
    }

    fn insert(&mut self, entry: Entry) -> CacheHandle {
        let key = entry.key.clone();
        let handle = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            CacheHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                entry: Some(entry),
            });
            CacheHandle {
                index,
                generation: 0,
            }
        };
        self.index.insert(key, handle.index);
        handle
    }

    fn remove(&mut self, index: u32) -> Option<Entry> {
        let slot = self.slots.get_mut(index as usize)?;
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.index.remove(&entry.key);
        Some(entry)
    }
}

/// A shared, thread-safe store of reference-counted resources.
///
/// The cache is usually wrapped in an `Arc` and handed to every loader.
#[derive(Default)]
pub struct ResourceCache {
    inner: Mutex<CacheInner>,
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("entries", &self.len())
            .finish()
    }
}

impl ResourceCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the resource stored under `key`, building it with `factory` if absent.
    ///
    /// Each successful call adds one reference, which must be given back with
    /// [`release`](Self::release). The factory runs under the cache lock, so
    /// concurrent callers for one key observe a single resource. It must not call
    /// back into the cache.
    pub fn acquire<R, E, F>(
        &self,
        key: &CacheKey,
        factory: F,
    ) -> Result<(CacheHandle, Arc<R>), CacheError>
    where
        R: CacheResource,
        E: Into<Box<dyn Error + Send + Sync>>,
        F: FnOnce() -> Result<R, E>,
    {
        let mut inner = self.lock();

        if let Some(hit) = inner.hit(key)? {
            return Ok(hit);
        }

        let resource = factory().map_err(|e| CacheError::Factory {
            key: key.clone(),
            source: e.into(),
        })?;
        let typed = Arc::new(resource);
        let handle = inner.insert(Entry {
            key: key.clone(),
            resource: Arc::clone(&typed) as Arc<dyn CacheResource>,
            typed: Arc::clone(&typed) as Arc<dyn Any + Send + Sync>,
            ref_count: 1,
        });
        log::debug!("Cache miss, created '{key}'");
        Ok((handle, typed))
    }

    /// Adds a reference to the resource stored under `key` if there is one.
    ///
    /// Unlike [`acquire`](Self::acquire), nothing is created on a miss.
    pub fn acquire_existing<R: CacheResource>(
        &self,
        key: &CacheKey,
    ) -> Result<Option<(CacheHandle, Arc<R>)>, CacheError> {
        self.lock().hit(key)
    }

    /// Returns the resource behind a live handle without adding a reference.
    pub fn get<R: CacheResource>(&self, handle: CacheHandle) -> Result<Arc<R>, CacheError> {
        let mut inner = self.lock();
        let entry = inner.entry_mut(handle).ok_or(CacheError::StaleHandle)?;
        Arc::clone(&entry.typed)
            .downcast::<R>()
            .map_err(|_| CacheError::TypeMismatch {
                key: entry.key.clone(),
            })
    }

    /// Gives back one reference. The last release unloads the resource and frees
    /// its slot.
    pub fn release(&self, handle: CacheHandle) -> Result<(), CacheError> {
        let removed = {
            let mut inner = self.lock();
            let entry = inner.entry_mut(handle).ok_or(CacheError::StaleHandle)?;
            entry.ref_count -= 1;
            if entry.ref_count > 0 {
                log::debug!("Released '{}' (refs: {})", entry.key, entry.ref_count);
                return Ok(());
            }
            inner.remove(handle.index)
        };

        if let Some(entry) = removed {
            log::debug!("Unloading '{}'", entry.key);
            entry.resource.unload();
        }
        Ok(())
    }

    /// Returns the number of live references to `key`, zero if absent.
    pub fn ref_count(&self, key: &CacheKey) -> usize {
        let inner = self.lock();
        inner
            .index
            .get(key)
            .and_then(|&index| inner.slots[index as usize].entry.as_ref())
            .map_or(0, |entry| entry.ref_count)
    }

    /// Returns `true` if `key` is resident.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().index.contains_key(key)
    }

    /// Returns the number of resident entries.
    pub fn len(&self) -> usize {
        self.lock().index.len()
    }

    /// Returns `true` if no entry is resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the memory currently accounted by the cache.
    pub fn statistics(&self) -> CacheStatistics {
        let inner = self.lock();
        let mut statistics = CacheStatistics {
            entry_count: inner.index.len(),
            ..CacheStatistics::default()
        };
        for entry in inner.slots.iter().filter_map(|slot| slot.entry.as_ref()) {
            statistics.images_byte_length += entry.resource.byte_length();
            statistics.textures_byte_length += entry.resource.gpu_byte_length();
        }
        statistics
    }

    /// Unloads and drops every entry, invalidating every outstanding handle.
    pub fn clear(&self) {
        let entries: Vec<Entry> = {
            let mut inner = self.lock();
            let indices: Vec<u32> = inner.index.values().copied().collect();
            indices
                .into_iter()
                .filter_map(|index| inner.remove(index))
                .collect()
        };

        for entry in entries {
            if entry.ref_count > 0 {
                log::warn!(
                    "Clearing '{}' with {} outstanding reference(s)",
                    entry.key,
                    entry.ref_count
                );
            }
            entry.resource.unload();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Blob {
        bytes: u64,
        unloads: Arc<AtomicUsize>,
    }

    impl CacheResource for Blob {
        fn unload(&self) {
            self.unloads.fetch_add(1, Ordering::SeqCst);
        }

        fn byte_length(&self) -> u64 {
            self.bytes
        }
    }

    struct Upload(u64);

    impl CacheResource for Upload {
        fn unload(&self) {}

        fn gpu_byte_length(&self) -> u64 {
            self.0
        }
    }

    struct Other;

    impl CacheResource for Other {
        fn unload(&self) {}
    }

    fn blob(bytes: u64, unloads: &Arc<AtomicUsize>) -> Result<Blob, std::io::Error> {
        Ok(Blob {
            bytes,
            unloads: Arc::clone(unloads),
        })
    }

    #[test]
    fn acquire_shares_one_resource_per_key() {
        let cache = ResourceCache::new();
        let unloads = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::from("image:a");
        let mut builds = 0;

        let (first, a) = cache
            .acquire(&key, || {
                builds += 1;
                blob(16, &unloads)
            })
            .unwrap();
        let (second, b) = cache
            .acquire(&key, || {
                builds += 1;
                blob(16, &unloads)
            })
            .unwrap();

        assert_eq!(builds, 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(first, second);
        assert_eq!(cache.ref_count(&key), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn last_release_unloads_and_removes() {
        let cache = ResourceCache::new();
        let unloads = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::from("image:a");

        let (h1, _) = cache.acquire(&key, || blob(8, &unloads)).unwrap();
        let (h2, _) = cache.acquire(&key, || blob(8, &unloads)).unwrap();

        cache.release(h1).unwrap();
        assert_eq!(unloads.load(Ordering::SeqCst), 0);
        assert!(cache.contains(&key));

        cache.release(h2).unwrap();
        assert_eq!(unloads.load(Ordering::SeqCst), 1);
        assert!(!cache.contains(&key));
        assert_eq!(cache.ref_count(&key), 0);
    }

    #[test]
    fn stale_handle_never_touches_the_recycled_slot() {
        let cache = ResourceCache::new();
        let unloads = Arc::new(AtomicUsize::new(0));

        let (old, _) = cache
            .acquire(&CacheKey::from("a"), || blob(1, &unloads))
            .unwrap();
        cache.release(old).unwrap();

        let key_b = CacheKey::from("b");
        let (fresh, _) = cache.acquire(&key_b, || blob(1, &unloads)).unwrap();

        assert!(matches!(cache.release(old), Err(CacheError::StaleHandle)));
        assert_eq!(cache.ref_count(&key_b), 1);
        assert!(cache.get::<Blob>(fresh).is_ok());
        assert!(matches!(
            cache.get::<Blob>(old),
            Err(CacheError::StaleHandle)
        ));
    }

    #[test]
    fn factory_error_inserts_nothing() {
        let cache = ResourceCache::new();
        let key = CacheKey::from("broken");

        let result = cache.acquire(&key, || -> Result<Blob, std::io::Error> {
            Err(std::io::Error::other("decode failed"))
        });

        assert!(matches!(result, Err(CacheError::Factory { .. })));
        assert!(!cache.contains(&key));
        assert!(cache.is_empty());
    }

    #[test]
    fn mismatched_type_is_rejected() {
        let cache = ResourceCache::new();
        let unloads = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::from("shared");

        cache.acquire(&key, || blob(1, &unloads)).unwrap();
        let result = cache.acquire(&key, || Ok::<_, std::io::Error>(Other));

        assert!(matches!(result, Err(CacheError::TypeMismatch { .. })));
        assert_eq!(cache.ref_count(&key), 1);
    }

    #[test]
    fn statistics_count_each_resident_resource_once() {
        let cache = ResourceCache::new();
        let unloads = Arc::new(AtomicUsize::new(0));
        let (image, _) = cache
            .acquire(&CacheKey::from("image"), || blob(24, &unloads))
            .unwrap();

        let texture = CacheKey::from("texture");
        let (first, _) = cache
            .acquire(&texture, || Ok::<_, std::io::Error>(Upload(32)))
            .unwrap();
        let (second, _) = cache
            .acquire(&texture, || Ok::<_, std::io::Error>(Upload(32)))
            .unwrap();

        assert_eq!(
            cache.statistics(),
            CacheStatistics {
                images_byte_length: 24,
                textures_byte_length: 32,
                entry_count: 2,
            }
        );

        cache.release(first).unwrap();
        assert_eq!(cache.statistics().textures_byte_length, 32);
        cache.release(second).unwrap();
        assert_eq!(cache.statistics().textures_byte_length, 0);

        cache.release(image).unwrap();
        assert_eq!(cache.statistics(), CacheStatistics::default());
    }

    #[test]
    fn acquire_existing_never_creates() {
        let cache = ResourceCache::new();
        let unloads = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::from("image:a");

        assert!(cache.acquire_existing::<Blob>(&key).unwrap().is_none());
        assert!(cache.is_empty());

        let (handle, created) = cache.acquire(&key, || blob(4, &unloads)).unwrap();
        let (again, existing) = cache.acquire_existing::<Blob>(&key).unwrap().unwrap();
        assert!(Arc::ptr_eq(&created, &existing));
        assert_eq!(handle, again);
        assert_eq!(cache.ref_count(&key), 2);
        assert!(matches!(
            cache.acquire_existing::<Other>(&key),
            Err(CacheError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn clear_unloads_everything() {
        let cache = ResourceCache::new();
        let unloads = Arc::new(AtomicUsize::new(0));
        let (handle, _) = cache
            .acquire(&CacheKey::from("a"), || blob(1, &unloads))
            .unwrap();
        cache
            .acquire(&CacheKey::from("b"), || blob(1, &unloads))
            .unwrap();

        cache.clear();

        assert_eq!(unloads.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
        assert!(matches!(
            cache.release(handle),
            Err(CacheError::StaleHandle)
        ));
    }
}
