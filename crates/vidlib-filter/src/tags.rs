//! Tag registry and membership cache.
//!
//! A tag is a multi-valued attribute kept outside the record: a record may
//! carry zero or more values under each tag name, looked up by the record's
//! handle. The engine only needs the [`TagStore`] contract; [`MemoryTagStore`]
//! is an in-process implementation with explicit refresh semantics.
//!
//! Each evaluation pass reads through one [`TagSnapshot`], taken once at the
//! start of the pass with [`TagStore::snapshot`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::{Mutex, RwLock};

use crate::error::CollaboratorError;

/// Tag values in their original spelling plus the lower-cased spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DualCased {
    /// Values as assigned.
    pub original: BTreeSet<String>,
    /// The same values, lower-cased.
    pub lowered: BTreeSet<String>,
}

impl DualCased {
    /// Builds a consistent pair from the original values.
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let original: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        let lowered = original.iter().map(|v| v.to_lowercase()).collect();
        Self { original, lowered }
    }
}

/// A view of tag memberships that one evaluation pass reads from.
pub trait TagSnapshot {
    /// The values assigned under `tag` to the record identified by `handle`.
    fn lookup(&self, handle: i64, tag: &str) -> Result<DualCased, CollaboratorError>;
}

/// The external store of tag names and tag memberships.
pub trait TagStore {
    /// All known tag names, in their canonical spelling.
    fn tag_names(&self) -> Result<Vec<String>, CollaboratorError>;

    /// Brings the membership cache up to date.
    fn refresh(&self) -> Result<(), CollaboratorError>;

    /// The values assigned under `tag` to the record identified by `handle`,
    /// as of the latest refresh.
    fn lookup(&self, handle: i64, tag: &str) -> Result<DualCased, CollaboratorError>;

    /// Refreshes the cache and returns the view one evaluation pass reads
    /// from.
    ///
    /// The default view reads through [`lookup`](TagStore::lookup), so it is
    /// only stable while nobody else refreshes the store. Stores that can be
    /// refreshed concurrently should return a view pinned to the refreshed
    /// data, as [`MemoryTagStore`] does.
    fn snapshot(&self) -> Result<Box<dyn TagSnapshot + '_>, CollaboratorError> {
        self.refresh()?;
        Ok(Box::new(ReadThrough(self)))
    }
}

/// Snapshot that forwards every lookup to its store.
struct ReadThrough<'a, S: ?Sized>(&'a S);

impl<S: TagStore + ?Sized> TagSnapshot for ReadThrough<'_, S> {
    fn lookup(&self, handle: i64, tag: &str) -> Result<DualCased, CollaboratorError> {
        self.0.lookup(handle, tag)
    }
}

type Memberships = HashMap<String, HashMap<i64, BTreeSet<String>>>;

fn read_memberships(memberships: &Memberships, key: &str, handle: i64) -> DualCased {
    let values = memberships
        .get(key)
        .and_then(|by_handle| by_handle.get(&handle))
        .cloned()
        .unwrap_or_default();
    DualCased::new(values)
}

/// In-memory [`TagStore`].
///
/// Assignments are staged and only become visible to lookups after the next
/// [`refresh`](TagStore::refresh). Every refresh publishes a new immutable
/// copy; a [`TagStore::snapshot`] keeps reading the copy it published even
/// if the store is refreshed again mid-pass.
#[derive(Debug, Default)]
pub struct MemoryTagStore {
    /// Lower-cased tag name -> canonical tag name.
    names: BTreeMap<String, String>,
    staged: Mutex<Memberships>,
    published: RwLock<Arc<Memberships>>,
    refreshes: AtomicUsize,
}

impl MemoryTagStore {
    /// Creates a store that knows the given tag names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names
            .into_iter()
            .map(Into::into)
            .map(|name: String| (name.to_lowercase(), name))
            .collect();
        Self {
            names,
            ..Self::default()
        }
    }

    /// Stages one value under `tag` for `handle`.
    pub fn assign(&self, handle: i64, tag: &str, value: impl Into<String>) -> Result<(), CollaboratorError> {
        let key = self.key(tag)?;
        self.staged
            .lock()
            .entry(key)
            .or_default()
            .entry(handle)
            .or_default()
            .insert(value.into());
        Ok(())
    }

    /// Stages several values under `tag` for `handle`.
    pub fn assign_all<I, S>(&self, handle: i64, tag: &str, values: I) -> Result<(), CollaboratorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self.assign(handle, tag, value)?;
        }
        Ok(())
    }

    /// Stages removal of all values under `tag` for `handle`.
    pub fn clear(&self, handle: i64, tag: &str) -> Result<(), CollaboratorError> {
        let key = self.key(tag)?;
        if let Some(by_handle) = self.staged.lock().get_mut(&key) {
            by_handle.remove(&handle);
        }
        Ok(())
    }

    /// How many times the store has been refreshed.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Copies the staged assignments into a new published snapshot.
    fn publish(&self) -> Arc<Memberships> {
        let memberships = Arc::new(self.staged.lock().clone());
        *self.published.write() = Arc::clone(&memberships);
        let count = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("tag cache refreshed ({count} refreshes)");
        memberships
    }

    fn key(&self, tag: &str) -> Result<String, CollaboratorError> {
        let key = tag.to_lowercase();
        if self.names.contains_key(&key) {
            Ok(key)
        } else {
            Err(CollaboratorError::tag_store(format!("unknown tag '{tag}'")))
        }
    }
}

impl TagStore for MemoryTagStore {
    fn tag_names(&self) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.names.values().cloned().collect())
    }

    fn refresh(&self) -> Result<(), CollaboratorError> {
        self.publish();
        Ok(())
    }

    fn lookup(&self, handle: i64, tag: &str) -> Result<DualCased, CollaboratorError> {
        let key = self.key(tag)?;
        let published = Arc::clone(&self.published.read());
        Ok(read_memberships(&published, &key, handle))
    }

    fn snapshot(&self) -> Result<Box<dyn TagSnapshot + '_>, CollaboratorError> {
        Ok(Box::new(PinnedTags {
            store: self,
            memberships: self.publish(),
        }))
    }
}

/// One published copy of a [`MemoryTagStore`]'s memberships.
struct PinnedTags<'a> {
    store: &'a MemoryTagStore,
    memberships: Arc<Memberships>,
}

impl TagSnapshot for PinnedTags<'_> {
    fn lookup(&self, handle: i64, tag: &str) -> Result<DualCased, CollaboratorError> {
        let key = self.store.key(tag)?;
        Ok(read_memberships(&self.memberships, &key, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignments_invisible_until_refresh() {
        let store = MemoryTagStore::new(["Genre"]);
        store.assign(7, "Genre", "Drama").unwrap();

        assert!(store.lookup(7, "Genre").unwrap().original.is_empty());

        store.refresh().unwrap();
        let values = store.lookup(7, "genre").unwrap();
        assert!(values.original.contains("Drama"));
        assert!(values.lowered.contains("drama"));
        assert_eq!(store.refresh_count(), 1);
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let store = MemoryTagStore::new(["Genre"]);
        assert!(store.assign(1, "Mood", "dark").is_err());
        assert!(store.lookup(1, "Mood").is_err());
    }

    #[test]
    fn test_clear_takes_effect_on_refresh() {
        let store = MemoryTagStore::new(["Genre"]);
        store.assign_all(3, "Genre", ["Drama", "War"]).unwrap();
        store.refresh().unwrap();
        store.clear(3, "Genre").unwrap();
        assert_eq!(store.lookup(3, "Genre").unwrap().original.len(), 2);
        store.refresh().unwrap();
        assert!(store.lookup(3, "Genre").unwrap().original.is_empty());
    }

    #[test]
    fn test_snapshot_is_stable_across_later_refreshes() {
        let store = MemoryTagStore::new(["Genre"]);
        store.assign(7, "Genre", "Drama").unwrap();
        let pass = store.snapshot().unwrap();
        assert_eq!(store.refresh_count(), 1);

        store.assign(7, "Genre", "War").unwrap();
        store.clear(8, "Genre").unwrap();
        store.refresh().unwrap();

        assert_eq!(pass.lookup(7, "Genre").unwrap(), DualCased::new(["Drama"]));
        assert_eq!(
            store.lookup(7, "Genre").unwrap(),
            DualCased::new(["Drama", "War"])
        );
        assert!(store.snapshot().unwrap().lookup(7, "Genre").unwrap().original.contains("War"));
        assert!(pass.lookup(7, "Mood").is_err());
    }

    #[test]
    fn test_snapshot_is_shared_across_threads_while_refreshing() {
        let store = MemoryTagStore::new(["Genre"]);
        store.assign(1, "Genre", "Drama").unwrap();
        let pass = store.snapshot().unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..50 {
                    store.assign(1, "Genre", format!("Extra {i}")).unwrap();
                    store.refresh().unwrap();
                }
            });
            for _ in 0..50 {
                assert_eq!(pass.lookup(1, "Genre").unwrap().original.len(), 1);
            }
        });
        assert_eq!(store.lookup(1, "Genre").unwrap().original.len(), 51);
    }

    #[test]
    fn test_tag_names_keep_canonical_spelling() {
        let store = MemoryTagStore::new(["Genre", "Mood"]);
        assert_eq!(
            store.tag_names().unwrap(),
            vec!["Genre".to_string(), "Mood".to_string()]
        );
    }
}
