//! Collections that publish their own changes.

use crate::core::{Binding, ModelCore};
use parking_lot::RwLock;
use std::fmt;

/// A list that notifies its owning model on every mutation.
///
/// Generated constructors attach the list to the model core under the
/// property's qualified name. An unattached list behaves like a plain
/// `Vec` behind a lock.
pub struct ObservableList<T> {
    items: RwLock<Vec<T>>,
    binding: Binding,
}

impl<T> ObservableList<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
            binding: Binding::default(),
        }
    }

    /// Publish mutations on `core` as changes of `name`.
    pub fn attach(&self, core: &ModelCore, name: &'static str) {
        self.binding.attach(core, name);
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn push(&self, item: T) {
        self.items.write().push(item);
        self.binding.notify();
    }

    pub fn insert(&self, index: usize, item: T) {
        self.items.write().insert(index, item);
        self.binding.notify();
    }

    /// Remove the item at `index`, if any.
    pub fn remove(&self, index: usize) -> Option<T> {
        let removed = {
            let mut items = self.items.write();
            (index < items.len()).then(|| items.remove(index))
        };
        if removed.is_some() {
            self.binding.notify();
        }
        removed
    }

    /// Replace the item at `index`. Returns the previous item.
    pub fn set(&self, index: usize, item: T) -> Option<T> {
        let previous = {
            let mut items = self.items.write();
            items
                .get_mut(index)
                .map(|slot| std::mem::replace(slot, item))
        };
        if previous.is_some() {
            self.binding.notify();
        }
        previous
    }

    pub fn clear(&self) {
        let changed = {
            let mut items = self.items.write();
            let changed = !items.is_empty();
            items.clear();
            changed
        };
        if changed {
            self.binding.notify();
        }
    }

    pub fn extend(&self, iter: impl IntoIterator<Item = T>) {
        let changed = {
            let mut items = self.items.write();
            let before = items.len();
            items.extend(iter);
            items.len() != before
        };
        if changed {
            self.binding.notify();
        }
    }

    pub fn retain(&self, f: impl FnMut(&T) -> bool) {
        let changed = {
            let mut items = self.items.write();
            let before = items.len();
            items.retain(f);
            items.len() != before
        };
        if changed {
            self.binding.notify();
        }
    }

    /// Borrow the items for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.items.read())
    }
}

impl<T: Clone> ObservableList<T> {
    pub fn get(&self, index: usize) -> Option<T> {
        self.items.read().get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.read().clone()
    }
}

impl<T> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for ObservableList<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T> FromIterator<T> for ObservableList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.read().iter()).finish()
    }
}
