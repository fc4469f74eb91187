//! Storage for observable property values.

use parking_lot::RwLock;
use std::fmt;

/// Backing storage of one mutable property.
///
/// A `Field` never notifies on its own; the generated setter decides whether
/// a write publishes a change.
#[derive(Default)]
pub struct Field<T> {
    value: RwLock<T>,
}

impl<T> Field<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Store a value unconditionally.
    pub fn set(&self, value: T) {
        *self.value.write() = value;
    }

    /// Store a value and return the previous one.
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.value.write(), value)
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }

    /// Mutate the current value in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.value.write())
    }
}

impl<T: Clone> Field<T> {
    pub fn get(&self) -> T {
        self.value.read().clone()
    }
}

impl<T: PartialEq> Field<T> {
    /// Store `value` if it differs from the current one. Returns whether it was stored.
    pub fn replace_if_changed(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current == value {
            return false;
        }
        *current = value;
        true
    }
}

impl<T: fmt::Debug> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&*self.value.read()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_if_changed() {
        let field = Field::new(3);
        assert!(!field.replace_if_changed(3));
        assert!(field.replace_if_changed(5));
        assert_eq!(field.get(), 5);
    }

    #[test]
    fn test_update_and_with() {
        let field = Field::new(vec![1, 2]);
        field.update(|v| v.push(3));
        assert_eq!(field.with(|v| v.len()), 3);
        assert_eq!(field.replace(vec![]), vec![1, 2, 3]);
    }
}
