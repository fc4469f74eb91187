//! Startup-time ownership of singleton models.

use crate::error::ServiceError;
use crate::services::ServiceProvider;
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use tracing::debug;

/// Singleton instances created once at startup, in dependency order.
///
/// The composition root builds the registry right after the provider so
/// that singleton construction never races with first use.
#[derive(Default)]
pub struct SingletonRegistry {
    instances: IndexMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl SingletonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, name: &'static str, instance: T)
    where
        T: Send + Sync + 'static,
    {
        self.instances.insert(name, Box::new(instance));
    }

    /// Resolve `T` from `provider` and keep it under `name`.
    pub fn initialize<T>(&mut self, name: &'static str, provider: &ServiceProvider) -> Result<(), ServiceError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let instance = provider.resolve::<T>()?;
        debug!(name, "singleton initialized");
        self.register(name, instance);
        Ok(())
    }

    pub fn get<T>(&self, name: &str) -> Option<T>
    where
        T: Clone + 'static,
    {
        self.instances.get(name)?.downcast_ref::<T>().cloned()
    }

    /// Names in initialization order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.instances.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl fmt::Debug for SingletonRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceCollection;
    use std::sync::Arc;

    #[test]
    fn test_initialize_keeps_order_and_identity() {
        let mut services = ServiceCollection::new();
        services.add_singleton(|_| Ok(Arc::new(String::from("settings"))));
        services.add_singleton(|p| Ok(Arc::new(p.resolve::<Arc<String>>()?.len())));
        let provider = services.build();

        let mut registry = SingletonRegistry::new();
        registry.initialize::<Arc<String>>("Settings", &provider).unwrap();
        registry.initialize::<Arc<usize>>("Theme", &provider).unwrap();

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Settings", "Theme"]);
        let settings = registry.get::<Arc<String>>("Settings").unwrap();
        assert!(Arc::ptr_eq(&settings, &provider.resolve::<Arc<String>>().unwrap()));
        assert_eq!(*registry.get::<Arc<usize>>("Theme").unwrap(), 8);
        assert!(registry.get::<Arc<u8>>("Theme").is_none());
    }
}
