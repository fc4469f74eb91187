//! Minimal dependency-injection container.
//!
//! Implements the registration contract generated code relies on:
//! `add_singleton` / `add_scoped` / `add_transient`, plus `*_as` forms that
//! expose an already registered type under another type (typically a trait
//! object). Services are keyed by their resolved type, which must be cheap
//! to clone (`Arc<T>`, `Arc<dyn Trait>`, handles).

use crate::error::ServiceError;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// How long a resolved instance is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// One instance per root provider.
    Singleton,
    /// One instance per scope.
    Scoped,
    /// A new instance per resolution.
    Transient,
}

type Instance = Box<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&ServiceProvider) -> Result<Instance, ServiceError> + Send + Sync>;

#[derive(Clone)]
struct Registration {
    lifetime: Lifetime,
    type_name: &'static str,
    factory: Factory,
}

/// Registration table, turned into a [`ServiceProvider`] by [`build`](Self::build).
#[derive(Default)]
pub struct ServiceCollection {
    registrations: IndexMap<TypeId, Registration>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn add<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Result<T, ServiceError> + Send + Sync + 'static,
    {
        let type_name = type_name::<T>();
        trace!(type_name, ?lifetime, "service registered");
        self.registrations.insert(
            TypeId::of::<T>(),
            Registration {
                lifetime,
                type_name,
                factory: Arc::new(move |provider: &ServiceProvider| {
                    factory(provider).map(|value| Box::new(value) as Instance)
                }),
            },
        );
        self
    }

    pub fn add_singleton<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Result<T, ServiceError> + Send + Sync + 'static,
    {
        self.add(Lifetime::Singleton, factory)
    }

    pub fn add_scoped<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Result<T, ServiceError> + Send + Sync + 'static,
    {
        self.add(Lifetime::Scoped, factory)
    }

    pub fn add_transient<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Result<T, ServiceError> + Send + Sync + 'static,
    {
        self.add(Lifetime::Transient, factory)
    }

    /// Register a ready-made singleton.
    pub fn add_instance<T>(&mut self, instance: T) -> &mut Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.add(Lifetime::Singleton, move |_| Ok(instance.clone()))
    }

    fn add_mapped<I, T>(&mut self, lifetime: Lifetime, map: fn(T) -> I) -> &mut Self
    where
        I: Clone + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
    {
        self.add(lifetime, move |provider| provider.resolve::<T>().map(map))
    }

    /// Expose the registration of `T` as `I` with singleton lifetime.
    pub fn add_singleton_as<I, T>(&mut self, map: fn(T) -> I) -> &mut Self
    where
        I: Clone + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
    {
        self.add_mapped(Lifetime::Singleton, map)
    }

    /// Expose the registration of `T` as `I` within each scope.
    pub fn add_scoped_as<I, T>(&mut self, map: fn(T) -> I) -> &mut Self
    where
        I: Clone + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
    {
        self.add_mapped(Lifetime::Scoped, map)
    }

    /// Expose the registration of `T` as `I`, resolved on every request.
    pub fn add_transient_as<I, T>(&mut self, map: fn(T) -> I) -> &mut Self
    where
        I: Clone + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
    {
        self.add_mapped(Lifetime::Transient, map)
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.registrations.contains_key(&TypeId::of::<T>())
    }

    pub fn lifetime_of<T: 'static>(&self) -> Option<Lifetime> {
        self.registrations
            .get(&TypeId::of::<T>())
            .map(|r| r.lifetime)
    }

    /// Registered type names in registration order.
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.registrations.values().map(|r| r.type_name)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn build(self) -> ServiceProvider {
        ServiceProvider {
            shared: Arc::new(Shared {
                registrations: self.registrations,
                singletons: Mutex::new(HashMap::new()),
            }),
            scoped: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.type_names()).finish()
    }
}

type Cache = Mutex<HashMap<TypeId, Instance>>;

struct Shared {
    registrations: IndexMap<TypeId, Registration>,
    singletons: Cache,
}

thread_local! {
    static RESOLVING: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
}

/// Marks a type as under construction on this thread.
struct ResolutionFrame;

impl ResolutionFrame {
    fn enter(type_name: &'static str) -> Result<Self, ServiceError> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&type_name) {
                let mut chain: Vec<&str> = stack.clone();
                chain.push(type_name);
                return Err(ServiceError::Circular {
                    chain: chain.join(" -> "),
                });
            }
            stack.push(type_name);
            Ok(ResolutionFrame)
        })
    }
}

impl Drop for ResolutionFrame {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Resolves registered services. The root provider is itself a scope.
#[derive(Clone)]
pub struct ServiceProvider {
    shared: Arc<Shared>,
    scoped: Arc<Cache>,
}

impl ServiceProvider {
    /// Resolve an instance of `T` according to its registered lifetime.
    pub fn resolve<T>(&self) -> Result<T, ServiceError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let registration = self
            .shared
            .registrations
            .get(&TypeId::of::<T>())
            .ok_or(ServiceError::NotRegistered {
                type_name: type_name::<T>(),
            })?;
        match registration.lifetime {
            Lifetime::Singleton => self.cached(&self.shared.singletons, registration),
            Lifetime::Scoped => self.cached(&self.scoped, registration),
            Lifetime::Transient => self.construct(registration),
        }
    }

    /// A child provider sharing singletons but owning its scoped instances.
    pub fn create_scope(&self) -> ServiceProvider {
        ServiceProvider {
            shared: Arc::clone(&self.shared),
            scoped: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.shared.registrations.contains_key(&TypeId::of::<T>())
    }

    fn cached<T>(&self, cache: &Cache, registration: &Registration) -> Result<T, ServiceError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let id = TypeId::of::<T>();
        if let Some(existing) = cache.lock().get(&id).and_then(|i| i.downcast_ref::<T>()) {
            return Ok(existing.clone());
        }
        // The factory may resolve further services, so the cache stays unlocked while it runs.
        let value: T = self.construct(registration)?;
        let mut cache = cache.lock();
        let stored = cache.entry(id).or_insert_with(|| Box::new(value) as Instance);
        stored
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ServiceError::construction::<T>("cached instance has a different type"))
    }

    fn construct<T>(&self, registration: &Registration) -> Result<T, ServiceError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let _frame = ResolutionFrame::enter(registration.type_name)?;
        trace!(type_name = registration.type_name, "constructing service");
        let instance = (registration.factory)(self)?;
        instance
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| ServiceError::construction::<T>("factory produced a different type"))
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("registrations", &self.shared.registrations.len())
            .field("singletons", &self.shared.singletons.lock().len())
            .field("scoped", &self.scoped.lock().len())
            .finish()
    }
}
