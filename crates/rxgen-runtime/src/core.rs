//! Change-notification core shared by every generated model.
//!
//! A [`ModelCore`] owns the subscriber list of one model instance (derived
//! models share the core of their base). Notifications carry qualified
//! property names such as `Model.Value`; subscribers register a filter and are
//! invoked when a published change set intersects it.
//!
//! Dispatch is synchronous on the notifying thread and the subscriber lock is
//! released before any callback runs, so callbacks may notify again or
//! subscribe further.

use crate::error::RuntimeError;
use indexmap::IndexSet;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

type Callback = Arc<dyn Fn(&[&'static str]) + Send + Sync>;

struct Subscriber {
    id: u64,
    /// Empty means every change.
    filter: Vec<&'static str>,
    callback: Callback,
}

impl Subscriber {
    fn matches(&self, changed: &[&'static str]) -> bool {
        self.filter.is_empty() || intersects(&self.filter, changed)
    }
}

enum Suspension {
    All,
    Batches(Vec<&'static str>),
}

struct SuspendState {
    mode: Suspension,
    pending: IndexSet<&'static str>,
}

impl SuspendState {
    fn defers(&self, batches: &[&str]) -> bool {
        match &self.mode {
            Suspension::All => true,
            Suspension::Batches(groups) => batches.iter().any(|b| groups.iter().any(|g| g == b)),
        }
    }
}

#[derive(Default)]
struct CoreInner {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    suspended: Mutex<Option<SuspendState>>,
}

/// Whether two qualified-name sets share at least one name.
pub fn intersects(observed: &[&str], changed: &[&str]) -> bool {
    changed.iter().any(|c| observed.iter().any(|o| o == c))
}

/// Notification hub of one model instance.
#[derive(Clone, Default)]
pub struct ModelCore {
    inner: Arc<CoreInner>,
}

impl ModelCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn downgrade(&self) -> WeakCore {
        WeakCore {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Publish a change of `name`.
    pub fn notify(&self, name: &'static str) {
        self.notify_in(name, &[]);
    }

    /// Publish a change of `name`, deferring it while any of `batches` is suspended.
    pub fn notify_in(&self, name: &'static str, batches: &[&str]) {
        {
            let mut suspended = self.inner.suspended.lock();
            if let Some(state) = suspended.as_mut() {
                if state.defers(batches) {
                    trace!(name, "notification deferred");
                    state.pending.insert(name);
                    return;
                }
            }
        }
        self.dispatch(&[name]);
    }

    fn dispatch(&self, changed: &[&'static str]) {
        let targets: Vec<Callback> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .filter(|s| s.matches(changed))
            .map(|s| Arc::clone(&s.callback))
            .collect();
        trace!(?changed, subscribers = targets.len(), "dispatching change");
        for callback in targets {
            callback(changed);
        }
    }

    /// Invoke `callback` with the change set whenever it intersects `names`.
    pub fn observe<F>(&self, names: &[&'static str], callback: F) -> Subscription
    where
        F: Fn(&[&'static str]) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.subscribers.lock().push(Subscriber {
            id,
            filter: names.to_vec(),
            callback: Arc::new(callback),
        });
        Subscription {
            core: self.downgrade(),
            id,
        }
    }

    /// Invoke `callback` for every change published on this core.
    pub fn observe_all<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[&'static str]) + Send + Sync + 'static,
    {
        self.observe(&[], callback)
    }

    /// Invoke `hook` on `target` whenever one of `names` changes.
    ///
    /// The target is held weakly; once it is dropped the hook is skipped.
    pub fn observe_with<M, F>(&self, names: &[&'static str], target: Weak<M>, hook: F) -> Subscription
    where
        M: Send + Sync + 'static,
        F: Fn(Arc<M>) + Send + Sync + 'static,
    {
        self.observe(names, move |_| {
            if let Some(target) = target.upgrade() {
                hook(target);
            }
        })
    }

    /// Re-publish changes of `source` under local names.
    ///
    /// Each `(source_name, local_name)` pair maps one name published by
    /// `source` to the name notified on this core. Names without a mapping
    /// are not forwarded.
    pub fn republish(
        &self,
        source: &ModelCore,
        mapping: &'static [(&'static str, &'static str)],
    ) -> Subscription {
        let filter: Vec<&'static str> = mapping.iter().map(|(from, _)| *from).collect();
        let local = self.downgrade();
        source.observe(&filter, move |changed| {
            let Some(local) = local.upgrade() else {
                return;
            };
            for (from, to) in mapping {
                if changed.contains(from) {
                    local.notify(to);
                }
            }
        })
    }

    /// Defer every notification until the returned guard is dropped.
    ///
    /// Deferred names are published once, as a single change set.
    pub fn suspend_notifications(&self) -> Result<SuspendGuard, RuntimeError> {
        self.suspend(Suspension::All)
    }

    /// Defer notifications published into any of `groups`.
    pub fn suspend_batches(&self, groups: &[&'static str]) -> Result<SuspendGuard, RuntimeError> {
        self.suspend(Suspension::Batches(groups.to_vec()))
    }

    fn suspend(&self, mode: Suspension) -> Result<SuspendGuard, RuntimeError> {
        let mut suspended = self.inner.suspended.lock();
        if suspended.is_some() {
            return Err(RuntimeError::NestedSuspend);
        }
        *suspended = Some(SuspendState {
            mode,
            pending: IndexSet::new(),
        });
        Ok(SuspendGuard { core: self.clone() })
    }

    pub fn is_suspended(&self) -> bool {
        self.inner.suspended.lock().is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    fn unsubscribe(&self, id: u64) {
        self.inner.subscribers.lock().retain(|s| s.id != id);
    }
}

impl fmt::Debug for ModelCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCore")
            .field("subscribers", &self.subscriber_count())
            .field("suspended", &self.is_suspended())
            .finish()
    }
}

/// Non-owning handle to a [`ModelCore`].
#[derive(Clone, Default)]
pub struct WeakCore {
    inner: Weak<CoreInner>,
}

impl WeakCore {
    pub fn upgrade(&self) -> Option<ModelCore> {
        self.inner.upgrade().map(|inner| ModelCore { inner })
    }
}

impl fmt::Debug for WeakCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakCore")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Link from a self-notifying value (collection, command) to the core it publishes on.
#[derive(Default)]
pub(crate) struct Binding {
    target: Mutex<Option<(WeakCore, &'static str)>>,
}

impl Binding {
    pub(crate) fn attach(&self, core: &ModelCore, name: &'static str) {
        *self.target.lock() = Some((core.downgrade(), name));
    }

    pub(crate) fn get(&self) -> Option<(ModelCore, &'static str)> {
        let target = self.target.lock();
        let (core, name) = target.as_ref()?;
        Some((core.upgrade()?, *name))
    }

    pub(crate) fn notify(&self) {
        if let Some((core, name)) = self.get() {
            core.notify(name);
        }
    }
}

/// Scope that holds notifications back. Dropping it flushes them.
#[must_use = "notifications resume as soon as the guard is dropped"]
pub struct SuspendGuard {
    core: ModelCore,
}

impl Drop for SuspendGuard {
    fn drop(&mut self) {
        let state = self.core.inner.suspended.lock().take();
        if let Some(state) = state {
            if !state.pending.is_empty() {
                let changed: Vec<&'static str> = state.pending.into_iter().collect();
                self.core.dispatch(&changed);
            }
        }
    }
}

/// Registration of one subscriber. Dropping it unsubscribes.
#[must_use = "the subscription ends when this value is dropped"]
#[derive(Debug, Default)]
pub struct Subscription {
    core: WeakCore,
    id: u64,
}

impl Subscription {
    /// A subscription that is not attached to any core.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.id != 0 && self.core.upgrade().is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.id == 0 {
            return;
        }
        if let Some(core) = self.core.upgrade() {
            core.unsubscribe(self.id);
        }
    }
}

/// Subscriptions owned by a model for its whole lifetime.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    items: Mutex<Vec<Subscription>>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, subscription: Subscription) {
        self.items.lock().push(subscription);
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Drop every held subscription.
    pub fn clear(&self) {
        let items = std::mem::take(&mut *self.items.lock());
        drop(items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(core: &ModelCore, names: &[&'static str]) -> (Arc<Mutex<Vec<Vec<&'static str>>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = core.observe(names, move |changed| sink.lock().push(changed.to_vec()));
        (seen, sub)
    }

    #[test]
    fn test_notify_respects_filter() {
        let core = ModelCore::new();
        let (seen, _sub) = recorder(&core, &["Model.Value"]);

        core.notify("Model.Value");
        core.notify("Model.Other");

        assert_eq!(*seen.lock(), vec![vec!["Model.Value"]]);
    }

    #[test]
    fn test_observe_all_receives_everything() {
        let core = ModelCore::new();
        let (seen, _sub) = recorder(&core, &[]);
        core.notify("Model.A");
        core.notify("Model.B");
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let core = ModelCore::new();
        let (seen, sub) = recorder(&core, &["Model.Value"]);
        assert_eq!(core.subscriber_count(), 1);
        assert!(sub.is_active());

        drop(sub);
        core.notify("Model.Value");

        assert_eq!(core.subscriber_count(), 0);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_suspend_coalesces_into_one_change_set() {
        let core = ModelCore::new();
        let (seen, _sub) = recorder(&core, &["Model.A", "Model.B"]);

        {
            let _guard = core.suspend_notifications().unwrap();
            core.notify("Model.A");
            core.notify("Model.B");
            core.notify("Model.A");
            assert!(seen.lock().is_empty());
        }

        assert_eq!(*seen.lock(), vec![vec!["Model.A", "Model.B"]]);
        assert!(!core.is_suspended());
    }

    #[test]
    fn test_nested_suspend_is_an_error() {
        let core = ModelCore::new();
        let _guard = core.suspend_notifications().unwrap();
        assert_eq!(
            core.suspend_batches(&["totals"]).err(),
            Some(RuntimeError::NestedSuspend)
        );
    }

    #[test]
    fn test_suspend_batches_only_defers_members() {
        let core = ModelCore::new();
        let (seen, _sub) = recorder(&core, &[]);

        let guard = core.suspend_batches(&["totals"]).unwrap();
        core.notify_in("Model.Total", &["totals"]);
        core.notify("Model.Status");
        assert_eq!(*seen.lock(), vec![vec!["Model.Status"]]);

        drop(guard);
        assert_eq!(seen.lock().last().unwrap(), &vec!["Model.Total"]);
    }

    #[test]
    fn test_republish_maps_and_filters() {
        let customer = ModelCore::new();
        let order = ModelCore::new();
        let (seen, _sub) = recorder(&order, &[]);
        let _link = order.republish(&customer, &[("Model.Name", "Model.Customer.Name")]);

        customer.notify("Model.Name");
        customer.notify("Model.Email");

        assert_eq!(*seen.lock(), vec![vec!["Model.Customer.Name"]]);
    }

    #[test]
    fn test_callback_may_notify_again() {
        let core = ModelCore::new();
        let inner = core.downgrade();
        let _relay = core.observe(&["Model.A"], move |_| {
            if let Some(core) = inner.upgrade() {
                core.notify("Model.B");
            }
        });
        let (seen, _sub) = recorder(&core, &["Model.B"]);

        core.notify("Model.A");

        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_observe_with_skips_dropped_target() {
        let core = ModelCore::new();
        let hits = Arc::new(Mutex::new(0));
        let target = Arc::new(());
        let counter = Arc::clone(&hits);
        let _sub = core.observe_with(&["Model.A"], Arc::downgrade(&target), move |_| {
            *counter.lock() += 1;
        });

        core.notify("Model.A");
        drop(target);
        core.notify("Model.A");

        assert_eq!(*hits.lock(), 1);
    }

    #[test]
    fn test_subscription_set_clear() {
        let core = ModelCore::new();
        let set = SubscriptionSet::new();
        set.add(core.observe_all(|_| {}));
        set.add(core.observe_all(|_| {}));
        assert_eq!(set.len(), 2);

        set.clear();
        assert!(set.is_empty());
        assert_eq!(core.subscriber_count(), 0);
    }
}
