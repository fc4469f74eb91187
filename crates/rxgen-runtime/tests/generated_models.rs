//! Models written out the way rxgen expands them, exercised end to end
//! against the runtime.

use parking_lot::Mutex;
use rxgen_runtime::{CancellationToken, ServiceCollection};
use std::sync::Arc;

/// Records every change set seen on a core.
#[derive(Default)]
struct Changes(Mutex<Vec<Vec<&'static str>>>);

impl Changes {
    fn watch(self: &Arc<Self>, core: &rxgen_runtime::ModelCore) -> rxgen_runtime::Subscription {
        let sink = Arc::clone(self);
        core.observe_all(move |changed| sink.0.lock().push(changed.to_vec()))
    }

    fn take(&self) -> Vec<Vec<&'static str>> {
        std::mem::take(&mut *self.0.lock())
    }
}

#[derive(Default)]
pub struct CallLog {
    calls: Mutex<Vec<i32>>,
}

impl CallLog {
    fn record(&self, value: i32) {
        self.calls.lock().push(value);
    }

    fn calls(&self) -> Vec<i32> {
        self.calls.lock().clone()
    }
}

// #[model(scope = "singleton")]
// pub struct Counter {
//     #[observable]
//     #[trigger(on_value_changed)]
//     value: i32,
//     log: Arc<CallLog>,
// }
pub struct Counter {
    core: ::rxgen_runtime::ModelCore,
    #[allow(dead_code)]
    subscriptions: ::rxgen_runtime::SubscriptionSet,
    #[allow(dead_code)]
    this: ::std::sync::Weak<Self>,
    value: ::rxgen_runtime::Field<i32>,
    log: Arc<CallLog>,
}

impl Counter {
    /// Every qualified name this model publishes.
    pub const OBSERVED_PROPERTIES: &'static [&'static str] = &["Model.Value"];

    /// Create the model and wire its notifications.
    pub fn new(log: Arc<CallLog>) -> ::std::sync::Arc<Self> {
        ::std::sync::Arc::new_cyclic(|weak: &::std::sync::Weak<Self>| {
            let core = ::rxgen_runtime::ModelCore::new();
            let subscriptions = ::rxgen_runtime::SubscriptionSet::new();
            let value = ::rxgen_runtime::Field::<i32>::new(::std::default::Default::default());
            subscriptions.add(core.observe_with(
                &["Model.Value"],
                weak.clone(),
                |this: ::std::sync::Arc<Self>| {
                    this.on_value_changed();
                },
            ));
            Self {
                core,
                subscriptions,
                this: weak.clone(),
                value,
                log,
            }
        })
    }

    /// Notification core, shared with derived models.
    pub fn core(&self) -> &::rxgen_runtime::ModelCore {
        &self.core
    }

    pub fn value(&self) -> i32 {
        self.value.get()
    }

    pub fn set_value(&self, value: i32) {
        if self.value.replace_if_changed(value) {
            self.core.notify("Model.Value");
        }
    }
}

impl Counter {
    fn on_value_changed(&self) {
        self.log.record(self.value());
    }
}

// #[model(scope = "singleton")]
// pub struct Customer {
//     #[observable]
//     name: String,
//     #[observable]
//     email: String,
// }
pub struct Customer {
    core: ::rxgen_runtime::ModelCore,
    #[allow(dead_code)]
    subscriptions: ::rxgen_runtime::SubscriptionSet,
    #[allow(dead_code)]
    this: ::std::sync::Weak<Self>,
    name: ::rxgen_runtime::Field<String>,
    email: ::rxgen_runtime::Field<String>,
}

impl Customer {
    /// Every qualified name this model publishes.
    pub const OBSERVED_PROPERTIES: &'static [&'static str] = &["Model.Email", "Model.Name"];

    /// Create the model and wire its notifications.
    pub fn new() -> ::std::sync::Arc<Self> {
        ::std::sync::Arc::new_cyclic(|weak: &::std::sync::Weak<Self>| {
            let core = ::rxgen_runtime::ModelCore::new();
            let subscriptions = ::rxgen_runtime::SubscriptionSet::new();
            let name = ::rxgen_runtime::Field::<String>::new(::std::default::Default::default());
            let email = ::rxgen_runtime::Field::<String>::new(::std::default::Default::default());
            Self {
                core,
                subscriptions,
                this: weak.clone(),
                name,
                email,
            }
        })
    }

    /// Notification core, shared with derived models.
    pub fn core(&self) -> &::rxgen_runtime::ModelCore {
        &self.core
    }

    pub fn name(&self) -> String {
        self.name.get()
    }

    pub fn set_name(&self, value: String) {
        if self.name.replace_if_changed(value) {
            self.core.notify("Model.Name");
        }
    }

    pub fn email(&self) -> String {
        self.email.get()
    }

    pub fn set_email(&self, value: String) {
        if self.email.replace_if_changed(value) {
            self.core.notify("Model.Email");
        }
    }
}

// #[model(scope = "scoped")]
// pub struct Order {
//     #[observable]
//     status: String,
//     customer: Arc<Customer>,
// }
//
// impl Order {
//     fn label(&self) -> String {
//         self.customer.name()
//     }
// }
pub struct Order {
    core: ::rxgen_runtime::ModelCore,
    #[allow(dead_code)]
    subscriptions: ::rxgen_runtime::SubscriptionSet,
    #[allow(dead_code)]
    this: ::std::sync::Weak<Self>,
    status: ::rxgen_runtime::Field<String>,
    customer: ::std::sync::Arc<Customer>,
}

impl Order {
    /// Every qualified name this model publishes.
    pub const OBSERVED_PROPERTIES: &'static [&'static str] =
        &["Model.Customer.Name", "Model.Status"];

    /// Create the model and wire its notifications.
    pub fn new(customer: ::std::sync::Arc<Customer>) -> ::std::sync::Arc<Self> {
        ::std::sync::Arc::new_cyclic(|weak: &::std::sync::Weak<Self>| {
            let core = ::rxgen_runtime::ModelCore::new();
            let subscriptions = ::rxgen_runtime::SubscriptionSet::new();
            let status = ::rxgen_runtime::Field::<String>::new(::std::default::Default::default());
            subscriptions.add(core.republish(
                customer.core(),
                &[("Model.Name", "Model.Customer.Name")],
            ));
            Self {
                core,
                subscriptions,
                this: weak.clone(),
                status,
                customer,
            }
        })
    }

    /// Notification core, shared with derived models.
    pub fn core(&self) -> &::rxgen_runtime::ModelCore {
        &self.core
    }

    pub fn status(&self) -> String {
        self.status.get()
    }

    pub fn set_status(&self, value: String) {
        if self.status.replace_if_changed(value) {
            self.core.notify("Model.Status");
        }
    }

    pub fn customer(&self) -> &::std::sync::Arc<Customer> {
        &self.customer
    }
}

impl Order {
    fn label(&self) -> String {
        self.customer.name()
    }
}

// #[model(scope = "transient")]
// pub struct Editor {
//     #[observable]
//     saving: bool,
//     #[command(can_execute = "can_save")]
//     save_command: Command<(), bool>,
//     #[command(execute = "fetch", cancelable)]
//     load_command: AsyncCommand<u32, String>,
// }
pub struct Editor {
    core: ::rxgen_runtime::ModelCore,
    #[allow(dead_code)]
    subscriptions: ::rxgen_runtime::SubscriptionSet,
    #[allow(dead_code)]
    this: ::std::sync::Weak<Self>,
    saving: ::rxgen_runtime::Field<bool>,
    save_command: rxgen_runtime::Command<(), bool>,
    load_command: rxgen_runtime::AsyncCommand<u32, String>,
}

impl Editor {
    /// Every qualified name this model publishes.
    pub const OBSERVED_PROPERTIES: &'static [&'static str] =
        &["Model.LoadCommand", "Model.SaveCommand", "Model.Saving"];

    /// Create the model and wire its notifications.
    pub fn new() -> ::std::sync::Arc<Self> {
        ::std::sync::Arc::new_cyclic(|weak: &::std::sync::Weak<Self>| {
            let core = ::rxgen_runtime::ModelCore::new();
            let subscriptions = ::rxgen_runtime::SubscriptionSet::new();
            let saving = ::rxgen_runtime::Field::<bool>::new(::std::default::Default::default());
            let save_command = <rxgen_runtime::Command<(), bool>>::bound(
                weak.clone(),
                |this: &Self, _: ()| this.save(),
            )
            .with_guard(weak.clone(), |this: &Self, _: &()| this.can_save());
            save_command.attach(&core, "Model.SaveCommand");
            subscriptions.add(save_command.observing(&["Model.Saving"]));
            let load_command = <rxgen_runtime::AsyncCommand<u32, String>>::bound(
                weak.clone(),
                |this: ::std::sync::Arc<Self>,
                 parameter: u32,
                 token: ::rxgen_runtime::CancellationToken| async move {
                    this.fetch(parameter, token).await
                },
            )
            .with_cancellation();
            load_command.attach(&core, "Model.LoadCommand");
            Self {
                core,
                subscriptions,
                this: weak.clone(),
                saving,
                save_command,
                load_command,
            }
        })
    }

    /// Notification core, shared with derived models.
    pub fn core(&self) -> &::rxgen_runtime::ModelCore {
        &self.core
    }

    pub fn saving(&self) -> bool {
        self.saving.get()
    }

    pub fn set_saving(&self, value: bool) {
        if self.saving.replace_if_changed(value) {
            self.core.notify("Model.Saving");
        }
    }

    pub fn save_command(&self) -> &rxgen_runtime::Command<(), bool> {
        &self.save_command
    }

    pub fn load_command(&self) -> &rxgen_runtime::AsyncCommand<u32, String> {
        &self.load_command
    }
}

impl Editor {
    fn save(&self) -> bool {
        true
    }

    fn can_save(&self) -> bool {
        !self.saving()
    }

    async fn fetch(&self, id: u32, token: CancellationToken) -> String {
        tokio::select! {
            _ = token.cancelled() => String::new(),
            _ = tokio::time::sleep(std::time::Duration::from_millis(if id == 0 { 5_000 } else { 1 })) => {
                format!("record {}", id)
            }
        }
    }
}

#[test]
fn test_trigger_runs_once_per_change() {
    let log = Arc::new(CallLog::default());
    let counter = Counter::new(Arc::clone(&log));
    let changes = Arc::new(Changes::default());
    let _watch = changes.watch(counter.core());

    counter.set_value(5);
    assert_eq!(log.calls(), vec![5]);
    assert_eq!(changes.take(), vec![vec!["Model.Value"]]);

    counter.set_value(5);
    assert_eq!(log.calls(), vec![5]);
    assert!(changes.take().is_empty());
}

#[test]
fn test_reference_republishes_only_read_properties() {
    let customer = Customer::new();
    let order = Order::new(Arc::clone(&customer));
    let changes = Arc::new(Changes::default());
    let _watch = changes.watch(order.core());

    customer.set_email("ada@example.com".to_string());
    assert!(changes.take().is_empty());

    customer.set_name("Ada".to_string());
    assert_eq!(changes.take(), vec![vec!["Model.Customer.Name"]]);
    assert_eq!(order.label(), "Ada");

    order.set_status("open".to_string());
    assert_eq!(order.status(), "open");
    assert_eq!(changes.take(), vec![vec!["Model.Status"]]);
}

#[test]
fn test_published_tables_cover_notified_names() {
    assert_eq!(Counter::OBSERVED_PROPERTIES, &["Model.Value"]);
    assert!(Customer::OBSERVED_PROPERTIES.contains(&"Model.Email"));
    assert!(!Order::OBSERVED_PROPERTIES.contains(&"Model.Customer.Email"));
    assert!(Editor::OBSERVED_PROPERTIES.contains(&"Model.SaveCommand"));
}

#[test]
fn test_suspended_writes_publish_once() {
    let customer = Customer::new();
    let changes = Arc::new(Changes::default());
    let _watch = changes.watch(customer.core());
    {
        let _guard = customer.core().suspend_notifications().unwrap();
        customer.set_name("Ada".to_string());
        customer.set_email("ada@example.com".to_string());
        customer.set_name("Grace".to_string());
        assert!(changes.take().is_empty());
    }
    assert_eq!(changes.take(), vec![vec!["Model.Name", "Model.Email"]]);
}

#[test]
fn test_guard_inputs_republish_command_state() {
    let editor = Editor::new();
    let changes = Arc::new(Changes::default());
    let _watch = changes.watch(editor.core());

    assert!(editor.save_command().can_execute(&()));
    assert_eq!(editor.save_command().execute(()), Some(true));
    changes.take();

    editor.set_saving(true);
    let seen = changes.take();
    assert!(seen.contains(&vec!["Model.Saving"]));
    assert!(seen.contains(&vec!["Model.SaveCommand"]));
    assert!(!editor.save_command().can_execute(&()));
    assert_eq!(editor.save_command().execute(()), None);
}

#[tokio::test]
async fn test_async_command_round_trip_and_cancel() {
    let editor = Editor::new();
    assert_eq!(
        editor.load_command().execute(7).await,
        Some("record 7".to_string())
    );

    let running = Arc::clone(&editor);
    let pending = tokio::spawn(async move { running.load_command().execute(0).await });
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(editor.load_command().is_executing());
    assert!(editor.load_command().cancel());
    let result = pending.await.unwrap();
    assert!(result.is_none() || result == Some(String::new()));
    assert!(!editor.load_command().is_executing());
}

#[test]
fn test_registration_and_singleton_initialization() {
    let mut services = ServiceCollection::new();
    services.add_singleton::<::std::sync::Arc<Customer>, _>(|_provider| Ok(Customer::new()));
    services.add_scoped::<::std::sync::Arc<Order>, _>(|provider| Ok(Order::new(provider.resolve()?)));
    let provider = services.build();

    let mut registry = rxgen_runtime::SingletonRegistry::new();
    registry
        .initialize::<::std::sync::Arc<Customer>>("Customer", &provider)
        .unwrap();
    let customer = registry.get::<Arc<Customer>>("Customer").unwrap();

    let first = provider.create_scope();
    let second = provider.create_scope();
    let a: Arc<Order> = first.resolve().unwrap();
    let a_again: Arc<Order> = first.resolve().unwrap();
    let b: Arc<Order> = second.resolve().unwrap();
    assert!(Arc::ptr_eq(&a, &a_again));
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(a.customer(), &customer));
    assert!(Arc::ptr_eq(b.customer(), &customer));
}
