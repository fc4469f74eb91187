//! Runtime support for models generated by rxgen.
//!
//! Generated code depends on this crate for:
//! - [`ModelCore`]: qualified-name change notifications, suspend scopes and
//!   reference republishing
//! - [`Field`] and [`ObservableList`]: property storage
//! - [`Command`] and [`AsyncCommand`]: the command matrix
//! - [`ServiceCollection`] / [`ServiceProvider`]: the registration contract
//! - [`SingletonRegistry`]: startup-time singleton initialization
//! - [`RenderFilter`]: component re-render filtering

pub mod collections;
pub mod command;
pub mod component;
pub mod core;
pub mod error;
pub mod field;
pub mod services;
pub mod singletons;
pub mod spawn;

pub use collections::ObservableList;
pub use command::{AsyncCommand, Command};
pub use component::RenderFilter;
pub use core::{intersects, ModelCore, SubscriptionSet, Subscription, SuspendGuard, WeakCore};
pub use error::{RuntimeError, ServiceError};
pub use field::Field;
pub use services::{Lifetime, ServiceCollection, ServiceProvider};
pub use singletons::SingletonRegistry;
pub use spawn::spawn;
pub use tokio_util::sync::CancellationToken;
