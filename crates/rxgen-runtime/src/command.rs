//! Command objects covering the sync/async, parameter, return and cancellation matrix.
//!
//! Both command kinds are bound to a model method by the generated
//! constructor. While a command runs it reports itself as executing and
//! refuses re-entrant execution; every transition of that state, and every
//! change of the properties its guard reads, is published under the command's
//! own qualified name so a UI can refresh enablement.

use crate::core::{Binding, ModelCore, Subscription};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;

type Guard<P> = Arc<dyn Fn(&P) -> bool + Send + Sync>;
type SyncBody<P, R> = Arc<dyn Fn(P) -> Option<R> + Send + Sync>;
type AsyncBody<P, R> = Arc<dyn Fn(P, CancellationToken) -> BoxFuture<'static, Option<R>> + Send + Sync>;

/// Execution state shared by both command kinds.
#[derive(Default)]
struct CommandState {
    executing: AtomicBool,
    binding: Binding,
}

impl CommandState {
    fn start(&self) -> Option<Running<'_>> {
        self.executing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.binding.notify();
        Some(Running { state: self })
    }

    fn is_executing(&self) -> bool {
        self.executing.load(Ordering::Acquire)
    }

    fn observing(&self, names: &[&'static str]) -> Subscription {
        let Some((core, name)) = self.binding.get() else {
            return Subscription::empty();
        };
        let weak = core.downgrade();
        core.observe(names, move |_| {
            if let Some(core) = weak.upgrade() {
                core.notify(name);
            }
        })
    }
}

/// Clears the executing flag when an execution ends, even by panic or drop.
struct Running<'a> {
    state: &'a CommandState,
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.state.executing.store(false, Ordering::Release);
        self.state.binding.notify();
    }
}

/// A synchronous command taking `P` and producing `R`.
pub struct Command<P = (), R = ()> {
    body: SyncBody<P, R>,
    guard: Option<Guard<P>>,
    state: CommandState,
}

impl<P: 'static, R: 'static> Command<P, R> {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(P) -> R + Send + Sync + 'static,
    {
        Self {
            body: Arc::new(move |p: P| Some(body(p))),
            guard: None,
            state: CommandState::default(),
        }
    }

    /// Run `body` against `target` while it is alive.
    pub fn bound<M, F>(target: Weak<M>, body: F) -> Self
    where
        M: Send + Sync + 'static,
        F: Fn(&M, P) -> R + Send + Sync + 'static,
    {
        Self {
            body: Arc::new(move |p: P| target.upgrade().map(|m| body(&m, p))),
            guard: None,
            state: CommandState::default(),
        }
    }

    pub fn with_can_execute<G>(mut self, guard: G) -> Self
    where
        G: Fn(&P) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Guard evaluated against `target`; a dropped target cannot execute.
    pub fn with_guard<M, G>(self, target: Weak<M>, guard: G) -> Self
    where
        M: Send + Sync + 'static,
        G: Fn(&M, &P) -> bool + Send + Sync + 'static,
    {
        self.with_can_execute(move |p| target.upgrade().is_some_and(|m| guard(&m, p)))
    }
}

impl<P, R> Command<P, R> {
    /// Publish state changes on `core` as changes of `name`.
    pub fn attach(&self, core: &ModelCore, name: &'static str) {
        self.state.binding.attach(core, name);
    }

    /// Re-publish this command's name whenever one of `names` changes.
    pub fn observing(&self, names: &[&'static str]) -> Subscription {
        self.state.observing(names)
    }

    pub fn can_execute(&self, parameter: &P) -> bool {
        !self.state.is_executing() && self.guard.as_ref().map_or(true, |g| g(parameter))
    }

    pub fn is_executing(&self) -> bool {
        self.state.is_executing()
    }

    /// Run the command. Returns `None` when the guard refuses, the command is
    /// already running or its target is gone.
    pub fn execute(&self, parameter: P) -> Option<R> {
        if !self.can_execute(&parameter) {
            return None;
        }
        let _running = self.state.start()?;
        (self.body)(parameter)
    }
}

impl<P, R> fmt::Debug for Command<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("executing", &self.is_executing())
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

/// An asynchronous command taking `P` and producing `R`, optionally cancelable.
pub struct AsyncCommand<P = (), R = ()> {
    body: AsyncBody<P, R>,
    guard: Option<Guard<P>>,
    cancelable: bool,
    token: Mutex<Option<CancellationToken>>,
    state: CommandState,
}

impl<P: Send + 'static, R: Send + 'static> AsyncCommand<P, R> {
    fn from_body(body: AsyncBody<P, R>, cancelable: bool) -> Self {
        Self {
            body,
            guard: None,
            cancelable,
            token: Mutex::new(None),
            state: CommandState::default(),
        }
    }

    pub fn new<F, Fut>(body: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        Self::from_body(
            Arc::new(move |p: P, _: CancellationToken| body(p).map(Some).boxed()),
            false,
        )
    }

    /// A command whose body receives a token that [`cancel`](Self::cancel) trips.
    pub fn cancelable<F, Fut>(body: F) -> Self
    where
        F: Fn(P, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        Self::from_body(
            Arc::new(move |p: P, token: CancellationToken| body(p, token).map(Some).boxed()),
            true,
        )
    }

    /// Run `body` against `target` while it is alive.
    pub fn bound<M, F, Fut>(target: Weak<M>, body: F) -> Self
    where
        M: Send + Sync + 'static,
        F: Fn(Arc<M>, P, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        Self::from_body(
            Arc::new(move |p: P, token: CancellationToken| match target.upgrade() {
                Some(m) => body(m, p, token).map(Some).boxed(),
                None => futures::future::ready(None).boxed(),
            }),
            false,
        )
    }

    /// Make [`cancel`](Self::cancel) abort a running execution.
    pub fn with_cancellation(mut self) -> Self {
        self.cancelable = true;
        self
    }

    pub fn with_can_execute<G>(mut self, guard: G) -> Self
    where
        G: Fn(&P) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Guard evaluated against `target`; a dropped target cannot execute.
    pub fn with_guard<M, G>(self, target: Weak<M>, guard: G) -> Self
    where
        M: Send + Sync + 'static,
        G: Fn(&M, &P) -> bool + Send + Sync + 'static,
    {
        self.with_can_execute(move |p| target.upgrade().is_some_and(|m| guard(&m, p)))
    }

    /// Run the command to completion.
    ///
    /// Returns `None` when the guard refuses, the command is already running,
    /// its target is gone or the execution was cancelled.
    pub async fn execute(&self, parameter: P) -> Option<R> {
        if !self.can_execute(&parameter) {
            return None;
        }
        let _running = self.state.start()?;
        let token = CancellationToken::new();
        *self.token.lock() = Some(token.clone());
        let run = (self.body)(parameter, token.clone());

        let result = if self.cancelable {
            tokio::select! {
                _ = token.cancelled() => None,
                result = run => result,
            }
        } else {
            run.await
        };
        *self.token.lock() = None;
        result
    }
}

impl<P, R> AsyncCommand<P, R> {
    /// Publish state changes on `core` as changes of `name`.
    pub fn attach(&self, core: &ModelCore, name: &'static str) {
        self.state.binding.attach(core, name);
    }

    /// Re-publish this command's name whenever one of `names` changes.
    pub fn observing(&self, names: &[&'static str]) -> Subscription {
        self.state.observing(names)
    }

    pub fn can_execute(&self, parameter: &P) -> bool {
        !self.state.is_executing() && self.guard.as_ref().map_or(true, |g| g(parameter))
    }

    pub fn is_executing(&self) -> bool {
        self.state.is_executing()
    }

    pub fn is_cancelable(&self) -> bool {
        self.cancelable
    }

    /// Cancel the running execution. Returns whether anything was cancelled.
    pub fn cancel(&self) -> bool {
        if !self.cancelable {
            return false;
        }
        match self.token.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

impl<P, R> fmt::Debug for AsyncCommand<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCommand")
            .field("executing", &self.is_executing())
            .field("cancelable", &self.cancelable)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Counter {
        value: AtomicBool,
    }

    #[test]
    fn test_sync_command_runs_body() {
        let command = Command::new(|x: i32| x * 2);
        assert_eq!(command.execute(21), Some(42));
        assert!(!command.is_executing());
    }

    #[test]
    fn test_guard_blocks_execution() {
        let command = Command::new(|x: i32| x).with_can_execute(|x| *x > 0);
        assert_eq!(command.execute(-1), None);
        assert_eq!(command.execute(1), Some(1));
    }

    #[test]
    fn test_bound_command_follows_target() {
        let target = Arc::new(Counter {
            value: AtomicBool::new(false),
        });
        let command: Command = Command::bound(Arc::downgrade(&target), |c: &Counter, ()| {
            c.value.store(true, Ordering::SeqCst)
        })
        .with_guard(Arc::downgrade(&target), |c: &Counter, _: &()| {
            !c.value.load(Ordering::SeqCst)
        });

        assert_eq!(command.execute(()), Some(()));
        assert!(target.value.load(Ordering::SeqCst));
        assert_eq!(command.execute(()), None);

        drop(target);
        assert!(!command.can_execute(&()));
    }

    #[test]
    fn test_state_changes_are_published() {
        let core = ModelCore::new();
        let command: Command = Command::new(|()| ());
        command.attach(&core, "Model.SaveCommand");

        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        let _sub = core.observe(&["Model.SaveCommand"], move |_| *counter.lock() += 1);
        let _guard_inputs = command.observing(&["Model.Total"]);

        command.execute(());
        core.notify("Model.Total");

        assert_eq!(*hits.lock(), 3);
    }

    #[tokio::test]
    async fn test_async_command_returns_value() {
        let command = AsyncCommand::new(|id: u32| async move { id + 1 });
        assert_eq!(command.execute(1).await, Some(2));
        assert!(!command.is_cancelable());
        assert!(!command.cancel());
    }

    #[tokio::test]
    async fn test_cancel_stops_cancelable_command() {
        let command: AsyncCommand<(), u32> = AsyncCommand::cancelable(|(), _token| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            1
        });

        let (result, cancelled) = tokio::join!(command.execute(()), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            command.cancel()
        });

        assert!(cancelled);
        assert_eq!(result, None);
        assert!(!command.is_executing());
    }

    #[tokio::test]
    async fn test_async_command_is_not_reentrant() {
        let command: AsyncCommand = AsyncCommand::new(|()| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
        });

        let (first, second) = tokio::join!(command.execute(()), async {
            tokio::task::yield_now().await;
            command.execute(()).await
        });

        assert_eq!(first, Some(()));
        assert_eq!(second, None);
    }
}
