//! # Eager Futures
//!
//! The two ends of one invocation result. The `Promise` is held by whoever
//! produces the result (a local task or the reply pump) and completes exactly
//! once; the `EagerFuture` is handed to the caller as soon as the invocation
//! has been sent, hence "eager": the work is already under way when the
//! caller first looks at it.
//!
//! ## Waiting
//!
//! - `.await` (or `get().await`) suspends the calling task only.
//! - `wait()` blocks the calling thread. It must not be called from inside
//!   the async runtime; use it from plain threads or `spawn_blocking`.
//!
//! There is no built-in timeout. Wrap the future in `tokio::time::timeout`
//! where one is needed.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use std::task::Context;
use std::task::Poll;

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::error::Error;
use crate::error::Result;

/// Where an invocation is in its life.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InvocationState {
    Pending,
    Completed,
    Failed,
}

const PENDING: u8 = 0;
const COMPLETED: u8 = 1;
const FAILED: u8 = 2;

fn load(state: &AtomicU8) -> InvocationState {
    match state.load(Ordering::Acquire) {
        PENDING => InvocationState::Pending,
        COMPLETED => InvocationState::Completed,
        _ => InvocationState::Failed,
    }
}

/// Creates a connected promise/future pair.
pub fn channel<T>() -> (Promise<T>, EagerFuture<T>) {
    let (tx, rx) = oneshot::channel();
    let state = Arc::new(AtomicU8::new(PENDING));
    let promise = Promise {
        invocation: 0,
        tx: Some(tx),
        state: state.clone(),
    };
    (promise, EagerFuture { rx, state })
}

/// The producing end of an invocation result.
///
/// Dropping an uncompleted promise fails its future with `BrokenPromise`.
pub struct Promise<T> {
    invocation: u64,
    tx: Option<oneshot::Sender<Result<T>>>,
    state: Arc<AtomicU8>,
}

impl<T> Promise<T> {
    pub(crate) fn for_invocation(mut self, invocation: u64) -> Self {
        self.invocation = invocation;
        self
    }

    pub fn state(&self) -> InvocationState {
        load(&self.state)
    }

    /// Resolves the future. A second completion fails with
    /// `DuplicateResult` and leaves the first result in place.
    pub fn complete(&mut self, result: Result<T>) -> Result<()> {
        let tx = self.tx.take().ok_or(Error::DuplicateResult(self.invocation))?;
        let state = if result.is_ok() { COMPLETED } else { FAILED };
        self.state.store(state, Ordering::Release);
        // the caller may have stopped waiting
        let _ = tx.send(result);
        Ok(())
    }

    pub fn set_value(&mut self, value: T) -> Result<()> {
        self.complete(Ok(value))
    }

    pub fn set_error(&mut self, error: Error) -> Result<()> {
        self.complete(Err(error))
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.state.store(FAILED, Ordering::Release);
        }
    }
}

/// The consuming end of an invocation result.
#[must_use = "an eager future still runs when dropped, but its result is lost"]
pub struct EagerFuture<T> {
    rx: oneshot::Receiver<Result<T>>,
    state: Arc<AtomicU8>,
}

impl<T> EagerFuture<T> {
    /// A future that is already resolved.
    pub fn ready(result: Result<T>) -> Self {
        let (mut promise, future) = channel();
        let _ = promise.complete(result);
        future
    }

    pub fn state(&self) -> InvocationState {
        load(&self.state)
    }

    pub fn is_ready(&self) -> bool {
        self.state() != InvocationState::Pending
    }

    /// Suspends the calling task until the result arrives.
    pub async fn get(self) -> Result<T> {
        self.await
    }

    /// Blocks the calling thread until the result arrives.
    ///
    /// # Panics
    /// When called from within an async execution context.
    pub fn wait(self) -> Result<T> {
        self.rx.blocking_recv().unwrap_or(Err(Error::BrokenPromise))
    }
}

impl<T: Send + 'static> EagerFuture<T> {
    /// Chains a conversion that runs as soon as the result arrives, on `handle`.
    pub(crate) fn then<U, F>(self, handle: &Handle, f: F) -> EagerFuture<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        let (mut promise, future) = channel();
        handle.spawn(async move {
            let result = self.await.and_then(f);
            let _ = promise.complete(result);
        });
        future
    }
}

impl<T> Future for EagerFuture<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(Error::BrokenPromise)))
    }
}

impl<T> std::fmt::Debug for EagerFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EagerFuture").field("state", &self.state()).finish()
    }
}
