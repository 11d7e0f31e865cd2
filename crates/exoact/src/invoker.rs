//! # Action Invoker
//!
//! Turns `invoke::<A>(target, args)` into either a local task or a parcel on
//! the wire, and turns inbound frames back into executions and completions.
//!
//! ## Flow
//!
//! - **Local**: the action runs on its own task against the `Arc` of the
//!   instance; the future completes when the task ends.
//! - **Remote**: the arguments are encoded, an invocation id is issued and
//!   parked in the pending table, and the parcel is sent from a spawned task.
//!   The destination's pump dispatches it and sends a Reply to the return
//!   path; this side's pump completes the pending invocation.
//!
//! Failures detectable before anything is sent (unroutable target, argument
//! encoding, oversized parcel) are returned synchronously. Everything later
//! arrives through the future.
//!
//! ## Panic Safety
//! A panicking action never takes its caller down with it: the panic is
//! caught and reported as an `ActionFault` with code `panic`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::Weak;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use neoparcel::ActionFault;
use neoparcel::FailureReason;
use neoparcel::Frame;
use neoparcel::GlobalAddress;
use neoparcel::LocalityId;
use neoparcel::Outcome;
use neoparcel::Parcel;
use neoparcel::Reply;
use neoparcel::ReturnPath;

use crate::component::Action;
use crate::component::Context;
use crate::error::Error;
use crate::error::Result;
use crate::future;
use crate::future::EagerFuture;
use crate::naming::Destination;
use crate::runtime::Counters;
use crate::runtime::Inner;
use crate::runtime::Runtime;
use crate::transport::Transport;
use crate::transport::TransportError;

fn panic_fault(action: &str, panic: Box<dyn Any + Send>) -> ActionFault {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".into());
    ActionFault::new("panic", format!("{} panicked: {}", action, message))
}

async fn run_guarded<T>(action: &'static str, execution: BoxFuture<'static, Result<T>>) -> Result<T> {
    AssertUnwindSafe(execution)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(Error::RemoteAction(panic_fault(action, panic))))
}

impl Runtime {
    /// Starts `A` on `target` and returns a future for its output.
    pub fn invoke<A: Action>(&self, target: GlobalAddress, args: A::Args) -> Result<EagerFuture<A::Output>> {
        match self.resolve(target)? {
            Destination::Local => self.invoke_local::<A>(target, args),
            Destination::Remote(locality) => self.invoke_remote::<A>(locality, target, args),
        }
    }

    /// Runs `A` on `target` and waits for its output.
    pub async fn call<A: Action>(&self, target: GlobalAddress, args: A::Args) -> Result<A::Output> {
        self.invoke::<A>(target, args)?.await
    }

    /// Starts `A` on `target` without waiting for, or ever receiving, its
    /// outcome. Failures after the send are only logged at the executing
    /// locality.
    pub fn post<A: Action>(&self, target: GlobalAddress, args: A::Args) -> Result<()> {
        match self.resolve(target)? {
            Destination::Local => {
                let server = self.components().instance::<A>(target)?;
                let ctx = Context::new(self.clone(), target);
                self.handle().spawn(async move {
                    if let Err(e) = run_guarded(A::NAME, A::execute(server, ctx, args)).await {
                        warn!(action = A::NAME, %target, error = %e, "posted action failed");
                    }
                });
                Ok(())
            }
            Destination::Remote(locality) => {
                let parcel = Parcel::new(target, A::NAME, neoparcel::encode(&args)?);
                let payload = self.encode_frame(&Frame::Parcel(parcel))?;
                let runtime = self.clone();
                self.handle().spawn(async move {
                    if let Err(e) = runtime.send(locality, payload).await {
                        warn!(action = A::NAME, %target, error = %e, "post not delivered");
                    }
                });
                Ok(())
            }
        }
    }

    fn invoke_local<A: Action>(&self, target: GlobalAddress, args: A::Args) -> Result<EagerFuture<A::Output>> {
        let server = self.components().instance::<A>(target)?;
        let ctx = Context::new(self.clone(), target);
        let (mut promise, future) = future::channel();

        trace!(action = A::NAME, %target, "local invocation");
        self.handle().spawn(async move {
            let result = run_guarded(A::NAME, A::execute(server, ctx, args)).await;
            let _ = promise.complete(result);
        });
        Ok(future)
    }

    fn invoke_remote<A: Action>(
        &self,
        locality: LocalityId,
        target: GlobalAddress,
        args: A::Args,
    ) -> Result<EagerFuture<A::Output>> {
        let args = neoparcel::encode(&args)?;

        // ids are fixed-width on the wire, so a placeholder sizes the real
        // frame and no id is issued for a parcel that never leaves
        let parcel = Parcel::new(target, A::NAME, args).with_return_path(ReturnPath::new(self.locality(), 0));
        self.check_size(parcel.framed_len()?)?;

        let id = self.inner.pending.issue();
        let parcel = parcel.with_return_path(ReturnPath::new(self.locality(), id));
        let payload = Frame::Parcel(parcel).encode()?;

        let (promise, future) = future::channel();
        let mut promise = promise.for_invocation(id);
        self.inner.pending.insert(
            id,
            A::NAME,
            target,
            Box::new(move |outcome: Result<Vec<u8>>| {
                let result = outcome.and_then(|bytes| Ok(neoparcel::decode::<A::Output>(&bytes)?));
                let _ = promise.complete(result);
            }),
        );

        trace!(action = A::NAME, %target, id, "remote invocation");
        let runtime = self.clone();
        self.handle().spawn(async move {
            if let Err(e) = runtime.send(locality, payload).await {
                warn!(action = A::NAME, %target, id, error = %e, "send failed");
                runtime.inner.pending.fail(id, Error::Communication(e));
            }
        });
        Ok(future)
    }

    /// Encodes a frame, enforcing the configured size ceiling.
    fn encode_frame(&self, frame: &Frame) -> Result<Vec<u8>> {
        let payload = frame.encode()?;
        self.check_size(payload.len())?;
        Ok(payload)
    }

    fn check_size(&self, size: usize) -> Result<()> {
        let limit = self.config().max_parcel_bytes;
        if size > limit {
            return Err(Error::Communication(TransportError::PayloadTooLarge { size, limit }));
        }
        Ok(())
    }

    async fn send(&self, locality: LocalityId, payload: Vec<u8>) -> std::result::Result<(), TransportError> {
        self.inner.transport.send(locality, payload).await?;
        Counters::bump(&self.inner.counters.frames_sent);
        Ok(())
    }

    fn accept(&self, payload: Vec<u8>) {
        let frame = match Frame::decode(&payload) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(locality = %self.locality(), error = %e, "dropping undecodable frame");
                Counters::bump(&self.inner.counters.dropped_frames);
                return;
            }
        };

        match frame {
            Frame::Parcel(parcel) => {
                let runtime = self.clone();
                self.handle().spawn(async move { runtime.dispatch(parcel).await });
            }
            Frame::Reply(reply) => self.complete(reply),
        }
    }

    fn complete(&self, reply: Reply) {
        let id = reply.return_path.invocation;
        if reply.return_path.locality != self.locality() {
            warn!(locality = %self.locality(), to = %reply.return_path.locality, id, "dropping misrouted reply");
            Counters::bump(&self.inner.counters.dropped_frames);
            return;
        }

        let outcome = match reply.outcome {
            Outcome::Value(bytes) => Ok(bytes),
            Outcome::Failed(reason) => Err(Error::from(reason)),
        };

        match self.inner.pending.complete(id, outcome) {
            Ok(()) => Counters::bump(&self.inner.counters.replies_accepted),
            Err(Error::DuplicateResult(id)) => {
                warn!(locality = %self.locality(), id, "discarding duplicate reply");
                Counters::bump(&self.inner.counters.duplicate_replies);
            }
            Err(e) => {
                warn!(locality = %self.locality(), id, error = %e, "discarding reply");
                Counters::bump(&self.inner.counters.dropped_frames);
            }
        }
    }

    async fn dispatch(self, parcel: Parcel) {
        let Parcel {
            destination,
            action,
            args,
            return_path,
        } = parcel;

        trace!(%action, %destination, "dispatching parcel");
        Counters::bump(&self.inner.counters.parcels_dispatched);

        let outcome = match self.execute_parcel(destination, &action, args).await {
            Ok(bytes) => Outcome::Value(bytes),
            Err(reason) => Outcome::Failed(reason),
        };

        let Some(return_path) = return_path else {
            if let Outcome::Failed(reason) = &outcome {
                warn!(%action, %destination, %reason, "posted action failed");
            }
            return;
        };

        self.reply(return_path, outcome).await;
    }

    async fn execute_parcel(
        &self,
        destination: GlobalAddress,
        action: &str,
        args: Vec<u8>,
    ) -> std::result::Result<Vec<u8>, FailureReason> {
        if destination.locality != self.locality() {
            return Err(FailureReason::UnknownTarget(destination));
        }

        let entry = self.registry().action(action).map_err(|e| e.to_failure())?;
        let ctx = Context::new(self.clone(), destination);

        AssertUnwindSafe(entry.dispatch(ctx, args))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(FailureReason::Action(panic_fault(action, panic))))
    }

    async fn reply(&self, return_path: ReturnPath, outcome: Outcome) {
        let payload = match self.encode_frame(&Frame::Reply(Reply { return_path, outcome })) {
            Ok(payload) => payload,
            Err(e) => {
                // the caller still learns that its invocation ended
                let outcome = Outcome::Failed(FailureReason::Encode(e.to_string()));
                match self.encode_frame(&Frame::Reply(Reply { return_path, outcome })) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(id = return_path.invocation, error = %e, "reply could not be encoded");
                        return;
                    }
                }
            }
        };

        if let Err(e) = self.send(return_path.locality, payload).await {
            warn!(to = %return_path.locality, id = return_path.invocation, error = %e, "reply not delivered");
        }
    }
}

/// Receive loop of one locality.
///
/// Holds the runtime weakly so that dropping the last `Runtime` handle ends
/// it. When the transport closes or fails, every invocation still waiting
/// for a reply fails with `Communication`.
pub(crate) async fn pump(inner: Weak<Inner>, transport: Arc<dyn Transport>) {
    let error = loop {
        match transport.recv().await {
            Ok(Some(payload)) => {
                let Some(inner) = inner.upgrade() else {
                    return;
                };
                Runtime { inner }.accept(payload);
            }
            Ok(None) => break TransportError::ConnectionLost("transport closed".into()),
            Err(e) => break e,
        }
    };

    if let Some(inner) = inner.upgrade() {
        let failed = inner.pending.fail_all(Error::Communication(error.clone()));
        debug!(locality = %inner.config.locality, failed, %error, "receive pump stopped");
    }
}
