//! Delivery guarantees of the invoker under transport faults.

mod common;

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use exoact::Action;
use exoact::Component;
use exoact::Context;
use exoact::Error;
use exoact::GlobalAddress;
use exoact::LocalityId;
use exoact::MemoryTransport;
use exoact::RegistryBuilder;
use exoact::Transport;
use exoact::TransportError;
use exoact::transport;
use futures::future::BoxFuture;
use neoparcel::FailureReason;
use neoparcel::Frame;
use neoparcel::Outcome;
use neoparcel::Parcel;
use neoparcel::ReturnPath;

use common::cluster;
use common::cluster_with;
use common::eventually;

#[derive(Default)]
struct Echo;

impl Component for Echo {
    const NAME: &'static str = "test/echo";

    fn register(registry: &mut RegistryBuilder) -> exoact::Result<()> {
        registry.action::<Shout>()?.action::<Stall>()?;
        Ok(())
    }
}

struct Shout;

impl Action for Shout {
    type Component = Echo;
    type Args = String;
    type Output = String;

    const NAME: &'static str = "echo/shout";

    fn execute(_: Arc<Echo>, _: Context, text: String) -> BoxFuture<'static, exoact::Result<String>> {
        Box::pin(async move { Ok(text.to_uppercase()) })
    }
}

/// Never answers within a test's lifetime.
struct Stall;

impl Action for Stall {
    type Component = Echo;
    type Args = ();
    type Output = ();

    const NAME: &'static str = "echo/stall";

    fn execute(_: Arc<Echo>, _: Context, _: ()) -> BoxFuture<'static, exoact::Result<()>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        })
    }
}

fn register(registry: &mut RegistryBuilder) -> exoact::Result<()> {
    registry.component::<Echo>()?;
    Ok(())
}

/// Counts every payload handed to the network.
struct Counting {
    inner: MemoryTransport,
    sends: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Transport for Counting {
    async fn send(&self, destination: LocalityId, payload: Vec<u8>) -> transport::Result<()> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.inner.send(destination, payload).await
    }

    async fn recv(&self) -> transport::Result<Option<Vec<u8>>> {
        self.inner.recv().await
    }
}

/// Delivers every reply frame twice.
struct Stuttering {
    inner: MemoryTransport,
}

#[async_trait::async_trait]
impl Transport for Stuttering {
    async fn send(&self, destination: LocalityId, payload: Vec<u8>) -> transport::Result<()> {
        if let Ok(Frame::Reply(_)) = Frame::decode(&payload) {
            self.inner.send(destination, payload.clone()).await?;
        }
        self.inner.send(destination, payload).await
    }

    async fn recv(&self) -> transport::Result<Option<Vec<u8>>> {
        self.inner.recv().await
    }
}

#[tokio::test]
async fn test_invalid_target_never_reaches_transport() -> anyhow::Result<()> {
    let sends = Arc::new(AtomicUsize::new(0));
    let counter = sends.clone();
    let cluster = cluster_with(2, register, move |inner| Counting {
        inner,
        sends: counter.clone(),
    })
    .await?;

    let caller = cluster.at(0);
    let result = caller.invoke::<Shout>(GlobalAddress::INVALID, "hello".into());
    assert!(matches!(result, Err(Error::UnknownTarget(gid)) if !gid.is_valid()));

    let unknown_locality = GlobalAddress::new(LocalityId(42), 3);
    assert!(matches!(
        caller.post::<Shout>(unknown_locality, "hello".into()),
        Err(Error::UnknownTarget(_))
    ));

    tokio::task::yield_now().await;
    assert_eq!(sends.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_reply_is_discarded() -> anyhow::Result<()> {
    let cluster = cluster_with(2, register, |inner| Stuttering { inner }).await?;
    let (caller, host) = (cluster.at(0), cluster.at(1));

    let echo = caller.create::<Echo>(host.locality())?.await?;
    assert_eq!(caller.call::<Shout>(echo, "once".into()).await?, "ONCE");

    // create and shout were both answered twice
    eventually(|| caller.stats().duplicate_replies == 2).await?;
    assert_eq!(caller.stats().replies_accepted, 2);
    assert_eq!(caller.pending_invocations(), 0);
    Ok(())
}

#[tokio::test]
async fn test_send_to_disconnected_locality_fails() -> anyhow::Result<()> {
    let cluster = cluster(2, register).await?;
    let (caller, host) = (cluster.at(0), cluster.at(1));
    let echo = caller.create::<Echo>(host.locality())?.await?;

    cluster.network.disconnect(host.locality());

    let result = caller.call::<Shout>(echo, "anyone?".into()).await;
    assert_eq!(
        result,
        Err(Error::Communication(TransportError::UnknownLocality(LocalityId(1))))
    );
    assert_eq!(caller.pending_invocations(), 0);
    Ok(())
}

#[tokio::test]
async fn test_pump_shutdown_fails_pending_invocations() -> anyhow::Result<()> {
    let cluster = cluster(2, register).await?;
    let (caller, host) = (cluster.at(0), cluster.at(1));
    let echo = caller.create::<Echo>(host.locality())?.await?;

    let stalled = caller.invoke::<Stall>(echo, ())?;
    eventually(|| host.stats().parcels_dispatched == 2).await?;
    assert_eq!(caller.pending_invocations(), 1);

    // the caller's own endpoint goes away, so its reply can never arrive
    cluster.network.disconnect(caller.locality());

    let result = stalled.await;
    assert!(
        matches!(result, Err(Error::Communication(TransportError::ConnectionLost(_)))),
        "{:?}",
        result
    );
    assert_eq!(caller.pending_invocations(), 0);
    Ok(())
}

#[tokio::test]
async fn test_timeout_is_layered_by_the_caller() -> anyhow::Result<()> {
    let cluster = cluster(2, register).await?;
    let (caller, host) = (cluster.at(0), cluster.at(1));
    let echo = caller.create::<Echo>(host.locality())?.await?;

    let stalled = caller.invoke::<Stall>(echo, ())?;
    let waited = tokio::time::timeout(Duration::from_millis(20), stalled).await;
    assert!(waited.is_err());

    // giving up on the future does not withdraw the invocation
    assert_eq!(caller.pending_invocations(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_wait_off_the_runtime() -> anyhow::Result<()> {
    let cluster = cluster(2, register).await?;
    let (caller, host) = (cluster.at(0), cluster.at(1));
    let echo = caller.create::<Echo>(host.locality())?.await?;

    let future = caller.invoke::<Shout>(echo, "blocking".into())?;
    let shouted = tokio::task::spawn_blocking(move || future.wait()).await??;
    assert_eq!(shouted, "BLOCKING");
    Ok(())
}

#[tokio::test]
async fn test_malformed_parcels_are_answered_or_dropped() -> anyhow::Result<()> {
    let cluster = cluster(2, register).await?;
    let host = cluster.at(1);
    let echo = host.create::<Echo>(host.locality())?.await?;

    // a bare endpoint standing in for some other process
    let peer = cluster.network.endpoint(LocalityId(7));

    let bad_args = Parcel::new(echo, "echo/shout", vec![0xff])
        .with_return_path(ReturnPath::new(LocalityId(7), 1));
    let bad_action = Parcel::new(echo, "echo/whisper", Vec::new())
        .with_return_path(ReturnPath::new(LocalityId(7), 2));

    for parcel in [bad_args, bad_action] {
        peer.send(host.locality(), Frame::Parcel(parcel).encode()?).await?;
        let reply = match peer.recv().await?.map(|bytes| Frame::decode(&bytes)) {
            Some(Ok(Frame::Reply(reply))) => reply,
            other => anyhow::bail!("expected a reply, got {:?}", other),
        };
        match (reply.return_path.invocation, reply.outcome) {
            (1, Outcome::Failed(FailureReason::Decode(_))) => {}
            (2, Outcome::Failed(FailureReason::UnknownAction(tag))) => assert_eq!(tag, "echo/whisper"),
            other => anyhow::bail!("unexpected outcome {:?}", other),
        }
    }

    peer.send(host.locality(), vec![1, 2, 3]).await?;
    eventually(|| host.stats().dropped_frames == 1).await?;
    Ok(())
}
