//! Shipping serializable callables between localities.

mod common;

use exoact::Error;
use exoact::Function;
use exoact::LocalityId;
use exoact::MemoryNetwork;
use exoact::Runtime;
use exoact::SerializableFn;
use exoact::StaticDirectory;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

use common::cluster;
use common::registry;

#[derive(Clone, Serialize, Deserialize)]
struct Polynomial {
    coefficients: Vec<i64>,
}

impl SerializableFn<i64, i64> for Polynomial {
    const TAG: &'static str = "test/polynomial";

    fn call(&mut self, x: i64) -> i64 {
        self.coefficients.iter().rev().fold(0, |acc, c| acc * x + c)
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct Join {
    separator: String,
}

impl SerializableFn<(String, String), String> for Join {
    const TAG: &'static str = "test/join";

    fn call(&mut self, (a, b): (String, String)) -> String {
        format!("{}{}{}", a, self.separator, b)
    }
}

#[tokio::test]
async fn test_apply_runs_on_remote_locality() -> anyhow::Result<()> {
    let cluster = cluster(2, |registry| {
        registry
            .function::<Polynomial, i64, i64>()?
            .function::<Join, (String, String), String>()?;
        Ok(())
    })
    .await?;
    let (caller, remote) = (cluster.at(0), cluster.at(1));

    let mut rng = rand::thread_rng();
    let coefficients: Vec<i64> = (0..4).map(|_| rng.gen_range(-9..=9)).collect();
    let mut local = Function::serializable(Polynomial { coefficients });

    for _ in 0..8 {
        let x = rng.gen_range(-50..=50);
        let shipped = caller.apply(remote.locality(), &local, x)?.await?;
        assert_eq!(shipped, local.call(x)?);
    }

    let join = Function::serializable(Join { separator: "::".into() });
    let joined = caller
        .apply(remote.locality(), &join, ("exo".to_string(), "act".to_string()))?
        .await?;
    assert_eq!(joined, "exo::act");
    Ok(())
}

#[tokio::test]
async fn test_remote_without_registration_rejects_callable() -> anyhow::Result<()> {
    common::init_tracing();

    let network = MemoryNetwork::new();
    let directory = StaticDirectory::new([LocalityId(0), LocalityId(1)]);

    // only the caller knows the polynomial tag
    let caller = Runtime::builder(LocalityId(0))
        .registry(registry(|registry| {
            registry.function::<Polynomial, i64, i64>()?;
            Ok(())
        })?)
        .directory(directory.clone())
        .transport(network.endpoint(LocalityId(0)))
        .start()
        .await?;
    let remote = Runtime::builder(LocalityId(1))
        .directory(directory)
        .transport(network.endpoint(LocalityId(1)))
        .start()
        .await?;

    let f = Function::serializable(Polynomial { coefficients: vec![1, 1] });
    let result = caller.apply(remote.locality(), &f, 2)?.await;
    assert_eq!(result, Err(Error::UnregisteredCallableType("test/polynomial".into())));

    // the caller itself can still apply it
    assert_eq!(caller.apply(caller.locality(), &f, 2)?.await, Ok(3));
    Ok(())
}

#[tokio::test]
async fn test_decoded_copy_is_independent_of_original() -> anyhow::Result<()> {
    let registry = registry(|registry| {
        registry.function::<Polynomial, i64, i64>()?;
        Ok(())
    })?;

    let original = Function::serializable(Polynomial { coefficients: vec![0, 2] });
    let bytes = original.encode()?;
    drop(original);

    let mut decoded = Function::<i64, i64>::decode(&registry, &bytes)?;
    let mut copy = decoded.clone();
    assert_eq!(decoded.call(21)?, 42);
    assert_eq!(copy.call(-1)?, -2);

    let moved = decoded.take();
    assert!(decoded.is_empty());
    assert!(!moved.is_empty());
    Ok(())
}
