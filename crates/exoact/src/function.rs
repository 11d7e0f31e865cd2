//! # Callable Box
//!
//! `Function<A, R>` holds any clonable `FnMut(A) -> R` without its holder
//! knowing the concrete type, and, for named serializable callables, can
//! carry it across a process boundary.
//!
//! ## Dispatch Table
//!
//! The per-type table of operations (copy, invoke, describe, encode) is the
//! vtable of the private `Callable` trait, chosen once when the box is built.
//! Move and destroy are Rust's own: `take` leaves the source empty and
//! dropping the box drops the value. Decoding is not on the table, since
//! there is no value to dispatch on yet; it goes through the tag recorded in
//! the `Registry`.
//!
//! Multi-argument callables take a tuple: `Function<(u32, u32), u32>`.

use std::any::TypeId;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::error::Result;
use crate::registry::Registry;

/// A named callable type that can travel between localities.
///
/// `TAG` must be unique across the system and register to the same type on
/// every locality.
pub trait SerializableFn<A, R>: Clone + Serialize + DeserializeOwned + Send + 'static {
    const TAG: &'static str;

    fn call(&mut self, args: A) -> R;
}

/// Identity of the value held by a `Function`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TargetType {
    /// A process-local callable, identified by its Rust type.
    Local { id: TypeId, name: &'static str },
    /// A serializable callable, identified by its wire tag.
    Registered(&'static str),
}

impl TargetType {
    /// The wire tag, for serializable callables.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Self::Registered(tag) => Some(tag),
            Self::Local { .. } => None,
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local { name, .. } => write!(f, "local {}", name),
            Self::Registered(tag) => write!(f, "registered '{}'", tag),
        }
    }
}

trait Callable<A, R>: Send {
    fn call(&mut self, args: A) -> R;
    fn clone_box(&self) -> Box<dyn Callable<A, R>>;
    fn target_type(&self) -> TargetType;
    fn encode_payload(&self) -> Result<Vec<u8>>;
}

struct LocalFn<F>(F);

impl<A, R, F> Callable<A, R> for LocalFn<F>
where
    F: FnMut(A) -> R + Clone + Send + 'static,
{
    fn call(&mut self, args: A) -> R {
        (self.0)(args)
    }

    fn clone_box(&self) -> Box<dyn Callable<A, R>> {
        Box::new(LocalFn(self.0.clone()))
    }

    fn target_type(&self) -> TargetType {
        TargetType::Local {
            id: TypeId::of::<F>(),
            name: std::any::type_name::<F>(),
        }
    }

    fn encode_payload(&self) -> Result<Vec<u8>> {
        Err(Error::Encode(format!(
            "{} is not a serializable callable",
            std::any::type_name::<F>()
        )))
    }
}

struct RegisteredFn<F>(F);

impl<A, R, F> Callable<A, R> for RegisteredFn<F>
where
    F: SerializableFn<A, R>,
{
    fn call(&mut self, args: A) -> R {
        self.0.call(args)
    }

    fn clone_box(&self) -> Box<dyn Callable<A, R>> {
        Box::new(RegisteredFn(self.0.clone()))
    }

    fn target_type(&self) -> TargetType {
        TargetType::Registered(F::TAG)
    }

    fn encode_payload(&self) -> Result<Vec<u8>> {
        Ok(neoparcel::encode(&self.0)?)
    }
}

/// Wire form of a serializable callable: the tag, then the value.
#[derive(Serialize, Deserialize)]
pub(crate) struct EncodedFunction {
    pub tag: String,
    pub payload: Vec<u8>,
}

/// A type-erased, clonable, optionally serializable callable.
pub struct Function<A, R> {
    object: Option<Box<dyn Callable<A, R>>>,
}

impl<A, R> Function<A, R> {
    /// An empty box; invoking it fails with `EmptyInvocation`.
    pub fn empty() -> Self {
        Self { object: None }
    }

    /// Boxes a process-local callable.
    pub fn new<F>(f: F) -> Self
    where
        F: FnMut(A) -> R + Clone + Send + 'static,
    {
        Self {
            object: Some(Box::new(LocalFn(f))),
        }
    }

    /// Boxes a callable that can be encoded and shipped to another locality.
    pub fn serializable<F>(f: F) -> Self
    where
        F: SerializableFn<A, R>,
    {
        Self {
            object: Some(Box::new(RegisteredFn(f))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.object.is_none()
    }

    pub fn is_serializable(&self) -> bool {
        self.target_type().and_then(|t| t.tag()).is_some()
    }

    /// Drops the held value, leaving the box empty.
    pub fn reset(&mut self) {
        self.object = None;
    }

    /// Replaces the held value with a process-local callable.
    pub fn set<F>(&mut self, f: F)
    where
        F: FnMut(A) -> R + Clone + Send + 'static,
    {
        self.object = None;
        self.object = Some(Box::new(LocalFn(f)));
    }

    /// Moves the held value out, leaving this box empty.
    pub fn take(&mut self) -> Self {
        Self {
            object: self.object.take(),
        }
    }

    /// Invokes the held value.
    pub fn call(&mut self, args: A) -> Result<R> {
        match self.object.as_mut() {
            Some(object) => Ok(object.call(args)),
            None => Err(Error::EmptyInvocation),
        }
    }

    /// Identity of the held value, or `None` when empty.
    pub fn target_type(&self) -> Option<TargetType> {
        self.object.as_ref().map(|object| object.target_type())
    }

    /// Encodes the held value as its tag followed by its payload.
    ///
    /// Fails with `Encode` for empty boxes and process-local callables.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let object = self
            .object
            .as_ref()
            .ok_or_else(|| Error::Encode("cannot encode an empty function".into()))?;

        let payload = object.encode_payload()?;
        let tag = match object.target_type() {
            TargetType::Registered(tag) => tag.to_string(),
            other => return Err(Error::Encode(format!("{} has no wire tag", other))),
        };

        Ok(neoparcel::encode(&EncodedFunction { tag, payload })?)
    }
}

impl<A: 'static, R: 'static> Function<A, R> {
    /// Rebuilds a box from bytes produced by [`Function::encode`].
    ///
    /// The tag must have been registered for this exact signature.
    pub fn decode(registry: &Registry, bytes: &[u8]) -> Result<Self> {
        let encoded: EncodedFunction = neoparcel::decode(bytes)?;
        let entry = registry.function(&encoded.tag)?;
        let decode = entry.decoder::<A, R>()?;
        decode(&encoded.payload)
    }
}

impl<A, R> Clone for Function<A, R> {
    fn clone(&self) -> Self {
        Self {
            object: self.object.as_ref().map(|object| object.clone_box()),
        }
    }
}

impl<A, R> Default for Function<A, R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<A, R> std::fmt::Debug for Function<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.target_type() {
            Some(target) => write!(f, "Function({})", target),
            None => write!(f, "Function(empty)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Serialize, Deserialize)]
    struct Offset {
        by: i64,
    }

    impl SerializableFn<i64, i64> for Offset {
        const TAG: &'static str = "test/offset";

        fn call(&mut self, x: i64) -> i64 {
            x + self.by
        }
    }

    #[test]
    fn test_box_forwards_to_pure_function() {
        let square = |x: u64| x * x;
        let mut boxed = Function::new(square);
        for x in [0u64, 1, 7, 1 << 20] {
            assert_eq!(boxed.call(x).unwrap(), square(x));
        }
    }

    #[test]
    fn test_tuple_arguments() {
        let mut add = Function::new(|(a, b): (u32, u32)| a + b);
        assert_eq!(add.call((2, 3)).unwrap(), 5);
    }

    #[test]
    fn test_empty_invocation() {
        let mut f: Function<(), ()> = Function::empty();
        assert!(f.is_empty());
        assert_eq!(f.call(()), Err(Error::EmptyInvocation));
        assert!(f.target_type().is_none());
    }

    #[test]
    fn test_copy_is_independent() {
        let mut counter = 0u32;
        let mut original = Function::new(move |step: u32| {
            counter += step;
            counter
        });

        assert_eq!(original.call(1).unwrap(), 1);

        let mut copy = original.clone();
        assert_eq!(copy.call(10).unwrap(), 11);
        assert_eq!(copy.call(10).unwrap(), 21);

        // the original kept its own captured state
        assert_eq!(original.call(1).unwrap(), 2);
    }

    #[test]
    fn test_take_leaves_source_empty() {
        let mut source = Function::new(|x: i32| x - 1);
        let mut moved = source.take();

        assert_eq!(moved.call(5).unwrap(), 4);
        assert!(source.is_empty());
        assert_eq!(source.call(5), Err(Error::EmptyInvocation));
    }

    #[test]
    fn test_reset_and_reassign() {
        let mut f = Function::new(|x: i32| x * 2);
        f.reset();
        assert_eq!(f.call(1), Err(Error::EmptyInvocation));

        f.set(|x: i32| x * 3);
        assert_eq!(f.call(2).unwrap(), 6);

        f = f.clone();
        assert_eq!(f.call(2).unwrap(), 6);
    }

    #[test]
    fn test_target_type_identity() {
        fn double(x: u8) -> u8 {
            x.wrapping_mul(2)
        }
        let a = Function::new(double);
        let b = a.clone();
        let c = Function::new(|x: u8| x);

        assert_eq!(a.target_type(), b.target_type());
        assert_ne!(a.target_type(), c.target_type());

        let s = Function::serializable(Offset { by: 1 });
        assert_eq!(s.target_type(), Some(TargetType::Registered("test/offset")));
        assert!(s.is_serializable());
        assert!(!a.is_serializable());
    }

    #[test]
    fn test_local_function_does_not_encode() {
        let f = Function::new(|x: i64| x);
        assert!(matches!(f.encode(), Err(Error::Encode(_))));

        let empty: Function<i64, i64> = Function::empty();
        assert!(matches!(empty.encode(), Err(Error::Encode(_))));
    }

    #[test]
    fn test_serializable_function_calls_through() {
        let mut f = Function::serializable(Offset { by: -3 });
        assert_eq!(f.call(10).unwrap(), 7);
        assert!(f.encode().is_ok());
    }

    #[test]
    fn test_debug_output() {
        let empty: Function<(), ()> = Function::default();
        assert_eq!(format!("{:?}", empty), "Function(empty)");

        let s = Function::serializable(Offset { by: 0 });
        assert_eq!(format!("{:?}", s), "Function(registered 'test/offset')");
    }
}
