//! # Action Registry
//!
//! Maps wire tags to the code that can serve them: actions, component
//! factories and serializable callables. A locality can only execute what it
//! registered, so every locality of a system builds the same registry.
//!
//! Registration happens once, on a `RegistryBuilder`, before the runtime
//! starts. `build` freezes the tables into a `Registry` that is shared by
//! `Arc` and read without locking.

use std::any::Any;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;

use neoparcel::FailureReason;

use crate::component::Action;
use crate::component::Component;
use crate::component::Context;
use crate::error::Error;
use crate::error::Result;
use crate::function::Function;
use crate::function::SerializableFn;
use crate::support::LocalitySupport;

type DispatchFn = fn(Context, Vec<u8>) -> BoxFuture<'static, std::result::Result<Vec<u8>, FailureReason>>;
type CreateFn = fn() -> Arc<dyn Any + Send + Sync>;
type ApplyFn = fn(&[u8], &[u8]) -> Result<Vec<u8>>;

/// Something registered under a tag, remembering which Rust type put it there.
trait Registered {
    fn origin(&self) -> TypeId;
}

/// Byte-level entry point of one action.
pub struct ActionEntry {
    tag: &'static str,
    component: &'static str,
    origin: TypeId,
    dispatch: DispatchFn,
}

impl ActionEntry {
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Name of the component the action runs against.
    pub fn component(&self) -> &'static str {
        self.component
    }

    /// Decodes the arguments, runs the action against the instance at
    /// `ctx.this()` and encodes its output.
    pub(crate) fn dispatch(&self, ctx: Context, args: Vec<u8>) -> BoxFuture<'static, std::result::Result<Vec<u8>, FailureReason>> {
        (self.dispatch)(ctx, args)
    }
}

impl Registered for ActionEntry {
    fn origin(&self) -> TypeId {
        self.origin
    }
}

/// Factory of one component type.
pub struct ComponentEntry {
    name: &'static str,
    origin: TypeId,
    create: CreateFn,
}

impl ComponentEntry {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// A default-constructed instance, type-erased for the component table.
    pub(crate) fn create(&self) -> Arc<dyn Any + Send + Sync> {
        (self.create)()
    }
}

impl Registered for ComponentEntry {
    fn origin(&self) -> TypeId {
        self.origin
    }
}

/// Decoder and remote entry point of one serializable callable type.
pub struct FunctionEntry {
    tag: &'static str,
    origin: TypeId,
    // holds a `fn(&[u8]) -> Result<Function<A, R>>` for the registered signature
    decode: Box<dyn Any + Send + Sync>,
    apply: ApplyFn,
}

impl FunctionEntry {
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// The payload decoder, if the callable was registered as `Function<A, R>`.
    pub fn decoder<A: 'static, R: 'static>(&self) -> Result<fn(&[u8]) -> Result<Function<A, R>>> {
        self.decode
            .downcast_ref::<fn(&[u8]) -> Result<Function<A, R>>>()
            .copied()
            .ok_or_else(|| Error::SignatureMismatch(self.tag.to_string()))
    }

    /// Decodes the callable and its arguments, calls it once and encodes the
    /// result.
    pub(crate) fn apply(&self, payload: &[u8], args: &[u8]) -> Result<Vec<u8>> {
        (self.apply)(payload, args)
    }
}

impl Registered for FunctionEntry {
    fn origin(&self) -> TypeId {
        self.origin
    }
}

fn insert_unique<E: Registered>(table: &mut HashMap<&'static str, E>, tag: &'static str, entry: E) -> Result<()> {
    match table.get(tag) {
        Some(existing) if existing.origin() == entry.origin() => Ok(()),
        Some(_) => Err(Error::DuplicateRegistration(tag.to_string())),
        None => {
            table.insert(tag, entry);
            Ok(())
        }
    }
}

fn dispatch_action<A: Action>(ctx: Context, args: Vec<u8>) -> BoxFuture<'static, std::result::Result<Vec<u8>, FailureReason>> {
    Box::pin(async move {
        let server = ctx
            .runtime()
            .components()
            .instance::<A>(ctx.this())
            .map_err(|e| e.to_failure())?;
        let args: A::Args = neoparcel::decode(&args)?;
        let output = A::execute(server, ctx, args).await.map_err(|e| e.to_failure())?;
        Ok(neoparcel::encode(&output)?)
    })
}

fn create_component<C: Component>() -> Arc<dyn Any + Send + Sync> {
    Arc::new(C::default())
}

fn decode_function<F, A, R>(payload: &[u8]) -> Result<Function<A, R>>
where
    F: SerializableFn<A, R>,
{
    let f: F = neoparcel::decode(payload)?;
    Ok(Function::serializable(f))
}

fn apply_function<F, A, R>(payload: &[u8], args: &[u8]) -> Result<Vec<u8>>
where
    F: SerializableFn<A, R>,
    A: DeserializeOwned,
    R: Serialize,
{
    let mut f: F = neoparcel::decode(payload)?;
    let args: A = neoparcel::decode(args)?;
    Ok(neoparcel::encode(&f.call(args))?)
}

/// Collects registrations before the runtime starts.
#[derive(Default)]
pub struct RegistryBuilder {
    actions: HashMap<&'static str, ActionEntry>,
    components: HashMap<&'static str, ComponentEntry>,
    functions: HashMap<&'static str, FunctionEntry>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one action under `A::NAME`.
    pub fn action<A: Action>(&mut self) -> Result<&mut Self> {
        let entry = ActionEntry {
            tag: A::NAME,
            component: <A::Component as Component>::NAME,
            origin: TypeId::of::<A>(),
            dispatch: dispatch_action::<A>,
        };
        insert_unique(&mut self.actions, A::NAME, entry)?;
        Ok(self)
    }

    /// Registers the factory of `C` and every action it declares.
    pub fn component<C: Component>(&mut self) -> Result<&mut Self> {
        let entry = ComponentEntry {
            name: C::NAME,
            origin: TypeId::of::<C>(),
            create: create_component::<C>,
        };
        insert_unique(&mut self.components, C::NAME, entry)?;
        C::register(self)?;
        Ok(self)
    }

    /// Registers the serializable callable `F` for the signature `A -> R`.
    ///
    /// A callable type has exactly one signature; registering the same `F`
    /// for another one is a duplicate.
    pub fn function<F, A, R>(&mut self) -> Result<&mut Self>
    where
        F: SerializableFn<A, R>,
        A: Serialize + DeserializeOwned + Send + 'static,
        R: Serialize + DeserializeOwned + Send + 'static,
    {
        let decode: fn(&[u8]) -> Result<Function<A, R>> = decode_function::<F, A, R>;
        let entry = FunctionEntry {
            tag: F::TAG,
            origin: TypeId::of::<(F, A, R)>(),
            decode: Box::new(decode),
            apply: apply_function::<F, A, R>,
        };
        insert_unique(&mut self.functions, F::TAG, entry)?;
        Ok(self)
    }

    /// Freezes the tables, adding the built-in locality support component.
    pub fn build(mut self) -> Result<Registry> {
        self.component::<LocalitySupport>()?;
        Ok(Registry {
            actions: self.actions,
            components: self.components,
            functions: self.functions,
        })
    }
}

/// The frozen tag tables of one locality.
pub struct Registry {
    actions: HashMap<&'static str, ActionEntry>,
    components: HashMap<&'static str, ComponentEntry>,
    functions: HashMap<&'static str, FunctionEntry>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn action(&self, tag: &str) -> Result<&ActionEntry> {
        self.actions.get(tag).ok_or_else(|| Error::UnknownAction(tag.to_string()))
    }

    pub fn component(&self, name: &str) -> Result<&ComponentEntry> {
        self.components.get(name).ok_or_else(|| Error::UnknownComponent(name.to_string()))
    }

    pub fn function(&self, tag: &str) -> Result<&FunctionEntry> {
        self.functions
            .get(tag)
            .ok_or_else(|| Error::UnregisteredCallableType(tag.to_string()))
    }

    /// Registered action tags, sorted.
    pub fn action_tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.actions.keys().copied().collect();
        tags.sort_unstable();
        tags
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("actions", &self.actions.len())
            .field("components", &self.components.len())
            .field("functions", &self.functions.len())
            .finish()
    }
}
