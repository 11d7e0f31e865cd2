//! # Exoact
//!
//! Distributed components addressed by `GlobalAddress`, invoked through
//! named actions whose results arrive as eager futures.
//!
//! ## Architecture
//!
//! - A **locality** is one `Runtime`. It hosts component instances, a frozen
//!   `Registry` of everything it can execute, and one transport endpoint.
//! - A **component** is declared once as a `Component` plus one `Action` per
//!   operation. Servers hold state; stubs are thin typed wrappers over
//!   `Runtime::call`.
//! - An **invocation** runs locally on a task, or travels as a `Parcel` and
//!   comes back as a `Reply` correlated by invocation id.
//! - A **`Function`** boxes a callable. Named serializable callables can be
//!   shipped to another locality and applied there.

pub mod builder;
pub mod component;
pub mod components;
pub mod config;
pub mod error;
pub mod function;
pub mod future;
mod invoker;
pub mod mock_transport;
pub mod naming;
mod pending;
pub mod registry;
pub mod runtime;
pub mod support;
pub mod transport;

pub use builder::RuntimeBuilder;
pub use component::Action;
pub use component::Component;
pub use component::Context;
pub use config::Config;
pub use error::Error;
pub use error::Result;
pub use function::Function;
pub use function::SerializableFn;
pub use function::TargetType;
pub use future::EagerFuture;
pub use future::InvocationState;
pub use future::Promise;
pub use mock_transport::MemoryNetwork;
pub use mock_transport::MemoryTransport;
pub use naming::Destination;
pub use naming::Directory;
pub use naming::StaticDirectory;
pub use registry::Registry;
pub use registry::RegistryBuilder;
pub use runtime::Runtime;
pub use runtime::Stats;
pub use transport::Transport;
pub use transport::TransportError;

pub use neoparcel::ActionFault;
pub use neoparcel::GlobalAddress;
pub use neoparcel::LocalityId;
