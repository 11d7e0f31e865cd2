//! Components shipped with the runtime.

pub mod distributed_set;
pub mod local_set;

pub use distributed_set::DistributedSet;
pub use distributed_set::DistributedSetStub;
pub use local_set::LocalSet;
pub use local_set::LocalSetStub;
