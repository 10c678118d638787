//! Device-abstraction boundary for the opal frame graph. The graph never talks to a concrete
//! graphics API; it records its work against the [`DeviceContext`] and [`CommandWriter`] traits
//! defined here, and the application supplies a backend that implements them.

mod error;
pub use error::*;

mod types;
pub use types::*;

mod device;
pub use device::*;
