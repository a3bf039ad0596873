//! `nodes` crate: the `ExecutableNode` trait and the Terraform Cloud node.
//!
//! Every node must implement [`ExecutableNode`]. The engine crate dispatches
//! each input item through this trait object. Outgoing HTTP goes through the
//! [`HttpTransport`] seam so tests can swap in [`mock::MockTransport`].

pub mod error;
pub mod jsonapi;
pub mod mock;
pub mod params;
pub mod terraform;
pub mod traits;
pub mod transport;

pub use error::NodeError;
pub use params::NodeParameters;
pub use traits::{ExecutableNode, ExecutionContext, Item};
pub use transport::{HttpMethod, HttpRequest, HttpTransport, ReqwestTransport, TransportError};
