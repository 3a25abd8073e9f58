pub mod error;
pub mod protocol;

pub use error::BackendError;
pub use protocol::{DomRequest, DomResponse, NodeDetails, NodeId};
