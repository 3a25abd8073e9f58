pub mod backend_adapter;
pub mod chain;
pub mod resolver;

pub use backend_adapter::BackendDom;
pub use chain::SelectorChain;
pub use resolver::{DomQuery, Resolution, resolve};
