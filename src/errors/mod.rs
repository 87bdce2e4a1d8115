//! Error types for net assembly, execution and weight loading.

mod net_error;

pub use net_error::NetError;
