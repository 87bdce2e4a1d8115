//! # instnet
//!
//! A layered inference-net engine: named layers wired together through named
//! blobs, assembled from a declarative description and executed in order on
//! a Burn backend.
//!
//! ## Features
//!
//! - **Declarative descriptions**: nets are described as ordered layer
//!   entries, stored as JSON text or compact bincode.
//! - **Automatic wiring**: fan-out `Split` layers, in-place computation and
//!   phase/level/stage rule filtering are resolved at assembly time.
//! - **Memory-aware execution**: each blob's storage is released after the
//!   last layer that reads it unless the blob is pinned.
//! - **Weight transfer**: trained weights are copied by layer name, after
//!   every matched layer has been validated.
//!
//! ## Example
//!
//! ```
//! use instnet::prelude::*;
//! use burn::backend::NdArray;
//!
//! type Backend = NdArray;
//!
//! let device = <Backend as burn::tensor::backend::Backend>::Device::default();
//!
//! let description = NetDescription::builder("mlp")
//!     .input("data", vec![2, 4])
//!     .inner_product("ip1", "data", "ip1", 8)
//!     .activation("relu1", "ip1", "ip1", Activation::Relu)
//!     .inner_product("ip2", "ip1", "prob", 3)
//!     .softmax("softmax", "prob", "out")
//!     .build();
//!
//! let registry = LayerRegistry::with_builtin();
//! let mut net: Net<Backend> =
//!     Net::new(&description, &registry, &NetConfig::default(), &device).unwrap();
//!
//! net.set_input("data", &[0.5; 8]).unwrap();
//! let outputs = net.forward().unwrap();
//! assert_eq!(outputs[0].shape(), &[2, 3]);
//! ```

pub mod config;
pub mod errors;
pub mod layers;
pub mod net;
pub mod proto;

// Re-exports for convenience
pub use config::NetConfig;
pub use errors::NetError;
pub use layers::{Activation, Layer, LayerRegistry};
pub use net::{Blob, Net};
pub use proto::{NetDescription, NetState, Phase};

/// Backend type for inference on the GPU.
pub type InferenceBackend = burn::backend::Wgpu;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::InferenceBackend;
    pub use crate::config::NetConfig;
    pub use crate::errors::NetError;
    pub use crate::layers::{Activation, Layer, LayerRegistry};
    pub use crate::net::{Blob, Net};
    pub use crate::proto::{LayerEntry, NetDescription, NetState, NetStateRule, Phase};
}
