//! Layer contract and built-in layer kinds.
//!
//! A layer never owns the activation blobs it reads and writes; the net hands
//! it cloned views (tensor handles are reference counted) and stores whatever
//! it writes into `top` back into its own blob list. Learnable blobs are
//! owned by the layer itself.

pub mod activation;
mod concat;
mod eltwise;
mod inner_product;
mod input;
mod registry;
mod scale;
mod softmax;
mod split;

use std::fmt;

use burn::tensor::backend::Backend;

use crate::errors::NetError;
use crate::net::Blob;
use crate::proto::LayerEntry;

pub use activation::{Activation, ActivationLayer};
pub use concat::ConcatLayer;
pub use eltwise::EltwiseLayer;
pub use inner_product::InnerProductLayer;
pub use input::{INPUT_LAYER_TYPE, InputLayer};
pub use registry::{LayerCreator, LayerRegistry};
pub use scale::ScaleLayer;
pub use softmax::SoftmaxLayer;
pub use split::{SPLIT_LAYER_TYPE, SplitLayer};

/// The behaviour every computation node provides.
pub trait Layer<B: Backend>: fmt::Debug {
    /// The description entry this layer was created from.
    fn entry(&self) -> &LayerEntry;

    fn name(&self) -> &str {
        &self.entry().name
    }

    fn type_tag(&self) -> &str {
        &self.entry().layer_type
    }

    /// One-time setup once the layer is wired: validates bottom shapes,
    /// allocates learnable blobs and shapes the tops.
    fn setup(
        &mut self,
        bottom: &[Blob<B>],
        top: &mut [Blob<B>],
        _device: &B::Device,
    ) -> Result<(), NetError> {
        self.reshape(bottom, top)
    }

    /// Derives top shapes from the current bottom shapes.
    fn reshape(&mut self, bottom: &[Blob<B>], top: &mut [Blob<B>]) -> Result<(), NetError>;

    /// Computes the tops from the bottoms.
    fn forward(&self, bottom: &[Blob<B>], top: &mut [Blob<B>]) -> Result<(), NetError>;

    /// Learnable blobs, in a fixed order.
    fn blobs(&self) -> &[Blob<B>] {
        &[]
    }

    fn blobs_mut(&mut self) -> &mut [Blob<B>] {
        &mut []
    }

    /// Serializes the layer, learnable blobs included.
    fn to_entry(&self) -> Result<LayerEntry, NetError> {
        let mut entry = self.entry().clone();
        entry.blobs = self
            .blobs()
            .iter()
            .map(Blob::to_proto)
            .collect::<Result<_, _>>()?;
        Ok(entry)
    }
}

/// Checks the number of bottoms and tops declared by an entry.
pub(crate) fn check_arity(
    entry: &LayerEntry,
    min_bottom: usize,
    max_bottom: usize,
    top: usize,
) -> Result<(), NetError> {
    let bottoms = entry.bottom.len();
    if bottoms < min_bottom || bottoms > max_bottom {
        return Err(NetError::configuration(format!(
            "layer '{}' of type {} takes {}..={} bottoms, got {}",
            entry.name, entry.layer_type, min_bottom, max_bottom, bottoms
        )));
    }
    if entry.top.len() != top {
        return Err(NetError::configuration(format!(
            "layer '{}' of type {} produces {} top(s), got {}",
            entry.name,
            entry.layer_type,
            top,
            entry.top.len()
        )));
    }
    Ok(())
}

/// Strips the serialized weights from an entry; the layer keeps them as blobs.
pub(crate) fn bare_entry(entry: &LayerEntry) -> LayerEntry {
    LayerEntry {
        blobs: Vec::new(),
        ..entry.clone()
    }
}
