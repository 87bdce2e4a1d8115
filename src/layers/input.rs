//! The input provider: the first layer of every net.

use burn::tensor::backend::Backend;

use super::Layer;
use crate::errors::NetError;
use crate::net::Blob;
use crate::proto::LayerEntry;

/// Type tag of the layer that seeds the net's external inputs.
pub const INPUT_LAYER_TYPE: &str = "Input";

/// Declares the net's external input blobs and their shapes. The caller
/// fills them before each forward pass.
#[derive(Debug, Clone)]
pub struct InputLayer {
    entry: LayerEntry,
    shapes: Vec<Vec<usize>>,
}

impl InputLayer {
    pub fn create<B: Backend>(entry: &LayerEntry) -> Result<Box<dyn Layer<B>>, NetError> {
        if !entry.bottom.is_empty() {
            return Err(NetError::configuration(format!(
                "input layer '{}' takes no bottoms",
                entry.name
            )));
        }
        let shapes = entry
            .params
            .input
            .as_ref()
            .map(|p| p.shape.clone())
            .unwrap_or_default();
        if shapes.len() != entry.top.len() {
            return Err(NetError::configuration(format!(
                "input layer '{}' declares {} tops but {} shapes",
                entry.name,
                entry.top.len(),
                shapes.len()
            )));
        }
        Ok(Box::new(Self {
            entry: entry.clone(),
            shapes,
        }))
    }
}

impl<B: Backend> Layer<B> for InputLayer {
    fn entry(&self) -> &LayerEntry {
        &self.entry
    }

    fn setup(
        &mut self,
        _bottom: &[Blob<B>],
        top: &mut [Blob<B>],
        _device: &B::Device,
    ) -> Result<(), NetError> {
        for (blob, shape) in top.iter_mut().zip(&self.shapes) {
            blob.reshape(shape.clone());
        }
        Ok(())
    }

    // Input shapes are whatever the caller last gave the tops.
    fn reshape(&mut self, _bottom: &[Blob<B>], _top: &mut [Blob<B>]) -> Result<(), NetError> {
        Ok(())
    }

    fn forward(&self, _bottom: &[Blob<B>], _top: &mut [Blob<B>]) -> Result<(), NetError> {
        Ok(())
    }
}
