//! Fan-out of one blob to several consumers.

use burn::tensor::backend::Backend;

use super::{Layer, bare_entry};
use crate::errors::NetError;
use crate::net::Blob;
use crate::proto::LayerEntry;

/// Type tag of the fan-out layer inserted by split insertion.
pub const SPLIT_LAYER_TYPE: &str = "Split";

/// Hands its single bottom to every top. Tops share the bottom's storage.
#[derive(Debug, Clone)]
pub struct SplitLayer {
    entry: LayerEntry,
}

impl SplitLayer {
    pub fn create<B: Backend>(entry: &LayerEntry) -> Result<Box<dyn Layer<B>>, NetError> {
        if entry.bottom.len() != 1 || entry.top.is_empty() {
            return Err(NetError::configuration(format!(
                "split layer '{}' needs one bottom and at least one top",
                entry.name
            )));
        }
        Ok(Box::new(Self {
            entry: bare_entry(entry),
        }))
    }
}

impl<B: Backend> Layer<B> for SplitLayer {
    fn entry(&self) -> &LayerEntry {
        &self.entry
    }

    fn reshape(&mut self, bottom: &[Blob<B>], top: &mut [Blob<B>]) -> Result<(), NetError> {
        for blob in top.iter_mut() {
            blob.reshape(bottom[0].shape().to_vec());
        }
        Ok(())
    }

    fn forward(&self, bottom: &[Blob<B>], top: &mut [Blob<B>]) -> Result<(), NetError> {
        let tensor = bottom[0].tensor()?;
        for blob in top.iter_mut() {
            blob.set_tensor(tensor.clone())?;
        }
        Ok(())
    }
}
