//! Forward execution and shape propagation.

use burn::tensor::backend::Backend;

use crate::errors::NetError;

use super::blob::Blob;
use super::model::{Net, gather};

impl<B: Backend> Net<B> {
    /// Runs layers `start..=end` in order.
    ///
    /// After each layer, bottoms whose last use is that layer have their
    /// storage released. Pinned blobs are never released.
    pub fn forward_from_to(&mut self, start: usize, end: usize) -> Result<(), NetError> {
        if start > end || end >= self.layers.len() {
            return Err(NetError::ForwardRange {
                start,
                end,
                layer_count: self.layers.len(),
            });
        }

        for layer_id in start..=end {
            log::trace!("Forwarding {}", self.layer_names[layer_id]);
            for &id in &self.bottom_id_vecs[layer_id] {
                if !self.blobs[id].is_allocated() {
                    return Err(NetError::Unallocated {
                        blob: self.blob_names[id].clone(),
                        layer: self.layer_names[layer_id].clone(),
                    });
                }
            }

            let bottom = gather(&self.blobs, &self.bottom_id_vecs[layer_id]);
            let mut top = gather(&self.blobs, &self.top_id_vecs[layer_id]);
            self.layers[layer_id].forward(&bottom, &mut top)?;
            drop(bottom);
            for (&id, blob) in self.top_id_vecs[layer_id].iter().zip(top) {
                self.blobs[id] = blob;
            }

            for &id in &self.bottom_id_vecs[layer_id] {
                if self.lifetimes.is_expired(id, layer_id) && self.blobs[id].is_allocated() {
                    log::trace!("Releasing {}", self.blob_names[id]);
                    self.blobs[id].release();
                }
            }
        }
        Ok(())
    }

    /// Runs every layer from `start` to the last one.
    pub fn forward_from(&mut self, start: usize) -> Result<(), NetError> {
        let end = self.last_layer_id()?;
        self.forward_from_to(start, end)
    }

    /// Runs every layer from the first one through `end`.
    pub fn forward_to(&mut self, end: usize) -> Result<(), NetError> {
        self.forward_from_to(0, end)
    }

    /// Runs the whole net and returns its output blobs.
    pub fn forward(&mut self) -> Result<Vec<&Blob<B>>, NetError> {
        let end = self.last_layer_id()?;
        self.forward_from_to(0, end)?;
        Ok(self.output_blobs())
    }

    /// Re-derives every top shape from the current input shapes, in layer
    /// order. Call after reshaping an input blob.
    pub fn reshape(&mut self) -> Result<(), NetError> {
        for layer_id in 0..self.layers.len() {
            let bottom = gather(&self.blobs, &self.bottom_id_vecs[layer_id]);
            let mut top = gather(&self.blobs, &self.top_id_vecs[layer_id]);
            self.layers[layer_id].reshape(&bottom, &mut top)?;
            drop(bottom);
            for (&id, blob) in self.top_id_vecs[layer_id].iter().zip(top) {
                self.blobs[id] = blob;
            }
        }
        log::debug!(
            "Reshaped net {}; memory required: {:.3} MB",
            self.name,
            self.memory_used_mb()
        );
        Ok(())
    }

    fn last_layer_id(&self) -> Result<usize, NetError> {
        self.layers
            .len()
            .checked_sub(1)
            .ok_or(NetError::ForwardRange {
                start: 0,
                end: 0,
                layer_count: 0,
            })
    }
}
