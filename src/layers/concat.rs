//! Concatenation along one axis.

use burn::tensor::{Tensor, backend::Backend};

use super::{Layer, bare_entry, check_arity};
use crate::errors::NetError;
use crate::net::Blob;
use crate::proto::LayerEntry;

#[derive(Debug, Clone)]
pub struct ConcatLayer {
    entry: LayerEntry,
    axis: usize,
}

impl ConcatLayer {
    pub fn create<B: Backend>(entry: &LayerEntry) -> Result<Box<dyn Layer<B>>, NetError> {
        check_arity(entry, 1, usize::MAX, 1)?;
        Ok(Box::new(Self {
            entry: bare_entry(entry),
            axis: entry.params.concat.unwrap_or_default().axis,
        }))
    }
}

impl<B: Backend> Layer<B> for ConcatLayer {
    fn entry(&self) -> &LayerEntry {
        &self.entry
    }

    fn reshape(&mut self, bottom: &[Blob<B>], top: &mut [Blob<B>]) -> Result<(), NetError> {
        let first = bottom[0].shape();
        if self.axis >= first.len() {
            return Err(NetError::shape(
                &self.entry.name,
                format!("concat axis {} out of range for shape {}", self.axis, bottom[0].shape_string()),
            ));
        }
        let mut shape = first.to_vec();
        shape[self.axis] = 0;
        for blob in bottom {
            let compatible = blob.shape().len() == first.len()
                && blob
                    .shape()
                    .iter()
                    .zip(first)
                    .enumerate()
                    .all(|(axis, (a, b))| axis == self.axis || a == b);
            if !compatible {
                return Err(NetError::shape(
                    &self.entry.name,
                    format!(
                        "cannot concatenate {} with {} along axis {}",
                        bottom[0].shape_string(),
                        blob.shape_string(),
                        self.axis
                    ),
                ));
            }
            shape[self.axis] += blob.dim(self.axis);
        }
        top[0].reshape(shape);
        Ok(())
    }

    fn forward(&self, bottom: &[Blob<B>], top: &mut [Blob<B>]) -> Result<(), NetError> {
        let outer: usize = bottom[0].shape()[..self.axis].iter().product();
        // Row-major: each bottom contributes one contiguous block per outer index.
        let parts = bottom
            .iter()
            .map(|blob| {
                let block = blob.count_from(self.axis);
                Ok(blob.tensor()?.clone().reshape([outer, block]))
            })
            .collect::<Result<Vec<Tensor<B, 2>>, NetError>>()?;
        let joined = Tensor::cat(parts, 1);
        top[0].set_tensor(joined.reshape([top[0].count()]))
    }
}
