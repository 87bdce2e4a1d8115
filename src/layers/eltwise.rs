//! Elementwise combination of equally shaped bottoms.

use burn::tensor::backend::Backend;

use super::{Layer, bare_entry, check_arity};
use crate::errors::NetError;
use crate::net::Blob;
use crate::proto::{EltwiseOp, LayerEntry};

#[derive(Debug, Clone)]
pub struct EltwiseLayer {
    entry: LayerEntry,
    operation: EltwiseOp,
}

impl EltwiseLayer {
    pub fn create<B: Backend>(entry: &LayerEntry) -> Result<Box<dyn Layer<B>>, NetError> {
        check_arity(entry, 2, usize::MAX, 1)?;
        Ok(Box::new(Self {
            entry: bare_entry(entry),
            operation: entry.params.eltwise.unwrap_or_default().operation,
        }))
    }
}

impl<B: Backend> Layer<B> for EltwiseLayer {
    fn entry(&self) -> &LayerEntry {
        &self.entry
    }

    fn reshape(&mut self, bottom: &[Blob<B>], top: &mut [Blob<B>]) -> Result<(), NetError> {
        let shape = bottom[0].shape();
        if let Some(other) = bottom.iter().find(|b| b.shape() != shape) {
            return Err(NetError::shape(
                &self.entry.name,
                format!(
                    "bottoms must share a shape: {} vs {}",
                    bottom[0].shape_string(),
                    other.shape_string()
                ),
            ));
        }
        top[0].reshape(shape.to_vec());
        Ok(())
    }

    fn forward(&self, bottom: &[Blob<B>], top: &mut [Blob<B>]) -> Result<(), NetError> {
        let mut result = bottom[0].tensor()?.clone();
        for blob in &bottom[1..] {
            let rhs = blob.tensor()?.clone();
            result = match self.operation {
                EltwiseOp::Sum => result.add(rhs),
                EltwiseOp::Prod => result.mul(rhs),
                EltwiseOp::Max => result.max_pair(rhs),
            };
        }
        top[0].set_tensor(result)
    }
}
