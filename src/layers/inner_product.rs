//! Fully connected layer.

use burn::tensor::{Distribution, Tensor, backend::Backend};

use super::{Layer, bare_entry, check_arity};
use crate::errors::NetError;
use crate::net::Blob;
use crate::proto::{BlobProto, LayerEntry};

/// A fully connected layer: `top = bottom · weightᵀ + bias`.
///
/// The bottom is viewed as `[N, K]` where `N` is its first axis and `K` the
/// product of the remaining ones. Learnable blobs are the weight
/// `[num_output, K]` followed by the optional bias `[num_output]`.
#[derive(Debug, Clone)]
pub struct InnerProductLayer<B: Backend> {
    entry: LayerEntry,
    /// Weights given by the description, consumed at setup.
    initial: Vec<BlobProto>,
    num_output: usize,
    bias_term: bool,
    blobs: Vec<Blob<B>>,
}

impl<B: Backend> InnerProductLayer<B> {
    pub fn create(entry: &LayerEntry) -> Result<Box<dyn Layer<B>>, NetError> {
        check_arity(entry, 1, 1, 1)?;
        let params = entry.params.inner_product.as_ref().ok_or_else(|| {
            NetError::configuration(format!(
                "layer '{}' is missing its inner_product parameters",
                entry.name
            ))
        })?;
        if params.num_output == 0 {
            return Err(NetError::configuration(format!(
                "layer '{}' needs num_output > 0",
                entry.name
            )));
        }
        Ok(Box::new(Self {
            entry: bare_entry(entry),
            initial: entry.blobs.clone(),
            num_output: params.num_output,
            bias_term: params.bias_term,
            blobs: Vec::new(),
        }))
    }

    fn expected_blob_count(&self) -> usize {
        if self.bias_term { 2 } else { 1 }
    }

    fn fan_in(&self, bottom: &Blob<B>) -> usize {
        bottom.count_from(1)
    }
}

impl<B: Backend> Layer<B> for InnerProductLayer<B> {
    fn entry(&self) -> &LayerEntry {
        &self.entry
    }

    fn setup(
        &mut self,
        bottom: &[Blob<B>],
        top: &mut [Blob<B>],
        device: &B::Device,
    ) -> Result<(), NetError> {
        let fan_in = self.fan_in(&bottom[0]);
        let mut weight = Blob::new(vec![self.num_output, fan_in]);
        let mut bias = Blob::new(vec![self.num_output]);

        if self.initial.is_empty() {
            let bound = 1.0 / (fan_in.max(1) as f64).sqrt();
            weight.set_tensor(Tensor::random(
                [weight.count()],
                Distribution::Uniform(-bound, bound),
                device,
            ))?;
            bias.set_tensor(Tensor::zeros([self.num_output], device))?;
        } else {
            if self.initial.len() != self.expected_blob_count() {
                return Err(NetError::configuration(format!(
                    "layer '{}' expects {} blobs, description has {}",
                    self.entry.name,
                    self.expected_blob_count(),
                    self.initial.len()
                )));
            }
            for (blob, proto) in [&mut weight, &mut bias].into_iter().zip(&self.initial) {
                if !blob.shape_equals(proto) {
                    return Err(NetError::shape(
                        &self.entry.name,
                        format!(
                            "given blob shape {:?}, expected {:?}",
                            proto.shape,
                            blob.shape()
                        ),
                    ));
                }
                blob.from_proto(proto, false, device)?;
            }
            self.initial.clear();
        }

        self.blobs = vec![weight];
        if self.bias_term {
            self.blobs.push(bias);
        }
        self.reshape(bottom, top)
    }

    fn reshape(&mut self, bottom: &[Blob<B>], top: &mut [Blob<B>]) -> Result<(), NetError> {
        let fan_in = self.fan_in(&bottom[0]);
        if self.blobs[0].dim(1) != fan_in {
            return Err(NetError::shape(
                &self.entry.name,
                format!(
                    "input size {} incompatible with weight shape {}",
                    fan_in,
                    self.blobs[0].shape_string()
                ),
            ));
        }
        top[0].reshape(vec![bottom[0].dim(0), self.num_output]);
        Ok(())
    }

    fn forward(&self, bottom: &[Blob<B>], top: &mut [Blob<B>]) -> Result<(), NetError> {
        let batch = bottom[0].dim(0);
        let fan_in = self.fan_in(&bottom[0]);

        let x: Tensor<B, 2> = bottom[0].tensor()?.clone().reshape([batch, fan_in]);
        let weight: Tensor<B, 2> = self.blobs[0]
            .tensor()?
            .clone()
            .reshape([self.num_output, fan_in]);
        let mut y = x.matmul(weight.transpose());
        if let Some(bias) = self.blobs.get(1) {
            y = y.add(bias.tensor()?.clone().reshape([1, self.num_output]));
        }
        top[0].set_tensor(y.reshape([batch * self.num_output]))
    }

    fn blobs(&self) -> &[Blob<B>] {
        &self.blobs
    }

    fn blobs_mut(&mut self) -> &mut [Blob<B>] {
        &mut self.blobs
    }
}
