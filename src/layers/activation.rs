//! Elementwise activation functions and the layer applying them.

use burn::tensor::{Tensor, backend::Backend};
use serde::{Deserialize, Serialize};

use super::{Layer, bare_entry, check_arity};
use crate::errors::NetError;
use crate::net::Blob;
use crate::proto::LayerEntry;

/// Supported activation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Activation {
    /// No activation (identity function).
    #[default]
    None,
    /// Rectified Linear Unit: f(x) = max(0, x)
    Relu,
    /// Sigmoid: f(x) = 1 / (1 + exp(-x))
    Sigmoid,
    /// Hyperbolic tangent: f(x) = tanh(x)
    Tanh,
    /// Softmax normalization (across last dimension)
    Softmax,
    /// Square root: f(x) = sqrt(x) for x > 0, else 0
    Sqrt,
    /// Natural logarithm: f(x) = ln(x + 1) for x > 0, else 0
    Log,
    /// Base-10 logarithm: f(x) = log10(x + 1) for x > 0, else 0
    Log10,
    /// Complement: f(x) = 1 - x
    Inverse,
    /// Gaussian Error Linear Unit: f(x) = x * 0.5 * (1 + erf(x / sqrt(2)))
    Gelu,
}

impl Activation {
    /// Applies the activation function to a tensor.
    pub fn apply<B: Backend, const D: usize>(&self, tensor: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::None => tensor,
            Activation::Relu => burn::tensor::activation::relu(tensor),
            Activation::Sigmoid => burn::tensor::activation::sigmoid(tensor),
            Activation::Tanh => burn::tensor::activation::tanh(tensor),
            Activation::Softmax => burn::tensor::activation::softmax(tensor, D - 1),
            Activation::Sqrt => {
                let zeros = tensor.zeros_like();
                let mask = tensor.clone().greater_elem(0.0);
                zeros.mask_where(mask, tensor.sqrt())
            }
            Activation::Log => {
                let zeros = tensor.zeros_like();
                let mask = tensor.clone().greater_elem(0.0);
                zeros.mask_where(mask, (tensor + 1.0).log())
            }
            Activation::Log10 => {
                let zeros = tensor.zeros_like();
                let mask = tensor.clone().greater_elem(0.0);
                let ln_10 = 10.0_f64.ln() as f32;
                zeros.mask_where(mask, (tensor + 1.0).log() / ln_10)
            }
            Activation::Inverse => tensor.neg() + 1.0,
            Activation::Gelu => burn::tensor::activation::gelu(tensor),
        }
    }
}

/// Applies an [`Activation`] to its single bottom. Commonly run in place.
#[derive(Debug, Clone)]
pub struct ActivationLayer {
    entry: LayerEntry,
    activation: Activation,
}

impl ActivationLayer {
    pub fn create<B: Backend>(entry: &LayerEntry) -> Result<Box<dyn Layer<B>>, NetError> {
        check_arity(entry, 1, 1, 1)?;
        Ok(Box::new(Self {
            entry: bare_entry(entry),
            activation: entry.params.activation.unwrap_or_default(),
        }))
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }
}

impl<B: Backend> Layer<B> for ActivationLayer {
    fn entry(&self) -> &LayerEntry {
        &self.entry
    }

    fn reshape(&mut self, bottom: &[Blob<B>], top: &mut [Blob<B>]) -> Result<(), NetError> {
        top[0].reshape(bottom[0].shape().to_vec());
        Ok(())
    }

    fn forward(&self, bottom: &[Blob<B>], top: &mut [Blob<B>]) -> Result<(), NetError> {
        let input = &bottom[0];
        let inner = input.shape().last().copied().unwrap_or(1).max(1);
        let outer = input.count() / inner;
        // Rank 2 so that softmax normalizes over the last axis only.
        let x: Tensor<B, 2> = input.tensor()?.clone().reshape([outer, inner]);
        let y = self.activation.apply(x).reshape([outer * inner]);
        top[0].set_tensor(y)
    }
}
