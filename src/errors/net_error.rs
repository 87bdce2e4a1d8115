//! Net-related error types.

use thiserror::Error;

/// Errors that can occur while assembling, running or loading a net.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("Invalid net configuration: {message}")]
    Configuration { message: String },

    #[error("Unknown bottom blob '{blob}' (layer '{layer}', bottom index {index})")]
    UnknownBottom {
        blob: String,
        layer: String,
        index: usize,
    },

    #[error("Top blob '{blob}' produced by multiple sources (second producer: layer '{layer}')")]
    DuplicateProducer { blob: String, layer: String },

    #[error("The first layer must be of type '{expected}', found {found:?}")]
    MissingInputLayer {
        expected: &'static str,
        found: Option<String>,
    },

    #[error("Unknown layer type: {layer_type}")]
    UnknownLayerType { layer_type: String },

    #[error("Invalid forward range [{start}, {end}] for a net of {layer_count} layers")]
    ForwardRange {
        start: usize,
        end: usize,
        layer_count: usize,
    },

    #[error("Incompatible number of blobs for layer '{layer}': source has {source_count}, target has {target_count}")]
    WeightCountMismatch {
        layer: String,
        source_count: usize,
        target_count: usize,
    },

    #[error(
        "Cannot copy param {index} weights from layer '{layer}'; shape mismatch. \
         Source param shape is {source_shape}; target param shape is {target_shape}. \
         To learn this layer's parameters from scratch rather than copying from a saved net, rename the layer."
    )]
    WeightShapeMismatch {
        layer: String,
        index: usize,
        source_shape: String,
        target_shape: String,
    },

    #[error("Shape mismatch in layer '{layer}': {message}")]
    ShapeMismatch { layer: String, message: String },

    #[error("Blob '{blob}' has no storage when layer '{layer}' needs it")]
    Unallocated { blob: String, layer: String },

    #[error("Unknown blob name: {name}")]
    UnknownBlob { name: String },

    #[error("Tensor data error: {message}")]
    Tensor { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Binary serialization error: {0}")]
    Binary(#[from] Box<bincode::ErrorKind>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn shape(layer: &str, message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            layer: layer.to_string(),
            message: message.into(),
        }
    }
}
