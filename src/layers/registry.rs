//! Type tag → layer constructor table.

use std::collections::HashMap;
use std::fmt;

use burn::tensor::backend::Backend;

use super::{
    ActivationLayer, ConcatLayer, EltwiseLayer, InnerProductLayer, InputLayer, Layer, ScaleLayer,
    SoftmaxLayer, SplitLayer,
};
use crate::errors::NetError;
use crate::proto::LayerEntry;

/// Signature of a layer constructor.
pub type LayerCreator<B> = fn(&LayerEntry) -> Result<Box<dyn Layer<B>>, NetError>;

/// Append-only table of layer constructors keyed by type tag.
///
/// Build one at startup and pass it to net assembly; there is no global
/// registry.
pub struct LayerRegistry<B: Backend> {
    creators: HashMap<String, LayerCreator<B>>,
}

impl<B: Backend> LayerRegistry<B> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            creators: HashMap::new(),
        }
    }

    /// Creates a registry holding every built-in layer kind.
    pub fn with_builtin() -> Self {
        let builtin: [(&str, LayerCreator<B>); 8] = [
            (super::INPUT_LAYER_TYPE, InputLayer::create),
            ("InnerProduct", InnerProductLayer::create),
            ("Activation", ActivationLayer::create),
            ("Softmax", SoftmaxLayer::create),
            ("Eltwise", EltwiseLayer::create),
            ("Concat", ConcatLayer::create),
            ("Scale", ScaleLayer::create),
            (super::SPLIT_LAYER_TYPE, SplitLayer::create),
        ];
        let mut registry = Self::new();
        for (layer_type, creator) in builtin {
            registry.creators.insert(layer_type.to_string(), creator);
        }
        registry
    }

    /// Registers a constructor. A type tag can only be registered once.
    pub fn register(
        &mut self,
        layer_type: impl Into<String>,
        creator: LayerCreator<B>,
    ) -> Result<(), NetError> {
        let layer_type = layer_type.into();
        if self.creators.contains_key(&layer_type) {
            return Err(NetError::configuration(format!(
                "layer type {layer_type} already registered"
            )));
        }
        self.creators.insert(layer_type, creator);
        Ok(())
    }

    pub fn contains(&self, layer_type: &str) -> bool {
        self.creators.contains_key(layer_type)
    }

    /// Registered type tags, sorted.
    pub fn layer_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.creators.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Instantiates the layer described by `entry`.
    pub fn create(&self, entry: &LayerEntry) -> Result<Box<dyn Layer<B>>, NetError> {
        let creator = self
            .creators
            .get(&entry.layer_type)
            .ok_or_else(|| NetError::UnknownLayerType {
                layer_type: entry.layer_type.clone(),
            })?;
        creator(entry)
    }
}

impl<B: Backend> Default for LayerRegistry<B> {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl<B: Backend> fmt::Debug for LayerRegistry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerRegistry")
            .field("layer_types", &self.layer_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_builtin_types() {
        let registry = LayerRegistry::<TestBackend>::with_builtin();
        assert_eq!(
            registry.layer_types(),
            [
                "Activation",
                "Concat",
                "Eltwise",
                "InnerProduct",
                "Input",
                "Scale",
                "Softmax",
                "Split"
            ]
        );
    }

    #[test]
    fn test_register_is_append_only() {
        let mut registry = LayerRegistry::<TestBackend>::new();
        registry.register("Custom", SplitLayer::create).unwrap();

        let err = registry.register("Custom", SplitLayer::create).unwrap_err();
        assert!(matches!(err, NetError::Configuration { .. }));
        assert!(registry.contains("Custom"));
    }

    #[test]
    fn test_unknown_type() {
        let registry = LayerRegistry::<TestBackend>::with_builtin();
        let err = registry
            .create(&LayerEntry::new("conv1", "Convolution"))
            .unwrap_err();
        assert!(matches!(err, NetError::UnknownLayerType { layer_type } if layer_type == "Convolution"));
    }

    #[test]
    fn test_create_uses_entry_name_and_type() {
        let registry = LayerRegistry::<TestBackend>::with_builtin();
        let entry = LayerEntry::new("fan", "Split")
            .with_bottom(["x"])
            .with_top(["x_0", "x_1"]);

        let layer = registry.create(&entry).unwrap();

        assert_eq!(layer.name(), "fan");
        assert_eq!(layer.type_tag(), "Split");
        assert!(layer.blobs().is_empty());
    }
}
