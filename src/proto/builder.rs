//! Chained construction of a [`NetDescription`].

use super::{
    AxisParams, EltwiseOp, EltwiseParams, InnerProductParams, InputParams, LayerEntry,
    LayerParams, NetDescription, ScaleParams,
};
use crate::layers::Activation;

/// Builder for a [`NetDescription`].
///
/// Each method appends one layer; layers keep the order they were added in.
///
/// # Example
///
/// ```
/// use instnet::proto::NetDescription;
/// use instnet::layers::Activation;
///
/// let desc = NetDescription::builder("mlp")
///     .input("data", vec![1, 4])
///     .inner_product("ip1", "data", "ip1", 8)
///     .activation("relu1", "ip1", "ip1", Activation::Relu)
///     .inner_product("ip2", "ip1", "out", 1)
///     .build();
///
/// assert_eq!(desc.layers.len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct NetDescriptionBuilder {
    description: NetDescription,
}

impl NetDescriptionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            description: NetDescription::new(name),
        }
    }

    /// Appends an arbitrary layer entry.
    pub fn layer(mut self, entry: LayerEntry) -> Self {
        self.description.layers.push(entry);
        self
    }

    /// Adds an `Input` layer producing one top of the given shape. The layer
    /// and its top share the name.
    pub fn input(self, name: &str, shape: Vec<usize>) -> Self {
        let params = LayerParams {
            input: Some(InputParams { shape: vec![shape] }),
            ..Default::default()
        };
        self.layer(
            LayerEntry::new(name, "Input")
                .with_top([name])
                .with_params(params),
        )
    }

    /// Adds a fully connected layer.
    pub fn inner_product(self, name: &str, bottom: &str, top: &str, num_output: usize) -> Self {
        let params = LayerParams {
            inner_product: Some(InnerProductParams {
                num_output,
                bias_term: true,
            }),
            ..Default::default()
        };
        self.layer(
            LayerEntry::new(name, "InnerProduct")
                .with_bottom([bottom])
                .with_top([top])
                .with_params(params),
        )
    }

    /// Adds an elementwise activation. Pass the same name as bottom and top
    /// to run it in place.
    pub fn activation(self, name: &str, bottom: &str, top: &str, activation: Activation) -> Self {
        let params = LayerParams {
            activation: Some(activation),
            ..Default::default()
        };
        self.layer(
            LayerEntry::new(name, "Activation")
                .with_bottom([bottom])
                .with_top([top])
                .with_params(params),
        )
    }

    /// Adds a softmax over axis 1.
    pub fn softmax(self, name: &str, bottom: &str, top: &str) -> Self {
        let params = LayerParams {
            softmax: Some(AxisParams::default()),
            ..Default::default()
        };
        self.layer(
            LayerEntry::new(name, "Softmax")
                .with_bottom([bottom])
                .with_top([top])
                .with_params(params),
        )
    }

    /// Adds an elementwise combination of several bottoms.
    pub fn eltwise(self, name: &str, bottoms: &[&str], top: &str, operation: EltwiseOp) -> Self {
        let params = LayerParams {
            eltwise: Some(EltwiseParams { operation }),
            ..Default::default()
        };
        self.layer(
            LayerEntry::new(name, "Eltwise")
                .with_bottom(bottoms.iter().copied())
                .with_top([top])
                .with_params(params),
        )
    }

    /// Adds a concatenation along axis 1.
    pub fn concat(self, name: &str, bottoms: &[&str], top: &str) -> Self {
        let params = LayerParams {
            concat: Some(AxisParams::default()),
            ..Default::default()
        };
        self.layer(
            LayerEntry::new(name, "Concat")
                .with_bottom(bottoms.iter().copied())
                .with_top([top])
                .with_params(params),
        )
    }

    /// Adds a learnable per-channel scale.
    pub fn scale(self, name: &str, bottom: &str, top: &str, bias_term: bool) -> Self {
        let params = LayerParams {
            scale: Some(ScaleParams { bias_term }),
            ..Default::default()
        };
        self.layer(
            LayerEntry::new(name, "Scale")
                .with_bottom([bottom])
                .with_top([top])
                .with_params(params),
        )
    }

    /// Finishes the description.
    pub fn build(self) -> NetDescription {
        self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_preserves_order_and_wiring() {
        let desc = NetDescription::builder("net")
            .input("data", vec![2, 4])
            .inner_product("ip", "data", "ip", 3)
            .softmax("prob", "ip", "prob")
            .build();

        let names: Vec<&str> = desc.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["data", "ip", "prob"]);
        assert_eq!(desc.layers[1].bottom, ["data"]);
        assert_eq!(desc.layers[1].top, ["ip"]);
        assert_eq!(
            desc.layers[1].params.inner_product.as_ref().map(|p| p.num_output),
            Some(3)
        );
        assert_eq!(
            desc.layers[0].params.input.as_ref().map(|p| p.shape.clone()),
            Some(vec![vec![2, 4]])
        );
    }

    #[test]
    fn test_builder_multi_bottom_layers() {
        let desc = NetDescription::builder("net")
            .input("data", vec![1, 2])
            .eltwise("sum", &["a", "b"], "s", EltwiseOp::Sum)
            .concat("cat", &["a", "b", "c"], "c2")
            .build();

        assert_eq!(desc.layers[1].bottom, ["a", "b"]);
        assert_eq!(desc.layers[2].bottom.len(), 3);
        assert_eq!(desc.layers[2].layer_type, "Concat");
    }
}
