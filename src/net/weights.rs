//! Copying trained weights from a serialized net.

use std::path::Path;

use burn::tensor::backend::Backend;

use crate::errors::NetError;
use crate::proto::{LayerEntry, NetDescription};

use super::blob::shape_string;
use super::model::Net;

impl<B: Backend> Net<B> {
    /// Copies learnable blobs from every source layer whose name matches a
    /// layer of this net. Unmatched source layers are ignored.
    ///
    /// All matches are validated before anything is copied, so a mismatch
    /// leaves every layer untouched.
    pub fn copy_trained_layers_from(&mut self, source: &NetDescription) -> Result<(), NetError> {
        let mut matched: Vec<(usize, &LayerEntry)> = Vec::new();
        for source_layer in &source.layers {
            let Some(&target_id) = self.layer_names_index.get(&source_layer.name) else {
                log::debug!("Ignoring source layer {}", source_layer.name);
                continue;
            };
            let target_blobs = self.layers[target_id].blobs();
            if target_blobs.len() != source_layer.blobs.len() {
                return Err(NetError::WeightCountMismatch {
                    layer: source_layer.name.clone(),
                    source_count: source_layer.blobs.len(),
                    target_count: target_blobs.len(),
                });
            }
            for (index, (target, proto)) in target_blobs.iter().zip(&source_layer.blobs).enumerate() {
                if !target.shape_equals(proto) {
                    return Err(NetError::WeightShapeMismatch {
                        layer: source_layer.name.clone(),
                        index,
                        source_shape: shape_string(&proto.shape),
                        target_shape: target.shape_string(),
                    });
                }
                if proto.data.len() != proto.count() {
                    return Err(NetError::Tensor {
                        message: format!(
                            "param {} of layer '{}' holds {} values for shape {}",
                            index,
                            source_layer.name,
                            proto.data.len(),
                            shape_string(&proto.shape)
                        ),
                    });
                }
            }
            matched.push((target_id, source_layer));
        }

        let device = self.device.clone();
        for (target_id, source_layer) in &matched {
            log::debug!("Copying source layer {}", source_layer.name);
            let target_blobs = self.layers[*target_id].blobs_mut();
            for (blob, proto) in target_blobs.iter_mut().zip(&source_layer.blobs) {
                blob.from_proto(proto, false, &device)?;
            }
        }
        log::info!(
            "Copied trained weights of {} layer(s) from net '{}'",
            matched.len(),
            source.name
        );
        Ok(())
    }

    /// Reads a serialized net (text or binary, by extension) and copies its weights.
    pub fn copy_trained_layers_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), NetError> {
        let source = NetDescription::read_from_file(path)?;
        self.copy_trained_layers_from(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetConfig;
    use crate::layers::LayerRegistry;
    use crate::proto::{BlobProto, NetDescriptionBuilder};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn two_layer_net() -> Net<TestBackend> {
        let description = NetDescriptionBuilder::new("weights")
            .input("data", vec![1, 2])
            .inner_product("fc1", "data", "hidden", 2)
            .inner_product("fc2", "hidden", "out", 1)
            .build();
        let device = Default::default();
        Net::new(
            &description,
            &LayerRegistry::with_builtin(),
            &NetConfig::default(),
            &device,
        )
        .unwrap()
    }

    fn param_values(net: &Net<TestBackend>) -> Vec<Vec<f32>> {
        net.params().map(|(_, blob)| blob.to_vec().unwrap()).collect()
    }

    #[test]
    fn test_count_mismatch_leaves_net_untouched() {
        let mut net = two_layer_net();
        let before = param_values(&net);

        let source = NetDescription::builder("source")
            .layer(
                LayerEntry::new("fc1", "InnerProduct").with_blobs(vec![
                    BlobProto::new(vec![2, 2], vec![9.0; 4]),
                    BlobProto::new(vec![2], vec![9.0; 2]),
                ]),
            )
            .layer(
                LayerEntry::new("fc2", "InnerProduct")
                    .with_blobs(vec![BlobProto::new(vec![1, 2], vec![9.0; 2])]),
            )
            .build();

        let err = net.copy_trained_layers_from(&source).unwrap_err();
        assert!(matches!(
            err,
            NetError::WeightCountMismatch {
                source_count: 1,
                target_count: 2,
                ..
            }
        ));
        assert_eq!(param_values(&net), before);
    }

    #[test]
    fn test_shape_mismatch_reports_both_shapes() {
        let mut net = two_layer_net();
        let source = NetDescription::builder("source")
            .layer(LayerEntry::new("fc2", "InnerProduct").with_blobs(vec![
                BlobProto::new(vec![2, 2], vec![0.0; 4]),
                BlobProto::new(vec![1], vec![0.0]),
            ]))
            .build();

        match net.copy_trained_layers_from(&source).unwrap_err() {
            NetError::WeightShapeMismatch {
                layer,
                index,
                source_shape,
                target_shape,
            } => {
                assert_eq!(layer, "fc2");
                assert_eq!(index, 0);
                assert_eq!(source_shape, "2 2 (4)");
                assert_eq!(target_shape, "1 2 (2)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_source_layers_are_ignored() {
        let mut net = two_layer_net();
        let source = NetDescription::builder("source")
            .layer(LayerEntry::new("fc2", "InnerProduct").with_blobs(vec![
                BlobProto::new(vec![1, 2], vec![0.5, -0.5]),
                BlobProto::new(vec![1], vec![2.0]),
            ]))
            .layer(LayerEntry::new("conv9", "Convolution"))
            .build();

        net.copy_trained_layers_from(&source).unwrap();
        let fc2 = net.layer_by_name("fc2").unwrap();
        assert_eq!(fc2.blobs()[0].to_vec().unwrap(), vec![0.5, -0.5]);
        assert_eq!(fc2.blobs()[1].to_vec().unwrap(), vec![2.0]);
    }
}
