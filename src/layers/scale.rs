//! Learnable per-channel scale and shift.

use burn::tensor::{Tensor, backend::Backend};

use super::{Layer, bare_entry, check_arity};
use crate::errors::NetError;
use crate::net::Blob;
use crate::proto::{BlobProto, LayerEntry};

/// Multiplies every channel (axis 1) of its bottom by a learnable factor and
/// optionally adds a learnable bias. Blobs: scale `[C]`, then bias `[C]`.
#[derive(Debug, Clone)]
pub struct ScaleLayer<B: Backend> {
    entry: LayerEntry,
    initial: Vec<BlobProto>,
    bias_term: bool,
    blobs: Vec<Blob<B>>,
}

impl<B: Backend> ScaleLayer<B> {
    pub fn create(entry: &LayerEntry) -> Result<Box<dyn Layer<B>>, NetError> {
        check_arity(entry, 1, 1, 1)?;
        let bias_term = entry.params.scale.is_some_and(|p| p.bias_term);
        let expected = if bias_term { 2 } else { 1 };
        if !entry.blobs.is_empty() && entry.blobs.len() != expected {
            return Err(NetError::configuration(format!(
                "layer '{}' expects {} blobs, description has {}",
                entry.name,
                expected,
                entry.blobs.len()
            )));
        }
        Ok(Box::new(Self {
            entry: bare_entry(entry),
            initial: entry.blobs.clone(),
            bias_term,
            blobs: Vec::new(),
        }))
    }
}

impl<B: Backend> Layer<B> for ScaleLayer<B> {
    fn entry(&self) -> &LayerEntry {
        &self.entry
    }

    fn setup(
        &mut self,
        bottom: &[Blob<B>],
        top: &mut [Blob<B>],
        device: &B::Device,
    ) -> Result<(), NetError> {
        let channels = bottom[0].dim(1);
        let mut blobs = vec![Blob::new(vec![channels])];
        if self.bias_term {
            blobs.push(Blob::new(vec![channels]));
        }

        if self.initial.is_empty() {
            blobs[0].set_tensor(Tensor::ones([channels], device))?;
            if let Some(bias) = blobs.get_mut(1) {
                bias.set_tensor(Tensor::zeros([channels], device))?;
            }
        } else {
            for (blob, proto) in blobs.iter_mut().zip(&self.initial) {
                if !blob.shape_equals(proto) {
                    return Err(NetError::shape(
                        &self.entry.name,
                        format!("given blob shape {:?}, expected [{}]", proto.shape, channels),
                    ));
                }
                blob.from_proto(proto, false, device)?;
            }
            self.initial.clear();
        }

        self.blobs = blobs;
        self.reshape(bottom, top)
    }

    fn reshape(&mut self, bottom: &[Blob<B>], top: &mut [Blob<B>]) -> Result<(), NetError> {
        if bottom[0].dim(1) != self.blobs[0].count() {
            return Err(NetError::shape(
                &self.entry.name,
                format!(
                    "bottom {} does not have {} channels",
                    bottom[0].shape_string(),
                    self.blobs[0].count()
                ),
            ));
        }
        top[0].reshape(bottom[0].shape().to_vec());
        Ok(())
    }

    fn forward(&self, bottom: &[Blob<B>], top: &mut [Blob<B>]) -> Result<(), NetError> {
        let input = &bottom[0];
        let outer = input.dim(0);
        let channels = input.dim(1);
        let inner = input.count_from(2);

        let x: Tensor<B, 3> = input.tensor()?.clone().reshape([outer, channels, inner]);
        let scale: Tensor<B, 3> = self.blobs[0].tensor()?.clone().reshape([1, channels, 1]);
        let mut y = x.mul(scale);
        if let Some(bias) = self.blobs.get(1) {
            y = y.add(bias.tensor()?.clone().reshape([1, channels, 1]));
        }
        top[0].set_tensor(y.reshape([input.count()]))
    }

    fn blobs(&self) -> &[Blob<B>] {
        &self.blobs
    }

    fn blobs_mut(&mut self) -> &mut [Blob<B>] {
        &mut self.blobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{LayerParams, ScaleParams};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn entry(bias_term: bool) -> LayerEntry {
        LayerEntry::new("scale", "Scale")
            .with_bottom(["x"])
            .with_top(["x"])
            .with_params(LayerParams {
                scale: Some(ScaleParams { bias_term }),
                ..Default::default()
            })
    }

    #[test]
    fn test_default_init_is_identity() {
        let device = <TestBackend as Backend>::Device::default();
        let mut layer = ScaleLayer::<TestBackend>::create(&entry(true)).unwrap();
        let bottom = vec![Blob::from_values(vec![1, 2, 2], &[1.0, 2.0, 3.0, 4.0], &device).unwrap()];
        let mut top = vec![Blob::default()];

        layer.setup(&bottom, &mut top, &device).unwrap();
        layer.forward(&bottom, &mut top).unwrap();

        assert_eq!(layer.blobs().len(), 2);
        assert_eq!(top[0].to_vec().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_per_channel_scale_and_bias() {
        let device = <TestBackend as Backend>::Device::default();
        let entry = entry(true).with_blobs(vec![
            BlobProto::new(vec![2], vec![2.0, -1.0]),
            BlobProto::new(vec![2], vec![0.5, 1.0]),
        ]);
        let mut layer = ScaleLayer::<TestBackend>::create(&entry).unwrap();
        let bottom = vec![Blob::from_values(vec![1, 2, 2], &[1.0, 2.0, 3.0, 4.0], &device).unwrap()];
        let mut top = vec![Blob::default()];

        layer.setup(&bottom, &mut top, &device).unwrap();
        layer.forward(&bottom, &mut top).unwrap();

        assert_eq!(top[0].to_vec().unwrap(), vec![2.5, 4.5, -2.0, -3.0]);
    }

    #[test]
    fn test_blob_count_checked_at_creation() {
        let entry = entry(true).with_blobs(vec![BlobProto::new(vec![2], vec![1.0, 1.0])]);
        assert!(ScaleLayer::<TestBackend>::create(&entry).is_err());
    }
}
