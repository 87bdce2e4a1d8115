//! Softmax over one axis.

use burn::tensor::{Tensor, backend::Backend};

use super::{Layer, bare_entry, check_arity};
use crate::errors::NetError;
use crate::net::Blob;
use crate::proto::LayerEntry;

#[derive(Debug, Clone)]
pub struct SoftmaxLayer {
    entry: LayerEntry,
    axis: usize,
}

impl SoftmaxLayer {
    pub fn create<B: Backend>(entry: &LayerEntry) -> Result<Box<dyn Layer<B>>, NetError> {
        check_arity(entry, 1, 1, 1)?;
        Ok(Box::new(Self {
            entry: bare_entry(entry),
            axis: entry.params.softmax.unwrap_or_default().axis,
        }))
    }
}

impl<B: Backend> Layer<B> for SoftmaxLayer {
    fn entry(&self) -> &LayerEntry {
        &self.entry
    }

    fn reshape(&mut self, bottom: &[Blob<B>], top: &mut [Blob<B>]) -> Result<(), NetError> {
        if self.axis >= bottom[0].shape().len() {
            return Err(NetError::shape(
                &self.entry.name,
                format!(
                    "softmax axis {} out of range for shape {}",
                    self.axis,
                    bottom[0].shape_string()
                ),
            ));
        }
        top[0].reshape(bottom[0].shape().to_vec());
        Ok(())
    }

    fn forward(&self, bottom: &[Blob<B>], top: &mut [Blob<B>]) -> Result<(), NetError> {
        let input = &bottom[0];
        let outer: usize = input.shape()[..self.axis].iter().product();
        let channels = input.dim(self.axis);
        let inner = input.count_from(self.axis + 1);

        let x: Tensor<B, 3> = input.tensor()?.clone().reshape([outer, channels, inner]);
        let y = burn::tensor::activation::softmax(x, 1);
        top[0].set_tensor(y.reshape([input.count()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{AxisParams, LayerParams};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_softmax_over_channels() {
        let device = <TestBackend as Backend>::Device::default();
        let entry = LayerEntry::new("prob", "Softmax")
            .with_bottom(["x"])
            .with_top(["prob"])
            .with_params(LayerParams {
                softmax: Some(AxisParams { axis: 1 }),
                ..Default::default()
            });
        let mut layer = SoftmaxLayer::create::<TestBackend>(&entry).unwrap();
        // Shape [1, 2, 2]: channel pairs are (0, 1) at position 0 and (2, 3) at position 1.
        let bottom = vec![Blob::from_values(vec![1, 2, 2], &[0.0, 5.0, 0.0, 5.0], &device).unwrap()];
        let mut top = vec![Blob::default()];

        layer.setup(&bottom, &mut top, &device).unwrap();
        layer.forward(&bottom, &mut top).unwrap();

        let out = top[0].to_vec().unwrap();
        assert!((out[0] - 0.5).abs() < 1e-5);
        assert!((out[2] - 0.5).abs() < 1e-5);
        assert!((out[1] + out[3] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_axis_out_of_range() {
        let device = <TestBackend as Backend>::Device::default();
        let entry = LayerEntry::new("prob", "Softmax")
            .with_bottom(["x"])
            .with_top(["prob"]);
        let mut layer = SoftmaxLayer::create::<TestBackend>(&entry).unwrap();
        let mut top = vec![Blob::default()];

        let err = layer
            .setup(&[Blob::new(vec![4])], &mut top, &device)
            .unwrap_err();

        assert!(matches!(err, NetError::ShapeMismatch { .. }));
    }
}
