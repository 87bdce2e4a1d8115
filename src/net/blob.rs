//! Blob - a shaped tensor buffer.
//!
//! Storage is a flat `f32` tensor so any rank can be represented; the shape
//! is tracked separately and survives [`Blob::release`].

use burn::tensor::{Tensor, TensorData, backend::Backend};

use crate::errors::NetError;
use crate::proto::BlobProto;

/// Shape of a blob, outermost axis first.
pub type Shape = Vec<usize>;

/// A shaped buffer whose storage may be released and reallocated.
#[derive(Clone, Debug)]
pub struct Blob<B: Backend> {
    shape: Shape,
    data: Option<Tensor<B, 1>>,
}

impl<B: Backend> Default for Blob<B> {
    fn default() -> Self {
        Self {
            shape: Vec::new(),
            data: None,
        }
    }
}

impl<B: Backend> Blob<B> {
    /// Creates an unallocated blob with the given shape.
    pub fn new(shape: Shape) -> Self {
        Self { shape, data: None }
    }

    /// Creates an allocated blob from raw values.
    pub fn from_values(shape: Shape, values: &[f32], device: &B::Device) -> Result<Self, NetError> {
        let mut blob = Self::new(shape);
        blob.set_data(values, device)?;
        Ok(blob)
    }

    /// Creates a zero-filled blob.
    pub fn zeros(shape: Shape, device: &B::Device) -> Self {
        let count = shape.iter().product();
        Self {
            shape,
            data: Some(Tensor::zeros([count], device)),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of elements implied by the shape.
    pub fn count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Product of the dimensions from `start_axis` on.
    pub fn count_from(&self, start_axis: usize) -> usize {
        self.shape.iter().skip(start_axis).product()
    }

    /// Size of one axis, or 1 past the last axis.
    pub fn dim(&self, axis: usize) -> usize {
        self.shape.get(axis).copied().unwrap_or(1)
    }

    /// Changes the shape. Storage whose element count no longer matches is dropped.
    pub fn reshape(&mut self, shape: Shape) {
        let count: usize = shape.iter().product();
        if count != self.count() {
            self.data = None;
        }
        self.shape = shape;
    }

    pub fn shape_equals(&self, proto: &BlobProto) -> bool {
        self.shape == proto.shape
    }

    /// Shape formatted for diagnostics, e.g. `2 3 4 (24)`.
    pub fn shape_string(&self) -> String {
        shape_string(&self.shape)
    }

    pub fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    /// Frees the storage. The shape stays valid.
    pub fn release(&mut self) {
        self.data = None;
    }

    /// Returns the storage.
    pub fn tensor(&self) -> Result<&Tensor<B, 1>, NetError> {
        self.data.as_ref().ok_or_else(|| NetError::Tensor {
            message: format!("blob of shape {} has no storage", self.shape_string()),
        })
    }

    /// Replaces the storage. The tensor must hold exactly `count()` elements.
    pub fn set_tensor(&mut self, tensor: Tensor<B, 1>) -> Result<(), NetError> {
        let [len] = tensor.dims();
        if len != self.count() {
            return Err(NetError::Tensor {
                message: format!(
                    "tensor of {} elements does not fit blob of shape {}",
                    len,
                    self.shape_string()
                ),
            });
        }
        self.data = Some(tensor);
        Ok(())
    }

    /// Copies raw values into freshly allocated storage.
    pub fn set_data(&mut self, values: &[f32], device: &B::Device) -> Result<(), NetError> {
        let data = TensorData::new(values.to_vec(), [values.len()]);
        self.set_tensor(Tensor::from_data(data, device))
    }

    /// Reads the storage back as raw values.
    pub fn to_vec(&self) -> Result<Vec<f32>, NetError> {
        self.tensor()?
            .to_data()
            .to_vec::<f32>()
            .map_err(|e| NetError::Tensor {
                message: format!("{e:?}"),
            })
    }

    /// Loads shape and data from the serialized form. With `reshape` unset
    /// the element counts must already agree and the shape is left as is.
    pub fn from_proto(
        &mut self,
        proto: &BlobProto,
        reshape: bool,
        device: &B::Device,
    ) -> Result<(), NetError> {
        if reshape {
            self.reshape(proto.shape.clone());
        } else if proto.count() != self.count() {
            return Err(NetError::Tensor {
                message: format!(
                    "cannot load blob of shape {} into shape {} without reshaping",
                    shape_string(&proto.shape),
                    self.shape_string()
                ),
            });
        }
        if proto.data.len() != self.count() {
            return Err(NetError::Tensor {
                message: format!(
                    "serialized blob holds {} values but its shape {} needs {}",
                    proto.data.len(),
                    shape_string(&proto.shape),
                    self.count()
                ),
            });
        }
        self.set_data(&proto.data, device)
    }

    /// Serializes shape and data.
    pub fn to_proto(&self) -> Result<BlobProto, NetError> {
        Ok(BlobProto {
            shape: self.shape.clone(),
            data: self.to_vec()?,
        })
    }
}

pub(crate) fn shape_string(shape: &[usize]) -> String {
    let count: usize = shape.iter().product();
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    format!("{} ({})", dims.join(" "), count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_new_blob_is_unallocated() {
        let blob = Blob::<TestBackend>::new(vec![2, 3]);
        assert_eq!(blob.count(), 6);
        assert!(!blob.is_allocated());
        assert!(blob.tensor().is_err());
    }

    #[test]
    fn test_release_keeps_shape() {
        let device = <TestBackend as Backend>::Device::default();
        let mut blob = Blob::<TestBackend>::zeros(vec![4, 2], &device);
        assert!(blob.is_allocated());

        blob.release();

        assert!(!blob.is_allocated());
        assert_eq!(blob.shape(), &[4, 2]);
        assert_eq!(blob.count_from(1), 2);
    }

    #[test]
    fn test_set_data_rejects_wrong_length() {
        let device = <TestBackend as Backend>::Device::default();
        let mut blob = Blob::<TestBackend>::new(vec![3]);
        assert!(blob.set_data(&[1.0, 2.0], &device).is_err());
        blob.set_data(&[1.0, 2.0, 3.0], &device).unwrap();
        assert_eq!(blob.to_vec().unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_from_proto_without_reshape_keeps_shape() {
        let device = <TestBackend as Backend>::Device::default();
        let mut blob = Blob::<TestBackend>::new(vec![2, 3]);
        let proto = BlobProto::new(vec![6], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        blob.from_proto(&proto, false, &device).unwrap();

        assert_eq!(blob.shape(), &[2, 3]);
        assert!(!blob.shape_equals(&proto));
        assert_eq!(blob.to_vec().unwrap()[5], 6.0);
    }

    #[test]
    fn test_from_proto_with_reshape() {
        let device = <TestBackend as Backend>::Device::default();
        let mut blob = Blob::<TestBackend>::new(vec![1]);
        let proto = BlobProto::new(vec![2, 2], vec![0.5; 4]);

        blob.from_proto(&proto, true, &device).unwrap();

        assert!(blob.shape_equals(&proto));
        assert_eq!(blob.to_proto().unwrap(), proto);
    }

    #[test]
    fn test_shape_string() {
        let blob = Blob::<TestBackend>::new(vec![2, 3, 4]);
        assert_eq!(blob.shape_string(), "2 3 4 (24)");
    }
}
