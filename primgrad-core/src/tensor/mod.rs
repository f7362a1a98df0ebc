// src/tensor/mod.rs

use crate::error::PrimGradError;
use crate::types::DType;
use std::fmt;
use std::sync::Arc;

pub mod create;
pub mod utils;

pub use create::{full, full_dtype, ones, ones_like, randn, zeros, zeros_like};

/// Backing storage of a tensor: a contiguous `f32` buffer plus metadata.
///
/// When `dtype` is a reduced-precision kind, every value in `data` has
/// already been rounded through that format (see [`DType::round`]).
#[derive(Debug, Clone, PartialEq)]
pub struct TensorData {
    pub(crate) data: Vec<f32>,
    pub shape: Vec<usize>,
    pub strides: Vec<usize>,
    pub dtype: DType,
}

impl TensorData {
    fn new(data: Vec<f32>, shape: Vec<usize>, dtype: DType) -> Result<Self, PrimGradError> {
        let numel: usize = shape.iter().product();
        if data.len() != numel {
            return Err(PrimGradError::TensorCreationError {
                data_len: data.len(),
                shape,
            });
        }
        let strides = utils::calculate_strides(&shape);
        Ok(TensorData {
            data,
            shape,
            strides,
            dtype,
        })
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Linear offset into `data` for the given coordinates.
    pub fn get_offset(&self, coords: &[usize]) -> usize {
        coords
            .iter()
            .zip(self.strides.iter())
            .map(|(c, s)| c * s)
            .sum()
    }
}

/// An immutable n-dimensional array value.
///
/// `Tensor` wraps its [`TensorData`] in an `Arc`, so clones are cheap and the
/// underlying buffer is never mutated once built — every operation produces a
/// fresh tensor. Rank-0 tensors (shape `[]`, one element) are supported
/// throughout.
#[derive(Clone)]
pub struct Tensor {
    pub(crate) data: Arc<TensorData>,
}

impl Tensor {
    /// Creates a new F32 tensor with the given data and shape.
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Result<Self, PrimGradError> {
        Tensor::new_with_dtype(data, shape, DType::F32)
    }

    /// Creates a tensor of the given dtype, rounding the values through the
    /// dtype's representable set.
    pub fn new_with_dtype(
        mut data: Vec<f32>,
        shape: Vec<usize>,
        dtype: DType,
    ) -> Result<Self, PrimGradError> {
        if dtype.is_reduced() {
            for v in data.iter_mut() {
                *v = dtype.round(*v);
            }
        }
        Ok(Tensor {
            data: Arc::new(TensorData::new(data, shape, dtype)?),
        })
    }

    /// Creates a scalar (rank-0) tensor.
    pub fn scalar(value: f32) -> Self {
        Tensor {
            data: Arc::new(TensorData {
                data: vec![value],
                shape: vec![],
                strides: vec![],
                dtype: DType::F32,
            }),
        }
    }

    /// Builds an index tensor from a slice of positions.
    pub fn from_indices(indices: &[usize], shape: Vec<usize>) -> Result<Self, PrimGradError> {
        let data = indices.iter().map(|&i| i as f32).collect();
        Tensor::new(data, shape)
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype
    }

    /// Returns a clone of the tensor's shape.
    pub fn shape(&self) -> Vec<usize> {
        self.data.shape.clone()
    }

    pub fn strides(&self) -> Vec<usize> {
        self.data.strides.clone()
    }

    pub fn rank(&self) -> usize {
        self.data.shape.len()
    }

    pub fn numel(&self) -> usize {
        self.data.numel()
    }

    /// Read-only view of the underlying contiguous buffer.
    pub fn values(&self) -> &[f32] {
        &self.data.data
    }

    /// Value at the given coordinates.
    pub fn get(&self, coords: &[usize]) -> Result<f32, PrimGradError> {
        if coords.len() != self.rank()
            || coords.iter().zip(self.data.shape.iter()).any(|(c, s)| c >= s)
        {
            return Err(PrimGradError::IndexOutOfBounds {
                index: coords.to_vec(),
                shape: self.shape(),
            });
        }
        Ok(self.data.data[self.data.get_offset(coords)])
    }

    /// Value of a single-element tensor.
    pub fn item(&self) -> Result<f32, PrimGradError> {
        if self.numel() != 1 {
            return Err(PrimGradError::UnsupportedOperation(format!(
                "item() called on tensor with {} elements",
                self.numel()
            )));
        }
        Ok(self.data.data[0])
    }

    /// Interprets the values as non-negative indices, rounding to the
    /// nearest integer. Fails on negative values.
    pub fn to_index_vec(&self) -> Result<Vec<usize>, PrimGradError> {
        self.data
            .data
            .iter()
            .map(|&v| {
                if v < -0.5 {
                    Err(PrimGradError::UnsupportedOperation(format!(
                        "negative index value {v}"
                    )))
                } else {
                    Ok(v.round() as usize)
                }
            })
            .collect()
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.data.shape)
            .field("dtype", &self.data.dtype)
            .field("data", &self.data.data)
            .finish()
    }
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.data.dtype == other.data.dtype
            && self.data.shape == other.data.shape
            && self.data.data == other.data.data
    }
}
