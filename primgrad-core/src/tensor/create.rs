//! Creation helpers for the CPU reference tensors.

use crate::error::PrimGradError;
use crate::tensor::Tensor;
use crate::types::DType;
use rand::prelude::*;
use rand_distr::StandardNormal;

/// Creates a tensor filled with a constant value, in F32.
pub fn full(shape: &[usize], value: f32) -> Result<Tensor, PrimGradError> {
    full_dtype(shape, value, DType::F32)
}

/// Creates a tensor filled with a constant value, in the given dtype.
pub fn full_dtype(shape: &[usize], value: f32, dtype: DType) -> Result<Tensor, PrimGradError> {
    let numel = shape.iter().product();
    Tensor::new_with_dtype(vec![value; numel], shape.to_vec(), dtype)
}

pub fn zeros(shape: &[usize]) -> Result<Tensor, PrimGradError> {
    full(shape, 0.0)
}

pub fn ones(shape: &[usize]) -> Result<Tensor, PrimGradError> {
    full(shape, 1.0)
}

/// Zeros with the shape and dtype of an existing tensor.
pub fn zeros_like(t: &Tensor) -> Result<Tensor, PrimGradError> {
    full_dtype(&t.shape(), 0.0, t.dtype())
}

/// Ones with the shape and dtype of an existing tensor.
pub fn ones_like(t: &Tensor) -> Result<Tensor, PrimGradError> {
    full_dtype(&t.shape(), 1.0, t.dtype())
}

/// Constant fill with the shape and dtype of an existing tensor.
pub fn full_like(t: &Tensor, value: f32) -> Result<Tensor, PrimGradError> {
    full_dtype(&t.shape(), value, t.dtype())
}

/// Standard-normal random tensor (F32), seeded for reproducibility.
pub fn randn(shape: &[usize], seed: u64) -> Result<Tensor, PrimGradError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let numel: usize = shape.iter().product();
    let data: Vec<f32> = (0..numel).map(|_| rng.sample(StandardNormal)).collect();
    Tensor::new(data, shape.to_vec())
}
