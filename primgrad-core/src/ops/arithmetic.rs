//! Elementwise arithmetic with broadcasting.

use super::{broadcast_zip, unary_map};
use crate::error::PrimGradError;
use crate::tensor::Tensor;

/// Performs element-wise addition for two tensors with broadcasting.
pub fn add_op(a: &Tensor, b: &Tensor) -> Result<Tensor, PrimGradError> {
    broadcast_zip(a, b, |x, y| x + y)
}

pub fn sub_op(a: &Tensor, b: &Tensor) -> Result<Tensor, PrimGradError> {
    broadcast_zip(a, b, |x, y| x - y)
}

pub fn mul_op(a: &Tensor, b: &Tensor) -> Result<Tensor, PrimGradError> {
    broadcast_zip(a, b, |x, y| x * y)
}

pub fn div_op(a: &Tensor, b: &Tensor) -> Result<Tensor, PrimGradError> {
    broadcast_zip(a, b, |x, y| x / y)
}

pub fn neg_op(a: &Tensor) -> Result<Tensor, PrimGradError> {
    unary_map(a, |x| -x)
}

/// Elementwise `a ^ b` with broadcasting.
pub fn pow_op(a: &Tensor, b: &Tensor) -> Result<Tensor, PrimGradError> {
    broadcast_zip(a, b, |x, y| x.powf(y))
}

/// Elementwise power with a scalar exponent.
pub fn powf_op(a: &Tensor, exponent: f32) -> Result<Tensor, PrimGradError> {
    unary_map(a, |x| x.powf(exponent))
}

/// Affine map `factor * t + bias`, the workhorse for scalar arithmetic.
pub fn scale_op(t: &Tensor, factor: f32, bias: f32) -> Result<Tensor, PrimGradError> {
    unary_map(t, |x| factor * x + bias)
}

/// Elementwise reciprocal.
pub fn recip_op(t: &Tensor) -> Result<Tensor, PrimGradError> {
    unary_map(t, |x| 1.0 / x)
}
