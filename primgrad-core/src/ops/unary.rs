//! Elementwise unary math. All preserve the input dtype.

use super::unary_map;
use crate::error::PrimGradError;
use crate::tensor::Tensor;

pub fn exp_op(t: &Tensor) -> Result<Tensor, PrimGradError> {
    unary_map(t, f32::exp)
}

pub fn ln_op(t: &Tensor) -> Result<Tensor, PrimGradError> {
    unary_map(t, f32::ln)
}

pub fn sqrt_op(t: &Tensor) -> Result<Tensor, PrimGradError> {
    unary_map(t, f32::sqrt)
}

pub fn sin_op(t: &Tensor) -> Result<Tensor, PrimGradError> {
    unary_map(t, f32::sin)
}

pub fn cos_op(t: &Tensor) -> Result<Tensor, PrimGradError> {
    unary_map(t, f32::cos)
}

pub fn tanh_op(t: &Tensor) -> Result<Tensor, PrimGradError> {
    unary_map(t, f32::tanh)
}

/// Gauss error function, via libm.
pub fn erf_op(t: &Tensor) -> Result<Tensor, PrimGradError> {
    unary_map(t, libm::erff)
}

pub fn abs_op(t: &Tensor) -> Result<Tensor, PrimGradError> {
    unary_map(t, f32::abs)
}

/// Sign function with sign(0) == 0.
pub fn sign_op(t: &Tensor) -> Result<Tensor, PrimGradError> {
    unary_map(t, |x| {
        if x > 0.0 {
            1.0
        } else if x < 0.0 {
            -1.0
        } else {
            0.0
        }
    })
}

pub fn floor_op(t: &Tensor) -> Result<Tensor, PrimGradError> {
    unary_map(t, f32::floor)
}
