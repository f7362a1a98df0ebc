//! Gradients of the elementwise unary operators.
//!
//! Single-gradient rules return the gradient tensor directly; a caller that
//! does not want it simply does not call the rule. Rules taking `out` reuse
//! the forward result instead of recomputing it. `exp_grad` and `silu_grad`
//! widen reduced-precision operands to F32 first.

use crate::error::PrimGradError;
use crate::ops::arithmetic::{mul_op, neg_op, recip_op, scale_op, sub_op};
use crate::ops::unary::{cos_op, exp_op, sign_op, sin_op};
use crate::rules::promote::{promote_if_reduced, restore_dtype};
use crate::tensor::create::zeros_like;
use crate::tensor::Tensor;

use std::f32::consts::FRAC_2_SQRT_PI;

pub fn abs_grad(x: &Tensor, out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    mul_op(out_grad, &sign_op(x)?)
}

/// assign is the identity, so its gradient passes straight through.
pub fn assign_grad(out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    Ok(out_grad.clone())
}

pub fn floor_grad(out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    zeros_like(out_grad)
}

pub fn sin_grad(x: &Tensor, out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    mul_op(out_grad, &cos_op(x)?)
}

pub fn cos_grad(x: &Tensor, out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    mul_op(out_grad, &neg_op(&sin_op(x)?)?)
}

/// dx = (1 - out^2) * g, expressed on the saved forward output.
pub fn tanh_grad(out: &Tensor, out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    let one_minus_sq = scale_op(&mul_op(out, out)?, -1.0, 1.0)?;
    mul_op(out_grad, &one_minus_sq)
}

pub fn log_grad(x: &Tensor, out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    mul_op(out_grad, &recip_op(x)?)
}

/// dx = g * out, computed in F32 for reduced dtypes.
pub fn exp_grad(out: &Tensor, out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    let dtype = out.dtype();
    if dtype.is_reduced() {
        let out_wide = promote_if_reduced(out)?;
        let grad_wide = promote_if_reduced(out_grad)?;
        restore_dtype(&mul_op(&grad_wide, &out_wide)?, dtype)
    } else {
        mul_op(out_grad, out)
    }
}

/// dx = (0.5 / out) * g on the saved output.
pub fn sqrt_grad(out: &Tensor, out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    mul_op(&scale_op(&recip_op(out)?, 0.5, 0.0)?, out_grad)
}

pub fn sigmoid_grad(out: &Tensor, out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    let one_minus = scale_op(out, -1.0, 1.0)?;
    mul_op(out_grad, &mul_op(out, &one_minus)?)
}

/// dx = g * (2/sqrt(pi)) * exp(-x^2).
pub fn erf_grad(x: &Tensor, out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    let neg_sq = neg_op(&mul_op(x, x)?)?;
    let density = scale_op(&exp_op(&neg_sq)?, FRAC_2_SQRT_PI, 0.0)?;
    mul_op(out_grad, &density)
}

/// dx = g * sigmoid(x) * (1 + x - out), computed in F32 for reduced dtypes.
pub fn silu_grad(x: &Tensor, out: &Tensor, out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    let dtype = x.dtype();
    let x_w = promote_if_reduced(x)?;
    let out_w = promote_if_reduced(out)?;
    let grad_w = promote_if_reduced(out_grad)?;
    let sig = recip_op(&scale_op(&exp_op(&neg_op(&x_w)?)?, 1.0, 1.0)?)?;
    let inner = sub_op(&scale_op(&x_w, 1.0, 1.0)?, &out_w)?;
    let res = mul_op(&mul_op(&grad_w, &sig)?, &inner)?;
    restore_dtype(&res, dtype)
}

#[cfg(test)]
#[path = "unary_test.rs"]
mod tests;
