//! Gradients of the activation operators.

use crate::error::PrimGradError;
use crate::ops::arithmetic::{add_op, mul_op, scale_op, sub_op};
use crate::ops::cast::cast_op;
use crate::ops::comparison::{gt_op, le_op, lt_op, where_op};
use crate::ops::reduction::sum_op;
use crate::ops::unary::{erf_op, exp_op, tanh_op};
use crate::rules::promote::{promote_if_reduced, restore_dtype};
use crate::tensor::create::{full_like, zeros_like};
use crate::tensor::utils::normalize_axis;
use crate::tensor::Tensor;
use log::debug;

/// Dropout scaling convention, fixed at graph construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropoutMode {
    /// Kept values are scaled by 1/(1-p) during training; inference is a
    /// pass-through.
    UpscaleInTrain,
    /// Training keeps values unscaled; inference multiplies by (1-p).
    DowngradeInInfer,
}

pub fn relu_grad(out: &Tensor, out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    let positive = gt_op(out, &zeros_like(out)?)?;
    where_op(&positive, out_grad, &zeros_like(out_grad)?)
}

pub fn leaky_relu_grad(
    out: &Tensor,
    out_grad: &Tensor,
    negative_slope: f32,
) -> Result<Tensor, PrimGradError> {
    let positive = gt_op(out, &zeros_like(out)?)?;
    where_op(&positive, out_grad, &scale_op(out_grad, negative_slope, 0.0)?)
}

/// Three regions: below -3 the gradient is zero, above 3 it passes through,
/// in between it is g * (x/3 + 0.5). The x < -3 test is applied on top of
/// the x <= 3 branch result so the boundary points land where the forward
/// kernel puts them.
pub fn hardswish_grad(x: &Tensor, out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    let middle = mul_op(out_grad, &scale_op(x, 1.0 / 3.0, 0.5)?)?;
    let tmp1 = where_op(&le_op(x, &full_like(x, 3.0)?)?, &middle, out_grad)?;
    where_op(
        &lt_op(x, &full_like(x, -3.0)?)?,
        &zeros_like(out_grad)?,
        &tmp1,
    )
}

/// Gelu gradient, both variants computed in F32 for reduced dtypes.
///
/// `approximate` selects the tanh form; the exact form differentiates
/// x * Phi(x) with Phi expressed through erf.
pub fn gelu_grad(
    x: &Tensor,
    out_grad: &Tensor,
    approximate: bool,
) -> Result<Tensor, PrimGradError> {
    let dtype = x.dtype();
    let x_w = promote_if_reduced(x)?;
    let grad_w = promote_if_reduced(out_grad)?;

    let res = if approximate {
        let kbeta = (2.0f32 / std::f32::consts::PI).sqrt();
        let kkappa = 0.044715f32;
        let x_sq = mul_op(&x_w, &x_w)?;
        let x_cube = mul_op(&x_sq, &x_w)?;
        // inner = kbeta * (x + kkappa * x^3)
        let inner = scale_op(&add_op(&x_w, &scale_op(&x_cube, kkappa, 0.0)?)?, kbeta, 0.0)?;
        let tanh_inner = tanh_op(&inner)?;

        let left = scale_op(&x_w, 0.5, 0.0)?;
        let right = scale_op(&tanh_inner, 1.0, 1.0)?;
        let left_derivative = scale_op(&right, 0.5, 0.0)?;

        let tanh_derivative = scale_op(&mul_op(&tanh_inner, &tanh_inner)?, -1.0, 1.0)?;
        let inner_derivative = scale_op(&x_sq, 3.0 * kkappa * kbeta, kbeta)?;
        let right_derivative = mul_op(&mul_op(&left, &tanh_derivative)?, &inner_derivative)?;

        mul_op(&grad_w, &add_op(&left_derivative, &right_derivative)?)?
    } else {
        let kalpha = std::f32::consts::FRAC_1_SQRT_2;
        let kbeta = std::f32::consts::FRAC_2_SQRT_PI * std::f32::consts::FRAC_1_SQRT_2 * 0.5;
        let cdf = scale_op(&erf_op(&scale_op(&x_w, kalpha, 0.0)?)?, 0.5, 0.5)?;
        let pdf = scale_op(&exp_op(&scale_op(&mul_op(&x_w, &x_w)?, -0.5, 0.0)?)?, kbeta, 0.0)?;
        mul_op(&grad_w, &add_op(&cdf, &mul_op(&x_w, &pdf)?)?)?
    };
    restore_dtype(&res, dtype)
}

/// dx = g*out - out * sum(g*out, axis, keep_dims). A rank-0 input has a
/// constant forward, so the gradient is zero.
pub fn softmax_grad(out: &Tensor, out_grad: &Tensor, axis: i64) -> Result<Tensor, PrimGradError> {
    if out_grad.rank() == 0 {
        return zeros_like(out_grad);
    }
    let axis = normalize_axis(axis, out.rank())? as i64;
    let weighted = mul_op(out_grad, out)?;
    let summed = sum_op(&weighted, Some(&[axis]), true)?;
    sub_op(&weighted, &mul_op(out, &summed)?)
}

/// Gradient of dropout given the saved keep mask.
///
/// The five cases follow the {is_test} x {mode} table, with p = 1 under
/// upscale-in-train as the degenerate everything-dropped case.
pub fn dropout_grad(
    mask: &Tensor,
    out_grad: &Tensor,
    p: f32,
    is_test: bool,
    mode: DropoutMode,
) -> Result<Tensor, PrimGradError> {
    if is_test {
        return match mode {
            DropoutMode::UpscaleInTrain => Ok(out_grad.clone()),
            DropoutMode::DowngradeInInfer => scale_op(out_grad, 1.0 - p, 0.0),
        };
    }
    let mask = cast_op(mask, out_grad.dtype())?;
    match mode {
        DropoutMode::UpscaleInTrain => {
            if p == 1.0 {
                debug!("dropout_grad: p = 1, gradient collapses to zero");
                scale_op(out_grad, 0.0, 0.0)
            } else {
                scale_op(&mul_op(out_grad, &mask)?, 1.0 / (1.0 - p), 0.0)
            }
        }
        DropoutMode::DowngradeInInfer => mul_op(out_grad, &mask),
    }
}

#[cfg(test)]
#[path = "activation_test.rs"]
mod tests;
