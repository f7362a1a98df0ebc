//! Gradients of the normalization operators. Both rules widen reduced
//! dtypes to F32 for the whole computation and cast each gradient back to
//! its parameter's dtype at the end.

use crate::error::PrimGradError;
use crate::ops::arithmetic::{add_op, mul_op, powf_op, recip_op, scale_op, sub_op};
use crate::ops::reduction::sum_op;
use crate::ops::view::reshape_op;
use crate::rules::promote::{promote_if_reduced, restore_dtype};
use crate::rules::NormGrads;
use crate::tensor::create::ones;
use crate::tensor::Tensor;

/// Layer normalization gradient.
///
/// The input is flattened to `[outer, inner]` around `begin_norm_axis`;
/// `mean` and `variance` are the statistics saved by the forward pass, one
/// per outer row. With x_hat = (x - mean) / sqrt(variance + epsilon):
///
///   dx     = dx_end - (d_mean + d_std) / inner
///   dscale = sum_outer(x_hat * dy)
///   dbias  = sum_outer(dy)
///
/// where dx_end = dy * scale / sqrt(variance + epsilon). Gradients for
/// scale/bias are produced only when the corresponding parameter exists.
#[allow(clippy::too_many_arguments)]
pub fn layer_norm_grad(
    x: &Tensor,
    scale: Option<&Tensor>,
    bias: Option<&Tensor>,
    mean: &Tensor,
    variance: &Tensor,
    out_grad: &Tensor,
    epsilon: f32,
    begin_norm_axis: usize,
    want_dx: bool,
    want_dscale: bool,
    want_dbias: bool,
) -> Result<NormGrads, PrimGradError> {
    let x_dims = x.shape();
    if begin_norm_axis > x_dims.len() {
        return Err(PrimGradError::InvalidAxis {
            axis: begin_norm_axis as i64,
            rank: x_dims.len(),
        });
    }
    let outer: usize = x_dims[..begin_norm_axis].iter().product();
    let inner: usize = x_dims[begin_norm_axis..].iter().product();
    let x_dtype = x.dtype();

    let x_flat = promote_if_reduced(&reshape_op(x, &[outer, inner])?)?;
    let g_flat = promote_if_reduced(&reshape_op(out_grad, &[outer, inner])?)?;
    let mean_col = reshape_op(mean, &[outer, 1])?;
    let var_col = reshape_op(variance, &[outer, 1])?;
    let scale_row = match scale {
        Some(s) => Some(promote_if_reduced(&reshape_op(s, &[1, inner])?)?),
        None => None,
    };

    let x_sub_mean = sub_op(&x_flat, &mean_col)?;
    let tmp = recip_op(&scale_op(&var_col, 1.0, epsilon)?)?;
    let sqrt_var_1 = powf_op(&tmp, 0.5)?;
    let x_hat = mul_op(&x_sub_mean, &sqrt_var_1)?;

    let mut grads = NormGrads::default();
    if want_dx {
        let g_scaled = match &scale_row {
            Some(s) => mul_op(&g_flat, s)?,
            None => g_flat.clone(),
        };
        let dx_end = mul_op(&sqrt_var_1, &g_scaled)?;
        let d_mean = sum_op(&dx_end, Some(&[1]), true)?;
        let d_std_1 = sum_op(
            &mul_op(&mul_op(&tmp, &x_sub_mean)?, &g_scaled)?,
            Some(&[1]),
            true,
        )?;
        let d_std = mul_op(&d_std_1, &x_hat)?;
        let correction = scale_op(&add_op(&d_mean, &d_std)?, 1.0 / inner as f32, 0.0)?;
        let dx_flat = sub_op(&dx_end, &correction)?;
        let dx = reshape_op(&dx_flat, &x_dims)?;
        grads.dx = Some(restore_dtype(&dx, x_dtype)?);
    }
    if want_dscale {
        if let Some(s) = scale {
            let summed = sum_op(&mul_op(&x_hat, &g_flat)?, Some(&[0]), true)?;
            let dscale = reshape_op(&summed, &s.shape())?;
            grads.dscale = Some(restore_dtype(&dscale, s.dtype())?);
        }
    }
    if want_dbias {
        if let Some(b) = bias {
            let summed = sum_op(&g_flat, Some(&[0]), true)?;
            let dbias = reshape_op(&summed, &b.shape())?;
            grads.dbias = Some(restore_dtype(&dbias, b.dtype())?);
        }
    }
    Ok(grads)
}

/// Instance normalization gradient over NCHW input.
///
/// `saved_variance` holds the inverse standard deviation the forward pass
/// computed, so no epsilon is needed here. With x_hat = (x - mean) * std_inv
/// and mean_hw the average over the spatial axes:
///
///   dx     = (scale * std_inv) * (dy - mean_hw(dy) - x_hat * mean_hw(dy * x_hat))
///   dscale = sum_{n,h,w}(dy * x_hat)
///   dbias  = sum_{n,h,w}(dy)
///
/// A missing scale behaves as all-ones for dx; dscale and dbias are still
/// produced when requested.
#[allow(clippy::too_many_arguments)]
pub fn instance_norm_grad(
    x: &Tensor,
    scale: Option<&Tensor>,
    saved_mean: &Tensor,
    saved_variance: &Tensor,
    y_grad: &Tensor,
    want_dx: bool,
    want_dscale: bool,
    want_dbias: bool,
) -> Result<NormGrads, PrimGradError> {
    let dims = x.shape();
    if dims.len() != 4 {
        return Err(PrimGradError::ShapeMismatch {
            expected: vec![0, 0, 0, 0],
            actual: dims.clone(),
            operation: "instance_norm_grad (NCHW input required)".to_string(),
        });
    }
    let (n, c, h, w) = (dims[0], dims[1], dims[2], dims[3]);
    let x_dtype = x.dtype();
    let param_dtype = scale.map(|s| s.dtype()).unwrap_or(x_dtype);

    let g_w = promote_if_reduced(y_grad)?;
    let mut grads = NormGrads::default();
    let hw = (h * w) as f32;
    // x_hat is only needed by the dx and dscale branches
    if want_dx || want_dscale {
        let x_w = promote_if_reduced(x)?;
        let mean = reshape_op(&promote_if_reduced(saved_mean)?, &[n, c, 1, 1])?;
        let std_inv = reshape_op(&promote_if_reduced(saved_variance)?, &[n, c, 1, 1])?;
        let x_hat = mul_op(&sub_op(&x_w, &mean)?, &std_inv)?;
        if want_dx {
            let scale_data = match scale {
                Some(s) => promote_if_reduced(s)?,
                None => ones(&[c])?,
            };
            let scale_b = reshape_op(&scale_data, &[1, c, 1, 1])?;
            let g_mean = scale_op(&sum_op(&g_w, Some(&[2, 3]), true)?, 1.0 / hw, 0.0)?;
            let gx_mean = scale_op(
                &sum_op(&mul_op(&g_w, &x_hat)?, Some(&[2, 3]), true)?,
                1.0 / hw,
                0.0,
            )?;
            let centered = sub_op(&sub_op(&g_w, &g_mean)?, &mul_op(&x_hat, &gx_mean)?)?;
            let dx = mul_op(&mul_op(&scale_b, &std_inv)?, &centered)?;
            grads.dx = Some(restore_dtype(&dx, x_dtype)?);
        }
        if want_dscale {
            let summed = sum_op(&mul_op(&g_w, &x_hat)?, Some(&[0, 2, 3]), false)?;
            grads.dscale = Some(restore_dtype(&summed, param_dtype)?);
        }
    }
    if want_dbias {
        let summed = sum_op(&g_w, Some(&[0, 2, 3]), false)?;
        grads.dbias = Some(restore_dtype(&summed, param_dtype)?);
    }
    Ok(grads)
}

#[cfg(test)]
#[path = "norm_test.rs"]
mod tests;
