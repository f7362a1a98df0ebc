//! Gradients of the gather/scatter family.

use crate::error::PrimGradError;
use crate::ops::indexing::{gather_nd_op, gather_op, put_along_axis_op, scatter_nd_add_op, scatter_op};
use crate::ops::view::transpose_op;
use crate::rules::view::transpose_grad;
use crate::rules::ScatterGrads;
use crate::tensor::utils::normalize_axis;
use crate::tensor::create::{zeros, zeros_like};
use crate::tensor::Tensor;

/// Accumulates the gathered gradient rows back into a zero tensor.
///
/// The scatter primitive works along axis 0, so the gather axis is first
/// permuted to the front and the result permuted back. Scatter accumulates,
/// so rows gathered more than once sum their gradients.
pub fn gather_grad(
    x: &Tensor,
    index: &Tensor,
    out_grad: &Tensor,
    axis: i64,
) -> Result<Tensor, PrimGradError> {
    let rank = x.rank();
    let axis_value = normalize_axis(axis, rank)?;

    let mut perm: Vec<i64> = Vec::with_capacity(rank);
    perm.push(axis_value as i64);
    for i in 0..rank {
        if i != axis_value {
            perm.push(i as i64);
        }
    }

    let zero = zeros_like(x)?;
    let (zero_t, grad_t) = if rank > 0 {
        (transpose_op(&zero, &perm)?, transpose_op(out_grad, &perm)?)
    } else {
        (zero, out_grad.clone())
    };
    let scattered = scatter_op(&zero_t, index, &grad_t, false)?;
    if rank > 0 {
        // transpose_grad applies the inverse permutation
        transpose_grad(&scattered, &perm)
    } else {
        Ok(scattered)
    }
}

pub fn gather_nd_grad(
    x: &Tensor,
    index: &Tensor,
    out_grad: &Tensor,
) -> Result<Tensor, PrimGradError> {
    scatter_nd_add_op(&zeros_like(x)?, index, out_grad)
}

/// The x branch zeroes the rows the forward scatter overwrote; the updates
/// branch gathers the gradient at those rows.
pub fn scatter_grad(
    index: &Tensor,
    updates: &Tensor,
    out_grad: &Tensor,
    want_dx: bool,
    want_dupdates: bool,
) -> Result<ScatterGrads, PrimGradError> {
    let mut grads = ScatterGrads::default();
    if want_dx {
        let zero_updates = zeros_like(updates)?;
        grads.dx = Some(scatter_op(out_grad, index, &zero_updates, false)?);
    }
    if want_dupdates {
        grads.dupdates = Some(gather_op(out_grad, index)?);
    }
    Ok(grads)
}

/// scatter_nd_add leaves x untouched, so its x gradient passes through.
pub fn scatter_nd_add_grad(
    index: &Tensor,
    out_grad: &Tensor,
    want_dx: bool,
    want_dupdates: bool,
) -> Result<ScatterGrads, PrimGradError> {
    let mut grads = ScatterGrads::default();
    if want_dx {
        grads.dx = Some(out_grad.clone());
    }
    if want_dupdates {
        grads.dupdates = Some(gather_nd_op(out_grad, index)?);
    }
    Ok(grads)
}

/// Routes the top-k gradient back to the selected positions; everything
/// else stays zero. A rank-0 input is its own top-1, so the gradient
/// passes straight through.
pub fn topk_grad(
    x: &Tensor,
    indices: &Tensor,
    out_grad: &Tensor,
    axis: i64,
) -> Result<Tensor, PrimGradError> {
    if x.rank() == 0 {
        return Ok(out_grad.clone());
    }
    let axis_value = normalize_axis(axis, x.rank())?;
    let zero = zeros(&x.shape())?;
    put_along_axis_op(&zero, indices, out_grad, axis_value)
}

#[cfg(test)]
#[path = "indexing_test.rs"]
mod tests;
