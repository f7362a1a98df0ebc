//! Gradients of the reduction and expand operators.
//!
//! All three reductions share the same shape bookkeeping: empty axes mean a
//! full reduction, rank-1 inputs expand the output gradient directly, and a
//! `keep_dims = false` reduction first reinserts the dropped axes with
//! [`unsqueeze_dims`] so the gradient broadcasts back over the input.

use crate::error::PrimGradError;
use crate::ops::arithmetic::{mul_op, recip_op};
use crate::ops::comparison::{eq_op, where_op};
use crate::ops::reduction::{cumsum_op, process_reduction_axes, unsqueeze_dims};
use crate::ops::view::{expand_op, reshape_op};
use crate::rules::broadcast::reduce_broadcast;
use crate::tensor::create::zeros_like;
use crate::tensor::Tensor;

/// Broadcasts `out_grad` (and optionally a second tensor reduced the same
/// way) back to `x_shape`.
fn expand_reduced(
    t: &Tensor,
    x_shape: &[usize],
    axes: Option<&[i64]>,
    keep_dims: bool,
) -> Result<Tensor, PrimGradError> {
    let rank = x_shape.len();
    if rank <= 1 || keep_dims {
        return expand_op(t, x_shape);
    }
    let processed = process_reduction_axes(rank, axes)?;
    let unsqueezed = unsqueeze_dims(&t.shape(), &processed);
    expand_op(&reshape_op(t, &unsqueezed)?, x_shape)
}

pub fn sum_grad(
    x: &Tensor,
    out_grad: &Tensor,
    axes: Option<&[i64]>,
    keep_dims: bool,
) -> Result<Tensor, PrimGradError> {
    expand_reduced(out_grad, &x.shape(), axes, keep_dims)
}

/// Routes the incoming gradient to every position equal to the reduced
/// maximum, so tied maxima each receive the full gradient.
pub fn max_grad(
    x: &Tensor,
    out: &Tensor,
    out_grad: &Tensor,
    axes: Option<&[i64]>,
    keep_dims: bool,
) -> Result<Tensor, PrimGradError> {
    let x_shape = x.shape();
    let grad_full = expand_reduced(out_grad, &x_shape, axes, keep_dims)?;
    let out_full = expand_reduced(out, &x_shape, axes, keep_dims)?;
    let mask = eq_op(x, &out_full)?;
    where_op(&mask, &grad_full, &zeros_like(x)?)
}

/// dx = expanded(g) * expanded(out) / x.
pub fn prod_grad(
    x: &Tensor,
    out: &Tensor,
    out_grad: &Tensor,
    axes: Option<&[i64]>,
    keep_dims: bool,
) -> Result<Tensor, PrimGradError> {
    let x_shape = x.shape();
    let grad_full = expand_reduced(out_grad, &x_shape, axes, keep_dims)?;
    let out_full = expand_reduced(out, &x_shape, axes, keep_dims)?;
    mul_op(&mul_op(&grad_full, &out_full)?, &recip_op(x)?)
}

/// expand is the dual of a broadcast, so its gradient is the resolver
/// applied to the input's shape.
pub fn expand_grad(x: &Tensor, out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    reduce_broadcast(out_grad, &x.shape())
}

/// The adjoint of a running sum is the same scan with the direction flipped;
/// an inclusive forward pairs with an inclusive backward and likewise for
/// exclusive. A flattened forward is undone by reshaping to `x`'s shape.
pub fn cumsum_grad(
    x: &Tensor,
    out_grad: &Tensor,
    axis: i64,
    flatten: bool,
    exclusive: bool,
    reverse: bool,
) -> Result<Tensor, PrimGradError> {
    let grad = cumsum_op(out_grad, axis, flatten, exclusive, !reverse)?;
    reshape_op(&grad, &x.shape())
}

#[cfg(test)]
#[path = "reduction_test.rs"]
mod tests;
