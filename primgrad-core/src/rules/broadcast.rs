//! Broadcast-reduce resolver: maps a broadcast-expanded gradient back onto an
//! unbroadcast input shape.

use crate::error::PrimGradError;
use crate::ops::reduction::sum_op;
use crate::ops::view::reshape_op;
use crate::tensor::Tensor;
use log::trace;

/// Computes which axes of a tensor shaped `from_shape` must be summed to
/// recover a tensor compatible with `to_shape`, after an elementwise binary
/// op broadcast `to_shape` up to `from_shape`.
///
/// Alignment is right-justified: `to_shape` is conceptually padded on the
/// left with size-1 axes. Leading axes present only in `from_shape` are
/// always reduced; an aligned axis is reduced when `to_shape` has extent 1
/// and `from_shape` has extent > 1. An empty result means no reduction is
/// needed (and is returned iff the aligned shapes already agree).
///
/// Fails when `from_shape` cannot have arisen by broadcasting `to_shape`
/// (smaller rank, or an aligned extent conflict) so malformed axis sets are
/// rejected here rather than producing wrong-shaped output downstream.
pub fn reduce_axes(from_shape: &[usize], to_shape: &[usize]) -> Result<Vec<usize>, PrimGradError> {
    if from_shape.len() < to_shape.len() {
        return Err(PrimGradError::BroadcastError {
            shape1: from_shape.to_vec(),
            shape2: to_shape.to_vec(),
        });
    }
    let rank_diff = from_shape.len() - to_shape.len();
    let mut axes = Vec::new();
    for i in 0..rank_diff {
        axes.push(i);
    }
    for (i, &to_dim) in to_shape.iter().enumerate() {
        let from_dim = from_shape[rank_diff + i];
        if to_dim == 1 && from_dim > 1 {
            axes.push(rank_diff + i);
        } else if to_dim != from_dim {
            return Err(PrimGradError::BroadcastError {
                shape1: from_shape.to_vec(),
                shape2: to_shape.to_vec(),
            });
        }
    }
    Ok(axes)
}

/// Applies [`reduce_axes`] to a gradient tensor: sums the broadcast axes and
/// reshapes to exactly `to_shape`.
///
/// The empty-axis-set case is a cheap pass-through every binary-op gradient
/// rule relies on; a reshape still happens when only size-1 axes differ.
pub fn reduce_broadcast(grad: &Tensor, to_shape: &[usize]) -> Result<Tensor, PrimGradError> {
    let from_shape = grad.shape();
    let axes = reduce_axes(&from_shape, to_shape)?;
    if axes.is_empty() {
        if from_shape == to_shape {
            return Ok(grad.clone());
        }
        return reshape_op(grad, to_shape);
    }
    trace!(
        "reduce_broadcast: {:?} -> {:?} summing axes {:?}",
        from_shape,
        to_shape,
        axes
    );
    let axes_i64: Vec<i64> = axes.iter().map(|&a| a as i64).collect();
    let summed = sum_op(grad, Some(&axes_i64), false)?;
    if summed.shape() != to_shape {
        return reshape_op(&summed, to_shape);
    }
    Ok(summed)
}
