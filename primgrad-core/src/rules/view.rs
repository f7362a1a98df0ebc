//! Gradients of the shape and layout operators. These move or reassemble
//! gradient values without weighting them.

use crate::error::PrimGradError;
use crate::ops::arithmetic::add_op;
use crate::ops::cast::cast_op;
use crate::ops::view::{concat_op, pad_op, reshape_op, roll_op, slice_op, split_op, transpose_op};
use crate::tensor::utils::normalize_axis;
use crate::tensor::Tensor;

/// `xshape` is the shape descriptor saved by the forward reshape: its shape
/// is the input's shape prefixed with a placeholder element, so the data
/// itself never needs to be kept alive.
pub fn reshape_grad(xshape: &Tensor, out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    let desc = xshape.shape();
    let (_, x_dims) = desc.split_first().ok_or_else(|| {
        PrimGradError::InternalError("reshape_grad: xshape descriptor has rank 0".to_string())
    })?;
    reshape_op(out_grad, x_dims)
}

/// Transposes back with the inverse permutation: `rev[perm[i]] = i`,
/// negative entries normalized first.
pub fn transpose_grad(out_grad: &Tensor, perm: &[i64]) -> Result<Tensor, PrimGradError> {
    let rank = perm.len();
    let mut reverse_perm = vec![0i64; rank];
    for (i, &p) in perm.iter().enumerate() {
        let p = normalize_axis(p, rank)?;
        reverse_perm[p] = i as i64;
    }
    transpose_op(out_grad, &reverse_perm)
}

pub fn roll_grad(
    out_grad: &Tensor,
    shifts: &[i64],
    axes: &[i64],
) -> Result<Tensor, PrimGradError> {
    let negated: Vec<i64> = shifts.iter().map(|&s| -s).collect();
    roll_op(out_grad, &negated, axes)
}

/// Undoes tiling one axis at a time: split the axis into its repeats, sum
/// the pieces, then reshape to the original shape.
pub fn tile_grad(
    x: &Tensor,
    out_grad: &Tensor,
    repeat_times: &[usize],
) -> Result<Tensor, PrimGradError> {
    let mut result = out_grad.clone();
    for (i, &reps) in repeat_times.iter().enumerate() {
        if reps <= 1 {
            continue;
        }
        let extent = result.shape()[i];
        if extent % reps != 0 {
            return Err(PrimGradError::ShapeMismatch {
                expected: x.shape(),
                actual: out_grad.shape(),
                operation: "tile_grad".to_string(),
            });
        }
        let sections = vec![extent / reps; reps];
        let pieces = split_op(&result, &sections, i)?;
        let mut acc = pieces[0].clone();
        for piece in &pieces[1..] {
            acc = add_op(&acc, piece)?;
        }
        result = acc;
    }
    reshape_op(&result, &x.shape())
}

/// Splits the incoming gradient at each input's extent along the concat
/// axis. `want` selects which slots to fill; unwanted slots stay `None`.
pub fn concat_grad(
    xs: &[Tensor],
    out_grad: &Tensor,
    axis: i64,
    want: &[bool],
) -> Result<Vec<Option<Tensor>>, PrimGradError> {
    let first = xs.first().ok_or(PrimGradError::EmptyTensorList)?;
    if want.len() != xs.len() {
        return Err(PrimGradError::InternalError(format!(
            "concat_grad: {} want flags for {} inputs",
            want.len(),
            xs.len()
        )));
    }
    let rank = first.rank();
    let mut axis_value = if axis < 0 { axis + rank as i64 } else { axis };
    if axis_value < 0 {
        axis_value = 0;
    }
    let axis_value = axis_value as usize;

    let sections: Vec<usize> = xs.iter().map(|t| t.shape()[axis_value]).collect();
    let pieces = split_op(out_grad, &sections, axis_value)?;
    Ok(pieces
        .into_iter()
        .zip(want)
        .map(|(piece, &w)| if w { Some(piece) } else { None })
        .collect())
}

/// split's gradient concatenates the piece gradients back together.
pub fn split_grad(out_grads: &[Tensor], axis: usize) -> Result<Tensor, PrimGradError> {
    concat_op(out_grads, axis)
}

pub fn cast_grad(x: &Tensor, out_grad: &Tensor) -> Result<Tensor, PrimGradError> {
    cast_op(out_grad, x.dtype())
}

/// Slices the interior of the padded gradient back out.
pub fn pad_grad(
    input: &Tensor,
    out_grad: &Tensor,
    paddings: &[(usize, usize)],
) -> Result<Tensor, PrimGradError> {
    let rank = input.rank();
    if paddings.len() != rank {
        return Err(PrimGradError::ShapeMismatch {
            expected: input.shape(),
            actual: paddings.iter().map(|p| p.0).collect(),
            operation: "pad_grad".to_string(),
        });
    }
    let out_shape = out_grad.shape();
    let axes: Vec<usize> = (0..rank).collect();
    let starts: Vec<i64> = paddings.iter().map(|&(b, _)| b as i64).collect();
    let ends: Vec<i64> = paddings
        .iter()
        .zip(&out_shape)
        .map(|(&(_, a), &d)| d as i64 - a as i64)
        .collect();
    slice_op(out_grad, &axes, &starts, &ends)
}

/// Pads the slice gradient back to the input's shape.
///
/// `decrease_axes` lists the size-1 axes the forward slice squeezed out of
/// its result; they are reconstructed before padding so the offsets line up
/// with the input again.
pub fn slice_grad(
    input: &Tensor,
    out_grad: &Tensor,
    axes: &[usize],
    starts: &[i64],
    decrease_axes: &[usize],
) -> Result<Tensor, PrimGradError> {
    let in_shape = input.shape();
    let rank = in_shape.len();

    let out_dims = if decrease_axes.is_empty() {
        out_grad.shape()
    } else if decrease_axes.len() == rank {
        vec![1; rank]
    } else {
        let grad_shape = out_grad.shape();
        let mut origin = Vec::with_capacity(rank);
        let mut kept = grad_shape.iter();
        for i in 0..grad_shape.len() + decrease_axes.len() {
            if decrease_axes.contains(&i) {
                origin.push(1);
            } else {
                origin.push(*kept.next().ok_or_else(|| {
                    PrimGradError::InternalError(
                        "slice_grad: decrease axes exceed gradient rank".to_string(),
                    )
                })?);
            }
        }
        origin
    };

    let mut offsets = vec![0i64; rank];
    for (k, &axis) in axes.iter().enumerate() {
        if axis >= rank {
            return Err(PrimGradError::InvalidAxis {
                axis: axis as i64,
                rank,
            });
        }
        let dim = in_shape[axis] as i64;
        let start = if starts[k] < 0 { starts[k] + dim } else { starts[k] };
        offsets[axis] = start.clamp(0, dim);
    }

    let mut paddings = Vec::with_capacity(rank);
    for i in 0..rank {
        let before = offsets[i] as usize;
        let after = in_shape[i]
            .checked_sub(out_dims[i] + before)
            .ok_or_else(|| PrimGradError::SliceError {
                message: format!(
                    "slice_grad: gradient extent {} at offset {} exceeds input extent {} on axis {}",
                    out_dims[i], before, in_shape[i], i
                ),
            })?;
        paddings.push((before, after));
    }

    let restored = if out_dims == out_grad.shape() {
        out_grad.clone()
    } else {
        reshape_op(out_grad, &out_dims)?
    };
    pad_op(&restored, &paddings, 0.0)
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;
