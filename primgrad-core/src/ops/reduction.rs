//! Reduction operations and their axis bookkeeping.

use crate::error::PrimGradError;
use crate::tensor::utils::{calculate_strides, index_to_coord, normalize_axes};
use crate::tensor::Tensor;

/// Processes the axes provided for a reduction operation.
///
/// - `None` or an empty slice means "reduce over all axes".
/// - Negative axes are resolved against the rank; the result is sorted,
///   de-duplicated and validated.
pub(crate) fn process_reduction_axes(
    rank: usize,
    axes: Option<&[i64]>,
) -> Result<Vec<usize>, PrimGradError> {
    match axes {
        None => Ok((0..rank).collect()),
        Some(ax) if ax.is_empty() => Ok((0..rank).collect()),
        Some(ax) => normalize_axes(ax, rank),
    }
}

/// Calculates the output shape after a reduction over `axes` (already
/// normalized). With `keep_dims`, reduced axes stay as size 1; otherwise they
/// are dropped (a full reduction yields the scalar shape `[]`).
pub(crate) fn calculate_reduction_output_shape(
    input_shape: &[usize],
    axes: &[usize],
    keep_dims: bool,
) -> Vec<usize> {
    let mut output_shape = Vec::with_capacity(input_shape.len());
    for (i, &dim) in input_shape.iter().enumerate() {
        if axes.contains(&i) {
            if keep_dims {
                output_shape.push(1);
            }
        } else {
            output_shape.push(dim);
        }
    }
    output_shape
}

/// Reinserts size-1 axes at the positions a `keep_dims = false` reduction
/// dropped, recovering a shape that broadcasts against the pre-reduction one.
pub(crate) fn unsqueeze_dims(reduced_shape: &[usize], axes: &[usize]) -> Vec<usize> {
    let rank = reduced_shape.len() + axes.len();
    let mut out = Vec::with_capacity(rank);
    let mut kept = reduced_shape.iter();
    for i in 0..rank {
        if axes.contains(&i) {
            out.push(1);
        } else {
            out.push(*kept.next().unwrap_or(&1));
        }
    }
    out
}

fn reduce_kernel<F>(
    input: &Tensor,
    axes: Option<&[i64]>,
    keep_dims: bool,
    init: f32,
    fold: F,
) -> Result<Tensor, PrimGradError>
where
    F: Fn(f32, f32) -> f32,
{
    let input_shape = input.shape();
    let rank = input_shape.len();
    let processed = process_reduction_axes(rank, axes)?;
    let output_shape = calculate_reduction_output_shape(&input_shape, &processed, keep_dims);

    let out_numel: usize = output_shape.iter().product();
    let mut acc = vec![init; out_numel];

    // Map each input element onto its output slot by zeroing reduced coords.
    let input_strides = input.strides();
    let out_keep_shape = calculate_reduction_output_shape(&input_shape, &processed, true);
    let out_keep_strides = calculate_strides(&out_keep_shape);

    for i in 0..input.numel() {
        let coords = index_to_coord(i, &input_strides, &input_shape);
        let mut slot = 0;
        for (d, &c) in coords.iter().enumerate() {
            let effective = if processed.contains(&d) { 0 } else { c };
            slot += effective * out_keep_strides[d];
        }
        acc[slot] = fold(acc[slot], input.values()[i]);
    }

    Tensor::new_with_dtype(acc, output_shape, input.dtype())
}

/// Sums elements along the given axes. `None`/empty axes sum everything.
pub fn sum_op(
    input: &Tensor,
    axes: Option<&[i64]>,
    keep_dims: bool,
) -> Result<Tensor, PrimGradError> {
    reduce_kernel(input, axes, keep_dims, 0.0, |a, v| a + v)
}

/// Maximum along the given axes.
pub fn max_op(
    input: &Tensor,
    axes: Option<&[i64]>,
    keep_dims: bool,
) -> Result<Tensor, PrimGradError> {
    reduce_kernel(input, axes, keep_dims, f32::NEG_INFINITY, f32::max)
}

/// Product along the given axes.
pub fn prod_op(
    input: &Tensor,
    axes: Option<&[i64]>,
    keep_dims: bool,
) -> Result<Tensor, PrimGradError> {
    reduce_kernel(input, axes, keep_dims, 1.0, |a, v| a * v)
}

/// Running sum along one axis.
///
/// With `flatten` the input is treated as one flat line and the output is
/// rank 1. `exclusive` shifts the scan so each slot sums strictly preceding
/// elements; `reverse` scans from the trailing end instead.
pub fn cumsum_op(
    input: &Tensor,
    axis: i64,
    flatten: bool,
    exclusive: bool,
    reverse: bool,
) -> Result<Tensor, PrimGradError> {
    let (shape, axis) = if flatten {
        (vec![input.numel()], 0)
    } else {
        let shape = input.shape();
        let axis = crate::tensor::utils::normalize_axis(axis, shape.len().max(1))?;
        (shape, axis)
    };
    if shape.is_empty() {
        return Tensor::new_with_dtype(input.values().to_vec(), shape, input.dtype());
    }

    let extent = shape[axis];
    let inner: usize = shape[axis + 1..].iter().product();
    let outer: usize = shape[..axis].iter().product();

    let values = input.values();
    let mut data = vec![0.0; input.numel()];
    for o in 0..outer {
        for i in 0..inner {
            let base = o * extent * inner + i;
            let mut acc = 0.0;
            for j in 0..extent {
                let j = if reverse { extent - 1 - j } else { j };
                let idx = base + j * inner;
                if exclusive {
                    data[idx] = acc;
                    acc += values[idx];
                } else {
                    acc += values[idx];
                    data[idx] = acc;
                }
            }
        }
    }
    Tensor::new_with_dtype(data, shape, input.dtype())
}
