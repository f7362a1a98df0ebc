//! Shape-manipulation operations. Inputs are contiguous, so these all
//! materialize a fresh buffer rather than adjusting strides.

use crate::error::PrimGradError;
use crate::tensor::utils::{
    calculate_strides, coord_to_index_broadcasted, index_to_coord, normalize_axis,
};
use crate::tensor::Tensor;
use crate::types::DType;

/// Reinterprets the buffer under a new shape with the same element count.
pub fn reshape_op(t: &Tensor, new_shape: &[usize]) -> Result<Tensor, PrimGradError> {
    let new_numel: usize = new_shape.iter().product();
    if new_numel != t.numel() {
        return Err(PrimGradError::ShapeMismatch {
            expected: t.shape(),
            actual: new_shape.to_vec(),
            operation: "reshape".to_string(),
        });
    }
    Tensor::new_with_dtype(t.values().to_vec(), new_shape.to_vec(), t.dtype())
}

/// Permutes axes. `perm` may contain negative entries; it must be a
/// permutation of `0..rank`.
pub fn transpose_op(t: &Tensor, perm: &[i64]) -> Result<Tensor, PrimGradError> {
    let rank = t.rank();
    if perm.len() != rank {
        return Err(PrimGradError::InvalidPermutation {
            dims: perm.to_vec(),
            rank,
        });
    }
    let mut resolved = Vec::with_capacity(rank);
    for &p in perm {
        resolved.push(normalize_axis(p, rank)?);
    }
    let mut seen = vec![false; rank];
    for &p in &resolved {
        if seen[p] {
            return Err(PrimGradError::InvalidPermutation {
                dims: perm.to_vec(),
                rank,
            });
        }
        seen[p] = true;
    }

    let in_shape = t.shape();
    let in_strides = t.strides();
    let out_shape: Vec<usize> = resolved.iter().map(|&p| in_shape[p]).collect();
    let out_strides = calculate_strides(&out_shape);

    let mut data = Vec::with_capacity(t.numel());
    for i in 0..t.numel() {
        let out_coords = index_to_coord(i, &out_strides, &out_shape);
        let mut offset = 0;
        for (d, &c) in out_coords.iter().enumerate() {
            offset += c * in_strides[resolved[d]];
        }
        data.push(t.values()[offset]);
    }
    Tensor::new_with_dtype(data, out_shape, t.dtype())
}

/// Broadcasts a tensor up to `target_shape` (right-justified alignment;
/// every source axis must match the target or have extent 1).
pub fn expand_op(t: &Tensor, target_shape: &[usize]) -> Result<Tensor, PrimGradError> {
    let src_shape = t.shape();
    if target_shape.len() < src_shape.len() {
        return Err(PrimGradError::BroadcastError {
            shape1: src_shape,
            shape2: target_shape.to_vec(),
        });
    }
    let rank_diff = target_shape.len() - src_shape.len();
    for (i, &s) in src_shape.iter().enumerate() {
        let tdim = target_shape[rank_diff + i];
        if s != tdim && s != 1 {
            return Err(PrimGradError::BroadcastError {
                shape1: src_shape.clone(),
                shape2: target_shape.to_vec(),
            });
        }
    }

    let out_strides = calculate_strides(target_shape);
    let numel: usize = target_shape.iter().product();
    let src_strides = t.strides();
    let mut data = Vec::with_capacity(numel);
    for i in 0..numel {
        let coords = index_to_coord(i, &out_strides, target_shape);
        data.push(t.values()[coord_to_index_broadcasted(&coords, &src_shape, &src_strides)]);
    }
    Tensor::new_with_dtype(data, target_shape.to_vec(), t.dtype())
}

/// Repeats the tensor `repeat_times[d]` times along each axis.
/// `repeat_times` must cover every axis.
pub fn tile_op(t: &Tensor, repeat_times: &[usize]) -> Result<Tensor, PrimGradError> {
    let in_shape = t.shape();
    if repeat_times.len() != in_shape.len() {
        return Err(PrimGradError::ShapeMismatch {
            expected: in_shape,
            actual: repeat_times.to_vec(),
            operation: "tile".to_string(),
        });
    }
    let out_shape: Vec<usize> = in_shape
        .iter()
        .zip(repeat_times.iter())
        .map(|(&d, &r)| d * r)
        .collect();
    let out_strides = calculate_strides(&out_shape);
    let in_strides = t.strides();
    let numel: usize = out_shape.iter().product();

    let mut data = Vec::with_capacity(numel);
    for i in 0..numel {
        let coords = index_to_coord(i, &out_strides, &out_shape);
        let mut offset = 0;
        for (d, &c) in coords.iter().enumerate() {
            offset += (c % in_shape[d]) * in_strides[d];
        }
        data.push(t.values()[offset]);
    }
    Tensor::new_with_dtype(data, out_shape, t.dtype())
}

/// Extracts `[start, end)` along each listed axis. Negative starts/ends are
/// resolved against the extent and clamped.
pub fn slice_op(
    t: &Tensor,
    axes: &[usize],
    starts: &[i64],
    ends: &[i64],
) -> Result<Tensor, PrimGradError> {
    if axes.len() != starts.len() || axes.len() != ends.len() {
        return Err(PrimGradError::SliceError {
            message: format!(
                "axes/starts/ends length mismatch: {}/{}/{}",
                axes.len(),
                starts.len(),
                ends.len()
            ),
        });
    }
    let in_shape = t.shape();
    let rank = in_shape.len();
    let mut offsets = vec![0usize; rank];
    let mut out_shape = in_shape.clone();
    for (k, &axis) in axes.iter().enumerate() {
        if axis >= rank {
            return Err(PrimGradError::InvalidAxis {
                axis: axis as i64,
                rank,
            });
        }
        let dim = in_shape[axis] as i64;
        let mut start = if starts[k] < 0 { starts[k] + dim } else { starts[k] };
        start = start.clamp(0, dim);
        let mut end = if ends[k] < 0 { ends[k] + dim } else { ends[k] };
        end = end.clamp(start, dim);
        offsets[axis] = start as usize;
        out_shape[axis] = (end - start) as usize;
    }

    let out_strides = calculate_strides(&out_shape);
    let in_strides = t.strides();
    let numel: usize = out_shape.iter().product();
    let mut data = Vec::with_capacity(numel);
    for i in 0..numel {
        let coords = index_to_coord(i, &out_strides, &out_shape);
        let mut offset = 0;
        for (d, &c) in coords.iter().enumerate() {
            offset += (c + offsets[d]) * in_strides[d];
        }
        data.push(t.values()[offset]);
    }
    Tensor::new_with_dtype(data, out_shape, t.dtype())
}

/// Pads with a constant value; `paddings[d] = (before, after)` per axis.
pub fn pad_op(
    t: &Tensor,
    paddings: &[(usize, usize)],
    value: f32,
) -> Result<Tensor, PrimGradError> {
    let in_shape = t.shape();
    if paddings.len() != in_shape.len() {
        return Err(PrimGradError::ShapeMismatch {
            expected: in_shape,
            actual: paddings.iter().map(|p| p.0).collect(),
            operation: "pad".to_string(),
        });
    }
    let out_shape: Vec<usize> = in_shape
        .iter()
        .zip(paddings.iter())
        .map(|(&d, &(b, a))| b + d + a)
        .collect();
    let out_strides = calculate_strides(&out_shape);
    let in_strides = t.strides();
    let numel: usize = out_shape.iter().product();

    let mut data = vec![value; numel];
    for i in 0..t.numel() {
        let coords = index_to_coord(i, &in_strides, &in_shape);
        let mut offset = 0;
        for (d, &c) in coords.iter().enumerate() {
            offset += (c + paddings[d].0) * out_strides[d];
        }
        data[offset] = t.values()[i];
    }
    Tensor::new_with_dtype(data, out_shape, t.dtype())
}

/// Concatenates tensors along a (normalized) axis.
pub fn concat_op(tensors: &[Tensor], axis: usize) -> Result<Tensor, PrimGradError> {
    let first = tensors.first().ok_or(PrimGradError::EmptyTensorList)?;
    let rank = first.rank();
    if axis >= rank {
        return Err(PrimGradError::InvalidAxis {
            axis: axis as i64,
            rank,
        });
    }
    let base_shape = first.shape();
    let mut axis_total = 0;
    let mut dtype = first.dtype();
    for t in tensors {
        let s = t.shape();
        if s.len() != rank
            || s.iter()
                .enumerate()
                .any(|(d, &e)| d != axis && e != base_shape[d])
        {
            return Err(PrimGradError::ShapeMismatch {
                expected: base_shape,
                actual: s,
                operation: "concat".to_string(),
            });
        }
        axis_total += s[axis];
        dtype = DType::promote(dtype, t.dtype());
    }

    let mut out_shape = base_shape.clone();
    out_shape[axis] = axis_total;
    let outer: usize = base_shape[..axis].iter().product();
    let inner: usize = base_shape[axis + 1..].iter().product();

    let mut data = Vec::with_capacity(out_shape.iter().product());
    for o in 0..outer {
        for t in tensors {
            let rows = t.shape()[axis];
            let block = rows * inner;
            let src = &t.values()[o * block..(o + 1) * block];
            data.extend_from_slice(src);
        }
    }
    Tensor::new_with_dtype(data, out_shape, dtype)
}

/// Splits a tensor into sections along a (normalized) axis; the section
/// extents must sum to the axis extent. Exact inverse of [`concat_op`].
pub fn split_op(
    t: &Tensor,
    sections: &[usize],
    axis: usize,
) -> Result<Vec<Tensor>, PrimGradError> {
    let in_shape = t.shape();
    let rank = in_shape.len();
    if axis >= rank {
        return Err(PrimGradError::InvalidAxis {
            axis: axis as i64,
            rank,
        });
    }
    if sections.iter().sum::<usize>() != in_shape[axis] {
        return Err(PrimGradError::SliceError {
            message: format!(
                "split sections {:?} do not cover extent {} on axis {}",
                sections, in_shape[axis], axis
            ),
        });
    }

    let outer: usize = in_shape[..axis].iter().product();
    let inner: usize = in_shape[axis + 1..].iter().product();
    let row = in_shape[axis] * inner;

    let mut out = Vec::with_capacity(sections.len());
    let mut start = 0;
    for &sec in sections {
        let mut shape = in_shape.clone();
        shape[axis] = sec;
        let mut data = Vec::with_capacity(outer * sec * inner);
        for o in 0..outer {
            let base = o * row + start * inner;
            data.extend_from_slice(&t.values()[base..base + sec * inner]);
        }
        out.push(Tensor::new_with_dtype(data, shape, t.dtype())?);
        start += sec;
    }
    Ok(out)
}

/// Cyclically shifts elements along the given axes.
pub fn roll_op(t: &Tensor, shifts: &[i64], axes: &[i64]) -> Result<Tensor, PrimGradError> {
    if shifts.len() != axes.len() {
        return Err(PrimGradError::ShapeMismatch {
            expected: vec![shifts.len()],
            actual: vec![axes.len()],
            operation: "roll".to_string(),
        });
    }
    let in_shape = t.shape();
    let rank = in_shape.len();
    let mut shift_per_axis = vec![0i64; rank];
    for (k, &a) in axes.iter().enumerate() {
        let axis = normalize_axis(a, rank)?;
        shift_per_axis[axis] += shifts[k];
    }

    let strides = t.strides();
    let mut data = Vec::with_capacity(t.numel());
    for i in 0..t.numel() {
        let coords = index_to_coord(i, &strides, &in_shape);
        let mut offset = 0;
        for (d, &c) in coords.iter().enumerate() {
            let dim = in_shape[d] as i64;
            let src = (c as i64 - shift_per_axis[d]).rem_euclid(dim);
            offset += (src as usize) * strides[d];
        }
        data.push(t.values()[offset]);
    }
    Tensor::new_with_dtype(data, in_shape, t.dtype())
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;
