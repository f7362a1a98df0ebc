//! Gather/scatter primitives. Leading-axis scatter follows the reference
//! framework's semantics: indexed rows are zeroed first, then updates are
//! assigned (overwrite) or accumulated.

use crate::error::PrimGradError;
use crate::tensor::utils::index_to_coord;
use crate::tensor::Tensor;

fn row_extent(shape: &[usize]) -> usize {
    shape[1..].iter().product()
}

fn check_row(i: usize, rows: usize, shape: &[usize]) -> Result<(), PrimGradError> {
    if i >= rows {
        return Err(PrimGradError::IndexOutOfBounds {
            index: vec![i],
            shape: shape.to_vec(),
        });
    }
    Ok(())
}

/// Gathers rows of `x` (along axis 0) at the given index tensor. The output
/// shape is `index.shape ++ x.shape[1..]`.
pub fn gather_op(x: &Tensor, index: &Tensor) -> Result<Tensor, PrimGradError> {
    let x_shape = x.shape();
    if x_shape.is_empty() {
        return Err(PrimGradError::UnsupportedOperation(
            "gather on rank-0 tensor".to_string(),
        ));
    }
    let ids = index.to_index_vec()?;
    let inner = row_extent(&x_shape);
    let mut out_shape = index.shape();
    out_shape.extend_from_slice(&x_shape[1..]);

    let mut data = Vec::with_capacity(ids.len() * inner);
    for &i in &ids {
        check_row(i, x_shape[0], &x_shape)?;
        data.extend_from_slice(&x.values()[i * inner..(i + 1) * inner]);
    }
    Tensor::new_with_dtype(data, out_shape, x.dtype())
}

/// Scatters `updates` rows into `x` (along axis 0) at `index`.
///
/// Indexed rows of `x` are first zeroed; with `overwrite` each update row is
/// then assigned (duplicates: last wins), otherwise accumulated.
pub fn scatter_op(
    x: &Tensor,
    index: &Tensor,
    updates: &Tensor,
    overwrite: bool,
) -> Result<Tensor, PrimGradError> {
    let x_shape = x.shape();
    if x_shape.is_empty() {
        return Err(PrimGradError::UnsupportedOperation(
            "scatter on rank-0 tensor".to_string(),
        ));
    }
    let ids = index.to_index_vec()?;
    let inner = row_extent(&x_shape);
    if updates.numel() != ids.len() * inner {
        return Err(PrimGradError::ShapeMismatch {
            expected: vec![ids.len(), inner],
            actual: updates.shape(),
            operation: "scatter".to_string(),
        });
    }

    let mut data = x.values().to_vec();
    for &i in &ids {
        check_row(i, x_shape[0], &x_shape)?;
        data[i * inner..(i + 1) * inner].fill(0.0);
    }
    for (k, &i) in ids.iter().enumerate() {
        let upd = &updates.values()[k * inner..(k + 1) * inner];
        let dst = &mut data[i * inner..(i + 1) * inner];
        if overwrite {
            dst.copy_from_slice(upd);
        } else {
            for (d, &u) in dst.iter_mut().zip(upd.iter()) {
                *d += u;
            }
        }
    }
    Tensor::new_with_dtype(data, x_shape, x.dtype())
}

/// N-dimensional gather. `index` has shape `[..., k]`; each trailing vector
/// picks the sub-tensor `x[i0, …, i(k-1)]`, so the output shape is
/// `index.shape[..-1] ++ x.shape[k..]`.
pub fn gather_nd_op(x: &Tensor, index: &Tensor) -> Result<Tensor, PrimGradError> {
    let x_shape = x.shape();
    let idx_shape = index.shape();
    let k = *idx_shape.last().ok_or_else(|| {
        PrimGradError::UnsupportedOperation("gather_nd with rank-0 index".to_string())
    })?;
    if k > x_shape.len() {
        return Err(PrimGradError::InvalidAxis {
            axis: k as i64,
            rank: x_shape.len(),
        });
    }
    let ids = index.to_index_vec()?;
    let suffix: usize = x_shape[k..].iter().product();
    let strides = x.strides();

    let mut out_shape = idx_shape[..idx_shape.len() - 1].to_vec();
    out_shape.extend_from_slice(&x_shape[k..]);

    let mut data = Vec::with_capacity(ids.len() / k.max(1) * suffix);
    for chunk in ids.chunks(k) {
        let mut offset = 0;
        for (j, &i) in chunk.iter().enumerate() {
            check_row(i, x_shape[j], &x_shape)?;
            offset += i * strides[j];
        }
        data.extend_from_slice(&x.values()[offset..offset + suffix]);
    }
    Tensor::new_with_dtype(data, out_shape, x.dtype())
}

/// N-dimensional scatter-add, the dual of [`gather_nd_op`].
pub fn scatter_nd_add_op(
    x: &Tensor,
    index: &Tensor,
    updates: &Tensor,
) -> Result<Tensor, PrimGradError> {
    let x_shape = x.shape();
    let idx_shape = index.shape();
    let k = *idx_shape.last().ok_or_else(|| {
        PrimGradError::UnsupportedOperation("scatter_nd_add with rank-0 index".to_string())
    })?;
    if k > x_shape.len() {
        return Err(PrimGradError::InvalidAxis {
            axis: k as i64,
            rank: x_shape.len(),
        });
    }
    let ids = index.to_index_vec()?;
    let suffix: usize = x_shape[k..].iter().product();
    let num_vectors = ids.len() / k.max(1);
    if updates.numel() != num_vectors * suffix {
        return Err(PrimGradError::ShapeMismatch {
            expected: vec![num_vectors, suffix],
            actual: updates.shape(),
            operation: "scatter_nd_add".to_string(),
        });
    }
    let strides = x.strides();

    let mut data = x.values().to_vec();
    for (v, chunk) in ids.chunks(k).enumerate() {
        let mut offset = 0;
        for (j, &i) in chunk.iter().enumerate() {
            check_row(i, x_shape[j], &x_shape)?;
            offset += i * strides[j];
        }
        let upd = &updates.values()[v * suffix..(v + 1) * suffix];
        for (d, &u) in data[offset..offset + suffix].iter_mut().zip(upd.iter()) {
            *d += u;
        }
    }
    Tensor::new_with_dtype(data, x_shape, x.dtype())
}

/// Writes `values` into `base` at per-element positions along `axis`.
/// `indices` and `values` share a shape; every other coordinate is taken
/// from the element's own position.
pub fn put_along_axis_op(
    base: &Tensor,
    indices: &Tensor,
    values: &Tensor,
    axis: usize,
) -> Result<Tensor, PrimGradError> {
    let base_shape = base.shape();
    let rank = base_shape.len();
    if axis >= rank {
        return Err(PrimGradError::InvalidAxis {
            axis: axis as i64,
            rank,
        });
    }
    if indices.shape() != values.shape() || indices.rank() != rank {
        return Err(PrimGradError::ShapeMismatch {
            expected: indices.shape(),
            actual: values.shape(),
            operation: "put_along_axis".to_string(),
        });
    }

    let idx_shape = indices.shape();
    let idx_strides = indices.strides();
    let base_strides = base.strides();
    let ids = indices.to_index_vec()?;

    let mut data = base.values().to_vec();
    for p in 0..indices.numel() {
        let mut coords = index_to_coord(p, &idx_strides, &idx_shape);
        let target = ids[p];
        check_row(target, base_shape[axis], &base_shape)?;
        coords[axis] = target;
        let mut offset = 0;
        for (d, &c) in coords.iter().enumerate() {
            offset += c * base_strides[d];
        }
        data[offset] = values.values()[p];
    }
    Tensor::new_with_dtype(data, base_shape, base.dtype())
}
