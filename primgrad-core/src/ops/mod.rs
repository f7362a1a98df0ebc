//! Forward primitive operation set over the CPU reference [`Tensor`].
//!
//! Every gradient rule is expressed exclusively in terms of these functions,
//! so swapping the execution layer means re-providing this surface.

pub mod arithmetic;
pub mod cast;
pub mod comparison;
pub mod indexing;
pub mod reduction;
pub mod unary;
pub mod view;

use crate::error::PrimGradError;
use crate::tensor::utils::{
    broadcast_shapes, calculate_strides, coord_to_index_broadcasted, index_to_coord,
};
use crate::tensor::Tensor;
use crate::types::DType;

/// Shared kernel for broadcasting elementwise binary ops.
///
/// The result dtype follows [`DType::promote`] and the values are rounded
/// through it, so reduced-precision operands stay lossy step by step.
pub(crate) fn broadcast_zip<F>(
    a: &Tensor,
    b: &Tensor,
    f: F,
) -> Result<Tensor, PrimGradError>
where
    F: Fn(f32, f32) -> f32,
{
    broadcast_zip_dtype(a, b, DType::promote(a.dtype(), b.dtype()), f)
}

pub(crate) fn broadcast_zip_dtype<F>(
    a: &Tensor,
    b: &Tensor,
    out_dtype: DType,
    f: F,
) -> Result<Tensor, PrimGradError>
where
    F: Fn(f32, f32) -> f32,
{
    let a_shape = a.shape();
    let b_shape = b.shape();
    let out_shape = broadcast_shapes(&a_shape, &b_shape)?;
    let out_strides = calculate_strides(&out_shape);
    let numel: usize = out_shape.iter().product();

    let a_strides = a.strides();
    let b_strides = b.strides();
    let a_vals = a.values();
    let b_vals = b.values();

    let mut out = Vec::with_capacity(numel);
    for i in 0..numel {
        let coords = index_to_coord(i, &out_strides, &out_shape);
        let ia = coord_to_index_broadcasted(&coords, &a_shape, &a_strides);
        let ib = coord_to_index_broadcasted(&coords, &b_shape, &b_strides);
        out.push(f(a_vals[ia], b_vals[ib]));
    }
    Tensor::new_with_dtype(out, out_shape, out_dtype)
}

/// Shared kernel for elementwise unary ops; preserves the input dtype.
pub(crate) fn unary_map<F>(t: &Tensor, f: F) -> Result<Tensor, PrimGradError>
where
    F: Fn(f32) -> f32,
{
    let out: Vec<f32> = t.values().iter().map(|&v| f(v)).collect();
    Tensor::new_with_dtype(out, t.shape(), t.dtype())
}
