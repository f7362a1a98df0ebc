//! Elementwise comparisons producing 0/1 masks, and conditional select.

use super::broadcast_zip_dtype;
use crate::error::PrimGradError;
use crate::tensor::utils::{
    broadcast_shapes, calculate_strides, coord_to_index_broadcasted, index_to_coord,
};
use crate::tensor::Tensor;
use crate::types::DType;

fn mask(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// `a > b`, elementwise with broadcasting; F32 0/1 mask.
pub fn gt_op(a: &Tensor, b: &Tensor) -> Result<Tensor, PrimGradError> {
    broadcast_zip_dtype(a, b, DType::F32, |x, y| mask(x > y))
}

pub fn ge_op(a: &Tensor, b: &Tensor) -> Result<Tensor, PrimGradError> {
    broadcast_zip_dtype(a, b, DType::F32, |x, y| mask(x >= y))
}

pub fn lt_op(a: &Tensor, b: &Tensor) -> Result<Tensor, PrimGradError> {
    broadcast_zip_dtype(a, b, DType::F32, |x, y| mask(x < y))
}

pub fn le_op(a: &Tensor, b: &Tensor) -> Result<Tensor, PrimGradError> {
    broadcast_zip_dtype(a, b, DType::F32, |x, y| mask(x <= y))
}

pub fn eq_op(a: &Tensor, b: &Tensor) -> Result<Tensor, PrimGradError> {
    broadcast_zip_dtype(a, b, DType::F32, |x, y| mask(x == y))
}

/// Selects `a` where `cond` is non-zero, `b` elsewhere. All three operands
/// broadcast together; the result dtype follows `a` and `b`.
pub fn where_op(cond: &Tensor, a: &Tensor, b: &Tensor) -> Result<Tensor, PrimGradError> {
    let ab_shape = broadcast_shapes(&a.shape(), &b.shape())?;
    let out_shape = broadcast_shapes(&cond.shape(), &ab_shape)?;
    let out_strides = calculate_strides(&out_shape);
    let numel: usize = out_shape.iter().product();

    let (c_shape, c_strides, c_vals) = (cond.shape(), cond.strides(), cond.values());
    let (a_shape, a_strides, a_vals) = (a.shape(), a.strides(), a.values());
    let (b_shape, b_strides, b_vals) = (b.shape(), b.strides(), b.values());

    let mut data = Vec::with_capacity(numel);
    for i in 0..numel {
        let coords = index_to_coord(i, &out_strides, &out_shape);
        let c = c_vals[coord_to_index_broadcasted(&coords, &c_shape, &c_strides)];
        let picked = if c != 0.0 {
            a_vals[coord_to_index_broadcasted(&coords, &a_shape, &a_strides)]
        } else {
            b_vals[coord_to_index_broadcasted(&coords, &b_shape, &b_strides)]
        };
        data.push(picked);
    }
    Tensor::new_with_dtype(data, out_shape, DType::promote(a.dtype(), b.dtype()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gt_mask() {
        let a = Tensor::new(vec![1.0, 5.0, 3.0], vec![3]).unwrap();
        let b = Tensor::new(vec![2.0, 2.0, 3.0], vec![3]).unwrap();
        assert_eq!(gt_op(&a, &b).unwrap().values(), &[0.0, 1.0, 0.0]);
        assert_eq!(le_op(&a, &b).unwrap().values(), &[1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_where_select() {
        let cond = Tensor::new(vec![1.0, 0.0, 1.0], vec![3]).unwrap();
        let a = Tensor::new(vec![10.0, 20.0, 30.0], vec![3]).unwrap();
        let b = Tensor::new(vec![-1.0, -2.0, -3.0], vec![3]).unwrap();
        assert_eq!(where_op(&cond, &a, &b).unwrap().values(), &[10.0, -2.0, 30.0]);
    }

    #[test]
    fn test_eq_broadcast() {
        let a = Tensor::new(vec![3.0, 3.0, 1.0], vec![3]).unwrap();
        let m = Tensor::scalar(3.0);
        assert_eq!(eq_op(&a, &m).unwrap().values(), &[1.0, 1.0, 0.0]);
    }
}
