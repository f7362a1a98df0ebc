//! Gradients of the broadcasting elementwise binary operators.
//!
//! Every branch follows the same shape discipline: compute the local
//! derivative times `out_grad` at the broadcast shape, then hand it to
//! [`reduce_broadcast`] against the operand's own shape. The resolver
//! short-circuits when no reduction is needed.

use crate::error::PrimGradError;
use crate::ops::arithmetic::{mul_op, neg_op, pow_op, recip_op, scale_op};
use crate::ops::cast::cast_op;
use crate::ops::comparison::{ge_op, gt_op, le_op, lt_op};
use crate::ops::unary::ln_op;
use crate::rules::broadcast::reduce_broadcast;
use crate::rules::BinaryGrads;
use crate::tensor::Tensor;

pub fn add_grad(
    x: &Tensor,
    y: &Tensor,
    out_grad: &Tensor,
    want_dx: bool,
    want_dy: bool,
) -> Result<BinaryGrads, PrimGradError> {
    let mut grads = BinaryGrads::default();
    if want_dx {
        grads.dx = Some(reduce_broadcast(out_grad, &x.shape())?);
    }
    if want_dy {
        grads.dy = Some(reduce_broadcast(out_grad, &y.shape())?);
    }
    Ok(grads)
}

pub fn subtract_grad(
    x: &Tensor,
    y: &Tensor,
    out_grad: &Tensor,
    want_dx: bool,
    want_dy: bool,
) -> Result<BinaryGrads, PrimGradError> {
    let mut grads = BinaryGrads::default();
    if want_dx {
        grads.dx = Some(reduce_broadcast(out_grad, &x.shape())?);
    }
    if want_dy {
        let dy_full = neg_op(out_grad)?;
        grads.dy = Some(reduce_broadcast(&dy_full, &y.shape())?);
    }
    Ok(grads)
}

pub fn multiply_grad(
    x: &Tensor,
    y: &Tensor,
    out_grad: &Tensor,
    want_dx: bool,
    want_dy: bool,
) -> Result<BinaryGrads, PrimGradError> {
    let mut grads = BinaryGrads::default();
    if want_dx {
        let dx_full = mul_op(out_grad, y)?;
        grads.dx = Some(reduce_broadcast(&dx_full, &x.shape())?);
    }
    if want_dy {
        let dy_full = mul_op(out_grad, x)?;
        grads.dy = Some(reduce_broadcast(&dy_full, &y.shape())?);
    }
    Ok(grads)
}

pub fn divide_grad(
    x: &Tensor,
    y: &Tensor,
    out_grad: &Tensor,
    want_dx: bool,
    want_dy: bool,
) -> Result<BinaryGrads, PrimGradError> {
    let mut grads = BinaryGrads::default();
    if want_dx {
        // dx = (1/y) * dout
        let dx_full = mul_op(&recip_op(y)?, out_grad)?;
        grads.dx = Some(reduce_broadcast(&dx_full, &x.shape())?);
    }
    if want_dy {
        // dy = -(x/y^2) * dout
        let y2 = mul_op(y, y)?;
        let ratio = neg_op(&mul_op(x, &recip_op(&y2)?)?)?;
        let dy_full = mul_op(&ratio, out_grad)?;
        grads.dy = Some(reduce_broadcast(&dy_full, &y.shape())?);
    }
    Ok(grads)
}

pub fn elementwise_pow_grad(
    x: &Tensor,
    y: &Tensor,
    out_grad: &Tensor,
    want_dx: bool,
    want_dy: bool,
) -> Result<BinaryGrads, PrimGradError> {
    let mut grads = BinaryGrads::default();
    if want_dx {
        // dx = y * x^(y-1) * dout
        let y_minus_one = scale_op(y, 1.0, -1.0)?;
        let dx_full = mul_op(&mul_op(y, &pow_op(x, &y_minus_one)?)?, out_grad)?;
        grads.dx = Some(reduce_broadcast(&dx_full, &x.shape())?);
    }
    if want_dy {
        // dy = ln(x) * x^y * dout
        let dy_full = mul_op(&mul_op(&ln_op(x)?, &pow_op(x, y)?)?, out_grad)?;
        grads.dy = Some(reduce_broadcast(&dy_full, &y.shape())?);
    }
    Ok(grads)
}

/// Ties go to y: the dx mask is strict `x > y`, the dy mask is `x <= y`, so
/// each output position contributes to exactly one operand.
pub fn maximum_grad(
    x: &Tensor,
    y: &Tensor,
    out_grad: &Tensor,
    want_dx: bool,
    want_dy: bool,
) -> Result<BinaryGrads, PrimGradError> {
    let mut grads = BinaryGrads::default();
    if want_dx {
        // the mask is cast to the gradient's dtype so dx keeps it
        let mask = cast_op(&gt_op(x, y)?, out_grad.dtype())?;
        grads.dx = Some(reduce_broadcast(&mul_op(out_grad, &mask)?, &x.shape())?);
    }
    if want_dy {
        let mask = cast_op(&le_op(x, y)?, out_grad.dtype())?;
        grads.dy = Some(reduce_broadcast(&mul_op(out_grad, &mask)?, &y.shape())?);
    }
    Ok(grads)
}

/// Mirror of [`maximum_grad`]: dx mask `x < y`, dy mask `x >= y`.
pub fn minimum_grad(
    x: &Tensor,
    y: &Tensor,
    out_grad: &Tensor,
    want_dx: bool,
    want_dy: bool,
) -> Result<BinaryGrads, PrimGradError> {
    let mut grads = BinaryGrads::default();
    if want_dx {
        let mask = cast_op(&lt_op(x, y)?, out_grad.dtype())?;
        grads.dx = Some(reduce_broadcast(&mul_op(out_grad, &mask)?, &x.shape())?);
    }
    if want_dy {
        let mask = cast_op(&ge_op(x, y)?, out_grad.dtype())?;
        grads.dy = Some(reduce_broadcast(&mul_op(out_grad, &mask)?, &y.shape())?);
    }
    Ok(grads)
}

#[cfg(test)]
#[path = "arithmetic_test.rs"]
mod tests;
