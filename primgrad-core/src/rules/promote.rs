//! Mixed-precision promotion used by numerically sensitive rules.
//!
//! A handful of rules (gelu, layer_norm, instance_norm, exp, silu) widen
//! reduced-precision operands to F32 before doing arithmetic and cast the
//! resulting gradient back to the original dtype at the end. Everything
//! else computes in the operand dtype.

use crate::error::PrimGradError;
use crate::ops::cast::cast_op;
use crate::tensor::Tensor;
use crate::types::DType;

/// Widens `t` to F32 when it carries a reduced dtype; otherwise a cheap clone.
pub(crate) fn promote_if_reduced(t: &Tensor) -> Result<Tensor, PrimGradError> {
    if t.dtype().is_reduced() {
        cast_op(t, DType::F32)
    } else {
        Ok(t.clone())
    }
}

/// Casts a gradient computed in F32 back to the dtype of the forward operand.
pub(crate) fn restore_dtype(grad: &Tensor, dtype: DType) -> Result<Tensor, PrimGradError> {
    if grad.dtype() == dtype {
        Ok(grad.clone())
    } else {
        cast_op(grad, dtype)
    }
}
