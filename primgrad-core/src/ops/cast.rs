//! Datatype conversion.

use crate::error::PrimGradError;
use crate::tensor::Tensor;
use crate::types::DType;

/// Casts a tensor to another dtype, re-rounding values through the target's
/// representable set. A widening cast preserves values exactly.
pub fn cast_op(t: &Tensor, dtype: DType) -> Result<Tensor, PrimGradError> {
    if t.dtype() == dtype {
        return Ok(t.clone());
    }
    Tensor::new_with_dtype(t.values().to_vec(), t.shape(), dtype)
}
