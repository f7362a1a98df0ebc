use half::{bf16, f16};

/// Defines the possible element types for Tensor values.
///
/// Values are always materialized as `f32` in the CPU buffer; the reduced
/// kinds round every stored value through the corresponding 16-bit format so
/// that reduced-precision arithmetic is actually lossy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// IEEE 754 half-precision (10-bit mantissa).
    F16,
    /// bfloat16 (8-bit exponent, 7-bit mantissa).
    BF16,
    /// 32-bit floating-point type.
    F32,
}

impl DType {
    /// True for the reduced-precision kinds the promotion policy applies to.
    pub fn is_reduced(&self) -> bool {
        matches!(self, DType::F16 | DType::BF16)
    }

    /// Rounds a value to the representable set of this dtype.
    pub(crate) fn round(&self, v: f32) -> f32 {
        match self {
            DType::F16 => f16::from_f32(v).to_f32(),
            DType::BF16 => bf16::from_f32(v).to_f32(),
            DType::F32 => v,
        }
    }

    /// Result dtype of a binary op over two operands.
    ///
    /// Equal kinds keep their kind; any mismatch widens to F32.
    pub(crate) fn promote(a: DType, b: DType) -> DType {
        if a == b {
            a
        } else {
            DType::F32
        }
    }
}
