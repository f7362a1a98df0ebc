use crate::types::DType;
use thiserror::Error;

/// Custom error type for the PrimGrad rule library.
#[derive(Error, Debug, PartialEq, Clone)] // PartialEq for easier testing
pub enum PrimGradError {
    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("Cannot broadcast shapes: {shape1:?} and {shape2:?}")]
    BroadcastError {
        shape1: Vec<usize>,
        shape2: Vec<usize>,
    },

    #[error("Invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: i64, rank: usize },

    #[error("Index out of bounds: index {index:?} for shape {shape:?}")]
    IndexOutOfBounds {
        index: Vec<usize>,
        shape: Vec<usize>,
    },

    #[error("Slice error: {message}")]
    SliceError { message: String },

    #[error("Invalid permutation: dims {dims:?} are not a valid permutation for rank {rank}")]
    InvalidPermutation { dims: Vec<i64>, rank: usize },

    #[error("Tensor creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreationError { data_len: usize, shape: Vec<usize> },

    #[error("Unsupported dtype {dtype:?} for operation {operation}")]
    UnsupportedDType { dtype: DType, operation: String },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Cannot concatenate an empty list of tensors")]
    EmptyTensorList,

    #[error("Internal error: {0}")]
    InternalError(String),
}
