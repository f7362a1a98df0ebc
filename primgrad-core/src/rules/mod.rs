//! Per-operator vector-Jacobian-product (VJP) rules.
//!
//! Each rule is a pure, stateless function taking the forward-pass tensors it
//! needs (inputs, and outputs where the formula uses them), the incoming
//! output gradient, and any static attributes, and returning the gradient for
//! its differentiable inputs. Multi-output rules take `want_*` flags and
//! return a struct with one `Option<Tensor>` per potential gradient; an
//! unrequested output is never computed, and skipping one never changes the
//! value of a requested one.
//!
//! Rules never mutate their inputs. Gradient accumulation across consumers is
//! the caller's business; each rule returns only its local contribution.

pub mod activation;
pub mod arithmetic;
pub mod broadcast;
pub mod indexing;
pub mod norm;
pub(crate) mod promote;
pub mod reduction;
pub mod unary;
pub mod view;

use crate::tensor::Tensor;

/// Gradients of a two-input elementwise rule.
#[derive(Debug, Clone, Default)]
pub struct BinaryGrads {
    pub dx: Option<Tensor>,
    pub dy: Option<Tensor>,
}

/// Gradients of the scatter-family rules.
#[derive(Debug, Clone, Default)]
pub struct ScatterGrads {
    pub dx: Option<Tensor>,
    pub dupdates: Option<Tensor>,
}

/// Gradients of the affine normalization rules.
#[derive(Debug, Clone, Default)]
pub struct NormGrads {
    pub dx: Option<Tensor>,
    pub dscale: Option<Tensor>,
    pub dbias: Option<Tensor>,
}

pub use activation::DropoutMode;
