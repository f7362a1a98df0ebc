//! Finite-difference validation of gradient rules.
//!
//! Rules are pure functions, so the checker takes the forward computation as
//! a closure together with the analytic gradients the rule produced, and
//! compares them element by element against central differences of the
//! scalar loss `sum(forward(inputs) * out_grad)`. Losses accumulate in f64
//! to keep the comparison meaningful at f32 input precision.

use crate::error::PrimGradError;
use crate::tensor::Tensor;
use crate::types::DType;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("gradient mismatch for input {input_index} element {element_index}: analytic {analytical_grad} vs numerical {numerical_grad} (diff {difference})")]
    GradientMismatch {
        input_index: usize,
        element_index: usize,
        analytical_grad: f64,
        numerical_grad: f64,
        difference: f64,
    },
    #[error("forward pass failed during gradient check: {0}")]
    ForwardPassError(PrimGradError),
    #[error("analytic gradient for input {input_index} has shape {actual:?}, expected {expected:?}")]
    GradShapeMismatch {
        input_index: usize,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("gradient check requires F32 tensors, got {0:?}")]
    UnsupportedDType(DType),
    #[error("numerical gradient is not finite for input {input_index} element {element_index} (loss+ {loss_plus}, loss- {loss_minus})")]
    NumericalGradNaNOrInfinite {
        input_index: usize,
        element_index: usize,
        loss_plus: f64,
        loss_minus: f64,
    },
    #[error("analytic gradient is not finite for input {input_index} element {element_index}: {value}")]
    AnalyticalGradNaNOrInfinite {
        input_index: usize,
        element_index: usize,
        value: f64,
    },
    #[error("tensor error during gradient check: {0}")]
    TensorError(#[from] PrimGradError),
}

/// Compares `analytic` gradients against central-difference estimates.
///
/// `analytic` holds one slot per input; a `None` slot is skipped, so the
/// same call shape works for rules with optional outputs. The per-element
/// acceptance test is `|a - n| <= tolerance * max(1, max(|a|, |n|))`.
pub fn check_vjp<F>(
    forward: F,
    inputs: &[Tensor],
    out_grad: &Tensor,
    analytic: &[Option<Tensor>],
    epsilon: f64,
    tolerance: f64,
) -> Result<(), GradCheckError>
where
    F: Fn(&[Tensor]) -> Result<Tensor, PrimGradError>,
{
    for input in inputs {
        if input.dtype() != DType::F32 {
            return Err(GradCheckError::UnsupportedDType(input.dtype()));
        }
    }
    if out_grad.dtype() != DType::F32 {
        return Err(GradCheckError::UnsupportedDType(out_grad.dtype()));
    }

    for (i, original) in inputs.iter().enumerate() {
        let analytic_grad = match analytic.get(i).and_then(|g| g.as_ref()) {
            Some(g) => g,
            None => continue,
        };
        if analytic_grad.shape() != original.shape() {
            return Err(GradCheckError::GradShapeMismatch {
                input_index: i,
                expected: original.shape(),
                actual: analytic_grad.shape(),
            });
        }

        let base: Vec<f64> = original.values().iter().map(|&v| v as f64).collect();
        for elem_idx in 0..original.numel() {
            let loss_plus = perturbed_loss(&forward, inputs, out_grad, i, &base, elem_idx, epsilon)?;
            let loss_minus =
                perturbed_loss(&forward, inputs, out_grad, i, &base, elem_idx, -epsilon)?;
            let numerical = (loss_plus - loss_minus) / (2.0 * epsilon);
            let analytical = analytic_grad.values()[elem_idx] as f64;

            if !numerical.is_finite() {
                return Err(GradCheckError::NumericalGradNaNOrInfinite {
                    input_index: i,
                    element_index: elem_idx,
                    loss_plus,
                    loss_minus,
                });
            }
            if !analytical.is_finite() {
                return Err(GradCheckError::AnalyticalGradNaNOrInfinite {
                    input_index: i,
                    element_index: elem_idx,
                    value: analytical,
                });
            }

            let difference = (analytical - numerical).abs();
            let scale = 1.0f64.max(analytical.abs().max(numerical.abs()));
            if difference > tolerance * scale {
                return Err(GradCheckError::GradientMismatch {
                    input_index: i,
                    element_index: elem_idx,
                    analytical_grad: analytical,
                    numerical_grad: numerical,
                    difference,
                });
            }
        }
    }
    Ok(())
}

fn perturbed_loss<F>(
    forward: &F,
    inputs: &[Tensor],
    out_grad: &Tensor,
    input_index: usize,
    base: &[f64],
    elem_idx: usize,
    delta: f64,
) -> Result<f64, GradCheckError>
where
    F: Fn(&[Tensor]) -> Result<Tensor, PrimGradError>,
{
    let mut data: Vec<f32> = base.iter().map(|&v| v as f32).collect();
    data[elem_idx] = (base[elem_idx] + delta) as f32;
    let perturbed = Tensor::new(data, inputs[input_index].shape())?;
    let mut probe: Vec<Tensor> = inputs.to_vec();
    probe[input_index] = perturbed;
    let output = forward(&probe).map_err(GradCheckError::ForwardPassError)?;
    weighted_loss(&output, out_grad)
}

/// Scalar loss `sum(output * out_grad)` accumulated in f64.
fn weighted_loss(output: &Tensor, out_grad: &Tensor) -> Result<f64, GradCheckError> {
    if output.shape() != out_grad.shape() {
        return Err(GradCheckError::TensorError(PrimGradError::ShapeMismatch {
            expected: out_grad.shape(),
            actual: output.shape(),
            operation: "weighted_loss (grad_check)".to_string(),
        }));
    }
    let loss = output
        .values()
        .iter()
        .zip(out_grad.values())
        .map(|(&o, &g)| o as f64 * g as f64)
        .sum();
    Ok(loss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::arithmetic::mul_op;
    use crate::tensor::create::randn;

    #[test]
    fn test_check_vjp_accepts_correct_gradient() {
        // f(x, y) = x * y, d/dx = y * g, d/dy = x * g
        let x = randn(&[2, 3], 11).unwrap();
        let y = randn(&[2, 3], 12).unwrap();
        let g = randn(&[2, 3], 13).unwrap();
        let dx = mul_op(&g, &y).unwrap();
        let dy = mul_op(&g, &x).unwrap();
        check_vjp(
            |ins| mul_op(&ins[0], &ins[1]),
            &[x, y],
            &g,
            &[Some(dx), Some(dy)],
            1e-3,
            1e-2,
        )
        .unwrap();
    }

    #[test]
    fn test_check_vjp_rejects_wrong_gradient() {
        let x = randn(&[4], 21).unwrap();
        let y = randn(&[4], 22).unwrap();
        let g = randn(&[4], 23).unwrap();
        // deliberately wrong: dx should be y * g, pass x * g instead
        let bad_dx = mul_op(&g, &x).unwrap();
        let res = check_vjp(
            |ins| mul_op(&ins[0], &ins[1]),
            &[x, y],
            &g,
            &[Some(bad_dx), None],
            1e-3,
            1e-2,
        );
        assert!(matches!(
            res,
            Err(GradCheckError::GradientMismatch { input_index: 0, .. })
        ));
    }

    #[test]
    fn test_check_vjp_skips_none_slots() {
        let x = randn(&[3], 31).unwrap();
        let g = randn(&[3], 32).unwrap();
        check_vjp(
            |ins| mul_op(&ins[0], &ins[0]),
            &[x],
            &g,
            &[None],
            1e-3,
            1e-2,
        )
        .unwrap();
    }
}
