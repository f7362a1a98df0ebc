use super::*;
use crate::error::PrimGradError;
use crate::grad_check::check_vjp;
use crate::ops::arithmetic::{div_op, mul_op};
use crate::ops::unary::{erf_op, exp_op};
use crate::tensor::create::randn;
use crate::tensor::Tensor;
use crate::types::DType;
use approx::assert_relative_eq;

fn relu_fwd(x: &Tensor) -> Result<Tensor, PrimGradError> {
    let positive = gt_op(x, &zeros_like(x)?)?;
    where_op(&positive, x, &zeros_like(x)?)
}

fn gelu_fwd(x: &Tensor, approximate: bool) -> Result<Tensor, PrimGradError> {
    if approximate {
        let kbeta = (2.0f32 / std::f32::consts::PI).sqrt();
        let x_cube = mul_op(&mul_op(x, x)?, x)?;
        let inner = scale_op(&add_op(x, &scale_op(&x_cube, 0.044715, 0.0)?)?, kbeta, 0.0)?;
        let right = scale_op(&tanh_op(&inner)?, 1.0, 1.0)?;
        mul_op(&scale_op(x, 0.5, 0.0)?, &right)
    } else {
        let phi = scale_op(
            &erf_op(&scale_op(x, std::f32::consts::FRAC_1_SQRT_2, 0.0)?)?,
            0.5,
            0.5,
        )?;
        mul_op(x, &phi)
    }
}

fn softmax_fwd(x: &Tensor, axis: i64) -> Result<Tensor, PrimGradError> {
    let e = exp_op(x)?;
    let s = sum_op(&e, Some(&[axis]), true)?;
    div_op(&e, &s)
}

#[test]
fn test_relu_grad_masks_negative() {
    let x = Tensor::new(vec![1.5, -2.0, 0.5, -0.1], vec![4]).unwrap();
    let out = relu_fwd(&x).unwrap();
    let g = Tensor::new(vec![10.0, 20.0, 30.0, 40.0], vec![4]).unwrap();
    let dx = relu_grad(&out, &g).unwrap();
    assert_eq!(dx.values(), &[10.0, 0.0, 30.0, 0.0]);
    check_vjp(|ins| relu_fwd(&ins[0]), &[x], &g, &[Some(dx)], 1e-3, 1e-2).unwrap();
}

#[test]
fn test_leaky_relu_grad() {
    let slope = 0.1;
    let x = Tensor::new(vec![2.0, -3.0, 0.5], vec![3]).unwrap();
    let out = relu_fwd(&x)
        .and_then(|p| add_op(&p, &scale_op(&where_op(&lt_op(&x, &zeros_like(&x)?)?, &x, &zeros_like(&x)?)?, slope, 0.0)?))
        .unwrap();
    let g = Tensor::new(vec![1.0, 1.0, 1.0], vec![3]).unwrap();
    let dx = leaky_relu_grad(&out, &g, slope).unwrap();
    assert_relative_eq!(dx.values()[0], 1.0);
    assert_relative_eq!(dx.values()[1], slope);
    assert_relative_eq!(dx.values()[2], 1.0);
}

#[test]
fn test_hardswish_grad_three_regions() {
    let x = Tensor::new(vec![-5.0, -3.0, -1.0, 0.0, 2.0, 3.0, 4.0], vec![7]).unwrap();
    let g = Tensor::new(vec![1.0; 7], vec![7]).unwrap();
    let dx = hardswish_grad(&x, &g).unwrap();
    // below -3: zero; at -3 the <= 3 branch applies: x/3 + 0.5 = -0.5
    assert_eq!(dx.values()[0], 0.0);
    assert_relative_eq!(dx.values()[1], -0.5);
    assert_relative_eq!(dx.values()[2], -1.0 / 3.0 + 0.5);
    assert_relative_eq!(dx.values()[3], 0.5);
    assert_relative_eq!(dx.values()[4], 2.0 / 3.0 + 0.5);
    // at 3 still the middle branch: 1.5, above 3 pass-through
    assert_relative_eq!(dx.values()[5], 1.5);
    assert_eq!(dx.values()[6], 1.0);
}

#[test]
fn test_gelu_grad_finite_diff_both_branches() {
    for approximate in [true, false] {
        let x = randn(&[6], 71).unwrap();
        let g = randn(&[6], 72).unwrap();
        let dx = gelu_grad(&x, &g, approximate).unwrap();
        check_vjp(
            |ins| gelu_fwd(&ins[0], approximate),
            &[x],
            &g,
            &[Some(dx)],
            1e-3,
            1e-2,
        )
        .unwrap();
    }
}

#[test]
fn test_gelu_grad_promotion_beats_reduced_arithmetic() {
    let x = randn(&[32], 73).unwrap();
    let g = randn(&[32], 74).unwrap();
    let exact = gelu_grad(&x, &g, true).unwrap();

    let x_h = cast_op(&x, DType::F16).unwrap();
    let g_h = cast_op(&g, DType::F16).unwrap();
    let promoted = gelu_grad(&x_h, &g_h, true).unwrap();
    assert_eq!(promoted.dtype(), DType::F16);

    // unpromoted reference: run the same formula step by step in f16
    let unpromoted = {
        let kbeta = (2.0f32 / std::f32::consts::PI).sqrt();
        let x_sq = mul_op(&x_h, &x_h).unwrap();
        let x_cube = mul_op(&x_sq, &x_h).unwrap();
        let inner = scale_op(
            &add_op(&x_h, &scale_op(&x_cube, 0.044715, 0.0).unwrap()).unwrap(),
            kbeta,
            0.0,
        )
        .unwrap();
        let tanh_inner = tanh_op(&inner).unwrap();
        let left = scale_op(&x_h, 0.5, 0.0).unwrap();
        let right = scale_op(&tanh_inner, 1.0, 1.0).unwrap();
        let left_derivative = scale_op(&right, 0.5, 0.0).unwrap();
        let tanh_derivative = scale_op(&mul_op(&tanh_inner, &tanh_inner).unwrap(), -1.0, 1.0).unwrap();
        let inner_derivative = scale_op(&x_sq, 3.0 * 0.044715 * kbeta, kbeta).unwrap();
        let right_derivative =
            mul_op(&mul_op(&left, &tanh_derivative).unwrap(), &inner_derivative).unwrap();
        mul_op(&g_h, &add_op(&left_derivative, &right_derivative).unwrap()).unwrap()
    };

    let err = |t: &Tensor| -> f32 {
        t.values()
            .iter()
            .zip(exact.values())
            .map(|(&a, &b)| (a - b).abs())
            .sum()
    };
    assert!(err(&promoted) <= err(&unpromoted));
}

#[test]
fn test_softmax_grad_finite_diff() {
    let x = randn(&[2, 4], 75).unwrap();
    let g = randn(&[2, 4], 76).unwrap();
    for axis in [1i64, -1] {
        let out = softmax_fwd(&x, axis).unwrap();
        let dx = softmax_grad(&out, &g, axis).unwrap();
        check_vjp(
            |ins| softmax_fwd(&ins[0], axis),
            &[x.clone()],
            &g,
            &[Some(dx)],
            1e-3,
            1e-2,
        )
        .unwrap();
    }
}

#[test]
fn test_softmax_grad_zero_rank_is_zero() {
    let out = Tensor::scalar(1.0);
    let g = Tensor::scalar(3.0);
    let dx = softmax_grad(&out, &g, 0).unwrap();
    assert_eq!(dx.rank(), 0);
    assert_eq!(dx.item().unwrap(), 0.0);
}

#[test]
fn test_dropout_grad_five_cases() {
    let mask = Tensor::new(vec![1.0, 0.0, 1.0, 1.0], vec![4]).unwrap();
    let g = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![4]).unwrap();
    let p = 0.5;

    // test + upscale: pass-through
    let r = dropout_grad(&mask, &g, p, true, DropoutMode::UpscaleInTrain).unwrap();
    assert_eq!(r.values(), g.values());

    // test + downgrade: g * (1 - p)
    let r = dropout_grad(&mask, &g, p, true, DropoutMode::DowngradeInInfer).unwrap();
    assert_eq!(r.values(), &[0.5, 1.0, 1.5, 2.0]);

    // train + upscale: g * mask / (1 - p)
    let r = dropout_grad(&mask, &g, p, false, DropoutMode::UpscaleInTrain).unwrap();
    assert_eq!(r.values(), &[2.0, 0.0, 6.0, 8.0]);

    // train + upscale + p = 1: all zero
    let r = dropout_grad(&mask, &g, 1.0, false, DropoutMode::UpscaleInTrain).unwrap();
    assert!(r.values().iter().all(|&v| v == 0.0));

    // train + downgrade: g * mask
    let r = dropout_grad(&mask, &g, p, false, DropoutMode::DowngradeInInfer).unwrap();
    assert_eq!(r.values(), &[1.0, 0.0, 3.0, 4.0]);
}
