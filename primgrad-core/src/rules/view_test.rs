use super::*;
use crate::ops::view::tile_op;
use crate::tensor::create::{randn, zeros};
use crate::types::DType;

fn xshape_for(t: &Tensor) -> Tensor {
    // shape descriptor: placeholder leading axis, then the input's shape
    let mut desc = vec![1usize];
    desc.extend(t.shape());
    zeros(&desc).unwrap()
}

#[test]
fn test_reshape_grad_recovers_input_shape() {
    let x = randn(&[2, 3, 4], 91).unwrap();
    let xshape = xshape_for(&x);
    let g = randn(&[6, 4], 92).unwrap();
    let dx = reshape_grad(&xshape, &g).unwrap();
    assert_eq!(dx.shape(), vec![2, 3, 4]);
    assert_eq!(dx.values(), g.values());
}

#[test]
fn test_transpose_grad_inverts_permutation() {
    let x = randn(&[2, 3, 4], 93).unwrap();
    for perm in [&[2i64, 0, 1][..], &[1, 0, 2][..], &[-1, 0, 1][..]] {
        let out = transpose_op(&x, perm).unwrap();
        let g = randn(&out.shape(), 94).unwrap();
        let dx = transpose_grad(&g, perm).unwrap();
        assert_eq!(dx.shape(), x.shape());
        // round-trip: transposing the gradient forward again gives g back
        let back = transpose_op(&dx, perm).unwrap();
        assert_eq!(back.values(), g.values());
    }
}

#[test]
fn test_roll_grad_inverts_roll() {
    let x = randn(&[3, 4], 95).unwrap();
    let g = randn(&[3, 4], 96).unwrap();
    let dx = roll_grad(&g, &[1, -2], &[0, 1]).unwrap();
    let back = roll_op(&dx, &[1, -2], &[0, 1]).unwrap();
    assert_eq!(back.values(), g.values());
}

#[test]
fn test_tile_grad_sums_repeats() {
    let x = Tensor::new(vec![1.0, 2.0], vec![2]).unwrap();
    let out = tile_op(&x, &[3]).unwrap();
    assert_eq!(out.shape(), vec![6]);
    let g = Tensor::new(vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0], vec![6]).unwrap();
    let dx = tile_grad(&x, &g, &[3]).unwrap();
    assert_eq!(dx.shape(), vec![2]);
    assert_eq!(dx.values(), &[4.0, 8.0]);
}

#[test]
fn test_tile_grad_multi_axis() {
    let x = randn(&[2, 3], 97).unwrap();
    let g = tile_op(&randn(&[2, 3], 98).unwrap(), &[2, 2]).unwrap();
    let dx = tile_grad(&x, &g, &[2, 2]).unwrap();
    assert_eq!(dx.shape(), vec![2, 3]);
    // each input position receives the sum of its four copies
    let expected = |i: usize, j: usize| {
        g.get(&[i, j]).unwrap()
            + g.get(&[i, j + 3]).unwrap()
            + g.get(&[i + 2, j]).unwrap()
            + g.get(&[i + 2, j + 3]).unwrap()
    };
    for i in 0..2 {
        for j in 0..3 {
            approx::assert_relative_eq!(
                dx.get(&[i, j]).unwrap(),
                expected(i, j),
                max_relative = 1e-5
            );
        }
    }
}

#[test]
fn test_concat_grad_splits_per_input() {
    let a = randn(&[2, 2], 99).unwrap();
    let b = randn(&[2, 3], 100).unwrap();
    let out = concat_op(&[a.clone(), b.clone()], 1).unwrap();
    let g = randn(&out.shape(), 101).unwrap();
    let grads = concat_grad(&[a.clone(), b.clone()], &g, -1, &[true, true]).unwrap();
    assert_eq!(grads[0].as_ref().unwrap().shape(), vec![2, 2]);
    assert_eq!(grads[1].as_ref().unwrap().shape(), vec![2, 3]);
    // concat/split round-trip
    let rejoined = concat_op(
        &[
            grads[0].as_ref().unwrap().clone(),
            grads[1].as_ref().unwrap().clone(),
        ],
        1,
    )
    .unwrap();
    assert_eq!(rejoined.values(), g.values());
}

#[test]
fn test_concat_grad_respects_want_flags() {
    let a = randn(&[2, 2], 102).unwrap();
    let b = randn(&[3, 2], 103).unwrap();
    let g = randn(&[5, 2], 104).unwrap();
    let grads = concat_grad(&[a, b], &g, 0, &[false, true]).unwrap();
    assert!(grads[0].is_none());
    assert_eq!(grads[1].as_ref().unwrap().shape(), vec![3, 2]);
}

#[test]
fn test_split_grad_concats_back() {
    let g0 = randn(&[2, 2], 105).unwrap();
    let g1 = randn(&[2, 3], 106).unwrap();
    let dx = split_grad(&[g0.clone(), g1.clone()], 1).unwrap();
    assert_eq!(dx.shape(), vec![2, 5]);
    let pieces = split_op(&dx, &[2, 3], 1).unwrap();
    assert_eq!(pieces[0].values(), g0.values());
    assert_eq!(pieces[1].values(), g1.values());
}

#[test]
fn test_cast_grad_restores_dtype() {
    let x = Tensor::new_with_dtype(vec![1.0, 2.0], vec![2], DType::F16).unwrap();
    let g = randn(&[2], 107).unwrap();
    let dx = cast_grad(&x, &g).unwrap();
    assert_eq!(dx.dtype(), DType::F16);
}

#[test]
fn test_pad_grad_slices_interior() {
    let x = randn(&[2, 3], 108).unwrap();
    let paddings = [(1, 0), (0, 2)];
    let padded = pad_op(&x, &paddings, 0.0).unwrap();
    let g = randn(&padded.shape(), 109).unwrap();
    let dx = pad_grad(&x, &g, &paddings).unwrap();
    assert_eq!(dx.shape(), vec![2, 3]);
    for i in 0..2 {
        for j in 0..3 {
            assert_eq!(dx.get(&[i, j]).unwrap(), g.get(&[i + 1, j]).unwrap());
        }
    }
}

#[test]
fn test_slice_grad_pads_back() {
    let x = randn(&[4, 5], 110).unwrap();
    let g = randn(&[2, 3], 111).unwrap();
    // forward: slice axes [0, 1] with starts [1, 2], ends [3, 5]
    let dx = slice_grad(&x, &g, &[0, 1], &[1, 2], &[]).unwrap();
    assert_eq!(dx.shape(), vec![4, 5]);
    for i in 0..4 {
        for j in 0..5 {
            let inside = (1..3).contains(&i) && (2..5).contains(&j);
            let expected = if inside {
                g.get(&[i - 1, j - 2]).unwrap()
            } else {
                0.0
            };
            assert_eq!(dx.get(&[i, j]).unwrap(), expected);
        }
    }
}

#[test]
fn test_slice_grad_reconstructs_decreased_axes() {
    let x = randn(&[4, 5], 112).unwrap();
    // forward sliced row 2 and squeezed axis 0, so the gradient is rank 1
    let g = randn(&[5], 113).unwrap();
    let dx = slice_grad(&x, &g, &[0], &[2], &[0]).unwrap();
    assert_eq!(dx.shape(), vec![4, 5]);
    for j in 0..5 {
        assert_eq!(dx.get(&[2, j]).unwrap(), g.values()[j]);
        assert_eq!(dx.get(&[0, j]).unwrap(), 0.0);
    }
}

#[test]
fn test_slice_grad_negative_start() {
    let x = randn(&[5], 114).unwrap();
    let g = randn(&[2], 115).unwrap();
    // start -2 resolves to 3
    let dx = slice_grad(&x, &g, &[0], &[-2], &[]).unwrap();
    assert_eq!(dx.values()[3], g.values()[0]);
    assert_eq!(dx.values()[4], g.values()[1]);
    assert_eq!(dx.values()[0], 0.0);
}
