use super::*;

fn t2x3() -> Tensor {
    Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap()
}

#[test]
fn test_reshape_roundtrip() {
    let t = t2x3();
    let r = reshape_op(&t, &[3, 2]).unwrap();
    assert_eq!(r.shape(), vec![3, 2]);
    assert_eq!(r.values(), t.values());
    assert!(reshape_op(&t, &[4]).is_err());
}

#[test]
fn test_transpose_2d() {
    let t = t2x3();
    let tr = transpose_op(&t, &[1, 0]).unwrap();
    assert_eq!(tr.shape(), vec![3, 2]);
    assert_eq!(tr.values(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    // negative entries resolve against the rank
    let tr2 = transpose_op(&t, &[-1, -2]).unwrap();
    assert_eq!(tr2.values(), tr.values());
    assert!(transpose_op(&t, &[0, 0]).is_err());
}

#[test]
fn test_expand_from_rank1() {
    let v = Tensor::new(vec![1.0, 2.0, 3.0], vec![3]).unwrap();
    let e = expand_op(&v, &[2, 3]).unwrap();
    assert_eq!(e.values(), &[1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
    assert!(expand_op(&v, &[2, 4]).is_err());
}

#[test]
fn test_expand_scalar() {
    let s = Tensor::scalar(5.0);
    let e = expand_op(&s, &[2, 2]).unwrap();
    assert_eq!(e.values(), &[5.0; 4]);
}

#[test]
fn test_tile() {
    let v = Tensor::new(vec![1.0, 2.0], vec![2]).unwrap();
    let t = tile_op(&v, &[3]).unwrap();
    assert_eq!(t.values(), &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
}

#[test]
fn test_slice_and_negative_bounds() {
    let t = t2x3();
    let s = slice_op(&t, &[1], &[1], &[3]).unwrap();
    assert_eq!(s.shape(), vec![2, 2]);
    assert_eq!(s.values(), &[2.0, 3.0, 5.0, 6.0]);
    let s2 = slice_op(&t, &[0], &[-1], &[2]).unwrap();
    assert_eq!(s2.values(), &[4.0, 5.0, 6.0]);
}

#[test]
fn test_pad_then_slice_inverts() {
    let t = t2x3();
    let p = pad_op(&t, &[(1, 0), (0, 2)], 0.0).unwrap();
    assert_eq!(p.shape(), vec![3, 5]);
    assert_eq!(p.values()[0..5], [0.0, 0.0, 0.0, 0.0, 0.0]);
    let back = slice_op(&p, &[0, 1], &[1, 0], &[3, 3]).unwrap();
    assert_eq!(back.values(), t.values());
}

#[test]
fn test_concat_split_roundtrip() {
    let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]).unwrap();
    let b = Tensor::new(vec![5.0, 6.0], vec![2, 1]).unwrap();
    let c = concat_op(&[a.clone(), b.clone()], 1).unwrap();
    assert_eq!(c.shape(), vec![2, 3]);
    assert_eq!(c.values(), &[1.0, 2.0, 5.0, 3.0, 4.0, 6.0]);
    let parts = split_op(&c, &[2, 1], 1).unwrap();
    assert_eq!(parts[0], a);
    assert_eq!(parts[1], b);
}

#[test]
fn test_roll() {
    let v = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![4]).unwrap();
    let r = roll_op(&v, &[1], &[0]).unwrap();
    assert_eq!(r.values(), &[4.0, 1.0, 2.0, 3.0]);
    let back = roll_op(&r, &[-1], &[0]).unwrap();
    assert_eq!(back.values(), v.values());
}
