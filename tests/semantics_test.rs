// SPDX-License-Identifier: Apache-2.0

//! Checks the Z3 encoding of individual operations against their IR
//! semantics, mostly by proving that an operation over literals equals the
//! expected literal.

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use test_case::test_case;
use xlsynth_z3::flatten::{flatten_value, unflatten_value};
use xlsynth_z3::ir::Type;
use xlsynth_z3::literal::translate_literal_value;
use xlsynth_z3::sorts::type_to_sort;
use xlsynth_z3::z3_api::{Response, Solver};
use xlsynth_z3::{try_prove, BValue, FnBuilder, IrValue, Predicate, SolverContext, Translation};

const TIMEOUT: Duration = Duration::from_secs(10);

fn mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

fn lit(fb: &mut FnBuilder, width: usize, value: u64) -> BValue {
    fb.literal(&IrValue::make_ubits(width, value & mask(width)).unwrap(), None)
}

/// Proves that `node` always equals `want` (as a `width`-bit value).
fn assert_always(mut fb: FnBuilder, node: BValue, width: usize, want: u64) {
    let want_node = lit(&mut fb, width, want);
    let f = fb.build_with_return_value(&node);
    let proved = try_prove(&f, node.node_ref(), Predicate::equal_to(want_node.node_ref()), TIMEOUT)
        .unwrap();
    assert!(proved, "{} should always be {:#x}", f, want);
}

fn sign_extend_u64(value: u64, width: usize) -> i64 {
    let shift = 64 - width;
    ((value << shift) as i64) >> shift
}

#[test]
fn test_mul_matches_truncated_product() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0x6d75_6c);
    for _ in 0..48 {
        let wa = rng.gen_range(1..=12usize);
        let wb = rng.gen_range(1..=12usize);
        let wr = rng.gen_range(1..=24usize);
        let a = rng.gen::<u64>() & mask(wa);
        let b = rng.gen::<u64>() & mask(wb);
        let signed = rng.gen_bool(0.5);

        let mut fb = FnBuilder::new("mul");
        let la = lit(&mut fb, wa, a);
        let lb = lit(&mut fb, wb, b);
        let (product, want) = if signed {
            let p = sign_extend_u64(a, wa) as i128 * sign_extend_u64(b, wb) as i128;
            (fb.smul(&la, &lb, wr, None), (p as u64) & mask(wr))
        } else {
            (fb.umul(&la, &lb, wr, None), a.wrapping_mul(b) & mask(wr))
        };
        assert_always(fb, product, wr, want);
    }
}

#[test]
fn test_umul_keeps_full_product_symbolically() {
    // An 8-bit result of two 4-bit operands never wraps, so the product of
    // two all-ones operands is 225 rather than anything sign-confused.
    let mut fb = FnBuilder::new("umul_full");
    let x = fb.param("x", &Type::Bits(4));
    let y = fb.param("y", &Type::Bits(4));
    let product = fb.umul(&x, &y, 8, None);
    let limit = lit(&mut fb, 8, 225);
    let over = fb.ugt(&product, &limit, None);
    let f = fb.build_with_return_value(&over);
    assert!(try_prove(&f, over.node_ref(), Predicate::equal_to_zero(), TIMEOUT).unwrap());
}

#[test_case(false; "unsigned")]
#[test_case(true; "signed")]
fn test_comparison_trichotomy(signed: bool) {
    let mut fb = FnBuilder::new("trichotomy");
    let a = fb.param("a", &Type::Bits(5));
    let b = fb.param("b", &Type::Bits(5));
    let (lt, gt) = if signed {
        (fb.slt(&a, &b, None), fb.sgt(&a, &b, None))
    } else {
        (fb.ult(&a, &b, None), fb.ugt(&a, &b, None))
    };
    let eq = fb.eq(&a, &b, None);
    let lt_or_eq = fb.or(&lt, &eq, None);
    let any = fb.or(&lt_or_eq, &gt, None);
    let lt_eq = fb.and(&lt, &eq, None);
    let lt_gt = fb.and(&lt, &gt, None);
    let eq_gt = fb.and(&eq, &gt, None);
    let two_a = fb.or(&lt_eq, &lt_gt, None);
    let two = fb.or(&two_a, &eq_gt, None);
    let f = fb.build_with_return_value(&any);
    assert!(try_prove(&f, any.node_ref(), Predicate::not_equal_to_zero(), TIMEOUT).unwrap());
    assert!(try_prove(&f, two.node_ref(), Predicate::equal_to_zero(), TIMEOUT).unwrap());
}

#[test]
fn test_comparisons_match_rust() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0xc0ffee);
    for _ in 0..24 {
        let width = rng.gen_range(1..=10usize);
        let a = rng.gen::<u64>() & mask(width);
        let b = if rng.gen_bool(0.2) {
            a
        } else {
            rng.gen::<u64>() & mask(width)
        };
        let (sa, sb) = (sign_extend_u64(a, width), sign_extend_u64(b, width));
        let expectations = [
            ("ult", a < b),
            ("ule", a <= b),
            ("ugt", a > b),
            ("uge", a >= b),
            ("slt", sa < sb),
            ("sle", sa <= sb),
            ("sgt", sa > sb),
            ("sge", sa >= sb),
            ("eq", a == b),
            ("ne", a != b),
        ];
        for (op, want) in expectations {
            let mut fb = FnBuilder::new(op);
            let la = lit(&mut fb, width, a);
            let lb = lit(&mut fb, width, b);
            let result = match op {
                "ult" => fb.ult(&la, &lb, None),
                "ule" => fb.ule(&la, &lb, None),
                "ugt" => fb.ugt(&la, &lb, None),
                "uge" => fb.uge(&la, &lb, None),
                "slt" => fb.slt(&la, &lb, None),
                "sle" => fb.sle(&la, &lb, None),
                "sgt" => fb.sgt(&la, &lb, None),
                "sge" => fb.sge(&la, &lb, None),
                "eq" => fb.eq(&la, &lb, None),
                _ => fb.ne(&la, &lb, None),
            };
            assert_always(fb, result, 1, want as u64);
        }
    }
}

#[test_case("shll", 4, 0b0011, 2, 1, 0b0110; "shll narrow amount")]
#[test_case("shrl", 4, 0b1000, 3, 5, 0; "shrl past width")]
#[test_case("shra", 4, 0b1000, 3, 7, 0b1111; "shra past width fills sign")]
#[test_case("shll", 4, 0b0101, 8, 1, 0b1010; "shll wide amount")]
#[test_case("shll", 4, 0b0101, 8, 200, 0; "shll wide amount past width")]
#[test_case("shra", 4, 0b1000, 8, 2, 0b1110; "shra wide amount")]
#[test_case("shrl", 4, 0b1000, 4, 3, 0b0001; "shrl same width")]
fn test_shift(op: &str, width: usize, value: u64, amount_width: usize, amount: u64, want: u64) {
    let mut fb = FnBuilder::new(op);
    let v = lit(&mut fb, width, value);
    let a = lit(&mut fb, amount_width, amount);
    let result = match op {
        "shll" => fb.shll(&v, &a, None),
        "shrl" => fb.shrl(&v, &a, None),
        _ => fb.shra(&v, &a, None),
    };
    assert_always(fb, result, width, want);
}

#[test]
fn test_concat_slice_and_extend() {
    let mut fb = FnBuilder::new("concat");
    let hi = lit(&mut fb, 2, 0b10);
    let lo = lit(&mut fb, 1, 0b1);
    let c = fb.concat(&[&hi, &lo], None);
    assert_always(fb, c, 3, 0b101);

    let mut fb = FnBuilder::new("slice");
    let v = lit(&mut fb, 6, 0b110100);
    let s = fb.bit_slice(&v, 2, 3, None);
    assert_always(fb, s, 3, 0b101);

    let mut fb = FnBuilder::new("sext");
    let v = lit(&mut fb, 2, 0b10);
    let e = fb.sign_extend(&v, 4, None);
    assert_always(fb, e, 4, 0b1110);

    let mut fb = FnBuilder::new("zext");
    let v = lit(&mut fb, 2, 0b10);
    let e = fb.zero_extend(&v, 4, None);
    assert_always(fb, e, 4, 0b0010);
}

#[test_case(0b0110, true, 0b00010; "lsb priority")]
#[test_case(0b0110, false, 0b00100; "msb priority")]
#[test_case(0b0000, true, 0b10000; "zero input")]
fn test_one_hot(input: u64, lsb_prio: bool, want: u64) {
    let mut fb = FnBuilder::new("one_hot");
    let v = lit(&mut fb, 4, input);
    let oh = fb.one_hot(&v, lsb_prio, None);
    assert_always(fb, oh, 5, want);
}

#[test]
fn test_encode_and_reverse() {
    let mut fb = FnBuilder::new("encode");
    let v = lit(&mut fb, 8, 0b0100_0000);
    let e = fb.encode(&v, None);
    assert_always(fb, e, 3, 6);

    let mut fb = FnBuilder::new("reverse");
    let v = lit(&mut fb, 5, 0b00011);
    let r = fb.rev(&v, None);
    assert_always(fb, r, 5, 0b11000);
}

#[test]
fn test_reverse_twice_is_identity() {
    let mut fb = FnBuilder::new("rev_rev");
    let x = fb.param("x", &Type::Bits(7));
    let r = fb.rev(&x, None);
    let rr = fb.rev(&r, None);
    let f = fb.build_with_return_value(&rr);
    assert!(try_prove(&f, rr.node_ref(), Predicate::equal_to(x.node_ref()), TIMEOUT).unwrap());
}

#[test_case(0, 10; "first case")]
#[test_case(2, 30; "last case")]
#[test_case(3, 99; "past the end takes default")]
fn test_select_with_default(selector: u64, want: u64) {
    let mut fb = FnBuilder::new("sel");
    let s = lit(&mut fb, 2, selector);
    let cases: Vec<BValue> = [10, 20, 30].iter().map(|c| lit(&mut fb, 8, *c)).collect();
    let default = lit(&mut fb, 8, 99);
    let case_refs: Vec<&BValue> = cases.iter().collect();
    let sel = fb.select(&s, &case_refs, Some(&default), None);
    assert_always(fb, sel, 8, want);
}

#[test]
fn test_select_of_tuples_keeps_field_order() {
    let mut fb = FnBuilder::new("sel_tuple");
    let s = fb.param("s", &Type::Bits(1));
    let a0 = lit(&mut fb, 3, 1);
    let a1 = lit(&mut fb, 5, 2);
    let b0 = lit(&mut fb, 3, 6);
    let b1 = lit(&mut fb, 5, 17);
    let a = fb.tuple(&[&a0, &a1], None);
    let b = fb.tuple(&[&b0, &b1], None);
    let sel = fb.select(&s, &[&a, &b], None, None);
    let field0 = fb.tuple_index(&sel, 0, None);
    let field1 = fb.tuple_index(&sel, 1, None);
    let want0 = fb.select(&s, &[&a0, &b0], None, None);
    let want1 = fb.select(&s, &[&a1, &b1], None, None);
    let f = fb.build_with_return_value(&sel);
    assert!(
        try_prove(&f, field0.node_ref(), Predicate::equal_to(want0.node_ref()), TIMEOUT).unwrap()
    );
    assert!(
        try_prove(&f, field1.node_ref(), Predicate::equal_to(want1.node_ref()), TIMEOUT).unwrap()
    );
}

#[test_case(0b10, 9; "single hot bit")]
#[test_case(0b11, 13; "two hot bits or together")]
#[test_case(0b00, 0; "no hot bit")]
fn test_one_hot_select(selector: u64, want: u64) {
    let mut fb = FnBuilder::new("ohs");
    let s = lit(&mut fb, 2, selector);
    let c0 = lit(&mut fb, 4, 5);
    let c1 = lit(&mut fb, 4, 9);
    let sel = fb.one_hot_select(&s, &[&c0, &c1], None);
    assert_always(fb, sel, 4, want);
}

#[test_case(2; "narrow index")]
#[test_case(4; "wide index")]
#[test_case(16; "very wide index")]
fn test_array_index_saturates(index_width: usize) {
    let mut fb = FnBuilder::new("saturate");
    let arr = fb.param("arr", &Type::new_array(Type::Bits(8), 3));
    let idx = fb.param("idx", &Type::Bits(index_width));
    let at_idx = fb.array_index(&arr, &[&idx], None);
    let last = lit(&mut fb, index_width, 2);
    let at_last = fb.array_index(&arr, &[&last], None);
    let size = lit(&mut fb, index_width, 3);
    let out_of_range = fb.uge(&idx, &size, None);
    let in_range = fb.not(&out_of_range, None);
    let same = fb.eq(&at_idx, &at_last, None);
    let implies = fb.or(&in_range, &same, None);
    let f = fb.build_with_return_value(&implies);
    assert!(try_prove(&f, implies.node_ref(), Predicate::not_equal_to_zero(), TIMEOUT).unwrap());
}

#[test]
fn test_array_construct_and_index() {
    let mut fb = FnBuilder::new("array");
    let x = fb.param("x", &Type::Bits(6));
    let y = fb.param("y", &Type::Bits(6));
    let z = fb.param("z", &Type::Bits(6));
    let arr = fb.array(&[&x, &y, &z], None);
    let one = lit(&mut fb, 2, 1);
    let elem = fb.array_index(&arr, &[&one], None);
    let f = fb.build_with_return_value(&elem);
    assert!(try_prove(&f, elem.node_ref(), Predicate::equal_to(y.node_ref()), TIMEOUT).unwrap());
    assert!(!try_prove(&f, elem.node_ref(), Predicate::equal_to(z.node_ref()), TIMEOUT).unwrap());
}

#[test]
fn test_multi_dimensional_array_index() {
    let mut fb = FnBuilder::new("array_2d");
    let row_ty = Type::new_array(Type::Bits(4), 2);
    let value = IrValue::make_array(&[
        IrValue::make_array(&[
            IrValue::make_ubits(4, 1).unwrap(),
            IrValue::make_ubits(4, 2).unwrap(),
        ])
        .unwrap(),
        IrValue::make_array(&[
            IrValue::make_ubits(4, 3).unwrap(),
            IrValue::make_ubits(4, 4).unwrap(),
        ])
        .unwrap(),
    ])
    .unwrap();
    let grid = fb.literal_with_type(&value, &Type::new_array(row_ty, 2), None);
    let i = lit(&mut fb, 1, 1);
    let j = lit(&mut fb, 1, 0);
    let elem = fb.array_index(&grid, &[&i, &j], None);
    assert_always(fb, elem, 4, 3);
}

#[test]
fn test_array_index_without_indices_is_the_array() {
    let mut fb = FnBuilder::new("index_none");
    let arr = fb.param("arr", &Type::new_array(Type::Bits(8), 3));
    let whole = fb.array_index(&arr, &[], None);
    let mut pairs = Vec::new();
    for i in 0..3 {
        let idx = lit(&mut fb, 2, i);
        let got = fb.array_index(&whole, &[&idx], None);
        let want = fb.array_index(&arr, &[&idx], None);
        pairs.push((got, want));
    }
    let f = fb.build_with_return_value(&whole);
    for (got, want) in &pairs {
        assert!(
            try_prove(&f, got.node_ref(), Predicate::equal_to(want.node_ref()), TIMEOUT).unwrap()
        );
    }

    let translation = Translation::create_and_translate(&f).unwrap();
    let ctx = translation.ctx();
    let solver = Solver::new(ctx);
    solver.assert(ctx.ne_bool(
        translation.get_translation(whole.node_ref()),
        translation.get_translation(arr.node_ref()),
    ));
    assert_eq!(solver.check(), Response::Unsat);
}

#[test]
fn test_select_of_arrays_matches_elementwise_select() {
    let mut fb = FnBuilder::new("sel_array");
    let s = fb.param("s", &Type::Bits(2));
    let arr_ty = Type::new_array(Type::Bits(4), 3);
    let a = fb.literal(
        &IrValue::make_array(&[
            IrValue::make_ubits(4, 1).unwrap(),
            IrValue::make_ubits(4, 2).unwrap(),
            IrValue::make_ubits(4, 3).unwrap(),
        ])
        .unwrap(),
        None,
    );
    let b = fb.param("b", &arr_ty);
    let d = fb.param("d", &arr_ty);
    let sel = fb.select(&s, &[&a, &b], Some(&d), None);
    let mut pairs = Vec::new();
    for i in 0..3 {
        let idx = lit(&mut fb, 2, i);
        let got = fb.array_index(&sel, &[&idx], None);
        let a_i = fb.array_index(&a, &[&idx], None);
        let b_i = fb.array_index(&b, &[&idx], None);
        let d_i = fb.array_index(&d, &[&idx], None);
        let want = fb.select(&s, &[&a_i, &b_i], Some(&d_i), None);
        pairs.push((got, want));
    }
    let f = fb.build_with_return_value(&sel);
    for (got, want) in &pairs {
        assert!(
            try_prove(&f, got.node_ref(), Predicate::equal_to(want.node_ref()), TIMEOUT).unwrap()
        );
    }

    // Element 0 must not collapse onto the last element or vice versa.
    let (first, _) = &pairs[0];
    let (_, last_want) = &pairs[2];
    let differs =
        try_prove(&f, first.node_ref(), Predicate::equal_to(last_want.node_ref()), TIMEOUT);
    assert!(!differs.unwrap());
}

fn round_trips(ctx: &SolverContext, ty: &Type, value: xlsynth_z3::Expr<'_>) -> bool {
    let mut flat = flatten_value(ctx, ty, value);
    assert_eq!(flat.len(), ty.bit_count());
    flat.reverse();
    let back = unflatten_value(ctx, ty, &flat);
    let solver = Solver::new(ctx);
    solver.assert(ctx.ne_bool(back, value));
    solver.check() == Response::Unsat
}

#[test]
fn test_flatten_round_trip_on_literals() {
    let ctx = SolverContext::new();
    let ty = Type::new_array(
        Type::new_tuple(vec![Type::Bits(2), Type::new_array(Type::Bits(3), 3)]),
        2,
    );
    let element = |a: u64, b: [u64; 3]| {
        IrValue::make_tuple(&[
            IrValue::make_ubits(2, a).unwrap(),
            IrValue::make_array(&b.map(|v| IrValue::make_ubits(3, v).unwrap())).unwrap(),
        ])
    };
    let value = IrValue::make_array(&[element(1, [1, 2, 3]), element(2, [7, 0, 5])]).unwrap();
    let expr = translate_literal_value(&ctx, &ty, &value).unwrap();
    assert!(round_trips(&ctx, &ty, expr));
}

#[test]
fn test_flatten_round_trip_on_symbolic_values() {
    let ctx = SolverContext::new();
    // Power-of-two sizes: every index of the index sort is a real element,
    // so a rebuilt array is extensionally equal to the original.
    let types = [
        Type::Bits(1),
        Type::Bits(13),
        Type::new_tuple(vec![Type::Bits(3), Type::Bits(1), Type::Bits(4)]),
        Type::new_array(Type::Bits(5), 4),
        Type::new_tuple(vec![
            Type::new_array(Type::new_tuple(vec![Type::Bits(2), Type::Bits(2)]), 2),
            Type::Bits(6),
        ]),
    ];
    for (i, ty) in types.iter().enumerate() {
        let value = ctx.constant(&format!("v{}", i), type_to_sort(&ctx, ty));
        assert!(round_trips(&ctx, ty, value), "round trip failed for {}", ty);
    }
}
