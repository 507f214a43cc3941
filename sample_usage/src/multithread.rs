// SPDX-License-Identifier: Apache-2.0

//! Independent proofs on every core. Each proof owns its own Z3 context,
//! so the only shared state is the immutable IR function.

use std::time::Duration;

use lazy_static::lazy_static;
use rayon::prelude::*;
use xlsynth_z3::ir::{Fn, NodeRef, Type};
use xlsynth_z3::{try_prove, FnBuilder, IrValue, Predicate};

struct Add1 {
    f: Fn,
    /// `add1(x) == x + 1`, as a bits[1] node.
    checks: Vec<NodeRef>,
}

fn build_add1() -> Add1 {
    let mut fb = FnBuilder::new("add1");
    let x = fb.param("x", &Type::Bits(32));
    let one = fb.literal(&IrValue::u32(1), None);
    let sum = fb.add(&x, &one, Some("sum"));
    let mut checks = Vec::new();
    for i in 0..num_cpus::get() {
        // For x == i the sum must be i + 1.
        let i_lit = fb.literal(&IrValue::u32(i as u32), None);
        let want = fb.literal(&IrValue::u32(i as u32 + 1), None);
        let is_i = fb.eq(&x, &i_lit, None);
        let not_i = fb.not(&is_i, None);
        let got_want = fb.eq(&sum, &want, None);
        let implies = fb.or(&not_i, &got_want, None);
        checks.push(implies.node_ref());
    }
    Add1 {
        f: fb.build_with_return_value(&sum),
        checks,
    }
}

lazy_static! {
    static ref ADD1: Add1 = build_add1();
}

pub fn validate_all_threads_prove_add1() {
    let results: Vec<bool> = (0..num_cpus::get())
        .into_par_iter()
        .map(|i| {
            log::info!("thread proving add1 check {}", i);
            try_prove(
                &ADD1.f,
                ADD1.checks[i],
                Predicate::not_equal_to_zero(),
                Duration::from_secs(30),
            )
            .expect("proof should not error")
        })
        .collect();

    for (i, proved) in results.iter().enumerate() {
        assert!(*proved, "add1 check {} was not proved", i);
    }
}
