// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use anyhow::{bail, Context};
use xlsynth_z3::ir::Type;
use xlsynth_z3::{prove_equivalent, try_prove, FnBuilder, IrValue, Predicate, ProofResult};

mod multithread;

const TIMEOUT: Duration = Duration::from_secs(30);

/// Checks that `x | !x` is all ones and is not provably zero.
fn validate_or_not() -> anyhow::Result<()> {
    let mut fb = FnBuilder::new("or_not");
    let x = fb.param("x", &Type::Bits(4));
    let not_x = fb.not(&x, None);
    let result = fb.or(&x, &not_x, Some("result"));
    let ones = fb.literal(&IrValue::make_ubits(4, 0xf)?, Some("ones"));
    let f = fb.build_with_return_value(&result);
    log::info!("built:\n{}", f);

    let all_ones = try_prove(&f, result.node_ref(), Predicate::equal_to(ones.node_ref()), TIMEOUT)?;
    if !all_ones {
        bail!("x | !x was not proved to be all ones");
    }
    let zero = try_prove(&f, result.node_ref(), Predicate::equal_to_zero(), TIMEOUT)?;
    if zero {
        bail!("x | !x was proved to be zero");
    }
    Ok(())
}

fn build_less_than(name: &str, signed: bool) -> xlsynth_z3::ir::Fn {
    let mut fb = FnBuilder::new(name);
    let a = fb.param("a", &Type::Bits(8));
    let b = fb.param("b", &Type::Bits(8));
    let lt = if signed {
        fb.slt(&a, &b, None)
    } else {
        fb.ult(&a, &b, None)
    };
    fb.build_with_return_value(&lt)
}

/// Shows that unsigned and signed less-than are told apart.
fn validate_lt_equivalence() -> anyhow::Result<()> {
    let ult = build_less_than("ult", false);
    let ult_again = build_less_than("ult_again", false);
    let slt = build_less_than("slt", true);

    let same = prove_equivalent(&ult, &ult_again, TIMEOUT).context("ult vs ult")?;
    if !same.is_proved() {
        bail!("identical functions were not proved equivalent: {:?}", same);
    }
    match prove_equivalent(&ult, &slt, TIMEOUT).context("ult vs slt")? {
        ProofResult::Disproved { counterexample } => {
            log::info!("ult and slt differ, e.g.:\n{}", counterexample);
            Ok(())
        }
        other => bail!("expected a counterexample for ult vs slt; got {:?}", other),
    }
}

fn main() -> anyhow::Result<()> {
    let _ = env_logger::try_init();
    validate_or_not()?;
    println!("or_not validation: ok");
    validate_lt_equivalence()?;
    println!("ult/slt validation: ok");
    multithread::validate_all_threads_prove_add1();
    println!("multithreaded add1 validation: ok");
    Ok(())
}

#[test]
fn test_validate_or_not() {
    let _ = env_logger::try_init();
    validate_or_not().expect("validation should succeed");
}

#[test]
fn test_validate_lt_equivalence() {
    let _ = env_logger::try_init();
    validate_lt_equivalence().expect("validation should succeed");
}
