// SPDX-License-Identifier: Apache-2.0

//! Refutation-based proofs over translated IR.
//!
//! A property is proved by asserting its negation (the *objective*) and
//! asking Z3 for a satisfying assignment: `unsat` means no counterexample
//! exists and the property holds.

use std::time::Duration;

use crate::error_handler::ScopedErrorHandler;
use crate::ir::{self, NodeRef};
use crate::translate::Translation;
use crate::translation_error::TranslationError;
use crate::z3_api::{Expr, Model, Response, Solver, SolverContext, SortKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateKind {
    EqualToZero,
    NotEqualToZero,
    EqualToNode,
}

/// A property of a bits-typed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predicate {
    kind: PredicateKind,
    node: Option<NodeRef>,
}

impl Predicate {
    pub fn equal_to_zero() -> Self {
        Predicate {
            kind: PredicateKind::EqualToZero,
            node: None,
        }
    }

    pub fn not_equal_to_zero() -> Self {
        Predicate {
            kind: PredicateKind::NotEqualToZero,
            node: None,
        }
    }

    /// The subject equals `node` of the same function.
    pub fn equal_to(node: NodeRef) -> Self {
        Predicate {
            kind: PredicateKind::EqualToNode,
            node: Some(node),
        }
    }

    pub fn kind(&self) -> PredicateKind {
        self.kind
    }

    pub fn node(&self) -> Option<NodeRef> {
        self.node
    }

    /// Renders the predicate as `eq zero`, `ne zero` or `eq <node>`.
    pub fn to_string(&self, f: &ir::Fn) -> String {
        match (self.kind, self.node) {
            (PredicateKind::EqualToZero, _) => "eq zero".to_string(),
            (PredicateKind::NotEqualToZero, _) => "ne zero".to_string(),
            (PredicateKind::EqualToNode, Some(node)) => {
                format!("eq {}", ir::node_textual_id(f, node))
            }
            (PredicateKind::EqualToNode, None) => unreachable!("equal_to always carries a node"),
        }
    }
}

/// Outcome of a proof attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofResult {
    /// The objective is unsatisfiable.
    Proved,
    /// Z3 found a counterexample; the model is rendered as text.
    Disproved { counterexample: String },
    /// Z3 gave up, typically because the timeout expired.
    Inconclusive { reason: String },
}

impl ProofResult {
    pub fn is_proved(&self) -> bool {
        matches!(self, ProofResult::Proved)
    }
}

/// Builds the boolean objective whose satisfiability refutes `predicate`
/// on `subject`.
pub fn predicate_to_objective<'t>(
    translation: &'t Translation<'_>,
    subject: Expr<'t>,
    predicate: &Predicate,
) -> Result<Expr<'t>, TranslationError> {
    let ctx = translation.ctx();
    match (predicate.kind, predicate.node) {
        (PredicateKind::EqualToZero, _) => Ok(ctx.ne_zero_bool(subject)),
        (PredicateKind::NotEqualToZero, _) => Ok(ctx.eq_zero_bool(subject)),
        (PredicateKind::EqualToNode, Some(node)) => {
            let other = translation.get_translation(node);
            if ctx.kind_of(other) != SortKind::BitVector {
                let f = translation.function();
                return Err(TranslationError::InvalidArgument(format!(
                    "Cannot compare to non-bits-valued node: {}",
                    f.get_node(node).to_string(f)
                )));
            }
            Ok(ctx.ne_bool(subject, other))
        }
        (PredicateKind::EqualToNode, None) => unreachable!("equal_to always carries a node"),
    }
}

/// Asserts `objective` in a fresh solver and classifies the answer.
pub fn check_objective(
    ctx: &SolverContext,
    objective: Expr<'_>,
    timeout: Option<Duration>,
) -> ProofResult {
    let solver = Solver::new(ctx);
    if let Some(timeout) = timeout {
        solver.set_timeout(timeout);
    }
    solver.assert(objective);
    let response = solver.check();
    log::info!("solver result: {}", response);
    match response {
        Response::Unsat => ProofResult::Proved,
        Response::Sat => {
            let counterexample = solver
                .get_model()
                .map(|model| model.to_string())
                .unwrap_or_default();
            log::info!("counterexample:\n{}", counterexample);
            ProofResult::Disproved { counterexample }
        }
        Response::Unknown => ProofResult::Inconclusive {
            reason: solver.reason_unknown(),
        },
    }
}

/// Attempts to prove `predicate` about `subject` within an existing
/// translation. `timeout` overrides the translation's own, if any.
pub fn try_prove_in(
    translation: &Translation<'_>,
    subject: NodeRef,
    predicate: &Predicate,
    timeout: Option<Duration>,
) -> Result<ProofResult, TranslationError> {
    let ctx = translation.ctx();
    let value = translation.get_translation(subject);
    if ctx.kind_of(value) != SortKind::BitVector {
        let f = translation.function();
        return Err(TranslationError::InvalidArgument(format!(
            "Cannot prove properties of non-bits-typed node: {}",
            f.get_node(subject).to_string(f)
        )));
    }
    log::debug!(
        "proving {} {} in fn {}",
        ir::node_textual_id(translation.function(), subject),
        predicate.to_string(translation.function()),
        translation.function().name
    );
    let seh = ScopedErrorHandler::new(ctx);
    let objective = predicate_to_objective(translation, value, predicate)?;
    log::trace!("objective: {}", ctx.expr_to_string(objective));
    let result = check_objective(ctx, objective, timeout.or(translation.get_timeout()));
    seh.finish()?;
    Ok(result)
}

/// Translates `f` and attempts to prove `predicate` about `subject`.
pub fn try_prove_with_detail(
    f: &ir::Fn,
    subject: NodeRef,
    predicate: Predicate,
    timeout: Duration,
) -> Result<ProofResult, TranslationError> {
    let mut translation = Translation::create_and_translate(f)?;
    translation.set_timeout(timeout);
    try_prove_in(&translation, subject, &predicate, Some(timeout))
}

/// Returns true only when the predicate is proved; a counterexample or an
/// inconclusive answer both yield false.
pub fn try_prove(
    f: &ir::Fn,
    subject: NodeRef,
    predicate: Predicate,
    timeout: Duration,
) -> Result<bool, TranslationError> {
    Ok(try_prove_with_detail(f, subject, predicate, timeout)?.is_proved())
}

/// Proves that `lhs` and `rhs` return the same value for every input.
///
/// Both functions are translated into one context with `rhs` reusing the
/// parameter terms of `lhs`, so the signatures must match.
pub fn prove_equivalent(
    lhs: &ir::Fn,
    rhs: &ir::Fn,
    timeout: Duration,
) -> Result<ProofResult, TranslationError> {
    let lhs_types: Vec<&ir::Type> = lhs.params.iter().map(|p| &p.ty).collect();
    let rhs_types: Vec<&ir::Type> = rhs.params.iter().map(|p| &p.ty).collect();
    if lhs_types != rhs_types || lhs.ret_ty != rhs.ret_ty {
        return Err(TranslationError::InvalidArgument(format!(
            "signatures of {} and {} differ",
            lhs.name, rhs.name
        )));
    }
    let ctx = SolverContext::new();
    ctx.set_timeout(timeout);
    let lhs_translation = Translation::create_and_translate_in(&ctx, lhs, None)?;
    let params = lhs_translation.get_param_values();
    let rhs_translation = Translation::create_and_translate_in(&ctx, rhs, Some(params.as_slice()))?;
    let seh = ScopedErrorHandler::new(&ctx);
    let objective = ctx.ne_bool(
        lhs_translation.get_return_value(),
        rhs_translation.get_return_value(),
    );
    let result = check_objective(&ctx, objective, Some(timeout));
    seh.finish()?;
    log::info!("{} vs {}: {:?}", lhs.name, rhs.name, result);
    Ok(result)
}

/// Value of `node` under `model`, rendered by Z3.
pub fn query_node<'t>(
    translation: &'t Translation<'_>,
    model: &Model<'t>,
    node: NodeRef,
) -> String {
    match model.eval(translation.get_translation(node), true) {
        Some(value) => translation.ctx().expr_to_string(value),
        None => format!(
            "<unable to evaluate {}>",
            ir::node_textual_id(translation.function(), node)
        ),
    }
}

/// Runs `solver` and describes the outcome, including the model when one
/// exists.
pub fn solver_result_to_string(solver: &Solver<'_>) -> String {
    let response = solver.check();
    let mut result = format!("Solver result; satisfiable: {}", response);
    if response == Response::Sat {
        if let Some(model) = solver.get_model() {
            result.push_str(&format!("\n  model:\n{}", model));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Type;
    use crate::ir_builder::FnBuilder;
    use crate::ir_value::IrValue;
    use pretty_assertions::assert_eq;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn test_predicate_strings() {
        let mut fb = FnBuilder::new("f");
        let x = fb.param("x", &Type::Bits(2));
        let f = fb.build_with_return_value(&x);
        assert_eq!(Predicate::equal_to_zero().to_string(&f), "eq zero");
        assert_eq!(Predicate::not_equal_to_zero().to_string(&f), "ne zero");
        assert_eq!(Predicate::equal_to(x.node_ref()).to_string(&f), "eq x");
    }

    #[test]
    fn test_disproof_carries_model() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut fb = FnBuilder::new("f");
        let x = fb.param("x", &Type::Bits(4));
        let f = fb.build_with_return_value(&x);
        let result = try_prove_with_detail(&f, x.node_ref(), Predicate::equal_to_zero(), TIMEOUT)
            .unwrap();
        match result {
            ProofResult::Disproved { counterexample } => assert!(counterexample.contains('x')),
            other => panic!("expected a counterexample, got {:?}", other),
        }
    }

    #[test]
    fn test_non_bits_subject_is_rejected() {
        let mut fb = FnBuilder::new("f");
        let x = fb.param("x", &Type::Bits(4));
        let t = fb.tuple(&[&x], Some("t"));
        let f = fb.build_with_return_value(&t);
        match try_prove(&f, t.node_ref(), Predicate::equal_to_zero(), TIMEOUT) {
            Err(TranslationError::InvalidArgument(msg)) => {
                let prefix = "Cannot prove properties of non-bits-typed node: ";
                assert!(msg.starts_with(prefix), "{}", msg);
                assert!(msg.contains("t: (bits[4]) = tuple(x"), "{}", msg);
            }
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_compare_to_non_bits_node_is_rejected() {
        let mut fb = FnBuilder::new("f");
        let x = fb.param("x", &Type::Bits(4));
        let t = fb.tuple(&[&x], Some("t"));
        let out = fb.tuple_index(&t, 0, None);
        let f = fb.build_with_return_value(&out);
        match try_prove(&f, out.node_ref(), Predicate::equal_to(t.node_ref()), TIMEOUT) {
            Err(TranslationError::InvalidArgument(msg)) => {
                assert!(msg.starts_with("Cannot compare to non-bits-valued node: "), "{}", msg);
                assert!(msg.contains("t: (bits[4]) = tuple(x"), "{}", msg);
            }
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_query_node_reads_model() {
        let mut fb = FnBuilder::new("f");
        let x = fb.param("x", &Type::Bits(8));
        let five = fb.literal(&IrValue::make_ubits(8, 5).unwrap(), None);
        let sum = fb.add(&x, &five, None);
        let f = fb.build_with_return_value(&sum);
        let translation = Translation::create_and_translate(&f).unwrap();
        let ctx = translation.ctx();
        let solver = Solver::new(ctx);
        solver.assert(ctx.eq_bool(translation.get_return_value(), ctx.bv_u64(7, 8)));
        assert_eq!(solver.check(), Response::Sat);
        let model = solver.get_model().unwrap();
        assert_eq!(model.eval_u64(translation.get_translation(x.node_ref())), Some(2));
        assert_eq!(query_node(&translation, &model, x.node_ref()), "#x02");
        assert!(solver_result_to_string(&solver).starts_with("Solver result; satisfiable: sat"));
    }
}
