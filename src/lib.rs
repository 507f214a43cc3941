// SPDX-License-Identifier: Apache-2.0

//! Translation of XLS IR functions into Z3 formulas, and refutation-based
//! proofs over the result.
//!
//! ```no_run
//! use std::time::Duration;
//! use xlsynth_z3::{try_prove, FnBuilder, IrValue, Predicate};
//! use xlsynth_z3::ir::Type;
//!
//! let mut fb = FnBuilder::new("always_ones");
//! let x = fb.param("x", &Type::Bits(4));
//! let not_x = fb.not(&x, None);
//! let all = fb.or(&x, &not_x, None);
//! let ones = fb.literal(&IrValue::make_ubits(4, 0xf).unwrap(), None);
//! let f = fb.build_with_return_value(&all);
//! let proved = try_prove(&f, all.node_ref(), Predicate::equal_to(ones.node_ref()),
//!                        Duration::from_secs(10)).unwrap();
//! assert!(proved);
//! ```

pub mod abstract_eval;
pub mod error_handler;
pub mod flatten;
pub mod float;
pub mod ir;
pub mod ir_builder;
pub mod ir_utils;
pub mod ir_value;
pub mod literal;
pub mod prove;
pub mod sorts;
pub mod translate;
pub mod translation_error;
pub mod z3_api;

pub use ir_builder::{BValue, FnBuilder};
pub use ir_value::{IrBits, IrValue};
pub use prove::{
    prove_equivalent, try_prove, try_prove_in, try_prove_with_detail, Predicate, PredicateKind,
    ProofResult,
};
pub use translate::Translation;
pub use translation_error::TranslationError;
pub use z3_api::{Expr, SolverContext, Sort, SortKind, Z3Options};
