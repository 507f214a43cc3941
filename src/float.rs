// SPDX-License-Identifier: Apache-2.0

//! Conversions between bit-vector triples and IEEE single-precision terms.
//!
//! The IR has no floating-point type; `float32` values travel as
//! `(sign: bits[1], exponent: bits[8], fraction: bits[23])` tuples.

use crate::literal::tuple_field;
use crate::translation_error::TranslationError;
use crate::z3_api::{Expr, Sort, SolverContext, SortKind};

const F32_COMPONENT_WIDTHS: [usize; 3] = [1, 8, 23];

/// Positive zero of the floating-point `sort`.
pub fn float_zero<'c>(ctx: &'c SolverContext, sort: Sort<'c>) -> Expr<'c> {
    ctx.fpa_zero(sort, false)
}

/// Replaces subnormal values with positive zero; other values pass through.
pub fn float_flush_subnormal<'c>(
    ctx: &'c SolverContext,
    value: Expr<'c>,
) -> Result<Expr<'c>, TranslationError> {
    if ctx.kind_of(value) != SortKind::FloatingPoint {
        return Err(TranslationError::InvalidArgument(format!(
            "Wrong sort for floating-point operations: {}",
            ctx.sort_to_string(ctx.sort_of(value))
        )));
    }
    let zero = float_zero(ctx, ctx.sort_of(value));
    Ok(ctx.ite(ctx.fpa_is_subnormal(value), zero, value))
}

/// Builds a `float32` term from sign, exponent and fraction bit-vectors.
pub fn to_float32<'c>(
    ctx: &'c SolverContext,
    components: &[Expr<'c>],
) -> Result<Expr<'c>, TranslationError> {
    if components.len() != F32_COMPONENT_WIDTHS.len() {
        return Err(TranslationError::InvalidArgument(format!(
            "float32 needs 3 components, got {}",
            components.len()
        )));
    }
    for (i, (component, want)) in components.iter().zip(F32_COMPONENT_WIDTHS).enumerate() {
        if ctx.kind_of(*component) != SortKind::BitVector || ctx.bv_width(*component) != want {
            return Err(TranslationError::InvalidArgument(format!(
                "float32 component {} must be bits[{}]; got {}",
                i,
                want,
                ctx.sort_to_string(ctx.sort_of(*component))
            )));
        }
    }
    Ok(ctx.fpa_fp(components[0], components[1], components[2]))
}

/// As `to_float32`, reading the components from a 3-field tuple term.
pub fn to_float32_from_tuple<'c>(
    ctx: &'c SolverContext,
    tuple: Expr<'c>,
) -> Result<Expr<'c>, TranslationError> {
    if ctx.kind_of(tuple) != SortKind::Tuple {
        return Err(TranslationError::InvalidArgument(format!(
            "float32 tuple expected; got {}",
            ctx.sort_to_string(ctx.sort_of(tuple))
        )));
    }
    let field_count = ctx.tuple_field_count(ctx.sort_of(tuple));
    let components: Vec<Expr<'c>> = (0..field_count)
        .map(|i| tuple_field(ctx, tuple, i))
        .collect();
    to_float32(ctx, &components)
}
