// SPDX-License-Identifier: Apache-2.0

//! Mapping from IR types to Z3 sorts.

use crate::ir::{ArrayTypeData, Type};
use crate::z3_api::{Sort, SolverContext};

/// `ceil(log2(n))`, with `ceil_log2(0) == ceil_log2(1) == 0`.
pub fn ceil_log2(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as usize
    }
}

/// Width of the bit-vector sort used to index an array of `element_count`
/// elements. Single-element arrays still get a one-bit index.
pub fn array_index_width(element_count: usize) -> usize {
    ceil_log2(element_count).max(1)
}

/// Returns the Z3 sort for `ty`.
///
/// Panics on `token`, which has no value-level encoding.
pub fn type_to_sort<'c>(ctx: &'c SolverContext, ty: &Type) -> Sort<'c> {
    match ty {
        Type::Bits(width) => ctx.bv_sort(*width),
        Type::Tuple(types) => {
            let field_sorts: Vec<Sort<'c>> = types.iter().map(|t| type_to_sort(ctx, t)).collect();
            ctx.tuple_sort(&ty.to_string(), &field_sorts)
        }
        Type::Array(ArrayTypeData {
            element_type,
            element_count,
        }) => {
            let element_sort = type_to_sort(ctx, element_type);
            let index_sort = ctx.bv_sort(array_index_width(*element_count));
            ctx.array_sort(index_sort, element_sort)
        }
        Type::Token => panic!("Unsupported type kind for Z3 translation: {}", ty),
    }
}
