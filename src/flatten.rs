// SPDX-License-Identifier: Apache-2.0

//! Conversion between structured Z3 values and flat lists of 1-bit vectors.
//!
//! `flatten_value` emits bits least significant first within each leaf, with
//! leaves visited in element/field order. `unflatten_value` reads the
//! opposite convention: it consumes the list as most significant first, with
//! element 0 occupying the *last* chunk. The two therefore compose to the
//! identity only through a reversal, which is exactly what the bit-level
//! selection path produces.

use crate::ir::{ArrayTypeData, Type};
use crate::literal::{create_array, create_tuple, get_array_element, tuple_field};
use crate::sorts::array_index_width;
use crate::z3_api::{Expr, SolverContext};

/// Flattens `value` (of IR type `ty`) into `ty.bit_count()` single-bit
/// vectors.
pub fn flatten_value<'c>(ctx: &'c SolverContext, ty: &Type, value: Expr<'c>) -> Vec<Expr<'c>> {
    match ty {
        Type::Bits(_) => ctx.explode_bits(value),
        Type::Array(data) => {
            let index_width = array_index_width(data.element_count);
            let mut flat = Vec::with_capacity(ty.bit_count());
            for i in 0..data.element_count {
                let element =
                    get_array_element(ctx, data, value, ctx.bv_u64(i as u64, index_width));
                flat.extend(flatten_value(ctx, &data.element_type, element));
            }
            flat
        }
        Type::Tuple(types) => {
            let mut flat = Vec::with_capacity(ty.bit_count());
            for (i, field_ty) in types.iter().enumerate() {
                flat.extend(flatten_value(ctx, field_ty, tuple_field(ctx, value, i)));
            }
            flat
        }
        Type::Token => panic!("Cannot flatten value of type {}", ty),
    }
}

/// Rebuilds a value of type `ty` from `flat`, which must hold exactly
/// `ty.bit_count()` single-bit vectors, most significant first.
pub fn unflatten_value<'c>(ctx: &'c SolverContext, ty: &Type, flat: &[Expr<'c>]) -> Expr<'c> {
    assert_eq!(
        flat.len(),
        ty.bit_count(),
        "flat bit count does not match type {}",
        ty
    );
    match ty {
        Type::Bits(_) => ctx.concat_n(flat),
        Type::Array(ArrayTypeData {
            element_type,
            element_count,
        }) => {
            let element_types = vec![element_type.as_ref(); *element_count];
            let elements = unflatten_elements(ctx, &element_types, flat);
            create_array(ctx, ty, &elements)
        }
        Type::Tuple(types) => {
            let element_types: Vec<&Type> = types.iter().map(|t| t.as_ref()).collect();
            let elements = unflatten_elements(ctx, &element_types, flat);
            create_tuple(ctx, ty, &elements)
        }
        Type::Token => panic!("Cannot unflatten value of type {}", ty),
    }
}

/// Element 0 takes the highest-indexed chunk of `flat`.
fn unflatten_elements<'c>(
    ctx: &'c SolverContext,
    element_types: &[&Type],
    flat: &[Expr<'c>],
) -> Vec<Expr<'c>> {
    let mut high = flat.len();
    let mut elements = Vec::with_capacity(element_types.len());
    for element_ty in element_types {
        let element_bits = element_ty.bit_count();
        let chunk = &flat[high - element_bits..high];
        elements.push(unflatten_value(ctx, element_ty, chunk));
        high -= element_bits;
    }
    elements
}
