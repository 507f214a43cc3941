// SPDX-License-Identifier: Apache-2.0

//! Construction and access of structured Z3 values: literals, zero values,
//! arrays and tuples.

use crate::ir::{ArrayTypeData, Type};
use crate::ir_value::IrValue;
use crate::sorts::{array_index_width, type_to_sort};
use crate::translation_error::TranslationError;
use crate::z3_api::{Expr, Sort, SolverContext, SortKind};

/// Builds the Z3 value of `value`, which must conform to `ty`.
pub fn translate_literal_value<'c>(
    ctx: &'c SolverContext,
    ty: &Type,
    value: &IrValue,
) -> Result<Expr<'c>, TranslationError> {
    if !ty.conforms(value) {
        return Err(TranslationError::InvalidOperand(format!(
            "literal value {} does not conform to type {}",
            value, ty
        )));
    }
    Ok(translate_conforming_value(ctx, ty, value))
}

fn translate_conforming_value<'c>(ctx: &'c SolverContext, ty: &Type, value: &IrValue) -> Expr<'c> {
    match (ty, value) {
        (Type::Bits(_), IrValue::Bits(bits)) => ctx.bv_numeral(&bits.to_bools_lsb_is_0()),
        (Type::Array(data), IrValue::Array(elements)) => {
            let translated: Vec<Expr<'c>> = elements
                .iter()
                .map(|element| translate_conforming_value(ctx, &data.element_type, element))
                .collect();
            create_array(ctx, ty, &translated)
        }
        (Type::Tuple(types), IrValue::Tuple(elements)) => {
            let translated: Vec<Expr<'c>> = types
                .iter()
                .zip(elements)
                .map(|(element_ty, element)| translate_conforming_value(ctx, element_ty, element))
                .collect();
            create_tuple(ctx, ty, &translated)
        }
        _ => unreachable!("value {} was checked to conform to {}", value, ty),
    }
}

/// The all-zero value of `sort`.
pub fn zero_of_sort<'c>(ctx: &'c SolverContext, sort: Sort<'c>) -> Expr<'c> {
    match ctx.sort_kind(sort) {
        SortKind::BitVector => ctx.int_numeral(0, sort),
        SortKind::Array => {
            let element_zero = zero_of_sort(ctx, ctx.array_range(sort));
            ctx.const_array(ctx.array_domain(sort), element_zero)
        }
        SortKind::Tuple => {
            let field_zeros: Vec<Expr<'c>> = (0..ctx.tuple_field_count(sort))
                .map(|i| zero_of_sort(ctx, ctx.decl_range(ctx.tuple_field_decl(sort, i))))
                .collect();
            ctx.app(ctx.tuple_constructor(sort), &field_zeros)
        }
        other => panic!(
            "Unsupported sort kind for zero value: {} ({})",
            other,
            ctx.sort_to_string(sort)
        ),
    }
}

/// Builds an array of type `array_ty` holding `elements` in index order.
pub fn create_array<'c>(
    ctx: &'c SolverContext,
    array_ty: &Type,
    elements: &[Expr<'c>],
) -> Expr<'c> {
    let sort = type_to_sort(ctx, array_ty);
    let index_sort = ctx.array_domain(sort);
    let index_width = ctx.bv_sort_width(index_sort);
    let mut array = ctx.const_array(index_sort, zero_of_sort(ctx, ctx.array_range(sort)));
    for (i, element) in elements.iter().enumerate() {
        array = ctx.store(array, ctx.bv_u64(i as u64, index_width), *element);
    }
    array
}

pub fn create_tuple<'c>(
    ctx: &'c SolverContext,
    tuple_ty: &Type,
    elements: &[Expr<'c>],
) -> Expr<'c> {
    let sort = type_to_sort(ctx, tuple_ty);
    ctx.app(ctx.tuple_constructor(sort), elements)
}

/// Field `index` of a tuple-sorted expression.
pub fn tuple_field<'c>(ctx: &'c SolverContext, tuple: Expr<'c>, index: usize) -> Expr<'c> {
    let decl = ctx.tuple_field_decl(ctx.sort_of(tuple), index);
    ctx.app(decl, &[tuple])
}

/// Reads `array[index]`, clamping out-of-range indices to the last element.
///
/// The index may have any width; it is clamped at its own width before
/// being narrowed so wide indices never wrap back into range.
pub fn get_array_element<'c>(
    ctx: &'c SolverContext,
    array_ty: &ArrayTypeData,
    array: Expr<'c>,
    index: Expr<'c>,
) -> Expr<'c> {
    let target_width = array_index_width(array_ty.element_count);
    let last = array_ty.element_count.saturating_sub(1) as u64;
    let index_width = ctx.bv_width(index);
    let clamped = if index_width <= target_width {
        let widened = if index_width < target_width {
            ctx.zero_ext(target_width - index_width, index)
        } else {
            index
        };
        ctx.min(widened, ctx.bv_u64(last, target_width))
    } else {
        let clamped_wide = ctx.min(index, ctx.bv_u64(last, index_width));
        ctx.extract(target_width - 1, 0, clamped_wide)
    };
    ctx.select(array, clamped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::z3_api::{Response, Solver};

    fn is_valid(ctx: &SolverContext, claim: Expr<'_>) -> bool {
        let solver = Solver::new(ctx);
        solver.assert(ctx.not_bool(claim));
        solver.check() == Response::Unsat
    }

    #[test]
    fn test_literal_shape_mismatch_is_invalid_operand() {
        let ctx = SolverContext::new();
        let value = IrValue::make_ubits(4, 1).unwrap();
        let result = translate_literal_value(&ctx, &Type::Bits(5), &value);
        assert!(matches!(result, Err(TranslationError::InvalidOperand(_))));

        let tuple_ty = Type::new_tuple(vec![Type::Bits(4), Type::Bits(4)]);
        let short = IrValue::make_tuple(&[value.clone()]);
        let result = translate_literal_value(&ctx, &tuple_ty, &short);
        assert!(matches!(result, Err(TranslationError::InvalidOperand(_))));

        // Array length and nested element widths are both part of the shape.
        let array_ty = Type::new_array(Type::Bits(4), 3);
        let two = IrValue::make_array(&[value.clone(), value.clone()]).unwrap();
        match translate_literal_value(&ctx, &array_ty, &two) {
            Err(TranslationError::InvalidOperand(msg)) => {
                assert!(msg.contains("does not conform to type bits[4][3]"), "{}", msg)
            }
            other => panic!("expected InvalidOperand, got {:?}", other),
        }
        let nested_ty = Type::new_tuple(vec![Type::new_array(Type::Bits(5), 2)]);
        let nested = IrValue::make_tuple(&[two]);
        let result = translate_literal_value(&ctx, &nested_ty, &nested);
        assert!(matches!(result, Err(TranslationError::InvalidOperand(_))));
    }

    #[test]
    fn test_array_literal_elements_and_clamping() {
        let ctx = SolverContext::new();
        let data = ArrayTypeData {
            element_type: Box::new(Type::Bits(8)),
            element_count: 3,
        };
        let ty = Type::Array(data.clone());
        let value = IrValue::make_array(&[
            IrValue::make_ubits(8, 10).unwrap(),
            IrValue::make_ubits(8, 20).unwrap(),
            IrValue::make_ubits(8, 30).unwrap(),
        ])
        .unwrap();
        let array = translate_literal_value(&ctx, &ty, &value).unwrap();
        let at = |index: u64, width: usize| {
            get_array_element(&ctx, &data, array, ctx.bv_u64(index, width))
        };
        assert!(is_valid(&ctx, ctx.eq_bool(at(1, 2), ctx.bv_u64(20, 8))));
        // Narrow, exact and wide indices past the end all clamp to element 2.
        assert!(is_valid(&ctx, ctx.eq_bool(at(3, 2), ctx.bv_u64(30, 8))));
        assert!(is_valid(&ctx, ctx.eq_bool(at(1, 1), ctx.bv_u64(20, 8))));
        assert!(is_valid(&ctx, ctx.eq_bool(at(0x104, 16), ctx.bv_u64(30, 8))));
    }

    #[test]
    fn test_zero_of_nested_sort() {
        let ctx = SolverContext::new();
        let ty = Type::new_tuple(vec![Type::Bits(4), Type::new_array(Type::Bits(2), 2)]);
        let sort = type_to_sort(&ctx, &ty);
        let zero = zero_of_sort(&ctx, sort);
        let value = IrValue::make_tuple(&[
            IrValue::make_ubits(4, 0).unwrap(),
            IrValue::make_array(&[
                IrValue::make_ubits(2, 0).unwrap(),
                IrValue::make_ubits(2, 0).unwrap(),
            ])
            .unwrap(),
        ]);
        let literal = translate_literal_value(&ctx, &ty, &value).unwrap();
        let first = tuple_field(&ctx, zero, 0);
        assert!(is_valid(&ctx, ctx.eq_bool(first, ctx.bv_u64(0, 4))));
        // Arrays built by store over a zero default equal the zero array.
        assert!(is_valid(&ctx, ctx.eq_bool(zero, literal)));
    }
}
