// SPDX-License-Identifier: Apache-2.0

//! Translation of an IR function into Z3 terms, one node at a time in
//! dependency order.
//!
//! Every bits-typed node becomes a bit-vector term of the node's width;
//! tuples become Z3 tuple datatypes and arrays become Z3 arrays indexed by
//! bit-vectors. Operations whose semantics are defined per bit (selects,
//! `encode`, `one_hot`, `reverse`) go through the shared abstract evaluator.

use std::collections::HashMap;
use std::time::Duration;

use z3_sys::Z3_ast;

use crate::abstract_eval::{AbstractEvaluator, Z3AbstractEvaluator};
use crate::error_handler::ScopedErrorHandler;
use crate::flatten::{flatten_value, unflatten_value};
use crate::ir::{self, Binop, NaryOp, NodePayload, NodeRef, ParamId, Type, Unop};
use crate::ir_utils::get_topological;
use crate::ir_value::IrValue;
use crate::literal::{
    create_array, create_tuple, get_array_element, translate_literal_value, tuple_field,
};
use crate::sorts::type_to_sort;
use crate::translation_error::TranslationError;
use crate::z3_api::{Expr, SolverContext, SortKind, Z3Options};

enum ContextRef<'a> {
    Owned(SolverContext),
    Borrowed(&'a SolverContext),
}

impl ContextRef<'_> {
    fn get(&self) -> &SolverContext {
        match self {
            ContextRef::Owned(ctx) => ctx,
            ContextRef::Borrowed(ctx) => ctx,
        }
    }
}

/// The Z3 encoding of one IR function.
///
/// A translation either owns its solver context (and tears it down when
/// dropped) or borrows one shared with other translations, which is how two
/// functions are placed in the same context for an equivalence query.
pub struct Translation<'a> {
    context: ContextRef<'a>,
    f: &'a ir::Fn,
    // Raw handles; `get_translation` re-attaches them to the context borrow.
    translations: HashMap<NodeRef, Z3_ast>,
    timeout: Option<Duration>,
}

impl<'a> Translation<'a> {
    /// Translates `f` in a fresh context configured with proof generation.
    pub fn create_and_translate(f: &'a ir::Fn) -> Result<Self, TranslationError> {
        Self::create_and_translate_with_options(f, &Z3Options::default())
    }

    pub fn create_and_translate_with_options(
        f: &'a ir::Fn,
        options: &Z3Options,
    ) -> Result<Self, TranslationError> {
        let ctx = SolverContext::with_options(options);
        let translations = translate_fn(&ctx, f, None)?;
        Ok(Translation {
            context: ContextRef::Owned(ctx),
            f,
            translations,
            timeout: options.get_timeout(),
        })
    }

    /// Translates `f` into an existing context.
    ///
    /// When `imported_params` is given, parameter `i` of `f` is bound to
    /// `imported_params[i]` instead of a fresh symbolic constant.
    pub fn create_and_translate_in(
        ctx: &'a SolverContext,
        f: &'a ir::Fn,
        imported_params: Option<&[Expr<'a>]>,
    ) -> Result<Self, TranslationError> {
        let translations = translate_fn(ctx, f, imported_params)?;
        Ok(Translation {
            context: ContextRef::Borrowed(ctx),
            f,
            translations,
            timeout: None,
        })
    }

    pub fn ctx(&self) -> &SolverContext {
        self.context.get()
    }

    pub fn function(&self) -> &'a ir::Fn {
        self.f
    }

    pub fn owns_context(&self) -> bool {
        matches!(self.context, ContextRef::Owned(_))
    }

    /// Returns the term for `node`.
    ///
    /// Panics if the node was never translated; every node of a successfully
    /// translated function has a term.
    pub fn get_translation(&self, node: NodeRef) -> Expr<'_> {
        match self.translations.get(&node) {
            Some(ast) => Expr::from_raw(*ast),
            None => panic!(
                "No translation for node {} of fn {}",
                ir::node_textual_id(self.f, node),
                self.f.name
            ),
        }
    }

    pub fn get_return_value(&self) -> Expr<'_> {
        let ret = self
            .f
            .ret_node_ref
            .unwrap_or_else(|| panic!("fn {} has no return value", self.f.name));
        self.get_translation(ret)
    }

    /// Terms bound to the function's parameters, in signature order.
    pub fn get_param_values(&self) -> Vec<Expr<'_>> {
        self.f
            .params
            .iter()
            .map(|param| {
                let nr = param_node(self.f, param.id);
                self.get_translation(nr)
            })
            .collect()
    }

    /// Sort kind of the node's term; predicates only apply to bit-vectors.
    pub fn value_kind(&self, node: NodeRef) -> SortKind {
        self.ctx().kind_of(self.get_translation(node))
    }

    /// Sets the solver timeout used by later proof attempts on this context.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.ctx().set_timeout(timeout);
        self.timeout = Some(timeout);
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

fn param_node(f: &ir::Fn, id: ParamId) -> NodeRef {
    f.node_refs()
        .into_iter()
        .find(|nr| matches!(f.get_node(*nr).payload, NodePayload::GetParam(pid) if pid == id))
        .unwrap_or_else(|| panic!("fn {} has no node for param id {:?}", f.name, id))
}

fn translate_fn<'c>(
    ctx: &'c SolverContext,
    f: &ir::Fn,
    imported_params: Option<&[Expr<'c>]>,
) -> Result<HashMap<NodeRef, Z3_ast>, TranslationError> {
    if let Some(params) = imported_params {
        if params.len() != f.params.len() {
            return Err(TranslationError::InvalidArgument(format!(
                "fn {} takes {} params but {} were imported",
                f.name,
                f.params.len(),
                params.len()
            )));
        }
    }
    log::debug!("translating fn {} ({} nodes)", f.name, f.nodes.len());
    let mut translator = Translator {
        ctx,
        f,
        imported_params,
        values: HashMap::new(),
    };
    for nr in get_topological(f) {
        if let Err(e) = translator.translate_node(nr) {
            log::debug!("translation of fn {} stopped: {}", f.name, e);
            return Err(e);
        }
    }
    Ok(translator
        .values
        .into_iter()
        .map(|(nr, value)| (nr, value.raw()))
        .collect())
}

struct Translator<'c, 'f> {
    ctx: &'c SolverContext,
    f: &'f ir::Fn,
    imported_params: Option<&'f [Expr<'c>]>,
    values: HashMap<NodeRef, Expr<'c>>,
}

impl<'c, 'f> Translator<'c, 'f> {
    fn note_translation(&mut self, nr: NodeRef, value: Expr<'c>) {
        self.values.insert(nr, value);
    }

    fn get_value(&self, nr: NodeRef) -> Expr<'c> {
        match self.values.get(&nr) {
            Some(value) => *value,
            None => panic!(
                "operand {} used before it was translated",
                ir::node_textual_id(self.f, nr)
            ),
        }
    }

    fn node_ty(&self, nr: NodeRef) -> &'f Type {
        let f = self.f;
        f.get_node_ty(nr)
    }

    /// The term for a bits-typed node; checks it is a bit-vector of the
    /// node's width.
    fn get_bit_vec(&self, nr: NodeRef) -> Expr<'c> {
        let value = self.get_value(nr);
        let kind = self.ctx.kind_of(value);
        assert_eq!(
            kind,
            SortKind::BitVector,
            "node {} is not bits-valued",
            ir::node_textual_id(self.f, nr)
        );
        let width = self.ctx.bv_width(value);
        assert_eq!(
            width,
            self.node_ty(nr).bit_count(),
            "width of term for {} does not match its type",
            ir::node_textual_id(self.f, nr)
        );
        value
    }

    fn node_string(&self, nr: NodeRef) -> String {
        self.f.get_node(nr).to_string(self.f)
    }

    fn default_handler(&self, nr: NodeRef) -> Result<(), TranslationError> {
        Err(TranslationError::Unimplemented(format!(
            "Unhandled node for conversion: {}",
            self.node_string(nr)
        )))
    }

    fn unrepresentable(&self, nr: NodeRef) -> Result<(), TranslationError> {
        Err(TranslationError::Unimplemented(format!(
            "Zero-width bits value cannot be represented: {}",
            self.node_string(nr)
        )))
    }

    fn translate_node(&mut self, nr: NodeRef) -> Result<(), TranslationError> {
        let f = self.f;
        let node = f.get_node(nr);
        log::trace!("translating {}", node.to_string(f));
        match &node.payload {
            NodePayload::GetParam(param_id) => self.handle_param(nr, *param_id),
            NodePayload::Literal(value) => self.handle_literal(nr, value),
            NodePayload::Tuple(elements) => self.handle_tuple(nr, elements),
            NodePayload::Array(elements) => self.handle_array(nr, elements),
            NodePayload::TupleIndex { tuple, index } => self.handle_tuple_index(nr, *tuple, *index),
            NodePayload::ArrayIndex { array, indices } => {
                self.handle_array_index(nr, *array, indices)
            }
            NodePayload::Binop(op, lhs, rhs) => self.handle_binop(nr, *op, *lhs, *rhs),
            NodePayload::Unop(op, arg) => self.handle_unop(nr, *op, *arg),
            NodePayload::Nary(op, args) => self.handle_nary(nr, *op, args),
            NodePayload::SignExt { arg, new_bit_count } => {
                self.handle_extend(nr, *arg, *new_bit_count, true)
            }
            NodePayload::ZeroExt { arg, new_bit_count } => {
                self.handle_extend(nr, *arg, *new_bit_count, false)
            }
            NodePayload::BitSlice { arg, start, width } => {
                self.handle_bit_slice(nr, *arg, *start, *width)
            }
            NodePayload::Sel {
                selector,
                cases,
                default,
            } => self.handle_select(nr, *selector, cases, *default, false),
            NodePayload::OneHotSel { selector, cases } => {
                self.handle_select(nr, *selector, cases, None, true)
            }
            NodePayload::OneHot { arg, lsb_prio } => {
                let lsb_prio = *lsb_prio;
                self.handle_unary_via_abstract_eval(nr, *arg, |e, bits| e.one_hot(bits, lsb_prio))
            }
            NodePayload::Encode { arg } => {
                self.handle_unary_via_abstract_eval(nr, *arg, |e, bits| e.encode(bits))
            }
            NodePayload::ArrayUpdate { .. }
            | NodePayload::DynamicBitSlice { .. }
            | NodePayload::PrioritySel { .. }
            | NodePayload::Decode { .. } => self.default_handler(nr),
        }
    }

    fn handle_param(&mut self, nr: NodeRef, param_id: ParamId) -> Result<(), TranslationError> {
        let f = self.f;
        let index = f
            .get_param_index(param_id)
            .unwrap_or_else(|| panic!("param id {:?} is not in fn {}", param_id, f.name));
        let seh = ScopedErrorHandler::new(self.ctx);
        let value = match self.imported_params {
            Some(params) => params[index],
            None => {
                let param = &f.params[index];
                self.ctx.constant(&param.name, type_to_sort(self.ctx, &param.ty))
            }
        };
        self.note_translation(nr, value);
        seh.finish()
    }

    fn handle_literal(&mut self, nr: NodeRef, value: &IrValue) -> Result<(), TranslationError> {
        let seh = ScopedErrorHandler::new(self.ctx);
        let result = translate_literal_value(self.ctx, self.node_ty(nr), value)?;
        self.note_translation(nr, result);
        seh.finish()
    }

    fn handle_tuple(&mut self, nr: NodeRef, elements: &[NodeRef]) -> Result<(), TranslationError> {
        let seh = ScopedErrorHandler::new(self.ctx);
        let values: Vec<Expr<'c>> = elements.iter().map(|e| self.get_value(*e)).collect();
        let result = create_tuple(self.ctx, self.node_ty(nr), &values);
        self.note_translation(nr, result);
        seh.finish()
    }

    fn handle_array(&mut self, nr: NodeRef, elements: &[NodeRef]) -> Result<(), TranslationError> {
        let seh = ScopedErrorHandler::new(self.ctx);
        let values: Vec<Expr<'c>> = elements.iter().map(|e| self.get_value(*e)).collect();
        let result = create_array(self.ctx, self.node_ty(nr), &values);
        self.note_translation(nr, result);
        seh.finish()
    }

    fn handle_tuple_index(
        &mut self,
        nr: NodeRef,
        tuple: NodeRef,
        index: usize,
    ) -> Result<(), TranslationError> {
        let seh = ScopedErrorHandler::new(self.ctx);
        let result = tuple_field(self.ctx, self.get_value(tuple), index);
        self.note_translation(nr, result);
        seh.finish()
    }

    /// Applies each index in turn, outermost dimension first.
    fn handle_array_index(
        &mut self,
        nr: NodeRef,
        array: NodeRef,
        indices: &[NodeRef],
    ) -> Result<(), TranslationError> {
        let seh = ScopedErrorHandler::new(self.ctx);
        let mut value = self.get_value(array);
        let mut ty = self.node_ty(array);
        for index in indices {
            let data = match ty {
                Type::Array(data) => data,
                other => panic!(
                    "array_index {} indexes into non-array type {}",
                    ir::node_textual_id(self.f, nr),
                    other
                ),
            };
            value = get_array_element(self.ctx, data, value, self.get_bit_vec(*index));
            ty = data.element_type.as_ref();
        }
        self.note_translation(nr, value);
        seh.finish()
    }

    fn handle_binop(
        &mut self,
        nr: NodeRef,
        op: Binop,
        lhs: NodeRef,
        rhs: NodeRef,
    ) -> Result<(), TranslationError> {
        match op {
            Binop::Umul | Binop::Smul => return self.handle_mul(nr, lhs, rhs, op == Binop::Smul),
            Binop::Shll | Binop::Shrl | Binop::Shra => return self.handle_shift(nr, op, lhs, rhs),
            Binop::Udiv | Binop::Sdiv | Binop::Umod | Binop::Smod => {
                return self.default_handler(nr);
            }
            _ => {}
        }
        let ctx = self.ctx;
        let seh = ScopedErrorHandler::new(ctx);
        let a = self.get_bit_vec(lhs);
        let b = self.get_bit_vec(rhs);
        let result = match op {
            Binop::Add => ctx.bvadd(a, b),
            Binop::Sub => ctx.bvsub(a, b),
            Binop::Eq => ctx.eq(a, b),
            Binop::Ne => ctx.reduce_or(ctx.bvxor(a, b)),
            Binop::Ult => ctx.ult(a, b),
            Binop::Ule => ctx.reduce_or(ctx.bvor(ctx.ult(a, b), ctx.eq(a, b))),
            Binop::Ugt => ctx.bvnot(ctx.bvor(ctx.eq(a, b), ctx.ult(a, b))),
            Binop::Uge => ctx.bvnot(ctx.ult(a, b)),
            Binop::Slt => ctx.slt(a, b),
            Binop::Sle => ctx.reduce_or(ctx.bvor(ctx.slt(a, b), ctx.eq(a, b))),
            Binop::Sgt => ctx.bvnot(ctx.reduce_or(ctx.bvor(ctx.slt(a, b), ctx.eq(a, b)))),
            Binop::Sge => ctx.bvnot(ctx.slt(a, b)),
            Binop::Umul
            | Binop::Smul
            | Binop::Shll
            | Binop::Shrl
            | Binop::Shra
            | Binop::Udiv
            | Binop::Sdiv
            | Binop::Umod
            | Binop::Smod => unreachable!("dispatched above"),
        };
        self.note_translation(nr, result);
        seh.finish()
    }

    /// Shift amounts narrower than the value are zero-extended. Wider
    /// amounts are handled by widening the value instead and slicing the
    /// result back down, which keeps over-shifts saturating.
    fn handle_shift(
        &mut self,
        nr: NodeRef,
        op: Binop,
        lhs: NodeRef,
        rhs: NodeRef,
    ) -> Result<(), TranslationError> {
        let ctx = self.ctx;
        let seh = ScopedErrorHandler::new(ctx);
        let value = self.get_bit_vec(lhs);
        let amount = self.get_bit_vec(rhs);
        let value_width = self.node_ty(lhs).bit_count();
        let amount_width = self.node_ty(rhs).bit_count();
        let shift = |v: Expr<'c>, a: Expr<'c>| match op {
            Binop::Shll => ctx.bvshl(v, a),
            Binop::Shrl => ctx.bvlshr(v, a),
            Binop::Shra => ctx.bvashr(v, a),
            other => unreachable!("{:?} is not a shift", other),
        };
        let result = if amount_width <= value_width {
            let amount = if amount_width < value_width {
                ctx.zero_ext(value_width - amount_width, amount)
            } else {
                amount
            };
            shift(value, amount)
        } else {
            let grow = amount_width - value_width;
            let widened = if op == Binop::Shra {
                ctx.sign_ext(grow, value)
            } else {
                ctx.zero_ext(grow, value)
            };
            ctx.extract(value_width - 1, 0, shift(widened, amount))
        };
        self.note_translation(nr, result);
        seh.finish()
    }

    /// Operands are widened to at least the result width; unsigned operands
    /// get one extra guard bit before multiplying.
    fn handle_mul(
        &mut self,
        nr: NodeRef,
        lhs: NodeRef,
        rhs: NodeRef,
        is_signed: bool,
    ) -> Result<(), TranslationError> {
        let ctx = self.ctx;
        let seh = ScopedErrorHandler::new(ctx);
        let mut a = self.get_bit_vec(lhs);
        let mut b = self.get_bit_vec(rhs);
        let a_width = ctx.bv_width(a);
        let b_width = ctx.bv_width(b);
        let result_width = self.node_ty(nr).bit_count();
        let mut operand_width = a_width.max(b_width).max(result_width);
        if is_signed {
            a = ctx.sign_ext_to(a, operand_width);
            b = ctx.sign_ext_to(b, operand_width);
        } else {
            operand_width += 1;
            a = ctx.zero_ext(operand_width - a_width, a);
            b = ctx.zero_ext(operand_width - b_width, b);
        }
        let mut result = ctx.bvmul(a, b);
        if operand_width != result_width {
            result = ctx.extract(result_width - 1, 0, result);
        }
        self.note_translation(nr, result);
        seh.finish()
    }

    fn handle_unop(&mut self, nr: NodeRef, op: Unop, arg: NodeRef) -> Result<(), TranslationError> {
        let ctx = self.ctx;
        match op {
            Unop::Identity => {
                let value = self.get_value(arg);
                self.note_translation(nr, value);
                Ok(())
            }
            Unop::Neg | Unop::Not => {
                let seh = ScopedErrorHandler::new(ctx);
                let value = self.get_bit_vec(arg);
                let result = if op == Unop::Neg {
                    ctx.bvneg(value)
                } else {
                    ctx.bvnot(value)
                };
                self.note_translation(nr, result);
                seh.finish()
            }
            Unop::Reverse => {
                self.handle_unary_via_abstract_eval(nr, arg, |e, bits| e.reverse(bits))
            }
            Unop::OrReduce | Unop::AndReduce | Unop::XorReduce => self.default_handler(nr),
        }
    }

    /// Left fold over the operands; `nand`/`nor` invert the folded result.
    fn handle_nary(
        &mut self,
        nr: NodeRef,
        op: NaryOp,
        args: &[NodeRef],
    ) -> Result<(), TranslationError> {
        let ctx = self.ctx;
        let combine: for<'a> fn(&'a SolverContext, Expr<'a>, Expr<'a>) -> Expr<'a> = match op {
            NaryOp::And | NaryOp::Nand => SolverContext::bvand,
            NaryOp::Or | NaryOp::Nor => SolverContext::bvor,
            NaryOp::Xor => SolverContext::bvxor,
            NaryOp::Concat => SolverContext::concat,
        };
        let invert = matches!(op, NaryOp::Nand | NaryOp::Nor);
        let seh = ScopedErrorHandler::new(ctx);
        let (first, rest) = args.split_first().unwrap_or_else(|| {
            panic!(
                "{} has no operands",
                ir::node_textual_id(self.f, nr)
            )
        });
        let mut accum = self.get_bit_vec(*first);
        for arg in rest {
            accum = combine(ctx, accum, self.get_bit_vec(*arg));
        }
        if invert {
            accum = ctx.bvnot(accum);
        }
        self.note_translation(nr, accum);
        seh.finish()
    }

    fn handle_extend(
        &mut self,
        nr: NodeRef,
        arg: NodeRef,
        new_bit_count: usize,
        is_signed: bool,
    ) -> Result<(), TranslationError> {
        let ctx = self.ctx;
        let seh = ScopedErrorHandler::new(ctx);
        let value = self.get_bit_vec(arg);
        let old_bit_count = self.node_ty(arg).bit_count();
        let by = new_bit_count.checked_sub(old_bit_count).unwrap_or_else(|| {
            panic!(
                "{} narrows {} bits to {}",
                ir::node_textual_id(self.f, nr),
                old_bit_count,
                new_bit_count
            )
        });
        let result = if is_signed {
            ctx.sign_ext(by, value)
        } else {
            ctx.zero_ext(by, value)
        };
        self.note_translation(nr, result);
        seh.finish()
    }

    fn handle_bit_slice(
        &mut self,
        nr: NodeRef,
        arg: NodeRef,
        start: usize,
        width: usize,
    ) -> Result<(), TranslationError> {
        if width == 0 {
            return self.unrepresentable(nr);
        }
        let ctx = self.ctx;
        let seh = ScopedErrorHandler::new(ctx);
        let value = self.get_bit_vec(arg);
        let result = ctx.extract(start + width - 1, start, value);
        self.note_translation(nr, result);
        seh.finish()
    }

    /// Selection is evaluated per bit: the selector and every case are
    /// flattened, combined bitwise, then reassembled into the result type.
    fn handle_select(
        &mut self,
        nr: NodeRef,
        selector: NodeRef,
        cases: &[NodeRef],
        default: Option<NodeRef>,
        one_hot: bool,
    ) -> Result<(), TranslationError> {
        let ctx = self.ctx;
        let seh = ScopedErrorHandler::new(ctx);
        let selector_bits = ctx.explode_bits(self.get_bit_vec(selector));
        let flatten_node =
            |node: NodeRef| flatten_value(ctx, self.node_ty(node), self.get_value(node));
        let case_bits: Vec<Vec<Expr<'c>>> = cases.iter().map(|c| flatten_node(*c)).collect();
        let evaluator = Z3AbstractEvaluator::new(ctx);
        let mut flat = if one_hot {
            evaluator.one_hot_select(&selector_bits, &case_bits, false)
        } else {
            let default_bits = default.map(flatten_node);
            evaluator.select(&selector_bits, &case_bits, default_bits.as_deref())
        };
        flat.reverse();
        let result = unflatten_value(ctx, self.node_ty(nr), &flat);
        self.note_translation(nr, result);
        seh.finish()
    }

    /// Runs a per-bit definition of a unary operation over the operand's
    /// exploded bits and concatenates the result.
    fn handle_unary_via_abstract_eval<F>(
        &mut self,
        nr: NodeRef,
        arg: NodeRef,
        op: F,
    ) -> Result<(), TranslationError>
    where
        F: FnOnce(&Z3AbstractEvaluator<'c>, &[Expr<'c>]) -> Vec<Expr<'c>>,
    {
        let ctx = self.ctx;
        let seh = ScopedErrorHandler::new(ctx);
        let bits = ctx.explode_bits(self.get_bit_vec(arg));
        let evaluator = Z3AbstractEvaluator::new(ctx);
        let mut out = op(&evaluator, &bits);
        if out.is_empty() {
            return self.unrepresentable(nr);
        }
        assert_eq!(
            out.len(),
            self.node_ty(nr).bit_count(),
            "abstract evaluation of {} produced the wrong width",
            ir::node_textual_id(self.f, nr)
        );
        out.reverse();
        let result = ctx.concat_n(&out);
        self.note_translation(nr, result);
        seh.finish()
    }
}
