// SPDX-License-Identifier: Apache-2.0

//! Thin safe layer over the `z3-sys` C API.
//!
//! `Expr`, `Sort` and `FuncDecl` are copyable handles that borrow the
//! `SolverContext` that created them, so they cannot outlive it. Every
//! constructor here is infallible at the Rust level: if Z3 rejects an
//! operation it reports through the context's error handler (see
//! `error_handler::ScopedErrorHandler`) and hands back a null handle.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::os::raw::{c_char, c_uint};
use std::time::Duration;

use z3_sys::{
    Z3_ast, Z3_config, Z3_context, Z3_func_decl, Z3_model, Z3_solver, Z3_sort, Z3_symbol,
};

/// Converts a string returned by Z3 into an owned `String`.
///
/// Z3 returns null after an error, so that case is rendered as `<null>`.
pub(crate) fn z3_string_to_owned(s: *const c_char) -> String {
    if s.is_null() {
        return "<null>".to_string();
    }
    unsafe { CStr::from_ptr(s) }.to_string_lossy().into_owned()
}

fn to_cstring(s: &str) -> CString {
    CString::new(s).unwrap_or_else(|_| panic!("symbol name contains NUL: {:?}", s))
}

fn duration_to_millis(timeout: Duration) -> c_uint {
    timeout.as_millis().min(c_uint::MAX as u128) as c_uint
}

/// Options applied to the Z3 configuration when a `SolverContext` is created.
#[derive(Debug, Clone)]
pub struct Z3Options {
    proof: bool,
    model: bool,
    timeout: Option<Duration>,
}

impl Default for Z3Options {
    fn default() -> Self {
        Z3Options {
            proof: true,
            model: true,
            timeout: None,
        }
    }
}

impl Z3Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proofs(&mut self, enabled: bool) -> &mut Self {
        self.proof = enabled;
        self
    }

    pub fn models(&mut self, enabled: bool) -> &mut Self {
        self.model = enabled;
        self
    }

    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Kinds of Z3 sorts the translator produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKind {
    Bool,
    BitVector,
    Array,
    Tuple,
    FloatingPoint,
    Other,
}

impl std::fmt::Display for SortKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SortKind::Bool => "bool",
            SortKind::BitVector => "bit-vector",
            SortKind::Array => "array",
            SortKind::Tuple => "tuple",
            SortKind::FloatingPoint => "floating-point",
            SortKind::Other => "other",
        };
        write!(f, "{}", s)
    }
}

macro_rules! z3_handle {
    ($name:ident, $raw:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name<'ctx> {
            raw: $raw,
            _ctx: PhantomData<&'ctx SolverContext>,
        }

        impl<'ctx> $name<'ctx> {
            pub(crate) fn from_raw(raw: $raw) -> Self {
                $name {
                    raw,
                    _ctx: PhantomData,
                }
            }

            pub fn raw(&self) -> $raw {
                self.raw
            }

            /// True when Z3 failed to produce this handle.
            pub fn is_null(&self) -> bool {
                self.raw.is_null()
            }
        }
    };
}

z3_handle!(Expr, Z3_ast);
z3_handle!(Sort, Z3_sort);
z3_handle!(FuncDecl, Z3_func_decl);

/// An owned Z3 context together with the configuration it was created from.
///
/// Contexts are not thread safe; a context may be moved to another thread
/// but never shared.
pub struct SolverContext {
    config: Z3_config,
    ctx: Z3_context,
    tuple_sorts: RefCell<HashMap<String, Z3_sort>>,
}

unsafe impl Send for SolverContext {}

impl Default for SolverContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverContext {
    pub fn new() -> Self {
        Self::with_options(&Z3Options::default())
    }

    pub fn with_options(options: &Z3Options) -> Self {
        let config = unsafe { z3_sys::Z3_mk_config() };
        let set = |key: &CStr, value: &str| {
            let value = to_cstring(value);
            unsafe { z3_sys::Z3_set_param_value(config, key.as_ptr(), value.as_ptr()) };
        };
        set(c"proof", if options.proof { "true" } else { "false" });
        set(c"model", if options.model { "true" } else { "false" });
        if let Some(timeout) = options.timeout {
            set(c"timeout", &duration_to_millis(timeout).to_string());
        }
        let ctx = unsafe { z3_sys::Z3_mk_context(config) };
        // Without a handler Z3 only records the error code; its default
        // handler would terminate the process.
        unsafe { z3_sys::Z3_set_error_handler(ctx, None) };
        log::debug!("created Z3 context {:p} with {:?}", ctx, options);
        SolverContext {
            config,
            ctx,
            tuple_sorts: RefCell::new(HashMap::new()),
        }
    }

    pub fn raw(&self) -> Z3_context {
        self.ctx
    }

    /// Updates the context-wide solver timeout.
    pub fn set_timeout(&self, timeout: Duration) {
        let value = to_cstring(&duration_to_millis(timeout).to_string());
        unsafe { z3_sys::Z3_update_param_value(self.ctx, c"timeout".as_ptr(), value.as_ptr()) };
    }

    fn symbol(&self, name: &str) -> Z3_symbol {
        let name = to_cstring(name);
        unsafe { z3_sys::Z3_mk_string_symbol(self.ctx, name.as_ptr()) }
    }

    fn expr(&self, ast: Z3_ast) -> Expr<'_> {
        Expr::from_raw(ast)
    }

    // -- Sorts

    pub fn bv_sort(&self, width: usize) -> Sort<'_> {
        Sort::from_raw(unsafe { z3_sys::Z3_mk_bv_sort(self.ctx, width as c_uint) })
    }

    pub fn array_sort<'a>(&'a self, domain: Sort<'a>, range: Sort<'a>) -> Sort<'a> {
        Sort::from_raw(unsafe { z3_sys::Z3_mk_array_sort(self.ctx, domain.raw, range.raw) })
    }

    /// Returns the tuple sort registered under `name`, creating it on first
    /// use so one name always denotes one sort in this context.
    pub fn tuple_sort<'a>(&'a self, name: &str, field_sorts: &[Sort<'a>]) -> Sort<'a> {
        if let Some(sort) = self.tuple_sorts.borrow().get(name) {
            return Sort::from_raw(*sort);
        }
        let field_names: Vec<Z3_symbol> = (0..field_sorts.len())
            .map(|i| self.symbol(&format!("{}_{}", name, i)))
            .collect();
        let raw_sorts: Vec<Z3_sort> = field_sorts.iter().map(|s| s.raw).collect();
        let mut mk_tuple_decl: Z3_func_decl = std::ptr::null_mut();
        let mut proj_decls: Vec<Z3_func_decl> = vec![std::ptr::null_mut(); field_sorts.len()];
        let sort = unsafe {
            z3_sys::Z3_mk_tuple_sort(
                self.ctx,
                self.symbol(name),
                field_sorts.len() as c_uint,
                field_names.as_ptr(),
                raw_sorts.as_ptr(),
                &mut mk_tuple_decl,
                proj_decls.as_mut_ptr(),
            )
        };
        if !sort.is_null() {
            self.tuple_sorts.borrow_mut().insert(name.to_string(), sort);
        }
        Sort::from_raw(sort)
    }

    pub fn fpa_sort_32(&self) -> Sort<'_> {
        Sort::from_raw(unsafe { z3_sys::Z3_mk_fpa_sort_32(self.ctx) })
    }

    pub fn sort_of<'a>(&'a self, e: Expr<'a>) -> Sort<'a> {
        Sort::from_raw(unsafe { z3_sys::Z3_get_sort(self.ctx, e.raw) })
    }

    pub fn sort_kind(&self, sort: Sort<'_>) -> SortKind {
        if sort.is_null() {
            return SortKind::Other;
        }
        match unsafe { z3_sys::Z3_get_sort_kind(self.ctx, sort.raw) } {
            z3_sys::SortKind::Bool => SortKind::Bool,
            z3_sys::SortKind::BV => SortKind::BitVector,
            z3_sys::SortKind::Array => SortKind::Array,
            z3_sys::SortKind::Datatype => SortKind::Tuple,
            z3_sys::SortKind::FloatingPoint => SortKind::FloatingPoint,
            _ => SortKind::Other,
        }
    }

    pub fn kind_of(&self, e: Expr<'_>) -> SortKind {
        if e.is_null() {
            return SortKind::Other;
        }
        self.sort_kind(self.sort_of(e))
    }

    pub fn bv_sort_width(&self, sort: Sort<'_>) -> usize {
        unsafe { z3_sys::Z3_get_bv_sort_size(self.ctx, sort.raw) as usize }
    }

    /// Width of a bit-vector expression.
    pub fn bv_width(&self, e: Expr<'_>) -> usize {
        self.bv_sort_width(self.sort_of(e))
    }

    pub fn array_domain<'a>(&'a self, sort: Sort<'a>) -> Sort<'a> {
        Sort::from_raw(unsafe { z3_sys::Z3_get_array_sort_domain(self.ctx, sort.raw) })
    }

    pub fn array_range<'a>(&'a self, sort: Sort<'a>) -> Sort<'a> {
        Sort::from_raw(unsafe { z3_sys::Z3_get_array_sort_range(self.ctx, sort.raw) })
    }

    pub fn tuple_field_count(&self, sort: Sort<'_>) -> usize {
        unsafe { z3_sys::Z3_get_tuple_sort_num_fields(self.ctx, sort.raw) as usize }
    }

    pub fn tuple_field_decl<'a>(&'a self, sort: Sort<'a>, index: usize) -> FuncDecl<'a> {
        FuncDecl::from_raw(unsafe {
            z3_sys::Z3_get_tuple_sort_field_decl(self.ctx, sort.raw, index as c_uint)
        })
    }

    pub fn tuple_constructor<'a>(&'a self, sort: Sort<'a>) -> FuncDecl<'a> {
        FuncDecl::from_raw(unsafe { z3_sys::Z3_get_tuple_sort_mk_decl(self.ctx, sort.raw) })
    }

    pub fn decl_range<'a>(&'a self, decl: FuncDecl<'a>) -> Sort<'a> {
        Sort::from_raw(unsafe { z3_sys::Z3_get_range(self.ctx, decl.raw) })
    }

    pub fn sort_to_string(&self, sort: Sort<'_>) -> String {
        z3_string_to_owned(unsafe { z3_sys::Z3_sort_to_string(self.ctx, sort.raw) })
    }

    pub fn expr_to_string(&self, e: Expr<'_>) -> String {
        z3_string_to_owned(unsafe { z3_sys::Z3_ast_to_string(self.ctx, e.raw) })
    }

    // -- Terms

    pub fn constant<'a>(&'a self, name: &str, sort: Sort<'a>) -> Expr<'a> {
        let symbol = self.symbol(name);
        self.expr(unsafe { z3_sys::Z3_mk_const(self.ctx, symbol, sort.raw) })
    }

    pub fn app<'a>(&'a self, decl: FuncDecl<'a>, args: &[Expr<'a>]) -> Expr<'a> {
        let raw_args: Vec<Z3_ast> = args.iter().map(|a| a.raw).collect();
        self.expr(unsafe {
            z3_sys::Z3_mk_app(self.ctx, decl.raw, raw_args.len() as c_uint, raw_args.as_ptr())
        })
    }

    /// Bit-vector numeral from bits given least significant first.
    pub fn bv_numeral(&self, bits_lsb_first: &[bool]) -> Expr<'_> {
        self.expr(unsafe {
            z3_sys::Z3_mk_bv_numeral(
                self.ctx,
                bits_lsb_first.len() as c_uint,
                bits_lsb_first.as_ptr(),
            )
        })
    }

    pub fn bv_u64(&self, value: u64, width: usize) -> Expr<'_> {
        let sort = self.bv_sort(width);
        self.expr(unsafe { z3_sys::Z3_mk_unsigned_int64(self.ctx, value, sort.raw) })
    }

    /// The numeral zero in `sort` (bit-vector or other numeric sorts).
    pub fn int_numeral<'a>(&'a self, value: i32, sort: Sort<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_int(self.ctx, value, sort.raw) })
    }

    /// A `width`-bit vector with every bit equal to `value`.
    pub fn fill(&self, value: bool, width: usize) -> Expr<'_> {
        self.bv_numeral(&vec![value; width])
    }

    pub fn bvadd<'a>(&'a self, a: Expr<'a>, b: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_bvadd(self.ctx, a.raw, b.raw) })
    }

    pub fn bvsub<'a>(&'a self, a: Expr<'a>, b: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_bvsub(self.ctx, a.raw, b.raw) })
    }

    pub fn bvmul<'a>(&'a self, a: Expr<'a>, b: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_bvmul(self.ctx, a.raw, b.raw) })
    }

    pub fn bvand<'a>(&'a self, a: Expr<'a>, b: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_bvand(self.ctx, a.raw, b.raw) })
    }

    pub fn bvor<'a>(&'a self, a: Expr<'a>, b: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_bvor(self.ctx, a.raw, b.raw) })
    }

    pub fn bvxor<'a>(&'a self, a: Expr<'a>, b: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_bvxor(self.ctx, a.raw, b.raw) })
    }

    pub fn bvnot<'a>(&'a self, a: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_bvnot(self.ctx, a.raw) })
    }

    pub fn bvneg<'a>(&'a self, a: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_bvneg(self.ctx, a.raw) })
    }

    pub fn bvredor<'a>(&'a self, a: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_bvredor(self.ctx, a.raw) })
    }

    pub fn bvshl<'a>(&'a self, a: Expr<'a>, b: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_bvshl(self.ctx, a.raw, b.raw) })
    }

    pub fn bvlshr<'a>(&'a self, a: Expr<'a>, b: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_bvlshr(self.ctx, a.raw, b.raw) })
    }

    pub fn bvashr<'a>(&'a self, a: Expr<'a>, b: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_bvashr(self.ctx, a.raw, b.raw) })
    }

    /// Concatenation; `high` supplies the most significant bits.
    pub fn concat<'a>(&'a self, high: Expr<'a>, low: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_concat(self.ctx, high.raw, low.raw) })
    }

    /// Bits `[high:low]`, inclusive on both ends.
    pub fn extract<'a>(&'a self, high: usize, low: usize, e: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_extract(self.ctx, high as c_uint, low as c_uint, e.raw) })
    }

    pub fn zero_ext<'a>(&'a self, by: usize, e: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_zero_ext(self.ctx, by as c_uint, e.raw) })
    }

    pub fn sign_ext<'a>(&'a self, by: usize, e: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_sign_ext(self.ctx, by as c_uint, e.raw) })
    }

    pub fn bvult_bool<'a>(&'a self, a: Expr<'a>, b: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_bvult(self.ctx, a.raw, b.raw) })
    }

    pub fn ite<'a>(&'a self, cond: Expr<'a>, then: Expr<'a>, otherwise: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_ite(self.ctx, cond.raw, then.raw, otherwise.raw) })
    }

    pub fn eq_bool<'a>(&'a self, a: Expr<'a>, b: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_eq(self.ctx, a.raw, b.raw) })
    }

    pub fn not_bool<'a>(&'a self, a: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_not(self.ctx, a.raw) })
    }

    pub fn const_array<'a>(&'a self, domain: Sort<'a>, value: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_const_array(self.ctx, domain.raw, value.raw) })
    }

    pub fn store<'a>(&'a self, array: Expr<'a>, index: Expr<'a>, value: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_store(self.ctx, array.raw, index.raw, value.raw) })
    }

    pub fn select<'a>(&'a self, array: Expr<'a>, index: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_select(self.ctx, array.raw, index.raw) })
    }

    // -- Floating point

    pub fn fpa_zero<'a>(&'a self, sort: Sort<'a>, negative: bool) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_fpa_zero(self.ctx, sort.raw, negative) })
    }

    pub fn fpa_is_subnormal<'a>(&'a self, e: Expr<'a>) -> Expr<'a> {
        self.expr(unsafe { z3_sys::Z3_mk_fpa_is_subnormal(self.ctx, e.raw) })
    }

    pub fn fpa_fp<'a>(
        &'a self,
        sign: Expr<'a>,
        exponent: Expr<'a>,
        significand: Expr<'a>,
    ) -> Expr<'a> {
        self.expr(unsafe {
            z3_sys::Z3_mk_fpa_fp(self.ctx, sign.raw, exponent.raw, significand.raw)
        })
    }

    // -- Composite bit-vector helpers

    pub fn reduce_or<'a>(&'a self, e: Expr<'a>) -> Expr<'a> {
        self.bvredor(e)
    }

    /// 1-bit vector that is 1 iff `e` is all zeros.
    pub fn eq_zero<'a>(&'a self, e: Expr<'a>) -> Expr<'a> {
        self.bvnot(self.bvredor(e))
    }

    /// 1-bit vector that is 1 iff `a == b`.
    pub fn eq<'a>(&'a self, a: Expr<'a>, b: Expr<'a>) -> Expr<'a> {
        self.eq_zero(self.bvxor(a, b))
    }

    pub fn zext_by_1b<'a>(&'a self, e: Expr<'a>) -> Expr<'a> {
        self.zero_ext(1, e)
    }

    pub fn sext_by_1b<'a>(&'a self, e: Expr<'a>) -> Expr<'a> {
        self.sign_ext(1, e)
    }

    pub fn extract_bit<'a>(&'a self, e: Expr<'a>, bit: usize) -> Expr<'a> {
        self.extract(bit, bit, e)
    }

    /// Single-bit slices of `e`; index 0 holds the least significant bit.
    pub fn explode_bits<'a>(&'a self, e: Expr<'a>) -> Vec<Expr<'a>> {
        let width = self.bv_width(e);
        (0..width).map(|i| self.extract_bit(e, i)).collect()
    }

    pub fn msb<'a>(&'a self, e: Expr<'a>) -> Expr<'a> {
        let width = self.bv_width(e);
        self.extract_bit(e, width - 1)
    }

    /// Sign-extends `e` to exactly `new_width` bits.
    pub fn sign_ext_to<'a>(&'a self, e: Expr<'a>, new_width: usize) -> Expr<'a> {
        let width = self.bv_width(e);
        assert!(new_width >= width, "cannot sign-extend {} bits to {}", width, new_width);
        self.sign_ext(new_width - width, e)
    }

    /// Concatenates `args`; `args[0]` ends up in the most significant bits.
    pub fn concat_n<'a>(&'a self, args: &[Expr<'a>]) -> Expr<'a> {
        let (first, rest) = args
            .split_first()
            .unwrap_or_else(|| panic!("concat_n requires at least one operand"));
        rest.iter().fold(*first, |acc, e| self.concat(acc, *e))
    }

    /// Unsigned less-than as a 1-bit vector: the borrow out of `lhs - rhs`.
    pub fn ult<'a>(&'a self, lhs: Expr<'a>, rhs: Expr<'a>) -> Expr<'a> {
        self.msb(self.bvsub(self.zext_by_1b(lhs), self.zext_by_1b(rhs)))
    }

    /// Signed less-than as a 1-bit vector.
    pub fn slt<'a>(&'a self, lhs: Expr<'a>, rhs: Expr<'a>) -> Expr<'a> {
        self.msb(self.bvsub(self.sext_by_1b(lhs), self.sext_by_1b(rhs)))
    }

    /// Unsigned minimum.
    pub fn min<'a>(&'a self, lhs: Expr<'a>, rhs: Expr<'a>) -> Expr<'a> {
        self.ite(self.bvult_bool(lhs, rhs), lhs, rhs)
    }

    pub fn eq_zero_bool<'a>(&'a self, e: Expr<'a>) -> Expr<'a> {
        let zero = self.int_numeral(0, self.sort_of(e));
        self.eq_bool(e, zero)
    }

    pub fn ne_zero_bool<'a>(&'a self, e: Expr<'a>) -> Expr<'a> {
        self.not_bool(self.eq_zero_bool(e))
    }

    pub fn ne_bool<'a>(&'a self, a: Expr<'a>, b: Expr<'a>) -> Expr<'a> {
        self.not_bool(self.eq_bool(a, b))
    }
}

impl Drop for SolverContext {
    fn drop(&mut self) {
        log::trace!("deleting Z3 context {:p}", self.ctx);
        unsafe {
            z3_sys::Z3_del_context(self.ctx);
            z3_sys::Z3_del_config(self.config);
        }
    }
}

/// Outcome of a satisfiability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Sat,
    Unsat,
    Unknown,
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Response::Sat => "sat",
            Response::Unsat => "unsat",
            Response::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

pub struct Solver<'ctx> {
    ctx: &'ctx SolverContext,
    solver: Z3_solver,
}

impl<'ctx> Solver<'ctx> {
    pub fn new(ctx: &'ctx SolverContext) -> Self {
        let solver = unsafe { z3_sys::Z3_mk_solver(ctx.raw()) };
        unsafe { z3_sys::Z3_solver_inc_ref(ctx.raw(), solver) };
        Solver { ctx, solver }
    }

    pub fn set_timeout(&self, timeout: Duration) {
        let raw_ctx = self.ctx.raw();
        unsafe {
            let params = z3_sys::Z3_mk_params(raw_ctx);
            z3_sys::Z3_params_inc_ref(raw_ctx, params);
            z3_sys::Z3_params_set_uint(
                raw_ctx,
                params,
                self.ctx.symbol("timeout"),
                duration_to_millis(timeout),
            );
            z3_sys::Z3_solver_set_params(raw_ctx, self.solver, params);
            z3_sys::Z3_params_dec_ref(raw_ctx, params);
        }
    }

    pub fn assert(&self, e: Expr<'ctx>) {
        unsafe { z3_sys::Z3_solver_assert(self.ctx.raw(), self.solver, e.raw) };
    }

    pub fn check(&self) -> Response {
        match unsafe { z3_sys::Z3_solver_check(self.ctx.raw(), self.solver) } {
            z3_sys::Z3_L_TRUE => Response::Sat,
            z3_sys::Z3_L_FALSE => Response::Unsat,
            _ => Response::Unknown,
        }
    }

    /// The model from the most recent check; only available after `Sat`.
    pub fn get_model(&self) -> Option<Model<'ctx>> {
        let model = unsafe { z3_sys::Z3_solver_get_model(self.ctx.raw(), self.solver) };
        if model.is_null() {
            return None;
        }
        unsafe { z3_sys::Z3_model_inc_ref(self.ctx.raw(), model) };
        Some(Model {
            ctx: self.ctx,
            model,
        })
    }

    pub fn reason_unknown(&self) -> String {
        z3_string_to_owned(unsafe {
            z3_sys::Z3_solver_get_reason_unknown(self.ctx.raw(), self.solver)
        })
    }
}

impl std::fmt::Display for Solver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = z3_string_to_owned(unsafe {
            z3_sys::Z3_solver_to_string(self.ctx.raw(), self.solver)
        });
        write!(f, "{}", s)
    }
}

impl Drop for Solver<'_> {
    fn drop(&mut self) {
        unsafe { z3_sys::Z3_solver_dec_ref(self.ctx.raw(), self.solver) };
    }
}

pub struct Model<'ctx> {
    ctx: &'ctx SolverContext,
    model: Z3_model,
}

impl<'ctx> Model<'ctx> {
    /// Evaluates `e` under this model; with `completion` set, unconstrained
    /// symbols are given default values.
    pub fn eval(&self, e: Expr<'ctx>, completion: bool) -> Option<Expr<'ctx>> {
        let mut result: Z3_ast = std::ptr::null_mut();
        let ok = unsafe {
            z3_sys::Z3_model_eval(self.ctx.raw(), self.model, e.raw, completion, &mut result)
        };
        if ok && !result.is_null() {
            Some(Expr::from_raw(result))
        } else {
            None
        }
    }

    /// Evaluates `e` and reads the result back as an unsigned integer.
    pub fn eval_u64(&self, e: Expr<'ctx>) -> Option<u64> {
        let value = self.eval(e, true)?;
        let mut out: u64 = 0;
        let ok = unsafe { z3_sys::Z3_get_numeral_uint64(self.ctx.raw(), value.raw, &mut out) };
        if ok {
            Some(out)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Model<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = z3_string_to_owned(unsafe {
            z3_sys::Z3_model_to_string(self.ctx.raw(), self.model)
        });
        write!(f, "{}", s)
    }
}

impl Drop for Model<'_> {
    fn drop(&mut self) {
        unsafe { z3_sys::Z3_model_dec_ref(self.ctx.raw(), self.model) };
    }
}
