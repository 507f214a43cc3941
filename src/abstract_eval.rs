// SPDX-License-Identifier: Apache-2.0

//! Bit-level semantics of multi-bit operations, written once against an
//! abstract boolean algebra.
//!
//! Bit vectors here are slices of elements with index 0 as the least
//! significant bit. Instantiating the algebra with 1-bit Z3 vectors yields
//! the solver encoding; instantiating it with `bool` yields a concrete
//! evaluator.

use crate::z3_api::{Expr, SolverContext};

pub trait AbstractEvaluator {
    type Element: Clone;

    fn one(&self) -> Self::Element;
    fn zero(&self) -> Self::Element;
    fn not(&self, a: &Self::Element) -> Self::Element;
    fn and(&self, a: &Self::Element, b: &Self::Element) -> Self::Element;
    fn or(&self, a: &Self::Element, b: &Self::Element) -> Self::Element;

    fn xor(&self, a: &Self::Element, b: &Self::Element) -> Self::Element {
        let a_only = self.and(a, &self.not(b));
        let b_only = self.and(&self.not(a), b);
        self.or(&a_only, &b_only)
    }

    fn and_reduce(&self, bits: &[Self::Element]) -> Self::Element {
        bits.iter().fold(self.one(), |acc, b| self.and(&acc, b))
    }

    fn or_reduce(&self, bits: &[Self::Element]) -> Self::Element {
        bits.iter().fold(self.zero(), |acc, b| self.or(&acc, b))
    }

    fn equals(&self, a: &[Self::Element], b: &[Self::Element]) -> Self::Element {
        assert_eq!(a.len(), b.len(), "equals requires equal widths");
        let same: Vec<Self::Element> = a
            .iter()
            .zip(b)
            .map(|(x, y)| self.not(&self.xor(x, y)))
            .collect();
        self.and_reduce(&same)
    }

    /// Unsigned `a < b`.
    fn u_less_than(&self, a: &[Self::Element], b: &[Self::Element]) -> Self::Element {
        assert_eq!(a.len(), b.len(), "u_less_than requires equal widths");
        // Scan upward so the most significant differing bit decides.
        let mut lt = self.zero();
        for (x, y) in a.iter().zip(b) {
            let here = self.and(&self.not(x), y);
            let same = self.not(&self.xor(x, y));
            lt = self.or(&here, &self.and(&same, &lt));
        }
        lt
    }

    /// `value` as a `width`-element constant vector.
    fn bits_to_vector(&self, value: u64, width: usize) -> Vec<Self::Element> {
        (0..width)
            .map(|i| {
                if i < 64 && (value >> i) & 1 == 1 {
                    self.one()
                } else {
                    self.zero()
                }
            })
            .collect()
    }

    /// OR over all cases whose selector bit is set.
    ///
    /// With `selector_can_be_zero` false the selector is assumed one-hot;
    /// the result is the same formula either way.
    fn one_hot_select(
        &self,
        selector: &[Self::Element],
        cases: &[Vec<Self::Element>],
        selector_can_be_zero: bool,
    ) -> Vec<Self::Element> {
        assert_eq!(
            selector.len(),
            cases.len(),
            "one_hot_select needs one selector bit per case (zero allowed: {})",
            selector_can_be_zero
        );
        let width = cases.first().map_or(0, |c| c.len());
        let mut result = vec![self.zero(); width];
        for (sel_bit, case) in selector.iter().zip(cases) {
            assert_eq!(case.len(), width, "select cases must have equal widths");
            for (r, c) in result.iter_mut().zip(case) {
                *r = self.or(r, &self.and(sel_bit, c));
            }
        }
        result
    }

    /// Indexed selection with an optional default for selector values past
    /// the last case.
    fn select(
        &self,
        selector: &[Self::Element],
        cases: &[Vec<Self::Element>],
        default_value: Option<&[Self::Element]>,
    ) -> Vec<Self::Element> {
        let mut one_hot: Vec<Self::Element> = (0..cases.len())
            .map(|i| self.equals(selector, &self.bits_to_vector(i as u64, selector.len())))
            .collect();
        let mut all_cases: Vec<Vec<Self::Element>> = cases.to_vec();
        if let Some(default_value) = default_value {
            let past_last = match cases.len().checked_sub(1) {
                Some(last) => {
                    self.u_less_than(&self.bits_to_vector(last as u64, selector.len()), selector)
                }
                // With no cases every selector value falls through.
                None => self.one(),
            };
            one_hot.push(past_last);
            all_cases.push(default_value.to_vec());
        }
        self.one_hot_select(&one_hot, &all_cases, default_value.is_some())
    }

    /// Bit `j` of the result ORs every input bit whose index has bit `j` set.
    fn encode(&self, input: &[Self::Element]) -> Vec<Self::Element> {
        let width = crate::sorts::ceil_log2(input.len());
        (0..width)
            .map(|j| {
                let contributors: Vec<Self::Element> = input
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| (i >> j) & 1 == 1)
                    .map(|(_, bit)| bit.clone())
                    .collect();
                self.or_reduce(&contributors)
            })
            .collect()
    }

    /// Isolates the lowest (or highest) set bit; the extra top bit is set
    /// when the input is zero.
    fn one_hot(&self, input: &[Self::Element], lsb_prio: bool) -> Vec<Self::Element> {
        let n = input.len();
        let mut result = vec![self.zero(); n + 1];
        let mut none_seen = self.one();
        let order: Vec<usize> = if lsb_prio {
            (0..n).collect()
        } else {
            (0..n).rev().collect()
        };
        for i in order {
            result[i] = self.and(&input[i], &none_seen);
            none_seen = self.and(&none_seen, &self.not(&input[i]));
        }
        result[n] = none_seen;
        result
    }

    fn reverse(&self, input: &[Self::Element]) -> Vec<Self::Element> {
        input.iter().rev().cloned().collect()
    }
}

/// Algebra over 1-bit Z3 bit-vectors.
pub struct Z3AbstractEvaluator<'c> {
    ctx: &'c SolverContext,
}

impl<'c> Z3AbstractEvaluator<'c> {
    pub fn new(ctx: &'c SolverContext) -> Self {
        Z3AbstractEvaluator { ctx }
    }
}

impl<'c> AbstractEvaluator for Z3AbstractEvaluator<'c> {
    type Element = Expr<'c>;

    fn one(&self) -> Expr<'c> {
        self.ctx.fill(true, 1)
    }

    fn zero(&self) -> Expr<'c> {
        self.ctx.fill(false, 1)
    }

    fn not(&self, a: &Expr<'c>) -> Expr<'c> {
        self.ctx.bvnot(*a)
    }

    fn and(&self, a: &Expr<'c>, b: &Expr<'c>) -> Expr<'c> {
        self.ctx.bvand(*a, *b)
    }

    fn or(&self, a: &Expr<'c>, b: &Expr<'c>) -> Expr<'c> {
        self.ctx.bvor(*a, *b)
    }
}
