// SPDX-License-Identifier: Apache-2.0

//! Scoped capture of errors reported asynchronously by Z3.
//!
//! Z3 reports failures through a per-context callback rather than return
//! values. A `ScopedErrorHandler` installs a callback for its lifetime that
//! records the first error raised on its context. Guards nest: each thread
//! keeps a stack of active guards, errors go to the innermost guard for the
//! reporting context, and dropping a guard restores whatever was active
//! before it.

use std::cell::RefCell;
use std::marker::PhantomData;

use z3_sys::{ErrorCode, Z3_context};

use crate::translation_error::TranslationError;
use crate::z3_api::{z3_string_to_owned, SolverContext};

struct HandlerFrame {
    ctx: Z3_context,
    status: Option<TranslationError>,
}

thread_local! {
    static HANDLER_STACK: RefCell<Vec<HandlerFrame>> = const { RefCell::new(Vec::new()) };
}

unsafe extern "C" fn handle_z3_error(ctx: Z3_context, code: ErrorCode) {
    let message = z3_string_to_owned(unsafe { z3_sys::Z3_get_error_msg(ctx, code) });
    let error = TranslationError::Solver(format!("Z3 error: {}", message));
    log::error!("{}", error);
    // Must not panic: this runs across the FFI boundary.
    let _ = HANDLER_STACK.try_with(|stack| {
        if let Ok(mut stack) = stack.try_borrow_mut() {
            if let Some(frame) = stack.iter_mut().rev().find(|f| f.ctx == ctx) {
                if frame.status.is_none() {
                    frame.status = Some(error);
                }
            }
        }
    });
}

/// Captures Z3 errors raised on one context while the guard is alive.
///
/// Guards must be dropped in reverse order of creation on the thread that
/// created them.
pub struct ScopedErrorHandler<'ctx> {
    ctx: &'ctx SolverContext,
    depth: usize,
    // Frames live in thread-local storage.
    _not_send: PhantomData<*const ()>,
}

impl<'ctx> ScopedErrorHandler<'ctx> {
    pub fn new(ctx: &'ctx SolverContext) -> Self {
        let depth = HANDLER_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(HandlerFrame {
                ctx: ctx.raw(),
                status: None,
            });
            stack.len()
        });
        unsafe { z3_sys::Z3_set_error_handler(ctx.raw(), Some(handle_z3_error)) };
        ScopedErrorHandler {
            ctx,
            depth,
            _not_send: PhantomData,
        }
    }

    /// The first error recorded in this scope so far, if any.
    pub fn status(&self) -> Result<(), TranslationError> {
        let recorded = HANDLER_STACK.with(|stack| {
            stack
                .borrow()
                .get(self.depth - 1)
                .and_then(|frame| frame.status.clone())
        });
        match recorded {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Closes the scope and returns its final status.
    pub fn finish(self) -> Result<(), TranslationError> {
        self.status()
    }
}

impl Drop for ScopedErrorHandler<'_> {
    fn drop(&mut self) {
        let raw_ctx = self.ctx.raw();
        let still_guarded = HANDLER_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            assert_eq!(
                stack.len(),
                self.depth,
                "ScopedErrorHandler dropped out of order"
            );
            stack.pop();
            stack.iter().any(|frame| frame.ctx == raw_ctx)
        });
        let handler: z3_sys::Z3_error_handler = if still_guarded {
            Some(handle_z3_error)
        } else {
            None
        };
        unsafe { z3_sys::Z3_set_error_handler(raw_ctx, handler) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provoke_sort_error(ctx: &SolverContext) {
        let narrow = ctx.bv_u64(1, 4);
        let wide = ctx.bv_u64(1, 8);
        let sum = ctx.bvadd(narrow, wide);
        assert!(sum.is_null());
    }

    #[test]
    fn test_error_is_captured() {
        let _ = env_logger::builder().is_test(true).try_init();
        let ctx = SolverContext::new();
        let seh = ScopedErrorHandler::new(&ctx);
        assert_eq!(seh.status(), Ok(()));
        provoke_sort_error(&ctx);
        match seh.finish() {
            Err(TranslationError::Solver(msg)) => assert!(msg.starts_with("Z3 error: "), "{}", msg),
            other => panic!("expected a solver error, got {:?}", other),
        }
    }

    #[test]
    fn test_clean_scope_reports_ok() {
        let ctx = SolverContext::new();
        let seh = ScopedErrorHandler::new(&ctx);
        let a = ctx.bv_u64(3, 4);
        let _ = ctx.bvadd(a, a);
        assert_eq!(seh.finish(), Ok(()));
    }

    #[test]
    fn test_nested_scopes_isolate_errors() {
        let _ = env_logger::builder().is_test(true).try_init();
        let ctx = SolverContext::new();
        let outer = ScopedErrorHandler::new(&ctx);
        {
            let inner = ScopedErrorHandler::new(&ctx);
            provoke_sort_error(&ctx);
            assert!(inner.finish().is_err());
        }
        // The outer guard is active again and has not seen the inner error.
        assert_eq!(outer.status(), Ok(()));
        provoke_sort_error(&ctx);
        assert!(outer.finish().is_err());
    }

    #[test]
    fn test_scopes_on_different_contexts_do_not_mix() {
        let ctx_a = SolverContext::new();
        let ctx_b = SolverContext::new();
        let seh_a = ScopedErrorHandler::new(&ctx_a);
        let seh_b = ScopedErrorHandler::new(&ctx_b);
        provoke_sort_error(&ctx_a);
        assert_eq!(seh_b.finish(), Ok(()));
        assert!(seh_a.finish().is_err());
    }
}
