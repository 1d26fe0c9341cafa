//! Thread-confined context stack.
//!
//! Each request-handling task sees only the contexts it pushed itself:
//! the stack lives in thread-local storage, never in a shared global.
//! Nested push/pop within one task behaves as a stack, which is what
//! test harnesses rely on when they enter a context inside another.
//!
//! The dispatch pipeline runs synchronously between push and pop, so a
//! connection task never interleaves two requests on the same stack.

use std::cell::RefCell;
use std::rc::Rc;

use crate::context::RequestContext;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Rc<RequestContext>>> = const { RefCell::new(Vec::new()) };
}

/// Associate a context with the calling task.
pub fn push(context: Rc<RequestContext>) {
    CONTEXT_STACK.with(|stack| stack.borrow_mut().push(context));
}

/// Remove the most recently pushed context for the calling task.
pub fn pop() -> Option<Rc<RequestContext>> {
    CONTEXT_STACK.with(|stack| stack.borrow_mut().pop())
}

/// The top context for the calling task, if any.
pub fn current() -> Option<Rc<RequestContext>> {
    CONTEXT_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Stack depth for the calling task.
pub fn depth() -> usize {
    CONTEXT_STACK.with(|stack| stack.borrow().len())
}
