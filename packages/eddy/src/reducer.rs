//! Reducers - pure folds from `(State, Action)` to the next `State`.
//!
//! A reducer must be total over the action set: variants it does not
//! recognize fall back to returning the input state unchanged (identity
//! default). Reducers run serialized - exactly one reduction executes at a
//! time per store - so they may be plain synchronous functions with no
//! interior locking.

use std::collections::HashMap;

use crate::core::{Kinded, State};

/// A pure function computing the next state from the current state and an
/// action.
///
/// Implemented for closures, so the common case is just:
///
/// ```ignore
/// let reducer = |state: &CounterState, action: &CounterAction| match action {
///     CounterAction::Increment => CounterState { count: state.count + 1 },
///     CounterAction::Add(n) => CounterState { count: state.count + n },
///     _ => state.clone(),
/// };
/// ```
pub trait Reducer<S, A>: Send + Sync + 'static {
    /// Compute the next state. Must be pure: no IO, no async, no
    /// observable side effects.
    fn reduce(&self, state: &S, action: &A) -> S;
}

impl<S, A, F> Reducer<S, A> for F
where
    F: Fn(&S, &A) -> S + Send + Sync + 'static,
{
    fn reduce(&self, state: &S, action: &A) -> S {
        self(state, action)
    }
}

/// Builder for a reducer backed by an explicit per-variant table.
///
/// Handlers are keyed by the action's [`Kind`](Kinded::Kind); kinds with no
/// registered handler reduce to the input state unchanged. `build` returns
/// an opaque [`Reducer`].
///
/// # Example
///
/// ```ignore
/// let reducer = ReducerTable::new()
///     .on(CounterKind::Increment, |state: &CounterState, _| {
///         CounterState { count: state.count + 1 }
///     })
///     .on(CounterKind::Add, |state, action| match action {
///         CounterAction::Add(n) => CounterState { count: state.count + n },
///         _ => state.clone(),
///     })
///     .build();
/// ```
pub struct ReducerTable<S, A: Kinded> {
    handlers: HashMap<A::Kind, Box<dyn Fn(&S, &A) -> S + Send + Sync>>,
}

impl<S: State, A: Kinded> ReducerTable<S, A> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for one action kind.
    ///
    /// The handler receives the full action; the discriminant already
    /// routed it, so the payload is taken with a pattern match.
    pub fn on<F>(mut self, kind: A::Kind, handler: F) -> Self
    where
        F: Fn(&S, &A) -> S + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
        self
    }

    /// Finish the table into a reducer with identity default.
    pub fn build(self) -> impl Reducer<S, A> {
        let handlers = self.handlers;
        move |state: &S, action: &A| match handlers.get(&action.kind()) {
            Some(handler) => handler(state, action),
            None => state.clone(),
        }
    }
}

impl<S: State, A: Kinded> Default for ReducerTable<S, A> {
    fn default() -> Self {
        Self::new()
    }
}
