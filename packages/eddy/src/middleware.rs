//! Middleware - ordered transform stages between dispatch and reduction.
//!
//! A middleware consumes one action and produces a lazy sequence of zero
//! or more actions. Stages compose by sequential concatenation: stage 1
//! fully produces its sequence, each item of that sequence is fed
//! independently into stage 2, and so on in registration order. A stage may
//! therefore see intermediate actions injected by an earlier stage for the
//! same originally-dispatched action and must not assume a 1:1 relationship
//! with the dispatch.
//!
//! Side effects (timers, network calls) live inside middleware handlers.
//! No timeout is imposed: a stalled handler stalls only the actions routed
//! through it, never unrelated concurrently-admitted actions.
//!
//! # Example
//!
//! ```ignore
//! struct FetchMiddleware {
//!     client: ApiClient,
//! }
//!
//! impl Middleware<AppState, AppAction> for FetchMiddleware {
//!     fn process(&self, state: &StateReader<AppState>, action: AppAction) -> ActionStream<AppAction> {
//!         match action {
//!             AppAction::Fetch { id } => {
//!                 let client = self.client.clone();
//!                 emit::from_try_stream(try_stream! {
//!                     let entry = client.load(id).await?;
//!                     yield AppAction::Loaded { entry };
//!                 })
//!             }
//!             other => emit::one(other),
//!         }
//!     }
//! }
//! ```

use std::collections::HashMap;

use tokio::sync::watch;

use crate::core::{emit, Action, ActionStream, Kinded, State};

/// Late-binding accessor for the store's current state.
///
/// `get` clones the latest *published* snapshot at the moment of the call,
/// not a snapshot fixed at dispatch time. A slow middleware therefore
/// observes reductions that happened after its triggering action was
/// admitted. Reads are unsynchronized with in-flight reductions; eventual
/// visibility is inherent to the asynchronous pipeline.
pub struct StateReader<S> {
    rx: watch::Receiver<(u64, S)>,
}

impl<S: State> StateReader<S> {
    pub(crate) fn new(rx: watch::Receiver<(u64, S)>) -> Self {
        Self { rx }
    }

    /// The latest published state snapshot.
    pub fn get(&self) -> S {
        self.rx.borrow().1.clone()
    }
}

impl<S> Clone for StateReader<S> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<S> std::fmt::Debug for StateReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateReader").finish_non_exhaustive()
    }
}

/// A pipeline stage that may observe, transform, expand, or suppress
/// actions before reduction.
///
/// The default `process` re-emits the action exactly once - identity
/// pass-through. Unhandled action variants must flow through unchanged, so
/// implementations route unrecognized variants to [`emit::one`] rather than
/// dropping them.
pub trait Middleware<S: State, A: Action>: Send + Sync + 'static {
    /// Human-readable stage name for diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Consume one action, produce a lazy sequence of output actions.
    fn process(&self, state: &StateReader<S>, action: A) -> ActionStream<A> {
        let _ = state;
        emit::one(action)
    }
}

/// Handler registered in a [`DispatchTable`], keyed by action kind.
///
/// Receives a state snapshot taken at stage entry and the full action
/// (the discriminant already routed it; pattern-match to take the payload).
pub type KindHandler<S, A> = Box<dyn Fn(S, A) -> ActionStream<A> + Send + Sync>;

/// A middleware built from an explicit per-variant dispatch table.
///
/// Variants with no registered handler pass through unchanged - exactly
/// one item, no transformation. This default matters: unregistered
/// variants must never be silently dropped.
///
/// # Example
///
/// ```ignore
/// let fetches = DispatchTable::named("fetches")
///     .on(AppKind::Fetch, |_state, action| {
///         emit::from_try_stream(try_stream! { /* IO here */ })
///     })
///     .on(AppKind::Cancel, |_state, _action| emit::none());
/// ```
pub struct DispatchTable<S, A: Kinded> {
    name: &'static str,
    handlers: HashMap<A::Kind, KindHandler<S, A>>,
}

impl<S: State, A: Kinded> DispatchTable<S, A> {
    /// Create an empty table with the given diagnostic name.
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for one action kind.
    ///
    /// Registering the same kind twice replaces the earlier handler.
    pub fn on<F>(mut self, kind: A::Kind, handler: F) -> Self
    where
        F: Fn(S, A) -> ActionStream<A> + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
        self
    }

    /// Whether a handler is registered for the given kind.
    pub fn handles(&self, kind: A::Kind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the table has no handlers (every action passes through).
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<S: State, A: Kinded> Middleware<S, A> for DispatchTable<S, A> {
    fn name(&self) -> &str {
        self.name
    }

    fn process(&self, state: &StateReader<S>, action: A) -> ActionStream<A> {
        match self.handlers.get(&action.kind()) {
            Some(handler) => handler(state.get(), action),
            None => emit::one(action),
        }
    }
}

impl<S, A: Kinded> std::fmt::Debug for DispatchTable<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("name", &self.name)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// A middleware backed by a plain function.
///
/// Built via [`from_fn`]; handy for ad-hoc stages and tests.
pub struct FnMiddleware<F> {
    name: &'static str,
    f: F,
}

/// Wrap a function as a named middleware stage.
///
/// ```ignore
/// let tracer = from_fn("tracer", |_state, action| {
///     tracing::debug!("saw action");
///     emit::one(action)
/// });
/// ```
pub fn from_fn<S, A, F>(name: &'static str, f: F) -> FnMiddleware<F>
where
    S: State,
    A: Action,
    F: Fn(&StateReader<S>, A) -> ActionStream<A> + Send + Sync + 'static,
{
    FnMiddleware { name, f }
}

impl<S, A, F> Middleware<S, A> for FnMiddleware<F>
where
    S: State,
    A: Action,
    F: Fn(&StateReader<S>, A) -> ActionStream<A> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn process(&self, state: &StateReader<S>, action: A) -> ActionStream<A> {
        (self.f)(state, action)
    }
}
