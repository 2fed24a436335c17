//! # Eddy
//!
//! An action-driven state container where middleware transforms, streams
//! flatten, and a single reducer holds authority over state.
//!
//! ## Core Concepts
//!
//! Eddy separates **what happened** from **what the application looks like**:
//! - [`Action`] = a message describing an event
//! - [`State`] = an immutable snapshot of application data
//!
//! The key principle: **all mutation flows through dispatch**. Exactly one
//! current state exists per store; the reducer is the only writer, and
//! reductions are totally ordered.
//!
//! ## Architecture
//!
//! ```text
//! dispatch(action)
//!     │
//!     ▼ ingress queue
//! pump ── one task per admitted action ──┐
//!     │                                  │ (concurrent)
//!     ▼                                  ▼
//! Middleware 1 ─► Middleware 2 ─► … (sequential concatenation)
//!     │
//!     ▼ unfold()
//! held streams merged concurrently
//!     │
//!     ├─ Err item / panic ─► ErrorProcessor ─► replacements ─┐
//!     │                                                      │
//!     ▼                                                      ▼
//!             reducer task (serialized reduction)
//!     │
//!     ▼ publish
//! current_state() / observe() streams
//! ```
//!
//! ## Key Invariants
//!
//! 1. **States are snapshots** - Immutable, replaced never mutated, no history
//! 2. **Reducers are pure** - No IO, no async; side effects live in middleware
//! 3. **Reduction is serialized** - One reduction at a time, totally ordered
//! 4. **Failures are scoped** - One action's failure never touches another's
//! 5. **Middleware is ordered** - Stages run in registration order, each item
//!    of a stage's output feeds the next stage independently
//! 6. **Dispatch never blocks** - Unbounded ingress; closed stores ignore it
//!
//! ## Guarantees
//!
//! - **Relative order preserved** for actions flowing through non-suspending
//!   middleware; concurrently admitted actions interleave by completion time
//! - **Best-effort cancellation** on close; external stream producers are
//!   never cancelled, their pushes simply go unobserved
//! - **In-memory only** - nothing is persisted
//!
//! ## Example
//!
//! ```ignore
//! use eddy::{Action, Store};
//!
//! #[derive(Debug, Clone)]
//! struct CounterState { count: i32 }
//!
//! #[derive(Debug)]
//! enum CounterAction {
//!     Increment,
//!     Add(i32),
//! }
//! impl Action for CounterAction {}
//!
//! # async fn demo() {
//! let store = Store::builder(CounterState { count: 0 }, |state: &CounterState, action: &CounterAction| {
//!     match action {
//!         CounterAction::Increment => CounterState { count: state.count + 1 },
//!         CounterAction::Add(n) => CounterState { count: state.count + n },
//!     }
//! })
//! .build();
//!
//! store.dispatch(CounterAction::Increment);
//! store.dispatch(CounterAction::Add(10));
//! # }
//! ```

mod core;
mod error;
mod logger;
mod middleware;
mod reducer;
mod store;


// Re-export core traits
pub use crate::core::{emit, Action, ActionStream, Kinded, State, Unfolded};

// Re-export the error boundary surface
pub use crate::error::{ErrorProcessor, Replacements, StoreError, SwallowErrors};

// Re-export diagnostics hooks
pub use crate::logger::{NoOpLogger, StoreLogger, TracingLogger};

// Re-export middleware building blocks
pub use crate::middleware::{
    from_fn, DispatchTable, FnMiddleware, KindHandler, Middleware, StateReader,
};

// Re-export reducers
pub use crate::reducer::{Reducer, ReducerTable};

// Re-export the store itself
pub use crate::store::{Store, StoreBuilder};
