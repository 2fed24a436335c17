//! Core traits for the eddy state container.
//!
//! # Overview
//!
//! Eddy separates **what happened** from **what the application looks like**:
//! - [`Action`] = an immutable message describing an event
//! - [`State`] = an immutable snapshot of application data
//!
//! Actions are folded into state by a pure [`Reducer`](crate::Reducer),
//! after passing through an ordered chain of
//! [`Middleware`](crate::Middleware) stages. A middleware stage consumes one
//! action and produces a lazy sequence of zero or more actions - the
//! [`ActionStream`].
//!
//! # Stream-holder actions
//!
//! Some action variants are not plain data but handles to an externally
//! driven sequence of further actions (a socket subscription, a timer, a
//! repository watch). Such a variant unwraps itself via [`Action::unfold`],
//! and the store splices the held stream into the pipeline. The external
//! producer keeps full ownership of the source; the store only consumes it.

use std::fmt;
use std::hash::Hash;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};

/// An immutable application snapshot.
///
/// Exactly one current state exists per store instance at any instant.
/// State is replaced, never mutated in place; superseded snapshots are
/// dropped - the store retains no history.
///
/// **Note**: This trait is automatically implemented for any type that is
/// `Clone + Send + Sync + 'static`. You don't need to implement it manually.
pub trait State: Clone + Send + Sync + 'static {}

// Blanket implementation for any type that meets the requirements
impl<T: Clone + Send + Sync + 'static> State for T {}

/// The lazy output sequence of a middleware stage or a stream-holder.
///
/// An `Err` item aborts the admitted action's remaining pipeline and is
/// diverted to the store's [`ErrorProcessor`](crate::ErrorProcessor).
pub type ActionStream<A> = BoxStream<'static, anyhow::Result<A>>;

/// An immutable message describing something that happened.
///
/// Identity is the variant tag plus payload; actions carry no behavior
/// except the optional stream-holder capability expressed by [`unfold`].
/// Implemented manually per action enum:
///
/// ```ignore
/// #[derive(Debug, Clone)]
/// enum CounterAction {
///     Increment,
///     Add(i32),
/// }
/// impl Action for CounterAction {}
/// ```
///
/// Actions only need to be `Send`, not `Sync`, so a variant may own a boxed
/// stream of further actions:
///
/// ```ignore
/// enum CounterAction {
///     Add(i32),
///     Connected(ActionStream<CounterAction>),
/// }
///
/// impl Action for CounterAction {
///     fn unfold(self) -> Unfolded<Self> {
///         match self {
///             CounterAction::Connected(stream) => Unfolded::Stream(stream),
///             other => Unfolded::Action(other),
///         }
///     }
/// }
/// ```
///
/// [`unfold`]: Action::unfold
pub trait Action: Send + 'static {
    /// Unwrap the external action sequence this action holds, if any.
    ///
    /// The default treats the action as plain data. Variants that carry a
    /// handle to an externally produced stream return
    /// [`Unfolded::Stream`]; the store expands the stream and every
    /// produced action proceeds to reduction, while the holder itself is
    /// consumed and never reduced.
    fn unfold(self) -> Unfolded<Self>
    where
        Self: Sized,
    {
        Unfolded::Action(self)
    }
}

/// The result of unwrapping an action's stream-holder capability.
///
/// Consumed via pattern match inside the store's flattening stage.
pub enum Unfolded<A> {
    /// A plain action; it proceeds to reduction as a single item.
    Action(A),
    /// A handle to an externally driven sequence of further actions.
    ///
    /// The store merges held streams from the same admitted action
    /// concurrently, forwarding each produced action as it arrives. The
    /// source's lifecycle belongs to its producer: the store never closes
    /// it, and a producer pushing into a closed store is a benign no-op.
    Stream(ActionStream<A>),
}

/// An action type with an explicit variant-tag discriminant.
///
/// The discriminant keys the dispatch tables of
/// [`DispatchTable`](crate::DispatchTable) and
/// [`ReducerTable`](crate::ReducerTable), replacing runtime type lookups
/// with a plain pattern match:
///
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum CounterKind {
///     Increment,
///     Add,
/// }
///
/// impl Kinded for CounterAction {
///     type Kind = CounterKind;
///
///     fn kind(&self) -> CounterKind {
///         match self {
///             CounterAction::Increment => CounterKind::Increment,
///             CounterAction::Add(_) => CounterKind::Add,
///         }
///     }
/// }
/// ```
pub trait Kinded: Action {
    /// The variant-tag type.
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// The tag of this action's concrete variant.
    fn kind(&self) -> Self::Kind;
}

/// Constructors for [`ActionStream`] values.
///
/// Middleware handlers and stream-holders build their output sequences
/// with these helpers instead of spelling out boxed stream types.
pub mod emit {
    use super::*;

    /// A sequence of exactly one action.
    pub fn one<A: Send + 'static>(action: A) -> ActionStream<A> {
        stream::once(future::ready(Ok(action))).boxed()
    }

    /// The empty sequence - the action is suppressed.
    pub fn none<A: Send + 'static>() -> ActionStream<A> {
        stream::empty().boxed()
    }

    /// A finite sequence of actions, emitted in order.
    pub fn many<A, I>(actions: I) -> ActionStream<A>
    where
        A: Send + 'static,
        I: IntoIterator<Item = A>,
        I::IntoIter: Send + 'static,
    {
        stream::iter(actions.into_iter().map(Ok)).boxed()
    }

    /// A sequence that fails immediately.
    ///
    /// The failure is caught by the store's per-action error boundary and
    /// handed to the [`ErrorProcessor`](crate::ErrorProcessor).
    pub fn error<A: Send + 'static>(error: impl Into<anyhow::Error>) -> ActionStream<A> {
        stream::once(future::ready(Err(error.into()))).boxed()
    }

    /// Adapt an infallible stream of actions.
    pub fn from_stream<A, St>(actions: St) -> ActionStream<A>
    where
        A: Send + 'static,
        St: futures::Stream<Item = A> + Send + 'static,
    {
        actions.map(Ok).boxed()
    }

    /// Adapt a stream that may fail mid-sequence.
    pub fn from_try_stream<A, St>(actions: St) -> ActionStream<A>
    where
        A: Send + 'static,
        St: futures::Stream<Item = anyhow::Result<A>> + Send + 'static,
    {
        actions.boxed()
    }
}
