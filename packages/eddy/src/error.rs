//! Per-action error boundary.
//!
//! Failures inside a dispatched action's pipeline - an `Err` item from a
//! middleware stage or held stream, or a panic in a handler - are scoped to
//! that one action. The boundary cancels the action's remaining pipeline,
//! hands the failure to the store's [`ErrorProcessor`], and feeds whatever
//! replacement actions the processor produces straight into reduction.
//! Other in-flight actions and the store itself are never disturbed.

use std::any::Any;

use futures::stream::BoxStream;
use thiserror::Error;

use crate::core::Action;

/// Replacement actions produced by an [`ErrorProcessor`].
///
/// Replacements bypass the middleware chain and go directly to reduction;
/// an empty stream swallows the failure.
pub type Replacements<A> = BoxStream<'static, A>;

/// Maps a pipeline failure into replacement actions.
///
/// One processor serves the whole store. It must be infallible: a panic
/// inside `process` or inside the returned stream is a caller defect and
/// tears down that action's recovery, not the store.
///
/// ```ignore
/// struct FetchFallback;
///
/// impl ErrorProcessor<AppAction> for FetchFallback {
///     fn process(&self, error: anyhow::Error) -> Replacements<AppAction> {
///         tracing::warn!(%error, "fetch failed, marking entry stale");
///         Box::pin(futures::stream::once(futures::future::ready(
///             AppAction::MarkStale,
///         )))
///     }
/// }
/// ```
pub trait ErrorProcessor<A: Action>: Send + Sync + 'static {
    /// Turn one failure into a sequence of replacement actions.
    fn process(&self, error: anyhow::Error) -> Replacements<A>;
}

/// The default processor: discard the failure, emit nothing.
///
/// State simply does not advance for the failed action.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwallowErrors;

impl<A: Action> ErrorProcessor<A> for SwallowErrors {
    fn process(&self, _error: anyhow::Error) -> Replacements<A> {
        Box::pin(futures::stream::empty())
    }
}

/// Failures the store itself constructs.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A panic escaped a middleware handler, held stream, or reducer-bound
    /// computation for one admitted action. The panic payload is flattened
    /// to its message.
    #[error("action pipeline panicked: {message}")]
    Panicked { message: String },
}

/// Flatten a caught panic payload into a printable message.
pub(crate) fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
