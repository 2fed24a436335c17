//! The store - single-writer state container driving the dispatch pipeline.
//!
//! Each dispatched action is admitted by a pump task and processed in its
//! own task: the middleware chain runs as sequential concatenation, held
//! streams are merged concurrently, and every surviving action is forwarded
//! to a single reducer task. Reduction is serialized by the reducer channel,
//! so state transitions form a total order without a lock. Published states
//! fan out to observers over a broadcast channel; the latest snapshot is
//! always readable synchronously through a watch channel.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::core::{emit, Action, ActionStream, State, Unfolded};
use crate::error::{panic_message, ErrorProcessor, StoreError, SwallowErrors};
use crate::logger::{NoOpLogger, StoreLogger};
use crate::middleware::{Middleware, StateReader};
use crate::reducer::Reducer;

/// Snapshots buffered per observer before it starts lagging.
const OBSERVER_BUFFER: usize = 1024;

/// Builder for a [`Store`]. Obtained via [`Store::builder`].
pub struct StoreBuilder<S: State, A: Action> {
    initial: S,
    reducer: Arc<dyn Reducer<S, A>>,
    middlewares: Vec<Arc<dyn Middleware<S, A>>>,
    errors: Arc<dyn ErrorProcessor<A>>,
    logger: Arc<dyn StoreLogger<S, A>>,
    runtime: Option<tokio::runtime::Handle>,
}

impl<S: State, A: Action> StoreBuilder<S, A> {
    fn new<R: Reducer<S, A>>(initial: S, reducer: R) -> Self {
        Self {
            initial,
            reducer: Arc::new(reducer),
            middlewares: Vec::new(),
            errors: Arc::new(SwallowErrors),
            logger: Arc::new(NoOpLogger),
            runtime: None,
        }
    }

    /// Append a middleware stage. Stages run in registration order.
    pub fn with_middleware<M: Middleware<S, A>>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Replace the default [`SwallowErrors`] processor.
    pub fn with_error_processor<E: ErrorProcessor<A>>(mut self, errors: E) -> Self {
        self.errors = Arc::new(errors);
        self
    }

    /// Attach a diagnostics logger. Defaults to [`NoOpLogger`].
    pub fn with_logger<L: StoreLogger<S, A>>(mut self, logger: L) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Run the store's tasks on an explicit runtime instead of the ambient
    /// one.
    pub fn with_runtime(mut self, handle: tokio::runtime::Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Spawn the pipeline and hand back the live store.
    ///
    /// # Panics
    ///
    /// Panics if no runtime was supplied via [`with_runtime`] and the
    /// caller is not inside a Tokio runtime.
    ///
    /// [`with_runtime`]: StoreBuilder::with_runtime
    pub fn build(self) -> Store<S, A> {
        let handle = self
            .runtime
            .unwrap_or_else(tokio::runtime::Handle::current);

        let (ingress_tx, ingress_rx) = mpsc::unbounded_channel();
        let (reduce_tx, reduce_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel((0u64, self.initial));
        let (updates_tx, updates_rx) = broadcast::channel(OBSERVER_BUFFER);

        let reducer_task = handle.spawn(reduce_loop(
            reduce_rx,
            self.reducer,
            state_tx,
            updates_tx,
            self.logger.clone(),
        ));

        let pipeline = Pipeline {
            middlewares: Arc::from(self.middlewares),
            reader: StateReader::new(state_rx.clone()),
            errors: self.errors,
            logger: self.logger.clone(),
        };
        let pump = handle.spawn(pump_loop(ingress_rx, pipeline, reduce_tx));

        Store {
            ingress: ingress_tx,
            state: state_rx,
            updates: updates_rx,
            logger: self.logger,
            closed: AtomicBool::new(false),
            pump,
            reducer_task,
        }
    }
}

/// An action-driven state container.
///
/// Exactly one current state exists at any instant; all mutation flows
/// through [`dispatch`](Store::dispatch). The store is `Sync` - share it
/// behind an `Arc` and dispatch from any task.
///
/// ```ignore
/// let store = Store::builder(CounterState { count: 0 }, reducer)
///     .with_middleware(fetches)
///     .with_logger(TracingLogger)
///     .build();
///
/// store.dispatch(CounterAction::Increment);
/// ```
pub struct Store<S: State, A: Action> {
    ingress: mpsc::UnboundedSender<A>,
    state: watch::Receiver<(u64, S)>,
    updates: broadcast::Receiver<(u64, S)>,
    logger: Arc<dyn StoreLogger<S, A>>,
    closed: AtomicBool,
    pump: JoinHandle<()>,
    reducer_task: JoinHandle<()>,
}

impl<S: State, A: Action> Store<S, A> {
    /// Start configuring a store with the given initial state and reducer.
    pub fn builder<R: Reducer<S, A>>(initial: S, reducer: R) -> StoreBuilder<S, A> {
        StoreBuilder::new(initial, reducer)
    }

    /// Hand one action to the pipeline.
    ///
    /// Never blocks and never fails: the ingress queue is unbounded, and
    /// dispatching into a closed store is a silent no-op. Effects of the
    /// action become visible asynchronously.
    pub fn dispatch(&self, action: A) {
        if self.closed.load(Ordering::SeqCst) {
            tracing::debug!("dispatch on closed store ignored");
            return;
        }
        self.logger.on_action_dispatched(&action);
        if self.ingress.send(action).is_err() {
            tracing::debug!("store pipeline gone, action dropped");
        }
    }

    /// The latest published state snapshot. Synchronous and infallible.
    pub fn current_state(&self) -> S {
        self.state.borrow().1.clone()
    }

    /// Subscribe to state snapshots.
    ///
    /// Yields the current snapshot immediately, then every snapshot
    /// published while the subscription is live. Observers are independent;
    /// one slow consumer never blocks publication, but a consumer that
    /// falls more than a buffer's worth of snapshots behind skips the
    /// missed ones. The stream ends when the store closes.
    pub fn observe(&self) -> BoxStream<'static, S> {
        // Subscribe before reading the watch so no snapshot published
        // after the read can be missed.
        let mut updates = self.updates.resubscribe();
        let state = self.state.clone();
        Box::pin(async_stream::stream! {
            let (seen, current) = state.borrow().clone();
            yield current;
            loop {
                match updates.recv().await {
                    Ok((seq, snapshot)) => {
                        // Everything up to `seen` is covered by the
                        // immediate snapshot above.
                        if seq > seen {
                            yield snapshot;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "state observer lagging, snapshots skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Shut the store down. Terminal and idempotent.
    ///
    /// Aborts the pump, which cancels every in-flight action task
    /// (best-effort; cancellation lands at the next await point), and the
    /// reducer, dropping any actions still queued for reduction. No
    /// further state is published; live observers end. External producers
    /// feeding held streams are never cancelled - their pushes simply go
    /// unobserved.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!("store closing");
        self.pump.abort();
        self.reducer_task.abort();
    }

    /// Whether [`close`](Store::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl<S: State, A: Action> Drop for Store<S, A> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<S: State, A: Action> std::fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Shared context for one admitted action's pipeline run.
struct Pipeline<S: State, A: Action> {
    middlewares: Arc<[Arc<dyn Middleware<S, A>>]>,
    reader: StateReader<S>,
    errors: Arc<dyn ErrorProcessor<A>>,
    logger: Arc<dyn StoreLogger<S, A>>,
}

impl<S: State, A: Action> Clone for Pipeline<S, A> {
    fn clone(&self) -> Self {
        Self {
            middlewares: self.middlewares.clone(),
            reader: self.reader.clone(),
            errors: self.errors.clone(),
            logger: self.logger.clone(),
        }
    }
}

impl<S: State, A: Action> Pipeline<S, A> {
    /// Run one admitted action to completion inside its error boundary.
    async fn process(self, action: A, reduce_tx: mpsc::UnboundedSender<A>) {
        let outcome = AssertUnwindSafe(self.run(action, &reduce_tx))
            .catch_unwind()
            .await;
        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(error)) => error,
            Err(panic) => anyhow::Error::new(StoreError::Panicked {
                message: panic_message(panic),
            }),
        };

        self.logger.on_error_occurred(&failure);
        let mut replacements = self.errors.process(failure);
        while let Some(action) = replacements.next().await {
            self.logger.on_error_handled(&action);
            if reduce_tx.send(action).is_err() {
                // Reducer gone, the store is closing.
                return;
            }
        }
    }

    /// Middleware concatenation, holder merge, forwarding to reduction.
    ///
    /// The first `Err` item returns early, dropping the merged stream and
    /// with it every remaining sibling of this admitted action.
    async fn run(&self, action: A, reduce_tx: &mpsc::UnboundedSender<A>) -> anyhow::Result<()> {
        let mut chain: ActionStream<A> = emit::one(action);
        for stage in self.middlewares.iter() {
            let stage = stage.clone();
            let reader = self.reader.clone();
            let logger = self.logger.clone();
            chain = chain
                .map(move |item| match item {
                    Ok(action) => {
                        logger.on_middleware_processing(stage.name(), &action);
                        stage.process(&reader, action)
                    }
                    Err(error) => emit::error(error),
                })
                .flatten()
                .boxed();
        }

        let logger = self.logger.clone();
        let mut merged = chain
            .map(move |item| match item {
                Ok(action) => match action.unfold() {
                    Unfolded::Action(action) => emit::one(action),
                    Unfolded::Stream(held) => {
                        let logger = logger.clone();
                        held.inspect(move |item| {
                            if let Ok(action) = item {
                                logger.on_stream_action(action);
                            }
                        })
                        .boxed()
                    }
                },
                Err(error) => emit::error(error),
            })
            .flatten_unordered(None);

        let mut forwarded = 0usize;
        while let Some(item) = merged.next().await {
            let action = item?;
            if reduce_tx.send(action).is_err() {
                return Ok(());
            }
            forwarded += 1;
        }
        self.logger.on_chain_completed(forwarded);
        Ok(())
    }
}

/// Admission loop: one task per dispatched action, owned by a `JoinSet` so
/// aborting the pump cancels every in-flight action with it.
async fn pump_loop<S: State, A: Action>(
    mut ingress: mpsc::UnboundedReceiver<A>,
    pipeline: Pipeline<S, A>,
    reduce_tx: mpsc::UnboundedSender<A>,
) {
    let mut tasks: JoinSet<()> = JoinSet::new();
    loop {
        tokio::select! {
            admitted = ingress.recv() => match admitted {
                Some(action) => {
                    let pipeline = pipeline.clone();
                    let reduce_tx = reduce_tx.clone();
                    tasks.spawn(pipeline.process(action, reduce_tx));
                }
                None => break,
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(err) = joined {
                    if !err.is_cancelled() {
                        tracing::warn!(%err, "action task aborted abnormally");
                    }
                }
            }
        }
    }
    while tasks.join_next().await.is_some() {}
}

/// Reduction loop: the channel serializes reductions, so state transitions
/// form a total order with no lock. Publishes to the watch first so a
/// subscriber reading the watch never sees a sequence number ahead of the
/// broadcast.
async fn reduce_loop<S: State, A: Action>(
    mut actions: mpsc::UnboundedReceiver<A>,
    reducer: Arc<dyn Reducer<S, A>>,
    state_tx: watch::Sender<(u64, S)>,
    updates_tx: broadcast::Sender<(u64, S)>,
    logger: Arc<dyn StoreLogger<S, A>>,
) {
    let mut seq = 0u64;
    while let Some(action) = actions.recv().await {
        let previous = state_tx.borrow().1.clone();
        let next = reducer.reduce(&previous, &action);
        logger.on_state_reduced(&action, &previous, &next);
        seq += 1;
        let _ = state_tx.send((seq, next.clone()));
        // Send errors just mean no live observer.
        let _ = updates_tx.send((seq, next));
    }
    tracing::debug!(reductions = seq, "reducer finished");
}
