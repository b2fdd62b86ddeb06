//! Durable-runtime primitives the workflow crate depends on as trait
//! objects: heartbeating, disconnected-context compensation execution,
//! signals, and queries. The concrete durable-execution substrate
//! (history persistence, deterministic replay) lives outside this
//! workspace; these are the narrow seams the orchestration core needs
//! from it.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Per-activity handle for liveness and cancellation-resistant cleanup.
#[async_trait]
pub trait ActivityContext: Send + Sync {
    /// Record a heartbeat with a short progress detail. The runtime's
    /// liveness check uses the most recent heartbeat to detect a
    /// stalled activity.
    async fn heartbeat(&self, detail: &str);

    /// A context that ignores the outer workflow's cancellation,
    /// for running saga compensations that must complete even after
    /// the workflow itself has been cancelled.
    fn disconnected(&self) -> DisconnectedContext;
}

/// Runs compensations outside the outer cancellation scope.
#[derive(Clone, Default)]
pub struct DisconnectedContext;

impl DisconnectedContext {
    pub fn new() -> Self {
        Self
    }

    /// Runs `action`, swallowing its error after logging so that one
    /// failing compensation never prevents the next from running.
    pub async fn run<F, Fut>(&self, name: &str, action: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        if let Err(err) = action().await {
            tracing::warn!(compensation = name, error = %err, "compensation failed, continuing");
        }
    }
}

/// One-shot external signal, fired by a human or external system and
/// awaited by a suspended workflow (e.g. `FixApplied`).
pub struct Signal<T> {
    rx: Mutex<mpsc::UnboundedReceiver<T>>,
}

#[derive(Clone)]
pub struct SignalSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Signal<T> {
    pub fn channel() -> (SignalSender<T>, Arc<Signal<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SignalSender { tx }, Arc::new(Signal { rx: Mutex::new(rx) }))
    }

    /// Suspends until a sender fires, or returns `None` if every
    /// sender has been dropped.
    pub async fn wait(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }
}

impl<T> SignalSender<T> {
    pub fn fire(&self, value: T) -> Result<(), T> {
        self.tx.send(value).map_err(|e| e.0)
    }
}

/// Request/response query a workflow answers without suspending its
/// own execution (`WorkflowState`, `WorkflowProgress`).
#[async_trait]
pub trait QueryHandler<Q, R>: Send + Sync
where
    Q: Send + 'static,
    R: Send + 'static,
{
    async fn handle(&self, query: Q) -> R;
}

/// A single-process stand-in `ActivityContext` that records heartbeats
/// as `tracing` events instead of forwarding them to a durable
/// runtime's liveness tracker. Real deployments plug in the runtime's
/// own context (history persistence, deterministic replay); this one
/// lets the CLI and the workflow crate's own tests run the gate
/// sequence without a durable-execution substrate in the workspace.
#[derive(Clone, Default)]
pub struct TracingActivityContext;

impl TracingActivityContext {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActivityContext for TracingActivityContext {
    async fn heartbeat(&self, detail: &str) {
        tracing::debug!(detail, "activity heartbeat");
    }

    fn disconnected(&self) -> DisconnectedContext {
        DisconnectedContext::new()
    }
}
