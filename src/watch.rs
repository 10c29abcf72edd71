use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::future::BoxFuture;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::k8s::{ClusterClient, WatchEvent};
use crate::model::{NamespaceScope, Operation, OperationBatch, ResourceType};
use crate::status::StatusReporter;

pub type ViewId = u64;

/// A batch tagged with the view and show-generation that produced it.
#[derive(Debug)]
pub struct ViewBatch {
    pub view: ViewId,
    pub generation: u64,
    pub ops: OperationBatch,
}

/// Producer end of the batch queue, bound to one view generation.
#[derive(Clone)]
pub struct BatchSink {
    tx: mpsc::UnboundedSender<ViewBatch>,
    view: ViewId,
    generation: u64,
}

impl BatchSink {
    pub fn new(tx: mpsc::UnboundedSender<ViewBatch>, view: ViewId, generation: u64) -> Self {
        Self {
            tx,
            view,
            generation,
        }
    }

    /// Returns `false` once the consumer is gone.
    pub fn send(&self, ops: OperationBatch) -> bool {
        self.tx
            .send(ViewBatch {
                view: self.view,
                generation: self.generation,
                ops,
            })
            .is_ok()
    }
}

/// How long to wait before re-opening a watch that ended.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct RestartPolicy {
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(250), Duration::from_secs(5))
    }
}

impl RestartPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// Restart unconditionally with no delay.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Delay after `failures` consecutive watches that ended without
    /// delivering anything. The first retry is always immediate.
    pub fn delay(&self, failures: u32) -> Duration {
        if failures <= 1 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(failures - 2).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum WatchState {
    Idle,
    Listing,
    Watching,
    Restarting,
    Stopped,
}

/// Owner side of a background view task. Stopping never waits for the
/// task; dropping the handle stops it too.
pub struct WatchHandle {
    stop: watch::Sender<bool>,
    #[cfg(test)]
    state: watch::Receiver<WatchState>,
}

impl WatchHandle {
    pub fn spawn<F, Fut>(task: F) -> Self
    where
        F: FnOnce(StopSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, _state_rx) = watch::channel(WatchState::Idle);
        let signal = StopSignal {
            stop: stop_rx,
            state: state_tx,
        };
        tokio::spawn(task(signal));
        Self {
            stop: stop_tx,
            #[cfg(test)]
            state: _state_rx,
        }
    }

    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    #[cfg(test)]
    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<WatchState> {
        self.state.clone()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Task side of a [`WatchHandle`].
pub struct StopSignal {
    stop: watch::Receiver<bool>,
    state: watch::Sender<WatchState>,
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Resolves once stop is requested or the handle is gone.
    pub async fn stopped(&mut self) {
        let _ = self.stop.wait_for(|stopped| *stopped).await;
    }

    pub fn set_state(&self, state: WatchState) {
        self.state.send_replace(state);
    }
}

impl Drop for StopSignal {
    fn drop(&mut self) {
        self.state.send_replace(WatchState::Stopped);
    }
}

/// A fresh seed batch plus the cell indices kept from watched rows.
pub struct Reseed {
    pub ops: OperationBatch,
    pub columns: Vec<usize>,
}

pub type ReseedFn = Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<Reseed>> + Send + Sync>;

enum WatchEnd {
    Closed { delivered: bool },
    ConsumerGone,
}

/// Keeps one watch open for a resource and namespace until stopped,
/// turning each event into one operation batch.
pub struct WatchSupervisor {
    client: Arc<dyn ClusterClient>,
    status: Arc<dyn StatusReporter>,
    resource: ResourceType,
    scope: NamespaceScope,
    columns: Vec<usize>,
    policy: RestartPolicy,
    sink: BatchSink,
    reseed: Option<ReseedFn>,
}

impl WatchSupervisor {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        status: Arc<dyn StatusReporter>,
        resource: ResourceType,
        scope: NamespaceScope,
        policy: RestartPolicy,
        sink: BatchSink,
    ) -> Self {
        Self {
            client,
            status,
            resource,
            scope,
            columns: Vec::new(),
            policy,
            sink,
            reseed: None,
        }
    }

    /// Cell indices kept from every watched row.
    pub fn with_columns(mut self, columns: Vec<usize>) -> Self {
        self.columns = columns;
        self
    }

    /// Lists again before every restart so rows deleted between two
    /// watches are dropped.
    pub fn with_reseed(mut self, reseed: ReseedFn) -> Self {
        self.reseed = Some(reseed);
        self
    }

    pub async fn run(mut self, mut signal: StopSignal) {
        let mut failures = 0u32;
        let mut restarts = 0u64;

        loop {
            let delay = self.policy.delay(failures);
            if !delay.is_zero() {
                debug!(
                    "waiting {}ms before re-opening {} watch",
                    delay.as_millis(),
                    self.resource.title()
                );
                tokio::select! {
                    biased;
                    _ = signal.stopped() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if signal.is_stopped() {
                break;
            }

            if restarts > 0 && self.reseed.is_some() {
                signal.set_state(WatchState::Listing);
                let reseeded = tokio::select! {
                    biased;
                    _ = signal.stopped() => break,
                    reseeded = self.reseed_once() => reseeded,
                };
                match reseeded {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!("{} watch consumer is gone", self.resource.title());
                        break;
                    }
                    Err(error) => {
                        self.status.error(&error);
                        failures = failures.saturating_add(1);
                        signal.set_state(WatchState::Restarting);
                        continue;
                    }
                }
                if signal.is_stopped() {
                    break;
                }
            }

            signal.set_state(WatchState::Watching);
            info!(
                "opening {} watch in {} (restart {restarts})",
                self.resource.title(),
                self.scope
            );
            let stop_guard = signal.stop.clone();
            let end = tokio::select! {
                biased;
                _ = signal.stopped() => break,
                end = self.watch_once(&stop_guard) => end,
            };

            match end {
                WatchEnd::ConsumerGone => {
                    debug!("{} watch consumer is gone", self.resource.title());
                    break;
                }
                WatchEnd::Closed { delivered } => {
                    failures = if delivered { 0 } else { failures.saturating_add(1) };
                }
            }
            if signal.is_stopped() {
                break;
            }
            signal.set_state(WatchState::Restarting);
            restarts += 1;
        }

        info!("{} watch in {} stopped", self.resource.title(), self.scope);
        signal.set_state(WatchState::Stopped);
    }

    /// Returns `Ok(false)` once the consumer is gone.
    async fn reseed_once(&mut self) -> anyhow::Result<bool> {
        let Some(reseed) = &self.reseed else {
            return Ok(true);
        };
        let Reseed { ops, columns } = reseed().await?;
        debug!("reseeding {} with {} operations", self.resource.title(), ops.len());
        self.columns = columns;
        Ok(self.sink.send(ops))
    }

    async fn watch_once(&self, stop: &watch::Receiver<bool>) -> WatchEnd {
        let mut events = match self.client.watch_as_table(self.resource, &self.scope).await {
            Ok(events) => events,
            Err(error) => {
                self.status.error(&error);
                return WatchEnd::Closed { delivered: false };
            }
        };

        let mut delivered = false;
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(WatchEvent::Error(message)) => {
                    warn!("{} watch error event: {message}", self.resource.title());
                    self.status.error(&anyhow::anyhow!(
                        "{} watch failed: {message}",
                        self.resource.title()
                    ));
                    return WatchEnd::Closed { delivered };
                }
                Ok(event) => event,
                Err(error) => {
                    self.status.error(&error);
                    continue;
                }
            };

            delivered = true;
            let ops = self.translate(event);
            if ops.is_empty() {
                continue;
            }
            if *stop.borrow() {
                return WatchEnd::Closed { delivered };
            }
            if !self.sink.send(ops) {
                return WatchEnd::ConsumerGone;
            }
        }

        info!("{} watch closed", self.resource.title());
        WatchEnd::Closed { delivered }
    }

    fn translate(&self, event: WatchEvent) -> OperationBatch {
        match event {
            WatchEvent::Added(rows) => rows
                .into_iter()
                .map(|row| Operation::added_sorted(row.project(&self.columns)))
                .collect(),
            WatchEvent::Modified(rows) => rows
                .into_iter()
                .map(|row| Operation::Modified(row.project(&self.columns)))
                .collect(),
            WatchEvent::Deleted(rows) => rows
                .into_iter()
                .map(|row| Operation::Deleted(row.id().to_string()))
                .collect(),
            WatchEvent::Error(_) => Vec::new(),
        }
    }
}
