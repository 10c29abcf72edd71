//! Scriptable collaborators for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt, stream};
use tokio::sync::{mpsc, oneshot};

use crate::config::RuntimeConfig;
use crate::controller::ViewContext;
use crate::exec::{Clipboard, CommandBuilder, CommandExecutor, ShellCommand};
use crate::k8s::{ClientConfig, ClusterClient, TableListing, WatchEvent, WatchStream};
use crate::model::{NamespaceScope, ResourceType};
use crate::status::{StatusReporter, compact_error};
use crate::watch::{RestartPolicy, ViewBatch};

/// Polls `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

pub enum ScriptedWatch {
    Events {
        events: Vec<Result<WatchEvent, String>>,
        close: bool,
    },
    OpenError(String),
}

impl ScriptedWatch {
    /// Delivers `events`, then the stream ends.
    pub fn close(events: Vec<Result<WatchEvent, String>>) -> Self {
        Self::Events {
            events,
            close: true,
        }
    }

    /// Delivers `events`, then stays open.
    pub fn hold(events: Vec<Result<WatchEvent, String>>) -> Self {
        Self::Events {
            events,
            close: false,
        }
    }
}

struct LiveWatch(Arc<AtomicUsize>);

impl Drop for LiveWatch {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Cluster whose listings and watch streams are scripted up front. Once
/// the scripted watches run out, new watches stay open and silent.
#[derive(Default)]
pub struct FakeCluster {
    listings: Mutex<HashMap<ResourceType, VecDeque<Result<TableListing, String>>>>,
    list_gate: Mutex<Option<oneshot::Receiver<()>>>,
    watches: Mutex<VecDeque<ScriptedWatch>>,
    list_calls: AtomicUsize,
    watch_opens: AtomicUsize,
    live: Arc<AtomicUsize>,
    deleted: Mutex<Vec<(ResourceType, Option<String>, String)>>,
    delete_error: Mutex<Option<String>>,
}

impl FakeCluster {
    pub fn set_listing(&self, resource: ResourceType, listing: Result<TableListing, String>) {
        self.listings
            .lock()
            .expect("listings lock")
            .insert(resource, VecDeque::from([listing]));
    }

    /// Served after the earlier listings of `resource` were used once
    /// each. The last listing keeps being served.
    pub fn queue_listing(&self, resource: ResourceType, listing: Result<TableListing, String>) {
        self.listings
            .lock()
            .expect("listings lock")
            .entry(resource)
            .or_default()
            .push_back(listing);
    }

    /// Blocks the next listing until the returned sender fires or drops.
    pub fn hold_listing(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.list_gate.lock().expect("gate lock") = Some(rx);
        tx
    }

    pub fn script_watch(&self, watch: ScriptedWatch) {
        self.watches.lock().expect("watches lock").push_back(watch);
    }

    pub fn fail_deletes(&self, message: &str) {
        *self.delete_error.lock().expect("delete lock") = Some(message.to_string());
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn watch_opens(&self) -> usize {
        self.watch_opens.load(Ordering::SeqCst)
    }

    pub fn live_watches(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<(ResourceType, Option<String>, String)> {
        self.deleted.lock().expect("deleted lock").clone()
    }
}

impl ClusterClient for FakeCluster {
    fn list_as_table(
        &self,
        resource: ResourceType,
        _scope: &NamespaceScope,
    ) -> BoxFuture<'static, Result<TableListing>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.list_gate.lock().expect("gate lock").take();
        let listing = {
            let mut listings = self.listings.lock().expect("listings lock");
            match listings.get_mut(&resource) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        }
        .unwrap_or_else(|| Ok(TableListing::default()));
        async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            listing.map_err(|message| anyhow::anyhow!(message))
        }
        .boxed()
    }

    fn watch_as_table(
        &self,
        _resource: ResourceType,
        _scope: &NamespaceScope,
    ) -> BoxFuture<'static, Result<WatchStream>> {
        self.watch_opens.fetch_add(1, Ordering::SeqCst);
        let script = self
            .watches
            .lock()
            .expect("watches lock")
            .pop_front()
            .unwrap_or_else(|| ScriptedWatch::hold(Vec::new()));

        let (events, close) = match script {
            ScriptedWatch::OpenError(message) => {
                return async move { Err(anyhow::anyhow!(message)) }.boxed();
            }
            ScriptedWatch::Events { events, close } => (events, close),
        };

        self.live.fetch_add(1, Ordering::SeqCst);
        let guard = LiveWatch(self.live.clone());
        let events = events
            .into_iter()
            .map(|event| event.map_err(|message| anyhow::anyhow!(message)))
            .collect::<Vec<_>>();
        let scripted = stream::iter(events);
        let stream: WatchStream = if close {
            scripted.boxed()
        } else {
            scripted.chain(stream::pending()).boxed()
        };
        let stream: WatchStream = stream
            .map(move |event| {
                let _ = &guard;
                event
            })
            .boxed();
        async move { Ok(stream) }.boxed()
    }

    fn delete(
        &self,
        resource: ResourceType,
        namespace: Option<&str>,
        name: &str,
    ) -> BoxFuture<'static, Result<()>> {
        let failure = self.delete_error.lock().expect("delete lock").clone();
        if failure.is_none() {
            self.deleted.lock().expect("deleted lock").push((
                resource,
                namespace.map(str::to_string),
                name.to_string(),
            ));
        }
        async move {
            match failure {
                Some(message) => Err(anyhow::anyhow!(message)),
                None => Ok(()),
            }
        }
        .boxed()
    }
}

/// Records reports and answers every confirm with a canned reply.
#[derive(Default)]
pub struct FakeStatus {
    infos: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    answer: AtomicBool,
}

impl FakeStatus {
    pub fn answer(&self, yes: bool) {
        self.answer.store(yes, Ordering::SeqCst);
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().expect("infos lock").clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("errors lock").clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

impl StatusReporter for FakeStatus {
    fn info(&self, message: String) {
        self.infos.lock().expect("infos lock").push(message);
    }

    fn error(&self, error: &anyhow::Error) {
        self.errors
            .lock()
            .expect("errors lock")
            .push(compact_error(error));
    }

    fn confirm(&self, prompt: String) -> BoxFuture<'static, bool> {
        self.prompts.lock().expect("prompts lock").push(prompt);
        let answer = self.answer.load(Ordering::SeqCst);
        async move { answer }.boxed()
    }
}

#[derive(Default)]
pub struct FakeExecutor {
    pipelines: Mutex<Vec<Vec<ShellCommand>>>,
}

impl FakeExecutor {
    pub fn pipelines(&self) -> Vec<Vec<ShellCommand>> {
        self.pipelines.lock().expect("pipelines lock").clone()
    }
}

impl CommandExecutor for FakeExecutor {
    fn run(&self, pipeline: Vec<ShellCommand>) -> BoxFuture<'static, Result<()>> {
        self.pipelines.lock().expect("pipelines lock").push(pipeline);
        async { Ok(()) }.boxed()
    }
}

#[derive(Default)]
pub struct FakeClipboard {
    copied: Mutex<Vec<String>>,
}

impl FakeClipboard {
    pub fn copied(&self) -> Vec<String> {
        self.copied.lock().expect("clipboard lock").clone()
    }
}

impl Clipboard for FakeClipboard {
    fn copy(&self, text: &str) -> Result<()> {
        self.copied
            .lock()
            .expect("clipboard lock")
            .push(text.to_string());
        Ok(())
    }
}

/// All fakes wired into one [`ViewContext`], plus the batch receiver.
pub struct Harness {
    pub cluster: Arc<FakeCluster>,
    pub status: Arc<FakeStatus>,
    pub executor: Arc<FakeExecutor>,
    pub clipboard: Arc<FakeClipboard>,
    pub batches: mpsc::UnboundedReceiver<ViewBatch>,
    tx: mpsc::UnboundedSender<ViewBatch>,
}

impl Harness {
    pub fn new() -> Self {
        let (tx, batches) = mpsc::unbounded_channel();
        Self {
            cluster: Arc::new(FakeCluster::default()),
            status: Arc::new(FakeStatus::default()),
            executor: Arc::new(FakeExecutor::default()),
            clipboard: Arc::new(FakeClipboard::default()),
            batches,
            tx,
        }
    }

    pub fn context(&self) -> ViewContext {
        let config = RuntimeConfig {
            pager: "less".to_string(),
            editor: None,
            ..RuntimeConfig::default()
        };
        ViewContext {
            client: self.cluster.clone(),
            status: self.status.clone(),
            executor: self.executor.clone(),
            clipboard: self.clipboard.clone(),
            commands: CommandBuilder::new(&config, &ClientConfig::default()),
            policy: RestartPolicy::immediate(),
            batches: self.tx.clone(),
        }
    }
}
