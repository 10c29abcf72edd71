use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::exec::{Clipboard, CommandBuilder, CommandExecutor};
use crate::k8s::ClusterClient;
use crate::menu::RowAction;
use crate::model::{NamespaceScope, Operation, ResourceType, Row, RowMetadata, TableFormat};
use crate::status::StatusReporter;
use crate::watch::{
    BatchSink, Reseed, RestartPolicy, StopSignal, ViewBatch, ViewId, WatchHandle, WatchState,
    WatchSupervisor,
};

/// Collaborators shared by every resource view.
#[derive(Clone)]
pub struct ViewContext {
    pub client: Arc<dyn ClusterClient>,
    pub status: Arc<dyn StatusReporter>,
    pub executor: Arc<dyn CommandExecutor>,
    pub clipboard: Arc<dyn Clipboard>,
    pub commands: CommandBuilder,
    pub policy: RestartPolicy,
    pub batches: mpsc::UnboundedSender<ViewBatch>,
}

/// One resource type in one namespace scope, kept live while shown.
pub struct ResourceView {
    id: ViewId,
    resource: ResourceType,
    scope: NamespaceScope,
    format: TableFormat,
    extra_rows: BTreeMap<usize, Row>,
    generation: u64,
    watch: Option<WatchHandle>,
    context: ViewContext,
}

impl ResourceView {
    pub fn new(
        id: ViewId,
        resource: ResourceType,
        scope: NamespaceScope,
        format: TableFormat,
        context: ViewContext,
    ) -> Self {
        Self {
            id,
            resource,
            scope,
            format,
            extra_rows: BTreeMap::new(),
            generation: 0,
            watch: None,
            context,
        }
    }

    /// A synthetic row placed at `index` after every reload.
    pub fn with_extra_row(mut self, index: usize, row: Row) -> Self {
        self.extra_rows.insert(index, row);
        self
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn resource(&self) -> ResourceType {
        self.resource
    }

    pub fn scope(&self) -> &NamespaceScope {
        &self.scope
    }

    #[cfg(test)]
    pub fn format(&self) -> TableFormat {
        self.format
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[cfg(test)]
    pub fn is_visible(&self) -> bool {
        self.watch.is_some()
    }

    #[cfg(test)]
    pub fn state(&self) -> WatchState {
        self.watch
            .as_ref()
            .map(WatchHandle::state)
            .unwrap_or(WatchState::Idle)
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> Option<tokio::sync::watch::Receiver<WatchState>> {
        self.watch.as_ref().map(WatchHandle::subscribe)
    }

    /// Takes effect on the next [`ResourceView::show`].
    pub fn set_scope(&mut self, scope: NamespaceScope) {
        self.scope = scope;
    }

    /// Starts a fresh generation: list, seed, then watch if the format
    /// asks for live updates. A previous generation is stopped first.
    pub fn show(&mut self) {
        if let Some(previous) = self.watch.take() {
            previous.stop();
        }
        self.generation += 1;
        info!(
            "showing {} in {} (generation {})",
            self.resource.title(),
            self.scope,
            self.generation
        );

        let loader = ViewLoader {
            seeder: Seeder {
                client: self.context.client.clone(),
                resource: self.resource,
                scope: self.scope.clone(),
                format: self.format,
                extra_rows: self.extra_rows.clone(),
            },
            status: self.context.status.clone(),
            policy: self.context.policy,
            sink: BatchSink::new(self.context.batches.clone(), self.id, self.generation),
        };
        self.watch = Some(WatchHandle::spawn(move |signal| loader.run(signal)));
    }

    /// Stops loading and watching. Safe to call repeatedly.
    pub fn hide(&mut self) {
        if let Some(watch) = self.watch.take() {
            info!("hiding {} in {}", self.resource.title(), self.scope);
            watch.stop();
        }
    }

    pub fn refresh(&mut self) {
        self.hide();
        self.show();
    }

    /// Runs `action` against `row` in the background.
    pub fn run_action(&self, action: RowAction, row: Row) -> JoinHandle<()> {
        let task = RowActionTask {
            context: self.context.clone(),
            resource: self.resource,
        };
        tokio::spawn(async move { task.run(action, row).await })
    }
}

impl Drop for ResourceView {
    fn drop(&mut self) {
        self.hide();
    }
}

/// Lists a resource and turns the listing into a full seed batch.
#[derive(Clone)]
struct Seeder {
    client: Arc<dyn ClusterClient>,
    resource: ResourceType,
    scope: NamespaceScope,
    format: TableFormat,
    extra_rows: BTreeMap<usize, Row>,
}

impl Seeder {
    async fn seed(self) -> Result<Reseed> {
        let listing = self.client.list_as_table(self.resource, &self.scope).await?;
        let (names, columns) = listing.select_columns(self.format.columns);
        let mut ops = Vec::with_capacity(listing.rows.len() + self.extra_rows.len() + 3);
        ops.push(Operation::Clear);
        ops.push(Operation::SetColumns(names));
        ops.extend(
            listing
                .rows
                .into_iter()
                .map(|row| Operation::added(row.project(&columns))),
        );
        ops.extend(
            self.extra_rows
                .into_iter()
                .map(|(index, row)| Operation::added_at(row, index)),
        );
        ops.push(Operation::InitFinished);
        Ok(Reseed { ops, columns })
    }
}

struct ViewLoader {
    seeder: Seeder,
    status: Arc<dyn StatusReporter>,
    policy: RestartPolicy,
    sink: BatchSink,
}

impl ViewLoader {
    async fn run(self, mut signal: StopSignal) {
        signal.set_state(WatchState::Listing);
        if !self.sink.send(vec![Operation::InitStart]) {
            return;
        }

        let seeded = tokio::select! {
            biased;
            _ = signal.stopped() => return,
            seeded = self.seeder.clone().seed() => seeded,
        };
        if signal.is_stopped() {
            return;
        }
        let Reseed { ops, columns } = match seeded {
            Ok(seeded) => seeded,
            Err(error) => {
                self.sink.send(vec![Operation::InitFinished]);
                self.status.error(&error);
                return;
            }
        };

        let resource = self.seeder.resource;
        debug!("seeding {} with {} operations", resource.title(), ops.len());
        if !self.sink.send(ops) || !self.seeder.format.watch {
            return;
        }

        let seeder = self.seeder;
        WatchSupervisor::new(
            seeder.client.clone(),
            self.status,
            resource,
            seeder.scope.clone(),
            self.policy,
            self.sink,
        )
        .with_columns(columns)
        .with_reseed(Box::new(move || seeder.clone().seed().boxed()))
        .run(signal)
        .await;
    }
}

struct RowActionTask {
    context: ViewContext,
    resource: ResourceType,
}

impl RowActionTask {
    async fn run(self, action: RowAction, row: Row) {
        debug!("{} on row {}", action.label(), row.id());
        if let Err(error) = self.perform(action, &row).await {
            self.context.status.error(&error);
        }
    }

    async fn perform(&self, action: RowAction, row: &Row) -> Result<()> {
        if action.pod_only() && self.resource != ResourceType::Pods {
            anyhow::bail!("{} is only available for pods", action.label());
        }
        let RowMetadata {
            namespace,
            kind,
            name,
        } = row
            .metadata()
            .cloned()
            .with_context(|| format!("invalid row {}", row.id()))?;
        let namespace = namespace.as_deref();

        match action {
            RowAction::Describe => {
                let pipeline = self.context.commands.describe(self.resource, namespace, &name);
                self.context
                    .executor
                    .run(pipeline)
                    .await
                    .with_context(|| format!("failed to describe {kind} {name}"))?;
            }
            RowAction::Edit => {
                let pipeline = self.context.commands.edit(self.resource, namespace, &name);
                self.context
                    .executor
                    .run(pipeline)
                    .await
                    .with_context(|| format!("failed to edit {kind} {name}"))?;
            }
            RowAction::Logs | RowAction::PreviousLogs => {
                let previous = action == RowAction::PreviousLogs;
                let pipeline = self.context.commands.logs(namespace, &name, previous);
                self.context
                    .executor
                    .run(pipeline)
                    .await
                    .with_context(|| format!("failed to show logs of {kind} {name}"))?;
            }
            RowAction::Shell => {
                let pipeline = self.context.commands.shell(namespace, &name);
                self.context
                    .executor
                    .run(pipeline)
                    .await
                    .with_context(|| format!("failed to open a shell in {kind} {name}"))?;
            }
            RowAction::CopyName => {
                let clipboard = self.context.clipboard.clone();
                let text = name.clone();
                tokio::task::spawn_blocking(move || clipboard.copy(&text))
                    .await
                    .context("clipboard task failed")??;
                self.context
                    .status
                    .info(format!("Resource name copied! '{name}'"));
            }
            RowAction::Delete => {
                let target = match namespace {
                    Some(namespace) => format!("{namespace}/{name}"),
                    None => name.clone(),
                };
                let prompt =
                    format!("You are about to delete {kind} {target}. Are you sure? (y/N)");
                if !self.context.status.confirm(prompt).await {
                    self.context.status.info("Cancelled.".to_string());
                    return Ok(());
                }
                info!("deleting {kind} {target}");
                self.context
                    .client
                    .delete(self.resource, namespace, &name)
                    .await?;
                self.context.status.info("Deleted.".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ResourceView;
    use crate::k8s::{ColumnDef, TableListing, WatchEvent};
    use crate::menu::RowAction;
    use crate::model::{
        ColumnMode, NamespaceScope, Operation, ResourceType, Row, RowMetadata, TableFormat,
    };
    use crate::table::TableStore;
    use crate::testing::{Harness, ScriptedWatch, wait_until};
    use crate::watch::{ViewBatch, WatchState};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn pod(id: &str, name: &str, status: &str) -> Row {
        Row::new(id, vec![name.to_string(), status.to_string()]).with_metadata(RowMetadata {
            namespace: Some("shop".to_string()),
            kind: "Pod".to_string(),
            name: name.to_string(),
        })
    }

    fn listing(rows: Vec<Row>) -> TableListing {
        TableListing {
            columns: vec![
                ColumnDef {
                    name: "Name".to_string(),
                    priority: 0,
                },
                ColumnDef {
                    name: "Status".to_string(),
                    priority: 0,
                },
            ],
            rows,
        }
    }

    fn view(harness: &Harness, format: TableFormat) -> ResourceView {
        ResourceView::new(
            1,
            ResourceType::Pods,
            NamespaceScope::Named("shop".to_string()),
            format,
            harness.context(),
        )
    }

    async fn next_batch(rx: &mut mpsc::UnboundedReceiver<ViewBatch>) -> ViewBatch {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("batch in time")
            .expect("channel open")
    }

    async fn wait_for_state(view: &ResourceView, state: WatchState) {
        let mut states = view.subscribe().expect("visible view");
        timeout(Duration::from_secs(2), states.wait_for(|current| *current == state))
            .await
            .expect("state in time")
            .expect("state channel");
    }

    #[tokio::test]
    async fn show_seeds_then_watches() {
        let mut harness = Harness::new();
        harness.cluster.set_listing(
            ResourceType::Pods,
            Ok(listing(vec![pod("a", "pod-a", "Running"), pod("b", "pod-b", "Pending")])),
        );
        harness.cluster.script_watch(ScriptedWatch::hold(vec![Ok(WatchEvent::Modified(vec![
            pod("b", "pod-b", "Running"),
        ]))]));
        let mut view = view(&harness, TableFormat::default());
        view.show();

        let start = next_batch(&mut harness.batches).await;
        assert_eq!((start.view, start.generation), (1, 1));
        assert_eq!(start.ops, vec![Operation::InitStart]);

        let seed = next_batch(&mut harness.batches).await;
        assert_eq!(
            seed.ops,
            vec![
                Operation::Clear,
                Operation::SetColumns(vec!["Name".to_string(), "Status".to_string()]),
                Operation::added(pod("a", "pod-a", "Running")),
                Operation::added(pod("b", "pod-b", "Pending")),
                Operation::InitFinished,
            ]
        );

        let update = next_batch(&mut harness.batches).await;
        assert_eq!(update.ops, vec![Operation::Modified(pod("b", "pod-b", "Running"))]);
        assert_eq!(harness.cluster.watch_opens(), 1);
        assert_eq!(view.state(), WatchState::Watching);
    }

    #[tokio::test]
    async fn seed_then_watch_reaches_the_expected_table() {
        let mut harness = Harness::new();
        harness.cluster.set_listing(
            ResourceType::Pods,
            Ok(listing(vec![pod("a", "pod-a", "Running"), pod("b", "pod-b", "Pending")])),
        );
        harness.cluster.script_watch(ScriptedWatch::hold(vec![
            Ok(WatchEvent::Modified(vec![pod("b", "pod-b", "Running")])),
            Ok(WatchEvent::Deleted(vec![pod("a", "pod-a", "Running")])),
        ]));
        let mut view = view(&harness, TableFormat::default());
        view.show();

        let mut store = TableStore::new();
        for _ in 0..4 {
            store.apply(next_batch(&mut harness.batches).await.ops);
        }
        assert_eq!(store.len(), 1);
        assert_eq!(store.rows()[0].id(), "b");
        assert_eq!(store.rows()[0].cells(), ["pod-b", "Running"]);
        assert!(!store.loading());
    }

    #[tokio::test]
    async fn restarted_watch_drops_rows_deleted_while_closed() {
        let mut harness = Harness::new();
        harness.cluster.set_listing(
            ResourceType::Pods,
            Ok(listing(vec![pod("a", "pod-a", "Running"), pod("b", "pod-b", "Running")])),
        );
        harness
            .cluster
            .queue_listing(ResourceType::Pods, Ok(listing(vec![pod("b", "pod-b", "Running")])));
        harness.cluster.script_watch(ScriptedWatch::close(vec![]));
        harness.cluster.script_watch(ScriptedWatch::hold(vec![Ok(WatchEvent::Added(vec![
            pod("b", "pod-b", "Running"),
        ]))]));
        let mut view = view(&harness, TableFormat::default());
        view.show();

        let mut store = TableStore::new();
        for _ in 0..4 {
            store.apply(next_batch(&mut harness.batches).await.ops);
        }
        let ids = store.rows().iter().map(Row::id).collect::<Vec<_>>();
        assert_eq!(ids, ["b"]);
        assert_eq!(store.header(), ["Name", "Status"]);
        assert_eq!(harness.cluster.list_calls(), 2);
        assert_eq!(harness.cluster.watch_opens(), 2);
    }

    #[tokio::test]
    async fn failed_reseed_is_reported_and_retried() {
        let mut harness = Harness::new();
        harness
            .cluster
            .set_listing(ResourceType::Pods, Ok(listing(vec![pod("a", "pod-a", "Running")])));
        harness
            .cluster
            .queue_listing(ResourceType::Pods, Err("connection refused".to_string()));
        harness.cluster.queue_listing(ResourceType::Pods, Ok(listing(vec![])));
        harness.cluster.script_watch(ScriptedWatch::close(vec![]));
        let mut view = view(&harness, TableFormat::default());
        view.show();

        let mut store = TableStore::new();
        for _ in 0..3 {
            store.apply(next_batch(&mut harness.batches).await.ops);
        }
        assert!(store.is_empty());
        assert_eq!(harness.status.errors(), vec!["connection refused".to_string()]);
        wait_until(|| harness.cluster.watch_opens() == 2).await;
        assert_eq!(harness.cluster.list_calls(), 3);
    }

    #[tokio::test]
    async fn listing_failure_only_finishes_and_reports() {
        let mut harness = Harness::new();
        harness
            .cluster
            .set_listing(ResourceType::Pods, Err("pods is forbidden".to_string()));
        let mut view = view(&harness, TableFormat::default());
        view.show();

        assert_eq!(next_batch(&mut harness.batches).await.ops, vec![Operation::InitStart]);
        assert_eq!(
            next_batch(&mut harness.batches).await.ops,
            vec![Operation::InitFinished]
        );
        wait_for_state(&view, WatchState::Stopped).await;
        assert_eq!(harness.status.errors(), vec!["pods is forbidden".to_string()]);
        assert_eq!(harness.cluster.watch_opens(), 0);
    }

    #[tokio::test]
    async fn static_formats_stop_after_the_seed() {
        let mut harness = Harness::new();
        harness
            .cluster
            .set_listing(ResourceType::Pods, Ok(listing(vec![pod("a", "pod-a", "Running")])));
        let format = TableFormat {
            watch: false,
            ..TableFormat::default()
        };
        let mut view = view(&harness, format);
        view.show();

        next_batch(&mut harness.batches).await;
        next_batch(&mut harness.batches).await;
        wait_for_state(&view, WatchState::Stopped).await;
        assert_eq!(harness.cluster.watch_opens(), 0);
    }

    #[tokio::test]
    async fn extra_rows_follow_the_listing_at_fixed_indices() {
        let mut harness = Harness::new();
        harness.cluster.set_listing(
            ResourceType::Namespaces,
            Ok(TableListing {
                columns: vec![
                    ColumnDef {
                        name: "Name".to_string(),
                        priority: 0,
                    },
                    ColumnDef {
                        name: "Age".to_string(),
                        priority: 0,
                    },
                ],
                rows: vec![Row::new("ns-1", vec!["default".to_string(), "3d".to_string()])],
            }),
        );
        let all = Row::new("*", vec!["all namespaces".to_string()]);
        let mut view = ResourceView::new(
            2,
            ResourceType::Namespaces,
            NamespaceScope::All,
            TableFormat::picker(),
            harness.context(),
        )
        .with_extra_row(0, all.clone());
        view.show();

        next_batch(&mut harness.batches).await;
        let seed = next_batch(&mut harness.batches).await;
        assert_eq!(
            seed.ops,
            vec![
                Operation::Clear,
                Operation::SetColumns(vec!["Name".to_string()]),
                Operation::added(Row::new("ns-1", vec!["default".to_string()])),
                Operation::added_at(all, 0),
                Operation::InitFinished,
            ]
        );
        assert_eq!(view.format().columns, ColumnMode::NameOnly);
    }

    #[tokio::test]
    async fn hide_during_listing_delivers_nothing_more() {
        let mut harness = Harness::new();
        let release = harness.cluster.hold_listing();
        let mut view = view(&harness, TableFormat::default());
        view.show();
        assert_eq!(next_batch(&mut harness.batches).await.ops, vec![Operation::InitStart]);

        let mut states = view.subscribe().expect("visible");
        view.hide();
        view.hide();
        assert!(!view.is_visible());
        let _ = release.send(());
        timeout(
            Duration::from_secs(2),
            states.wait_for(|state| *state == WatchState::Stopped),
        )
        .await
        .expect("stopped in time")
        .expect("state channel");

        assert!(harness.batches.try_recv().is_err());
        assert_eq!(harness.cluster.watch_opens(), 0);
    }

    #[tokio::test]
    async fn hide_without_show_is_harmless() {
        let harness = Harness::new();
        let mut view = view(&harness, TableFormat::default());
        view.hide();
        assert_eq!(view.state(), WatchState::Idle);
        assert_eq!(view.generation(), 0);
    }

    #[tokio::test]
    async fn refresh_replaces_the_watch_with_a_new_generation() {
        let mut harness = Harness::new();
        harness
            .cluster
            .set_listing(ResourceType::Pods, Ok(listing(vec![pod("a", "pod-a", "Running")])));
        let mut view = view(&harness, TableFormat::default());
        view.show();
        next_batch(&mut harness.batches).await;
        next_batch(&mut harness.batches).await;
        wait_until(|| harness.cluster.live_watches() == 1).await;

        view.refresh();
        assert_eq!(view.generation(), 2);
        let start = next_batch(&mut harness.batches).await;
        assert_eq!((start.generation, start.ops), (2, vec![Operation::InitStart]));
        next_batch(&mut harness.batches).await;
        wait_until(|| harness.cluster.watch_opens() == 2).await;
        wait_until(|| harness.cluster.live_watches() == 1).await;
        assert_eq!(harness.cluster.list_calls(), 2);
    }

    #[tokio::test]
    async fn delete_waits_for_confirmation() {
        let harness = Harness::new();
        harness.status.answer(false);
        let view = view(&harness, TableFormat::default());
        view.run_action(RowAction::Delete, pod("a", "pod-a", "Running"))
            .await
            .expect("task");

        assert_eq!(
            harness.status.prompts(),
            vec!["You are about to delete Pod shop/pod-a. Are you sure? (y/N)".to_string()]
        );
        assert_eq!(harness.status.infos(), vec!["Cancelled.".to_string()]);
        assert!(harness.cluster.deleted().is_empty());

        harness.status.answer(true);
        view.run_action(RowAction::Delete, pod("a", "pod-a", "Running"))
            .await
            .expect("task");
        assert_eq!(
            harness.cluster.deleted(),
            vec![(
                ResourceType::Pods,
                Some("shop".to_string()),
                "pod-a".to_string()
            )]
        );
        assert_eq!(harness.status.infos().last().map(String::as_str), Some("Deleted."));
    }

    #[tokio::test]
    async fn delete_failures_reach_the_status_line() {
        let harness = Harness::new();
        harness.status.answer(true);
        harness.cluster.fail_deletes("pods \"pod-a\" not found");
        let view = view(&harness, TableFormat::default());
        view.run_action(RowAction::Delete, pod("a", "pod-a", "Running"))
            .await
            .expect("task");
        assert_eq!(
            harness.status.errors(),
            vec!["pods \"pod-a\" not found".to_string()]
        );
    }

    #[tokio::test]
    async fn copy_puts_the_name_on_the_clipboard() {
        let harness = Harness::new();
        let view = view(&harness, TableFormat::default());
        view.run_action(RowAction::CopyName, pod("a", "pod-a", "Running"))
            .await
            .expect("task");
        assert_eq!(harness.clipboard.copied(), vec!["pod-a".to_string()]);
        assert_eq!(
            harness.status.infos(),
            vec!["Resource name copied! 'pod-a'".to_string()]
        );
    }

    #[tokio::test]
    async fn describe_and_edit_go_through_the_executor() {
        let harness = Harness::new();
        let view = view(&harness, TableFormat::default());
        view.run_action(RowAction::Describe, pod("a", "pod-a", "Running"))
            .await
            .expect("task");
        view.run_action(RowAction::Edit, pod("a", "pod-a", "Running"))
            .await
            .expect("task");

        let pipelines = harness.executor.pipelines();
        assert_eq!(pipelines.len(), 2);
        assert_eq!(pipelines[0][0].display(), "kubectl describe pods pod-a -n shop");
        assert_eq!(pipelines[0][1].program, "less");
        assert_eq!(pipelines[1][0].display(), "kubectl edit pods pod-a -n shop");
    }

    #[tokio::test]
    async fn pod_logs_and_shell_go_through_the_executor() {
        let harness = Harness::new();
        let view = view(&harness, TableFormat::default());
        for action in [RowAction::Logs, RowAction::PreviousLogs, RowAction::Shell] {
            view.run_action(action, pod("a", "pod-a", "Running"))
                .await
                .expect("task");
        }

        let pipelines = harness.executor.pipelines();
        assert_eq!(pipelines.len(), 3);
        assert_eq!(pipelines[0][0].display(), "kubectl logs pod-a -n shop");
        assert_eq!(pipelines[0][1].program, "less");
        assert_eq!(pipelines[1][0].display(), "kubectl logs pod-a -p -n shop");
        assert_eq!(&pipelines[2][0].args[..4], ["exec", "-it", "pod-a", "-n"]);
        assert!(harness.status.errors().is_empty());
    }

    #[tokio::test]
    async fn pod_actions_are_refused_for_other_resources() {
        let harness = Harness::new();
        let view = ResourceView::new(
            1,
            ResourceType::Deployments,
            NamespaceScope::Named("shop".to_string()),
            TableFormat::default(),
            harness.context(),
        );
        view.run_action(RowAction::Logs, pod("a", "api", "Running"))
            .await
            .expect("task");
        assert!(harness.executor.pipelines().is_empty());
        assert_eq!(
            harness.status.errors(),
            vec!["Logs is only available for pods".to_string()]
        );
    }

    #[tokio::test]
    async fn rows_without_metadata_abort_the_action() {
        let harness = Harness::new();
        let view = view(&harness, TableFormat::default());
        view.run_action(RowAction::Delete, Row::new("x", vec!["x".to_string()]))
            .await
            .expect("task");
        assert!(harness.status.prompts().is_empty());
        assert_eq!(harness.status.errors(), vec!["invalid row x".to_string()]);
    }
}
