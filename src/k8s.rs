use anyhow::{Context, Result};
use futures::future::{self, BoxFuture};
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use http::HeaderValue;
use http::header::ACCEPT;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, ListParams, WatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind, Request, WatchEvent as KubeWatchEvent};
use kube::{Api, Client, Config, Resource};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

use crate::model::{ColumnMode, NamespaceScope, ResourceType, Row, RowMetadata};

const TABLE_ACCEPT: &str =
    "application/json;as=Table;v=v1;g=meta.k8s.io,application/json;as=Table;v=v1beta1;g=meta.k8s.io";
// Replays current state as Added events when a watch opens.
const WATCH_FROM_START: &str = "0";

/// The cluster operations a resource view depends on.
pub trait ClusterClient: Send + Sync {
    fn list_as_table(
        &self,
        resource: ResourceType,
        scope: &NamespaceScope,
    ) -> BoxFuture<'static, Result<TableListing>>;

    fn watch_as_table(
        &self,
        resource: ResourceType,
        scope: &NamespaceScope,
    ) -> BoxFuture<'static, Result<WatchStream>>;

    fn delete(
        &self,
        resource: ResourceType,
        namespace: Option<&str>,
        name: &str,
    ) -> BoxFuture<'static, Result<()>>;
}

pub type WatchStream = BoxStream<'static, Result<WatchEvent>>;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum WatchEvent {
    Added(Vec<Row>),
    Modified(Vec<Row>),
    Deleted(Vec<Row>),
    Error(String),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub priority: i32,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TableListing {
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<Row>,
}

impl TableListing {
    /// Header names and source cell indices for `mode`. A name-only view
    /// over a table without a `Name` column keeps the first column.
    pub fn select_columns(&self, mode: ColumnMode) -> (Vec<String>, Vec<usize>) {
        let mut indices = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| mode.includes(&column.name, column.priority))
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        if indices.is_empty() && !self.columns.is_empty() {
            indices.push(0);
        }
        let names = indices
            .iter()
            .map(|index| self.columns[*index].name.clone())
            .collect();
        (names, indices)
    }
}

/// Explicit cluster selection handed to [`KubeGateway::connect`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
}

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    context: String,
    cluster: String,
    default_namespace: String,
}

impl KubeGateway {
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let kubeconfig = match &config.kubeconfig {
            Some(path) => Some(
                Kubeconfig::read_from(path)
                    .with_context(|| format!("failed to read kubeconfig {}", path.display()))?,
            ),
            None => Kubeconfig::read().ok(),
        };

        let client_config = if let Some(kubeconfig_value) = kubeconfig.clone() {
            let options = KubeConfigOptions {
                context: config.context.clone(),
                cluster: None,
                user: None,
            };
            Config::from_custom_kubeconfig(kubeconfig_value, &options)
                .await
                .context("failed to infer Kubernetes configuration")?
        } else {
            if config.context.is_some() {
                anyhow::bail!("kubeconfig not found; --context is unavailable in this environment");
            }
            Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?
        };

        let cluster = client_config.cluster_url.to_string();
        let default_namespace = client_config.default_namespace.clone();
        let client =
            Client::try_from(client_config).context("failed to initialize Kubernetes client")?;

        let context = config
            .context
            .clone()
            .or_else(|| {
                kubeconfig
                    .as_ref()
                    .and_then(|cfg| cfg.current_context.clone())
            })
            .unwrap_or_else(|| "in-cluster".to_string());

        Ok(Self {
            client,
            context,
            cluster,
            default_namespace,
        })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }
}

impl ClusterClient for KubeGateway {
    fn list_as_table(
        &self,
        resource: ResourceType,
        scope: &NamespaceScope,
    ) -> BoxFuture<'static, Result<TableListing>> {
        let client = self.client.clone();
        let scope = scope.clone();
        async move {
            let request = collection_request(resource, &scope)
                .list(&ListParams::default())
                .with_context(|| format!("failed to build {} list request", resource.title()))?;
            let table: TableResponse = client
                .request(accept_table(request))
                .await
                .with_context(|| format!("failed to list {} in {scope}", resource.title()))?;
            debug!(
                "listed {} {} rows in {scope}",
                table.rows.len(),
                resource.title()
            );
            table_listing(table, resource)
        }
        .boxed()
    }

    fn watch_as_table(
        &self,
        resource: ResourceType,
        scope: &NamespaceScope,
    ) -> BoxFuture<'static, Result<WatchStream>> {
        let client = self.client.clone();
        let scope = scope.clone();
        async move {
            let request = collection_request(resource, &scope)
                .watch(&WatchParams::default(), WATCH_FROM_START)
                .with_context(|| format!("failed to build {} watch request", resource.title()))?;
            let events = client
                .request_events::<TableResponse>(accept_table(request))
                .await
                .with_context(|| format!("failed to watch {} in {scope}", resource.title()))?;
            let stream = events.filter_map(move |event| {
                future::ready(match event {
                    Ok(event) => convert_watch_event(event, resource),
                    Err(error) => Some(Err(anyhow::Error::new(error)
                        .context(format!("{} watch stream failed", resource.title())))),
                })
            });
            Ok(stream.boxed())
        }
        .boxed()
    }

    fn delete(
        &self,
        resource: ResourceType,
        namespace: Option<&str>,
        name: &str,
    ) -> BoxFuture<'static, Result<()>> {
        let client = self.client.clone();
        let namespace = namespace.map(str::to_string);
        let name = name.to_string();
        async move {
            let api_resource = api_resource(resource);
            let api: Api<DynamicObject> = if resource.namespaced() {
                let namespace = namespace.with_context(|| {
                    format!("namespace is required for {} delete", resource.kind())
                })?;
                Api::namespaced_with(client, &namespace, &api_resource)
            } else {
                Api::all_with(client, &api_resource)
            };
            let _ = api
                .delete(&name, &DeleteParams::default())
                .await
                .with_context(|| format!("failed to delete {} {name}", resource.kind()))?;
            Ok(())
        }
        .boxed()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableResponse {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    column_definitions: Vec<ColumnDefinition>,
    #[serde(default)]
    rows: Vec<TableRow>,
}

impl TableResponse {
    /// Rows of a server-side Table. Any other payload is refused instead
    /// of reading as an empty table.
    fn into_rows(self, resource: ResourceType) -> Result<Vec<Row>> {
        if self.kind != "Table" {
            anyhow::bail!("server did not return a Table (kind {:?})", self.kind);
        }
        convert_rows(self.rows, resource)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ColumnDefinition {
    name: String,
    #[serde(default)]
    priority: i32,
}

#[derive(Debug, Clone, Deserialize)]
struct TableRow {
    #[serde(default)]
    cells: Vec<Value>,
    #[serde(default)]
    object: Option<PartialObject>,
}

#[derive(Debug, Clone, Deserialize)]
struct PartialObject {
    #[serde(default)]
    metadata: ObjectMeta,
}

fn api_resource(resource: ResourceType) -> ApiResource {
    let gvk = GroupVersionKind::gvk(resource.group(), resource.version(), resource.kind());
    ApiResource::from_gvk_with_plural(&gvk, resource.plural())
}

fn collection_request(resource: ResourceType, scope: &NamespaceScope) -> Request {
    let namespace = if resource.namespaced() {
        scope.name()
    } else {
        None
    };
    Request::new(DynamicObject::url_path(&api_resource(resource), namespace))
}

fn accept_table(mut request: http::Request<Vec<u8>>) -> http::Request<Vec<u8>> {
    request
        .headers_mut()
        .insert(ACCEPT, HeaderValue::from_static(TABLE_ACCEPT));
    request
}

fn table_listing(mut table: TableResponse, resource: ResourceType) -> Result<TableListing> {
    let columns = std::mem::take(&mut table.column_definitions)
        .into_iter()
        .map(|column| ColumnDef {
            name: column.name,
            priority: column.priority,
        })
        .collect();
    let rows = table.into_rows(resource)?;
    Ok(TableListing { columns, rows })
}

fn convert_watch_event(
    event: KubeWatchEvent<TableResponse>,
    resource: ResourceType,
) -> Option<Result<WatchEvent>> {
    match event {
        KubeWatchEvent::Added(table) => Some(table.into_rows(resource).map(WatchEvent::Added)),
        KubeWatchEvent::Modified(table) => Some(table.into_rows(resource).map(WatchEvent::Modified)),
        KubeWatchEvent::Deleted(table) => Some(table.into_rows(resource).map(WatchEvent::Deleted)),
        KubeWatchEvent::Bookmark(_) => None,
        KubeWatchEvent::Error(error) => Some(Ok(WatchEvent::Error(error.message))),
    }
}

fn convert_rows(rows: Vec<TableRow>, resource: ResourceType) -> Result<Vec<Row>> {
    rows.into_iter()
        .map(|row| convert_row(row, resource))
        .collect()
}

fn convert_row(row: TableRow, resource: ResourceType) -> Result<Row> {
    let metadata = row
        .object
        .map(|object| object.metadata)
        .context("invalid row: missing object metadata")?;
    let name = metadata
        .name
        .filter(|name| !name.is_empty())
        .context("invalid row: missing name")?;
    let namespace = metadata.namespace.filter(|namespace| !namespace.is_empty());
    let id = metadata
        .uid
        .filter(|uid| !uid.is_empty())
        .unwrap_or_else(|| match &namespace {
            Some(namespace) => format!("{namespace}/{name}"),
            None => name.clone(),
        });
    let cells = row.cells.iter().map(render_cell).collect();

    Ok(Row::new(id, cells).with_metadata(RowMetadata {
        namespace,
        kind: resource.kind().to_string(),
        name,
    }))
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
