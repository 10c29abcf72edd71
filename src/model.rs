use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ResourceType {
    Pods,
    Deployments,
    ReplicaSets,
    StatefulSets,
    DaemonSets,
    Jobs,
    CronJobs,
    Services,
    Ingresses,
    ConfigMaps,
    Secrets,
    PersistentVolumeClaims,
    PersistentVolumes,
    StorageClasses,
    ServiceAccounts,
    Roles,
    RoleBindings,
    ClusterRoles,
    ClusterRoleBindings,
    Nodes,
    Events,
    Namespaces,
}

impl ResourceType {
    pub const ALL: [Self; 22] = [
        Self::Pods,
        Self::Deployments,
        Self::ReplicaSets,
        Self::StatefulSets,
        Self::DaemonSets,
        Self::Jobs,
        Self::CronJobs,
        Self::Services,
        Self::Ingresses,
        Self::ConfigMaps,
        Self::Secrets,
        Self::PersistentVolumeClaims,
        Self::PersistentVolumes,
        Self::StorageClasses,
        Self::ServiceAccounts,
        Self::Roles,
        Self::RoleBindings,
        Self::ClusterRoles,
        Self::ClusterRoleBindings,
        Self::Nodes,
        Self::Events,
        Self::Namespaces,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Pods => "Pods",
            Self::Deployments => "Deployments",
            Self::ReplicaSets => "ReplicaSets",
            Self::StatefulSets => "StatefulSets",
            Self::DaemonSets => "DaemonSets",
            Self::Jobs => "Jobs",
            Self::CronJobs => "CronJobs",
            Self::Services => "Services",
            Self::Ingresses => "Ingresses",
            Self::ConfigMaps => "ConfigMaps",
            Self::Secrets => "Secrets",
            Self::PersistentVolumeClaims => "PVC",
            Self::PersistentVolumes => "PersistentVolumes",
            Self::StorageClasses => "StorageClasses",
            Self::ServiceAccounts => "ServiceAccounts",
            Self::Roles => "Roles",
            Self::RoleBindings => "RoleBindings",
            Self::ClusterRoles => "ClusterRoles",
            Self::ClusterRoleBindings => "ClusterRoleBindings",
            Self::Nodes => "Nodes",
            Self::Events => "Events",
            Self::Namespaces => "Namespaces",
        }
    }

    /// API group; empty for the core group.
    pub fn group(self) -> &'static str {
        match self {
            Self::Deployments | Self::ReplicaSets | Self::StatefulSets | Self::DaemonSets => "apps",
            Self::Jobs | Self::CronJobs => "batch",
            Self::Ingresses => "networking.k8s.io",
            Self::StorageClasses => "storage.k8s.io",
            Self::Roles | Self::RoleBindings | Self::ClusterRoles | Self::ClusterRoleBindings => {
                "rbac.authorization.k8s.io"
            }
            _ => "",
        }
    }

    pub fn version(self) -> &'static str {
        "v1"
    }

    pub fn kind(self) -> &'static str {
        match self {
            Self::Pods => "Pod",
            Self::Deployments => "Deployment",
            Self::ReplicaSets => "ReplicaSet",
            Self::StatefulSets => "StatefulSet",
            Self::DaemonSets => "DaemonSet",
            Self::Jobs => "Job",
            Self::CronJobs => "CronJob",
            Self::Services => "Service",
            Self::Ingresses => "Ingress",
            Self::ConfigMaps => "ConfigMap",
            Self::Secrets => "Secret",
            Self::PersistentVolumeClaims => "PersistentVolumeClaim",
            Self::PersistentVolumes => "PersistentVolume",
            Self::StorageClasses => "StorageClass",
            Self::ServiceAccounts => "ServiceAccount",
            Self::Roles => "Role",
            Self::RoleBindings => "RoleBinding",
            Self::ClusterRoles => "ClusterRole",
            Self::ClusterRoleBindings => "ClusterRoleBinding",
            Self::Nodes => "Node",
            Self::Events => "Event",
            Self::Namespaces => "Namespace",
        }
    }

    /// Plural resource name as used in API paths and kubectl invocations.
    pub fn plural(self) -> &'static str {
        match self {
            Self::Pods => "pods",
            Self::Deployments => "deployments",
            Self::ReplicaSets => "replicasets",
            Self::StatefulSets => "statefulsets",
            Self::DaemonSets => "daemonsets",
            Self::Jobs => "jobs",
            Self::CronJobs => "cronjobs",
            Self::Services => "services",
            Self::Ingresses => "ingresses",
            Self::ConfigMaps => "configmaps",
            Self::Secrets => "secrets",
            Self::PersistentVolumeClaims => "persistentvolumeclaims",
            Self::PersistentVolumes => "persistentvolumes",
            Self::StorageClasses => "storageclasses",
            Self::ServiceAccounts => "serviceaccounts",
            Self::Roles => "roles",
            Self::RoleBindings => "rolebindings",
            Self::ClusterRoles => "clusterroles",
            Self::ClusterRoleBindings => "clusterrolebindings",
            Self::Nodes => "nodes",
            Self::Events => "events",
            Self::Namespaces => "namespaces",
        }
    }

    pub fn namespaced(self) -> bool {
        !matches!(
            self,
            Self::PersistentVolumes
                | Self::StorageClasses
                | Self::ClusterRoles
                | Self::ClusterRoleBindings
                | Self::Nodes
                | Self::Namespaces
        )
    }

    /// Fully qualified name accepted by kubectl (`deployments.apps`).
    pub fn kubectl_name(self) -> String {
        if self.group().is_empty() {
            self.plural().to_string()
        } else {
            format!("{}.{}", self.plural(), self.group())
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "po" | "pod" | "pods" => Some(Self::Pods),
            "deploy" | "deployment" | "deployments" | "dp" => Some(Self::Deployments),
            "rs" | "replicaset" | "replicasets" | "replica-set" | "replica-sets" => {
                Some(Self::ReplicaSets)
            }
            "sts" | "statefulset" | "statefulsets" => Some(Self::StatefulSets),
            "ds" | "daemonset" | "daemonsets" | "daemon-set" | "daemon-sets" => {
                Some(Self::DaemonSets)
            }
            "job" | "jobs" => Some(Self::Jobs),
            "cj" | "cronjob" | "cronjobs" | "cron-job" | "cron-jobs" => Some(Self::CronJobs),
            "svc" | "service" | "services" => Some(Self::Services),
            "ing" | "ingress" | "ingresses" => Some(Self::Ingresses),
            "cm" | "configmap" | "configmaps" | "config-map" | "config-maps" => {
                Some(Self::ConfigMaps)
            }
            "secret" | "secrets" => Some(Self::Secrets),
            "pvc"
            | "persistentvolumeclaim"
            | "persistentvolumeclaims"
            | "persistent-volume-claim"
            | "persistent-volume-claims" => Some(Self::PersistentVolumeClaims),
            "pv" | "persistentvolume" | "persistentvolumes" | "persistent-volume"
            | "persistent-volumes" => Some(Self::PersistentVolumes),
            "sc" | "storageclass" | "storageclasses" | "storage-class" | "storage-classes" => {
                Some(Self::StorageClasses)
            }
            "sa" | "serviceaccount" | "serviceaccounts" | "service-account"
            | "service-accounts" => Some(Self::ServiceAccounts),
            "role" | "roles" => Some(Self::Roles),
            "rb" | "rolebinding" | "rolebindings" | "role-binding" | "role-bindings" => {
                Some(Self::RoleBindings)
            }
            "crole" | "clusterrole" | "clusterroles" | "cluster-role" | "cluster-roles" => {
                Some(Self::ClusterRoles)
            }
            "crb"
            | "clusterrolebinding"
            | "clusterrolebindings"
            | "cluster-role-binding"
            | "cluster-role-bindings" => Some(Self::ClusterRoleBindings),
            "node" | "nodes" | "no" => Some(Self::Nodes),
            "event" | "events" | "ev" => Some(Self::Events),
            "ns" | "namespace" | "namespaces" => Some(Self::Namespaces),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NamespaceScope {
    All,
    Named(String),
}

impl NamespaceScope {
    pub fn label(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Named(namespace) => namespace.clone(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Named(namespace) => Some(namespace),
        }
    }
}

impl Display for NamespaceScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Named(namespace) => write!(f, "{namespace}"),
        }
    }
}

/// Identity of the cluster object behind a row, used by row actions.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct RowMetadata {
    pub namespace: Option<String>,
    pub kind: String,
    pub name: String,
}

/// One table row. Rows are never edited in place; an update replaces the
/// row stored under the same id.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Row {
    id: String,
    cells: Vec<String>,
    metadata: Option<RowMetadata>,
}

impl Row {
    pub fn new(id: impl Into<String>, cells: Vec<String>) -> Self {
        Self {
            id: id.into(),
            cells,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: RowMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn metadata(&self) -> Option<&RowMetadata> {
        self.metadata.as_ref()
    }

    /// Keeps only the cells at `indices`, in that order. Missing cells
    /// render as empty strings so the row still matches the header width.
    pub fn project(self, indices: &[usize]) -> Self {
        let cells = indices
            .iter()
            .map(|index| self.cells.get(*index).cloned().unwrap_or_default())
            .collect();
        Self {
            id: self.id,
            cells,
            metadata: self.metadata,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Operation {
    Clear,
    SetColumns(Vec<String>),
    Added {
        row: Row,
        index: Option<usize>,
        sort_by_id: bool,
    },
    Modified(Row),
    Deleted(String),
    InitStart,
    InitFinished,
}

impl Operation {
    pub fn added(row: Row) -> Self {
        Self::Added {
            row,
            index: None,
            sort_by_id: false,
        }
    }

    pub fn added_sorted(row: Row) -> Self {
        Self::Added {
            row,
            index: None,
            sort_by_id: true,
        }
    }

    pub fn added_at(row: Row, index: usize) -> Self {
        Self::Added {
            row,
            index: Some(index),
            sort_by_id: false,
        }
    }
}

/// Operations produced together and applied as one unit.
pub type OperationBatch = Vec<Operation>;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum ColumnMode {
    Wide,
    #[default]
    Short,
    NameOnly,
}

impl ColumnMode {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "wide" | "all" => Some(Self::Wide),
            "short" | "default" => Some(Self::Short),
            "name" | "names" | "name-only" => Some(Self::NameOnly),
            _ => None,
        }
    }

    pub fn includes(self, name: &str, priority: i32) -> bool {
        match self {
            Self::Wide => true,
            Self::Short => priority == 0,
            Self::NameOnly => name.eq_ignore_ascii_case("name"),
        }
    }
}

/// Static description of what a resource view shows and supports.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TableFormat {
    pub columns: ColumnMode,
    pub watch: bool,
    pub actions: bool,
}

impl Default for TableFormat {
    fn default() -> Self {
        Self {
            columns: ColumnMode::Short,
            watch: true,
            actions: true,
        }
    }
}

impl TableFormat {
    pub fn picker() -> Self {
        Self {
            columns: ColumnMode::NameOnly,
            watch: true,
            actions: false,
        }
    }

    pub fn with_columns(mut self, columns: ColumnMode) -> Self {
        self.columns = columns;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnMode, ResourceType, Row};

    #[test]
    fn resource_aliases_map_to_expected_types() {
        assert_eq!(ResourceType::from_token("po"), Some(ResourceType::Pods));
        assert_eq!(ResourceType::from_token("cj"), Some(ResourceType::CronJobs));
        assert_eq!(
            ResourceType::from_token("persistent-volume-claims"),
            Some(ResourceType::PersistentVolumeClaims)
        );
        assert_eq!(
            ResourceType::from_token(" Deploy "),
            Some(ResourceType::Deployments)
        );
        assert_eq!(ResourceType::from_token("widgets"), None);
    }

    #[test]
    fn kubectl_name_includes_group_for_non_core_types() {
        assert_eq!(ResourceType::Pods.kubectl_name(), "pods");
        assert_eq!(ResourceType::Deployments.kubectl_name(), "deployments.apps");
        assert!(!ResourceType::Nodes.namespaced());
        assert!(ResourceType::Secrets.namespaced());
    }

    #[test]
    fn projection_reorders_and_pads_cells() {
        let row = Row::new(
            "uid-1",
            vec!["web".to_string(), "1/1".to_string(), "Running".to_string()],
        );
        let projected = row.project(&[2, 0, 7]);
        assert_eq!(projected.id(), "uid-1");
        assert_eq!(projected.cells(), ["Running", "web", ""]);
    }

    #[test]
    fn column_modes_filter_by_priority_and_name() {
        assert!(ColumnMode::Wide.includes("IP", 1));
        assert!(!ColumnMode::Short.includes("IP", 1));
        assert!(ColumnMode::Short.includes("Status", 0));
        assert!(ColumnMode::NameOnly.includes("Name", 0));
        assert!(!ColumnMode::NameOnly.includes("Status", 0));
    }
}
