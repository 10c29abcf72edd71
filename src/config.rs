use crate::model::{ColumnMode, ResourceType};
use crate::watch::RestartPolicy;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_RESTART_DELAY_MS: u64 = 250;
const DEFAULT_MAX_RESTART_DELAY_MS: u64 = 5_000;

/// Settings read once at startup. Every key is optional.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub source: Option<PathBuf>,
    pub kubectl: String,
    pub pager: String,
    pub editor: Option<String>,
    pub restart_delay: Duration,
    pub max_restart_delay: Duration,
    pub default_resource: Option<ResourceType>,
    pub columns: ColumnMode,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct KubedeckConfigFile {
    kubectl: Option<String>,
    pager: Option<String>,
    editor: Option<String>,
    watch: WatchSection,
    default_resource: Option<String>,
    format: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct WatchSection {
    #[serde(alias = "restart_delay")]
    restart_delay_ms: u64,
    #[serde(alias = "max_restart_delay")]
    max_restart_delay_ms: u64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            restart_delay_ms: DEFAULT_RESTART_DELAY_MS,
            max_restart_delay_ms: DEFAULT_MAX_RESTART_DELAY_MS,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            source: None,
            kubectl: "kubectl".to_string(),
            pager: default_pager(),
            editor: None,
            restart_delay: Duration::from_millis(DEFAULT_RESTART_DELAY_MS),
            max_restart_delay: Duration::from_millis(DEFAULT_MAX_RESTART_DELAY_MS),
            default_resource: None,
            columns: ColumnMode::default(),
        }
    }
}

impl RuntimeConfig {
    /// Loads `explicit` when given, otherwise the first discovered file.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => discover_config_path(),
        };
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config = Self::from_yaml(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.source = Some(path);
        Ok(config)
    }

    fn from_yaml(raw: &str) -> Result<Self> {
        let parsed: KubedeckConfigFile = if raw.trim().is_empty() {
            KubedeckConfigFile::default()
        } else {
            serde_yaml::from_str(raw)?
        };

        let default_resource = parsed
            .default_resource
            .as_deref()
            .map(|token| {
                ResourceType::from_token(token)
                    .with_context(|| format!("unknown default_resource '{token}'"))
            })
            .transpose()?;
        let columns = parsed
            .format
            .as_deref()
            .map(|token| {
                ColumnMode::from_token(token).with_context(|| format!("unknown format '{token}'"))
            })
            .transpose()?
            .unwrap_or_default();

        let restart_delay = Duration::from_millis(parsed.watch.restart_delay_ms);
        let max_restart_delay =
            Duration::from_millis(parsed.watch.max_restart_delay_ms).max(restart_delay);

        Ok(Self {
            source: None,
            kubectl: non_empty(parsed.kubectl).unwrap_or_else(|| "kubectl".to_string()),
            pager: non_empty(parsed.pager).unwrap_or_else(default_pager),
            editor: non_empty(parsed.editor),
            restart_delay,
            max_restart_delay,
            default_resource,
            columns,
        })
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        RestartPolicy::new(self.restart_delay, self.max_restart_delay)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn default_pager() -> String {
    non_empty(std::env::var("PAGER").ok()).unwrap_or_else(|| "less".to_string())
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("KUBEDECK_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [PathBuf::from("kubedeck.yaml"), PathBuf::from(".kubedeck.yaml")];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let candidate = PathBuf::from(home).join(".config/kubedeck/config.yaml");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    None
}
