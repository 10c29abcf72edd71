use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::process::{Child, Command as TokioCommand};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::config::RuntimeConfig;
use crate::k8s::ClientConfig;
use crate::model::ResourceType;

/// One external process invocation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

const SHELL_FALLBACK: &str = "command -v bash >/dev/null 2>&1 && exec bash || exec sh";

fn with_namespace(command: ShellCommand, namespace: Option<&str>) -> ShellCommand {
    match namespace {
        Some(namespace) => command.arg("-n").arg(namespace),
        None => command,
    }
}

/// Builds kubectl and pager invocations for row actions.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    kubectl: String,
    pager: String,
    editor: Option<String>,
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
}

impl CommandBuilder {
    pub fn new(config: &RuntimeConfig, client: &ClientConfig) -> Self {
        Self {
            kubectl: config.kubectl.clone(),
            pager: config.pager.clone(),
            editor: config.editor.clone(),
            kubeconfig: client.kubeconfig.clone(),
            context: client.context.clone(),
        }
    }

    /// `kubectl describe` piped into the pager.
    pub fn describe(
        &self,
        resource: ResourceType,
        namespace: Option<&str>,
        name: &str,
    ) -> Vec<ShellCommand> {
        let mut pipeline = vec![self.kubectl("describe", resource, namespace, name)];
        pipeline.extend(self.pager());
        pipeline
    }

    pub fn edit(
        &self,
        resource: ResourceType,
        namespace: Option<&str>,
        name: &str,
    ) -> Vec<ShellCommand> {
        let mut command = self.kubectl("edit", resource, namespace, name);
        if let Some(editor) = &self.editor {
            command = command.env("KUBE_EDITOR", editor);
        } else if std::env::var_os("KUBE_EDITOR").is_none()
            && let Ok(editor) = std::env::var("EDITOR")
        {
            command = command.env("KUBE_EDITOR", editor);
        }
        vec![command]
    }

    /// Pod logs piped into the pager. `previous` asks for the logs of the
    /// last terminated container instance.
    pub fn logs(&self, namespace: Option<&str>, pod: &str, previous: bool) -> Vec<ShellCommand> {
        let mut command = self.base().arg("logs").arg(pod);
        if previous {
            command = command.arg("-p");
        }
        let mut pipeline = vec![with_namespace(command, namespace)];
        pipeline.extend(self.pager());
        pipeline
    }

    /// Interactive shell in the pod's default container, bash when present.
    pub fn shell(&self, namespace: Option<&str>, pod: &str) -> Vec<ShellCommand> {
        let command = with_namespace(self.base().arg("exec").arg("-it").arg(pod), namespace)
            .arg("--")
            .arg("sh")
            .arg("-c")
            .arg(SHELL_FALLBACK);
        vec![command]
    }

    fn kubectl(
        &self,
        verb: &str,
        resource: ResourceType,
        namespace: Option<&str>,
        name: &str,
    ) -> ShellCommand {
        let command = self.base().arg(verb).arg(resource.kubectl_name()).arg(name);
        if resource.namespaced() {
            with_namespace(command, namespace)
        } else {
            command
        }
    }

    fn base(&self) -> ShellCommand {
        let mut command = ShellCommand::new(&self.kubectl);
        if let Some(kubeconfig) = &self.kubeconfig {
            command = command
                .arg("--kubeconfig")
                .arg(kubeconfig.display().to_string());
        }
        if let Some(context) = &self.context {
            command = command.arg("--context").arg(context);
        }
        command
    }

    fn pager(&self) -> Option<ShellCommand> {
        let mut words = self.pager.split_whitespace();
        let program = words.next()?;
        Some(words.fold(ShellCommand::new(program), |command, word| {
            command.arg(word)
        }))
    }
}

/// Runs a pipeline of external commands that may need the terminal.
pub trait CommandExecutor: Send + Sync {
    fn run(&self, pipeline: Vec<ShellCommand>) -> BoxFuture<'static, Result<()>>;
}

pub struct ExecRequest {
    pub pipeline: Vec<ShellCommand>,
    pub reply: oneshot::Sender<Result<()>>,
}

/// Hands pipelines to the UI loop, which suspends the terminal around them.
#[derive(Clone)]
pub struct TerminalExecutor {
    tx: mpsc::UnboundedSender<ExecRequest>,
}

impl TerminalExecutor {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ExecRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl CommandExecutor for TerminalExecutor {
    fn run(&self, pipeline: Vec<ShellCommand>) -> BoxFuture<'static, Result<()>> {
        let (reply, result) = oneshot::channel();
        let sent = self.tx.send(ExecRequest { pipeline, reply }).is_ok();
        async move {
            if !sent {
                anyhow::bail!("terminal is no longer available");
            }
            result.await.context("terminal dropped the command")?
        }
        .boxed()
    }
}

/// Runs `pipeline` with each stdout feeding the next stdin. The last
/// command writes to the inherited terminal.
pub async fn run_pipeline(pipeline: &[ShellCommand]) -> Result<()> {
    let mut children: Vec<(String, Child)> = Vec::with_capacity(pipeline.len());
    let mut previous_stdout: Option<Stdio> = None;

    for (index, command) in pipeline.iter().enumerate() {
        let is_last = index + 1 == pipeline.len();
        debug!("running {}", command.display());

        let mut process = TokioCommand::new(&command.program);
        process
            .args(&command.args)
            .envs(command.env.iter().map(|(key, value)| (key, value)))
            .stdin(previous_stdout.take().unwrap_or_else(Stdio::inherit))
            .stdout(if is_last {
                Stdio::inherit()
            } else {
                Stdio::piped()
            })
            .stderr(Stdio::inherit());

        let mut child = process
            .spawn()
            .with_context(|| format!("failed to run {}", command.program))?;
        if !is_last {
            let stdout = child
                .stdout
                .take()
                .with_context(|| format!("failed to capture output of {}", command.program))?;
            previous_stdout = Some(
                stdout
                    .try_into()
                    .with_context(|| format!("failed to pipe output of {}", command.program))?,
            );
        }
        children.push((command.program.clone(), child));
    }

    let mut failure: Option<(String, ExitStatus)> = None;
    for (program, mut child) in children {
        let status = child
            .wait()
            .await
            .with_context(|| format!("failed to wait for {program}"))?;
        if !status.success() && failure.is_none() {
            failure = Some((program, status));
        }
    }

    match failure {
        Some((program, status)) => Err(anyhow::anyhow!("{program} exited with {status}")),
        None => Ok(()),
    }
}

pub trait Clipboard: Send + Sync {
    fn copy(&self, text: &str) -> Result<()>;
}

/// The desktop clipboard.
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new().context("clipboard unavailable")?;
        clipboard
            .set_text(text.to_string())
            .context("failed to copy to clipboard")?;
        Ok(())
    }
}
