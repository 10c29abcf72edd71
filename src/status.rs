use chrono::{DateTime, Local};
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// Where background tasks report progress, failures and yes/no questions.
pub trait StatusReporter: Send + Sync {
    fn info(&self, message: String);
    fn error(&self, error: &anyhow::Error);
    /// Resolves to `true` only when the user explicitly confirms.
    fn confirm(&self, prompt: String) -> BoxFuture<'static, bool>;
}

#[derive(Debug)]
pub enum StatusEvent {
    Info(String),
    Error(String),
    Confirm {
        prompt: String,
        reply: oneshot::Sender<bool>,
    },
}

/// Forwards status traffic to the UI loop.
#[derive(Clone)]
pub struct StatusChannel {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl StatusChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StatusReporter for StatusChannel {
    fn info(&self, message: String) {
        let _ = self.tx.send(StatusEvent::Info(message));
    }

    fn error(&self, error: &anyhow::Error) {
        warn!("{error:#}");
        let _ = self.tx.send(StatusEvent::Error(compact_error(error)));
    }

    fn confirm(&self, prompt: String) -> BoxFuture<'static, bool> {
        let (reply, answer) = oneshot::channel();
        let sent = self.tx.send(StatusEvent::Confirm { prompt, reply }).is_ok();
        async move {
            if !sent {
                return false;
            }
            answer.await.unwrap_or(false)
        }
        .boxed()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StatusLevel {
    Info,
    Error,
    Prompt,
}

/// The footer's current message.
#[derive(Debug, Clone)]
pub struct StatusLine {
    pub message: String,
    pub level: StatusLevel,
    pub at: DateTime<Local>,
}

impl StatusLine {
    pub fn new(level: StatusLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            at: Local::now(),
        }
    }
}

/// First error plus at most two causes, one per line.
pub fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("\n")
}
