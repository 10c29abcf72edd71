mod app;
mod cli;
mod config;
mod controller;
mod exec;
mod input;
mod k8s;
mod list_table;
mod menu;
mod model;
mod status;
mod table;
#[cfg(test)]
mod testing;
mod ui;
mod watch;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use cli::CliArgs;
use config::RuntimeConfig;
use controller::ViewContext;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEventKind,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use exec::{CommandBuilder, ExecRequest, SystemClipboard, TerminalExecutor};
use futures::StreamExt;
use k8s::{ClientConfig, KubeGateway};
use model::{NamespaceScope, ResourceType, TableFormat};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use status::{StatusChannel, StatusEvent, StatusLevel};
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use watch::ViewBatch;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

struct LoopChannels {
    batches: mpsc::UnboundedReceiver<ViewBatch>,
    status: mpsc::UnboundedReceiver<StatusEvent>,
    exec: mpsc::UnboundedReceiver<ExecRequest>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let config = RuntimeConfig::load(args.config.as_deref())?;
    if let Some(source) = &config.source {
        info!("loaded config from {}", source.display());
    }

    let client_config = ClientConfig {
        kubeconfig: args.kubeconfig.clone(),
        context: args.context.clone(),
    };
    let gateway = KubeGateway::connect(&client_config).await?;
    let scope = resolve_namespace_scope(&args, &gateway);
    if args.all_namespaces && args.namespace.is_some() {
        warn!("both --all-namespaces and --namespace were provided, using all namespaces");
    }
    let resource = resolve_resource(&args, &config)?;

    let (status, status_rx) = StatusChannel::new();
    let (executor, exec_rx) = TerminalExecutor::new();
    let (batch_tx, batch_rx) = mpsc::unbounded_channel();
    let view_context = ViewContext {
        client: Arc::new(gateway.clone()),
        status: Arc::new(status),
        executor: Arc::new(executor),
        clipboard: Arc::new(SystemClipboard),
        commands: CommandBuilder::new(&config, &client_config),
        policy: config.restart_policy(),
        batches: batch_tx,
    };

    let mut app = App::new(
        gateway.cluster().to_string(),
        gateway.context().to_string(),
        scope,
        resource,
        TableFormat::default().with_columns(config.columns),
        view_context,
    );
    app.start();

    run(
        &mut app,
        LoopChannels {
            batches: batch_rx,
            status: status_rx,
            exec: exec_rx,
        },
    )
    .await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    // The terminal belongs to the UI, so logs go to a file or nowhere.
    let writer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(io::sink),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(log_file.is_none())
        .compact()
        .with_writer(writer)
        .try_init();

    Ok(())
}

fn resolve_namespace_scope(args: &CliArgs, gateway: &KubeGateway) -> NamespaceScope {
    if args.all_namespaces {
        NamespaceScope::All
    } else if let Some(namespace) = &args.namespace {
        NamespaceScope::Named(namespace.clone())
    } else {
        NamespaceScope::Named(gateway.default_namespace().to_string())
    }
}

fn resolve_resource(args: &CliArgs, config: &RuntimeConfig) -> Result<ResourceType> {
    match &args.resource {
        Some(token) => ResourceType::from_token(token)
            .with_context(|| format!("unknown resource type '{token}'")),
        None => Ok(config.default_resource.unwrap_or(ResourceType::Pods)),
    }
}

async fn run(app: &mut App, channels: LoopChannels) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, channels).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableMouseCapture,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
            .context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )
    .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(terminal: &mut TuiTerminal, app: &mut App, mut channels: LoopChannels) -> Result<()> {
    let mut reader = EventStream::new();

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key) {
                            debug!("action={action:?}");
                            app.apply_action(action);
                        }
                    }
                    Some(Ok(Event::Mouse(mouse))) => {
                        if let Some(action) = input::map_mouse(mouse) {
                            app.apply_mouse(action);
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(StatusLevel::Error, format!("terminal event error: {error}"));
                    }
                    None => {
                        warn!("terminal event stream closed");
                        break;
                    }
                }
            }
            Some(batch) = channels.batches.recv() => {
                app.apply_batch(batch);
                while let Ok(batch) = channels.batches.try_recv() {
                    app.apply_batch(batch);
                }
            }
            Some(event) = channels.status.recv() => {
                app.apply_status(event);
            }
            Some(request) = channels.exec.recv() => {
                let result = run_in_terminal(terminal, &request.pipeline).await;
                if let Err(error) = &result {
                    debug!("subprocess failed: {error:#}");
                }
                let _ = request.reply.send(result);
            }
        }
    }

    Ok(())
}

async fn run_in_terminal(terminal: &mut TuiTerminal, pipeline: &[exec::ShellCommand]) -> Result<()> {
    suspend_terminal_for_subprocess(terminal)?;
    let run_result = exec::run_pipeline(pipeline).await;
    let restore_result = resume_terminal_after_subprocess(terminal);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal resume error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn suspend_terminal_for_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode for subprocess")?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )
    .context("failed to leave alternate screen for subprocess")?;
    terminal
        .show_cursor()
        .context("failed to show cursor for subprocess")?;
    Ok(())
}

fn resume_terminal_after_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    enable_raw_mode().context("failed to re-enable raw mode after subprocess")?;
    execute!(
        terminal.backend_mut(),
        EnterAlternateScreen,
        EnableMouseCapture
    )
    .context("failed to re-enter alternate screen after subprocess")?;
    terminal
        .clear()
        .context("failed to clear terminal after subprocess")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::resolve_resource;
    use crate::cli::CliArgs;
    use crate::config::RuntimeConfig;
    use crate::model::ResourceType;
    use clap::Parser;

    #[test]
    fn resource_flag_beats_config_default() {
        let config = RuntimeConfig {
            default_resource: Some(ResourceType::Services),
            ..RuntimeConfig::default()
        };
        let args = CliArgs::try_parse_from(["kubedeck", "-r", "deploy"]).expect("args");
        assert_eq!(
            resolve_resource(&args, &config).expect("resource"),
            ResourceType::Deployments
        );

        let args = CliArgs::try_parse_from(["kubedeck"]).expect("args");
        assert_eq!(
            resolve_resource(&args, &config).expect("resource"),
            ResourceType::Services
        );
        assert_eq!(
            resolve_resource(&args, &RuntimeConfig::default()).expect("resource"),
            ResourceType::Pods
        );
    }

    #[test]
    fn unknown_resource_flag_is_rejected() {
        let args = CliArgs::try_parse_from(["kubedeck", "-r", "widgets"]).expect("args");
        let error = resolve_resource(&args, &RuntimeConfig::default()).expect_err("unknown");
        assert!(error.to_string().contains("widgets"));
    }
}
