use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "kubedeck",
    version,
    about = "Live Kubernetes resource tables in the terminal."
)]
pub struct CliArgs {
    /// Start in a specific namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Start with all namespaces selected
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,

    /// Path to a kubeconfig file
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,

    /// Initial resource type (pods, deploy, svc, ...)
    #[arg(short, long)]
    pub resource: Option<String>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Append logs to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Runtime config file (defaults to discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn short_flags_parse() {
        let args = CliArgs::try_parse_from(["kubedeck", "-n", "kube-system", "-r", "deploy"])
            .expect("args");
        assert_eq!(args.namespace.as_deref(), Some("kube-system"));
        assert_eq!(args.resource.as_deref(), Some("deploy"));
        assert!(!args.all_namespaces);
        assert_eq!(args.log_filter, "info");
    }

    #[test]
    fn cluster_selection_flags_parse() {
        let args = CliArgs::try_parse_from([
            "kubedeck",
            "-A",
            "--kubeconfig",
            "/tmp/kubeconfig",
            "--context",
            "staging",
        ])
        .expect("args");
        assert!(args.all_namespaces);
        assert_eq!(args.context.as_deref(), Some("staging"));
        assert_eq!(
            args.kubeconfig.as_deref().and_then(|path| path.to_str()),
            Some("/tmp/kubeconfig")
        );
    }
}
