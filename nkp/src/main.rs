use std::{env, process::ExitCode};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nkpkube::{
    kube_dir, launcher::SHELL_ENV, FuzzyPicker, KubeConnector, SessionLauncher, SessionMode,
    Settings, Shell,
};

#[derive(Parser, Debug)]
#[command(name = "nkp", version, about = "Work with NKP management and workload clusters")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to a NKP workload cluster
    #[command(
        long_about = "Connect to a NKP workload cluster by selecting a cluster and using the kubeconfig stored in a secret."
    )]
    Connect(ConnectArgs),
}

#[derive(Args, Debug)]
struct ConnectArgs {
    /// Copy kubeconfig to ~/.kube/config instead of launching a temporary shell
    #[arg(short, long)]
    permanent: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed arguments");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Starting async runtime")?;

    match cli.command {
        Command::Connect(args) => runtime.block_on(connect(args)),
    }
}

async fn connect(args: ConnectArgs) -> anyhow::Result<()> {
    let kube_dir = kube_dir()?;
    let settings = Settings::load(&kube_dir)?;
    let shell = Shell::resolve(env::var_os(SHELL_ENV), &settings.fallback_shell);
    let launcher = SessionLauncher::new(&kube_dir, shell);

    nkpkube::connect(
        &settings,
        &KubeConnector,
        &mut FuzzyPicker::default(),
        &launcher,
        SessionMode::from_permanent(args.permanent),
    )
    .await?;

    Ok(())
}
