mod commands;
mod obs;

use clap::{Parser, Subcommand};
use commands::Command;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "choam")]
#[command(about = "Choam SMA crossover trader", version, arg_required_else_help = true)]
#[command(
    after_help = "Examples:\n  choam backtest --config configs/sample.toml --file data/spy.csv --out runs/\n  choam live --config configs/sample.toml --env .env --symbol TQQQ\n  choam validate --config configs/sample.toml --strict\n"
)]
struct Cli {
    /// Log level or filter directive; `CHOAM_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// text | json
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
    /// Serve Prometheus metrics on host:port.
    #[arg(long, global = true)]
    metrics_addr: Option<String>,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Replay historical bars through the strategy.
    Backtest {
        #[arg(long)]
        config: PathBuf,
        /// Dotenv file loaded before `CHOAM_*` overrides are applied.
        #[arg(long)]
        env: Option<PathBuf>,
        /// Bars CSV; overrides `paths.data_path`.
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Trade live bars from the broker gateway until Ctrl-C.
    Live {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        env: Option<PathBuf>,
        /// Overrides `run.symbol`.
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check the configuration and, if configured, the historical bars.
    Validate {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        env: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = obs::init_tracing(&cli.log_level, &cli.log_format) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
    if let Err(err) = obs::init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }

    let command = match cli.command {
        CliCommand::Backtest {
            config,
            env,
            file,
            out,
        } => Command::Backtest {
            config,
            env,
            file,
            out,
        },
        CliCommand::Live {
            config,
            env,
            symbol,
            out,
        } => Command::Live {
            config,
            env,
            symbol,
            out,
        },
        CliCommand::Validate {
            config,
            env,
            strict,
        } => Command::Validate {
            config,
            env,
            strict,
        },
    };

    if let Err(err) = commands::run(command) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
