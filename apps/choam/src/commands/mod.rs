mod backtest;
mod common;
mod live;
mod validate;

use std::path::PathBuf;

pub enum Command {
    Backtest {
        config: PathBuf,
        env: Option<PathBuf>,
        file: Option<PathBuf>,
        out: Option<PathBuf>,
    },
    Live {
        config: PathBuf,
        env: Option<PathBuf>,
        symbol: Option<String>,
        out: Option<PathBuf>,
    },
    Validate {
        config: PathBuf,
        env: Option<PathBuf>,
        strict: bool,
    },
}

pub fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Backtest {
            config,
            env,
            file,
            out,
        } => backtest::run(config, env, file, out),
        Command::Live {
            config,
            env,
            symbol,
            out,
        } => live::run(config, env, symbol, out),
        Command::Validate {
            config,
            env,
            strict,
        } => validate::run(config, env, strict),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("unable to start async runtime: {err}"))
}
