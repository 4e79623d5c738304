use super::common::{broker_settings, load_run_config, print_config_summary};
use choam_application::live_trading::run_live;
use choam_application::reporting::render_summary_text;
use choam_infrastructure::artifacts::FilesystemArtifactWriter;
use choam_infrastructure::broker::BrokerSession;
use std::path::PathBuf;
use tracing::info_span;

pub fn run(
    config_path: PathBuf,
    env_path: Option<PathBuf>,
    symbol: Option<String>,
    out: Option<PathBuf>,
) -> Result<(), String> {
    let loaded = load_run_config(&config_path, env_path.as_deref(), |config| {
        if let Some(symbol) = symbol {
            config.run.symbol = symbol;
        }
    })?;
    let config = &loaded.config;
    print_config_summary("live", config, out.as_ref());
    let (settings, policy) = broker_settings(config)?;
    let artifacts = FilesystemArtifactWriter::new();

    super::runtime()?.block_on(async {
        let span = info_span!("broker", symbol = %config.run.symbol);
        let session = BrokerSession::connect(settings, &policy, &span).await?;
        let mut feed = session.bar_feed(info_span!(parent: &span, "bar_feed"))?;
        let mut sink = session.execution_sink(info_span!(parent: &span, "execution_sink"))?;

        let outcome = run_live(
            config,
            &loaded.snapshot_toml,
            out,
            &mut feed,
            &mut sink,
            shutdown_signal(),
            &artifacts,
        )
        .await?;

        print!("{}", render_summary_text(&outcome.report));
        println!("artifacts: {}", outcome.run_dir.display());
        Ok::<(), String>(())
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to install Ctrl-C handler; run until the feed fails");
        std::future::pending::<()>().await;
    }
}
