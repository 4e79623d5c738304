use crate::config::Config;
use crate::shared::{build_pipeline, finish_run, RunOutcome};
use async_trait::async_trait;
use choam_domain::errors::EngineError;
use choam_domain::repositories::artifacts::ArtifactWriter;
use choam_domain::repositories::bar_source::BarSource;
use choam_domain::repositories::execution::ExecutionSink;
use choam_domain::value_objects::bar::Bar;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Instant;
use tracing::{info_span, Instrument, Span};

/// Wraps a live source so a shutdown request ends the stream like an exhausted feed.
pub struct UntilShutdown<'a, F> {
    inner: &'a mut dyn BarSource,
    shutdown: Pin<Box<F>>,
    stopped: bool,
    span: Span,
}

impl<'a, F> UntilShutdown<'a, F>
where
    F: Future<Output = ()> + Send,
{
    pub fn new(inner: &'a mut dyn BarSource, shutdown: F, span: Span) -> Self {
        Self {
            inner,
            shutdown: Box::pin(shutdown),
            stopped: false,
            span,
        }
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }
}

#[async_trait]
impl<F> BarSource for UntilShutdown<'_, F>
where
    F: Future<Output = ()> + Send,
{
    async fn next_bar(&mut self) -> Result<Option<Bar>, EngineError> {
        if self.stopped {
            return Ok(None);
        }
        tokio::select! {
            biased;
            _ = &mut self.shutdown => {
                self.stopped = true;
                self.span.in_scope(|| tracing::info!("shutdown requested; no further bars"));
                Ok(None)
            }
            next = self.inner.next_bar() => next,
        }
    }
}

/// Runs the pipeline against a live feed and sink until the feed fails, an execution fails,
/// or `shutdown` resolves. The report (partial on failure) is written either way.
pub async fn run_live<F>(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
    source: &mut dyn BarSource,
    sink: &mut dyn ExecutionSink,
    shutdown: F,
    artifacts: &dyn ArtifactWriter,
) -> Result<RunOutcome, String>
where
    F: Future<Output = ()> + Send,
{
    let span = info_span!(
        "run_live",
        run_id = %config.run.run_id,
        symbol = %config.run.symbol
    );

    let pipeline = build_pipeline(config, &span)?;
    let mut source = UntilShutdown::new(source, shutdown, info_span!(parent: &span, "shutdown"));

    let stage_start = Instant::now();
    let result = pipeline
        .run(&mut source, sink)
        .instrument(span.clone())
        .await;
    metrics::histogram!("choam.live.session_ms").record(stage_start.elapsed().as_millis() as f64);

    span.in_scope(|| {
        tracing::info!(interrupted = source.stopped(), "live session ended");
        finish_run(config, config_toml, out, "live", result, artifacts)
    })
}
