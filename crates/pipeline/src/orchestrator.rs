//! Runs the entity pipelines against a warehouse.
//!
//! Every family run opens its own warehouse handle through the
//! [`Connector`] and drops it when the run ends, whatever the outcome.
//! Families are independent: one failing never stops the others.

use std::sync::Arc;
use std::time::Instant;

use metrics_core::{bucket_events, Connector, Error, EventSource, Result, TableSink};
use telemetry::metrics;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::family::EntityFamily;

/// Outcome of one family run.
#[derive(Debug)]
pub struct RunReport {
    pub family: EntityFamily,
    pub run_id: Uuid,
    /// Records returned by the extract
    pub fetched: usize,
    /// Records excluded while bucketing
    pub malformed: u64,
    /// Published table, qualified with its namespace
    pub table: Option<String>,
    pub published_rows: usize,
    pub suppressed_rows: usize,
    pub elapsed_ms: u64,
    pub error: Option<Error>,
}

impl RunReport {
    fn new(family: EntityFamily, run_id: Uuid) -> Self {
        Self {
            family,
            run_id,
            fetched: 0,
            malformed: 0,
            table: None,
            published_rows: 0,
            suppressed_rows: 0,
            elapsed_ms: 0,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs the enabled families.
pub struct Orchestrator<C> {
    connector: Arc<C>,
    config: Arc<PipelineConfig>,
}

impl<C> Orchestrator<C>
where
    C: Connector + 'static,
    C::Warehouse: 'static,
{
    pub fn new(connector: C, config: PipelineConfig) -> Self {
        Self {
            connector: Arc::new(connector),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs every enabled family once and returns their reports in
    /// configuration order.
    pub async fn run_all(&self) -> Vec<RunReport> {
        let families = self.config.enabled_families();
        info!(
            families = ?families,
            parallel = self.config.parallel,
            namespace = %self.config.output_namespace,
            "Starting pipeline run"
        );

        let reports = if self.config.parallel {
            self.run_parallel(&families).await
        } else {
            let mut reports = Vec::with_capacity(families.len());
            for family in &families {
                reports.push(self.run_family(*family).await);
            }
            reports
        };

        let failed = reports.iter().filter(|r| !r.is_success()).count();
        let snapshot = metrics().snapshot();
        info!(
            succeeded = reports.len() - failed,
            failed = failed,
            events_fetched = snapshot.events_fetched,
            events_malformed = snapshot.events_malformed,
            malformed_ratio = snapshot.malformed_ratio(),
            rows_published = snapshot.rows_published,
            rows_suppressed = snapshot.rows_suppressed,
            "Pipeline run finished"
        );

        reports
    }

    async fn run_parallel(&self, families: &[EntityFamily]) -> Vec<RunReport> {
        let handles: Vec<_> = families
            .iter()
            .map(|&family| {
                let connector = self.connector.clone();
                let config = self.config.clone();
                (
                    family,
                    tokio::spawn(async move { run_family(&*connector, &config, family).await }),
                )
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for (family, handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    error!(family = %family, "Family task aborted: {}", e);
                    metrics().families_failed.inc();
                    let mut report = RunReport::new(family, Uuid::new_v4());
                    report.error = Some(Error::internal(format!("task aborted: {}", e)));
                    report
                }
            };
            reports.push(report);
        }
        reports
    }

    /// Runs a single family.
    pub async fn run_family(&self, family: EntityFamily) -> RunReport {
        run_family(&*self.connector, &self.config, family).await
    }
}

async fn run_family<C: Connector>(
    connector: &C,
    config: &PipelineConfig,
    family: EntityFamily,
) -> RunReport {
    let run_id = Uuid::new_v4();
    let span = info_span!("family_run", family = %family, run_id = %run_id);

    async move {
        let start = Instant::now();
        let mut report = RunReport::new(family, run_id);

        match execute(connector, config, family, &mut report).await {
            Ok(()) => {
                metrics().families_succeeded.inc();
                info!(
                    table = report.table.as_deref().unwrap_or_default(),
                    rows = report.published_rows,
                    suppressed = report.suppressed_rows,
                    "Family published"
                );
            }
            Err(e) => {
                metrics().families_failed.inc();
                error!(code = e.error_code(), "Family run failed: {}", e);
                report.error = Some(e);
            }
        }

        report.elapsed_ms = start.elapsed().as_millis() as u64;
        report
    }
    .instrument(span)
    .await
}

async fn execute<C: Connector>(
    connector: &C,
    config: &PipelineConfig,
    family: EntityFamily,
    report: &mut RunReport,
) -> Result<()> {
    let warehouse = connector.connect()?;

    let records = match warehouse.fetch(family.source_query()).await {
        Ok(records) => records,
        Err(e) => {
            metrics().fetch_errors.inc();
            return Err(e);
        }
    };
    if records.is_empty() {
        metrics().fetch_errors.inc();
        return Err(Error::source_unavailable(format!(
            "{} returned no rows",
            family.source_query().name()
        )));
    }
    report.fetched = records.len();
    metrics().events_fetched.inc_by(records.len() as u64);

    let bucketed = bucket_events(records);
    let malformed = bucketed.malformed;
    report.malformed = malformed.total();
    if malformed.total() > 0 {
        metrics().events_malformed.inc_by(malformed.total());
        warn!(
            malformed = malformed.total(),
            missing_timestamp = malformed.missing_timestamp,
            missing_user = malformed.missing_user,
            missing_offer = malformed.missing_offer,
            "Excluded malformed records"
        );
    }

    let output = family.build(&bucketed.events, &config.rule(family))?;
    report.suppressed_rows = output.suppressed;
    metrics().rows_suppressed.inc_by(output.suppressed as u64);

    let published = match warehouse
        .publish(family.table_name(), &config.output_namespace, &output.table)
        .await
    {
        Ok(published) => published,
        Err(e) => {
            metrics().publish_errors.inc();
            return Err(e);
        }
    };
    metrics().tables_published.inc();
    metrics().rows_published.inc_by(published.rows_written as u64);

    report.published_rows = published.rows_written;
    report.table = Some(published.table);
    Ok(())
}
