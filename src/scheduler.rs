//! Cron-driven trigger for ingestion runs.

use crate::processing::{IngestionOrchestrator, RunError};
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building a scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The cron expression could not be parsed.
    #[error("Invalid schedule expression '{expression}': {reason}")]
    InvalidExpression {
        /// Expression as supplied by the operator.
        expression: String,
        /// Parser diagnostic.
        reason: String,
    },
}

/// Fires [`IngestionOrchestrator::run`] on a cron cadence.
///
/// Each tick runs on its own task so the cadence does not drift with run duration; when a run
/// outlasts the interval the orchestrator's single-flight guard turns the next tick away.
pub struct Scheduler {
    expression: String,
    schedule: Schedule,
    orchestrator: Arc<IngestionOrchestrator>,
}

impl Scheduler {
    /// Parse `expression` and bind it to the orchestrator.
    ///
    /// Classic five-field crontab expressions are accepted and run at second zero.
    pub fn new(
        expression: &str,
        orchestrator: Arc<IngestionOrchestrator>,
    ) -> Result<Self, SchedulerError> {
        let expression = normalize_expression(expression);
        let schedule =
            Schedule::from_str(&expression).map_err(|error| SchedulerError::InvalidExpression {
                expression: expression.clone(),
                reason: error.to_string(),
            })?;

        Ok(Self {
            expression,
            schedule,
            orchestrator,
        })
    }

    /// Normalized cron expression in use.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`.
    pub fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Fire on schedule until `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!(schedule = %self.expression, "Scheduler started");

        loop {
            let now = Utc::now();
            let Some(next) = self.next_fire_after(now) else {
                tracing::warn!(schedule = %self.expression, "Schedule has no upcoming fire times");
                shutdown.await;
                return;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            tracing::info!(next_run = %next.to_rfc3339(), "Next ingestion run scheduled");

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Scheduler stopping");
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            let orchestrator = Arc::clone(&self.orchestrator);
            tokio::spawn(async move { fire(&orchestrator).await });
        }
    }
}

/// Run one scheduled ingestion and log its outcome.
pub async fn fire(orchestrator: &IngestionOrchestrator) {
    match orchestrator.run().await {
        Ok(report) => tracing::info!(
            listed = report.documents_listed,
            upserted = report.records_upserted.len(),
            skipped = report.skipped.len(),
            "Scheduled ingestion run finished"
        ),
        Err(RunError::AlreadyRunning) => {
            tracing::warn!("Previous ingestion run still in progress; skipping this tick")
        }
    }
}

fn normalize_expression(expression: &str) -> String {
    let trimmed = expression.split_whitespace().collect::<Vec<_>>();
    if trimmed.len() == 5 {
        format!("0 {}", trimmed.join(" "))
    } else {
        trimmed.join(" ")
    }
}
