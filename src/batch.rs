use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::notifications::NotificationService;
use crate::producers::{Producer, RunContext};
use crate::report::ReportEmitter;
use crate::source::RecordStore;

/// Outcome of one batch invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub run_id: Uuid,
    /// Producers attempted
    pub run: usize,
    /// Names of the producers that failed
    pub failed: Vec<String>,
    /// Reports whose content changed
    pub changed: Vec<String>,
}

impl BatchSummary {
    pub fn message(&self) -> String {
        format!("Ran {} scrapers successfully.", self.run)
    }
}

/// Runs the registered producers in order, isolating their failures
pub struct BatchRunner {
    producers: Vec<Producer>,
    notifications: NotificationService,
}

impl BatchRunner {
    pub fn new(notifications: NotificationService) -> Self {
        Self::with_producers(Producer::ALL.to_vec(), notifications)
    }

    pub fn with_producers(producers: Vec<Producer>, notifications: NotificationService) -> Self {
        Self {
            producers,
            notifications,
        }
    }

    pub async fn run<S: RecordStore, E: ReportEmitter>(
        &self,
        ctx: &mut RunContext<S, E>,
    ) -> BatchSummary {
        let run_id = Uuid::new_v4();
        let mut summary = BatchSummary {
            run_id,
            run: 0,
            failed: Vec::new(),
            changed: Vec::new(),
        };

        info!(run_id = %run_id, producers = self.producers.len(), "Starting batch");

        for producer in &self.producers {
            summary.run += 1;

            let result = {
                let _span = info_span!("producer", run_id = %run_id, name = producer.name())
                    .entered();
                producer.run(ctx)
            };

            match result {
                Ok(changed) => {
                    info!(
                        producer = producer.name(),
                        changed = changed.len(),
                        "Producer finished"
                    );
                    if let Err(e) = self
                        .notifications
                        .notify_changed(producer.name(), &changed)
                        .await
                    {
                        warn!(error = %e, "Failed to send change notification");
                    }
                    summary.changed.extend(changed);
                }
                Err(e) => {
                    error!(
                        producer = producer.name(),
                        error = %format!("{:#}", e),
                        "Producer failed"
                    );
                    if let Err(notify_err) = self
                        .notifications
                        .notify_failure(producer.name(), &e)
                        .await
                    {
                        warn!(error = %notify_err, "Failed to send failure notification");
                    }
                    summary.failed.push(producer.name().to_string());
                }
            }
        }

        info!(
            run_id = %run_id,
            run = summary.run,
            failed = summary.failed.len(),
            changed = summary.changed.len(),
            "Batch complete"
        );

        summary
    }
}
