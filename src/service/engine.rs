use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::channels::{EmailGateway, SmsGateway};
use crate::config::SchedulerConfig;
use crate::db::ReminderStorage;
use crate::error::MedminderError;
use crate::service::dispatcher::{DispatchOutcome, NotificationDispatcher};
use crate::service::ledger::DedupLedger;
use crate::service::scanner::{DueReminder, ReminderScanner};

/// Counts for one scan+dispatch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub scanned: usize,
    pub sent: usize,
    pub skipped_duplicate: usize,
    pub partial_failure: usize,
    pub failed_sends: usize,
    /// Sent but not recorded; retried next tick.
    pub ledger_failures: usize,
    /// Failed before sending (ledger lookup); retried next tick.
    pub dispatch_errors: usize,
}

impl TickSummary {
    fn absorb(&mut self, outcome: &Result<DispatchOutcome, MedminderError>) {
        match outcome {
            Ok(DispatchOutcome::Sent) => self.sent += 1,
            Ok(DispatchOutcome::SkippedDuplicate) => self.skipped_duplicate += 1,
            Ok(DispatchOutcome::PartialFailure(failures)) => {
                self.partial_failure += 1;
                self.failed_sends += failures.len();
            }
            Err(MedminderError::LedgerWrite(_)) => self.ledger_failures += 1,
            Err(_) => self.dispatch_errors += 1,
        }
    }
}

/// One scan+dispatch cycle. Shared by the scheduler and the manual trigger.
pub struct ReminderEngine {
    scanner: ReminderScanner,
    dispatcher: NotificationDispatcher,
}

impl ReminderEngine {
    pub fn new(scanner: ReminderScanner, dispatcher: NotificationDispatcher) -> Self {
        Self {
            scanner,
            dispatcher,
        }
    }

    /// Wire scanner, ledger and dispatcher over one storage handle.
    pub fn build(
        storage: ReminderStorage,
        sms: Arc<dyn SmsGateway>,
        email: Arc<dyn EmailGateway>,
        cfg: &SchedulerConfig,
    ) -> Self {
        let scanner = ReminderScanner::new(storage.clone(), cfg.recurrence);
        let ledger = DedupLedger::new(storage);
        let dispatcher = NotificationDispatcher::new(ledger, sms, email, cfg.send_timeout());
        Self::new(scanner, dispatcher)
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    pub async fn run_cycle(&self) -> Result<TickSummary, MedminderError> {
        self.run_cycle_at(Local::now().naive_local()).await
    }

    /// Scan failures abort the cycle; everything after the scan is contained per reminder.
    pub async fn run_cycle_at(&self, now: NaiveDateTime) -> Result<TickSummary, MedminderError> {
        let started = Instant::now();
        let due = self.scanner.scan_at(now).await.inspect_err(|e| {
            error!(error = %e, "scan failed; cycle aborted");
        })?;

        let mut summary = TickSummary {
            scanned: due.len(),
            ..Default::default()
        };
        for reminder in &due {
            let outcome = self.dispatcher.dispatch(reminder).await;
            log_dispatch_error(reminder, &outcome);
            summary.absorb(&outcome);
        }

        info!(
            scanned = summary.scanned,
            sent = summary.sent,
            skipped = summary.skipped_duplicate,
            partial = summary.partial_failure,
            failed_sends = summary.failed_sends,
            ledger_failures = summary.ledger_failures,
            dispatch_errors = summary.dispatch_errors,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "reminder cycle finished"
        );
        Ok(summary)
    }
}

fn log_dispatch_error(reminder: &DueReminder, outcome: &Result<DispatchOutcome, MedminderError>) {
    match outcome {
        Err(e @ MedminderError::LedgerWrite(_)) => error!(
            med_id = reminder.medication_id,
            ledger_key = %reminder.ledger_key,
            error = %e,
            "reminder sent but not recorded; will retry next tick"
        ),
        Err(e) => error!(
            med_id = reminder.medication_id,
            ledger_key = %reminder.ledger_key,
            error = %e,
            "ledger lookup failed; nothing sent, will retry next tick"
        ),
        Ok(_) => {}
    }
}
