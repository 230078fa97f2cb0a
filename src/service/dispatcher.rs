use futures::future::{BoxFuture, join_all};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::channels::{ChannelKind, EmailGateway, SmsGateway};
use crate::error::MedminderError;
use crate::service::ledger::{DedupLedger, RecordOutcome};
use crate::service::message;
use crate::service::scanner::DueReminder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Recipient {
    User,
    Caretaker,
}

/// One send that was rejected or timed out.
#[derive(Debug, Clone, Serialize)]
pub struct SendFailure {
    pub channel: ChannelKind,
    pub recipient: Recipient,
    pub address: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", content = "failures", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent,
    SkippedDuplicate,
    /// Recorded, but at least one send failed.
    PartialFailure(Vec<SendFailure>),
}

type LedgerSlot = (i64, String);

/// Runs check -> send -> record for one reminder at a time per ledger slot.
pub struct NotificationDispatcher {
    ledger: DedupLedger,
    sms: Arc<dyn SmsGateway>,
    email: Arc<dyn EmailGateway>,
    send_timeout: Duration,
    in_flight: Mutex<HashMap<LedgerSlot, Arc<AsyncMutex<()>>>>,
}

impl NotificationDispatcher {
    pub fn new(
        ledger: DedupLedger,
        sms: Arc<dyn SmsGateway>,
        email: Arc<dyn EmailGateway>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            sms,
            email,
            send_timeout,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub async fn dispatch(&self, due: &DueReminder) -> Result<DispatchOutcome, MedminderError> {
        let slot = (due.medication_id, due.ledger_key.clone());
        let lock = self.slot_lock(&slot);
        let result = {
            let _guard = lock.lock().await;
            self.dispatch_locked(due).await
        };
        drop(lock);
        self.release_slot(&slot);
        result
    }

    async fn dispatch_locked(&self, due: &DueReminder) -> Result<DispatchOutcome, MedminderError> {
        let med_id = due.medication_id;
        let ledger_key = due.ledger_key.as_str();

        if self.ledger.already_sent(med_id, ledger_key).await? {
            debug!(med_id, ledger_key, "already notified; skipping");
            return Ok(DispatchOutcome::SkippedDuplicate);
        }

        let failures = self.send_all(due).await;

        match self.ledger.record(med_id, ledger_key).await? {
            RecordOutcome::Inserted => {}
            RecordOutcome::AlreadyPresent => {
                warn!(med_id, ledger_key, "ledger row written by another dispatcher");
                return Ok(DispatchOutcome::SkippedDuplicate);
            }
        }

        if failures.is_empty() {
            info!(med_id, ledger_key, med_name = %due.med_name, "reminder sent");
            Ok(DispatchOutcome::Sent)
        } else {
            warn!(
                med_id,
                ledger_key,
                failed = failures.len(),
                "reminder recorded with failed sends"
            );
            Ok(DispatchOutcome::PartialFailure(failures))
        }
    }

    /// Issue every applicable send concurrently; none waits on a sibling.
    async fn send_all(&self, due: &DueReminder) -> Vec<SendFailure> {
        let text = message::user_reminder(&due.med_name, &due.dosage, &due.due_time);
        let caretaker_sms = message::caretaker_sms(&text);
        let caretaker_email = message::caretaker_email(&text);

        let mut sends: Vec<(ChannelKind, Recipient, &str, BoxFuture<'_, _>)> =
            Vec::with_capacity(4);
        sends.push((
            ChannelKind::Sms,
            Recipient::User,
            due.user_phone.as_str(),
            self.sms.send(&due.user_phone, &text),
        ));
        if let Some(phone) = due.caretaker_phone.as_deref() {
            sends.push((
                ChannelKind::Sms,
                Recipient::Caretaker,
                phone,
                self.sms.send(phone, &caretaker_sms),
            ));
        }
        sends.push((
            ChannelKind::Email,
            Recipient::User,
            due.user_email.as_str(),
            self.email.send(&due.user_email, message::USER_SUBJECT, &text),
        ));
        if let Some(email) = due.caretaker_email.as_deref() {
            sends.push((
                ChannelKind::Email,
                Recipient::Caretaker,
                email,
                self.email.send(email, message::CARETAKER_SUBJECT, &caretaker_email),
            ));
        }

        let attempts = sends.into_iter().map(|(channel, recipient, address, send)| {
            let timeout = self.send_timeout;
            async move {
                let result = match tokio::time::timeout(timeout, send).await {
                    Ok(result) => result,
                    Err(_) => Err(MedminderError::ChannelTimeout {
                        channel,
                        after: timeout,
                    }),
                };
                result.err().map(|e| {
                    warn!(
                        med_id = due.medication_id,
                        %channel,
                        ?recipient,
                        address,
                        error = %e,
                        "send failed"
                    );
                    SendFailure {
                        channel,
                        recipient,
                        address: address.to_string(),
                        reason: e.to_string(),
                    }
                })
            }
        });

        join_all(attempts).await.into_iter().flatten().collect()
    }

    fn slot_lock(&self, slot: &LedgerSlot) -> Arc<AsyncMutex<()>> {
        let mut map = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        map.entry(slot.clone()).or_default().clone()
    }

    fn release_slot(&self, slot: &LedgerSlot) {
        let mut map = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        if map.get(slot).is_some_and(|l| Arc::strong_count(l) == 1) {
            map.remove(slot);
        }
    }
}
