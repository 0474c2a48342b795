use crate::config::PipelineConfig;
use crate::domain::payout::{PayoutRecord, PayoutStatus};
use crate::domain::ports::{NoticeKind, NotifierRef, PayoutServiceRef};
use crate::error::{PollError, ServiceError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Follows a payout until it settles.
#[derive(Clone)]
pub struct PayoutPoller {
    service: PayoutServiceRef,
    interval: Duration,
    max_consecutive_errors: Option<u32>,
    notifier: Option<NotifierRef>,
}

impl PayoutPoller {
    pub fn new(service: PayoutServiceRef, interval: Duration) -> Self {
        Self {
            service,
            interval,
            max_consecutive_errors: None,
            notifier: None,
        }
    }

    pub fn from_config(service: PayoutServiceRef, config: &PipelineConfig) -> Self {
        Self::new(service, config.poll_interval)
            .with_error_ceiling(config.max_consecutive_poll_errors)
    }

    /// Gives up after `limit` consecutive failed fetches. `None` never does.
    pub fn with_error_ceiling(mut self, limit: Option<u32>) -> Self {
        self.max_consecutive_errors = limit;
        self
    }

    /// Settlement and give-up notices go to `notifier`.
    pub fn with_notifier(mut self, notifier: NotifierRef) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Fetches the payout right away, then again one interval after each
    /// response while it is still `pending` or `processing`. At most one
    /// fetch is outstanding at a time.
    pub fn poll(&self, payout_id: impl Into<String>) -> PollingSession {
        let payout_id = payout_id.into();
        let (records_tx, records) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(None);
        info!(payout_id = %payout_id, interval = ?self.interval, "payout polling started");

        let task = tokio::spawn(poll_loop(
            self.clone(),
            payout_id.clone(),
            records_tx,
            status_tx,
        ));
        PollingSession {
            payout_id,
            records,
            status,
            failure: None,
            task,
        }
    }

    fn notify(&self, kind: NoticeKind, title: &str, message: &str) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(kind, title, message);
        }
    }
}

#[derive(Debug)]
enum PollMessage {
    Record(PayoutRecord),
    GaveUp(PollError),
}

/// A live status subscription for one payout.
///
/// Yields records in the order they were observed and ends after the first
/// terminal one. Cancelling, or dropping the session, stops the timer and
/// aborts any fetch still in flight.
pub struct PollingSession {
    payout_id: String,
    records: mpsc::UnboundedReceiver<PollMessage>,
    status: watch::Receiver<Option<PayoutStatus>>,
    failure: Option<PollError>,
    task: JoinHandle<()>,
}

impl PollingSession {
    pub fn payout_id(&self) -> &str {
        &self.payout_id
    }

    /// The last status observed, if any fetch has succeeded yet.
    pub fn status(&self) -> Option<PayoutStatus> {
        *self.status.borrow()
    }

    /// The next observed record, or `None` once polling has ended.
    pub async fn next(&mut self) -> Option<PayoutRecord> {
        match self.records.recv().await? {
            PollMessage::Record(record) => Some(record),
            PollMessage::GaveUp(err) => {
                self.failure = Some(err);
                None
            }
        }
    }

    /// Why polling ended early, if it gave up.
    pub fn failure(&self) -> Option<&PollError> {
        self.failure.as_ref()
    }

    /// Drains the session and returns the terminal record.
    pub async fn wait_terminal(mut self) -> Result<PayoutRecord, PollError> {
        let mut last = None;
        while let Some(record) = self.next().await {
            last = Some(record);
        }
        if let Some(err) = self.failure.take() {
            return Err(err);
        }
        last.filter(|record| record.status.is_terminal())
            .ok_or_else(|| PollError::Interrupted {
                payout_id: self.payout_id.clone(),
            })
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops polling. Safe to call any number of times.
    pub fn cancel(&self) {
        if !self.task.is_finished() {
            info!(payout_id = %self.payout_id, "payout polling cancelled");
        }
        self.task.abort();
    }
}

impl Drop for PollingSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn poll_loop(
    poller: PayoutPoller,
    payout_id: String,
    records: mpsc::UnboundedSender<PollMessage>,
    status: watch::Sender<Option<PayoutStatus>>,
) {
    let interval = poller.interval.max(Duration::from_millis(1));
    // Fixed delay: the next fetch is due one interval after the previous
    // response, never while a fetch is still outstanding.
    let next_fetch = tokio::time::sleep(Duration::ZERO);
    tokio::pin!(next_fetch);
    let mut armed = true;
    // Dropping the set aborts whatever is still in flight.
    let mut in_flight: JoinSet<(u64, Result<PayoutRecord, ServiceError>)> = JoinSet::new();
    let mut issued: u64 = 0;
    let mut applied: u64 = 0;
    let mut consecutive_errors: u32 = 0;

    loop {
        tokio::select! {
            biased;

            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if in_flight.is_empty() {
                    next_fetch.as_mut().reset(Instant::now() + interval);
                    armed = true;
                }
                let Ok((seq, response)) = joined else {
                    continue;
                };
                if seq <= applied {
                    debug!(payout_id = %payout_id, seq, applied, "stale payout response discarded");
                    continue;
                }
                match response {
                    Ok(record) => {
                        applied = seq;
                        consecutive_errors = 0;
                        status.send_replace(Some(record.status));
                        debug!(payout_id = %payout_id, seq, status = %record.status, "payout status observed");

                        if record.status.is_terminal() {
                            in_flight.abort_all();
                            info!(payout_id = %payout_id, status = %record.status, fetches = issued, "payout settled");
                            announce_settlement(&poller, &record);
                            let _ = records.send(PollMessage::Record(record));
                            return;
                        }
                        if records.send(PollMessage::Record(record)).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        consecutive_errors += 1;
                        warn!(payout_id = %payout_id, seq, error = %err, consecutive_errors, "payout status fetch failed");
                        if let Some(limit) = poller.max_consecutive_errors
                            && consecutive_errors >= limit
                        {
                            poller.notify(
                                NoticeKind::Error,
                                "Payout status unavailable",
                                "We could not refresh your payout status. Please check again later.",
                            );
                            let _ = records.send(PollMessage::GaveUp(PollError::TooManyFailures {
                                payout_id: payout_id.clone(),
                                failures: consecutive_errors,
                                last: err,
                            }));
                            return;
                        }
                    }
                }
            }

            () = &mut next_fetch, if armed && in_flight.is_empty() => {
                armed = false;
                issued += 1;
                let seq = issued;
                let service = Arc::clone(&poller.service);
                let id = payout_id.clone();
                debug!(payout_id = %payout_id, seq, "fetching payout status");
                in_flight.spawn(async move { (seq, service.get_payout(&id).await) });
            }
        }
    }
}

fn announce_settlement(poller: &PayoutPoller, record: &PayoutRecord) {
    match record.status {
        PayoutStatus::Completed => poller.notify(
            NoticeKind::Success,
            "Payout completed",
            &format!("{} was sent via {}.", record.amount, record.payout_method),
        ),
        PayoutStatus::Failed => poller.notify(
            NoticeKind::Error,
            "Payout failed",
            record
                .admin_note
                .as_deref()
                .unwrap_or("The payout could not be completed."),
        ),
        PayoutStatus::Pending | PayoutStatus::Processing => {}
    }
}
