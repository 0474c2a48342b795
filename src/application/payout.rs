use crate::application::poller::{PayoutPoller, PollingSession};
use crate::domain::outcome::Amount;
use crate::domain::payout::PayoutRecord;
use crate::domain::ports::{NoticeKind, NotifierRef, PayoutServiceRef};
use crate::error::Result;
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Requests a payout and hands the new record over to the poller.
pub struct PayoutFlow {
    service: PayoutServiceRef,
    poller: PayoutPoller,
    notifier: NotifierRef,
}

impl PayoutFlow {
    pub fn new(service: PayoutServiceRef, poller: PayoutPoller, notifier: NotifierRef) -> Self {
        Self {
            service,
            poller,
            notifier,
        }
    }

    /// Creates a payout of `amount` through `method_id` and starts tracking it.
    ///
    /// The returned session has already issued its first fetch or is about to.
    pub async fn request(
        &self,
        amount: Decimal,
        method_id: &str,
    ) -> Result<(PayoutRecord, PollingSession)> {
        let amount = Amount::new(amount)?;
        match self.service.create_payout(amount, method_id).await {
            Ok(record) => {
                info!(payout_id = %record.id, amount = %record.amount, method = %record.payout_method, "payout requested");
                self.notifier.notify(
                    NoticeKind::Success,
                    "Payout request submitted",
                    &format!(
                        "{} via {} will be processed shortly.",
                        record.amount, record.payout_method
                    ),
                );
                let session = self.poller.poll(record.id.clone());
                Ok((record, session))
            }
            Err(err) => {
                warn!(error = %err, method = method_id, "payout request failed");
                self.notifier
                    .notify(NoticeKind::Error, "Payout request failed", &err.to_string());
                Err(err.into())
            }
        }
    }

    /// Resumes tracking a payout created earlier, e.g. from a history view.
    pub fn track(&self, payout_id: &str) -> PollingSession {
        self.poller.poll(payout_id)
    }
}
