use crate::domain::outcome::{Amount, Balance, RedemptionOutcome, Reward};
use crate::domain::payout::{PayoutRecord, PayoutStatus};
use crate::domain::ports::{Navigator, NoticeKind, Notifier, PayoutService, RedemptionService};
use crate::domain::token::CanonicalToken;
use crate::error::{RedemptionError, ServiceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// One redeemable QR code known to the in-memory redemption service.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct RewardEntry {
    pub token: String,
    pub amount: Amount,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub campaign_name: Option<String>,
    #[serde(default)]
    pub payout_target: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub redeemed: bool,
}

impl RewardEntry {
    pub fn new(token: impl Into<String>, amount: Amount) -> Self {
        Self {
            token: token.into(),
            amount,
            brand_name: None,
            campaign_name: None,
            payout_target: None,
            expires_at: None,
            redeemed: false,
        }
    }
}

#[derive(Debug, Default)]
struct RewardCatalog {
    entries: HashMap<String, RewardEntry>,
    wallet: Balance,
    unavailable: Option<String>,
}

/// A thread-safe in-memory redemption service.
///
/// Each code redeems once; redeemed amounts are credited to a single wallet
/// whose running balance is reported back with every success.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRedemptionService {
    catalog: Arc<RwLock<RewardCatalog>>,
}

impl InMemoryRedemptionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = RewardEntry>) -> Self {
        let catalog = RewardCatalog {
            entries: entries
                .into_iter()
                .map(|entry| (entry.token.clone(), entry))
                .collect(),
            ..Default::default()
        };
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
        }
    }

    pub async fn insert(&self, entry: RewardEntry) {
        let mut catalog = self.catalog.write().await;
        catalog.entries.insert(entry.token.clone(), entry);
    }

    /// Makes every following submission fail as if the backend were down.
    pub async fn set_unavailable(&self, reason: Option<&str>) {
        self.catalog.write().await.unavailable = reason.map(str::to_string);
    }

    pub async fn wallet_balance(&self) -> Balance {
        self.catalog.read().await.wallet
    }

    pub async fn is_redeemed(&self, token: &str) -> bool {
        let catalog = self.catalog.read().await;
        catalog
            .entries
            .get(token)
            .is_some_and(|entry| entry.redeemed)
    }
}

#[async_trait]
impl RedemptionService for InMemoryRedemptionService {
    async fn submit_redemption(&self, token: &CanonicalToken) -> Result<Reward, RedemptionError> {
        let mut catalog = self.catalog.write().await;
        if let Some(reason) = &catalog.unavailable {
            return Err(RedemptionError::ServiceUnavailable(reason.clone()));
        }

        let entry = catalog
            .entries
            .get_mut(token.as_str())
            .ok_or(RedemptionError::NotFound)?;
        if entry.redeemed {
            return Err(RedemptionError::AlreadyRedeemed);
        }
        if entry.expires_at.is_some_and(|expiry| expiry <= Utc::now()) {
            return Err(RedemptionError::Expired);
        }
        entry.redeemed = true;

        let reward = Reward {
            amount: entry.amount,
            brand_name: entry.brand_name.clone(),
            campaign_name: entry.campaign_name.clone(),
            payout_target: entry.payout_target.clone(),
            wallet_balance: None,
        };
        catalog.wallet = Balance::new(catalog.wallet.0 + reward.amount.value());
        Ok(Reward {
            wallet_balance: Some(catalog.wallet),
            ..reward
        })
    }
}

/// One scripted answer of the payout service to a status fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchStep {
    Status(PayoutStatus),
    Fail(ServiceError),
}

#[derive(Debug)]
struct ScriptedPayout {
    record: PayoutRecord,
    steps: VecDeque<FetchStep>,
    delays: VecDeque<Duration>,
    fetches: usize,
}

#[derive(Debug, Default)]
struct PayoutLedger {
    payouts: HashMap<String, ScriptedPayout>,
    settlement: Vec<FetchStep>,
    next_id: u64,
    create_failure: Option<ServiceError>,
}

/// An in-memory payout service whose status progression is scripted.
///
/// Every `get_payout` consumes the next scripted step of that payout; once the
/// script runs out the last known record is returned unchanged.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPayoutService {
    ledger: Arc<RwLock<PayoutLedger>>,
}

impl InMemoryPayoutService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script applied to every payout created from now on.
    pub async fn set_settlement(&self, steps: impl IntoIterator<Item = FetchStep>) {
        self.ledger.write().await.settlement = steps.into_iter().collect();
    }

    pub async fn set_create_failure(&self, failure: Option<ServiceError>) {
        self.ledger.write().await.create_failure = failure;
    }

    /// Registers an existing payout with its fetch script.
    pub async fn insert(&self, record: PayoutRecord, steps: impl IntoIterator<Item = FetchStep>) {
        let mut ledger = self.ledger.write().await;
        ledger.payouts.insert(
            record.id.clone(),
            ScriptedPayout {
                record,
                steps: steps.into_iter().collect(),
                delays: VecDeque::new(),
                fetches: 0,
            },
        );
    }

    /// Per-fetch response latencies for `id`, consumed in issue order.
    pub async fn set_delays(&self, id: &str, delays: impl IntoIterator<Item = Duration>) {
        if let Some(payout) = self.ledger.write().await.payouts.get_mut(id) {
            payout.delays = delays.into_iter().collect();
        }
    }

    pub async fn fetch_count(&self, id: &str) -> usize {
        self.ledger
            .read()
            .await
            .payouts
            .get(id)
            .map_or(0, |payout| payout.fetches)
    }
}

fn method_label(method_id: &str) -> String {
    match method_id.to_ascii_lowercase().as_str() {
        "upi" => "UPI".to_string(),
        "bank" | "bank_transfer" => "Bank transfer".to_string(),
        "wallet" => "Wallet".to_string(),
        _ => method_id.to_string(),
    }
}

#[async_trait]
impl PayoutService for InMemoryPayoutService {
    async fn create_payout(
        &self,
        amount: Amount,
        method_id: &str,
    ) -> Result<PayoutRecord, ServiceError> {
        let mut ledger = self.ledger.write().await;
        if let Some(failure) = &ledger.create_failure {
            return Err(failure.clone());
        }
        ledger.next_id += 1;
        let record = PayoutRecord {
            id: format!("P{}", ledger.next_id),
            status: PayoutStatus::Pending,
            amount,
            payout_method: method_label(method_id),
            reference_id: None,
            admin_note: None,
            created_at: Utc::now(),
        };
        let steps = ledger.settlement.iter().cloned().collect();
        ledger.payouts.insert(
            record.id.clone(),
            ScriptedPayout {
                record: record.clone(),
                steps,
                delays: VecDeque::new(),
                fetches: 0,
            },
        );
        Ok(record)
    }

    async fn get_payout(&self, id: &str) -> Result<PayoutRecord, ServiceError> {
        let (answer, delay) = {
            let mut ledger = self.ledger.write().await;
            let payout = ledger
                .payouts
                .get_mut(id)
                .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
            payout.fetches += 1;
            let answer = match payout.steps.pop_front() {
                Some(FetchStep::Status(status)) => {
                    payout.record.status = status;
                    if status == PayoutStatus::Completed && payout.record.reference_id.is_none() {
                        payout.record.reference_id = Some(format!("REF-{id}"));
                    }
                    Ok(payout.record.clone())
                }
                Some(FetchStep::Fail(err)) => Err(err),
                None => Ok(payout.record.clone()),
            };
            (answer, payout.delays.pop_front())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        answer
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

/// Keeps every notice so callers can inspect what the user was told.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NoticeKind, title: &str, message: &str) {
        self.notices.lock().push(Notice {
            kind,
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

/// Forwards notices to the log, for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: NoticeKind, title: &str, message: &str) {
        match kind {
            NoticeKind::Error | NoticeKind::Warning => {
                warn!(kind = ?kind, title, message, "notice")
            }
            NoticeKind::Success | NoticeKind::Info => info!(kind = ?kind, title, message, "notice"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Redeem(CanonicalToken),
    Result,
}

/// A navigation layer that records routes and holds result state in memory.
///
/// The outcome handed to the result route is transient: `take_result_state`
/// hands it out once, just like history state lost on reload.
#[derive(Debug, Default, Clone)]
pub struct RecordingNavigator {
    routes: Arc<Mutex<Vec<Route>>>,
    result_state: Arc<Mutex<Option<RedemptionOutcome>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().clone()
    }

    pub fn take_result_state(&self) -> Option<RedemptionOutcome> {
        self.result_state.lock().take()
    }
}

impl Navigator for RecordingNavigator {
    fn to_redeem(&self, token: &CanonicalToken) {
        self.routes.lock().push(Route::Redeem(token.clone()));
    }

    fn to_result(&self, outcome: RedemptionOutcome) {
        self.routes.lock().push(Route::Result);
        *self.result_state.lock() = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::token::canonicalize;
    use chrono::Duration as ChronoDuration;
    use rust_decimal_macros::dec;

    fn token(raw: &str) -> CanonicalToken {
        canonicalize(raw).unwrap()
    }

    #[tokio::test]
    async fn test_redemption_credits_wallet_once() {
        let service = InMemoryRedemptionService::with_entries([
            RewardEntry::new("abc", Amount::new(dec!(50.00)).unwrap()),
            RewardEntry::new("def", Amount::new(dec!(10.00)).unwrap()),
        ]);

        let first = service.submit_redemption(&token("abc")).await.unwrap();
        assert_eq!(first.wallet_balance, Some(Balance::new(dec!(50.00))));
        let second = service.submit_redemption(&token("def")).await.unwrap();
        assert_eq!(second.wallet_balance, Some(Balance::new(dec!(60.00))));

        assert_eq!(
            service.submit_redemption(&token("abc")).await,
            Err(RedemptionError::AlreadyRedeemed)
        );
        assert!(service.is_redeemed("abc").await);
        assert_eq!(service.wallet_balance().await, Balance::new(dec!(60.00)));
    }

    #[tokio::test]
    async fn test_redemption_rejections() {
        let mut expired = RewardEntry::new("old", Amount::new(dec!(5)).unwrap());
        expired.expires_at = Some(Utc::now() - ChronoDuration::days(1));
        let service = InMemoryRedemptionService::with_entries([expired]);

        assert_eq!(
            service.submit_redemption(&token("old")).await,
            Err(RedemptionError::Expired)
        );
        assert_eq!(
            service.submit_redemption(&token("missing")).await,
            Err(RedemptionError::NotFound)
        );

        service.set_unavailable(Some("maintenance")).await;
        assert!(matches!(
            service.submit_redemption(&token("old")).await,
            Err(RedemptionError::ServiceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_payout_script_is_consumed_per_fetch() {
        let service = InMemoryPayoutService::new();
        service
            .set_settlement([
                FetchStep::Status(PayoutStatus::Processing),
                FetchStep::Fail(ServiceError::Unavailable("timeout".to_string())),
                FetchStep::Status(PayoutStatus::Completed),
            ])
            .await;
        let created = service
            .create_payout(Amount::new(dec!(20)).unwrap(), "upi")
            .await
            .unwrap();
        assert_eq!(created.status, PayoutStatus::Pending);
        assert_eq!(created.payout_method, "UPI");

        let id = created.id.as_str();
        assert_eq!(
            service.get_payout(id).await.unwrap().status,
            PayoutStatus::Processing
        );
        assert!(service.get_payout(id).await.is_err());
        let done = service.get_payout(id).await.unwrap();
        assert_eq!(done.status, PayoutStatus::Completed);
        assert_eq!(done.reference_id.as_deref(), Some("REF-P1"));
        assert_eq!(
            service.get_payout(id).await.unwrap().status,
            PayoutStatus::Completed
        );
        assert_eq!(service.fetch_count(id).await, 4);
        assert!(matches!(
            service.get_payout("nope").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_navigator_result_state_is_transient() {
        let navigator = RecordingNavigator::new();
        navigator.to_redeem(&token("T"));
        navigator.to_result(RedemptionOutcome::failure("nope"));

        assert_eq!(navigator.routes(), vec![Route::Redeem(token("T")), Route::Result]);
        assert!(navigator.take_result_state().is_some());
        assert!(navigator.take_result_state().is_none());
    }
}
