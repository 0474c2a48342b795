use crate::application::scanner::Scanner;
use crate::domain::outcome::RedemptionOutcome;
use crate::domain::ports::{NavigatorRef, NoticeKind, NotifierRef, RedemptionServiceRef};
use crate::domain::token::{CanonicalToken, canonicalize};
use crate::error::{PipelineError, Result};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Where a redemption attempt currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum RedemptionState {
    Idle,
    Scanning,
    Decoded(CanonicalToken),
    Submitting(CanonicalToken),
    Succeeded(RedemptionOutcome),
    Failed(RedemptionOutcome),
}

impl RedemptionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Decoded(_) => "decoded",
            Self::Submitting(_) => "submitting",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }

    pub fn outcome(&self) -> Option<&RedemptionOutcome> {
        match self {
            Self::Succeeded(outcome) | Self::Failed(outcome) => Some(outcome),
            _ => None,
        }
    }
}

/// The scan → submit → result state machine.
///
/// Operations take `&mut self`, so transitions are serialized by
/// construction. Observers follow along through [`RedemptionFlow::subscribe`].
pub struct RedemptionFlow {
    scanner: Scanner,
    service: RedemptionServiceRef,
    navigator: NavigatorRef,
    notifier: Option<NotifierRef>,
    state: watch::Sender<RedemptionState>,
}

impl RedemptionFlow {
    pub fn new(scanner: Scanner, service: RedemptionServiceRef, navigator: NavigatorRef) -> Self {
        let (state, _) = watch::channel(RedemptionState::Idle);
        Self {
            scanner,
            service,
            navigator,
            notifier: None,
            state,
        }
    }

    pub fn with_notifier(mut self, notifier: NotifierRef) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn state(&self) -> RedemptionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RedemptionState> {
        self.state.subscribe()
    }

    /// Back to `Idle`, whatever the current state.
    pub fn reset(&mut self) {
        self.transition(RedemptionState::Idle);
    }

    /// Opens a fresh scan session and waits for a token.
    ///
    /// On success the machine is `Decoded` and the token has been handed to
    /// the navigator. A camera failure puts it back to `Idle`; scanning again
    /// is the manual retry.
    pub async fn scan(&mut self) -> Result<CanonicalToken> {
        self.transition(RedemptionState::Scanning);
        match self.scanner.scan().await {
            Ok(token) => {
                self.transition(RedemptionState::Decoded(token.clone()));
                self.navigator.to_redeem(&token);
                Ok(token)
            }
            Err(err) => {
                warn!(error = %err, "scan ended without a token");
                self.transition(RedemptionState::Idle);
                Err(err.into())
            }
        }
    }

    /// Sends the decoded token to the redemption service.
    ///
    /// Any rejection, including an unreachable service, becomes a `Failed`
    /// outcome. Nothing is retried.
    pub async fn submit(&mut self) -> Result<RedemptionOutcome> {
        let token = match self.state() {
            RedemptionState::Decoded(token) => token,
            other => {
                return Err(PipelineError::InvalidTransition {
                    state: other.name(),
                    action: "submit a redemption",
                });
            }
        };
        self.transition(RedemptionState::Submitting(token.clone()));

        let outcome = match self.service.submit_redemption(&token).await {
            Ok(reward) => {
                info!(token = %token, amount = %reward.amount, "redemption succeeded");
                self.notify(
                    NoticeKind::Success,
                    "Cashback redeemed",
                    &format!("{} has been credited.", reward.amount),
                );
                RedemptionOutcome::Success(reward)
            }
            Err(err) => {
                warn!(token = %token, error = %err, "redemption failed");
                self.notify(NoticeKind::Error, "Redemption failed", &err.to_string());
                RedemptionOutcome::failure(err.to_string())
            }
        };
        self.finish(outcome.clone());
        Ok(outcome)
    }

    pub async fn scan_and_redeem(&mut self) -> Result<RedemptionOutcome> {
        self.scan().await?;
        self.submit().await
    }

    /// Redeems a payload that arrived through the route rather than the
    /// camera, e.g. a link opened from outside the app.
    ///
    /// Unlike a camera decode, an unrecognized payload here does advance the
    /// machine: there is no scan to keep running, so it ends `Failed` with
    /// "Invalid QR code".
    pub async fn submit_token(&mut self, raw: &str) -> Result<RedemptionOutcome> {
        match canonicalize(raw) {
            Some(token) => {
                self.transition(RedemptionState::Decoded(token));
                self.submit().await
            }
            None => {
                let outcome = RedemptionOutcome::failure("Invalid QR code");
                self.finish(outcome.clone());
                Ok(outcome)
            }
        }
    }

    fn finish(&mut self, outcome: RedemptionOutcome) {
        let next = if outcome.is_success() {
            RedemptionState::Succeeded(outcome.clone())
        } else {
            RedemptionState::Failed(outcome.clone())
        };
        self.transition(next);
        self.navigator.to_result(outcome);
    }

    fn transition(&mut self, next: RedemptionState) {
        let to = next.name();
        let previous = self.state.send_replace(next);
        debug!(from = previous.name(), to, "redemption state changed");
    }

    fn notify(&self, kind: NoticeKind, title: &str, message: &str) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(kind, title, message);
        }
    }
}

/// What the result screen shows.
///
/// Built from the transient navigation state; a reload or bookmark arrives
/// without one and gets `NoData` instead of an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ResultView {
    Success {
        headline: String,
        amount: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        brand_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        campaign_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        payout_target: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        wallet_balance: Option<String>,
    },
    Failure {
        headline: String,
        message: String,
    },
    NoData {
        message: String,
    },
}

impl ResultView {
    pub fn from_navigation(state: Option<RedemptionOutcome>) -> Self {
        match state {
            Some(RedemptionOutcome::Success(reward)) => Self::Success {
                headline: "Cashback unlocked!".to_string(),
                amount: reward.amount.to_string(),
                brand_name: reward.brand_name,
                campaign_name: reward.campaign_name,
                payout_target: reward.payout_target,
                wallet_balance: reward.wallet_balance.map(|balance| format!("{:.2}", balance.0)),
            },
            Some(RedemptionOutcome::Failure { error_message }) => Self::Failure {
                headline: "Redemption failed".to_string(),
                message: error_message,
            },
            None => Self::NoData {
                message: "No redemption data found. Scan a QR code to get started.".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::outcome::{Amount, Balance, Reward};
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_navigation_state_renders_no_data() {
        assert!(matches!(
            ResultView::from_navigation(None),
            ResultView::NoData { .. }
        ));
    }

    #[test]
    fn test_success_view_formats_amounts() {
        let mut reward = Reward::new(Amount::new(dec!(50)).unwrap());
        reward.brand_name = Some("Acme".to_string());
        reward.wallet_balance = Some(Balance::new(dec!(120.5)));

        let view = ResultView::from_navigation(Some(RedemptionOutcome::Success(reward)));
        match view {
            ResultView::Success {
                amount,
                brand_name,
                wallet_balance,
                ..
            } => {
                assert_eq!(amount, "50.00");
                assert_eq!(brand_name.as_deref(), Some("Acme"));
                assert_eq!(wallet_balance.as_deref(), Some("120.50"));
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn test_failure_view_carries_message() {
        let view = ResultView::from_navigation(Some(RedemptionOutcome::failure("expired")));
        assert_eq!(
            view,
            ResultView::Failure {
                headline: "Redemption failed".to_string(),
                message: "expired".to_string(),
            }
        );
    }

    #[test]
    fn test_state_names() {
        assert_eq!(RedemptionState::Idle.name(), "idle");
        assert!(RedemptionState::Scanning.outcome().is_none());
        let failed = RedemptionState::Failed(RedemptionOutcome::failure("x"));
        assert_eq!(failed.outcome(), Some(&RedemptionOutcome::failure("x")));
    }
}
