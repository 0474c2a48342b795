mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::{amount, frames, redemption_harness};
use rust_decimal_macros::dec;
use scan2redeem::application::redemption::{RedemptionState, ResultView};
use scan2redeem::domain::outcome::{Balance, RedemptionOutcome};
use scan2redeem::domain::ports::NoticeKind;
use scan2redeem::domain::token::canonicalize;
use scan2redeem::error::{CameraError, PipelineError, ScanError};
use scan2redeem::infrastructure::camera::ScriptedCamera;
use scan2redeem::infrastructure::in_memory::{Route, RewardEntry};

fn entry(token: &str) -> RewardEntry {
    let mut entry = RewardEntry::new(token, amount(dec!(50.00)));
    entry.brand_name = Some("Acme".to_string());
    entry.campaign_name = Some("Summer cashback".to_string());
    entry.payout_target = Some("UPI ***@okbank".to_string());
    entry
}

#[tokio::test(start_paused = true)]
async fn test_scan_to_result_happy_path() {
    let camera = ScriptedCamera::new(frames(&["-", "https://app.example/redeem/abc123?x=1"]));
    let mut h = redemption_harness(camera, [entry("abc123")]);

    let outcome = h.flow.scan_and_redeem().await.unwrap();

    let RedemptionOutcome::Success(reward) = &outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(reward.amount, amount(dec!(50.00)));
    assert_eq!(reward.wallet_balance, Some(Balance::new(dec!(50.00))));
    assert_eq!(h.flow.state(), RedemptionState::Succeeded(outcome.clone()));
    assert!(h.service.is_redeemed("abc123").await);
    assert!(!h.camera.in_use());

    let token = canonicalize("abc123").unwrap();
    assert_eq!(h.navigator.routes(), vec![Route::Redeem(token), Route::Result]);

    let notices = h.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Success);
    assert_eq!(notices[0].title, "Cashback redeemed");

    match ResultView::from_navigation(h.navigator.take_result_state()) {
        ResultView::Success {
            amount,
            brand_name,
            wallet_balance,
            ..
        } => {
            assert_eq!(amount, "50.00");
            assert_eq!(brand_name.as_deref(), Some("Acme"));
            assert_eq!(wallet_balance.as_deref(), Some("50.00"));
        }
        other => panic!("unexpected view {other:?}"),
    }

    // Result state does not survive a reload.
    assert!(matches!(
        ResultView::from_navigation(h.navigator.take_result_state()),
        ResultView::NoData { .. }
    ));
}

#[tokio::test]
async fn test_rejections_become_failed_outcomes() {
    let mut expired = entry("old");
    expired.expires_at = Some(Utc::now() - ChronoDuration::hours(1));
    let mut h = redemption_harness(ScriptedCamera::new([]), [entry("abc123"), expired]);

    h.flow.submit_token("/redeem/abc123").await.unwrap();
    let cases = [
        ("abc123", "This QR code has already been redeemed"),
        ("old", "This QR code has expired"),
        ("unknown", "This QR code is not valid"),
        ("   ", "Invalid QR code"),
    ];
    for (raw, message) in cases {
        let outcome = h.flow.submit_token(raw).await.unwrap();
        assert_eq!(outcome, RedemptionOutcome::failure(message), "payload {raw:?}");
        assert_eq!(h.flow.state(), RedemptionState::Failed(outcome));
    }
}

#[tokio::test]
async fn test_unreachable_service_fails_without_retry() {
    let mut h = redemption_harness(ScriptedCamera::new([]), [entry("abc123")]);
    h.service.set_unavailable(Some("connection refused")).await;

    let outcome = h.flow.submit_token("abc123").await.unwrap();

    assert_eq!(
        outcome,
        RedemptionOutcome::failure("Redemption service unavailable: connection refused")
    );
    assert!(!h.service.is_redeemed("abc123").await);
    let notices = h.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "Redemption failed");

    h.service.set_unavailable(None).await;
    assert!(h.flow.submit_token("abc123").await.unwrap().is_success());
}

#[tokio::test]
async fn test_submit_requires_a_decoded_token() {
    let mut h = redemption_harness(ScriptedCamera::new([]), [entry("abc123")]);

    let err = h.flow.submit().await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidTransition { state: "idle", .. }
    ));

    h.flow.submit_token("abc123").await.unwrap();
    assert!(matches!(
        h.flow.submit().await,
        Err(PipelineError::InvalidTransition {
            state: "succeeded",
            ..
        })
    ));
    assert!(h.navigator.routes().iter().all(|route| *route == Route::Result));
}

#[tokio::test(start_paused = true)]
async fn test_camera_failure_returns_to_idle() {
    let mut h = redemption_harness(
        ScriptedCamera::failing(CameraError::PermissionDenied),
        [entry("abc123")],
    );
    let states = h.flow.subscribe();

    let err = h.flow.scan().await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Scan(ScanError::CameraUnavailable(CameraError::PermissionDenied))
    ));
    assert_eq!(h.flow.state(), RedemptionState::Idle);
    assert!(states.has_changed().unwrap());
    assert!(h.navigator.routes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_scan_again_after_a_result() {
    let camera = ScriptedCamera::new(frames(&["/scan/abc123", "/scan/abc123"]));
    let mut h = redemption_harness(camera, [entry("abc123")]);

    assert!(h.flow.scan_and_redeem().await.unwrap().is_success());
    h.flow.reset();
    assert_eq!(h.flow.state(), RedemptionState::Idle);

    let token = h.flow.scan().await.unwrap();
    assert_eq!(h.flow.state(), RedemptionState::Decoded(token));
    let outcome = h.flow.submit().await.unwrap();
    assert_eq!(
        outcome,
        RedemptionOutcome::failure("This QR code has already been redeemed")
    );
    assert_eq!(h.camera.opened(), 2);
    assert_eq!(h.service.wallet_balance().await, Balance::new(dec!(50.00)));
}
