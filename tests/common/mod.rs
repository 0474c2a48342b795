#![allow(dead_code)]

use chrono::Utc;
use rust_decimal::Decimal;
use scan2redeem::application::redemption::RedemptionFlow;
use scan2redeem::application::scanner::Scanner;
use scan2redeem::domain::outcome::Amount;
use scan2redeem::domain::payout::{PayoutRecord, PayoutStatus};
use scan2redeem::infrastructure::camera::{ScriptedCamera, ScriptedFrame, TextRasterDetector};
use scan2redeem::infrastructure::clock::DisplayClock;
use scan2redeem::infrastructure::in_memory::{
    InMemoryRedemptionService, RecordingNavigator, RecordingNotifier, RewardEntry,
};
use std::sync::Arc;
use std::time::Duration;

pub const FRAME_PERIOD: Duration = Duration::from_millis(16);

pub fn frames(lines: &[&str]) -> Vec<ScriptedFrame> {
    lines.iter().map(|line| ScriptedFrame::from_line(line)).collect()
}

pub fn amount(value: Decimal) -> Amount {
    Amount::new(value).unwrap()
}

pub fn scanner(camera: &ScriptedCamera, notifier: &RecordingNotifier) -> Scanner {
    Scanner::new(
        Arc::new(camera.clone()),
        Arc::new(TextRasterDetector),
        Arc::new(DisplayClock::new(FRAME_PERIOD)),
    )
    .with_notifier(Arc::new(notifier.clone()))
}

pub struct RedemptionHarness {
    pub camera: ScriptedCamera,
    pub service: InMemoryRedemptionService,
    pub navigator: RecordingNavigator,
    pub notifier: RecordingNotifier,
    pub flow: RedemptionFlow,
}

pub fn redemption_harness(
    camera: ScriptedCamera,
    entries: impl IntoIterator<Item = RewardEntry>,
) -> RedemptionHarness {
    let service = InMemoryRedemptionService::with_entries(entries);
    let navigator = RecordingNavigator::new();
    let notifier = RecordingNotifier::new();
    let flow = RedemptionFlow::new(
        scanner(&camera, &notifier),
        Arc::new(service.clone()),
        Arc::new(navigator.clone()),
    )
    .with_notifier(Arc::new(notifier.clone()));
    RedemptionHarness {
        camera,
        service,
        navigator,
        notifier,
        flow,
    }
}

pub fn payout_record(id: &str, status: PayoutStatus, value: Decimal) -> PayoutRecord {
    PayoutRecord {
        id: id.to_string(),
        status,
        amount: amount(value),
        payout_method: "UPI".to_string(),
        reference_id: None,
        admin_note: None,
        created_at: Utc::now(),
    }
}
