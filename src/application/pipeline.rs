use crate::application::payout::PayoutFlow;
use crate::application::poller::PayoutPoller;
use crate::application::redemption::RedemptionFlow;
use crate::application::scanner::Scanner;
use crate::config::PipelineConfig;
use crate::domain::ports::{
    CameraRef, CodeDetectorRef, FrameClockRef, NavigatorRef, NotifierRef, PayoutServiceRef,
    RedemptionServiceRef,
};

/// Every collaborator the pipeline talks to.
#[derive(Clone)]
pub struct PipelinePorts {
    pub camera: CameraRef,
    pub detector: CodeDetectorRef,
    pub clock: FrameClockRef,
    pub redemption: RedemptionServiceRef,
    pub payouts: PayoutServiceRef,
    pub notifier: NotifierRef,
    pub navigator: NavigatorRef,
}

/// The scan-to-redeem pipeline, wired up.
///
/// Owns one redemption state machine and one payout flow sharing the same
/// notifier.
pub struct Pipeline {
    pub redemption: RedemptionFlow,
    pub payouts: PayoutFlow,
}

impl Pipeline {
    /// Creates a new `Pipeline` from an already validated configuration.
    pub fn new(config: &PipelineConfig, ports: PipelinePorts) -> Self {
        let scanner = Scanner::new(ports.camera, ports.detector, ports.clock)
            .with_facing(config.facing)
            .with_notifier(ports.notifier.clone());
        let redemption = RedemptionFlow::new(scanner, ports.redemption, ports.navigator)
            .with_notifier(ports.notifier.clone());

        let poller = PayoutPoller::from_config(ports.payouts.clone(), config)
            .with_notifier(ports.notifier.clone());
        let payouts = PayoutFlow::new(ports.payouts, poller, ports.notifier);

        Self {
            redemption,
            payouts,
        }
    }
}
