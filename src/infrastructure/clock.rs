use crate::domain::ports::FrameClock;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;

/// A frame clock paced at the display refresh rate.
///
/// While the surface is hidden, `next_frame` parks until it becomes visible
/// again, so an idle scanner costs nothing.
#[derive(Debug)]
pub struct DisplayClock {
    period: Duration,
    visible: watch::Sender<bool>,
}

impl DisplayClock {
    pub fn new(period: Duration) -> Self {
        let (visible, _) = watch::channel(true);
        Self { period, visible }
    }

    pub fn from_frame_rate(frame_rate: u32) -> Self {
        Self::new(Duration::from_secs(1) / frame_rate.max(1))
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.send_replace(visible);
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }
}

#[async_trait]
impl FrameClock for DisplayClock {
    async fn next_frame(&self) {
        let mut visible = self.visible.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = visible.wait_for(|visible| *visible).await;
        tokio::time::sleep(self.period).await;
    }
}
