use crate::domain::frame::RasterBuffer;
use crate::domain::ports::{
    CameraRef, CameraStream, CodeDetectorRef, Facing, FrameClockRef, NoticeKind, NotifierRef,
};
use crate::domain::token::{CanonicalToken, canonicalize};
use crate::error::{CameraError, DetectError, ScanError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Drives camera capture and QR detection until a redeemable token shows up.
///
/// Each call to [`Scanner::start`] builds a brand-new [`ScanSession`]; nothing
/// carries over between sessions.
#[derive(Clone)]
pub struct Scanner {
    camera: CameraRef,
    detector: CodeDetectorRef,
    clock: FrameClockRef,
    notifier: Option<NotifierRef>,
    facing: Facing,
}

impl Scanner {
    pub fn new(camera: CameraRef, detector: CodeDetectorRef, clock: FrameClockRef) -> Self {
        Self {
            camera,
            detector,
            clock,
            notifier: None,
            facing: Facing::Rear,
        }
    }

    pub fn with_facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }

    /// Camera failures are also reported through `notifier`.
    pub fn with_notifier(mut self, notifier: NotifierRef) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Opens the camera and starts sampling frames.
    ///
    /// `on_token` runs at most once, after the camera has been released.
    /// `on_fatal` runs when the camera cannot be acquired; there is no
    /// automatic retry. Neither runs once the session has been stopped.
    pub fn start<T, F>(&self, on_token: T, on_fatal: F) -> ScanSession
    where
        T: FnOnce(CanonicalToken) + Send + 'static,
        F: FnOnce(CameraError) + Send + 'static,
    {
        let shared = Arc::new(SessionShared {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            active: AtomicBool::new(true),
            stream: Mutex::new(None),
        });
        info!(session = shared.id, facing = %self.facing, "scan session started");

        let task = tokio::spawn(capture_loop(
            self.clone(),
            Arc::clone(&shared),
            on_token,
            on_fatal,
        ));
        ScanSession { shared, task }
    }

    /// Runs one session to completion and returns its token.
    ///
    /// Dropping the returned future stops the session and releases the camera.
    pub async fn scan(&self) -> Result<CanonicalToken, ScanError> {
        let (tx, mut rx) = mpsc::channel(1);
        let fatal_tx = tx.clone();
        let session = self.start(
            move |token| {
                let _ = tx.try_send(Ok(token));
            },
            move |err| {
                let _ = fatal_tx.try_send(Err(ScanError::CameraUnavailable(err)));
            },
        );
        let result = rx.recv().await.unwrap_or(Err(ScanError::Stopped));
        session.stop();
        result
    }

    fn report_camera_failure(&self, err: &CameraError) {
        if let Some(notifier) = &self.notifier {
            match err {
                CameraError::PermissionDenied => notifier.notify(
                    NoticeKind::Error,
                    "Camera permission denied",
                    "Allow camera access and try scanning again.",
                ),
                other => {
                    notifier.notify(NoticeKind::Error, "Camera unavailable", &other.to_string())
                }
            }
        }
    }
}

/// One bounded camera-capture attempt.
///
/// Owns the camera stream and the pending frame tick. Every exit path
/// (decode, [`ScanSession::stop`], camera failure, drop) releases both, and
/// releasing twice is a no-op.
pub struct ScanSession {
    shared: Arc<SessionShared>,
    task: JoinHandle<()>,
}

impl ScanSession {
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Whether the session is still waiting for a code.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Stops sampling and releases the camera. Idempotent.
    pub fn stop(&self) {
        if self.shared.deactivate() {
            info!(session = self.shared.id, "scan session stopped");
        }
        self.task.abort();
        self.shared.release();
    }

    /// Waits until the capture loop has exited on its own or been stopped.
    pub async fn finished(&mut self) {
        let _ = (&mut self.task).await;
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.stop();
    }
}

struct SessionShared {
    id: u64,
    active: AtomicBool,
    stream: Mutex<Option<Box<dyn CameraStream>>>,
}

impl SessionShared {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Flips the session inactive. Only the first caller gets `true`.
    fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::SeqCst)
    }

    /// Hands a freshly opened stream to the session. A session stopped while
    /// the camera was opening gets its stream stopped straight away.
    fn install(&self, mut stream: Box<dyn CameraStream>) -> bool {
        let mut slot = self.stream.lock();
        if !self.is_active() {
            stream.stop();
            return false;
        }
        *slot = Some(stream);
        true
    }

    fn release(&self) {
        if let Some(mut stream) = self.stream.lock().take() {
            stream.stop();
            debug!(session = self.id, "camera stream released");
        }
    }

    /// Copies the current frame into `raster` if one is ready.
    fn sample(&self, raster: &mut Option<RasterBuffer>) -> Option<Result<(), DetectError>> {
        let mut slot = self.stream.lock();
        let stream = slot.as_mut()?;
        if !stream.has_new_frame() {
            return None;
        }
        let raster = raster.get_or_insert_with(RasterBuffer::default);
        Some(stream.read_frame(raster))
    }
}

async fn capture_loop<T, F>(scanner: Scanner, shared: Arc<SessionShared>, on_token: T, on_fatal: F)
where
    T: FnOnce(CanonicalToken) + Send + 'static,
    F: FnOnce(CameraError) + Send + 'static,
{
    let stream = match scanner.camera.open(scanner.facing).await {
        Ok(stream) => stream,
        Err(err) => {
            if shared.deactivate() {
                warn!(session = shared.id, error = %err, "camera unavailable");
                scanner.report_camera_failure(&err);
                on_fatal(err);
            }
            return;
        }
    };
    if !shared.install(stream) {
        return;
    }

    let mut raster = None;
    loop {
        scanner.clock.next_frame().await;
        if !shared.is_active() {
            break;
        }

        match shared.sample(&mut raster) {
            None => continue,
            Some(Err(noise)) => {
                trace!(session = shared.id, error = %noise, "frame read failed");
                continue;
            }
            Some(Ok(())) => {}
        }
        let Some(frame) = raster.as_ref() else {
            continue;
        };

        let payload = match scanner.detector.detect(frame) {
            Ok(payload) => payload,
            Err(noise) => {
                trace!(session = shared.id, error = %noise, "no code in frame");
                continue;
            }
        };

        match canonicalize(&payload) {
            Some(token) => {
                if shared.deactivate() {
                    shared.release();
                    info!(session = shared.id, token = %token, "code decoded");
                    on_token(token);
                }
                break;
            }
            None => {
                debug!(session = shared.id, payload = %payload, "unrecognized payload ignored");
            }
        }
    }
    shared.release();
}
