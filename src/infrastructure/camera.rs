use crate::domain::frame::RasterBuffer;
use crate::domain::ports::{Camera, CameraStream, CodeDetector, Facing};
use crate::error::{CameraError, DetectError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// One frame a [`ScriptedCamera`] will deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedFrame {
    /// The video element has no new data on this tick.
    NotReady,
    /// A frame without any code in it.
    Blank,
    /// A frame showing a code that decodes to the given text.
    Code(String),
    /// A frame whose pixels are garbage.
    Corrupted,
    /// The read itself fails.
    ReadError,
}

impl ScriptedFrame {
    /// Parses one line of a frame script: `-` is a blank frame, `~` a tick
    /// without a new frame, anything else the decoded text.
    pub fn from_line(line: &str) -> Self {
        match line.trim() {
            "" | "-" => Self::Blank,
            "~" => Self::NotReady,
            text => Self::Code(text.to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct CameraState {
    frames: VecDeque<ScriptedFrame>,
    failure: Option<CameraError>,
    in_use: bool,
    opened: usize,
    released: usize,
    frames_read: usize,
    last_facing: Option<Facing>,
}

/// A camera that replays a scripted sequence of frames.
///
/// Frames are encoded as a "text raster": one pixel per byte of the decoded
/// text, which [`TextRasterDetector`] reads back. The camera enforces
/// exclusive access the way a real device does and keeps counters so callers
/// can check that every stream was given back.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCamera {
    state: Arc<Mutex<CameraState>>,
}

impl ScriptedCamera {
    pub fn new(frames: impl IntoIterator<Item = ScriptedFrame>) -> Self {
        let camera = Self::default();
        camera.push_frames(frames);
        camera
    }

    /// A camera whose every `open` fails with `error`.
    pub fn failing(error: CameraError) -> Self {
        let camera = Self::default();
        camera.state.lock().failure = Some(error);
        camera
    }

    pub fn push_frames(&self, frames: impl IntoIterator<Item = ScriptedFrame>) {
        self.state.lock().frames.extend(frames);
    }

    pub fn set_failure(&self, error: Option<CameraError>) {
        self.state.lock().failure = error;
    }

    pub fn in_use(&self) -> bool {
        self.state.lock().in_use
    }

    pub fn opened(&self) -> usize {
        self.state.lock().opened
    }

    pub fn released(&self) -> usize {
        self.state.lock().released
    }

    pub fn frames_read(&self) -> usize {
        self.state.lock().frames_read
    }

    pub fn remaining_frames(&self) -> usize {
        self.state.lock().frames.len()
    }

    pub fn last_facing(&self) -> Option<Facing> {
        self.state.lock().last_facing
    }
}

#[async_trait]
impl Camera for ScriptedCamera {
    async fn open(&self, facing: Facing) -> Result<Box<dyn CameraStream>, CameraError> {
        let mut state = self.state.lock();
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        if state.in_use {
            return Err(CameraError::Busy);
        }
        state.in_use = true;
        state.opened += 1;
        state.last_facing = Some(facing);
        Ok(Box::new(ScriptedStream {
            state: Arc::clone(&self.state),
            stopped: false,
        }))
    }
}

struct ScriptedStream {
    state: Arc<Mutex<CameraState>>,
    stopped: bool,
}

impl CameraStream for ScriptedStream {
    fn has_new_frame(&self) -> bool {
        let mut state = self.state.lock();
        match state.frames.front() {
            None => false,
            Some(ScriptedFrame::NotReady) => {
                state.frames.pop_front();
                false
            }
            Some(_) => true,
        }
    }

    fn read_frame(&mut self, raster: &mut RasterBuffer) -> Result<(), DetectError> {
        let frame = {
            let mut state = self.state.lock();
            state.frames_read += 1;
            state.frames.pop_front()
        };
        match frame {
            None | Some(ScriptedFrame::NotReady) => Err(DetectError::Read("no frame".to_string())),
            Some(ScriptedFrame::ReadError) => {
                Err(DetectError::Read("frame buffer unavailable".to_string()))
            }
            Some(ScriptedFrame::Blank) => {
                raster.resize(0, 1);
                Ok(())
            }
            Some(ScriptedFrame::Corrupted) => {
                raster.resize(2, 1);
                raster.pixels_mut().copy_from_slice(&[0xff, 0xfe]);
                Ok(())
            }
            Some(ScriptedFrame::Code(text)) => {
                raster.resize(text.len(), 1);
                raster.pixels_mut().copy_from_slice(text.as_bytes());
                Ok(())
            }
        }
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let mut state = self.state.lock();
        state.in_use = false;
        state.released += 1;
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Reads back the text a [`ScriptedCamera`] encoded into a raster.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRasterDetector;

impl CodeDetector for TextRasterDetector {
    fn detect(&self, raster: &RasterBuffer) -> Result<String, DetectError> {
        if raster.pixels().is_empty() {
            return Err(DetectError::NoCode);
        }
        String::from_utf8(raster.pixels().to_vec())
            .map_err(|err| DetectError::Corrupted(err.to_string()))
    }
}
