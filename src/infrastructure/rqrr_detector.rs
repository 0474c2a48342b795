use crate::domain::frame::RasterBuffer;
use crate::domain::ports::CodeDetector;
use crate::error::DetectError;

/// QR detection on real camera frames, backed by `rqrr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDetector;

impl CodeDetector for RqrrDetector {
    fn detect(&self, raster: &RasterBuffer) -> Result<String, DetectError> {
        if raster.width() == 0 || raster.height() == 0 {
            return Err(DetectError::NoCode);
        }
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(raster.width(), raster.height(), |x, y| {
                raster.luma(x, y)
            });
        let grids = prepared.detect_grids();
        let mut last_error = None;
        for grid in grids {
            match grid.decode() {
                Ok((_, content)) => return Ok(content),
                Err(err) => last_error = Some(err),
            }
        }
        match last_error {
            Some(err) => Err(DetectError::Corrupted(err.to_string())),
            None => Err(DetectError::NoCode),
        }
    }
}
