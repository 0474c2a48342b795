/// Off-screen 8-bit luma raster a scan session copies camera frames into.
///
/// One buffer lives for the whole session and is reused across ticks; it is
/// only reallocated when the stream's frame size changes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl RasterBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    /// Resizes the raster in place, keeping the allocation when it is large
    /// enough.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels.resize(width * height, 0);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Luma at `(x, y)`; out-of-bounds reads are white.
    pub fn luma(&self, x: usize, y: usize) -> u8 {
        if x >= self.width || y >= self.height {
            return u8::MAX;
        }
        self.pixels[y * self.width + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_keeps_row_major_layout() {
        let mut raster = RasterBuffer::default();
        raster.resize(3, 2);
        raster.pixels_mut()[4] = 7;
        assert_eq!(raster.luma(1, 1), 7);
        assert_eq!(raster.luma(3, 0), u8::MAX);
        assert_eq!(raster.pixels().len(), 6);
    }
}
