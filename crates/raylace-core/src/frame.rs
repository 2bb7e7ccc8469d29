/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Byte length of an RGBA8 image of the given size.
pub fn rgba_len(width: u32, height: u32) -> usize {
    (width as usize) * (height as usize) * BYTES_PER_PIXEL
}

/// The canonical displayed image: RGBA8, row-major, row 0 at the top.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    /// Raw pixel data.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer filled with zeros (transparent black).
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; rgba_len(width, height)],
            width,
            height,
        }
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Total byte size of the pixel data.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Byte range of row `y` inside `data`.
    pub fn row_range(&self, y: u32) -> std::ops::Range<usize> {
        let start = y as usize * self.stride();
        start..start + self.stride()
    }

    pub fn row(&self, y: u32) -> &[u8] {
        &self.data[self.row_range(y)]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let range = self.row_range(y);
        &mut self.data[range]
    }

    /// Get the RGBA value at a pixel coordinate. Returns None if out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * BYTES_PER_PIXEL;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ])
    }

    /// Set the RGBA value at a pixel coordinate. No-op if out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * BYTES_PER_PIXEL;
        self.data[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&rgba);
    }
}

/// A full-size buffer a single worker renders its rows into.
///
/// The buffer is a capability token: it travels to the worker inside a job and
/// comes back inside the response, so exactly one side holds it at a time.
/// `generation` names the frame allocation it was sized for; the compositor
/// refuses buffers from an older generation.
#[derive(Debug)]
pub struct ScratchBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    generation: u64,
}

impl ScratchBuffer {
    pub fn new(width: u32, height: u32, generation: u64) -> Self {
        Self {
            data: vec![0u8; rgba_len(width, height)],
            width,
            height,
            generation,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Row `y` as raw bytes. Panics if `y` is outside the buffer.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride();
        &self.data[start..start + self.stride()]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }
}
