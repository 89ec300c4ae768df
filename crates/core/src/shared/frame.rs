use ndarray::{ArrayView3, ShapeBuilder};
use thiserror::Error;

/// Number of bytes per pixel in a packed three-channel frame.
pub const BYTES_PER_PIXEL: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame has zero area ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("row stride {stride} is smaller than {min} bytes")]
    StrideTooSmall { stride: usize, min: usize },
    #[error("pixel buffer holds {len} bytes, {required} required")]
    BufferTooSmall { len: usize, required: usize },
}

/// Channel layout reported by the frame source.
///
/// Only `Bgr` is interpreted correctly; other layouts are carried through
/// untouched and read as if they were BGR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Bgr,
    Rgb,
    Yuv420,
}

/// A single camera frame: packed 3-byte pixels, rows `stride` bytes apart.
///
/// Rows may carry trailing padding (decoders commonly align rows), so all
/// pixel access goes through the stride rather than `width * 3`.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
    pixel_format: PixelFormat,
    timestamp_us: i64,
    index: u64,
}

impl Frame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        stride: usize,
        pixel_format: PixelFormat,
        timestamp_us: i64,
        index: u64,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty { width, height });
        }
        let row_bytes = width as usize * BYTES_PER_PIXEL;
        if stride < row_bytes {
            return Err(FrameError::StrideTooSmall {
                stride,
                min: row_bytes,
            });
        }
        let required = stride * (height as usize - 1) + row_bytes;
        if data.len() < required {
            return Err(FrameError::BufferTooSmall {
                len: data.len(),
                required,
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            pixel_format,
            timestamp_us,
            index,
        })
    }

    /// Tightly packed BGR frame (`stride == width * 3`).
    pub fn packed_bgr(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_us: i64,
        index: u64,
    ) -> Result<Self, FrameError> {
        let stride = width as usize * BYTES_PER_PIXEL;
        Self::new(
            data,
            width,
            height,
            stride,
            PixelFormat::Bgr,
            timestamp_us,
            index,
        )
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn is_bgr(&self) -> bool {
        self.pixel_format == PixelFormat::Bgr
    }

    pub fn timestamp_us(&self) -> i64 {
        self.timestamp_us
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// `(height, width, channel)` view honouring the row stride.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        let shape = (self.height as usize, self.width as usize, BYTES_PER_PIXEL)
            .strides((self.stride, BYTES_PER_PIXEL, 1));
        ArrayView3::from_shape(shape, &self.data)
            .expect("Frame buffer was validated against its geometry")
    }
}
