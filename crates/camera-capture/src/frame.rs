//! Video frame types and processing

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds, monotonic)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Wrap a decoded RGB image
    pub fn from_rgb_image(image: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, timestamp_ns, sequence)
    }

    /// Capture timestamp in seconds
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_ns as f64 / 1e9
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.data.get(idx..idx + 3).map(|p| [p[0], p[1], p[2]])
    }

    /// Copy into an `RgbImage`; `None` if the buffer size is wrong
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Convert to grayscale
    pub fn to_grayscale(&self) -> GrayImage {
        let mut gray = GrayImage::new(self.width, self.height);
        for (pixel, out) in self.data.chunks_exact(3).zip(gray.pixels_mut()) {
            // Luminance formula: 0.299*R + 0.587*G + 0.114*B
            let y = (pixel[0] as f32 * 0.299
                   + pixel[1] as f32 * 0.587
                   + pixel[2] as f32 * 0.114) as u8;
            *out = Luma([y]);
        }
        gray
    }

    /// Resize frame using bilinear interpolation
    pub fn resize(&self, new_width: u32, new_height: u32) -> VideoFrame {
        if new_width == self.width && new_height == self.height {
            return self.clone();
        }

        let resized = match self.to_rgb_image() {
            Some(img) => imageops::resize(&img, new_width, new_height, FilterType::Triangle),
            None => RgbImage::new(new_width, new_height),
        };

        VideoFrame::from_rgb_image(resized, self.timestamp_ns, self.sequence)
    }
}

/// Stretch the contrast of a dim grayscale frame (histogram equalization)
pub fn enhance_low_light(gray: &GrayImage) -> GrayImage {
    imageproc::contrast::equalize_histogram(gray)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> VideoFrame {
        let data = rgb.iter().copied().cycle().take((width * height * 3) as usize).collect();
        VideoFrame::new(data, width, height, 1_500_000_000, 7)
    }

    #[test]
    fn test_grayscale_luminance() {
        let frame = solid(4, 2, [255, 0, 0]);
        let gray = frame.to_grayscale();
        assert_eq!(gray.dimensions(), (4, 2));
        assert!(gray.pixels().all(|p| p.0[0] == 76));
    }

    #[test]
    fn test_get_pixel_bounds() {
        let frame = solid(2, 2, [1, 2, 3]);
        assert_eq!(frame.get_pixel(1, 1), Some([1, 2, 3]));
        assert_eq!(frame.get_pixel(2, 0), None);
    }

    #[test]
    fn test_resize_keeps_metadata() {
        let frame = solid(8, 6, [10, 20, 30]);
        let resized = frame.resize(4, 3);
        assert_eq!((resized.width, resized.height), (4, 3));
        assert_eq!(resized.data.len(), 4 * 3 * 3);
        assert_eq!(resized.sequence, 7);
        assert_eq!(resized.get_pixel(0, 0), Some([10, 20, 30]));
        assert!((resized.timestamp_secs() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_enhance_low_light_stretches_range() {
        let mut dim = GrayImage::new(16, 16);
        for (x, _, p) in dim.enumerate_pixels_mut() {
            *p = Luma([100 + (x % 8) as u8]);
        }

        let enhanced = enhance_low_light(&dim);
        let max = enhanced.pixels().map(|p| p.0[0]).max().unwrap();
        let min = enhanced.pixels().map(|p| p.0[0]).min().unwrap();
        assert_eq!(max, 255);
        assert!(max - min > 7);
    }
}
