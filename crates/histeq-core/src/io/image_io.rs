use std::path::Path;

use image::DynamicImage;
use tracing::debug;

use crate::buffer::{ChannelLayout, ImageBuffer};
use crate::error::{HisteqError, Result};

/// Load an image file as 8-bit grayscale, RGB or RGBA.
pub fn load_image(path: &Path) -> Result<ImageBuffer> {
    let img = image::open(path)?;
    let buffer = from_dynamic(img)?;
    debug!(
        path = %path.display(),
        width = buffer.width(),
        height = buffer.height(),
        layout = %buffer.layout(),
        "Image loaded"
    );
    Ok(buffer)
}

/// Convert a decoded image. 8-bit L, RGB and RGBA are taken as-is; grey
/// types collapse to L8, alpha-bearing colour to RGBA8, anything else to RGB8.
pub fn from_dynamic(img: DynamicImage) -> Result<ImageBuffer> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let color = img.color();
    let (channels, samples) = match img {
        DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
        DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
        DynamicImage::ImageRgba8(buf) => (4, buf.into_raw()),
        other if !color.has_color() => (1, other.to_luma8().into_raw()),
        other if color.has_alpha() => (4, other.to_rgba8().into_raw()),
        other => (3, other.to_rgb8().into_raw()),
    };
    ImageBuffer::new(w, h, channels, samples)
}

pub fn to_dynamic(image: &ImageBuffer) -> Result<DynamicImage> {
    let (w, h) = (image.width() as u32, image.height() as u32);
    let samples = image.samples().to_vec();
    let invalid = || HisteqError::InvalidDimensions {
        width: image.width(),
        height: image.height(),
        channels: image.channels(),
        len: image.size(),
    };
    let img = match image.layout() {
        ChannelLayout::Grayscale => {
            DynamicImage::ImageLuma8(image::GrayImage::from_raw(w, h, samples).ok_or_else(invalid)?)
        }
        ChannelLayout::Rgb => {
            DynamicImage::ImageRgb8(image::RgbImage::from_raw(w, h, samples).ok_or_else(invalid)?)
        }
        ChannelLayout::Rgba => {
            DynamicImage::ImageRgba8(image::RgbaImage::from_raw(w, h, samples).ok_or_else(invalid)?)
        }
    };
    Ok(img)
}

/// Encode an image, choosing the format from the file extension.
pub fn save_image(image: &ImageBuffer, path: &Path) -> Result<()> {
    to_dynamic(image)?.save(path)?;
    debug!(path = %path.display(), "Image saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grey_alpha_collapses_to_luma() {
        let la = image::GrayAlphaImage::from_raw(2, 1, vec![10, 255, 20, 0]).unwrap();
        let buf = from_dynamic(DynamicImage::ImageLumaA8(la)).unwrap();
        assert_eq!(buf.layout(), ChannelLayout::Grayscale);
        assert_eq!(buf.samples(), &[10, 20]);
    }

    #[test]
    fn sixteen_bit_rgb_converts_to_rgb8() {
        let rgb16 = image::ImageBuffer::<image::Rgb<u16>, Vec<u16>>::from_raw(
            1,
            1,
            vec![u16::MAX, 0, u16::MAX],
        )
        .unwrap();
        let buf = from_dynamic(DynamicImage::ImageRgb16(rgb16)).unwrap();
        assert_eq!(buf.layout(), ChannelLayout::Rgb);
        assert_eq!(buf.samples(), &[255, 0, 255]);
    }

    #[test]
    fn to_dynamic_keeps_layout() {
        let buf = ImageBuffer::new(2, 1, 4, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let img = to_dynamic(&buf).unwrap();
        assert!(matches!(img, DynamicImage::ImageRgba8(_)));
        assert_eq!(from_dynamic(img).unwrap(), buf);
    }
}
