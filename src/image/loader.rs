use crate::utils::error::ClassifyError;
use crate::Result;
use base64::Engine;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// 单张图片大小上限 (50MB)
pub const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

pub struct ImageLoader;

impl ImageLoader {
    /// 解码base64，兼容数据URL前缀 (data:image/xxx;base64,)
    pub fn decode_base64(base64_data: &str) -> Result<Vec<u8>> {
        let base64_clean = if base64_data.starts_with("data:") {
            base64_data.split(',').nth(1).unwrap_or(base64_data)
        } else {
            base64_data
        };

        let image_bytes = base64::engine::general_purpose::STANDARD.decode(base64_clean.trim())?;

        if image_bytes.len() > MAX_IMAGE_BYTES {
            return Err(ClassifyError::FileTooLarge(image_bytes.len(), MAX_IMAGE_BYTES));
        }

        Ok(image_bytes)
    }

    /// 从字节流加载图像，格式由内容判断而不是文件扩展名
    pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ClassifyError::FileTooLarge(bytes.len(), MAX_IMAGE_BYTES));
        }

        let image = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .decode()?;

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 200, 30]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn decodes_png_bytes() {
        let image = ImageLoader::from_bytes(&png_bytes(8, 4)).unwrap();
        assert_eq!((image.width(), image.height()), (8, 4));
    }

    #[test]
    fn rejects_non_image_bytes() {
        let err = ImageLoader::from_bytes(b"this is a text file pretending to be a jpeg").unwrap_err();
        assert!(matches!(err, ClassifyError::ImageDecode(_)));
    }

    #[test]
    fn oversized_payload_is_rejected_before_decoding() {
        let bytes = vec![0u8; MAX_IMAGE_BYTES + 1];
        assert!(matches!(
            ImageLoader::from_bytes(&bytes),
            Err(ClassifyError::FileTooLarge(_, MAX_IMAGE_BYTES))
        ));
    }

    #[test]
    fn decodes_base64_data_urls() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes(3, 3));
        let data_url = format!("data:image/png;base64,{}", encoded);

        let plain = ImageLoader::decode_base64(&encoded).unwrap();
        let from_url = ImageLoader::decode_base64(&data_url).unwrap();
        assert_eq!(plain, from_url);
        assert_eq!(ImageLoader::from_bytes(&from_url).unwrap().height(), 3);
        assert!(matches!(
            ImageLoader::decode_base64("%%%not base64%%%"),
            Err(ClassifyError::Base64(_))
        ));
    }
}
