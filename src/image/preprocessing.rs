use crate::classify::types::{InputTensor, INPUT_CHANNELS, INPUT_HEIGHT, INPUT_WIDTH};
use crate::utils::error::ClassifyError;
use crate::Result;
use image::imageops::{self, FilterType};
use image::DynamicImage;
use ndarray::Array4;

pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// RGB转换 -> 拉伸到 224x224（不裁剪，非正方形图片会变形）-> 归一化到 [0, 1] -> 增加batch维度
    pub fn preprocess(image: &DynamicImage) -> Result<InputTensor> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ClassifyError::ImageProcessing(format!(
                "Image has no pixels: {}x{}",
                image.width(),
                image.height()
            )));
        }

        // 灰度图补齐通道，透明通道直接丢弃
        let rgb_image = image.to_rgb8();
        let resized = imageops::resize(
            &rgb_image,
            INPUT_WIDTH as u32,
            INPUT_HEIGHT as u32,
            FilterType::CatmullRom,
        );

        let data: Vec<f32> = resized
            .into_raw()
            .into_iter()
            .map(|v| v as f32 / 255.0)
            .collect();

        let array = Array4::from_shape_vec((1, INPUT_HEIGHT, INPUT_WIDTH, INPUT_CHANNELS), data)
            .map_err(|e| ClassifyError::ImageProcessing(format!("Failed to build tensor: {}", e)))?;

        InputTensor::new(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn assert_valid_tensor(tensor: &InputTensor) {
        assert_eq!(tensor.shape(), &[1, 224, 224, 3]);
        assert!(tensor.view().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn wide_rgb_image_is_stretched_to_model_shape() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 90, Rgb([255, 0, 128])));
        let tensor = ImagePreprocessor::preprocess(&image).unwrap();
        assert_valid_tensor(&tensor);

        let view = tensor.view();
        assert!((view[[0, 100, 100, 0]] - 1.0).abs() < 1e-6);
        assert!(view[[0, 100, 100, 1]].abs() < 1e-6);
        assert!((view[[0, 100, 100, 2]] - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn grayscale_image_gets_three_channels() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(17, 300, Luma([51])));
        let tensor = ImagePreprocessor::preprocess(&image).unwrap();
        assert_valid_tensor(&tensor);

        let view = tensor.view();
        for c in 0..3 {
            assert!((view[[0, 5, 5, c]] - 0.2).abs() < 1e-6);
        }
    }

    #[test]
    fn alpha_channel_is_discarded() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([0, 255, 0, 0])));
        let tensor = ImagePreprocessor::preprocess(&image).unwrap();
        assert_valid_tensor(&tensor);
        assert!((tensor.view()[[0, 0, 0, 1]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn high_contrast_edges_stay_in_range() {
        // 棋盘格在双三次插值下会产生过冲，归一化后仍需落在 [0, 1]
        let image = RgbImage::from_fn(31, 29, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let tensor = ImagePreprocessor::preprocess(&DynamicImage::ImageRgb8(image)).unwrap();
        assert_valid_tensor(&tensor);
    }
}
