// 图片压缩器 - 存储压缩与模糊占位图
//
// 本模块提供内联图片的重新编码功能，包括：
// - 存储压缩：降采样到边界框并有损编码（WebP 优先，JPEG 回退）
// - 模糊占位图：粗降采样 + 低质量 JPEG，用于渐进加载
// - 异步处理（CPU 密集型操作移到阻塞线程池）

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tokio::task;

use crate::services::cache::config::ShrinkOptions;
use crate::services::cache::error::ConversionError;
use crate::services::cache::payload;

/// 图片压缩器
pub struct ImageCompressor;

impl ImageCompressor {
    /// WebP 编码的最大边长（像素）
    ///
    /// 超出此边长的图片无法编码为 WebP，回退到 JPEG
    const WEBP_MAX_DIMENSION: u32 = 16_383;

    /// 异步执行存储压缩
    ///
    /// 使用 `tokio::task::spawn_blocking` 将 CPU 密集型操作移到阻塞线程池，
    /// 避免阻塞异步运行时。
    ///
    /// # 参数
    /// - `data_uri`: 内联图片负载（data URI）
    /// - `opts`: 压缩参数
    ///
    /// # 返回
    /// - `Ok(String)`: 压缩后的 data URI
    /// - `Err(ConversionError)`: 压缩失败（调用方回退到原始负载）
    pub async fn shrink_async(
        data_uri: String,
        opts: ShrinkOptions,
    ) -> Result<String, ConversionError> {
        task::spawn_blocking(move || Self::shrink(&data_uri, &opts))
            .await
            .map_err(|e| ConversionError::ConversionFailed(format!("任务执行失败: {}", e)))?
    }

    /// 存储压缩
    ///
    /// 将内联图片降采样到边界框内（保持纵横比，不放大），
    /// 优先编码为有损 WebP；当图片超出 WebP 边长限制时回退到 JPEG。
    ///
    /// # 参数
    /// - `data_uri`: 内联图片负载
    /// - `opts`: 压缩参数
    ///
    /// # 返回
    /// - `Ok(String)`: 压缩后的 data URI（`data:image/webp;...` 或 `data:image/jpeg;...`）
    /// - `Err(ConversionError)`: 解码或编码失败
    pub fn shrink(data_uri: &str, opts: &ShrinkOptions) -> Result<String, ConversionError> {
        let (_, bytes) = payload::decode_data_uri(data_uri)?;

        let img = image::load_from_memory(&bytes)
            .map_err(|e| ConversionError::DecodeFailed(format!("图片解码失败: {}", e)))?;

        let img = Self::fit_within(img, opts.max_width, opts.max_height);

        let (width, height) = img.dimensions();
        if width <= Self::WEBP_MAX_DIMENSION && height <= Self::WEBP_MAX_DIMENSION {
            Self::encode_webp(&img, opts.webp_quality)
        } else {
            Self::encode_jpeg(&img, opts.jpeg_quality)
        }
    }

    /// 异步生成模糊占位图
    pub async fn blur_placeholder_async(
        data_uri: String,
        size: u32,
        quality: u8,
    ) -> Result<String, ConversionError> {
        task::spawn_blocking(move || Self::blur_placeholder(&data_uri, size, quality))
            .await
            .map_err(|e| ConversionError::ConversionFailed(format!("任务执行失败: {}", e)))?
    }

    /// 生成模糊占位图
    ///
    /// 将图片粗降采样到 `size x size` 并以低质量 JPEG 编码，
    /// 展示时配合模糊滤镜作为渐进加载的第一阶段。
    ///
    /// # 参数
    /// - `data_uri`: 内联图片负载
    /// - `size`: 占位图边长（像素）
    /// - `quality`: JPEG 质量（0-100）
    pub fn blur_placeholder(
        data_uri: &str,
        size: u32,
        quality: u8,
    ) -> Result<String, ConversionError> {
        let (_, bytes) = payload::decode_data_uri(data_uri)?;

        let img = image::load_from_memory(&bytes)
            .map_err(|e| ConversionError::DecodeFailed(format!("图片解码失败: {}", e)))?;

        let small = img.resize_exact(size, size, FilterType::Triangle);
        Self::encode_jpeg(&small, quality)
    }

    /// 缩放到边界框内（保持纵横比）
    ///
    /// 已在边界框内的图片原样返回，绝不放大
    fn fit_within(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
        let (width, height) = img.dimensions();
        if width <= max_width && height <= max_height {
            return img;
        }
        img.resize(max_width, max_height, FilterType::Triangle)
    }

    /// 编码为有损 WebP data URI
    fn encode_webp(img: &DynamicImage, quality: f32) -> Result<String, ConversionError> {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let encoder = webp::Encoder::from_rgba(&rgba, width, height);
        let data = encoder.encode(quality);

        Ok(payload::encode_data_uri("image/webp", &data))
    }

    /// 编码为 JPEG data URI
    fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<String, ConversionError> {
        let rgb = img.to_rgb8();

        let mut buffer = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        encoder
            .encode_image(&rgb)
            .map_err(|e| ConversionError::EncodeFailed(format!("JPEG 编码失败: {}", e)))?;

        Ok(payload::encode_data_uri("image/jpeg", &buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use std::io::Cursor;

    /// 创建测试用的 PNG data URI
    fn create_test_png(width: u32, height: u32) -> String {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([255, 0, 0]),
        ));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        payload::encode_data_uri("image/png", &buffer)
    }

    #[test]
    fn test_shrink_produces_webp_data_uri() {
        let data_uri = create_test_png(4, 4);
        let result = ImageCompressor::shrink(&data_uri, &ShrinkOptions::default()).unwrap();
        assert!(result.starts_with("data:image/webp;base64,"));

        // 压缩结果仍能解码为有效图片
        let (_, bytes) = payload::decode_data_uri(&result).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!(img.dimensions(), (4, 4));
    }

    #[test]
    fn test_shrink_fits_large_image_into_bounding_box() {
        let data_uri = create_test_png(1600, 600);
        let result = ImageCompressor::shrink(&data_uri, &ShrinkOptions::default()).unwrap();

        let (_, bytes) = payload::decode_data_uri(&result).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        let (width, height) = img.dimensions();

        // 边界框 800x600，保持纵横比
        assert!(width <= 800);
        assert!(height <= 600);
        assert_eq!(width, 800);
        assert_eq!(height, 300);
    }

    #[test]
    fn test_shrink_does_not_upscale() {
        let data_uri = create_test_png(10, 10);
        let result = ImageCompressor::shrink(&data_uri, &ShrinkOptions::default()).unwrap();

        let (_, bytes) = payload::decode_data_uri(&result).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!(img.dimensions(), (10, 10));
    }

    #[test]
    fn test_shrink_rejects_remote_url() {
        let result =
            ImageCompressor::shrink("https://example.com/image.jpg", &ShrinkOptions::default());
        assert!(matches!(result, Err(ConversionError::NotInlineData)));
    }

    #[test]
    fn test_shrink_rejects_corrupted_payload() {
        let data_uri = payload::encode_data_uri("image/png", &[0x00, 0x01, 0x02, 0x03]);
        let result = ImageCompressor::shrink(&data_uri, &ShrinkOptions::default());
        assert!(matches!(result, Err(ConversionError::DecodeFailed(_))));
    }

    #[test]
    fn test_blur_placeholder() {
        let data_uri = create_test_png(100, 80);
        let result = ImageCompressor::blur_placeholder(&data_uri, 20, 30).unwrap();
        assert!(result.starts_with("data:image/jpeg;base64,"));

        let (_, bytes) = payload::decode_data_uri(&result).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!(img.dimensions(), (20, 20));
    }

    #[tokio::test]
    async fn test_shrink_async() {
        let data_uri = create_test_png(4, 4);
        let result = ImageCompressor::shrink_async(data_uri, ShrinkOptions::default())
            .await
            .unwrap();
        assert!(result.starts_with("data:image/webp;base64,"));
    }

    #[tokio::test]
    async fn test_concurrent_conversions() {
        // 并发转换（模拟实际使用场景）
        let (result1, result2, result3) = tokio::join!(
            ImageCompressor::shrink_async(create_test_png(4, 4), ShrinkOptions::default()),
            ImageCompressor::blur_placeholder_async(create_test_png(64, 64), 20, 30),
            ImageCompressor::shrink_async(create_test_png(8, 8), ShrinkOptions::default()),
        );

        assert!(result1.is_ok());
        assert!(result2.is_ok());
        assert!(result3.is_ok());
    }
}
