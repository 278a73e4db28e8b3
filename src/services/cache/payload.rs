// 负载检测器 - 区分内联图片数据和远程 URL
//
// 本模块提供缓存负载的分类功能，决定写入时是否尝试压缩，
// 并提供 data URI 的编解码辅助函数

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::models::ImageEncoding;
use crate::services::cache::error::ConversionError;

/// data URI 前缀（内联图片负载）
const INLINE_IMAGE_PREFIX: &str = "data:image/";

/// base64 负载分隔标记
const BASE64_MARKER: &str = ";base64,";

/// 负载检测器
///
/// 用于区分内联 data URI 负载和远程 URL 负载
#[derive(Clone, Copy)]
pub struct PayloadDetector;

impl PayloadDetector {
    /// 检测负载是否为内联图片数据
    ///
    /// # 检测规则
    /// 以 `data:image/` 开头的负载视为内联图片
    ///
    /// # 示例
    /// ```
    /// use feedme_image_cache::services::cache::PayloadDetector;
    ///
    /// assert!(PayloadDetector::is_inline_image("data:image/png;base64,AAAA"));
    /// assert!(!PayloadDetector::is_inline_image("https://example.com/image.jpg"));
    /// ```
    pub fn is_inline_image(payload: &str) -> bool {
        payload.starts_with(INLINE_IMAGE_PREFIX)
    }

    /// 对负载分类
    pub fn classify(payload: &str) -> ImageEncoding {
        if Self::is_inline_image(payload) {
            ImageEncoding::Inline
        } else {
            ImageEncoding::RemoteUrl
        }
    }
}

/// 解码 data URI 为 (MIME 类型, 原始字节)
///
/// # 参数
/// - `data_uri`: 形如 `data:image/png;base64,AAAA` 的字符串
///
/// # 返回
/// - `Ok((mime, bytes))`: MIME 类型和解码后的字节
/// - `Err(ConversionError)`: 不是内联图片或格式无效
pub fn decode_data_uri(data_uri: &str) -> Result<(String, Vec<u8>), ConversionError> {
    if !PayloadDetector::is_inline_image(data_uri) {
        return Err(ConversionError::NotInlineData);
    }

    let rest = &data_uri["data:".len()..];
    let marker = rest
        .find(BASE64_MARKER)
        .ok_or_else(|| ConversionError::InvalidDataUri("缺少 base64 标记".to_string()))?;

    let mime = rest[..marker].to_string();
    let encoded = &rest[marker + BASE64_MARKER.len()..];

    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| ConversionError::InvalidDataUri(format!("base64 解码失败: {}", e)))?;

    Ok((mime, bytes))
}

/// 由 MIME 类型和字节构造 data URI
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{}{}{}", mime, BASE64_MARKER, BASE64.encode(bytes))
}
