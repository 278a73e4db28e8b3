// 图片生成协作方接口
//
// 缓存和预加载器将图片生成视为不透明的远程调用：可能很慢、
// 可能失败，从不探查其内部协议。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 图片生成结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedImage {
    /// 生成的图片（远程 URL 或内联 data URI）
    pub image_url: String,
}

/// 图片生成协作方
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// 根据提示词生成一张图片
    async fn generate_image(&self, prompt: &str) -> anyhow::Result<GeneratedImage>;
}
