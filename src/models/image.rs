// 图片缓存数据模型
//
// 定义了缓存条目的持久化记录、统计快照和渐进图片对

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 负载编码标记
///
/// 区分内联 data URI 负载和远程 URL 负载，
/// 决定写入时是否尝试压缩
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ImageEncoding {
    /// 内联 data URI（base64 编码的图片数据）
    Inline,

    /// 远程 URL
    RemoteUrl,
}

/// 缓存条目（持久化记录）
///
/// 每个键对应一条记录；覆盖写入会完整替换旧记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedImage {
    /// 缓存键（调用方构造的不透明字符串）
    pub key: String,

    /// 原始负载（远程 URL 或内联 data URI）
    pub payload: String,

    /// 压缩后的负载（仅内联图片压缩成功时存在）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed: Option<String>,

    /// 写入时间戳
    pub created_at: DateTime<Utc>,

    /// 记录的近似大小（字节），对应实际可取回的负载
    pub size: u64,

    /// 负载编码标记
    pub encoding: ImageEncoding,
}

impl CachedImage {
    /// 实际可取回的负载（优先压缩版本）
    pub fn retrievable(&self) -> &str {
        self.compressed.as_deref().unwrap_or(&self.payload)
    }

    /// 判断条目是否超龄
    pub fn is_expired(&self, max_age: chrono::Duration) -> bool {
        Utc::now() - self.created_at > max_age
    }
}

/// 缓存统计快照
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheStats {
    /// 当前条目数
    pub total_images: u64,

    /// 聚合大小（字节）
    pub total_size: u64,

    /// 命中率（0.0 - 1.0）
    pub hit_rate: f64,

    /// 上次清理时间
    pub last_cleanup: DateTime<Utc>,
}

impl CacheStats {
    /// 零状态统计
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            total_images: 0,
            total_size: 0,
            hit_rate: 0.0,
            last_cleanup: now,
        }
    }
}

/// 渐进图片对
///
/// 模糊占位图先行展示，完整图片就绪后替换
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressiveImage {
    /// 低分辨率模糊占位图（data URI）
    pub blurred: String,

    /// 完整分辨率图片
    pub full: String,
}
