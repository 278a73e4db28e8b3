// 缓存配置数据结构
//
// 定义了缓存和预加载器的核心配置，包括：
// - 图片缓存配置（容量、年龄、清理周期）
// - 存储压缩参数
// - 预加载器批处理参数

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 图片缓存配置
///
/// 控制持久层位置、容量上限、条目年龄上限和定期清理周期
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageCacheConfig {
    /// 缓存根目录
    pub cache_dir: PathBuf,

    /// 最大聚合大小（字节）
    /// 超出后触发同步清理，收缩到上限的 80%
    pub max_cache_size: u64,

    /// 条目最大年龄（秒）
    /// 超龄条目在读取时被删除，视为未命中
    pub max_age_secs: u64,

    /// 定期清理间隔（秒）
    pub cleanup_interval_secs: u64,

    /// 存储压缩参数
    #[serde(default)]
    pub shrink: ShrinkOptions,
}

/// 存储压缩参数
///
/// 内联图片在写入持久层前按此参数降采样并重新编码
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShrinkOptions {
    /// 目标边界框宽度（像素）
    pub max_width: u32,

    /// 目标边界框高度（像素）
    pub max_height: u32,

    /// WebP 有损编码质量（0-100）
    pub webp_quality: f32,

    /// JPEG 回退编码质量（0-100）
    pub jpeg_quality: u8,
}

/// 预加载器配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreloaderConfig {
    /// 合并窗口（毫秒）
    /// 窗口内到达的低/中优先级请求合并为一轮处理
    pub coalesce_window_ms: u64,

    /// 单批任务数
    pub batch_size: usize,

    /// 批间延迟（毫秒），避免打爆外部生成器
    pub batch_delay_ms: u64,

    /// 模糊占位图边长（像素）
    pub placeholder_size: u32,

    /// 模糊占位图 JPEG 质量（0-100）
    pub placeholder_quality: u8,
}

impl ImageCacheConfig {
    /// 默认最大聚合大小：50MB
    pub const DEFAULT_MAX_CACHE_SIZE: u64 = 50 * 1024 * 1024;

    /// 默认条目最大年龄：7 天
    pub const DEFAULT_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

    /// 默认清理间隔：24 小时
    pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 24 * 60 * 60;

    /// 使用默认参数和指定的缓存目录创建配置
    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            max_cache_size: Self::DEFAULT_MAX_CACHE_SIZE,
            max_age_secs: Self::DEFAULT_MAX_AGE_SECS,
            cleanup_interval_secs: Self::DEFAULT_CLEANUP_INTERVAL_SECS,
            shrink: ShrinkOptions::default(),
        }
    }

    /// 条目最大年龄
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.max_age_secs as i64)
    }

    /// 定期清理间隔
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Default for ImageCacheConfig {
    /// 默认配置：当前目录下的 `image_cache/`，50MB / 7 天 / 24 小时
    fn default() -> Self {
        Self::with_cache_dir(PathBuf::from("image_cache"))
    }
}

impl Default for ShrinkOptions {
    /// 默认压缩参数：800x600 边界框，WebP 质量 80，JPEG 回退质量 85
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 600,
            webp_quality: 80.0,
            jpeg_quality: 85,
        }
    }
}

impl PreloaderConfig {
    /// 合并窗口
    pub fn coalesce_window(&self) -> Duration {
        Duration::from_millis(self.coalesce_window_ms)
    }

    /// 批间延迟
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

impl Default for PreloaderConfig {
    /// 默认配置：500ms 合并窗口，每批 2 个任务，批间 200ms
    fn default() -> Self {
        Self {
            coalesce_window_ms: 500,
            batch_size: 2,
            batch_delay_ms: 200,
            placeholder_size: 20,
            placeholder_quality: 30,
        }
    }
}
