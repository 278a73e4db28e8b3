// 缓存模块 - 菜谱图片两级缓存
//
// 本模块提供菜谱图片的持久化缓存功能，包括：
// - 两级查找（内存层 + 持久层）
// - 存储压缩与模糊占位图
// - 大小/年龄上限与定期清理
// - 命中率统计

pub mod compressor;
pub mod config;
pub mod error;
pub mod image_cache;
pub mod memory;
pub mod payload;
pub mod store;

pub use compressor::ImageCompressor;
pub use config::{ImageCacheConfig, PreloaderConfig, ShrinkOptions};
pub use error::{CacheError, ConversionError, StorageError};
pub use image_cache::{CacheCleanupTask, ImageCache};
pub use memory::MemoryCache;
pub use payload::PayloadDetector;
pub use store::EntryStore;
