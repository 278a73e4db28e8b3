// 图片缓存服务 - 两级缓存的统一入口
//
// 本模块是缓存功能的核心服务，负责：
// - 两级查找（内存层 -> 持久层）与内存层晋升
// - 写直达存储与可选的存储压缩
// - 大小/年龄上限的执行（溢出触发同步清理，超龄条目读取时删除）
// - 命中率等统计的维护与持久化
//
// 缓存是纯优化层：持久层故障被就地捕获并降级为未命中/空操作，
// 绝不阻塞调用方的主图片获取路径。

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::models::{CacheStats, CachedImage};
use crate::services::cache::compressor::ImageCompressor;
use crate::services::cache::config::ImageCacheConfig;
use crate::services::cache::error::CacheError;
use crate::services::cache::memory::MemoryCache;
use crate::services::cache::payload::PayloadDetector;
use crate::services::cache::store::EntryStore;

/// 清理目标比例：清理后聚合大小收缩到上限的 80%
const CLEANUP_TARGET_RATIO: f64 = 0.8;

/// 图片缓存服务
///
/// 显式构造、按引用传递的服务对象；克隆共享同一底层状态
#[derive(Clone)]
pub struct ImageCache {
    /// 缓存配置
    config: Arc<ImageCacheConfig>,

    /// 内存缓存层
    memory: MemoryCache,

    /// 持久层
    store: EntryStore,

    /// 统计状态
    stats: Arc<RwLock<CacheStats>>,
}

impl ImageCache {
    /// 打开图片缓存
    ///
    /// 创建缓存目录（如不存在）并加载上次的统计快照。
    ///
    /// # 参数
    /// - `config`: 缓存配置
    ///
    /// # 返回
    /// - `Result<Self, CacheError>`: 缓存实例或错误
    ///
    /// # 示例
    /// ```no_run
    /// use feedme_image_cache::services::cache::{ImageCache, ImageCacheConfig};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ImageCacheConfig::with_cache_dir("image_cache".into());
    /// let cache = ImageCache::open(config).await?;
    /// cache.set("recipe-1", "https://example.com/soup.jpg", false).await;
    /// assert!(cache.get("recipe-1").await.is_some());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open(config: ImageCacheConfig) -> Result<Self, CacheError> {
        let store = EntryStore::open(&config.cache_dir).await?;

        // 统计快照缺失或损坏时从零状态开始
        let stats = store
            .load_stats()
            .await
            .unwrap_or_else(|| CacheStats::fresh(Utc::now()));

        info!(
            "图片缓存已打开: dir={}, 条目数={}, 聚合大小={}",
            config.cache_dir.display(),
            stats.total_images,
            stats.total_size
        );

        Ok(Self {
            config: Arc::new(config),
            memory: MemoryCache::new(),
            store,
            stats: Arc::new(RwLock::new(stats)),
        })
    }

    /// 获取缓存的图片
    ///
    /// 先查内存层（无 I/O），未命中再查持久层；持久层命中且未超龄时
    /// 晋升到内存层。超龄条目被删除并按未命中处理。
    ///
    /// 每次调用都会更新命中率统计。键不存在不是错误，返回 `None`。
    pub async fn get(&self, key: &str) -> Option<String> {
        // 1. 内存层（最快）
        if let Some(hit) = self.memory.get(key) {
            self.record_access(true).await;
            return Some(hit);
        }

        // 2. 持久层
        let entry = match self.store.read(key).await {
            Some(entry) => entry,
            None => {
                self.record_access(false).await;
                return None;
            }
        };

        // 超龄条目删除后按未命中处理，不晋升到内存层
        if entry.is_expired(self.config.max_age()) {
            debug!("缓存条目超龄，已删除: key={}", key);
            self.delete(key).await;
            self.record_access(false).await;
            return None;
        }

        let value = entry.retrievable().to_string();
        self.memory.insert(key.to_string(), value.clone());
        self.record_access(true).await;
        Some(value)
    }

    /// 写入图片（写直达）
    ///
    /// `compress` 为 true 且负载是内联图片时，先尝试存储压缩
    /// （降采样 + 有损重编码）；压缩失败绝不致命，回退存储原始负载。
    ///
    /// 写入后若聚合大小超过上限，在返回前执行同步清理。
    /// 持久层写入失败被捕获并记录，缓存降级为空操作。
    pub async fn set(&self, key: &str, image: &str, compress: bool) {
        let encoding = PayloadDetector::classify(image);

        // 仅对内联图片尝试压缩
        let compressed = if compress && PayloadDetector::is_inline_image(image) {
            match ImageCompressor::shrink_async(image.to_string(), self.config.shrink.clone()).await
            {
                Ok(shrunk) => Some(shrunk),
                Err(e) => {
                    warn!("图片压缩失败，保留原始负载: key={}, error={}", key, e);
                    None
                }
            }
        } else {
            None
        };

        let stored = compressed
            .clone()
            .unwrap_or_else(|| image.to_string());
        let size = stored.len() as u64;

        let entry = CachedImage {
            key: key.to_string(),
            payload: image.to_string(),
            compressed,
            created_at: Utc::now(),
            size,
            encoding,
        };

        // 覆盖同键条目时按差值调整统计
        let prior = self.store.read(key).await;

        if let Err(e) = self.store.write(&entry).await {
            warn!("写入持久层失败，跳过缓存: key={}, error={}", key, e);
            return;
        }

        self.memory.insert(key.to_string(), stored);

        {
            let mut stats = self.stats.write().await;
            match prior {
                Some(old) => {
                    stats.total_size = stats.total_size.saturating_sub(old.size) + size;
                }
                None => {
                    stats.total_images += 1;
                    stats.total_size += size;
                }
            }
        }
        self.persist_stats().await;

        // 溢出时同步清理
        let total = self.stats.read().await.total_size;
        if total > self.config.max_cache_size {
            self.cleanup().await;
        }
    }

    /// 删除缓存的图片
    ///
    /// 从两级缓存中移除；条目数下限为零；对不存在的键幂等
    pub async fn delete(&self, key: &str) {
        let prior = self.store.read(key).await;
        self.store.remove(key).await;
        self.memory.remove(key);

        if let Some(old) = prior {
            {
                let mut stats = self.stats.write().await;
                stats.total_images = stats.total_images.saturating_sub(1);
                stats.total_size = stats.total_size.saturating_sub(old.size);
            }
            self.persist_stats().await;
        }
    }

    /// 清空整个缓存
    ///
    /// 移除两级缓存的所有条目并重置统计为零状态
    pub async fn clear(&self) {
        let removed = self.store.clear().await;
        self.memory.clear();

        {
            let mut stats = self.stats.write().await;
            *stats = CacheStats::fresh(Utc::now());
        }
        self.persist_stats().await;

        info!("缓存已清空: 删除条目数={}", removed);
    }

    /// 获取统计快照（只读，不改变缓存状态）
    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }

    /// 执行清理
    ///
    /// 按写入时间最旧优先（同时间戳按键名，保证每轮确定性）删除条目，
    /// 直到聚合大小收缩到上限的 80%。单个条目的清理失败被记录并跳过，
    /// 不中断整轮清理。
    pub async fn cleanup(&self) {
        info!("开始清理图片缓存");

        let mut entries = self.store.list().await;
        entries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.key.cmp(&b.key))
        });

        let target = (self.config.max_cache_size as f64 * CLEANUP_TARGET_RATIO) as u64;
        let mut current = self.stats.read().await.total_size;
        let mut removed: u64 = 0;

        for entry in entries {
            if current <= target {
                break;
            }

            if !self.store.remove(&entry.key).await {
                warn!("清理条目失败，跳过: key={}", entry.key);
                continue;
            }
            self.memory.remove(&entry.key);

            current = current.saturating_sub(entry.size);
            removed += 1;
        }

        {
            let mut stats = self.stats.write().await;
            stats.total_size = current;
            stats.total_images = stats.total_images.saturating_sub(removed);
            stats.last_cleanup = Utc::now();
        }
        self.persist_stats().await;

        info!("缓存清理完成: 删除条目数={}", removed);
    }

    /// 获取缓存配置
    pub fn config(&self) -> &ImageCacheConfig {
        &self.config
    }

    /// 更新命中率统计
    ///
    /// 按当前条目数加权：命中时向 1.0 收敛，未命中时向 0.0 收敛。
    /// 条目数越大收敛越慢（近期精度随缓存规模增长而平滑退化）。
    async fn record_access(&self, hit: bool) {
        let mut stats = self.stats.write().await;
        let n = stats.total_images as f64;
        let sample = if hit { 1.0 } else { 0.0 };
        stats.hit_rate = (stats.hit_rate * n + sample) / (n + 1.0);
    }

    /// 持久化统计快照（容错）
    async fn persist_stats(&self) {
        let snapshot = self.stats.read().await.clone();
        self.store.save_stats(&snapshot).await;
    }
}

/// 定期清理任务
///
/// 按固定间隔执行缓存清理，配合溢出触发的同步清理使用
pub struct CacheCleanupTask {
    cache: ImageCache,
    interval: Duration,
}

impl CacheCleanupTask {
    pub fn new(cache: ImageCache, interval: Duration) -> Self {
        Self { cache, interval }
    }

    /// 使用配置中的清理间隔创建任务
    pub fn with_config_interval(cache: ImageCache) -> Self {
        let interval = cache.config().cleanup_interval();
        Self::new(cache, interval)
    }

    /// 启动定期清理循环
    ///
    /// # 示例
    /// ```no_run
    /// use feedme_image_cache::services::cache::{CacheCleanupTask, ImageCache, ImageCacheConfig};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let cache = ImageCache::open(ImageCacheConfig::default()).await?;
    /// let task = CacheCleanupTask::with_config_interval(cache.clone());
    /// tokio::spawn(task.start());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start(self) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            interval.tick().await;
            self.cache.cleanup().await;
            debug!("定期缓存清理完成: stats={:?}", self.cache.stats().await);
        }
    }
}
