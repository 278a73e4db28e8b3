// 条目存储 - 缓存持久层
//
// 本模块提供缓存条目的持久化存储，包括：
// - 每个条目一个 JSON 文档，文件名由键的 SHA-256 摘要派生
// - 统计快照的读写
// - 对外部清空/篡改的容错（损坏条目按未命中处理）
//
// 持久层是纯优化层：读失败一律视为未命中，写失败由调用方
// 捕获并降级，绝不阻塞主图片获取路径。

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::models::{CacheStats, CachedImage};
use crate::services::cache::error::{CacheError, StorageError};

/// 条目存储
///
/// 管理缓存目录下的条目文档和统计快照
#[derive(Debug, Clone)]
pub struct EntryStore {
    /// 条目目录
    entries_dir: PathBuf,

    /// 统计快照路径
    stats_path: PathBuf,
}

impl EntryStore {
    /// 条目子目录名
    const ENTRIES_DIR: &'static str = "entries";

    /// 统计快照文件名
    const STATS_FILE: &'static str = "stats.json";

    /// 打开（或创建）缓存目录下的条目存储
    ///
    /// # 参数
    /// - `cache_dir`: 缓存根目录
    ///
    /// # 返回
    /// - `Ok(EntryStore)`: 存储实例
    /// - `Err(CacheError)`: 目录创建失败
    pub async fn open(cache_dir: &Path) -> Result<Self, CacheError> {
        let entries_dir = cache_dir.join(Self::ENTRIES_DIR);
        fs::create_dir_all(&entries_dir).await.map_err(|e| {
            StorageError::CreateDirFailed(format!("{}: {}", entries_dir.display(), e))
        })?;

        Ok(Self {
            entries_dir,
            stats_path: cache_dir.join(Self::STATS_FILE),
        })
    }

    /// 由缓存键生成条目文件路径
    ///
    /// 键是调用方构造的任意字符串（可能包含路径分隔符等），
    /// 使用 SHA-256 摘要映射为安全的文件名
    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.entries_dir.join(format!("{:x}.json", digest))
    }

    /// 读取条目
    ///
    /// 任何失败（文件缺失、损坏、权限）都返回 `None`；
    /// 损坏的条目文件会被删除
    pub async fn read(&self, key: &str) -> Option<CachedImage> {
        let path = self.entry_path(key);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("读取缓存条目失败: key={}, error={}", key, e);
                return None;
            }
        };

        match serde_json::from_str::<CachedImage>(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                // 条目损坏（可能被外部篡改），删除并按未命中处理
                warn!("缓存条目损坏，已删除: key={}, error={}", key, e);
                let _ = fs::remove_file(&path).await;
                None
            }
        }
    }

    /// 写入条目（覆盖同键的旧条目）
    pub async fn write(&self, entry: &CachedImage) -> Result<(), StorageError> {
        let path = self.entry_path(&entry.key);

        let json = serde_json::to_string(entry)
            .map_err(|e| StorageError::CorruptedEntry(format!("序列化条目失败: {}", e)))?;

        fs::write(&path, json)
            .await
            .map_err(|e| StorageError::WriteFileFailed(format!("{}: {}", path.display(), e)))?;

        debug!("缓存条目已写入: key={}, size={}", entry.key, entry.size);
        Ok(())
    }

    /// 删除条目
    ///
    /// # 返回
    /// - `true`: 条目存在且已删除
    /// - `false`: 条目不存在或删除失败（已记录日志）
    pub async fn remove(&self, key: &str) -> bool {
        let path = self.entry_path(key);

        match fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!("删除缓存条目失败: key={}, error={}", key, e);
                false
            }
        }
    }

    /// 列出所有条目
    ///
    /// 遍历条目目录，跳过无法读取或解析的文件
    pub async fn list(&self) -> Vec<CachedImage> {
        let mut entries = Vec::new();

        let mut dir = match fs::read_dir(&self.entries_dir).await {
            Ok(dir) => dir,
            Err(e) => {
                warn!("遍历缓存目录失败: {}", e);
                return entries;
            }
        };

        loop {
            let item = match dir.next_entry().await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    warn!("读取目录项失败: {}", e);
                    break;
                }
            };

            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str::<CachedImage>(&content) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => {
                        warn!("跳过损坏的缓存条目: {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("跳过无法读取的缓存条目: {}: {}", path.display(), e);
                }
            }
        }

        entries
    }

    /// 删除所有条目
    ///
    /// # 返回
    /// 删除的条目数
    pub async fn clear(&self) -> usize {
        let mut removed = 0;

        let mut dir = match fs::read_dir(&self.entries_dir).await {
            Ok(dir) => dir,
            Err(e) => {
                warn!("遍历缓存目录失败: {}", e);
                return removed;
            }
        };

        while let Ok(Some(item)) = dir.next_entry().await {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("删除缓存条目失败: {}: {}", path.display(), e),
            }
        }

        removed
    }

    /// 读取统计快照（容错：任何失败返回 `None`）
    pub async fn load_stats(&self) -> Option<CacheStats> {
        let content = fs::read_to_string(&self.stats_path).await.ok()?;
        match serde_json::from_str(&content) {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!("统计快照损坏，重置统计: {}", e);
                None
            }
        }
    }

    /// 保存统计快照（容错：失败仅记录日志）
    pub async fn save_stats(&self, stats: &CacheStats) {
        let json = match serde_json::to_string_pretty(stats) {
            Ok(json) => json,
            Err(e) => {
                warn!("序列化统计快照失败: {}", e);
                return;
            }
        };

        if let Err(e) = fs::write(&self.stats_path, json).await {
            warn!("保存统计快照失败: {}", e);
        }
    }
}
