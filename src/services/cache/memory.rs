// 内存缓存层
//
// 两级缓存中的快速层：共享字符串映射，读取无 I/O。
// 过期判断由持久层记录承担，本层不维护 TTL。

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// 内存缓存层
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().ok()?;
        entries.get(key).cloned()
    }

    pub fn insert(&self, key: String, value: String) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, value);
        }
    }

    pub fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let cache = MemoryCache::new();

        // 测试设置和获取
        cache.insert("key1".to_string(), "value1".to_string());
        assert_eq!(cache.get("key1"), Some("value1".to_string()));

        // 测试不存在的键
        assert_eq!(cache.get("nonexistent"), None);

        // 测试删除
        cache.remove("key1");
        assert_eq!(cache.get("key1"), None);
    }

    #[test]
    fn test_insert_replaces_existing() {
        let cache = MemoryCache::new();
        cache.insert("key1".to_string(), "old".to_string());
        cache.insert("key1".to_string(), "new".to_string());
        assert_eq!(cache.get("key1"), Some("new".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = MemoryCache::new();
        cache.insert("key1".to_string(), "value1".to_string());
        cache.insert("key2".to_string(), "value2".to_string());
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("key1"), None);
    }

    #[test]
    fn test_clones_share_entries() {
        // 克隆的实例共享同一底层映射（服务对象按引用传递）
        let cache = MemoryCache::new();
        let clone = cache.clone();

        cache.insert("key1".to_string(), "value1".to_string());
        assert_eq!(clone.get("key1"), Some("value1".to_string()));
    }
}
