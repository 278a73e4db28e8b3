// 预加载任务定义
//
// 定义了预加载优先级、加载状态机和队列任务记录

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 预加载优先级
///
/// 优先级顺序：High > Medium > Low
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// 最高优先级（立即加载，不进入批处理队列）
    High = 1,
    /// 中等优先级
    Medium = 2,
    /// 最低优先级
    Low = 3,
}

/// 单个键的加载状态
///
/// 状态机：`Pending -> Loading -> {Loaded | Error}`；
/// 只有对同一键的新 `preload()` 调用会重新进入 `Pending`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// 已注册，等待处理
    Pending,
    /// 生成调用进行中
    Loading,
    /// 加载成功，结果已入缓存
    Loaded,
    /// 生成失败
    Error,
}

/// 预加载选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadOptions {
    /// 调度优先级
    pub priority: Priority,

    /// 是否请求渐进加载（先模糊占位图后完整图片）
    pub progressive: bool,
}

impl Default for PreloadOptions {
    fn default() -> Self {
        Self {
            priority: Priority::Medium,
            progressive: false,
        }
    }
}

/// 队列中的任务
#[derive(Debug, Clone)]
pub(crate) struct QueuedTask {
    /// 缓存键
    pub key: String,
    /// 生成提示词
    pub prompt: String,
    /// 预加载选项
    pub options: PreloadOptions,
    /// 任务代数（同键的新调用取代旧调用）
    pub generation: u64,
    /// 提交序号（同优先级内保持提交顺序）
    pub seq: u64,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.options.priority == other.options.priority && self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // 优先级数字越小，优先级越高；同优先级按提交顺序
        self.options
            .priority
            .cmp(&other.options.priority)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// 预加载统计快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloaderStats {
    /// 已注册键总数
    pub total: usize,
    /// 等待处理
    pub pending: usize,
    /// 加载中
    pub loading: usize,
    /// 已加载
    pub loaded: usize,
    /// 失败
    pub error: usize,
}
