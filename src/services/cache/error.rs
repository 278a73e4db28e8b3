// 缓存模块错误类型定义
//
// 定义了缓存操作中可能出现的各种错误类型

use std::path::PathBuf;
use thiserror::Error;

/// 缓存操作的统一错误类型
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    #[error("转换错误: {0}")]
    Conversion(#[from] ConversionError),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),
}

/// 持久层相关错误
///
/// 持久层错误在缓存服务内部被捕获并降级为未命中/空操作，
/// 不会向缓存调用方抛出
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("权限被拒绝")]
    PermissionDenied,

    #[error("路径不存在: {0}")]
    PathNotFound(PathBuf),

    #[error("条目损坏: {0}")]
    CorruptedEntry(String),

    #[error("写入文件失败: {0}")]
    WriteFileFailed(String),

    #[error("创建目录失败: {0}")]
    CreateDirFailed(String),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),
}

/// 图片转换相关错误
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("不是内联图片数据")]
    NotInlineData,

    #[error("无效的 data URI: {0}")]
    InvalidDataUri(String),

    #[error("图片解码失败: {0}")]
    DecodeFailed(String),

    #[error("图片编码失败: {0}")]
    EncodeFailed(String),

    #[error("转换失败: {0}")]
    ConversionFailed(String),
}
