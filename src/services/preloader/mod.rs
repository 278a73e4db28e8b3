// 预加载模块 - 优先级批量图片预取
//
// 本模块提供图片的提前获取功能，包括：
// - 优先级排序的批量处理
// - 渐进加载（模糊占位图）
// - 菜谱步骤批量注册
// - 加载状态查询

pub mod preloader;
pub mod task;

pub use preloader::{ImagePreloader, LoadedImage};
pub use task::{LoadState, PreloadOptions, PreloaderStats, Priority};
