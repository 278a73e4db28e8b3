// 菜谱图片缓存库
//
// 本库提供菜谱应用的图片获取核心，包括：
// - 两级图片缓存（内存 + 持久化）
// - 存储压缩与模糊占位图
// - 优先级批量预加载
// - 外部图片生成接口

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod external;
pub mod models;
pub mod services;
