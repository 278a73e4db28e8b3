pub mod cache;
pub mod preloader;

pub use cache::{
    CacheCleanupTask, CacheError, ImageCache, ImageCacheConfig, PreloaderConfig, ShrinkOptions,
};
pub use preloader::{ImagePreloader, LoadState, LoadedImage, PreloadOptions, Priority};
