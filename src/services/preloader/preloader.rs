// 图片预加载器 - 优先级批量预取
//
// 本模块将"即将需要图片 X"与"现在获取图片 X"解耦，负责：
// - 按优先级排序的批量处理（显式排水循环，合并窗口内的请求）
// - 每键代数计数（同键的新调用取代旧调用，过期结果静默丢弃）
// - 渐进加载（模糊占位图 + 完整图片对）
// - 菜谱步骤的批量注册
//
// 单个任务的生成失败被记录为 Error 状态，绝不阻塞同批或后续
// 批次的兄弟任务。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::time::sleep;
use tracing::{debug, error, trace, warn};

use crate::external::generator::ImageGenerator;
use crate::models::{recipe_image_key, step_image_key, ProgressiveImage, RecipeStep, RecipeSummary};
use crate::services::cache::config::PreloaderConfig;
use crate::services::cache::compressor::ImageCompressor;
use crate::services::cache::image_cache::ImageCache;
use crate::services::cache::payload::PayloadDetector;
use crate::services::preloader::task::{
    LoadState, PreloadOptions, PreloaderStats, Priority, QueuedTask,
};

/// 预加载的取图结果
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedImage {
    /// 完整图片（来自缓存）
    Full(String),

    /// 渐进图片对（完整图片尚未入缓存或缓存未命中）
    Progressive(ProgressiveImage),
}

/// 单个键的登记状态
#[derive(Debug, Clone, Copy)]
struct KeyState {
    state: LoadState,
    generation: u64,
}

/// 预加载器内部状态（锁内快速操作，绝不跨 await 持有）
#[derive(Default)]
struct PreloaderState {
    /// 待处理任务（仅 Pending 的低/中优先级任务在队列中）
    queue: HashMap<String, QueuedTask>,

    /// 键 -> (状态, 最新代数)
    states: HashMap<String, KeyState>,

    /// 键 -> 渐进图片对
    progressive: HashMap<String, ProgressiveImage>,

    /// 提交序号计数
    next_seq: u64,

    /// 排水循环是否在运行
    drain_running: bool,
}

/// 图片预加载器
///
/// 显式构造、按引用传递的服务对象；克隆共享同一底层状态
#[derive(Clone)]
pub struct ImagePreloader {
    cache: ImageCache,
    generator: Option<Arc<dyn ImageGenerator>>,
    config: Arc<PreloaderConfig>,
    state: Arc<Mutex<PreloaderState>>,
}

impl ImagePreloader {
    /// 创建预加载器（默认批处理配置）
    ///
    /// # 参数
    /// - `cache`: 底层图片缓存
    /// - `generator`: 图片生成协作方；为 `None` 时所有加载立即失败
    pub fn new(cache: ImageCache, generator: Option<Arc<dyn ImageGenerator>>) -> Self {
        Self::with_config(cache, generator, PreloaderConfig::default())
    }

    /// 使用指定批处理配置创建预加载器
    pub fn with_config(
        cache: ImageCache,
        generator: Option<Arc<dyn ImageGenerator>>,
        config: PreloaderConfig,
    ) -> Self {
        Self {
            cache,
            generator,
            config: Arc::new(config),
            state: Arc::new(Mutex::new(PreloaderState::default())),
        }
    }

    /// 注册预加载任务
    ///
    /// 高优先级任务立即开始加载（无批处理延迟）；其余任务进入队列，
    /// 由排水循环在合并窗口后按优先级分批处理。
    ///
    /// 对同一键的重复调用作为新任务处理（重新进入 Pending），并使
    /// 仍在途的旧任务结果失效：只有最新代数的完成结果会被提交。
    pub fn preload(&self, key: &str, prompt: &str, options: PreloadOptions) {
        let task = {
            let Ok(mut st) = self.state.lock() else {
                return;
            };

            // 代数取自全局提交序号：单调且永不复用，清空队列后
            // 在途任务的旧代数不会与新任务冲突
            let seq = st.next_seq;
            st.next_seq += 1;
            let generation = seq;

            st.states.insert(
                key.to_string(),
                KeyState {
                    state: LoadState::Pending,
                    generation,
                },
            );

            let task = QueuedTask {
                key: key.to_string(),
                prompt: prompt.to_string(),
                options,
                generation,
                seq,
            };

            if options.priority == Priority::High {
                task
            } else {
                st.queue.insert(key.to_string(), task);
                drop(st);
                self.ensure_drain_loop();
                return;
            }
        };

        // 高优先级：立即加载
        let this = self.clone();
        tokio::spawn(async move {
            this.load_image(task).await;
        });
    }

    /// 获取图片（纯读，绝不触发加载）
    ///
    /// 先查缓存；缓存未命中时返回在途的渐进图片对（如有）
    pub async fn get_image(&self, key: &str) -> Option<LoadedImage> {
        if let Some(cached) = self.cache.get(key).await {
            return Some(LoadedImage::Full(cached));
        }

        let st = self.state.lock().ok()?;
        st.progressive.get(key).cloned().map(LoadedImage::Progressive)
    }

    /// 查询某个键的加载状态
    ///
    /// 从未注册的键返回 `None`
    pub fn loading_state(&self, key: &str) -> Option<LoadState> {
        let st = self.state.lock().ok()?;
        st.states.get(key).map(|ks| ks.state)
    }

    /// 预加载菜谱步骤配图
    ///
    /// 当前及下一步最高优先级（渐进加载），其后两步中等优先级，
    /// 其余最低优先级：永远不为远处的步骤阻塞，紧邻的视觉内容
    /// 永远先就绪。
    pub fn preload_recipe_steps(
        &self,
        recipe_title: &str,
        steps: &[RecipeStep],
        current_step: usize,
    ) {
        for (index, step) in steps.iter().enumerate() {
            let key = step_image_key(recipe_title, index, &step.instruction);

            let priority = if index <= current_step + 1 {
                Priority::High
            } else if index <= current_step + 3 {
                Priority::Medium
            } else {
                Priority::Low
            };

            self.preload(
                &key,
                &step.image_prompt,
                PreloadOptions {
                    priority,
                    progressive: priority == Priority::High,
                },
            );
        }
    }

    /// 预加载热门菜谱封面图（最多 5 个，最低优先级）
    pub fn preload_popular_recipes(&self, recipes: &[RecipeSummary]) {
        for recipe in recipes.iter().take(5) {
            let key = recipe_image_key(&recipe.id);
            self.preload(
                &key,
                &format!("Delicious {} recipe", recipe.title),
                PreloadOptions {
                    priority: Priority::Low,
                    progressive: false,
                },
            );
        }
    }

    /// 获取队列统计快照
    pub fn stats(&self) -> PreloaderStats {
        let Ok(st) = self.state.lock() else {
            return PreloaderStats::default();
        };

        let mut stats = PreloaderStats {
            total: st.states.len(),
            ..PreloaderStats::default()
        };
        for ks in st.states.values() {
            match ks.state {
                LoadState::Pending => stats.pending += 1,
                LoadState::Loading => stats.loading += 1,
                LoadState::Loaded => stats.loaded += 1,
                LoadState::Error => stats.error += 1,
            }
        }
        stats
    }

    /// 清空预加载队列
    ///
    /// 丢弃所有任务登记和渐进图片对；不触碰底层缓存。
    /// 在途任务的后续完成因代数失效而被静默丢弃。
    pub fn clear_queue(&self) {
        if let Ok(mut st) = self.state.lock() {
            st.queue.clear();
            st.states.clear();
            st.progressive.clear();
        }
    }

    /// 确保排水循环在运行
    fn ensure_drain_loop(&self) {
        {
            let Ok(mut st) = self.state.lock() else {
                return;
            };
            if st.drain_running {
                return;
            }
            st.drain_running = true;
        }

        let this = self.clone();
        tokio::spawn(async move {
            this.drain_queue().await;
        });
    }

    /// 排水循环
    ///
    /// 先等待合并窗口（窗口内到达的请求合并为一轮处理），然后反复
    /// 取出优先级最高的一批待处理任务并发执行，批间等待固定延迟，
    /// 队列取空后退出。
    async fn drain_queue(&self) {
        sleep(self.config.coalesce_window()).await;

        loop {
            let batch = {
                let Ok(mut st) = self.state.lock() else {
                    return;
                };

                let mut pending: Vec<QueuedTask> = st.queue.values().cloned().collect();
                if pending.is_empty() {
                    st.drain_running = false;
                    return;
                }

                pending.sort();
                pending.truncate(self.config.batch_size);
                for task in &pending {
                    st.queue.remove(&task.key);
                }
                pending
            };

            debug!("开始处理预加载批次: 任务数={}", batch.len());

            // 并发执行本批任务；逐个 join，单个任务失败不影响兄弟任务
            let mut handles = Vec::new();
            for task in batch {
                let this = self.clone();
                handles.push(tokio::spawn(async move {
                    this.load_image(task).await;
                }));
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    error!("预加载任务执行失败: {}", e);
                }
            }

            // 批间延迟，避免打爆外部生成器
            let more = {
                let Ok(st) = self.state.lock() else { return };
                !st.queue.is_empty()
            };
            if more {
                sleep(self.config.batch_delay()).await;
            }
        }
    }

    /// 加载单个图片
    async fn load_image(&self, task: QueuedTask) {
        // 进入 Loading；期间有新的同键调用则本任务已过期，直接放弃
        {
            let Ok(mut st) = self.state.lock() else {
                return;
            };
            match st.states.get(&task.key) {
                Some(ks) if ks.generation == task.generation => {
                    st.states.insert(
                        task.key.clone(),
                        KeyState {
                            state: LoadState::Loading,
                            generation: task.generation,
                        },
                    );
                }
                _ => {
                    trace!("任务已被取代，放弃加载: key={}", task.key);
                    return;
                }
            }
        }

        // 未配置生成器：立即确定性失败，不挂起
        let Some(generator) = self.generator.clone() else {
            warn!("未配置图片生成器，预加载失败: key={}", task.key);
            self.finish(&task, LoadState::Error, None);
            return;
        };

        match generator.generate_image(&task.prompt).await {
            Ok(generated) => {
                let image_url = generated.image_url;

                // 渐进加载：为内联结果派生模糊占位图；派生失败时退化为
                // 仅使用完整图片
                let progressive = if task.options.progressive
                    && PayloadDetector::is_inline_image(&image_url)
                {
                    match ImageCompressor::blur_placeholder_async(
                        image_url.clone(),
                        self.config.placeholder_size,
                        self.config.placeholder_quality,
                    )
                    .await
                    {
                        Ok(blurred) => Some(ProgressiveImage {
                            blurred,
                            full: image_url.clone(),
                        }),
                        Err(e) => {
                            warn!(
                                "模糊占位图生成失败，使用完整图片: key={}, error={}",
                                task.key, e
                            );
                            None
                        }
                    }
                } else {
                    None
                };

                // 仅当仍是最新代数时提交结果
                if !self.is_latest(&task) {
                    trace!("丢弃过期任务结果: key={}", task.key);
                    return;
                }

                self.cache.set(&task.key, &image_url, true).await;
                self.finish(&task, LoadState::Loaded, progressive);
            }
            Err(e) => {
                warn!("图片生成失败: key={}, error={:#}", task.key, e);
                self.finish(&task, LoadState::Error, None);
            }
        }
    }

    /// 判断任务是否仍是该键的最新代数
    fn is_latest(&self, task: &QueuedTask) -> bool {
        self.state
            .lock()
            .ok()
            .and_then(|st| st.states.get(&task.key).map(|ks| ks.generation))
            == Some(task.generation)
    }

    /// 提交任务的最终状态（代数过期时静默丢弃）
    fn finish(&self, task: &QueuedTask, state: LoadState, progressive: Option<ProgressiveImage>) {
        let Ok(mut st) = self.state.lock() else {
            return;
        };

        match st.states.get(&task.key) {
            Some(ks) if ks.generation == task.generation => {
                st.states.insert(
                    task.key.clone(),
                    KeyState {
                        state,
                        generation: task.generation,
                    },
                );
                if let Some(pair) = progressive {
                    st.progressive.insert(task.key.clone(), pair);
                }
            }
            _ => {
                trace!("丢弃过期任务结果: key={}", task.key);
            }
        }
    }
}
