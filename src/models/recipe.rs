// 菜谱数据模型
//
// 定义了预加载器使用的菜谱结构和缓存键构造规则

use serde::{Deserialize, Serialize};

/// 菜谱步骤
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeStep {
    /// 步骤说明文本
    pub instruction: String,

    /// 生成步骤配图的提示词
    pub image_prompt: String,
}

/// 菜谱摘要（用于批量预加载封面图）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeSummary {
    /// 菜谱 ID
    pub id: String,

    /// 菜谱标题
    pub title: String,
}

/// 步骤说明截取长度（字符）
const INSTRUCTION_SNIPPET_LEN: usize = 50;

/// 生成步骤配图的缓存键
///
/// 格式：`{title}-step-{index}-{instruction 前 50 个字符}`
///
/// # 示例
/// ```
/// use feedme_image_cache::models::step_image_key;
///
/// let key = step_image_key("Tomato Soup", 0, "Dice the tomatoes");
/// assert_eq!(key, "Tomato Soup-step-0-Dice the tomatoes");
/// ```
pub fn step_image_key(recipe_title: &str, index: usize, instruction: &str) -> String {
    let snippet: String = instruction.chars().take(INSTRUCTION_SNIPPET_LEN).collect();
    format!("{}-step-{}-{}", recipe_title, index, snippet)
}

/// 生成菜谱封面图的缓存键
pub fn recipe_image_key(recipe_id: &str) -> String {
    format!("recipe-{}", recipe_id)
}
