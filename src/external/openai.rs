use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::external::generator::{GeneratedImage, ImageGenerator};

/// OpenAI 图片生成 API 客户端
#[derive(Clone)]
pub struct OpenAiImageClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiImageClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "dall-e-2".to_string(),
        }
    }

    /// 覆盖 API 基地址（用于兼容网关或测试）
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// 覆盖生成模型
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    data: Vec<GeneratedImageData>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImageData {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[async_trait]
impl ImageGenerator for OpenAiImageClient {
    /// 生成图片并转换为统一的负载形式
    ///
    /// base64 响应渲染为内联 data URI，URL 响应原样返回
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage> {
        let url = format!("{}/images/generations", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&ImageGenerationRequest {
                model: &self.model,
                prompt,
                n: 1,
                size: "512x512",
                response_format: "b64_json",
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("OpenAI API error: {}", response.status()));
        }

        let body: ImageGenerationResponse = response.json().await?;
        let data = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("OpenAI 未返回图片数据"))?;

        if let Some(b64) = data.b64_json {
            return Ok(GeneratedImage {
                image_url: format!("data:image/png;base64,{}", b64),
            });
        }
        if let Some(url) = data.url {
            return Ok(GeneratedImage { image_url: url });
        }

        Err(anyhow!("OpenAI 响应缺少图片负载"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = ImageGenerationRequest {
            model: "dall-e-2",
            prompt: "Delicious tomato soup",
            n: 1,
            size: "512x512",
            response_format: "b64_json",
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"model\":\"dall-e-2\""));
        assert!(json.contains("\"prompt\":\"Delicious tomato soup\""));
        assert!(json.contains("\"response_format\":\"b64_json\""));
    }

    #[test]
    fn test_response_deserialization_b64() {
        let json = r#"{"data": [{"b64_json": "AAAA"}]}"#;
        let response: ImageGenerationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.data[0].b64_json.as_deref(), Some("AAAA"));
        assert!(response.data[0].url.is_none());
    }

    #[test]
    fn test_response_deserialization_url() {
        let json = r#"{"data": [{"url": "https://example.com/generated.png"}]}"#;
        let response: ImageGenerationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.data[0].url.as_deref(),
            Some("https://example.com/generated.png")
        );
    }
}
