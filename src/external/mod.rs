pub mod generator;
pub mod openai;

pub use generator::{GeneratedImage, ImageGenerator};
pub use openai::OpenAiImageClient;
