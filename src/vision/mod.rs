pub mod client;
pub mod parse;
pub mod types;

pub use client::{AnthropicVision, VisionClient};
pub use types::{RecognizedFoodItem, VisionError};
