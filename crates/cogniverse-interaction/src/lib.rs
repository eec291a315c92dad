//! Completion client implementations.

pub mod demo_client;
pub mod openai_api_client;

pub use demo_client::DemoClient;
pub use openai_api_client::OpenAiApiClient;
