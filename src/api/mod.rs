pub mod football_api;
pub mod openai_api;

pub use football_api::ApiFootballClient;
pub use openai_api::OpenAiClient;
