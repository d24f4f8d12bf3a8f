//! Video generation providers.

pub mod openai;

pub use openai::{
    generate, ManagedStrategy, MultipartStrategy, OpenAiClient, OpenAiConfig, OpenAiVideoBuilder,
    ResponsesStrategy,
};
