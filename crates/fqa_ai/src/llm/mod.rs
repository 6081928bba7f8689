use fqa_core::error::AppError;

pub mod chat_client;
pub mod payload;

/// One system + user exchange with a chat-style model.
#[derive(Debug, Clone, Copy)]
pub struct ChatPrompt<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
}

pub trait Llm {
    fn chat(&self, prompt: &ChatPrompt<'_>) -> Result<String, AppError>;
}
