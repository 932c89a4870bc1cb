//! Token accounting reported by the generative-AI service.

use serde::{Deserialize, Serialize};

/// Usage metadata exactly as the AI service reports it, echoed to clients in
/// the same camelCase shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_token_count: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates_token_count: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_token_count: Option<i32>,
}

impl Usage {
    pub fn new(prompt_tokens: i32, output_tokens: i32) -> Self {
        Self {
            prompt_token_count: Some(prompt_tokens),
            candidates_token_count: Some(output_tokens),
            total_token_count: Some(prompt_tokens + output_tokens),
        }
    }

    pub fn input_tokens(&self) -> i32 {
        self.prompt_token_count.unwrap_or(0)
    }

    pub fn output_tokens(&self) -> i32 {
        self.candidates_token_count.unwrap_or(0)
    }
}
