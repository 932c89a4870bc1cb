//! Prompt templates for the task-specific generation routes.

pub const DEFAULT_LANGUAGE: &str = "javascript";
pub const DEFAULT_SUMMARY_LENGTH: u32 = 200;

pub fn code_generation(prompt: &str, language: &str) -> String {
    format!(
        "Generate {} code that meets the following requirements: {}",
        language, prompt
    )
}

pub fn code_review(code: &str, language: &str) -> String {
    format!(
        "Review the following {} code and suggest improvements:\n\n{}",
        language, code
    )
}

pub fn summary(text: &str, max_length: u32) -> String {
    format!(
        "Summarize the following text in {} characters or fewer:\n\n{}",
        max_length, text
    )
}

pub fn translation(text: &str, target_language: &str) -> String {
    format!(
        "Translate the following text into {}:\n\n{}",
        target_language, text
    )
}

/// Context is optional; an empty one yields the bare question template.
pub fn question(question: &str, context: &str) -> String {
    if context.is_empty() {
        format!("Answer the following question: {}", question)
    } else {
        format!(
            "Answer the question based on the following context:\n\nContext: {}\n\nQuestion: {}",
            context, question
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_generation_names_language() {
        assert_eq!(
            code_generation("sort a list", "rust"),
            "Generate rust code that meets the following requirements: sort a list"
        );
    }

    #[test]
    fn review_puts_code_after_blank_line() {
        let prompt = code_review("fn main() {}", DEFAULT_LANGUAGE);
        assert!(prompt.starts_with("Review the following javascript code"));
        assert!(prompt.ends_with("\n\nfn main() {}"));
    }

    #[test]
    fn summary_carries_length_limit() {
        assert!(summary("long text", DEFAULT_SUMMARY_LENGTH).contains("200 characters"));
    }

    #[test]
    fn translation_names_target() {
        assert_eq!(
            translation("hello", "Korean"),
            "Translate the following text into Korean:\n\nhello"
        );
    }

    #[test]
    fn question_switches_on_context() {
        assert_eq!(
            question("Why?", ""),
            "Answer the following question: Why?"
        );
        assert_eq!(
            question("Why?", "Because."),
            "Answer the question based on the following context:\n\nContext: Because.\n\nQuestion: Why?"
        );
    }
}
