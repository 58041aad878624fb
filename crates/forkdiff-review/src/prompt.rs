use crate::llm::ChatMessage;

const SYSTEM_PROMPT: &str = "\
你是一个专业的开发人员，请审查以下代码差异，指出潜在问题并提供改进建议。\
请按照以下格式反馈：
1. 文件路径
2. 问题行号
3. 问题描述
4. 改进建议

";

const REVIEW_PREFIX: &str = "代码差异:\n";

/// Build the reviewer instruction sent as the system message.
///
/// # Examples
///
/// ```
/// use forkdiff_review::prompt::build_system_prompt;
///
/// let prompt = build_system_prompt();
/// assert!(prompt.contains("文件路径"));
/// assert!(prompt.contains("改进建议"));
/// ```
pub fn build_system_prompt() -> String {
    SYSTEM_PROMPT.to_string()
}

/// Build the user message carrying the divergence document.
///
/// # Examples
///
/// ```
/// use forkdiff_review::prompt::build_review_prompt;
///
/// let prompt = build_review_prompt("新文件: a.txt\nhello\n\n\n");
/// assert_eq!(prompt, "代码差异:\n新文件: a.txt\nhello\n\n\n");
/// ```
pub fn build_review_prompt(document: &str) -> String {
    format!("{REVIEW_PREFIX}{document}")
}

/// The full conversation for reviewing `document`, or `None` when there is
/// nothing to review.
pub fn review_messages(document: &str) -> Option<Vec<ChatMessage>> {
    if document.trim().is_empty() {
        return None;
    }
    Some(vec![
        ChatMessage::system(build_system_prompt()),
        ChatMessage::user(build_review_prompt(document)),
    ])
}
