const FENCE: &str = "```";

/// Recovers the JSON payload from a model reply.
///
/// The first triple-backtick block wins, with an optional case-insensitive
/// `json` tag after the opening fence. Without a complete block the trimmed
/// reply is returned as-is.
pub fn extract_json(content: &str) -> &str {
    let Some(open) = content.find(FENCE) else {
        return content.trim();
    };

    let mut body = &content[open + FENCE.len()..];
    if body
        .get(..4)
        .is_some_and(|tag| tag.eq_ignore_ascii_case("json"))
    {
        body = &body[4..];
    }

    match body.find(FENCE) {
        Some(close) => body[..close].trim(),
        None => content.trim(),
    }
}
