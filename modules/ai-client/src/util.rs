/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code fences some models wrap around JSON-mode replies.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Short, log-safe preview of a model reply.
pub fn preview(s: &str, max_bytes: usize) -> String {
    let cut = truncate_to_char_boundary(s, max_bytes);
    if cut.len() < s.len() {
        format!("{cut}...({} bytes)", s.len())
    } else {
        cut.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_char_boundary() {
        let text = "Hello 世界";
        let truncated = truncate_to_char_boundary(text, 8);
        assert!(truncated.len() <= 8);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn test_strip_code_blocks() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_preview_marks_truncation() {
        assert_eq!(preview("short", 100), "short");
        assert_eq!(preview("abcdefghij", 4), "abcd...(10 bytes)");
    }
}
