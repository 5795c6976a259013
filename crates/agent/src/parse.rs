//! Extracts the JSON object out of a provider reply that may be wrapped in
//! prose or a fenced code block. Best effort, never panics.

use serde_json::Value;

/// Pull the first JSON object from `raw` and strictly parse it. Returns
/// `None` when no parseable object is present.
pub fn extract_json(raw: &str) -> Option<Value> {
    let body = strip_code_fence(raw);
    let span = json_span(body)?;
    serde_json::from_str(span).ok()
}

/// If the text carries a fenced block (with or without a language tag), use
/// the fence content; otherwise the raw text.
fn strip_code_fence(raw: &str) -> &str {
    let Some(open) = raw.find("```") else {
        return raw;
    };
    let after_fence = &raw[open + 3..];
    // Skip the language tag line, if any.
    let content_start = match after_fence.find('\n') {
        Some(newline) => newline + 1,
        None => return raw,
    };
    let content = &after_fence[content_start..];
    match content.find("```") {
        Some(close) => &content[..close],
        None => content,
    }
}

/// The span from the first `{` to its matching `}`, tracking brace depth and
/// skipping braces inside string literals. Unterminated objects yield the
/// remainder from `{` onward, leaving the strict parse to reject them.
fn json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    Some(&text[start..])
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::extract_json;

    #[test]
    fn bare_object_round_trips() {
        let value = extract_json(r#"{"intent":"search","keywords":["nasi"]}"#)
            .expect("bare object should parse");
        assert_eq!(value, json!({"intent": "search", "keywords": ["nasi"]}));
    }

    #[test]
    fn object_inside_fenced_block_round_trips() {
        let raw = "Here you go:\n```json\n{\"intent\": \"greeting\", \"responseText\": \"Halo!\"}\n```\nHope that helps.";
        let value = extract_json(raw).expect("fenced object should parse");
        assert_eq!(value["intent"], "greeting");
    }

    #[test]
    fn fence_without_language_tag_is_stripped() {
        let raw = "```\n{\"intent\": \"chat\", \"responseText\": \"ok\"}\n```";
        let value = extract_json(raw).expect("fenced object should parse");
        assert_eq!(value["intent"], "chat");
    }

    #[test]
    fn surrounding_prose_is_tolerated() {
        let raw = "Sure! The classification is {\"intent\": \"help\", \"responseText\": \"…\"} as requested.";
        let value = extract_json(raw).expect("prose-wrapped object should parse");
        assert_eq!(value["intent"], "help");
    }

    #[test]
    fn nested_objects_and_braces_inside_strings_are_handled() {
        let raw = r#"note {"outer": {"inner": "has } brace"}, "k": 1} trailing"#;
        let value = extract_json(raw).expect("nested object should parse");
        assert_eq!(value["outer"]["inner"], "has } brace");
        assert_eq!(value["k"], 1);
    }

    #[test]
    fn unbalanced_braces_yield_none_without_panicking() {
        assert!(extract_json(r#"{"intent": "search", "keywords": ["nasi""#).is_none());
        assert!(extract_json("{{{").is_none());
    }

    #[test]
    fn text_without_any_object_yields_none() {
        assert!(extract_json("I could not classify that, sorry.").is_none());
        assert!(extract_json("").is_none());
    }

    #[test]
    fn escaped_quotes_inside_strings_do_not_derail_the_scan() {
        let raw = r#"{"responseText": "she said \"mau\" yesterday", "intent": "chat"}"#;
        let value = extract_json(raw).expect("escaped quotes should parse");
        assert_eq!(value["intent"], "chat");
    }
}
