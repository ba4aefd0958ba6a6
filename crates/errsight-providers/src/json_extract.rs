//! JSON extraction from model output
//!
//! Models often wrap JSON in prose or Markdown fences. Extraction tries a
//! fenced ```` ```json ```` block first, then the first balanced `{...}`
//! object (string literals and escapes are honoured while counting braces).

/// Returns the JSON object text embedded in `text`, if any
pub fn extract_json(text: &str) -> Option<&str> {
    fenced_block(text).or_else(|| balanced_object(text))
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```json")? + "```json".len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    let block = rest[..end].trim();
    if block.is_empty() {
        None
    } else {
        Some(block)
    }
}

fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
