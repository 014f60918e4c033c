//! Postgres one-dimensional array literals, e.g. `{1,2,3}` or `{"a b",c}`.

/// Split a one-dimensional array literal into its unquoted elements.
///
/// NULL elements and nested arrays are rejected: every supported element
/// type is non-nullable and flat.
pub(crate) fn parse_elements(input: &str) -> Result<Vec<String>, String> {
    let body = input
        .trim()
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| format!("{input:?} is not an array literal"))?;

    let mut elements = Vec::new();
    if body.is_empty() {
        return Ok(elements);
    }

    let mut chars = body.chars().peekable();
    loop {
        let mut element = String::new();
        match chars.peek() {
            Some('"') => {
                chars.next();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(c) => element.push(c),
                            None => return Err(format!("{input:?}: unterminated escape")),
                        },
                        Some('"') => break,
                        Some(c) => element.push(c),
                        None => return Err(format!("{input:?}: unterminated quoted element")),
                    }
                }
            }
            Some('{') => return Err(format!("{input:?}: nested arrays are not supported")),
            _ => {
                while let Some(&c) = chars.peek() {
                    if c == ',' {
                        break;
                    }
                    if c == '{' || c == '}' || c == '"' {
                        return Err(format!("{input:?}: unexpected {c:?}"));
                    }
                    element.push(c);
                    chars.next();
                }
                let trimmed = element.trim();
                if trimmed.eq_ignore_ascii_case("NULL") {
                    return Err(format!("{input:?}: NULL elements are not supported"));
                }
                element = trimmed.to_string();
            }
        }
        elements.push(element);

        match chars.next() {
            Some(',') => continue,
            None => break,
            Some(c) => return Err(format!("{input:?}: expected ',' but found {c:?}")),
        }
    }
    Ok(elements)
}
