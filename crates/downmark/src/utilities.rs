//! Small string helpers shared by the translator rules and the visitor.

/// Wrap a string in the given delimiter on both sides
pub fn surround(source: &str, surround_str: &str) -> String {
    format!("{surround_str}{source}{surround_str}")
}

/// True when the string contains no non-whitespace character
pub fn is_whitespace_only(s: &str) -> bool {
    !s.contains(|c: char| !c.is_whitespace())
}

/// Strip leading and trailing newline characters (spaces are kept)
pub fn trim_newlines(s: &str) -> &str {
    s.trim_matches('\n')
}

/// Collapse every whitespace run to a single space
pub fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_whitespace = false;

    for c in s.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                result.push(' ');
            }
            in_whitespace = true;
        } else {
            result.push(c);
            in_whitespace = false;
        }
    }

    result
}

/// Trim a text node's edges the way HTML rendering does: a leading or
/// trailing whitespace run becomes a single space, kept only when the
/// character adjacent to the content is not a newline. Whitespace-only
/// text is returned unchanged.
pub fn trim_text(s: &str) -> String {
    let start = match s.find(|c: char| !c.is_whitespace()) {
        Some(i) => i,
        None => return s.to_string(),
    };
    // The text has content, so rfind always matches here
    let last = s.rfind(|c: char| !c.is_whitespace()).unwrap_or(start);
    let end = last + s[last..].chars().next().map_or(0, char::len_utf8);

    let leading = start > 0 && !s[..start].ends_with(['\n', '\r']);
    let trailing = end < s.len() && !s[end..].starts_with(['\n', '\r']);

    let mut result = String::with_capacity(end - start + 2);
    if leading {
        result.push(' ');
    }
    result.push_str(&s[start..end]);
    if trailing {
        result.push(' ');
    }
    result
}

/// Surround the visible portion of each line with a delimiter.
///
/// Existing un-escaped occurrences of the delimiter are stripped first, so
/// nesting the same formatting tag collapses to a single delimiter pair.
/// Leading/trailing whitespace on a line stays outside the delimiters,
/// reduced to a single space; whitespace-only lines pass through unchanged.
pub fn tag_surround(content: &str, surround_str: &str) -> String {
    let stripped;
    let content = if content.contains(surround_str) {
        stripped = strip_unescaped(content, surround_str);
        stripped.as_str()
    } else {
        content
    };

    let mut result = String::with_capacity(content.len() + surround_str.len() * 2);
    for piece in split_keep_newline(content) {
        let (body, eol) = piece;
        let core = body.trim();
        if core.is_empty() {
            result.push_str(body);
        } else {
            if body.starts_with(|c: char| c.is_whitespace()) {
                result.push(' ');
            }
            result.push_str(surround_str);
            result.push_str(core);
            result.push_str(surround_str);
            if body.ends_with(|c: char| c.is_whitespace()) {
                result.push(' ');
            }
        }
        result.push_str(eol);
    }

    result
}

/// Remove delimiter occurrences unless preceded by a backslash
fn strip_unescaped(content: &str, delim: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(pos) = rest.find(delim) {
        result.push_str(&rest[..pos]);
        if pos > 0 && rest.as_bytes()[pos - 1] == b'\\' {
            result.push_str(delim);
        }
        rest = &rest[pos + delim.len()..];
    }
    result.push_str(rest);

    result
}

/// Split into (line body, line ending) pairs, keeping `\r\n` intact
fn split_keep_newline(s: &str) -> impl Iterator<Item = (&str, &str)> {
    s.split_inclusive('\n').map(|piece| {
        if let Some(body) = piece.strip_suffix("\r\n") {
            (body, "\r\n")
        } else if let Some(body) = piece.strip_suffix('\n') {
            (body, "\n")
        } else {
            (piece, "")
        }
    })
}

/// Length of the longest consecutive run of `ch`
pub fn longest_run(s: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;

    for c in s.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }

    longest
}
