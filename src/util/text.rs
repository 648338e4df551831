use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";

/// Shorten `s` to at most `max_width` terminal columns, ending in "..." when cut.
///
/// Returns the input borrowed when it already fits. Widths too narrow for the
/// ellipsis keep as many leading characters as fit.
///
/// ```
/// use urlfeed::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("https://a.example", 40), "https://a.example");
/// assert_eq!(truncate_to_width("https://a.example/long", 12), "https://a...");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if UnicodeWidthStr::width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let budget = if max_width > ELLIPSIS.len() {
        max_width - ELLIPSIS.len()
    } else {
        max_width
    };

    let mut width = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + w > budget {
            break;
        }
        width += w;
        end = idx + c.len_utf8();
    }

    if max_width > ELLIPSIS.len() {
        Cow::Owned(format!("{}{}", &s[..end], ELLIPSIS))
    } else {
        Cow::Owned(s[..end].to_string())
    }
}

/// Remove control characters so stored text cannot drive the terminal.
///
/// URLs are stored verbatim, so anything printed from the store goes through
/// here first.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if s.chars().any(char::is_control) {
        Cow::Owned(s.chars().filter(|c| !c.is_control()).collect())
    } else {
        Cow::Borrowed(s)
    }
}
