/// Escape text for use in HTML element content or a quoted attribute value.
pub fn escape_html(s: &str) -> String {
    let mut output = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            c => output.push(c),
        }
    }
    output
}

/// Escape prose, turning backtick-delimited spans into `<code>` elements.
///
/// An unmatched trailing backtick is kept as literal text.
pub fn inline_markup(s: &str) -> String {
    let mut output = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find('`') {
        let Some(len) = rest[open + 1..].find('`') else {
            break;
        };
        output.push_str(&escape_html(&rest[..open]));
        output.push_str("<code>");
        output.push_str(&escape_html(&rest[open + 1..open + 1 + len]));
        output.push_str("</code>");
        rest = &rest[open + len + 2..];
    }
    output.push_str(&escape_html(rest));
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_and_quotes() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn ampersands_in_query_strings_are_escaped() {
        let escaped = escape_html("https://example.com/?colour=blue&sha1=abc");
        assert_eq!(escaped, "https://example.com/?colour=blue&amp;sha1=abc");
        assert!(!escaped.contains("blue&sha1"));
    }

    #[test]
    fn backtick_spans_become_code() {
        assert_eq!(
            inline_markup("Add `colours` submodule"),
            "Add <code>colours</code> submodule"
        );
        assert_eq!(
            inline_markup("Use `a<b` & `c`"),
            "Use <code>a&lt;b</code> &amp; <code>c</code>"
        );
    }

    #[test]
    fn unmatched_backtick_stays_literal() {
        assert_eq!(inline_markup("it`s <fine>"), "it`s &lt;fine&gt;");
        assert_eq!(inline_markup("``"), "<code></code>");
    }
}
