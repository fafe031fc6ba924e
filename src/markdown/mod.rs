//! Minimal markdown renderer for the preview pane.
//!
//! Rules (MVP):
//! - Block level: `#`–`######` headings, ``` fenced code, `-`/`*` unordered
//!   lists, blank-line separated paragraphs.
//! - Inline: `` `code` ``, `**bold**`, `*italic*`.
//! - Everything is HTML-escaped before markup is applied; the output is safe
//!   to hand to `inner_html`.

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Apply inline markup to one already-escaped line.
fn render_inline(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        // `code` — no nesting, first backtick closes.
        if chars[i] == '`' {
            if let Some(end) = chars[i + 1..].iter().position(|&c| c == '`') {
                let inner: String = chars[i + 1..i + 1 + end].iter().collect();
                out.push_str("<code>");
                out.push_str(&inner);
                out.push_str("</code>");
                i += end + 2;
                continue;
            }
        }

        // **bold**
        if chars[i] == '*' && i + 1 < chars.len() && chars[i + 1] == '*' {
            if let Some(end) = find_double_star(&chars, i + 2) {
                let inner: String = chars[i + 2..end].iter().collect();
                out.push_str("<strong>");
                out.push_str(&render_inline(&inner));
                out.push_str("</strong>");
                i = end + 2;
                continue;
            }
        }

        // *italic*
        if chars[i] == '*' {
            if let Some(end) = chars[i + 1..].iter().position(|&c| c == '*') {
                if end > 0 {
                    let inner: String = chars[i + 1..i + 1 + end].iter().collect();
                    out.push_str("<em>");
                    out.push_str(&render_inline(&inner));
                    out.push_str("</em>");
                    i += end + 2;
                    continue;
                }
            }
        }

        out.push(chars[i]);
        i += 1;
    }

    out
}

fn find_double_star(chars: &[char], from: usize) -> Option<usize> {
    let mut j = from;
    while j + 1 < chars.len() {
        if chars[j] == '*' && chars[j + 1] == '*' {
            return Some(j);
        }
        j += 1;
    }
    None
}

fn heading_level(line: &str) -> Option<(usize, &str)> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&hashes) {
        if let Some(rest) = line[hashes..].strip_prefix(' ') {
            return Some((hashes, rest));
        }
    }
    None
}

fn list_item(line: &str) -> Option<&str> {
    line.strip_prefix("- ").or_else(|| line.strip_prefix("* "))
}

/// Render markdown to an HTML string for the preview pane.
pub(crate) fn render_markdown(input: &str) -> String {
    let mut out = String::new();
    let lines: Vec<&str> = input.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if line.trim().is_empty() {
            i += 1;
            continue;
        }

        // Fenced code block: verbatim until the closing fence (or EOF).
        if line.trim_start().starts_with("```") {
            let mut body = String::new();
            i += 1;
            while i < lines.len() && !lines[i].trim_start().starts_with("```") {
                body.push_str(&escape_html(lines[i]));
                body.push('\n');
                i += 1;
            }
            i += 1; // skip closing fence
            out.push_str("<pre><code>");
            out.push_str(&body);
            out.push_str("</code></pre>");
            continue;
        }

        if let Some((level, text)) = heading_level(line) {
            out.push_str(&format!(
                "<h{level}>{}</h{level}>",
                render_inline(&escape_html(text))
            ));
            i += 1;
            continue;
        }

        if list_item(line).is_some() {
            out.push_str("<ul>");
            while i < lines.len() {
                let Some(item) = list_item(lines[i]) else {
                    break;
                };
                out.push_str("<li>");
                out.push_str(&render_inline(&escape_html(item)));
                out.push_str("</li>");
                i += 1;
            }
            out.push_str("</ul>");
            continue;
        }

        // Paragraph: consecutive plain lines joined with <br>.
        let mut parts: Vec<String> = vec![];
        while i < lines.len() {
            let l = lines[i];
            if l.trim().is_empty()
                || heading_level(l).is_some()
                || list_item(l).is_some()
                || l.trim_start().starts_with("```")
            {
                break;
            }
            parts.push(render_inline(&escape_html(l)));
            i += 1;
        }
        out.push_str("<p>");
        out.push_str(&parts.join("<br>"));
        out.push_str("</p>");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_raw_html() {
        assert_eq!(
            render_markdown("<script>alert(1)</script>"),
            "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn headings() {
        assert_eq!(render_markdown("# Title"), "<h1>Title</h1>");
        assert_eq!(render_markdown("### Sub"), "<h3>Sub</h3>");
        // No space after the hashes: plain paragraph.
        assert_eq!(render_markdown("#nope"), "<p>#nope</p>");
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        assert_eq!(
            render_markdown("one\ntwo\n\nthree"),
            "<p>one<br>two</p><p>three</p>"
        );
    }

    #[test]
    fn unordered_list() {
        assert_eq!(
            render_markdown("- a\n* b"),
            "<ul><li>a</li><li>b</li></ul>"
        );
    }

    #[test]
    fn fenced_code_is_verbatim() {
        assert_eq!(
            render_markdown("```\n# not a heading\n```"),
            "<pre><code># not a heading\n</code></pre>"
        );
    }

    #[test]
    fn unclosed_fence_runs_to_eof() {
        assert_eq!(
            render_markdown("```\ncode"),
            "<pre><code>code\n</code></pre>"
        );
    }

    #[test]
    fn inline_markup() {
        assert_eq!(
            render_markdown("a **b** *c* `d`"),
            "<p>a <strong>b</strong> <em>c</em> <code>d</code></p>"
        );
        // Unclosed markers stay literal.
        assert_eq!(render_markdown("a **b"), "<p>a **b</p>");
        assert_eq!(render_markdown("a `b"), "<p>a `b</p>");
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert_eq!(render_markdown(""), "");
        assert_eq!(render_markdown("\n\n"), "");
    }
}
