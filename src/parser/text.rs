use scraper::{ElementRef, Node};

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "center", "dd", "div", "dl", "dt", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre", "section",
    "table", "tbody", "thead", "tfoot", "tr", "ul",
];

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Rendered text of an element, close to what a browser reports as `innerText`.
/// Returns `None` when nothing visible remains.
pub fn inner_text(element: ElementRef) -> Option<String> {
    let mut raw = String::new();
    walk(element, &mut raw);
    let text = tidy(&raw);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn walk(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                // Source whitespace (including newlines) renders as spaces.
                out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
            }
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    line_break(out);
                }
                walk(child_el, out);
                if block {
                    line_break(out);
                } else if name == "td" || name == "th" {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn line_break(out: &mut String) {
    // whitespace between blocks does not render
    out.truncate(out.trim_end_matches(' ').len());
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Collapse spaces and trim each line. Blank lines from repeated `<br>` stay.
fn tidy(raw: &str) -> String {
    raw.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
