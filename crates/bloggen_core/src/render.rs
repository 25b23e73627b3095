//! Markdown to HTML page rendering
//!
//! Raw inline HTML (including the markup produced by the srcset rewrite)
//! passes through unchanged. Layout and templating stay out of scope; the
//! shell around the body is deliberately minimal.

use pulldown_cmark::{Options, Parser, html};

pub fn render_markdown(body: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(body, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

pub fn render_page(title: &str, body_markdown: &str) -> String {
    let body = render_markdown(body_markdown);
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html_text(title),
        body
    )
}

fn escape_html_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::render_page;

    #[test]
    fn inline_html_passes_through() {
        let html = render_page("Post", "before\n\n<figure><img src=\"x_8.jpg\"/></figure>\n");
        assert!(html.contains("<figure><img src=\"x_8.jpg\"/></figure>"));
    }

    #[test]
    fn title_is_escaped() {
        let html = render_page("a < b", "text\n");
        assert!(html.contains("<title>a &lt; b</title>"));
    }

    #[test]
    fn markdown_body_renders() {
        let html = render_page("Post", "# Heading\n\nSome *emphasis*.\n");
        assert!(html.contains("<h1>Heading</h1>"));
        assert!(html.contains("<em>emphasis</em>"));
    }
}
