//! Embedded image reference scanning
//!
//! A reference is a single-line span of the form
//! `![title](base.ext "caption")` with ext one of jpg, jpeg, png and the
//! quoted caption optional. The scanner is a small hand-rolled matcher:
//! candidates that do not fit the shape are simply not matches, and a
//! reference whose base starts with a URL scheme is recognized but left
//! alone by every downstream stage.

/// Raster formats the pipeline will resize.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRef {
    /// Exact original span, replaced verbatim by the rewriter.
    pub raw: String,
    /// Bracketed title/alt text, possibly empty.
    pub title: String,
    /// Path stem as written, e.g. "photo", "images/photo" or a full URL.
    pub base: String,
    pub ext: String,
    /// Quoted caption, taken verbatim (it may contain raw inline HTML).
    pub caption: Option<String>,
    /// Byte offsets of `raw` within the scanned text.
    pub start: usize,
    pub end: usize,
}

impl ImageRef {
    /// External references are recognized but never planned or rewritten.
    pub fn is_external(&self) -> bool {
        self.base.starts_with("http")
    }

    /// File name of the original image, e.g. "photo.jpg".
    pub fn source_file(&self) -> String {
        format!("{}.{}", self.base, self.ext)
    }
}

/// Find every image reference in `text`, left to right, non-overlapping.
pub fn scan_image_refs(text: &str) -> Vec<ImageRef> {
    let mut refs = Vec::new();
    let mut idx = 0;
    while let Some(pos) = text[idx..].find("![") {
        let start = idx + pos;
        match match_image_ref(text, start) {
            Some(reference) => {
                idx = reference.end;
                refs.push(reference);
            }
            None => idx = start + 2,
        }
    }
    refs
}

fn match_image_ref(text: &str, start: usize) -> Option<ImageRef> {
    let title_start = start + 2;
    let close = find_seq_before_newline(&text[title_start..], "](")?;
    let title = &text[title_start..title_start + close];
    let inner_start = title_start + close + 2;
    let line = &text[inner_start..];
    let line = &line[..line.find('\n').unwrap_or(line.len())];

    // The payload may contain ')' inside a quoted caption, so try each
    // closing paren on the line until one yields a valid payload.
    let mut search = 0;
    while let Some(offset) = line[search..].find(')') {
        let close_paren = search + offset;
        if let Some((base, ext, caption)) = parse_payload(&line[..close_paren]) {
            let end = inner_start + close_paren + 1;
            return Some(ImageRef {
                raw: text[start..end].to_string(),
                title: title.to_string(),
                base,
                ext,
                caption,
                start,
                end,
            });
        }
        search = close_paren + 1;
    }
    None
}

fn parse_payload(inner: &str) -> Option<(String, String, Option<String>)> {
    let (path, caption) = split_caption(inner);
    let (base, ext) = path.rsplit_once('.')?;
    if base.is_empty() || !IMAGE_EXTENSIONS.contains(&ext) {
        return None;
    }
    Some((base.to_string(), ext.to_string(), caption))
}

fn split_caption(inner: &str) -> (&str, Option<String>) {
    let trimmed = inner.trim_end();
    if trimmed.len() >= 2 && trimmed.ends_with('"') {
        if let Some(open) = trimmed.find('"') {
            if open < trimmed.len() - 1 {
                let caption = &trimmed[open + 1..trimmed.len() - 1];
                let path = inner[..open].trim_end();
                if !path.is_empty() {
                    return (path, (!caption.is_empty()).then(|| caption.to_string()));
                }
            }
        }
    }
    (inner, None)
}

fn find_seq_before_newline(text: &str, pattern: &str) -> Option<usize> {
    let pos = text.find(pattern)?;
    if text[..pos].contains('\n') {
        return None;
    }
    Some(pos)
}

/// Separate a trailing URL from the bracketed title, for captions written
/// as `![Caption text https://example.com/x](photo.jpg)`.
pub fn split_embedded_link(title: &str) -> Option<(&str, &str)> {
    let pos = title.rfind(" http")?;
    let url = title[pos + 1..].trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return None;
    }
    if url.split_whitespace().count() != 1 {
        return None;
    }
    let text = title[..pos].trim_end();
    if text.is_empty() {
        return None;
    }
    Some((text, url))
}
