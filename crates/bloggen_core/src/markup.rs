//! Markup rewriting for scanned image references
//!
//! The rewrite is synchronous and never waits on image work: variant file
//! names are deterministic, so the replacement markup is known before any
//! resize has run.

use std::path::Path;

use crate::config::SrcsetConfig;
use crate::media::{ImageRef, scan_image_refs, split_embedded_link};
use crate::plan::{VariantSpec, plan_variants};

/// One internal reference together with its planned variants, handed to
/// the executor for staleness probing.
#[derive(Clone, Debug)]
pub struct PlannedImage {
    pub reference: ImageRef,
    pub variants: Vec<VariantSpec>,
}

#[derive(Clone, Debug, Default)]
pub struct RewriteOutcome {
    pub contents: String,
    pub planned: Vec<PlannedImage>,
    /// External references seen and left untouched.
    pub external: usize,
}

/// Replace every internal image reference in `contents` with responsive
/// markup and report the variant plans the executor must satisfy.
///
/// Text without references, and external references, come through
/// byte-for-byte.
pub fn rewrite_images(
    contents: &str,
    dir_path: &str,
    source_root: &Path,
    destination_root: &Path,
    config: &SrcsetConfig,
) -> RewriteOutcome {
    let refs = scan_image_refs(contents);
    if refs.is_empty() {
        return RewriteOutcome {
            contents: contents.to_string(),
            ..RewriteOutcome::default()
        };
    }
    let mut out = String::with_capacity(contents.len());
    let mut cursor = 0;
    let mut planned = Vec::new();
    let mut external = 0;
    for reference in refs {
        if reference.is_external() {
            external += 1;
            continue;
        }
        let variants = plan_variants(&reference, dir_path, source_root, destination_root, config);
        out.push_str(&contents[cursor..reference.start]);
        out.push_str(&image_markup(&reference, &variants, config));
        cursor = reference.end;
        planned.push(PlannedImage {
            reference,
            variants,
        });
    }
    out.push_str(&contents[cursor..]);
    RewriteOutcome {
        contents: out,
        planned,
        external,
    }
}

/// Build the replacement markup for one internal reference: an `<img>`
/// whose src is the default-size variant, a srcset listing every variant
/// in configured order, and optionally a captioned figure wrapper.
pub fn image_markup(
    reference: &ImageRef,
    variants: &[VariantSpec],
    config: &SrcsetConfig,
) -> String {
    let Some(default) = variants.iter().find(|variant| variant.is_default) else {
        return reference.raw.clone();
    };
    let (title, caption) = caption_parts(reference);

    let mut html = String::new();
    html.push_str("<img src=\"");
    html.push_str(&default.file_name);
    html.push_str("\" title=\"");
    html.push_str(&escape_attr(title));
    html.push_str("\" srcset=\"");
    for (idx, variant) in variants.iter().enumerate() {
        if idx > 0 {
            html.push(',');
        }
        html.push_str(&variant.file_name);
        html.push(' ');
        html.push_str(&variant.width.to_string());
        html.push('w');
    }
    html.push_str("\" sizes=\"");
    html.push_str(&config.rule);
    html.push_str("\"/>");

    if config.attribution {
        if let Some(caption) = caption {
            return format!("<figure>{html}<figcaption>{caption}</figcaption></figure>");
        }
    }
    html
}

/// Resolve the title attribute and the caption, if any. A quoted caption
/// wins and is trusted raw markup; otherwise a URL embedded in the
/// bracketed text becomes a hyperlinked caption.
fn caption_parts(reference: &ImageRef) -> (&str, Option<String>) {
    if let Some(caption) = &reference.caption {
        return (&reference.title, Some(caption.clone()));
    }
    if let Some((text, url)) = split_embedded_link(&reference.title) {
        let caption = format!("<a href=\"{}\">{}</a>", escape_attr(url), text);
        return (text, Some(caption));
    }
    (&reference.title, None)
}

pub(crate) fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_attr;

    #[test]
    fn attribute_text_is_escaped() {
        assert_eq!(escape_attr("a \"b\" <c>&d"), "a &quot;b&quot; &lt;c&gt;&amp;d");
    }
}
