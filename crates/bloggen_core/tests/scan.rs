use bloggen_core::media::scan_image_refs;

#[test]
fn basic_reference_fields() {
    let refs = scan_image_refs("Intro.\n\n![Harbor at dusk](harbor.jpg)\n\nOutro.\n");
    assert_eq!(refs.len(), 1);
    let reference = &refs[0];
    assert_eq!(reference.raw, "![Harbor at dusk](harbor.jpg)");
    assert_eq!(reference.title, "Harbor at dusk");
    assert_eq!(reference.base, "harbor");
    assert_eq!(reference.ext, "jpg");
    assert!(reference.caption.is_none());
    assert!(!reference.is_external());
    assert_eq!(reference.source_file(), "harbor.jpg");
}

#[test]
fn all_raster_extensions_match() {
    for ext in ["jpg", "jpeg", "png"] {
        let text = format!("![x](pic.{ext})");
        assert_eq!(scan_image_refs(&text).len(), 1, "extension {ext}");
    }
}

#[test]
fn other_extensions_do_not_match() {
    assert!(scan_image_refs("![x](pic.gif)").is_empty());
    assert!(scan_image_refs("![x](pic.svg)").is_empty());
    assert!(scan_image_refs("![x](document.pdf)").is_empty());
}

#[test]
fn empty_title_is_allowed() {
    let refs = scan_image_refs("![](pic.png)");
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].title, "");
}

#[test]
fn quoted_caption_is_extracted() {
    let refs = scan_image_refs("![Alt](beach.jpg \"At the beach\")");
    assert_eq!(refs[0].caption.as_deref(), Some("At the beach"));
    assert_eq!(refs[0].base, "beach");
}

#[test]
fn empty_caption_counts_as_no_caption() {
    let refs = scan_image_refs("![Alt](beach.jpg \"\")");
    assert_eq!(refs.len(), 1);
    assert!(refs[0].caption.is_none());
}

#[test]
fn caption_may_contain_parens() {
    let refs = scan_image_refs("![Alt](fig.png \"see (fig 1)\")");
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].caption.as_deref(), Some("see (fig 1)"));
    assert_eq!(refs[0].base, "fig");
}

#[test]
fn caption_may_contain_raw_html() {
    let refs =
        scan_image_refs("![Alt](pic.jpg \"From <a href=\"https://example.com\">here</a>\")");
    assert_eq!(refs.len(), 1);
    assert_eq!(
        refs[0].caption.as_deref(),
        Some("From <a href=\"https://example.com\">here</a>")
    );
}

#[test]
fn base_may_contain_directories() {
    let refs = scan_image_refs("![x](images/deep/pic.jpeg)");
    assert_eq!(refs[0].base, "images/deep/pic");
    assert_eq!(refs[0].ext, "jpeg");
}

#[test]
fn external_url_is_recognized_but_flagged() {
    let refs = scan_image_refs("![x](http://example.com/a/pic.jpg)");
    assert_eq!(refs.len(), 1);
    assert!(refs[0].is_external());
}

#[test]
fn references_are_found_left_to_right() {
    let text = "![a](one.jpg)\n\ntext\n\n![b](two.png)\n";
    let refs = scan_image_refs(text);
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0].base, "one");
    assert_eq!(refs[1].base, "two");
    assert!(refs[0].end <= refs[1].start);
}

#[test]
fn two_references_on_one_line_match_separately() {
    let refs = scan_image_refs("![a](one.jpg) and ![b](two.png)");
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0].raw, "![a](one.jpg)");
    assert_eq!(refs[1].raw, "![b](two.png)");
}

#[test]
fn reference_may_not_span_lines() {
    assert!(scan_image_refs("![title\nbroken](pic.jpg)").is_empty());
    assert!(scan_image_refs("![title](pic\n.jpg)").is_empty());
}

#[test]
fn malformed_candidates_are_not_matches() {
    assert!(scan_image_refs("![no payload]").is_empty());
    assert!(scan_image_refs("![no close](pic.jpg").is_empty());
    assert!(scan_image_refs("!(pic.jpg)").is_empty());
    assert!(scan_image_refs("![x](.jpg)").is_empty());
}

#[test]
fn plain_link_is_not_an_image() {
    assert!(scan_image_refs("[a link](pic.jpg)").is_empty());
}
