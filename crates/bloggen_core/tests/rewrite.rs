use std::path::Path;

use bloggen_core::config::SrcsetConfig;
use bloggen_core::markup::rewrite_images;

fn srcset_config(sizes: &[u32], default_size: u32) -> SrcsetConfig {
    SrcsetConfig {
        sizes: sizes.to_vec(),
        default_size,
        rule: "100vw".to_string(),
        attribution: true,
        file_extension: ".md".to_string(),
    }
}

fn rewrite(contents: &str, config: &SrcsetConfig) -> bloggen_core::markup::RewriteOutcome {
    rewrite_images(
        contents,
        "articles/post",
        Path::new("/site/src"),
        Path::new("/site/public"),
        config,
    )
}

#[test]
fn text_without_references_is_identity() {
    let config = srcset_config(&[300, 650], 650);
    let contents = "# A post\n\nNo images here, just [a link](elsewhere.html).\n";
    let outcome = rewrite(contents, &config);
    assert_eq!(outcome.contents, contents);
    assert!(outcome.planned.is_empty());
}

#[test]
fn external_references_come_through_byte_for_byte() {
    let config = srcset_config(&[300, 650], 650);
    let contents = "before ![remote](https://example.com/pic.jpg \"cap\") after\n";
    let outcome = rewrite(contents, &config);
    assert_eq!(outcome.contents, contents);
    assert_eq!(outcome.external, 1);
    assert!(outcome.planned.is_empty());
}

#[test]
fn src_uses_default_size_and_srcset_lists_all_widths_in_order() {
    let config = srcset_config(&[300, 400, 650, 1500], 650);
    let outcome = rewrite("![Alt text](photo.jpg)\n", &config);
    assert!(outcome.contents.contains("<img src=\"photo_650.jpg\""));
    assert!(outcome.contents.contains("title=\"Alt text\""));
    assert!(outcome.contents.contains(
        "srcset=\"photo_300.jpg 300w,photo_400.jpg 400w,photo_650.jpg 650w,photo_1500.jpg 1500w\""
    ));
    assert!(outcome.contents.contains("sizes=\"100vw\""));
    assert!(!outcome.contents.contains("![Alt text]"));

    let planned = &outcome.planned[0];
    let widths: Vec<u32> = planned.variants.iter().map(|variant| variant.width).collect();
    assert_eq!(widths, vec![300, 400, 650, 1500]);
    let defaults: Vec<bool> = planned.variants.iter().map(|variant| variant.is_default).collect();
    assert_eq!(defaults, vec![false, false, true, false]);
}

#[test]
fn variant_paths_land_in_both_trees() {
    let config = srcset_config(&[300], 300);
    let outcome = rewrite("![x](photo.png)", &config);
    let variant = &outcome.planned[0].variants[0];
    assert_eq!(variant.file_name, "photo_300.png");
    assert_eq!(
        variant.source_path,
        Path::new("/site/src/articles/post/photo_300.png")
    );
    assert_eq!(
        variant.destination_path,
        Path::new("/site/public/articles/post/photo_300.png")
    );
}

#[test]
fn quoted_caption_wraps_figure_with_verbatim_text() {
    let config = srcset_config(&[300, 650], 650);
    let outcome = rewrite(
        "![Alt](photo.jpg \"Shot by <a href=\"https://example.com\">me</a>\")\n",
        &config,
    );
    assert!(outcome.contents.starts_with("<figure><img src=\"photo_650.jpg\""));
    assert!(outcome.contents.contains(
        "<figcaption>Shot by <a href=\"https://example.com\">me</a></figcaption></figure>"
    ));
}

#[test]
fn bracketed_link_becomes_hyperlinked_caption() {
    let config = srcset_config(&[300, 650], 650);
    let outcome = rewrite("![Caption text https://example.com/x](photo.jpg)\n", &config);
    assert!(outcome.contents.contains("<figure>"));
    assert!(outcome.contents.contains(
        "<figcaption><a href=\"https://example.com/x\">Caption text</a></figcaption>"
    ));
    assert!(outcome.contents.contains("title=\"Caption text\""));
}

#[test]
fn attribution_disabled_never_wraps() {
    let mut config = srcset_config(&[300, 650], 650);
    config.attribution = false;
    let outcome = rewrite("![Alt](photo.jpg \"A caption\")\n", &config);
    assert!(!outcome.contents.contains("<figure>"));
    assert!(outcome.contents.contains("<img src=\"photo_650.jpg\""));
}

#[test]
fn uncaptioned_reference_is_not_wrapped() {
    let config = srcset_config(&[300, 650], 650);
    let outcome = rewrite("![Alt](photo.jpg)\n", &config);
    assert!(!outcome.contents.contains("<figure>"));
}

#[test]
fn multiple_references_rewrite_left_to_right() {
    let config = srcset_config(&[300], 300);
    let contents = "![a](one.jpg)\n\nmiddle\n\n![b](two.png)\n";
    let outcome = rewrite(contents, &config);
    assert_eq!(outcome.planned.len(), 2);
    let first = outcome.contents.find("one_300.jpg").expect("first image");
    let second = outcome.contents.find("two_300.png").expect("second image");
    assert!(first < second);
    assert!(outcome.contents.contains("\n\nmiddle\n\n"));
}

#[test]
fn mixed_internal_and_external_references() {
    let config = srcset_config(&[300], 300);
    let contents = "![a](one.jpg) and ![b](https://example.com/two.jpg)\n";
    let outcome = rewrite(contents, &config);
    assert_eq!(outcome.planned.len(), 1);
    assert_eq!(outcome.external, 1);
    assert!(outcome.contents.contains("one_300.jpg"));
    assert!(outcome.contents.contains("![b](https://example.com/two.jpg)"));
}

#[test]
fn title_quotes_are_escaped_in_attribute() {
    let config = srcset_config(&[300], 300);
    let outcome = rewrite("![he said \"hi\"](pic.jpg)\n", &config);
    assert!(outcome.contents.contains("title=\"he said &quot;hi&quot;\""));
}
