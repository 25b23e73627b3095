//! bloggen.yaml loading and validation

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub site: SiteMeta,
    pub srcset: SrcsetConfig,
    pub build: BuildConfig,
}

#[derive(Debug, Clone)]
pub struct SiteMeta {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SrcsetConfig {
    /// Target widths, in the order they appear in generated srcset attributes.
    pub sizes: Vec<u32>,
    /// Width used for the primary `src` attribute. Must be one of `sizes`.
    pub default_size: u32,
    /// Value of the generated `sizes` attribute.
    pub rule: String,
    /// Wrap captioned images in a figure/figcaption pair.
    pub attribution: bool,
    /// Document extension eligible for the transform.
    pub file_extension: String,
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Source tree, relative to the site root.
    pub source: String,
    /// Destination tree, relative to the site root.
    pub out: String,
}

#[derive(Debug, Deserialize)]
struct SiteConfigRaw {
    site: SiteMetaRaw,
    srcset: Option<SrcsetConfigRaw>,
    build: Option<BuildConfigRaw>,
}

#[derive(Debug, Deserialize)]
struct SiteMetaRaw {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    author: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SrcsetConfigRaw {
    sizes: Option<Vec<u32>>,
    default_size: Option<u32>,
    rule: Option<String>,
    attribution: Option<bool>,
    file_extension: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BuildConfigRaw {
    source: Option<String>,
    out: Option<String>,
}

pub fn load_site_config(path: &Path) -> Result<SiteConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_site_config(&raw)
        .with_context(|| format!("failed to load config {}", path.display()))
}

pub fn parse_site_config(raw: &str) -> Result<SiteConfig> {
    let parsed: SiteConfigRaw =
        serde_yaml::from_str(raw).context("failed to parse YAML config")?;

    let site = SiteMeta {
        title: required_string(parsed.site.title, "site.title")?,
        url: required_string(parsed.site.url, "site.url")?,
        description: parsed.site.description,
        author: parsed.site.author,
    };

    let srcset_raw = parsed.srcset.unwrap_or_default();
    let sizes = match srcset_raw.sizes {
        Some(sizes) if !sizes.is_empty() => sizes,
        _ => bail!("missing required field: srcset.sizes"),
    };
    if sizes.iter().any(|&width| width == 0) {
        bail!("srcset.sizes must contain positive widths");
    }
    for (idx, width) in sizes.iter().enumerate() {
        if sizes[..idx].contains(width) {
            bail!("srcset.sizes contains duplicate width {width}");
        }
    }
    let default_size = srcset_raw.default_size.unwrap_or(sizes[0]);
    if !sizes.contains(&default_size) {
        bail!("srcset.default_size {default_size} is not one of srcset.sizes");
    }
    let file_extension = srcset_raw
        .file_extension
        .unwrap_or_else(|| ".md".to_string());
    if !file_extension.starts_with('.') || file_extension.len() < 2 {
        bail!("srcset.file_extension must start with '.'");
    }
    let srcset = SrcsetConfig {
        sizes,
        default_size,
        rule: non_empty_or_default(srcset_raw.rule, "100vw", "srcset.rule")?,
        attribution: srcset_raw.attribution.unwrap_or(true),
        file_extension,
    };

    let build_raw = parsed.build.unwrap_or_default();
    let build = BuildConfig {
        source: non_empty_or_default(build_raw.source, "src", "build.source")?,
        out: non_empty_or_default(build_raw.out, "public", "build.out")?,
    };

    Ok(SiteConfig { site, srcset, build })
}

fn required_string(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => bail!("missing required field: {}", field),
    }
}

fn non_empty_or_default(value: Option<String>, default: &str, field: &str) -> Result<String> {
    match value {
        Some(text) => {
            if text.trim().is_empty() {
                bail!("{field} must not be empty");
            }
            Ok(text)
        }
        None => Ok(default.to_string()),
    }
}
