//! Source tree walker for bloggen documents

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use bloggen_core::frontmatter::parse_front_matter;
use bloggen_core::model::Document;
use walkdir::{DirEntry, WalkDir};

#[derive(Debug)]
pub struct SiteTree {
    pub documents: Vec<Document>,
    /// Non-document files, as paths relative to the source root.
    pub assets: Vec<String>,
}

pub fn walk_site(source_root: &Path, file_extension: &str) -> Result<SiteTree> {
    let mut documents = Vec::new();
    let mut assets = Vec::new();
    let walker = WalkDir::new(source_root)
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry));
    for entry in walker {
        let entry =
            entry.with_context(|| format!("failed to walk {}", source_root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if name.ends_with('~') {
            continue;
        }
        let rel = to_relative_path(source_root, path);
        if name.ends_with(file_extension) {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let (header, body) = parse_front_matter(&raw)
                .with_context(|| format!("failed to parse front matter in {}", path.display()))?;
            documents.push(Document {
                dir_path: parent_of(&rel),
                file_name: name.to_string(),
                source_path: rel,
                header,
                contents: body.to_string(),
            });
        } else {
            assets.push(rel);
        }
    }
    documents.sort_by(|left, right| left.source_path.cmp(&right.source_path));
    assets.sort();
    Ok(SiteTree { documents, assets })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

fn to_relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn parent_of(rel: &str) -> String {
    match rel.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    }
}
