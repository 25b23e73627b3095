//! Plain asset publishing
//!
//! Non-document files are copied into the destination tree with the same
//! mtime discipline as the image pipeline: a copy whose destination is
//! already at least as new as its source is skipped. Destination paths
//! owned by the srcset pipeline are never written here.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Debug, Default)]
pub struct AssetSummary {
    pub copied: usize,
    pub skipped: usize,
}

pub fn publish_assets(
    source_root: &Path,
    destination_root: &Path,
    assets: &[String],
    reserved: &BTreeSet<PathBuf>,
    excluded_dirs: &BTreeSet<String>,
) -> Result<AssetSummary> {
    let mut summary = AssetSummary::default();
    for rel in assets {
        if excluded_dirs.iter().any(|dir| in_dir(rel, dir)) {
            summary.skipped += 1;
            continue;
        }
        let destination = destination_root.join(rel);
        if reserved.contains(&destination) {
            summary.skipped += 1;
            continue;
        }
        let source = source_root.join(rel);
        if up_to_date(&source, &destination)? {
            summary.skipped += 1;
            continue;
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::copy(&source, &destination).with_context(|| {
            format!(
                "failed to copy {} to {}",
                source.display(),
                destination.display()
            )
        })?;
        summary.copied += 1;
    }
    Ok(summary)
}

fn in_dir(rel: &str, dir: &str) -> bool {
    !dir.is_empty() && rel.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
}

fn up_to_date(source: &Path, destination: &Path) -> Result<bool> {
    let Ok(destination_meta) = fs::metadata(destination) else {
        return Ok(false);
    };
    let source_meta = fs::metadata(source)
        .with_context(|| format!("failed to stat {}", source.display()))?;
    let source_modified = source_meta
        .modified()
        .with_context(|| format!("failed to read mtime of {}", source.display()))?;
    let destination_modified = destination_meta
        .modified()
        .with_context(|| format!("failed to read mtime of {}", destination.display()))?;
    Ok(destination_modified >= source_modified)
}
