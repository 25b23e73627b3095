//! Variant planning and staleness decisions
//!
//! Planning is pure: the variant list for a reference is exactly the
//! configured width list, in configured order. Staleness is a pure
//! comparison of probed modification times; the caller performs all I/O
//! before asking for a decision.

use std::path::{Path, PathBuf};

use crate::config::SrcsetConfig;
use crate::media::ImageRef;

/// Modification time stand-in for a variant that does not exist yet.
pub const ABSENT_VARIANT_MTIME: i64 = 0;

/// Stand-in for a published copy that does not exist. Strictly older than
/// [`ABSENT_VARIANT_MTIME`], so a variant that still needs generating also
/// always needs publishing.
pub const ABSENT_PUBLISHED_MTIME: i64 = -1;

/// One (base name, width) pair: a single resized asset and where it lives
/// in the working and published trees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantSpec {
    pub width: u32,
    /// File name as referenced from the rewritten markup: `{base}_{width}.{ext}`.
    pub file_name: String,
    /// Location of the variant in the working tree.
    pub source_path: PathBuf,
    /// Location of the published copy in the destination tree.
    pub destination_path: PathBuf,
    pub is_default: bool,
}

pub fn plan_variants(
    reference: &ImageRef,
    dir_path: &str,
    source_root: &Path,
    destination_root: &Path,
    config: &SrcsetConfig,
) -> Vec<VariantSpec> {
    config
        .sizes
        .iter()
        .map(|&width| {
            let file_name = format!("{}_{}.{}", reference.base, width, reference.ext);
            VariantSpec {
                width,
                source_path: source_root.join(dir_path).join(&file_name),
                destination_path: destination_root.join(dir_path).join(&file_name),
                file_name,
                is_default: width == config.default_size,
            }
        })
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StalenessDecision {
    pub needs_resize: bool,
    pub needs_publish: bool,
}

impl StalenessDecision {
    pub fn is_noop(&self) -> bool {
        !self.needs_resize && !self.needs_publish
    }
}

/// Decide what work one variant needs.
///
/// `original_ms` must come from a file that exists; a missing original is
/// the caller's error. Absent variant and published-copy probes map to the
/// module sentinels. A resize that is about to happen always forces a
/// publish, regardless of how fresh the old published copy looks.
pub fn decide_staleness(
    original_ms: i64,
    variant_ms: Option<i64>,
    published_ms: Option<i64>,
) -> StalenessDecision {
    let variant_ms = variant_ms.unwrap_or(ABSENT_VARIANT_MTIME);
    let published_ms = published_ms.unwrap_or(ABSENT_PUBLISHED_MTIME);
    let needs_resize = original_ms > variant_ms;
    let needs_publish = needs_resize || variant_ms > published_ms;
    StalenessDecision {
        needs_resize,
        needs_publish,
    }
}

#[cfg(test)]
mod tests {
    use super::decide_staleness;

    #[test]
    fn everything_absent_needs_both() {
        let decision = decide_staleness(100, None, None);
        assert!(decision.needs_resize);
        assert!(decision.needs_publish);
    }

    #[test]
    fn up_to_date_variant_and_copy_need_nothing() {
        let decision = decide_staleness(100, Some(200), Some(300));
        assert!(decision.is_noop());
    }

    #[test]
    fn fresh_variant_without_published_copy_needs_publish_only() {
        let decision = decide_staleness(100, Some(200), None);
        assert!(!decision.needs_resize);
        assert!(decision.needs_publish);
    }

    #[test]
    fn newer_original_needs_resize_and_publish() {
        // The published copy looks newer than the stale variant, but the
        // regenerated variant must still be published.
        let decision = decide_staleness(400, Some(200), Some(300));
        assert!(decision.needs_resize);
        assert!(decision.needs_publish);
    }

    #[test]
    fn stale_published_copy_needs_publish_only() {
        let decision = decide_staleness(100, Some(300), Some(200));
        assert!(!decision.needs_resize);
        assert!(decision.needs_publish);
    }
}
