//! Pending-operation execution for the srcset pipeline
//!
//! The coordinator scans and rewrites documents synchronously, then fans
//! every pending resize/publish out over a worker pool and fans back in:
//! it returns only after every operation has settled, and the first
//! failure fails the whole pass.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result, anyhow, bail};
use bloggen_core::config::SiteConfig;
use bloggen_core::markup::rewrite_images;
use bloggen_core::model::Document;
use bloggen_core::plan::{StalenessDecision, VariantSpec, decide_staleness};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder};

/// Filesystem and image operations the pipeline needs, kept behind a trait
/// so the coordinator can run against an in-memory fake in tests.
pub trait MediaBackend: Send + Sync {
    /// Modification time in milliseconds since the epoch, `None` when the
    /// path does not exist.
    fn mtime_ms(&self, path: &Path) -> Result<Option<i64>>;
    /// Write a copy of `original` scaled to `width` at `variant`.
    fn resize(&self, original: &Path, variant: &Path, width: u32) -> Result<()>;
    /// Copy `variant` to `destination`, creating intermediate directories.
    fn publish(&self, variant: &Path, destination: &Path) -> Result<()>;
}

pub struct FsBackend;

impl MediaBackend for FsBackend {
    fn mtime_ms(&self, path: &Path) -> Result<Option<i64>> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to stat {}", path.display()));
            }
        };
        let modified = metadata
            .modified()
            .with_context(|| format!("failed to read mtime of {}", path.display()))?;
        let ms = modified
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or(0);
        Ok(Some(ms))
    }

    fn resize(&self, original: &Path, variant: &Path, width: u32) -> Result<()> {
        let reader = image::ImageReader::open(original)
            .with_context(|| format!("failed to open {}", original.display()))?
            .with_guessed_format()
            .with_context(|| format!("failed to guess format for {}", original.display()))?;
        let decoded = reader
            .decode()
            .with_context(|| format!("failed to decode {}", original.display()))?;
        let (src_w, src_h) = decoded.dimensions();
        let scaled = if src_w <= width {
            decoded
        } else {
            let height = ((src_h as f64) * (width as f64) / (src_w as f64)).round() as u32;
            decoded.resize_exact(width, height.max(1), FilterType::Lanczos3)
        };
        if let Some(parent) = variant.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        write_variant(variant, &scaled)
    }

    fn publish(&self, variant: &Path, destination: &Path) -> Result<()> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::copy(variant, destination).with_context(|| {
            format!(
                "failed to copy {} to {}",
                variant.display(),
                destination.display()
            )
        })?;
        Ok(())
    }
}

fn write_variant(path: &Path, image: &DynamicImage) -> Result<()> {
    let mut file = fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let (width, height) = image.dimensions();
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => {
            let rgb = image.to_rgb8();
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut file, 84);
            encoder
                .write_image(&rgb, width, height, ExtendedColorType::Rgb8)
                .with_context(|| format!("failed to encode {}", path.display()))?;
        }
        "png" => {
            let rgba = image.to_rgba8();
            let encoder = image::codecs::png::PngEncoder::new(&mut file);
            encoder
                .write_image(&rgba, width, height, ExtendedColorType::Rgba8)
                .with_context(|| format!("failed to encode {}", path.display()))?;
        }
        _ => bail!("unsupported image format for {}", path.display()),
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct ResizeAction {
    pub original: PathBuf,
    pub variant: PathBuf,
    pub width: u32,
}

#[derive(Clone, Debug)]
pub struct PublishAction {
    pub variant: PathBuf,
    pub destination: PathBuf,
}

/// One unit of asynchronous work for a single variant. When both actions
/// are present the publish runs strictly after the resize has completed.
#[derive(Clone, Debug)]
pub struct PendingOp {
    pub resize: Option<ResizeAction>,
    pub publish: Option<PublishAction>,
}

impl PendingOp {
    fn run(&self, backend: &dyn MediaBackend) -> Result<()> {
        if let Some(resize) = &self.resize {
            backend
                .resize(&resize.original, &resize.variant, resize.width)
                .with_context(|| {
                    format!(
                        "failed to resize {} to {}px",
                        resize.original.display(),
                        resize.width
                    )
                })?;
        }
        if let Some(publish) = &self.publish {
            backend
                .publish(&publish.variant, &publish.destination)
                .with_context(|| {
                    format!("failed to publish {}", publish.destination.display())
                })?;
        }
        Ok(())
    }
}

/// Flat, unordered collection of every pending operation for one build
/// pass. Settling is the single fan-in point: it returns only after every
/// operation has run, and fails with the first error observed.
#[derive(Default)]
pub struct OperationSet {
    ops: Vec<PendingOp>,
}

impl OperationSet {
    pub fn push(&mut self, op: PendingOp) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn resize_count(&self) -> usize {
        self.ops.iter().filter(|op| op.resize.is_some()).count()
    }

    pub fn publish_count(&self) -> usize {
        self.ops.iter().filter(|op| op.publish.is_some()).count()
    }

    pub fn settle_all(self, backend: &Arc<dyn MediaBackend>, jobs: usize) -> Result<()> {
        let job_count = self.ops.len();
        if job_count == 0 {
            return Ok(());
        }
        let concurrency = std::cmp::max(1, std::cmp::min(jobs, job_count));
        let (tx, rx) = mpsc::channel::<PendingOp>();
        let rx = Arc::new(Mutex::new(rx));
        let (result_tx, result_rx) = mpsc::channel::<Result<()>>();

        let mut handles = Vec::with_capacity(concurrency);
        for _ in 0..concurrency {
            let rx = Arc::clone(&rx);
            let result_tx = result_tx.clone();
            let backend = Arc::clone(backend);
            handles.push(thread::spawn(move || loop {
                let op = {
                    let rx = rx.lock().expect("lock receiver");
                    rx.recv()
                };
                match op {
                    Ok(op) => {
                        let result = op.run(backend.as_ref());
                        let _ = result_tx.send(result);
                    }
                    Err(_) => break,
                }
            }));
        }
        for op in self.ops {
            tx.send(op)?;
        }
        drop(tx);
        drop(result_tx);

        let mut first_error = None;
        for _ in 0..job_count {
            if let Ok(Err(err)) = result_rx.recv() {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        for handle in handles {
            let _ = handle.join();
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct PipelineSummary {
    /// Eligible documents scanned.
    pub documents: usize,
    /// Internal references rewritten.
    pub references: usize,
    /// External references left untouched.
    pub external: usize,
    pub resizes: usize,
    pub publishes: usize,
    /// Destination paths owned by the pipeline; the asset copier must
    /// never write these.
    pub managed_outputs: BTreeSet<PathBuf>,
}

/// Drive the whole srcset pass: scan and rewrite every eligible document
/// in place, derive a staleness decision for every planned variant, then
/// settle every pending resize/publish before returning.
pub fn run_srcset_pipeline(
    documents: &mut [Document],
    config: &SiteConfig,
    source_root: &Path,
    destination_root: &Path,
    backend: &Arc<dyn MediaBackend>,
    jobs: usize,
) -> Result<PipelineSummary> {
    let mut summary = PipelineSummary::default();
    let mut operations = OperationSet::default();
    let mut claimed: BTreeSet<PathBuf> = BTreeSet::new();

    for document in documents.iter_mut() {
        if !document.is_eligible(&config.srcset.file_extension) {
            continue;
        }
        summary.documents += 1;
        let outcome = rewrite_images(
            &document.contents,
            &document.dir_path,
            source_root,
            destination_root,
            &config.srcset,
        );
        summary.external += outcome.external;
        for planned in &outcome.planned {
            summary.references += 1;
            let original = source_root
                .join(&document.dir_path)
                .join(planned.reference.source_file());
            let original_ms = backend.mtime_ms(&original)?.ok_or_else(|| {
                anyhow!(
                    "source image {} referenced by {} does not exist",
                    original.display(),
                    document.source_path
                )
            })?;
            for variant in &planned.variants {
                summary.managed_outputs.insert(variant.destination_path.clone());
                // The same image may be referenced more than once; each
                // variant path gets at most one in-flight operation.
                if !claimed.insert(variant.source_path.clone()) {
                    continue;
                }
                let variant_ms = backend.mtime_ms(&variant.source_path)?;
                let published_ms = backend.mtime_ms(&variant.destination_path)?;
                let decision = decide_staleness(original_ms, variant_ms, published_ms);
                if let Some(op) = pending_op(&original, variant, decision) {
                    operations.push(op);
                }
            }
        }
        document.contents = outcome.contents;
    }

    summary.resizes = operations.resize_count();
    summary.publishes = operations.publish_count();
    operations.settle_all(backend, jobs)?;
    Ok(summary)
}

fn pending_op(
    original: &Path,
    variant: &VariantSpec,
    decision: StalenessDecision,
) -> Option<PendingOp> {
    if decision.is_noop() {
        return None;
    }
    let resize = decision.needs_resize.then(|| ResizeAction {
        original: original.to_path_buf(),
        variant: variant.source_path.clone(),
        width: variant.width,
    });
    let publish = decision.needs_publish.then(|| PublishAction {
        variant: variant.source_path.clone(),
        destination: variant.destination_path.clone(),
    });
    Some(PendingOp { resize, publish })
}

pub fn max_parallelism() -> usize {
    thread::available_parallelism()
        .map(|value| value.get())
        .unwrap_or(1)
}
