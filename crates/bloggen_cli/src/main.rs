mod assets;
mod exec;
mod preview;
mod walk;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bloggen_core::config::{SiteConfig, load_site_config};
use bloggen_core::media::scan_image_refs;
use bloggen_core::model::Document;
use bloggen_core::plan::{decide_staleness, plan_variants};
use bloggen_core::render::render_page;
use clap::{Parser, Subcommand};

use crate::assets::AssetSummary;
use crate::exec::{FsBackend, MediaBackend, PipelineSummary, max_parallelism, run_srcset_pipeline};

#[derive(Debug, Parser)]
#[command(
    name = "bloggen",
    about = "Markdown blog builder with a responsive-image pipeline."
)]
struct Cli {
    /// Site root containing bloggen.yaml. Defaults to the current directory.
    #[arg(long = "source-dir", short = 's', global = true)]
    source_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Build the site from bloggen.yaml.")]
    Build {
        /// Exclude drafts from the published output.
        #[arg(long)]
        prod: bool,
        /// Worker threads for image operations.
        #[arg(long)]
        jobs: Option<usize>,
        #[arg(long)]
        preview: bool,
        #[arg(long, default_value = "127.0.0.1", requires = "preview")]
        preview_host: String,
        #[arg(long, default_value_t = 8080, requires = "preview")]
        preview_port: u16,
        #[arg(long, requires = "preview")]
        preview_no_open: bool,
    },
    #[command(about = "Report image references and pending work without executing.")]
    Scan,
    #[command(about = "Serve a previously built site.")]
    Preview {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long)]
        no_open: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Command::Build {
            prod,
            jobs,
            preview,
            preview_host,
            preview_port,
            preview_no_open,
        } => run_build(
            &cli,
            *prod,
            *jobs,
            *preview,
            preview_host,
            *preview_port,
            *preview_no_open,
        ),
        Command::Scan => run_scan(&cli),
        Command::Preview {
            host,
            port,
            no_open,
        } => {
            let root = root_dir(&cli)?;
            let config = load_site_config(&root.join("bloggen.yaml"))?;
            preview::run_preview(preview::PreviewOpts {
                out_dir: root.join(&config.build.out),
                host: host.clone(),
                port: *port,
                no_open: *no_open,
                index: "index.html".to_string(),
            })
        }
    }
}

fn root_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.source_dir {
        Some(path) => Ok(path.clone()),
        None => std::env::current_dir().context("failed to resolve current directory"),
    }
}

#[derive(Debug)]
struct BuildReport {
    pipeline: PipelineSummary,
    assets: AssetSummary,
    rendered: usize,
    drafts: usize,
    destination_root: PathBuf,
}

fn run_build(
    cli: &Cli,
    prod: bool,
    jobs: Option<usize>,
    preview: bool,
    preview_host: &str,
    preview_port: u16,
    preview_no_open: bool,
) -> Result<()> {
    let root = root_dir(cli)?;
    let jobs = jobs.unwrap_or_else(max_parallelism);
    let report = build_site(&root, prod, jobs)?;

    println!("documents: {} ({} drafts removed)", report.rendered, report.drafts);
    println!(
        "image references: {} internal, {} external",
        report.pipeline.references, report.pipeline.external
    );
    println!(
        "resized: {}  published: {}",
        report.pipeline.resizes, report.pipeline.publishes
    );
    println!(
        "assets: {} copied, {} up to date",
        report.assets.copied, report.assets.skipped
    );

    if preview {
        return preview::run_preview(preview::PreviewOpts {
            out_dir: report.destination_root,
            host: preview_host.to_string(),
            port: preview_port,
            no_open: preview_no_open,
            index: "index.html".to_string(),
        });
    }
    Ok(())
}

/// One full build pass: walk, srcset pipeline, page rendering, asset
/// publishing. The pipeline settles every image operation before any page
/// is written; a failed operation aborts the build here.
fn build_site(root: &Path, prod: bool, jobs: usize) -> Result<BuildReport> {
    let config = load_site_config(&root.join("bloggen.yaml"))?;
    let source_root = root.join(&config.build.source);
    let destination_root = root.join(&config.build.out);

    let tree = walk::walk_site(&source_root, &config.srcset.file_extension)?;
    let (mut documents, draft_dirs, drafts) = select_documents(tree.documents, prod);

    let backend: Arc<dyn MediaBackend> = Arc::new(FsBackend);
    let pipeline = run_srcset_pipeline(
        &mut documents,
        &config,
        &source_root,
        &destination_root,
        &backend,
        jobs,
    )?;

    let rendered = write_documents(&documents, &destination_root, &config)?;
    let assets = assets::publish_assets(
        &source_root,
        &destination_root,
        &tree.assets,
        &pipeline.managed_outputs,
        &draft_dirs,
    )?;

    Ok(BuildReport {
        pipeline,
        assets,
        rendered,
        drafts,
        destination_root,
    })
}

fn select_documents(
    documents: Vec<Document>,
    prod: bool,
) -> (Vec<Document>, BTreeSet<String>, usize) {
    if !prod {
        return (documents, BTreeSet::new(), 0);
    }
    let mut kept = Vec::new();
    let mut draft_dirs = BTreeSet::new();
    let mut drafts = 0;
    for document in documents {
        if document.header.draft {
            println!("skipping draft {}", document.source_path);
            drafts += 1;
            if !document.dir_path.is_empty() {
                draft_dirs.insert(document.dir_path.clone());
            }
            continue;
        }
        kept.push(document);
    }
    (kept, draft_dirs, drafts)
}

fn write_documents(
    documents: &[Document],
    destination_root: &Path,
    config: &SiteConfig,
) -> Result<usize> {
    let mut rendered = 0;
    for document in documents {
        let rel = html_output_path(&document.source_path, &config.srcset.file_extension);
        let out_path = destination_root.join(&rel);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let title = document
            .header
            .title
            .clone()
            .unwrap_or_else(|| file_stem(&document.file_name).to_string());
        let html = render_page(&title, &document.contents);
        fs::write(&out_path, html)
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        rendered += 1;
    }
    Ok(rendered)
}

fn html_output_path(source_path: &str, file_extension: &str) -> String {
    match source_path.strip_suffix(file_extension) {
        Some(stem) => format!("{stem}.html"),
        None => format!("{source_path}.html"),
    }
}

fn file_stem(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name)
}

fn run_scan(cli: &Cli) -> Result<()> {
    let root = root_dir(cli)?;
    let config = load_site_config(&root.join("bloggen.yaml"))?;
    let source_root = root.join(&config.build.source);
    let destination_root = root.join(&config.build.out);
    let tree = walk::walk_site(&source_root, &config.srcset.file_extension)?;

    let backend = FsBackend;
    let mut internal = 0usize;
    let mut external = 0usize;
    let mut pending = 0usize;
    for document in &tree.documents {
        let refs = scan_image_refs(&document.contents);
        if refs.is_empty() {
            continue;
        }
        println!("{}:", document.source_path);
        for reference in refs {
            if reference.is_external() {
                external += 1;
                println!("  {} (external)", reference.source_file());
                continue;
            }
            internal += 1;
            let original = source_root
                .join(&document.dir_path)
                .join(reference.source_file());
            let Some(original_ms) = backend.mtime_ms(&original)? else {
                println!("  {} (missing!)", reference.source_file());
                continue;
            };
            let variants = plan_variants(
                &reference,
                &document.dir_path,
                &source_root,
                &destination_root,
                &config.srcset,
            );
            for variant in variants {
                let decision = decide_staleness(
                    original_ms,
                    backend.mtime_ms(&variant.source_path)?,
                    backend.mtime_ms(&variant.destination_path)?,
                );
                if decision.is_noop() {
                    continue;
                }
                pending += 1;
                let action = if decision.needs_resize {
                    "resize+publish"
                } else {
                    "publish"
                };
                println!("  {} {}", variant.file_name, action);
            }
        }
    }
    println!("references: {internal} internal, {external} external");
    println!("pending operations: {pending}");
    Ok(())
}
