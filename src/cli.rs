//! CLI parsing and orchestration. Runs catalog walk -> detail fetch -> EPUB
//! and PDF synthesis, with per-stage checkpoints. Maps errors to exit codes.

use crate::checkpoint::{Checkpoint, CheckpointError, JsonCheckpoint};
use crate::config;
use crate::epub::{write_epub, EpubError};
use crate::harvest::catalog::{resolve_category_name, walk_catalog};
use crate::harvest::detail::fetch_all;
use crate::harvest::SessionClient;
use crate::model::{build_chapters, PostRecord, PostRef};
use crate::pdf::{write_pdf, PdfError};
use clap::Parser;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://reigokaitranslations.com";
const DEFAULT_AUTHOR: &str = "Reigokai Translations";
const DEFAULT_PER_PAGE: u32 = 100;
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_FONT_PATH: &str = "assets/DejaVuSans.ttf";
const FONT_URL: &str =
    "https://github.com/dejavu-fonts/dejavu-fonts/raw/version_2_37/ttf/DejaVuSans.ttf";

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("No posts in the corpus; nothing to synthesize.")]
    NoPosts,

    #[error("{0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("{0}")]
    Epub(#[from] EpubError),

    #[error("{0}")]
    Pdf(#[from] PdfError),

    #[error("Could not provision font: {0}")]
    FontProvision(String),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::NoPosts | CliRunError::Checkpoint(_) => 2,
            CliRunError::Epub(_) | CliRunError::Pdf(_) | CliRunError::FontProvision(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "wparchive")]
#[command(about = "Archive a WordPress category as EPUB and PDF")]
#[command(
    after_help = "The clearance token is taken from --token, the config file, or the CF_CLEARANCE environment variable. Config file keys (token, base_url, output_dir, user_agent, per_page, request_delay_secs, timeout_secs, font_path) follow the same precedence: CLI flags override config."
)]
pub struct Args {
    /// Category id on the remote platform.
    pub category_id: u32,

    /// Platform root URL.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Cloudflare clearance token (overrides config and CF_CLEARANCE).
    #[arg(long)]
    pub token: Option<String>,

    /// Directory for checkpoints and the per-category output directory. Default: current directory.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// TTF font for the PDF. Downloaded to the default location if missing.
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Listing page size (default 100).
    #[arg(long)]
    pub per_page: Option<u32>,

    /// Delay between requests in seconds (default 0).
    #[arg(long)]
    pub delay: Option<u64>,

    /// Request timeout in seconds (default 15).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Write only the EPUB, skipping font provisioning and the PDF.
    #[arg(long)]
    pub skip_pdf: bool,

    /// Suppress progress output (errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Print verbose error chain.
    #[arg(long)]
    pub verbose: bool,
}

/// Token precedence: CLI flag, then config file, then CF_CLEARANCE. The
/// environment is read once here; core logic only ever sees the resolved value.
fn resolve_token(from_args: Option<&str>, from_config: Option<&str>) -> Option<String> {
    from_args
        .map(String::from)
        .or_else(|| from_config.map(String::from))
        .or_else(|| std::env::var("CF_CLEARANCE").ok().filter(|v| !v.is_empty()))
}

/// Make sure the PDF font exists, downloading it next to the checkpoints if
/// not. Failure is fatal for the PDF step only.
fn ensure_font(font_path: &Path, client: &mut SessionClient) -> Result<(), CliRunError> {
    if font_path.exists() {
        return Ok(());
    }
    eprintln!("Downloading {} ...", FONT_URL);
    let bytes = client
        .get_bytes(FONT_URL)
        .map_err(|e| CliRunError::FontProvision(e.to_string()))?;
    if let Some(parent) = font_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CliRunError::FontProvision(e.to_string()))?;
        }
    }
    std::fs::write(font_path, bytes).map_err(|e| CliRunError::FontProvision(e.to_string()))
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(|e| CliRunError::InvalidInput(e.to_string()))?;

    let token = resolve_token(
        args.token.as_deref(),
        config.as_ref().and_then(|c| c.token.as_deref()),
    )
    .ok_or_else(|| {
        CliRunError::InvalidInput(
            "No clearance token. Pass --token, set CF_CLEARANCE, or add token to the config file."
                .to_string(),
        )
    })?;

    let base_url = args
        .base_url
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.base_url.clone()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let per_page = args
        .per_page
        .or_else(|| config.as_ref().and_then(|c| c.per_page))
        .unwrap_or(DEFAULT_PER_PAGE);
    let delay_secs = args
        .delay
        .or_else(|| config.as_ref().and_then(|c| c.request_delay_secs))
        .unwrap_or(0);
    let timeout_secs = args
        .timeout
        .or_else(|| config.as_ref().and_then(|c| c.timeout_secs))
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let output_base: PathBuf = args
        .output_dir
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.output_dir.clone()))
        .unwrap_or_else(|| PathBuf::from("."));
    let font_path: PathBuf = args
        .font
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.font_path.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FONT_PATH));
    let user_agent = args
        .user_agent
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.user_agent.clone()));

    let mut builder = SessionClient::builder()
        .token(token)
        .referer(format!("{}/", base_url.trim_end_matches('/')))
        .delay_secs(delay_secs)
        .timeout_secs(timeout_secs);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    let mut client = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(e.to_string()))?;

    let category_name = resolve_category_name(&mut client, &base_url, args.category_id);
    if !args.quiet {
        eprintln!("Category: {}", category_name.replace('_', " "));
    }

    // Stage 1: catalog walk, skipped entirely when the listing checkpoint
    // already holds references from an earlier run.
    let listing_path = output_base.join(format!("{}_posts.json", category_name));
    let mut listing: JsonCheckpoint<PostRef> = JsonCheckpoint::open(&listing_path)?;
    if listing.is_empty() {
        let spinner: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
        let walk_progress = |page: u32| {
            let mut state = spinner.borrow_mut();
            let pb = state.get_or_insert_with(|| {
                let bar = indicatif::ProgressBar::new_spinner();
                bar.enable_steady_tick(Duration::from_millis(80));
                bar
            });
            pb.set_message(format!("Fetched listing page {}", page));
        };
        let progress: Option<&dyn Fn(u32)> = if args.quiet {
            None
        } else {
            Some(&walk_progress)
        };
        let refs = walk_catalog(&mut client, &base_url, args.category_id, per_page, progress);
        if let Some(pb) = spinner.borrow_mut().take() {
            pb.finish_and_clear();
        }
        for r in refs {
            listing.append(r)?;
        }
    } else if !args.quiet {
        eprintln!(
            "Using existing listing checkpoint ({} references): {}",
            listing.len(),
            listing_path.display()
        );
    }

    // Oldest-first for detail fetching; the listing API returns newest-first.
    let mut refs: Vec<PostRef> = listing.records().to_vec();
    refs.reverse();

    // Stage 2: resumable detail fetch.
    let content_path = output_base.join(format!("{}_content.json", category_name));
    let mut content: JsonCheckpoint<PostRecord> = JsonCheckpoint::open(&content_path)?;

    let progress_state: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
    let fetch_progress = |n: u32, total: u32| {
        if total == 0 {
            return;
        }
        let mut state = progress_state.borrow_mut();
        let pb = state.get_or_insert_with(|| {
            let bar = indicatif::ProgressBar::new(total as u64);
            bar.set_style(
                indicatif::ProgressStyle::default_bar()
                    .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
                    .unwrap()
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                    .progress_chars("█▉▊▋▌▍▎▏ "),
            );
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        pb.set_position(n as u64);
        pb.set_message(format!("Fetching post {}/{}", n, total));
    };
    let progress: Option<&dyn Fn(u32, u32)> = if args.quiet {
        None
    } else {
        Some(&fetch_progress)
    };

    let added = fetch_all(&refs, &mut client, &mut content, progress)?;
    if let Some(pb) = progress_state.borrow_mut().take() {
        pb.disable_steady_tick();
        pb.finish_and_clear();
    }
    if !args.quiet {
        eprintln!("Corpus: {} posts ({} new)", content.len(), added);
    }

    if content.is_empty() {
        return Err(CliRunError::NoPosts);
    }

    // Stage 3: synthesis. EPUB first; a PDF failure must not cost the EPUB.
    let chapters = build_chapters(content.records());
    let display_title = category_name.replace('_', " ");
    let out_dir = output_base.join(format!("{}_ebook", category_name));
    std::fs::create_dir_all(&out_dir).map_err(|e| {
        CliRunError::InvalidInput(format!(
            "Cannot create output directory {}: {}",
            out_dir.display(),
            e
        ))
    })?;

    let epub_path = out_dir.join(format!("{}.epub", category_name));
    write_epub(&display_title, DEFAULT_AUTHOR, &chapters, &epub_path)?;
    if !args.quiet {
        eprintln!("Wrote {}", epub_path.display());
    }

    if args.skip_pdf {
        return Ok(());
    }
    ensure_font(&font_path, &mut client)?;
    let pdf_path = out_dir.join(format!("{}.pdf", category_name));
    write_pdf(&display_title, &chapters, &font_path, &pdf_path)?;
    if !args.quiet {
        eprintln!("Wrote {}", pdf_path.display());
    }
    Ok(())
}
