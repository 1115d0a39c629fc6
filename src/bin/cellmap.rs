//! cellmap command-line tool
//!
//! Annotates an SDRF file with cell line information from a reference
//! database and writes the result as a TSV table.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cellmap::table::{read_query_file, read_reference_file, write_annotated_file};
use cellmap::{
    AnnotatorConfig, Annotator, Embedder, HashingEmbedder, ReferenceIndex, SemanticRanker,
    SimilarityMethod,
};

#[derive(Parser, Debug)]
#[command(name = "cellmap")]
#[command(about = "Annotate an SDRF file with cell line information from a database")]
struct Args {
    /// Path to the SDRF file.
    #[arg(long, value_parser = existing_file)]
    sdrf_file: PathBuf,

    /// Path to the cell line database (TSV).
    #[arg(long, value_parser = existing_file, default_value = "cl-annotations-db.tsv")]
    db_file: PathBuf,

    /// Path to the output TSV file.
    #[arg(long)]
    output_file: PathBuf,

    /// JSON configuration file; flags below override its values.
    #[arg(long, value_parser = existing_file)]
    config: Option<PathBuf>,

    /// Similarity threshold for a confident semantic match (strictly greater-than).
    #[arg(long)]
    threshold: Option<f64>,

    /// Number of semantic candidates to report per unresolved label.
    #[arg(long)]
    top_k: Option<usize>,

    /// Similarity method.
    #[arg(long)]
    method: Option<SimilarityMethod>,

    /// Write the raw label into the `cell line` column of unresolved rows.
    #[arg(long)]
    echo_unresolved: bool,

    /// Skip the semantic candidate pass.
    #[arg(long)]
    no_semantic: bool,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn existing_file(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("file does not exist: {s}"))
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &Args) -> Result<AnnotatorConfig> {
    let mut config = match &args.config {
        Some(path) => AnnotatorConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => AnnotatorConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if let Some(top_k) = args.top_k {
        config.top_k = top_k;
    }
    if let Some(method) = args.method {
        config.method = method;
    }
    if args.echo_unresolved {
        config.echo_unresolved_label = true;
    }
    if args.no_semantic {
        config.semantic_pass = false;
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;

    // The provider is acquired once and shared by every ranking call.
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(config.embedding_dim)?);
    let ranker = SemanticRanker::new(config.method, embedder).with_boundary(config.boundary);

    let labels = read_query_file(&args.sdrf_file).context("failed to read SDRF file")?;
    let index = ReferenceIndex::build(
        read_reference_file(&args.db_file).context("failed to read cell line database")?,
    );

    info!("Annotating SDRF file...");
    let annotation = Annotator::new(&index, Some(&ranker), &config).annotate(&labels)?;

    write_annotated_file(&args.output_file, &annotation.rows)
        .context("failed to write output file")?;
    info!("Annotation complete.");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
