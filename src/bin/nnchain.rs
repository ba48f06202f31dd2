//! nnchain CLI
//!
//! Clusters a tab-separated distance file and writes two outputs:
//!
//! - `OUT_FILE`: the full merge tree, root first
//! - `OUT_FILE.cluster`: flat clusters cut at `--threshold`
//!
//! ```bash
//! nnchain distances.tsv 1000 tree.tsv --threshold 0.15 --linkage average -v
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use nnchain::{AgglomerativeClusterer, ClusterParams, DendrogramWriter, Linkage};

/// Agglomerative hierarchical clustering over a precomputed distance file.
#[derive(Parser)]
#[command(name = "nnchain")]
#[command(version)]
#[command(about = "Nearest-neighbor chain hierarchical clustering")]
struct Cli {
    /// Tab-separated `nameA<TAB>nameB<TAB>distance` file
    distance_file: PathBuf,

    /// Number of distinct items in the file
    num_items: usize,

    /// Tree output; flat clusters go to `<OUT_FILE>.cluster`
    out_file: PathBuf,

    /// Cut height for flat clusters (overrides --params)
    #[arg(short, long)]
    threshold: Option<f32>,

    /// Linkage: average, single, complete or ward (overrides --params)
    #[arg(short, long)]
    linkage: Option<Linkage>,

    /// JSON file with run parameters
    #[arg(long)]
    params: Option<PathBuf>,

    /// Also write the dendrogram as JSON to `<OUT_FILE>.json`
    #[arg(long)]
    json: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        error!("{e}");
        eprintln!("nnchain: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> nnchain::Result<()> {
    let mut params = match &cli.params {
        Some(path) => ClusterParams::from_json_file(path)?,
        None => ClusterParams::default(),
    };
    if let Some(threshold) = cli.threshold {
        params = params.with_threshold(threshold);
    }
    if let Some(linkage) = cli.linkage {
        params = params.with_linkage(linkage);
    }

    info!(
        file = %cli.distance_file.display(),
        items = cli.num_items,
        linkage = %params.linkage,
        "loading distances"
    );
    let clusterer = AgglomerativeClusterer::from_path(&cli.distance_file, cli.num_items, params)?;
    let dendrogram = clusterer.cluster()?;
    let writer = DendrogramWriter::new(&dendrogram);

    let mut out = create(&cli.out_file)?;
    writer.write_tree(&mut out)?;
    out.flush()?;

    let cluster_path = with_suffix(&cli.out_file, "cluster");
    let mut out = create(&cluster_path)?;
    writer.write_clusters(&mut out, params.threshold)?;
    out.flush()?;

    if cli.json {
        let mut out = create(&with_suffix(&cli.out_file, "json"))?;
        writer.write_json(&mut out)?;
        out.flush()?;
    }

    info!(
        tree = %cli.out_file.display(),
        clusters = %cluster_path.display(),
        "output written"
    );
    Ok(())
}

fn create(path: &Path) -> nnchain::Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

/// `tree.tsv` + `cluster` -> `tree.tsv.cluster`
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
