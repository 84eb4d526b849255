use anyhow::Context;
use clap::{Parser, Subcommand};
use foreman::campaign::CampaignConfig;
use foreman::replay::ReplayConfig;
use prospector::resolve::Transfer;
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lapidary")]
#[command(about = "Incremental proof slicing and elaboration campaigns", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a corpus for trusted-rewrite holes, slice each one, and
    /// elaborate the slices under a timeout.
    Run {
        /// Corpus root to scan for *.smt2.alethe certificates.
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Directory that receives `sliced_proofs` (default: alongside ROOT).
        #[arg(long)]
        out_root: Option<PathBuf>,
        /// Rewrite-rules file handed to the elaborator.
        #[arg(long, default_value = "big.rare")]
        rare_file: PathBuf,
        /// Ledger file appended with one record per elaborated hole.
        #[arg(long, default_value = "results.json")]
        results: PathBuf,
        /// Per-elaboration timeout in seconds (0 disables).
        #[arg(long, default_value_t = 60)]
        elab_timeout_sec: u64,
        /// Verbose debug output on stderr; keeps empty .stderr captures.
        #[arg(long)]
        debug: bool,
        /// Copy the specification file into the output tree instead of
        /// moving it.
        #[arg(long)]
        no_move: bool,
    },
    /// Flatten a corpus scan into a JSON job list for `replay`.
    Extract {
        /// Corpus root to scan.
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Output path (default: `<root-name>.commands.json`).
        out: Option<PathBuf>,
    },
    /// Re-run slicing from a JSON job list (array, object, or JSONL).
    Replay {
        /// Job list path, `-` for stdin.
        #[arg(default_value = "-")]
        input: String,
        /// Directory searched for the certificates named by the jobs.
        #[arg(long, default_value = ".")]
        search_root: PathBuf,
        /// Directory that receives `sliced_proofs` (default: alongside the
        /// search root).
        #[arg(long)]
        out_root: Option<PathBuf>,
        /// Verbose debug output on stderr.
        #[arg(long)]
        debug: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("warning: .env: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            root,
            out_root,
            rare_file,
            results,
            elab_timeout_sec,
            debug,
            no_move,
        } => {
            cmd_run(
                root,
                out_root,
                rare_file,
                results,
                elab_timeout_sec,
                debug,
                no_move,
            )
            .await
        }
        Commands::Extract { root, out } => cmd_extract(&root, out.as_deref()),
        Commands::Replay {
            input,
            search_root,
            out_root,
            debug,
        } => cmd_replay(input, search_root, out_root, debug).await,
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(
    root: PathBuf,
    out_root: Option<PathBuf>,
    rare_file: PathBuf,
    results: PathBuf,
    elab_timeout_sec: u64,
    debug: bool,
    no_move: bool,
) -> anyhow::Result<()> {
    ensure_tool(quarry::tool::DEFAULT_PROGRAM)?;

    let cfg = CampaignConfig {
        root,
        out_root,
        rules_file: rare_file,
        results_file: results,
        timeout_secs: elab_timeout_sec,
        debug,
        transfer: if no_move { Transfer::Copy } else { Transfer::Move },
        program: quarry::tool::DEFAULT_PROGRAM.to_string(),
    };

    let mut stdout = std::io::stdout();
    let summary = foreman::campaign::run(&cfg, &mut stdout).await?;
    if debug {
        eprintln!(
            "debug: {} certificate(s), {} job(s): {} recorded, {} cached, {} not_found, {} slice_error(s), {} error(s)",
            summary.certificates,
            summary.jobs,
            summary.recorded,
            summary.cached,
            summary.not_found,
            summary.slice_errors,
            summary.errors
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// extract
// ---------------------------------------------------------------------------

fn cmd_extract(root: &std::path::Path, out: Option<&std::path::Path>) -> anyhow::Result<()> {
    let (out_path, count) = foreman::extract::run(root, out)?;
    println!("Wrote {} matches to {}", count, out_path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// replay
// ---------------------------------------------------------------------------

async fn cmd_replay(
    input: String,
    search_root: PathBuf,
    out_root: Option<PathBuf>,
    debug: bool,
) -> anyhow::Result<()> {
    ensure_tool(quarry::tool::DEFAULT_PROGRAM)?;

    let text = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading job list from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&input).with_context(|| format!("reading job list {input}"))?
    };

    let cfg = ReplayConfig {
        search_root,
        out_root,
        debug,
        program: quarry::tool::DEFAULT_PROGRAM.to_string(),
    };

    let mut stdout = std::io::stdout();
    let summary = foreman::replay::run(&cfg, &text, &mut stdout).await?;
    if debug {
        eprintln!(
            "debug: {} sliced, {} skipped, {} not_found, {} error(s)",
            summary.sliced, summary.skipped, summary.not_found, summary.errors
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Environment preconditions
// ---------------------------------------------------------------------------

/// The external tool must be spawnable before any scanning begins.
fn ensure_tool(program: &str) -> anyhow::Result<()> {
    if !quarry::tool::available(program) {
        anyhow::bail!("`{program}` not found in PATH");
    }
    Ok(())
}
