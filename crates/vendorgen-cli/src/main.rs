//! vendorgen - regenerate the self-contained Tor cgo package
//!
//! ## Commands
//!
//! - `generate`: acquire, introspect, prune and wrap all four libraries
//! - `extract`: run a library's extraction rules over a captured build log
//! - `ledger show`: print the pinned revisions

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, Level};
use vendorgen_core::{
    extract_units, CompilationUnit, GeneratorConfig, Library, Orchestrator, PlatformGroup,
    RunMode, RunReport, VersionLedger, HOMEBREW_PREFIX,
};
use vendorgen_native::ProcessRunner;

#[derive(Parser)]
#[command(name = "vendorgen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate cgo wrappers for zlib, libevent, OpenSSL and Tor", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and reports
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate the wrapper package
    Generate(GenerateArgs),

    /// Print the compilation units a captured dry-run log yields
    Extract {
        /// Library whose extraction rules to apply
        #[arg(short, long)]
        library: Library,

        /// Captured `make --dry-run` output
        #[arg(long)]
        log: PathBuf,
    },

    /// Inspect the version ledger
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
}

#[derive(Subcommand)]
enum LedgerAction {
    /// Show pinned revisions
    Show {
        /// Ledger file
        #[arg(long, default_value = "lock.json", env = "VENDORGEN_LEDGER")]
        path: PathBuf,
    },
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Follow upstream and rewrite the ledger instead of replaying it
    #[arg(long, env = "VENDORGEN_REFRESH")]
    refresh: bool,

    /// Skip the `go build` validation
    #[arg(long, env = "VENDORGEN_NO_VALIDATE")]
    no_validate: bool,

    /// Repository root
    #[arg(long, default_value = ".", env = "VENDORGEN_ROOT")]
    root: PathBuf,

    /// Ledger file, relative to the root unless absolute
    #[arg(long, env = "VENDORGEN_LEDGER")]
    ledger: Option<PathBuf>,

    /// Generate for this operating system instead of the host's
    #[arg(long, env = "VENDORGEN_PLATFORM")]
    platform: Option<String>,

    /// libevent install prefix passed to Tor's configure
    #[arg(long, env = "VENDORGEN_LIBEVENT_DIR")]
    with_libevent_dir: Option<PathBuf>,

    /// OpenSSL install prefix passed to Tor's configure
    #[arg(long, env = "VENDORGEN_OPENSSL_DIR")]
    with_openssl_dir: Option<PathBuf>,

    /// zlib install prefix passed to Tor's configure
    #[arg(long, env = "VENDORGEN_ZLIB_DIR")]
    with_zlib_dir: Option<PathBuf>,

    /// Kill native tools running longer than this
    #[arg(long, env = "VENDORGEN_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

impl GenerateArgs {
    fn into_config(self) -> Result<GeneratorConfig> {
        let mode = if self.refresh {
            RunMode::Refresh
        } else {
            RunMode::Replay
        };
        let mut config = GeneratorConfig::new(self.root)
            .with_mode(mode)
            .with_validation(!self.no_validate)
            .with_timeout_secs(self.timeout_secs);

        if let Some(ledger) = self.ledger {
            config = config.with_ledger_file(ledger);
        }
        if let Some(os) = self.platform {
            config = config.with_platform(PlatformGroup::for_os(&os)?);
        }
        for (library, prefix) in [
            (Library::Libevent, self.with_libevent_dir),
            (Library::Openssl, self.with_openssl_dir),
            (Library::Zlib, self.with_zlib_dir),
        ] {
            if let Some(prefix) = prefix {
                config = config.with_dependency_prefix(library, prefix);
            }
        }
        Ok(config.with_homebrew_prefixes(Path::new(HOMEBREW_PREFIX)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    vendorgen_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Generate(args) => cmd_generate(args, cli.json).await,
        Commands::Extract { library, log } => cmd_extract(library, &log),
        Commands::Ledger {
            action: LedgerAction::Show { path },
        } => cmd_ledger_show(&path, cli.json),
    }
}

async fn cmd_generate(args: GenerateArgs, json: bool) -> Result<()> {
    if !vendorgen_native::is_available("git") {
        bail!("git is required to fetch upstream sources but was not found on PATH");
    }

    let config = args.into_config()?;
    let mut runner = ProcessRunner::new();
    if let Some(secs) = config.timeout_secs {
        runner = runner.with_timeout_secs(secs);
    }

    let report = match Orchestrator::new(config, &runner).run().await {
        Ok(report) => report,
        Err(e) => {
            let stage = e.stage();
            error!(stage = %stage, library = e.library().unwrap_or("-"), "Generator run failed");
            return Err(anyhow::Error::new(e).context(format!("{stage} stage failed")));
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_summary(&report));
    }
    Ok(())
}

fn render_summary(report: &RunReport) -> String {
    let mut out = String::new();
    for outcome in &report.libraries {
        let short = outcome.revision.get(..12).unwrap_or(outcome.revision.as_str());
        out.push_str(&format!(
            "{:<9} {:<16} {}  {:>4} units  {:>4} files  {:>2} headers\n",
            outcome.library.name(),
            outcome.version.version,
            short,
            outcome.units.len(),
            outcome.wrappers.len(),
            outcome.headers.len(),
        ));
    }
    out.push_str(&format!(
        "{} wrappers for {} ({} mode), digest {}\n",
        report.wrapper_count(),
        report.group,
        match report.mode {
            RunMode::Replay => "replay",
            RunMode::Refresh => "refresh",
        },
        report.output_digest,
    ));
    if report.ledger_written {
        out.push_str("ledger updated\n");
    }
    out
}

fn cmd_extract(library: Library, log: &Path) -> Result<()> {
    let spec = library.spec();
    let Some(rules) = spec.discovery_rules() else {
        bail!("{library} sources are enumerated from the tree; there is no build log to scrape");
    };
    let text = std::fs::read_to_string(log)
        .with_context(|| format!("Failed to read build log {}", log.display()))?;
    let units = extract_units(library.name(), &text, rules)?;
    for unit in &units {
        println!("{}", describe_unit(unit));
    }
    Ok(())
}

fn describe_unit(unit: &CompilationUnit) -> String {
    let sources = unit.sources();
    if sources.len() == 1 {
        return unit.path.clone();
    }
    let variants: Vec<String> = sources
        .iter()
        .filter_map(|s| {
            s.variant
                .map(|v| format!("{} [{}]", s.path, v.arches().join(",")))
        })
        .collect();
    format!("{} -> {}", unit.path, variants.join("; "))
}

fn cmd_ledger_show(path: &Path, json: bool) -> Result<()> {
    let ledger = VersionLedger::load(path)?;
    if json {
        print!("{}", ledger.to_json()?);
        return Ok(());
    }
    for library in Library::ALL {
        println!("{:<9} {}", library.name(), ledger.revision(library));
    }
    Ok(())
}
