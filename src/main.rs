use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use covreport::cli::{self, ShowOptions};
use covreport::generate::{self, GenerateOptions};
use covreport::renderer::sort::SortKey;
use covreport::renderer::state::{FlatLevel, ViewMode};

/// JaCoCo coverage aggregated across modules, variants and test suites.
#[derive(Parser)]
#[command(name = "covreport", version, about)]
struct Cli {
    /// Log debug output to stderr.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate JaCoCo XML reports and write a browsable report directory.
    Generate {
        /// XML report files, or directories to search for them.
        #[arg(long = "input", required = true)]
        inputs: Vec<PathBuf>,

        /// Project base directory that source roots are relative to.
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Output directory.
        #[arg(long)]
        output: PathBuf,

        /// Report title.
        #[arg(long, default_value = generate::DEFAULT_REPORT_NAME)]
        name: String,
    },

    /// Print project and per-module coverage without writing a report.
    Summary {
        /// XML report files, or directories to search for them.
        #[arg(long = "input", required = true)]
        inputs: Vec<PathBuf>,

        /// Project base directory that source roots are relative to.
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },

    /// Render a table view of a generated report.
    Show {
        /// Generated report directory.
        #[arg(long)]
        report: PathBuf,

        /// flat or tree.
        #[arg(long, default_value = "flat")]
        view: ViewMode,

        /// modules, test-suites, packages or classes (flat view only).
        #[arg(long)]
        level: Option<FlatLevel>,

        #[arg(long)]
        module: Option<String>,

        #[arg(long)]
        test_suite: Option<String>,

        #[arg(long)]
        package: Option<String>,

        #[arg(long)]
        class: Option<String>,

        /// Variants to show (default: all).
        #[arg(long = "variant")]
        variants: Vec<String>,

        #[arg(long)]
        search: Option<String>,

        /// `name` or `<instruction|branch>.<variant>.<percent|covered|total>`.
        #[arg(long)]
        sort: Option<SortKey>,

        /// Sort descending.
        #[arg(long)]
        desc: bool,

        /// Tree row ids to expand, e.g. `app` or `app/com.example`.
        #[arg(long)]
        expand: Vec<String>,
    },

    /// Print line-level coverage of one class from a generated report.
    Source {
        /// Generated report directory.
        #[arg(long)]
        report: PathBuf,

        #[arg(long)]
        module: String,

        #[arg(long)]
        package: String,

        #[arg(long)]
        class: String,

        /// Suite to prefer (default: Aggregated).
        #[arg(long)]
        test_suite: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = match cli.command {
        Commands::Generate {
            inputs,
            project_dir,
            output,
            name,
        } => {
            let mut options = GenerateOptions::new(inputs, project_dir, output);
            options.name = name;
            cli::cmd_generate(&options)?
        }
        Commands::Summary { inputs, project_dir } => {
            cli::cmd_summary(&inputs, &project_dir).context("Failed to summarize coverage")?
        }
        Commands::Show {
            report,
            view,
            level,
            module,
            test_suite,
            package,
            class,
            variants,
            search,
            sort,
            desc,
            expand,
        } => {
            let options = ShowOptions {
                view,
                level,
                module,
                test_suite,
                package,
                class,
                variants,
                search,
                sort,
                descending: desc,
                expand,
            };
            cli::cmd_show(&report, &options)?
        }
        Commands::Source {
            report,
            module,
            package,
            class,
            test_suite,
        } => {
            let request = cli::source_request(&module, &package, &class, test_suite.as_deref());
            cli::cmd_source(&report, &request)?
        }
    };

    print!("{output}");
    Ok(())
}
