//! CLI argument parsing and run dispatch

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn, LevelFilter};

use buildtools::config::{BuildConfig, CompileTarget, RunMode};
use buildtools::defaults;
use buildtools::logging;
use buildtools::output::{self, OutputConfig};
use buildtools::phases::{orchestrator, Outcome};

/// BuildTools - Build the Spigot and CraftBukkit server jars from source
#[derive(Parser, Debug)]
#[command(name = "buildtools")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Don't pull updates from git
    #[arg(long)]
    pub dont_update: bool,

    /// Version to build
    #[arg(long, value_name = "VERSION")]
    pub rev: Option<String>,

    /// Development mode: build the latest commit of every repository
    #[arg(long)]
    pub dev: bool,

    /// Software to compile
    #[arg(long, value_enum, value_delimiter = ',', value_name = "TARGETS")]
    pub compile: Vec<CompileTarget>,

    /// Do not compile (deprecated, use --compile none)
    #[arg(long, conflicts_with = "compile")]
    pub skip_compile: bool,

    /// Generate source jar
    #[arg(long)]
    pub generate_source: bool,

    /// Generate Javadoc jar
    #[arg(long)]
    pub generate_docs: bool,

    /// Exit after fetching the repositories
    #[arg(long)]
    pub exit_after_fetch: bool,

    /// Run BuildTools only when changes are detected in the repositories
    #[arg(long)]
    pub compile_if_changed: bool,

    /// Disable Java version check
    #[arg(long)]
    pub disable_java_check: bool,

    /// Disable HTTPS certificate check
    #[arg(long)]
    pub disable_certificate_check: bool,

    /// Where the final jars are placed
    #[arg(short, long, value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    /// JVM option forwarded to child Java processes (heap sizing flags only)
    #[arg(long = "jvm-option", value_name = "OPTION", allow_hyphen_values = true)]
    pub jvm_options: Vec<String>,

    /// Directory of published version descriptors
    #[arg(
        long,
        value_name = "URL",
        env = "BUILDTOOLS_VERSIONS_URL",
        default_value = defaults::VERSIONS_BASE_URL
    )]
    pub versions_url: String,

    /// Set log level
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        value_parser = ["off", "error", "warn", "info", "debug", "trace"]
    )]
    pub log_level: String,

    /// Colorize output (always, never, auto)
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: String,
}

impl Cli {
    /// The run configuration for `workspace`.
    pub fn to_config(&self, workspace: PathBuf) -> BuildConfig {
        let mut config = BuildConfig::new(workspace);
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        config.mode = if self.dev {
            RunMode::Development
        } else {
            RunMode::Release
        };
        config.revision = self.rev.clone();
        config.dont_update = self.dont_update;
        config.compile = if self.skip_compile {
            vec![CompileTarget::None]
        } else {
            self.compile.clone()
        };
        config.generate_source = self.generate_source;
        config.generate_docs = self.generate_docs;
        config.exit_after_fetch = self.exit_after_fetch;
        config.compile_if_changed = self.compile_if_changed;
        config.java_check = !self.disable_java_check;
        config.certificate_check = !self.disable_certificate_check;
        config.jvm_options = self.jvm_options.clone();
        config.versions_url = self.versions_url.clone();
        config
    }

    /// Execute the build
    pub fn execute(self) -> Result<()> {
        let workspace = std::env::current_dir().context("Failed to get current directory")?;
        let config = self.to_config(workspace);
        let output = OutputConfig::from_env_and_flag(&self.color);

        // Rejected options must not touch the previous run's log.
        config.validate()?;

        let level = logging::parse_level(&self.log_level).unwrap_or(LevelFilter::Info);
        logging::init(level, Some(config.log_file().as_path()))
            .with_context(|| format!("Failed to create {}", config.log_file().display()))?;

        info!(
            "Loading BuildTools version: {} ({})",
            env!("CARGO_PKG_VERSION"),
            config
                .build_number
                .map(|n| format!("#{}", n))
                .unwrap_or_else(|| "unversioned build".to_string())
        );
        if self.skip_compile {
            warn!("--skip-compile is deprecated, please use --compile none");
        }

        let start_time = Instant::now();
        let result = orchestrator::execute(config.clone());
        let elapsed = start_time.elapsed().as_secs_f64();

        match result {
            Ok(Outcome::Built { artifacts }) => {
                eprintln!("{}", output::success(&output, "Build completed successfully"));
                for artifact in &artifacts {
                    eprintln!("  {}", output::detail(&output, &artifact.display().to_string()));
                }
            }
            Ok(Outcome::Unchanged) => {
                eprintln!("{}", output::success(&output, "No changes detected, nothing to build"));
            }
            Ok(Outcome::FetchedOnly) => {
                eprintln!("{}", output::success(&output, "Repositories fetched"));
            }
            Err(e) => {
                let e = anyhow::Error::from(e);
                error!("{:#}", e);
                eprintln!("{}", output::failure(&output, "Build failed"));
                info!("Finished in {:.2} seconds", elapsed);
                return Err(e);
            }
        }

        info!("Finished in {:.2} seconds", elapsed);
        Ok(())
    }
}
