//! Command-line interface for nb2latex.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{
    BuildConfig, EnvironmentConfig, DEFAULT_COMPILER_PROGRAM, DEFAULT_CONVERTER_PROGRAM,
    DEFAULT_ENV_FILE, DEFAULT_ENV_NAME, DEFAULT_TITLE,
};
use crate::error::Result;
use crate::pipeline::{Pipeline, Stage};
use crate::tools::Micromamba;

/// nb2latex - Convert multiple Jupyter notebooks into a single LaTeX document and PDF.
#[derive(Parser)]
#[command(name = "nb2latex")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert notebooks, merge them and compile the PDF.
    Build(BuildArgs),

    /// Create the micromamba environment if it does not exist yet.
    Env {
        /// Environment name
        #[arg(long, default_value = DEFAULT_ENV_NAME)]
        name: String,

        /// Environment specification file
        #[arg(long, default_value = DEFAULT_ENV_FILE)]
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Notebooks (.ipynb) to merge, in order
    #[arg(required = true)]
    pub notebooks: Vec<String>,

    /// Document title
    #[arg(short, long, default_value = DEFAULT_TITLE)]
    pub title: String,

    /// Directory containing the notebooks (default: current directory)
    #[arg(short = 'C', long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Run the tools inside a micromamba environment, creating it if required
    #[arg(long)]
    pub env: bool,

    /// Name of the micromamba environment
    #[arg(long, default_value = DEFAULT_ENV_NAME)]
    pub env_name: String,

    /// Environment specification file used when creating the environment
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,

    /// Program providing `nbconvert`
    #[arg(long, env = "NB2LATEX_JUPYTER", default_value = DEFAULT_CONVERTER_PROGRAM)]
    pub jupyter: String,

    /// LaTeX compiler
    #[arg(long, env = "NB2LATEX_COMPILER", default_value = DEFAULT_COMPILER_PROGRAM)]
    pub compiler: String,

    /// Kill an external tool after this many seconds
    #[arg(long, env = "NB2LATEX_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Leave converted notebooks and body files in the working directory
    #[arg(long)]
    pub keep_intermediates_in_place: bool,
}

impl BuildArgs {
    /// Translate the arguments into a build configuration.
    pub fn to_config(&self) -> BuildConfig {
        let environment = self.env.then(|| EnvironmentConfig {
            name: self.env_name.clone(),
            file: self.env_file.clone(),
        });

        BuildConfig::new(self.title.clone())
            .with_work_dir(&self.work_dir)
            .with_environment(environment)
            .with_converter_program(&self.jupyter)
            .with_compiler_program(&self.compiler)
            .with_tool_timeout(self.timeout_secs.map(Duration::from_secs))
            .with_collect_intermediates(!self.keep_intermediates_in_place)
    }
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => build_command(&args),
        Commands::Env { name, file } => env_command(&EnvironmentConfig { name, file }),
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn stage_message(stage: &Stage) -> String {
    match stage {
        Stage::Converting { document } => format!("Converting {document}.ipynb to LaTeX file..."),
        Stage::Merging { documents } => format!("Merging {documents} documents..."),
        Stage::Compiling { pass } => format!("Compiling LaTeX (pass {pass})..."),
        Stage::Collecting => "Collecting output files...".to_string(),
    }
}

/// Execute the env command.
fn env_command(env: &EnvironmentConfig) -> Result<()> {
    let pb = spinner();
    pb.set_message(format!("Checking environment {}...", env.name));

    let created = match Micromamba::default().ensure(Path::new("."), env) {
        Ok(created) => created,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };
    pb.finish_and_clear();

    if created {
        println!(
            "{} '{}' from {}",
            style("Created environment").green().bold(),
            env.name,
            env.file.display()
        );
    } else {
        println!("{} '{}' exists", style("Environment").bold(), env.name);
    }
    Ok(())
}

/// Execute the build command.
fn build_command(args: &BuildArgs) -> Result<()> {
    let config = args.to_config();
    config.validate()?;

    println!(
        "{} {} notebook(s) into {}",
        style("Merging").bold(),
        style(args.notebooks.len()).cyan(),
        style(&config.title).green()
    );
    println!();

    let pb = spinner();

    if let Some(env) = &config.environment {
        pb.set_message(format!("Preparing environment {}...", env.name));
        let mamba = Micromamba::default().with_timeout(config.tool_timeout);
        if let Err(e) = mamba.ensure(&config.work_dir, env) {
            pb.finish_and_clear();
            return Err(e);
        }
    }

    let pipeline = Pipeline::with_default_tools(config);
    let report = match pipeline.run_with_progress(&args.notebooks, |stage| {
        pb.set_message(stage_message(stage));
    }) {
        Ok(report) => report,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.finish_and_clear();

    println!("  Documents: {}", report.documents.join(", "));
    println!("  Files: {}", report.collected.len());
    println!();
    println!(
        "{} {}",
        style("PDF compiling complete! Output:").green().bold(),
        report.pdf.display()
    );

    Ok(())
}
