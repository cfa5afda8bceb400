use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "regkv",
    about = "regkv — registry storage on a replicated key-value store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate or print a configuration file
    Config(ConfigArgs),
    /// Show the key, tag and directory markers derived from a path
    Path(PathArgs),
    /// Run a put/list/stat/remove session against an in-memory store
    Demo(DemoArgs),
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Check that a configuration file is valid
    Check { file: PathBuf },
    /// Print the effective configuration, defaults included
    Show { file: PathBuf },
}

#[derive(Args)]
pub struct PathArgs {
    pub path: String,
    #[arg(long, default_value = "docker")]
    pub namespace: String,
}

#[derive(Args)]
pub struct DemoArgs {
    pub file: PathBuf,
    /// Path written during the session
    #[arg(long, default_value = "repositories/library/demo/tag_latest")]
    pub path: String,
}
