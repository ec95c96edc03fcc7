use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};
use converter::ThemeStore;

#[derive(Parser, Debug)]
#[command(name = "theme-porter")]
#[command(about = "Convert VS Code and JetBrains themes into AndroidIDE color schemes")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
    /// Configuration file (defaults to ./theme-porter.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download or read a theme package and write an AndroidIDE scheme bundle
    Convert(ConvertArgs),
    /// Search the VS Code Marketplace for themes
    Search(SearchArgs),
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["url", "file"])))]
pub struct ConvertArgs {
    /// Package URL (.vsix, JetBrains plugin zip or a bare theme file)
    #[arg(long)]
    pub url: Option<String>,

    /// Local package or theme file
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Display name of the resulting scheme
    #[arg(long)]
    pub name: String,

    /// Store the package comes from (vscode or jetbrains)
    #[arg(long, value_parser = parse_store)]
    pub store: Option<ThemeStore>,

    /// Output directory, overriding `output_dir` from the configuration
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search text; matches names, publishers and tags
    pub query: String,

    /// Result page, starting at 1
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Results per page, overriding `marketplace.page_size`
    #[arg(long)]
    pub page_size: Option<u32>,
}

fn parse_store(value: &str) -> Result<ThemeStore, String> {
    ThemeStore::parse(value).ok_or_else(|| {
        format!("unknown store '{value}', expected one of: vscode, jetbrains")
    })
}
