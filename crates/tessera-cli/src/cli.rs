use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tessera",
    about = "Tessera: identity index tooling for hierarchical data containers",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with container options
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Open the container read-only
    #[arg(long, global = true)]
    pub read_only: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty container
    Init(InitArgs),
    /// Delete and rebuild the identity registry
    RebuildIndex(FileArgs),
    /// Print the identity registry
    DumpIndex(FileArgs),
    /// List the links of a group
    Ls(LsArgs),
    /// Show metadata of the object at a path
    Info(InfoArgs),
    /// Reclaim objects unreachable from the root group
    Gc(FileArgs),
}

#[derive(Args)]
pub struct InitArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct FileArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct LsArgs {
    pub file: PathBuf,
    #[arg(default_value = "/")]
    pub path: String,
    /// Start after this link name
    #[arg(long)]
    pub marker: Option<String>,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct InfoArgs {
    pub file: PathBuf,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["tessera", "init", "data.tsra"]).unwrap();
        if let Command::Init(args) = cli.command {
            assert_eq!(args.file, PathBuf::from("data.tsra"));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_rebuild_index() {
        let cli = Cli::try_parse_from(["tessera", "rebuild-index", "x.tsra"]).unwrap();
        assert!(matches!(cli.command, Command::RebuildIndex(_)));
    }

    #[test]
    fn parse_dump_index_json() {
        let cli =
            Cli::try_parse_from(["tessera", "--format", "json", "dump-index", "x.tsra"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Command::DumpIndex(_)));
    }

    #[test]
    fn parse_ls_defaults_to_root() {
        let cli = Cli::try_parse_from(["tessera", "ls", "x.tsra"]).unwrap();
        if let Command::Ls(args) = cli.command {
            assert_eq!(args.path, "/");
            assert!(args.limit.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_ls_paginated() {
        let cli = Cli::try_parse_from([
            "tessera", "ls", "x.tsra", "/g", "--marker", "a", "-n", "10",
        ])
        .unwrap();
        if let Command::Ls(args) = cli.command {
            assert_eq!(args.path, "/g");
            assert_eq!(args.marker.as_deref(), Some("a"));
            assert_eq!(args.limit, Some(10));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_info() {
        let cli = Cli::try_parse_from(["tessera", "info", "x.tsra", "/g1/d"]).unwrap();
        if let Command::Info(args) = cli.command {
            assert_eq!(args.path, "/g1/d");
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "tessera",
            "gc",
            "x.tsra",
            "--read-only",
            "-v",
            "--config",
            "t.toml",
        ])
        .unwrap();
        assert!(cli.read_only);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("t.toml")));
    }

    #[test]
    fn info_requires_path() {
        assert!(Cli::try_parse_from(["tessera", "info", "x.tsra"]).is_err());
    }
}
