use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;
use tessera_container::{
    Container, ContainerConfig, LinkClass, LinkInfo, LinkQuery, ObjectInfo, Resolved,
};
use tessera_types::ObjectKind;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref(), cli.read_only)?;
    let format = cli.format;
    match cli.command {
        Command::Init(args) => cmd_init(&args.file, config, format),
        Command::RebuildIndex(args) => cmd_rebuild_index(&args.file, config, format),
        Command::DumpIndex(args) => cmd_dump_index(&args.file, config, format),
        Command::Ls(args) => cmd_ls(args, config, format),
        Command::Info(args) => cmd_info(args, config, format),
        Command::Gc(args) => cmd_gc(&args.file, config, format),
    }
}

fn load_config(path: Option<&Path>, read_only: bool) -> anyhow::Result<ContainerConfig> {
    let mut config = match path {
        Some(path) => ContainerConfig::load(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => ContainerConfig::default(),
    };
    config.read_only |= read_only;
    debug!(?config, "container options");
    Ok(config)
}

fn open(file: &Path, config: ContainerConfig) -> anyhow::Result<Container> {
    Container::open(file, config)
        .with_context(|| format!("cannot open container {}", file.display()))
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn kind_label(kind: ObjectKind) -> colored::ColoredString {
    match kind {
        ObjectKind::Group => kind.to_string().blue(),
        ObjectKind::Dataset => kind.to_string().green(),
        ObjectKind::Datatype => kind.to_string().magenta(),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_init(file: &Path, config: ContainerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let container = Container::create(file, config)
        .with_context(|| format!("cannot create container {}", file.display()))?;
    let root = container.root_id()?;
    match format {
        OutputFormat::Json => print_json(&json!({ "file": file, "root": root })),
        OutputFormat::Text => {
            println!(
                "{} Initialized container {}",
                "✓".green().bold(),
                file.display().to_string().bold()
            );
            println!("  Root: {}", root.to_string().cyan());
            Ok(())
        }
    }
}

fn cmd_rebuild_index(
    file: &Path,
    config: ContainerConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let config = ContainerConfig {
        auto_rebuild: false,
        ..config
    };
    let container = open(file, config)?;
    let report = container.rebuild().context("rebuild failed")?;
    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&report)?),
        OutputFormat::Text => {
            println!("{} Rebuilt identity registry", "✓".green().bold());
            println!("  Root: {}", report.root.to_string().cyan());
            println!("  Objects indexed: {}", report.objects_indexed.to_string().bold());
            println!("  Hard links: {}", report.hard_links);
            println!("  Soft links: {}", report.soft_links);
            if report.dangling_links > 0 {
                println!("  Dangling soft links: {}", report.dangling_links.to_string().yellow());
            }
            println!("  External links: {}", report.external_links);
            if report.link_counts_repaired > 0 {
                println!(
                    "  Link counts repaired: {}",
                    report.link_counts_repaired.to_string().yellow()
                );
            }
            if report.unreachable > 0 {
                println!(
                    "  Unreachable objects: {} (run {} to reclaim)",
                    report.unreachable.to_string().yellow(),
                    "tessera gc".bold()
                );
            }
            Ok(())
        }
    }
}

fn cmd_dump_index(file: &Path, config: ContainerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let container = open(file, config)?;
    let root = container.root_id().ok();
    let entries = container.index_entries()?;
    match format {
        OutputFormat::Json => print_json(&json!({ "root": root, "entries": entries })),
        OutputFormat::Text => {
            match root {
                Some(root) => println!("Root: {}", root.to_string().cyan().bold()),
                None => println!("{}", "No identity registry.".yellow()),
            }
            for entry in &entries {
                println!(
                    "{}  {:<8}  @{}",
                    entry.id.to_string().cyan(),
                    kind_label(entry.kind),
                    entry.address
                );
            }
            println!("{} entries", entries.len().to_string().bold());
            Ok(())
        }
    }
}

fn cmd_ls(args: LsArgs, config: ContainerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let container = open(&args.file, config)?;
    let group = container
        .resolve_id(&args.path)
        .with_context(|| format!("cannot resolve {}", args.path))?;
    let query = LinkQuery {
        marker: args.marker,
        limit: args.limit,
        ..LinkQuery::default()
    };
    let links = container.list_links(group, &query)?;
    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&links)?),
        OutputFormat::Text => {
            for link in &links {
                println!("{}", describe_link(link));
            }
            Ok(())
        }
    }
}

fn describe_link(link: &LinkInfo) -> String {
    match link.class {
        LinkClass::Hard => {
            let kind = link
                .target_kind
                .map(|k| kind_label(k).to_string())
                .unwrap_or_else(|| "?".red().to_string());
            let id = link
                .target
                .map(|id| id.short_id())
                .unwrap_or_default();
            format!("{:<24} {:<8} {}", link.name.bold(), kind, id.dimmed())
        }
        LinkClass::Soft => format!(
            "{:<24} {} {}",
            link.name.bold(),
            "->".yellow(),
            link.path.as_deref().unwrap_or_default()
        ),
        LinkClass::External => format!(
            "{:<24} {} {}:{}",
            link.name.bold(),
            "=>".magenta(),
            link.file.as_deref().unwrap_or_default(),
            link.path.as_deref().unwrap_or_default()
        ),
    }
}

fn cmd_info(args: InfoArgs, config: ContainerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let container = open(&args.file, config)?;
    let resolved = container
        .resolve(&args.path)
        .with_context(|| format!("cannot resolve {}", args.path))?;
    let obj = match resolved {
        Resolved::Local(obj) => obj,
        Resolved::Foreign { file, path } => {
            return match format {
                OutputFormat::Json => print_json(&json!({ "external": { "file": file, "path": path } })),
                OutputFormat::Text => {
                    println!("{} external link to {}:{}", "=>".magenta(), file.bold(), path);
                    Ok(())
                }
            };
        }
    };
    let info = container.object_info(obj.id)?;
    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&info)?),
        OutputFormat::Text => {
            print_info(&info);
            Ok(())
        }
    }
}

fn print_info(info: &ObjectInfo) {
    println!("{} {}", kind_label(info.kind).bold(), info.id.to_string().cyan());
    if let Some(links) = info.link_count {
        println!("  Links: {links}");
    }
    if let Some(dtype) = info.dtype {
        println!("  Type: {dtype}");
    }
    if let Some(shape) = &info.shape {
        println!("  Shape: {shape:?}");
    }
    if let Some(max_shape) = &info.max_shape {
        let caps: Vec<String> = max_shape.iter().map(ToString::to_string).collect();
        println!("  Max shape: [{}]", caps.join(", "));
    }
    println!("  Attributes: {}", info.attribute_count);
    println!("  Hard links: {}", info.hard_links);
    println!("  Created: {}", info.created);
    println!("  Modified: {}", info.last_modified);
}

fn cmd_gc(file: &Path, config: ContainerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let container = open(file, config)?;
    let reclaimed = container.collect_garbage()?;
    match format {
        OutputFormat::Json => print_json(&json!({ "reclaimed": reclaimed })),
        OutputFormat::Text => {
            println!("{} GC: {} objects reclaimed.", "✓".green(), reclaimed);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tessera_container::DatasetSpec;
    use tessera_types::ElementType;

    fn make_file(dir: &tempfile::TempDir) -> PathBuf {
        let file = dir.path().join("c.tsra");
        cmd_init(&file, ContainerConfig::default(), OutputFormat::Text).unwrap();
        file
    }

    #[test]
    fn load_config_applies_read_only_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.toml");
        std::fs::write(&path, "auto_rebuild = false\n").unwrap();

        let config = load_config(Some(&path), true).unwrap();
        assert!(config.read_only);
        assert!(!config.auto_rebuild);
        assert!(!load_config(None, false).unwrap().read_only);
        assert!(load_config(Some(&dir.path().join("missing.toml")), false).is_err());
    }

    #[test]
    fn init_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = make_file(&dir);
        assert!(cmd_init(&file, ContainerConfig::default(), OutputFormat::Json).is_err());
    }

    #[test]
    fn commands_run_against_a_container() {
        let dir = tempfile::tempdir().unwrap();
        let file = make_file(&dir);
        {
            let c = Container::open(&file, ContainerConfig::default()).unwrap();
            let root = c.root_id().unwrap();
            let g = c.create_group(root, "g").unwrap();
            c.create_dataset(g, "d", &DatasetSpec::new(ElementType::Int32, vec![2]))
                .unwrap();
            c.link_soft(root, "s", "/g/d").unwrap();
            c.create_anonymous_group().unwrap();
        }

        for format in [OutputFormat::Text, OutputFormat::Json] {
            let ls = LsArgs {
                file: file.clone(),
                path: "/".into(),
                marker: None,
                limit: None,
            };
            cmd_ls(ls, ContainerConfig::default(), format).unwrap();
            let info = InfoArgs {
                file: file.clone(),
                path: "/s".into(),
            };
            cmd_info(info, ContainerConfig::default(), format).unwrap();
            cmd_dump_index(&file, ContainerConfig::default(), format).unwrap();
        }

        cmd_rebuild_index(&file, ContainerConfig::default(), OutputFormat::Text).unwrap();
        cmd_gc(&file, ContainerConfig::default(), OutputFormat::Json).unwrap();

        let c = Container::open(&file, ContainerConfig::read_only()).unwrap();
        assert_eq!(c.counts().unwrap().total(), 3);
    }

    #[test]
    fn gc_on_read_only_container_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = make_file(&dir);
        assert!(cmd_gc(&file, ContainerConfig::read_only(), OutputFormat::Text).is_err());
    }

    #[test]
    fn info_on_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = make_file(&dir);
        let args = InfoArgs {
            file,
            path: "/nope".into(),
        };
        assert!(cmd_info(args, ContainerConfig::default(), OutputFormat::Text).is_err());
    }

    #[test]
    fn describe_soft_link() {
        colored::control::set_override(false);
        let link = LinkInfo {
            name: "alias".into(),
            class: LinkClass::Soft,
            target: None,
            target_kind: None,
            path: Some("/g".into()),
            file: None,
        };
        let line = describe_link(&link);
        assert!(line.starts_with("alias"));
        assert!(line.ends_with("-> /g"));
    }
}
