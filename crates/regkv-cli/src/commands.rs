use std::io::Cursor;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;

use regkv_config::DriverConfig;
use regkv_driver::Driver;
use regkv_store::{quorum, InMemoryCluster};
use regkv_types::{ancestors, dirname, key, parent_tag};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Config(args) => cmd_config(args, format),
        Command::Path(args) => cmd_path(args, format),
        Command::Demo(args) => cmd_demo(args, format),
    }
}

fn load(file: &std::path::Path) -> anyhow::Result<DriverConfig> {
    DriverConfig::from_file(file).with_context(|| format!("loading {}", file.display()))
}

fn cmd_config(args: ConfigArgs, format: OutputFormat) -> anyhow::Result<()> {
    match args.action {
        ConfigAction::Check { file } => {
            let config = load(&file)?;
            println!(
                "{} {} is valid ({} groups, {} remotes, quorum {})",
                "✓".green().bold(),
                file.display().to_string().bold(),
                config.groups.len(),
                config.nodes.len(),
                quorum(config.groups.len())
            );
        }
        ConfigAction::Show { file } => {
            let config = load(&file)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
                OutputFormat::Text => print_config(&config),
            }
        }
    }
    Ok(())
}

fn print_config(config: &DriverConfig) {
    let groups: Vec<String> = config.groups.iter().map(u32::to_string).collect();
    let nodes: Vec<String> = config.nodes.iter().map(ToString::to_string).collect();
    println!("groups:                    {}", groups.join(", ").cyan());
    println!("nodes:                     {}", nodes.join(" ").cyan());
    println!("namespace:                 {}", config.namespace.yellow());
    println!("index_namespace:           {}", config.index_namespace.yellow());
    println!("verbosity:                 {}", config.verbosity);
    println!("logfile:                   {}", config.logfile.display());
    println!("wait_timeout:              {}s", config.wait_timeout.as_secs());
    println!("check_timeout:             {}s", config.check_timeout.as_secs());
    println!("io_thread_num:             {}", config.io_thread_num);
    println!("net_thread_num:            {}", config.net_thread_num);
    println!("nonblocking_io_thread_num: {}", config.nonblocking_io_thread_num);
    println!("buffer_size:               {}", config.buffer_size);
}

fn cmd_path(args: PathArgs, format: OutputFormat) -> anyhow::Result<()> {
    let path = args.path.as_str();
    let tag = parent_tag(&args.namespace, path);
    let markers: Vec<_> = ancestors(path)
        .map(|dir| (dir, parent_tag(&args.namespace, dir)))
        .collect();

    match format {
        OutputFormat::Json => {
            let value = json!({
                "key": key(path),
                "tag": tag,
                "markers": markers
                    .iter()
                    .map(|(dir, tag)| json!({ "key": dir, "tag": tag }))
                    .collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!("key:    {}", key(path).bold());
            println!("parent: {:?}", dirname(path));
            println!("tag:    {}", tag.to_string().cyan());
            if markers.is_empty() {
                println!("no directory markers");
            }
            for (dir, tag) in &markers {
                println!("  {} {} {}", "marker".dimmed(), dir.yellow(), tag.to_string().cyan());
            }
        }
    }
    Ok(())
}

fn cmd_demo(args: DemoArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = load(&args.file)?;
    let cluster = InMemoryCluster::new(&config.groups);
    for remote in &config.nodes {
        cluster.listen(remote.clone());
    }
    let node = cluster
        .node(&config.node_config())
        .with_context(|| format!("failed to open store log {}", config.logfile.display()))?;
    let driver = Driver::connect(&node, config)?;

    let path = args.path.as_str();
    driver.put_content(path, b"demo content")?;
    let content = driver.get_content(path)?;
    let streamed = format!("{path}.stream");
    let written = driver.stream_write(&streamed, &mut Cursor::new(vec![b'x'; 1000]))?;

    let parent = dirname(path);
    let mut listed: Vec<String> = driver.list_directory(parent)?.collect();
    listed.sort();
    let attrs = driver.stat(path)?;
    let parent_attrs = driver.stat(parent)?;
    let size = driver.get_size(&streamed)?;

    let top = ancestors(path).last().unwrap_or(path).to_string();
    driver.remove(&top)?;
    let still_exists = driver.exists(path)?;

    match format {
        OutputFormat::Json => {
            let value = json!({
                "put": path,
                "content": String::from_utf8_lossy(&content),
                "streamed": { "path": streamed, "bytes": written, "size": size },
                "listing": { "path": parent, "keys": listed },
                "stat": { "path": attrs, "parent": parent_attrs },
                "removed": top,
                "exists_after_remove": still_exists,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!("{} put {}", "✓".green(), path.bold());
            println!("{} read back {:?}", "✓".green(), String::from_utf8_lossy(&content));
            println!("{} streamed {} bytes to {} (size {})", "✓".green(), written, streamed.bold(), size);
            println!("listing of {}:", parent.bold());
            for key in &listed {
                println!("  {key}");
            }
            println!("{} is a {} of {} bytes", path, attrs.kind, attrs.size);
            println!("{} is a {}", parent, parent_attrs.kind);
            println!("{} removed {} (exists afterwards: {})", "✓".green(), top.yellow(), still_exists);
        }
    }
    Ok(())
}
