use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use weft_core::{compile_with_partials, load_partials_dir};

/// Render a weft template against a JSON data file.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Template file; stdin is read when omitted
    #[arg(short, long)]
    template: Option<String>,

    /// JSON file holding the render data
    #[arg(short, long)]
    data: String,

    #[arg(
        long,
        value_name = "DIR",
        help = "Directory of partial templates, registered by relative path"
    )]
    partials: Option<String>,

    /// Output file; stdout is used when omitted
    #[arg(short, long)]
    output: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    let source = match cli.template {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("failed to read template file {path}"))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let raw = fs::read_to_string(&cli.data)
        .with_context(|| format!("failed to read data file {}", cli.data))?;
    let data: Value = serde_json::from_str(&raw)
        .with_context(|| format!("data file {} is not valid JSON", cli.data))?;

    let partials = match cli.partials {
        Some(root) => load_partials_dir(&root)
            .with_context(|| format!("failed to load partials from {root}"))?,
        None => HashMap::new(),
    };

    let template = compile_with_partials(&source, &partials)?;
    let rendered = template.render(&data)?;

    match cli.output {
        Some(path) => write_output(&path, rendered.as_bytes())?,
        None => io::stdout().write_all(rendered.as_bytes())?,
    }

    Ok(())
}

fn write_output(path: &str, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = PathBuf::from(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output file {path}"))?;
    Ok(())
}
