use std::path::Path;

use anyhow::Context;
use cfd_deploy::{
    read_source_dir, DeployConfig, DeployManifest, DeployReport, Deployer, FileBackingStore, TxPlan,
};
use colored::Colorize;
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let json = matches!(cli.format, OutputFormat::Json);
    match cli.command {
        Command::Deploy(args) => cmd_deploy(args, json),
        Command::Plan(args) => cmd_plan(args, json),
        Command::Restore(args) => cmd_restore(args, json),
        Command::Verify(args) => cmd_verify(args, json),
    }
}

/// Config file (or defaults) with command-line overrides applied.
fn load_config(args: &PipelineArgs) -> anyhow::Result<DeployConfig> {
    let mut config = match &args.config {
        Some(path) => DeployConfig::load(path)?,
        None => DeployConfig::default(),
    };
    if let Some(n) = args.max_chunk_bytes {
        config.max_chunk_bytes = n;
    }
    if let Some(n) = args.max_chunks_per_tx {
        config.max_chunks_per_tx = n;
    }
    if args.recursive {
        config.recursive = true;
    }
    config.validate()?;
    Ok(config)
}

fn open_deployer(store: &Path, config: DeployConfig) -> anyhow::Result<Deployer<FileBackingStore>> {
    let store = FileBackingStore::open(store)
        .with_context(|| format!("cannot open store at {}", store.display()))?;
    Ok(Deployer::new(store, config)?)
}

fn cmd_deploy(args: DeployArgs, json: bool) -> anyhow::Result<()> {
    let mut config = load_config(&args.pipeline)?;
    if args.no_verify {
        config.verify_after_deploy = false;
    }
    let manifest_path = args
        .manifest
        .unwrap_or_else(|| args.pipeline.store.join("manifest.json"));

    let deployer = open_deployer(&args.pipeline.store, config.clone())?;
    let report = deployer.deploy_dir(&args.pipeline.source)?;
    DeployManifest::new(config, report.index.clone()).save(&manifest_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
        println!("  Manifest: {}", manifest_path.display().to_string().cyan());
    }
    Ok(())
}

fn print_report(report: &DeployReport) {
    println!("{} Deployed {} files", "✓".green().bold(), report.files.to_string().bold());
    println!(
        "  Chunks: {} ({} already stored, {} repeated)",
        report.chunks,
        report.already_stored.to_string().dimmed(),
        report.repeated.to_string().dimmed()
    );
    println!(
        "  Writes: {} ({} bytes new)",
        report.writes.to_string().yellow(),
        report.bytes_written
    );
    if report.verified {
        println!("  Read-back: {}", "verified".green());
    } else {
        println!("  Read-back: {}", "skipped".yellow());
    }
    for file in &report.index {
        println!("  {} {}", file.name.bold(), format!("{} chunks", file.chunk_count()).dimmed());
        for address in &file.addresses {
            println!("    {}", address.to_string().cyan());
        }
    }
    let stages: Vec<String> = report
        .stages
        .iter()
        .map(|t| format!("{} {:.1?}", t.stage, t.elapsed))
        .collect();
    println!("  Stages: {}", stages.join(", ").dimmed());
}

fn cmd_plan(args: PlanArgs, json: bool) -> anyhow::Result<()> {
    let config = load_config(&args.pipeline)?;
    let files = read_source_dir(&args.pipeline.source, config.recursive)?;
    let deployer = open_deployer(&args.pipeline.store, config)?;
    let plan = deployer.plan(&files)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

fn print_plan(plan: &TxPlan) {
    if plan.is_noop() {
        println!("{} Nothing to write; all {} chunks are stored.", "✓".green().bold(), plan.chunks);
        return;
    }
    println!(
        "{} files, {} chunks: {} to write in {} transactions",
        plan.files,
        plan.chunks,
        plan.pending_chunks.to_string().bold(),
        plan.batches.to_string().yellow().bold()
    );
    println!(
        "  Skipped: {} already stored, {} repeated",
        plan.already_stored, plan.repeated
    );
    println!("  Payload: {} bytes", plan.payload_bytes);
    for (i, size) in plan.batch_sizes.iter().enumerate() {
        println!("  tx {}: {} chunks", (i + 1).to_string().dimmed(), size);
    }
}

fn cmd_restore(args: RestoreArgs, json: bool) -> anyhow::Result<()> {
    let manifest = DeployManifest::load(&args.manifest)?;
    let deployer = open_deployer(&args.store, manifest.config.clone())?;
    let written = deployer.restore(&manifest.files, &args.out)?;

    if json {
        let paths: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
        println!("{}", serde_json::to_string_pretty(&json!({ "restored": paths }))?);
    } else {
        println!(
            "{} Restored {} files into {}",
            "✓".green().bold(),
            written.len().to_string().bold(),
            args.out.display()
        );
        for path in &written {
            println!("  {}", path.display());
        }
    }
    Ok(())
}

fn cmd_verify(args: VerifyArgs, json: bool) -> anyhow::Result<()> {
    let manifest = DeployManifest::load(&args.manifest)?;
    let deployer = open_deployer(&args.store, manifest.config.clone())?;
    let checked = deployer.verify(&manifest.files)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&json!({ "verified": checked }))?);
    } else {
        println!("{} {} files verified", "✓".green().bold(), checked.to_string().bold());
        println!("  Chunks: {}", manifest.files.total_chunks());
        println!("  Digests: {}", "match".green());
    }
    Ok(())
}
