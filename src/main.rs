mod cli;

use vodforge::{app, ingest};
use vf_av::ToolRegistry;
use vf_core::{JobId, JobStatus};
use vf_db::TranscodeJob;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

/// Exit status when the readiness gate gives up.
const EXIT_NOT_READY: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vodforge=trace,vf_worker=trace,vf_av=debug,vf_media=debug,vf_db=debug,vf_core=debug"
                .to_string()
        } else {
            "vodforge=info,vf_worker=info,vf_av=info,vf_media=info,vf_db=warn,vf_core=info"
                .to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            match e.downcast_ref::<vf_core::Error>() {
                Some(vf_core::Error::ReadinessTimeout { .. }) => ExitCode::from(EXIT_NOT_READY),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Worker { workers, once } => run_worker(config_path, workers, once),
        Commands::Enqueue {
            content_id,
            source,
            renditions,
            copy,
            json,
        } => enqueue(config_path, &content_id, &source, &renditions, copy, json),
        Commands::Status { id, json } => status(config_path, &id, json),
        Commands::List {
            status,
            limit,
            json,
        } => list(config_path, status.as_deref(), limit, json),
        Commands::Reap => reap(config_path),
        Commands::CheckTools => check_tools(config_path),
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or_else(|| config_path.map(Path::to_path_buf));
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("vodforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_worker(config_path: Option<&Path>, workers: Option<usize>, once: bool) -> Result<()> {
    let mut config = app::load_config(config_path)?;
    if let Some(n) = workers {
        config.worker.count = n;
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let cancel = CancellationToken::new();
        let signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received; finishing in-flight jobs");
                signal.cancel();
            }
        });

        tracing::info!(
            workers = config.worker.count,
            media_root = %config.storage.media_root.display(),
            "Starting vodforge worker"
        );
        app::run_worker(config, once, cancel).await
    })?;
    Ok(())
}

fn enqueue(
    config_path: Option<&Path>,
    content_id: &str,
    source: &Path,
    renditions: &[String],
    copy: bool,
    json: bool,
) -> Result<()> {
    let config = app::load_config(config_path)?;
    let queue = app::open_queue(&config)?;
    let job = ingest::enqueue_upload(&queue, &config, content_id, source, renditions, copy)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&job_json(&job))?);
    } else {
        println!("Enqueued job {} for {}", job.id, job.content_id);
        println!("  Source: {}", job.source_path.display());
        println!("  Renditions: {}", labels(&job).join(", "));
    }
    Ok(())
}

fn status(config_path: Option<&Path>, id: &str, json: bool) -> Result<()> {
    let config = app::load_config(config_path)?;
    let queue = app::open_queue(&config)?;

    let job = match id.parse::<JobId>() {
        Ok(job_id) => queue.get(job_id)?,
        Err(_) => queue.get_by_content(id)?,
    }
    .ok_or_else(|| vf_core::Error::not_found("job", id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&job_json(&job))?);
    } else {
        print_job(&job);
    }
    Ok(())
}

fn list(config_path: Option<&Path>, status: Option<&str>, limit: i64, json: bool) -> Result<()> {
    let config = app::load_config(config_path)?;
    let queue = app::open_queue(&config)?;
    let status = status.map(str::parse::<JobStatus>).transpose()?;
    let jobs = queue.list(status, limit)?;

    if json {
        let rows: Vec<_> = jobs.iter().map(job_json).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let counts = queue.counts()?;
    let summary: Vec<String> = counts.iter().map(|(s, n)| format!("{s}: {n}")).collect();
    println!("Jobs ({})", summary.join(", "));
    for job in &jobs {
        println!(
            "  {} {:<10} {:<24} attempts={}",
            job.id,
            job.status.as_str(),
            job.content_id,
            job.attempt_count
        );
    }
    Ok(())
}

fn reap(config_path: Option<&Path>) -> Result<()> {
    let config = app::load_config(config_path)?;
    let queue = app::open_queue(&config)?;
    let reaped = queue.reap_expired()?;
    println!("Reaped {reaped} expired lease(s)");
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = app::load_config(config_path)?;
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
        Ok(())
    } else {
        anyhow::bail!("required tools are missing")
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => println!("Validating config: {:?}", p),
        None => println!("No config file specified, using defaults"),
    }
    let config = app::load_config(path).context("configuration is invalid")?;

    println!("✓ Configuration is valid");
    println!("  Database: {}", config.database.path.display());
    println!("  Media root: {}", config.storage.media_root.display());
    println!("  Workers: {}", config.worker.count);
    println!(
        "  Queue: lease {}s, {} attempt(s)",
        config.queue.lease_secs, config.queue.max_attempts
    );
    println!("  Renditions:");
    for r in &config.renditions {
        println!(
            "    {} {}x{} @ {}k",
            r.label, r.width, r.height, r.video_kbps
        );
    }
    Ok(())
}

fn labels(job: &TranscodeJob) -> Vec<&str> {
    job.requested_renditions.iter().map(|r| r.label.as_str()).collect()
}

fn print_job(job: &TranscodeJob) {
    println!("Job: {}", job.id);
    println!("  Content: {}", job.content_id);
    println!("  Status: {}", job.status);
    println!("  Attempts: {}", job.attempt_count);
    println!("  Source: {}", job.source_path.display());
    println!("  Renditions: {}", labels(job).join(", "));
    if let Some(ref owner) = job.lease_owner {
        println!("  Leased by: {owner}");
    }
    if let Some(ref err) = job.last_error {
        println!("  Last error: {err}");
    }
    if let Some(ref done) = job.completed_at {
        println!("  Completed: {done}");
    }
}

fn job_json(job: &TranscodeJob) -> serde_json::Value {
    serde_json::json!({
        "id": job.id,
        "content_id": job.content_id,
        "status": job.status,
        "attempt_count": job.attempt_count,
        "source_path": job.source_path,
        "renditions": labels(job),
        "lease_owner": job.lease_owner,
        "lease_expiry": job.lease_expiry,
        "available_at": job.available_at,
        "last_error": job.last_error,
        "created_at": job.created_at,
        "updated_at": job.updated_at,
        "completed_at": job.completed_at,
    })
}
