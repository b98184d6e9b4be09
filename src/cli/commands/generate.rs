//! Generate command implementation
//!
//! Runs one batch through the supervisor against the configured text
//! generation service, with an in-memory record store.

use crate::adapters::rate_limit;
use crate::adapters::store::MemoryStore;
use crate::adapters::textgen::HttpTextGenerator;
use crate::config::load_config;
use crate::core::generation::{BatchResult, GenerationOrchestrator, GenerationSupervisor};
use crate::domain::errors::ScribeError;
use crate::domain::identifiers::PatientIdentifiers;
use crate::domain::job::{BatchStatus, GenerationRequest, JobSpec, JobStatus};
use anyhow::Context;
use clap::Args;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the generate command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Session transcript and notes (plain text)
    #[arg(short, long)]
    pub transcript: String,

    /// Patient identifiers (JSON: name, email, phone, address, date_of_birth)
    #[arg(short, long)]
    pub identifiers: String,

    /// Sections to generate (JSON array of {section, system_prompt, model?, temperature?, max_tokens?})
    #[arg(short, long)]
    pub sections: String,

    /// Write the batch result, with encrypted sections, to this JSON file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Requester key for the submission rate limiter
    #[arg(long)]
    pub requester: Option<String>,
}

impl GenerateArgs {
    /// Execute the generate command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Starting generation");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let request = self.read_request()?;

        let generator = match HttpTextGenerator::new(&config.generation) {
            Ok(g) => Arc::new(g),
            Err(e) => {
                println!("❌ {e}");
                return Ok(2);
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let orchestrator = match GenerationOrchestrator::from_config(
            &config,
            generator,
            Arc::new(MemoryStore::new()),
            shutdown_rx,
        ) {
            Ok(o) => o,
            Err(e) => {
                println!("❌ {e}");
                return Ok(2);
            }
        };

        let supervisor = Arc::new(GenerationSupervisor::new(
            Arc::new(orchestrator),
            rate_limit::from_config(&config.rate_limit),
            shutdown_tx,
        ));
        let forwarder = spawn_shutdown_forwarder(Arc::clone(&supervisor), shutdown_signal);

        let handle = match supervisor.submit(request).await {
            Ok(h) => h,
            Err(e @ ScribeError::Configuration(_)) => {
                println!("❌ {e}");
                return Ok(2);
            }
            Err(e) => return Err(e.into()),
        };
        println!("🚀 Batch {} submitted", handle.batch_id());

        let result = handle.wait().await?;
        supervisor.shutdown().await;
        forwarder.abort();

        result.log_summary();
        print_result(&result);

        if let Some(output) = &self.output {
            let json = serde_json::to_string_pretty(&result)?;
            fs::write(output, json).with_context(|| format!("Failed to write {output}"))?;
            println!("📄 Result written to {output}");
        }

        Ok(exit_code(&result))
    }

    fn read_request(&self) -> anyhow::Result<GenerationRequest> {
        let transcript = read_file(&self.transcript)?;
        let identifiers: PatientIdentifiers = serde_json::from_str(&read_file(&self.identifiers)?)
            .with_context(|| format!("Invalid identifiers file {}", self.identifiers))?;
        let sections: Vec<JobSpec> = serde_json::from_str(&read_file(&self.sections)?)
            .with_context(|| format!("Invalid sections file {}", self.sections))?;

        let request = GenerationRequest::new(transcript, identifiers, sections);
        Ok(match &self.requester {
            Some(requester) => request.for_requester(requester.clone()),
            None => request,
        })
    }
}

fn read_file(path: &str) -> anyhow::Result<String> {
    fs::read_to_string(Path::new(path)).with_context(|| format!("Failed to read {path}"))
}

/// Turns the process-wide shutdown signal into a supervisor shutdown request
fn spawn_shutdown_forwarder(
    supervisor: Arc<GenerationSupervisor>,
    mut signal: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if *signal.borrow_and_update() {
                supervisor.request_shutdown();
                return;
            }
            if signal.changed().await.is_err() {
                return;
            }
        }
    })
}

fn print_result(result: &BatchResult) {
    println!();
    println!("Batch {} finished: {}", result.batch_id, result.final_status);
    for job in &result.jobs {
        match job.status {
            JobStatus::Completed => println!(
                "  ✅ {} ({}, {} attempt(s))",
                job.section,
                job.model.as_deref().unwrap_or("-"),
                job.attempts
            ),
            _ => println!(
                "  ❌ {}: {}",
                job.section,
                job.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    let counts = result.counts();
    println!();
    println!(
        "{} completed, {} failed in {:.1}s",
        counts.completed,
        counts.failed,
        result.duration.as_secs_f64()
    );
}

/// 0 all sections completed, 1 partial, 3 every section failed
fn exit_code(result: &BatchResult) -> i32 {
    match result.final_status {
        BatchStatus::Failed => 3,
        _ if result.is_partial() => 1,
        _ => 0,
    }
}
