//! Command implementations behind the CLI.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use searchsync_engine::{EngineConfig, HttpSearchEngine};
use searchsync_reindex::{ReindexCoordinator, ReindexOutcome};
use searchsync_scheduler::{job_queue, Scheduler};
use searchsync_store::Store;
use searchsync_types::{AttributesProducer, CatalogRecord, SyncSettings};
use searchsync_workers::{BulkUploader, SerializationWorker, WorkerPool};

use crate::config::AppConfig;

fn open_store(config: &AppConfig) -> Result<Arc<Store>> {
    let store = Store::open(Path::new(&config.db_path))
        .with_context(|| format!("opening store at {}", config.db_path))?;
    Ok(Arc::new(store))
}

fn build_engine(config: &AppConfig) -> Result<Arc<HttpSearchEngine>> {
    let engine = HttpSearchEngine::new(
        EngineConfig::new(&config.engine_url).with_timeout(config.engine_timeout()),
    )
    .context("building engine client")?;
    Ok(Arc::new(engine))
}

/// Run the scheduler monitor and worker pool until interrupted.
///
/// The daemon uses the attribute-passthrough producer; deployments with
/// their own document shape embed the library crates and inject a custom
/// `DocumentProducer` instead.
pub async fn start(config: AppConfig, no_incremental: bool) -> Result<()> {
    let store = open_store(&config)?;
    let engine = build_engine(&config)?;
    let settings = Arc::new(SyncSettings::new(
        config.incremental_enabled && !no_incremental,
    ));

    let (dispatcher, receiver) = job_queue(config.queue_capacity);
    let serializer = Arc::new(SerializationWorker::new(
        store.clone(),
        Arc::new(AttributesProducer),
        settings.clone(),
    ));
    let uploader = Arc::new(BulkUploader::new(
        store.clone(),
        engine,
        settings.clone(),
        config.index_alias.clone(),
    ));
    let pool = WorkerPool::new(serializer, uploader, config.sync.clone());
    let scheduler = Scheduler::new(store, Arc::new(dispatcher), settings, config.sync.clone());

    let shutdown = CancellationToken::new();

    let pool_handle = {
        let token = shutdown.clone();
        tokio::spawn(async move { pool.run(receiver, token).await })
    };
    let monitor_handle = {
        let token = shutdown.clone();
        tokio::spawn(async move { scheduler.monitor(token).await })
    };

    info!(alias = %config.index_alias, "searchsync started");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("Shutdown signal received");

    shutdown.cancel();
    monitor_handle.await.context("joining scheduler monitor")?;
    pool_handle.await.context("joining worker pool")?;
    Ok(())
}

/// Rebuild the entire index and swap the alias.
pub async fn reindex(config: AppConfig) -> Result<()> {
    let store = open_store(&config)?;
    let engine = build_engine(&config)?;
    let settings = Arc::new(SyncSettings::new(config.incremental_enabled));

    let coordinator = ReindexCoordinator::new(
        store,
        engine,
        settings,
        config.index_alias.clone(),
        config.sync.clone(),
    );
    let report = coordinator.run().await?;

    match report.outcome {
        ReindexOutcome::Swapped => {
            println!(
                "Reindexed {} record(s) into {} in {} ms ({} failed)",
                report.imported,
                report.new_index,
                report.elapsed_ms,
                report.failed.len()
            );
        }
        ReindexOutcome::Aborted => {
            println!(
                "Reindex aborted: {} of {} record(s) failed to import; \
                 alias unchanged, {} left in place for inspection",
                report.failed.len(),
                report.total,
                report.new_index
            );
        }
    }
    Ok(())
}

/// Schedule serialization for every record and drain the resulting
/// batches before returning.
pub async fn serialize_all(config: AppConfig) -> Result<()> {
    let store = open_store(&config)?;
    let settings = Arc::new(SyncSettings::new(true));

    let (dispatcher, receiver) = job_queue(config.queue_capacity);
    let serializer = Arc::new(SerializationWorker::new(
        store.clone(),
        Arc::new(AttributesProducer),
        settings.clone(),
    ));
    let engine = build_engine(&config)?;
    let uploader = Arc::new(BulkUploader::new(
        store.clone(),
        engine,
        settings.clone(),
        config.index_alias.clone(),
    ));
    let pool = WorkerPool::new(serializer, uploader, config.sync.clone());

    let pool_handle = tokio::spawn(async move {
        // Never-cancelled token: the pool exits when the queue closes.
        pool.run(receiver, CancellationToken::new()).await
    });

    let scheduler = Scheduler::new(store, Arc::new(dispatcher), settings, config.sync.clone());
    let batches = scheduler.serialize_all().await?;

    // Dropping the scheduler drops the queue's only sender; the pool
    // drains what was dispatched and stops.
    drop(scheduler);
    pool_handle.await.context("joining worker pool")?;

    println!("Serialized all records in {} batch(es)", batches);
    Ok(())
}

/// Reset every state row so all sync work is redone.
pub async fn reset_all(config: AppConfig) -> Result<()> {
    let store = open_store(&config)?;
    let reset = store.reset_all()?;
    println!("Reset {} state row(s)", reset);
    Ok(())
}

/// Print state counts and the incremental-update flag.
pub async fn show_status(config: AppConfig) -> Result<()> {
    let store = open_store(&config)?;
    let counts = store.counts(
        Utc::now(),
        config.sync.serialization_lock_ttl(),
        config.sync.upload_lock_ttl(),
    )?;

    println!(
        "incremental updates: {}",
        if config.incremental_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("total records:        {}", counts.total);
    println!("needing serialization: {}", counts.needing_serialization);
    println!("needing upload:        {}", counts.needing_upload);
    println!("uploaded:              {}", counts.uploaded);
    Ok(())
}

/// Upsert catalog records from a JSONL file.
///
/// Stands in for the catalog-side mutation hook: every line lands as an
/// atomic record-write plus state-reset, which is what re-queues the
/// record for the full sync cycle.
pub async fn ingest(config: AppConfig, file: &Path, delete: bool) -> Result<()> {
    let store = open_store(&config)?;
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;

    let mut ingested = 0u64;
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut record: CatalogRecord = serde_json::from_str(line)
            .with_context(|| format!("parsing record on line {}", line_no + 1))?;
        if delete {
            record.deleted_at = Some(Utc::now());
        }
        store.put_record(&record)?;
        ingested += 1;
    }

    println!(
        "Ingested {} record(s){}",
        ingested,
        if delete { " as deleted" } else { "" }
    );
    Ok(())
}
