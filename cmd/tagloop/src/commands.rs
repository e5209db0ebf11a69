//! Subcommand dispatch.

use anyhow::Context as _;

use tagloop_embed::HttpEmbedder;
use tagloop_kv::RedbStore;
use tagloop_pipeline::Pipeline;
use tagloop_store::{KvRecordStore, KvVectorStore, RawFeedback};

use crate::config::{Config, load_config};
use crate::util::{load_request, output_result, print_success};
use crate::{Cli, Commands};

pub async fn run(cli: &Cli) -> anyhow::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    let pipeline = open_pipeline(cfg)?;
    let out = cli.output.as_deref();

    match &cli.command {
        Commands::Ingest { file } => {
            let items: Vec<RawFeedback> =
                load_request(file).with_context(|| format!("load feedback {file}"))?;
            let report = pipeline.ingest(&items)?;
            print_success(&format!(
                "ingested {} records ({} skipped)",
                report.accepted, report.skipped
            ));
            output_result(&report, out, cli.json)
        }
        Commands::Sample => output_result(&pipeline.sample()?, out, cli.json),
        Commands::Label => output_result(&pipeline.label().await?, out, cli.json),
        Commands::Cluster => output_result(&pipeline.build_taxonomy().await?, out, cli.json),
        Commands::Match => output_result(&pipeline.match_records().await?, out, cli.json),
        Commands::Escalate => output_result(&pipeline.escalate().await?, out, cli.json),
        Commands::Run => {
            let report = pipeline.run().await?;
            print_success(&format!(
                "pipeline finished in {:.1}s",
                report.elapsed.as_secs_f64()
            ));
            output_result(&report, out, cli.json)
        }
        Commands::Stats => output_result(&pipeline.stats()?, out, cli.json),
    }
}

fn open_pipeline(cfg: Config) -> anyhow::Result<Pipeline> {
    for path in [&cfg.store.records, &cfg.store.vectors] {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create store directory {}", dir.display()))?;
        }
    }
    let records = RedbStore::open(&cfg.store.records)
        .with_context(|| format!("open record store {}", cfg.store.records.display()))?;
    let vectors = RedbStore::open(&cfg.store.vectors)
        .with_context(|| format!("open vector store {}", cfg.store.vectors.display()))?;

    let embedder = HttpEmbedder::new(cfg.embedder)?;
    let labeler = cfg.labeler.build()?;

    Ok(Pipeline::new(
        cfg.pipeline,
        Box::new(KvRecordStore::new(Box::new(records))),
        Box::new(KvVectorStore::new(Box::new(vectors))),
        Box::new(embedder),
        labeler,
    )?)
}
