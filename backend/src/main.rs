use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use query_profiler::config::{Config, LoggingConfig};
use query_profiler::services::query_analyzer::{
    AnalysisReport, QueryAnalyzer, Recommendation, ScoredRow, collector, recommend, recommend_for,
};
use query_profiler::{AppState, build_router};

#[derive(Parser)]
#[command(name = "query-profiler")]
#[command(about = "Analyze SQL query logs: fingerprints, anomalies and index suggestions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Analyze a CSV query log and print a report
    Analyze {
        path: PathBuf,
        /// Only report this query id
        #[arg(long)]
        query_id: Option<String>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load()?;
    let _guard = init_tracing(&config.logging)?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Analyze { path, query_id, json } => analyze(&config, &path, query_id.as_deref(), json),
    }
}

/// Initialize logging; the returned guard must live until shutdown
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    match &logging.file {
        Some(file) => {
            let path = Path::new(file);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            std::fs::create_dir_all(dir).with_context(|| format!("failed to create log dir {}", dir.display()))?;
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("query-profiler.log");

            let appender = tracing_appender::rolling::daily(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        },
        None => {
            tracing_subscriber::registry().with(filter).with(stderr_layer).init();
            Ok(None)
        },
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.host, config.server.port))?;

    let state = Arc::new(AppState::new(config));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Query profiler listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

fn analyze(config: &Config, path: &Path, query_id: Option<&str>, json: bool) -> anyhow::Result<()> {
    let records = collector::collect_from_csv(path)
        .with_context(|| format!("failed to read query log {}", path.display()))?;
    let report = QueryAnalyzer::new(&config.analyzer).analyze(&records)?;

    if let Some(id) = query_id {
        let row = report.find(id).with_context(|| format!("query {id} not found in log"))?;
        let rec = recommend_for(&report, id).with_context(|| format!("query {id} not found in log"))?;
        if json {
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "row": row, "recommendation": rec }))?);
        } else {
            print_row(row, &rec);
        }
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &AnalysisReport) {
    println!(
        "ANALYZED: {} queries, {} anomalies, {} rule hits",
        report.total, report.anomaly_count, report.flagged_count
    );

    for row in report.rows.iter().filter(|r| r.is_flagged()) {
        print_row(row, &recommend(row));
    }

    for summary in report.summaries.iter().filter(|s| s.repeated) {
        println!(
            "REPEATED: COUNT={} AVG={:.2}ms TEMPLATE={}",
            summary.count, summary.avg_execution_time, summary.normalized
        );
    }
}

fn print_row(row: &ScoredRow, rec: &Recommendation) {
    let record = &row.features.record;
    let label = match (row.anomaly, row.reasons.is_empty()) {
        (true, _) => "ANOMALY",
        (false, false) => "FLAGGED",
        (false, true) => "OK",
    };
    println!(
        "{} {}: {:.2}ms, {} rows examined{}",
        label,
        record.query_id,
        record.execution_time,
        record.rows_examined,
        if row.reasons.is_empty() { String::new() } else { format!(" ({})", row.reasons.join("; ")) }
    );
    println!("  QUERY: {}", row.features.normalized);
    for item in &rec.recs {
        println!("  SUGGESTION: {}", serde_json::to_string(item).unwrap_or_default());
    }
}
