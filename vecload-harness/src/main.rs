use clap::Parser;
use serde::Serialize;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vecload_client::{Client, ClientConfig};
use vecload_common::{
    IndexTarget, VectorIndex, BATCH_SIZE, DEFAULT_READ_THREADS, DEFAULT_THREADS_PER_NAMESPACE,
    DEFAULT_TOP_K, DEFAULT_WRITE_THREADS, VECTOR_DIMENSION,
};
use vecload_harness::config::{
    DeleteParams, FullParams, ReadParams, RunContext, StormParams, WriteParams, DEFAULT_NUM_VECTORS,
    POST_DELETE_SETTLE, POST_WRITE_SETTLE, WRITE_ONLY_SETTLE,
};
use vecload_harness::orchestrator::{
    run_delete_all, run_full_test, run_read_test, run_storm_test, run_write_test, settle, stats_snapshot,
};
use vecload_harness::report::{
    format_thousands, print_banner, print_delete_report, print_full_report, print_read_report, print_stats,
    print_storm_outcome, print_write_report,
};
use vecload_harness::scenario::Scenario;

#[derive(Parser)]
#[command(name = "vecload", about = "Vector index load test harness")]
struct Args {
    /// Scenario: full | write | read | storm | delete | stats
    #[arg(long, default_value = "full")]
    scenario: String,

    /// Index data-plane host
    #[arg(long, env = "PINECONE_HOST")]
    host: String,

    /// Sent as the Api-Key header
    #[arg(long, env = "PINECONE_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,

    /// Number of vectors to upsert
    #[arg(long, default_value_t = DEFAULT_NUM_VECTORS)]
    vectors: u64,

    /// Concurrent upsert workers
    #[arg(long, default_value_t = DEFAULT_WRITE_THREADS)]
    write_threads: usize,

    /// Concurrent query workers for the read test
    #[arg(long, default_value_t = DEFAULT_READ_THREADS)]
    read_threads: usize,

    /// How long to run the read or storm test (seconds). Defaults to 30 for read, 60 for storm.
    #[arg(long)]
    duration: Option<u64>,

    /// Query workers per namespace for the storm test
    #[arg(long, default_value_t = DEFAULT_THREADS_PER_NAMESPACE)]
    threads_per_namespace: usize,

    /// Nearest neighbours requested per query
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: u32,

    /// Vectors per upsert call
    #[arg(long, default_value_t = BATCH_SIZE)]
    batch_size: usize,

    /// Vector dimension; must match the index
    #[arg(long, default_value_t = VECTOR_DIMENSION)]
    dimension: usize,

    /// Namespace for writes and deletes (default namespace when omitted)
    #[arg(long)]
    namespace: Option<String>,

    /// Delete all vectors at the end of the full test
    #[arg(long)]
    delete_after: bool,

    /// Confirm destructive scenarios (delete)
    #[arg(long)]
    yes: bool,

    /// Per-request timeout in milliseconds; unbounded when omitted
    #[arg(long)]
    request_timeout_ms: Option<u64>,

    /// Print the report as JSON instead of tables
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let scenario = Scenario::from_name(&args.scenario).unwrap_or_else(|| {
        let valid: Vec<&str> = Scenario::ALL.iter().map(Scenario::as_name).collect();
        eprintln!("Unknown scenario {:?}. Valid values: {}", args.scenario, valid.join(", "));
        process::exit(3);
    });

    if scenario.requires_confirmation() && !args.yes {
        eprintln!("Scenario {:?} deletes vectors; pass --yes to confirm.", scenario.as_name());
        process::exit(3);
    }

    if let Err(e) = validate_params(scenario, &args) {
        eprintln!("{e}");
        process::exit(3);
    }

    let config = ClientConfig {
        target: IndexTarget { host: args.host.clone(), api_key: args.api_key.clone() },
        request_timeout: args.request_timeout_ms.map(Duration::from_millis),
    };
    let client = Client::new(config).unwrap_or_else(|e| {
        eprintln!("Failed to build client: {e}");
        process::exit(3);
    });
    let index: Arc<dyn VectorIndex> = Arc::new(client);

    info!(host = %args.host, "connecting to index");
    let initial = index.describe_index_stats().await.unwrap_or_else(|e| {
        eprintln!("Connection failed: {e}");
        process::exit(3);
    });
    info!(vectors = initial.total_vector_count, "connected");
    if !args.json {
        println!("Connected! Current vector count: {}", format_thousands(initial.total_vector_count));
    }

    let ctx = RunContext { show_progress: !args.json, ..RunContext::default() };
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping the current run");
            cancel.cancel();
        }
    });

    if !args.json {
        print_banner(scenario.title());
    }

    let code = match run_scenario(scenario, &args, index, &ctx).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} failed: {e}", scenario.as_name());
            1
        }
    };
    process::exit(code);
}

async fn run_scenario(
    scenario: Scenario,
    args: &Args,
    index: Arc<dyn VectorIndex>,
    ctx: &RunContext,
) -> vecload_common::Result<()> {
    match scenario {
        Scenario::Full => {
            let params = FullParams {
                write: write_params(args),
                read: read_params(args),
                settle: POST_WRITE_SETTLE,
                delete_after: args.delete_after,
                delete: delete_params(args),
            };
            let report = run_full_test(index, &params, ctx).await?;
            emit(args, &report, print_full_report);
        }
        Scenario::Write => {
            let report = run_write_test(Arc::clone(&index), &write_params(args), ctx).await?;
            emit(args, &report, print_write_report);
            settle(WRITE_ONLY_SETTLE, ctx).await;
            let stats = stats_snapshot(index.as_ref()).await?;
            if !args.json {
                print_stats(&stats);
            }
        }
        Scenario::Read => {
            if !args.json {
                print_stats(&stats_snapshot(index.as_ref()).await?);
            }
            let report = run_read_test(index, &read_params(args), ctx).await?;
            emit(args, &report, print_read_report);
        }
        Scenario::Storm => {
            if !args.json {
                print_stats(&stats_snapshot(index.as_ref()).await?);
            }
            let outcome = run_storm_test(index, &storm_params(args), ctx).await?;
            emit(args, &outcome, print_storm_outcome);
        }
        Scenario::Delete => {
            let report = run_delete_all(index.as_ref(), &delete_params(args), ctx).await?;
            emit(args, &report, print_delete_report);
        }
        Scenario::Stats => {
            let stats = stats_snapshot(index.as_ref()).await?;
            emit(args, &stats, print_stats);
        }
    }
    Ok(())
}

/// Reject bad parameters before touching the network.
fn validate_params(scenario: Scenario, args: &Args) -> vecload_common::Result<()> {
    match scenario {
        Scenario::Full => FullParams { write: write_params(args), read: read_params(args), ..FullParams::default() }
            .validate(),
        Scenario::Write => write_params(args).validate(),
        Scenario::Read => read_params(args).validate(),
        Scenario::Storm => storm_params(args).validate(),
        Scenario::Delete | Scenario::Stats => Ok(()),
    }
}

fn write_params(args: &Args) -> WriteParams {
    WriteParams {
        num_vectors: args.vectors,
        num_threads: args.write_threads,
        batch_size: args.batch_size,
        dimension: args.dimension,
        namespace: args.namespace.clone(),
    }
}

fn read_params(args: &Args) -> ReadParams {
    ReadParams {
        duration: args.duration.map(Duration::from_secs).unwrap_or(ReadParams::default().duration),
        num_threads: args.read_threads,
        top_k: args.top_k,
        dimension: args.dimension,
    }
}

fn storm_params(args: &Args) -> StormParams {
    StormParams {
        duration: args.duration.map(Duration::from_secs).unwrap_or(StormParams::default().duration),
        threads_per_namespace: args.threads_per_namespace,
        top_k: args.top_k,
        dimension: args.dimension,
    }
}

fn delete_params(args: &Args) -> DeleteParams {
    DeleteParams { namespace: args.namespace.clone(), settle: POST_DELETE_SETTLE }
}

/// Print `report` as JSON or through its table printer.
fn emit<T: Serialize>(args: &Args, report: &T, print: fn(&T)) {
    if !args.json {
        print(report);
        return;
    }
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to encode report: {e}"),
    }
}
