use vecload_common::IndexStats;

use crate::metrics::Summary;
use crate::namespace_metrics::fastest_and_slowest;
use crate::orchestrator::{DeleteReport, FullReport, ReadReport, StormOutcome, StormReport, WriteReport};

/// At most this many namespaces are listed in the storm breakdown.
pub const MAX_NAMESPACE_ROWS: usize = 20;

const RULE: &str = "============================================================";

pub fn print_banner(title: &str) {
    println!();
    println!("{RULE}");
    println!("{title}");
    println!("{RULE}");
}

/// `1234567` → `"1,234,567"`.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// The default namespace is the empty string; show it as `(default)`.
pub fn display_namespace(ns: &str) -> &str {
    if ns.is_empty() {
        "(default)"
    } else {
        ns
    }
}

pub fn write_progress_line(done: u64, total: usize) -> String {
    format!("   Completed {done}/{total} batches...")
}

pub fn read_progress_line(remaining_secs: u64, queries: u64) -> String {
    format!("   {remaining_secs}s remaining... ({} queries so far)", format_thousands(queries))
}

pub fn storm_progress_line(remaining_secs: u64, queries: u64, delta: u64, errors: u64) -> String {
    format!(
        "   {:>4}s remaining | {:>10} queries | ~{} qps | {} errors",
        remaining_secs,
        format_thousands(queries),
        format_thousands(delta),
        errors,
    )
}

fn print_latency_lines(summary: &Summary, full: bool) {
    let Some(l) = &summary.latency else {
        println!("No successful operations; latency figures unavailable.");
        return;
    };
    println!("Avg latency:         {:.2}ms", l.mean_ms);
    println!("P50 latency:         {:.2}ms", l.p50_ms);
    println!("P95 latency:         {:.2}ms", l.p95_ms);
    println!("P99 latency:         {:.2}ms", l.p99_ms);
    if full {
        println!("Min latency:         {:.2}ms", l.min_ms);
        println!("Max latency:         {:.2}ms", l.max_ms);
    }
}

pub fn print_write_report(report: &WriteReport) {
    println!();
    println!("--- Write Results ---");
    let s = &report.summary;
    println!("Vectors upserted:    {}", format_thousands(report.vectors_upserted));
    println!("Batches completed:   {} / {}", s.operations, report.total_batches);
    println!("Errors:              {}", s.errors);
    println!("Total time:          {:.2}s", s.elapsed_secs);
    println!("Throughput:          {:.2} vectors/sec", report.vectors_per_sec);
    println!("Batch throughput:    {:.2} batches/sec", s.ops_per_sec());
    print_latency_lines(s, false);
    if report.state.is_cancelled() {
        println!("Run was cancelled before all batches were submitted.");
    }
}

pub fn print_read_report(report: &ReadReport) {
    println!();
    println!("--- Read Results ---");
    let s = &report.summary;
    println!("Total queries:       {}", format_thousands(s.operations));
    println!("Errors:              {}", s.errors);
    println!("Total time:          {:.2}s", s.elapsed_secs);
    println!("Throughput:          {:.2} queries/sec", s.ops_per_sec());
    print_latency_lines(s, true);
    if report.state.is_cancelled() {
        println!("Run was cancelled before the configured duration.");
    }
}

pub fn print_storm_outcome(outcome: &StormOutcome) {
    match outcome {
        StormOutcome::NoNamespaces => println!("No namespaces found in index. Nothing to query."),
        StormOutcome::Completed(report) => print_storm_report(report),
    }
}

pub fn print_storm_report(report: &StormReport) {
    print_banner("AGGREGATE RESULTS");
    let s = &report.summary;
    println!("Namespaces:          {}", report.namespaces);
    println!("Total threads:       {}", format_thousands(report.total_threads as u64));
    println!("Total queries:       {}", format_thousands(s.operations));
    println!("Errors:              {}", s.errors);
    println!("Total time:          {:.2}s", s.elapsed_secs);
    println!("Throughput:          {:.2} queries/sec", s.ops_per_sec());
    print_latency_lines(s, true);

    let rows = &report.per_namespace;
    if rows.is_empty() {
        return;
    }

    print_banner(&format!("PER-NAMESPACE BREAKDOWN (top {MAX_NAMESPACE_ROWS} by query count)"));
    println!("{:<30} {:>10} {:>8} {:>10} {:>10}", "Namespace", "Queries", "Errors", "Avg ms", "P50 ms");
    println!("{}", "-".repeat(72));
    for row in rows.iter().take(MAX_NAMESPACE_ROWS) {
        println!(
            "{:<30} {:>10} {:>8} {:>10.2} {:>10.2}",
            display_namespace(&row.namespace),
            format_thousands(row.queries),
            row.errors,
            row.mean_ms,
            row.p50_ms,
        );
    }
    if rows.len() > MAX_NAMESPACE_ROWS {
        println!("   ... and {} more namespaces", rows.len() - MAX_NAMESPACE_ROWS);
    }

    if let Some((fastest, slowest)) = fastest_and_slowest(rows) {
        println!();
        println!("Fastest namespace:   {} (avg {:.2}ms)", display_namespace(&fastest.namespace), fastest.mean_ms);
        println!("Slowest namespace:   {} (avg {:.2}ms)", display_namespace(&slowest.namespace), slowest.mean_ms);
    }
}

pub fn print_delete_report(report: &DeleteReport) {
    match report {
        DeleteReport::NothingToDelete => println!("No vectors to delete."),
        DeleteReport::Deleted { vectors_before, vectors_remaining, delete_secs } => {
            println!("Vectors before:      {}", format_thousands(*vectors_before));
            println!("Delete completed in {delete_secs:.2}s");
            println!("Vectors remaining:   {}", format_thousands(*vectors_remaining));
        }
    }
}

pub fn print_stats(stats: &IndexStats) {
    println!();
    println!("--- Index Stats ---");
    println!("Total vectors:       {}", format_thousands(stats.total_vector_count));
    println!("Dimension:           {}", stats.dimension);
    if !stats.namespaces.is_empty() {
        println!("Namespaces:");
        for (ns, ns_stats) in &stats.namespaces {
            println!("  {:<28} {:>12}", display_namespace(ns), format_thousands(ns_stats.vector_count));
        }
    }
}

pub fn print_full_report(report: &FullReport) {
    print_write_report(&report.write);
    if let Some(stats) = &report.stats_after_write {
        print_stats(stats);
    }
    if let Some(read) = &report.read {
        print_read_report(read);
    }
    match &report.delete {
        Some(delete) => print_delete_report(delete),
        None => println!("Vectors preserved. You can run read tests again later."),
    }
}
