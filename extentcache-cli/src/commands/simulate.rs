//! `simulate`: load and clear spans through a governor backed by the
//! registry, with a synthetic provider generating regularly spaced samples.
//!
//! Useful for watching which deltas are fetched and how much work the
//! registry coalesces.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::DateTime;
use clap::Args;
use serde_json::json;
use tracing::debug;

use extentcache::config::ConfigFile;
use extentcache::governor::{
    GovernorBackend, GovernorManager, RegistryGovernorBackend, RequestReport,
};
use extentcache::property::{PropertyAccessor, PropertyDescriptor, ScalarAccessor, TimeSpanAccessor};
use extentcache::registry::{
    BoxFuture, CacheDeposit, DataModelCategory, DataProvider, DataRegistry, DepositReceiver,
    ProviderError, ProviderQuery,
};
use extentcache::span::TimeSpan;

use crate::error::CliError;

const VALID_TIME: &str = "valid_time";

/// Arguments for `simulate`.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Span to load as START..END, in epoch milliseconds or RFC 3339 (repeatable)
    #[arg(long = "request", value_parser = parse_span, required = true)]
    pub requests: Vec<TimeSpan>,

    /// Span to clear once all requests are loaded (repeatable)
    #[arg(long = "clear", value_parser = parse_span)]
    pub clears: Vec<TimeSpan>,

    /// Request every span again after clearing
    #[arg(long)]
    pub refetch: bool,

    /// Channel name, used as the governor key
    #[arg(long, default_value = "synthetic")]
    pub channel: String,

    /// Spacing of generated samples in milliseconds
    #[arg(long, default_value_t = 60_000, value_parser = clap::value_parser!(i64).range(1..))]
    pub step_ms: i64,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Parse `START..END`, where each bound is epoch milliseconds or an RFC 3339
/// timestamp.
pub fn parse_span(value: &str) -> Result<TimeSpan, String> {
    if let Ok(span) = value.parse::<TimeSpan>() {
        return Ok(span);
    }
    let (start, end) = value
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got '{}'", value))?;
    TimeSpan::new(parse_instant(start)?, parse_instant(end)?).map_err(|e| e.to_string())
}

fn parse_instant(value: &str) -> Result<i64, String> {
    let value = value.trim();
    value.parse::<i64>().or_else(|_| {
        DateTime::parse_from_rfc3339(value)
            .map(|t| t.timestamp_millis())
            .map_err(|e| format!("invalid time '{}': {}", value, e))
    })
}

// =============================================================================
// Synthetic provider
// =============================================================================

#[derive(Debug)]
struct Sample {
    valid: TimeSpan,
    value: f64,
}

/// Serves one sample per step for any channel of the synthetic family.
struct SyntheticProvider {
    step_ms: i64,
    calls: AtomicUsize,
}

impl SyntheticProvider {
    fn new(step_ms: i64) -> Self {
        Self {
            step_ms,
            calls: AtomicUsize::new(0),
        }
    }

    fn samples(&self, span: TimeSpan) -> Result<Vec<Sample>, ProviderError> {
        let (Some(start), Some(end)) = (span.start(), span.end()) else {
            return Err(ProviderError::Failed(format!("unbounded request {}", span)));
        };
        let step = self.step_ms;
        let mut t = start.div_euclid(step) * step;
        let mut samples = Vec::new();
        while t < end {
            let valid =
                TimeSpan::new(t, t + step).map_err(|e| ProviderError::Failed(e.to_string()))?;
            samples.push(Sample {
                valid,
                value: ((t / step) as f64).sin(),
            });
            t += step;
        }
        Ok(samples)
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn provides_data_for(&self, category: &DataModelCategory) -> bool {
        category.matches_declared(&DataModelCategory::new("simulate", "synthetic", "*"))
    }

    fn query(
        &self,
        query: ProviderQuery,
        receiver: DepositReceiver,
    ) -> BoxFuture<'_, Result<(), ProviderError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let span = query
                .time_span(&PropertyDescriptor::time(VALID_TIME))
                .unwrap_or(TimeSpan::TIMELESS);
            let samples = self.samples(span)?;
            debug!(span = %span, samples = samples.len(), "Generating synthetic samples");

            let accessors: Vec<Arc<dyn PropertyAccessor<Sample>>> = vec![
                Arc::new(TimeSpanAccessor::new(
                    VALID_TIME,
                    TimeSpan::TIMELESS,
                    |s: &Sample| s.valid,
                )),
                Arc::new(ScalarAccessor::float("value", |s: &Sample| s.value)),
            ];
            let deposit = CacheDeposit::new(query.category.clone(), accessors, samples)
                .map_err(|e| ProviderError::Failed(e.to_string()))?;
            receiver.receive(deposit)?;
            Ok(())
        })
    }
}

// =============================================================================
// Command
// =============================================================================

struct Step {
    action: &'static str,
    span: TimeSpan,
    fetched: Vec<TimeSpan>,
    pending: Vec<TimeSpan>,
    failed: usize,
    evicted: Vec<TimeSpan>,
}

impl Step {
    fn request(span: TimeSpan, report: RequestReport) -> Self {
        Self {
            action: "request",
            span,
            fetched: report.fetched,
            pending: report.pending,
            failed: report.failed.len(),
            evicted: report.discarded,
        }
    }

    fn clear(span: TimeSpan, evicted: Vec<TimeSpan>) -> Self {
        Self {
            action: "clear",
            span,
            fetched: Vec::new(),
            pending: Vec::new(),
            failed: 0,
            evicted,
        }
    }
}

/// Run the simulation on a fresh runtime.
pub fn run(args: SimulateArgs, config: &ConfigFile) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    runtime.block_on(simulate(args, config))
}

async fn simulate(args: SimulateArgs, config: &ConfigFile) -> Result<(), CliError> {
    let registry = DataRegistry::new(config.registry_config())?;
    let provider = Arc::new(SyntheticProvider::new(args.step_ms));
    let _handle = registry.register_provider(provider.clone());

    let manager = {
        let registry = registry.clone();
        GovernorManager::new(config.governor_config(), move |channel: &String| {
            Arc::new(RegistryGovernorBackend::new(
                registry.clone(),
                DataModelCategory::new("simulate", "synthetic", channel),
                PropertyDescriptor::time(VALID_TIME),
            )) as Arc<dyn GovernorBackend>
        })
    };

    let key = args.channel.clone();
    let mut steps = Vec::new();
    for span in &args.requests {
        let report = manager.request_data(&key, std::slice::from_ref(span)).await;
        steps.push(Step::request(*span, report));
    }
    for span in &args.clears {
        let evicted = manager.clear_data(&key, Some(std::slice::from_ref(span)));
        steps.push(Step::clear(*span, evicted));
    }
    if args.refetch {
        for span in &args.requests {
            let report = manager.request_data(&key, std::slice::from_ref(span)).await;
            steps.push(Step::request(*span, report));
        }
    }

    let loaded = manager.loaded(&key);
    let stats = registry.stats();
    registry.log_stats();

    if args.json {
        let report = json!({
            "channel": key,
            "steps": steps.iter().map(|s| json!({
                "action": s.action,
                "span": s.span.to_string(),
                "fetched": spans_to_strings(&s.fetched),
                "pending": spans_to_strings(&s.pending),
                "failed": s.failed,
                "evicted": spans_to_strings(&s.evicted),
            })).collect::<Vec<_>>(),
            "loaded": spans_to_strings(&loaded),
            "objects": registry.model_count(),
            "provider_calls": provider.calls.load(Ordering::Relaxed),
            "stats": stats,
        });
        let text = serde_json::to_string_pretty(&report).map_err(CliError::Output)?;
        println!("{}", text);
        return Ok(());
    }

    println!("Channel: {}", key);
    println!();
    for step in &steps {
        println!("{:<8} {}", step.action, step.span);
        if !step.fetched.is_empty() {
            println!("         fetched  {}", spans_to_strings(&step.fetched).join(" "));
        }
        if !step.pending.is_empty() {
            println!("         pending  {}", spans_to_strings(&step.pending).join(" "));
        }
        if !step.evicted.is_empty() {
            println!("         evicted  {}", spans_to_strings(&step.evicted).join(" "));
        }
        if step.failed > 0 {
            println!("         failed   {} span(s)", step.failed);
        }
    }
    println!();
    println!("Loaded:          {}", spans_to_strings(&loaded).join(" "));
    println!("Stored objects:  {}", registry.model_count());
    println!("Provider calls:  {}", provider.calls.load(Ordering::Relaxed));
    println!("Queries:         {}", stats.queries_submitted);
    println!("  local:         {}", stats.satisfied_locally);
    println!("  coalesced:     {} ({:.1}%)", stats.coalesced, stats.coalescing_ratio() * 100.0);
    println!("Evicted objects: {}", stats.objects_evicted);
    Ok(())
}

fn spans_to_strings(spans: &[TimeSpan]) -> Vec<String> {
    spans.iter().map(ToString::to_string).collect()
}
