use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use claimflow::config::AppConfig;
use claimflow::engine::{
    claims_router, export_audit_artifact, standard_pack, ClaimInput, DecisionService,
    ImpactReport, InMemoryProductRepository, RegressionRunSummary,
};
use claimflow::error::AppError;
use claimflow::telemetry;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Claimflow Decisioning Service",
    about = "Run the parametric flight-delay claim decisioning service and tooling",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate a single claim against the demo catalog and print the trace
    Decide(DecideArgs),
    /// Run the standard regression pack, optionally comparing two versions
    Regression(RegressionArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct DecideArgs {
    #[arg(long)]
    booking_ref: String,
    #[arg(long)]
    flight_no: String,
    /// Flight date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    flight_date: NaiveDate,
    #[arg(long, default_value = "pax-cli")]
    passenger_token: String,
    #[arg(long)]
    product: String,
    #[arg(long)]
    version: String,
    /// Claim submission date (defaults to evaluation time)
    #[arg(long, value_parser = parse_date)]
    claim_date: Option<NaiveDate>,
    /// Print the decision as an exported audit artifact (JSON)
    #[arg(long)]
    audit: bool,
}

#[derive(Args, Debug)]
struct RegressionArgs {
    #[arg(long)]
    product: String,
    #[arg(long)]
    version: String,
    /// Compare against a second version and report decision impact
    #[arg(long)]
    compare_to: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Decide(args) => run_decide(args),
        Command::Regression(args) => run_regression(args),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn demo_service(exported_by: &str) -> DecisionService<InMemoryProductRepository> {
    let repository = Arc::new(InMemoryProductRepository::with_demo_catalog());
    DecisionService::new(repository, exported_by)
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let service = Arc::new(demo_service(&config.audit.exported_by));

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(claims_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "claim decisioning service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_decide(args: DecideArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = demo_service(&config.audit.exported_by);

    let claim = ClaimInput {
        booking_ref: args.booking_ref,
        flight_no: args.flight_no,
        flight_date: args.flight_date,
        passenger_token: args.passenger_token,
        product_id: args.product,
        product_version: args.version,
        claim_date: args.claim_date,
    };

    let decision = service.decide(&claim)?;

    if args.audit {
        let artifact = export_audit_artifact(&decision, &config.audit.exported_by);
        let rendered = serde_json::to_string_pretty(&artifact)
            .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
        println!("{rendered}");
        return Ok(());
    }

    println!(
        "Decision {}: {} (${} payout)",
        decision.id,
        decision.outcome.label(),
        decision.payout_amount_usd
    );
    println!(
        "Product {} @ {} (hash {})",
        claim.product_id, decision.product_version, decision.product_hash
    );
    println!(
        "Flight {} on {}: {}, {} min delay ({})",
        decision.flight_data.flight_no,
        decision.flight_data.flight_date,
        decision.flight_data.status.label(),
        decision.flight_data.delay_minutes,
        decision.flight_data.delay_reason.label()
    );
    println!("Reason codes: {}", decision.reason_codes.join(", "));

    println!("\nTrace");
    for step in &decision.trace {
        println!(
            "- [{:?}] {:?}: {}",
            step.result, step.rule, step.explanation
        );
    }

    Ok(())
}

fn run_regression(args: RegressionArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = demo_service(&config.audit.exported_by);

    match args.compare_to {
        Some(to_version) => {
            let report = service.impact(&args.product, &args.version, &to_version)?;
            render_impact(&report);
        }
        None => {
            let summary = service.regression_run(&args.product, &args.version)?;
            render_summary(&summary);
            if summary.failed > 0 {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn render_summary(summary: &RegressionRunSummary) {
    println!(
        "Regression pack \"{}\" against {} @ {}",
        summary.pack_name, summary.product_id, summary.product_version
    );
    println!(
        "{} cases: {} passed, {} failed",
        summary.total_tests, summary.passed, summary.failed
    );

    for result in &summary.results {
        match &result.diff {
            Some(diff) => println!("- FAIL {} ({diff})", result.test_case.name),
            None => println!("- ok   {}", result.test_case.name),
        }
    }
}

fn render_impact(report: &ImpactReport) {
    println!(
        "Impact of {} {} -> {} over \"{}\"",
        report.product_id,
        report.from_version,
        report.to_version,
        standard_pack().name
    );
    println!(
        "{} cases: {} unaffected, {} affected ({} flipped to approved, {} flipped to denied)",
        report.total_cases,
        report.unaffected,
        report.affected,
        report.flipped_to_approved,
        report.flipped_to_denied
    );
    println!("Aggregate payout delta: ${}", report.payout_delta_usd);

    for case in report.cases.iter().filter(|case| case.affected) {
        println!(
            "- {}: {} ${} -> {} ${}",
            case.name,
            case.from_outcome.label(),
            case.from_payout,
            case.to_outcome.label(),
            case.to_payout
        );
    }
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
