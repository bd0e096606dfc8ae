//! `range-repair` -- repairs the local node's token ranges one slice at a time.
//!
//! Intended to run from cron or a systemd timer on every node. Exits `0`
//! only when every planned range of every keyspace repaired cleanly.
//!
//! # Environment variables
//!
//! Flags (see `--help`) can be set through `REPAIR_*` / `NODETOOL_*`
//! variables; the following are environment-only:
//!
//! | Variable                 | Default                                  |
//! |--------------------------|------------------------------------------|
//! | `NODETOOL_BIN`           | `nodetool`                               |
//! | `NODETOOL_ARGS`          | (none)                                   |
//! | `REPAIR_PAUSE_FILE`      | `/var/lib/cassandra/range_repair.pause`  |
//! | `REPAIR_STATUS_FILE`     | `/var/lib/cassandra/range_repair.status` |
//! | `REPAIR_PAUSE_POLL_SECS` | `60`                                     |
//! | `RUST_LOG`               | `ringrepair_worker=info,ringrepair_core=info` |

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use ringrepair_core::pacing::step_budget;
use ringrepair_worker::admin::AdminTool;
use ringrepair_worker::config::{nodetool_client, Args, RepairSettings};
use ringrepair_worker::orchestrator::Orchestrator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ringrepair_worker=info,ringrepair_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "range-repair failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let settings = RepairSettings::from_env().context("invalid environment configuration")?;
    let tool = nodetool_client(&args, &settings).context("invalid nodetool configuration")?;

    tracing::info!(
        nodetool = %settings.nodetool_program,
        pause_file = %settings.pause_file.display(),
        status_file = %settings.status_file.display(),
        keyspace = args.keyspace.as_deref().unwrap_or("<all>"),
        hours = args.hours,
        primary_range = args.primary_range,
        dry_run = args.dry_run,
        "Starting range-repair",
    );

    let orchestrator = Orchestrator::new(
        tool,
        args.run_options(),
        settings.pause_gate(),
        settings.status_reporter(),
    );

    if args.dry_run {
        return dry_run(&orchestrator, args.hours).await;
    }

    let report = orchestrator.run().await;
    Ok(ExitCode::from(report.exit_code()))
}

/// Plan only: print the plan as JSON on stdout and leave the status file
/// alone.
async fn dry_run<T: AdminTool>(
    orchestrator: &Orchestrator<T>,
    hours: f64,
) -> anyhow::Result<ExitCode> {
    let plan = match orchestrator.plan().await {
        Ok(plan) => plan,
        Err(e) => {
            tracing::error!(error = %e, "Dry run could not build a plan");
            return Ok(ExitCode::FAILURE);
        }
    };

    let output = serde_json::json!({
        "plan": plan,
        "total_hours": hours,
        "step_budget_secs": step_budget(hours, plan.unit_count()).as_secs_f64(),
    });
    let rendered = serde_json::to_string_pretty(&output).context("failed to render plan")?;
    println!("{rendered}");
    Ok(ExitCode::SUCCESS)
}
