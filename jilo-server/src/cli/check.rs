//! check subcommand
//!
//! Probes every valid agent once in parallel, records the observations and
//! prints a summary.

use crate::bootstrap::InitContext;
use crate::health::{check_all_parallel, CycleOutcome};
use crate::types::AgentId;
use clap::Args;
use serde::Serialize;

/// Arguments for the check subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct CheckReport<'a> {
    agent_id: &'a AgentId,
    #[serde(flatten)]
    outcome: &'a CycleOutcome,
}

/// Execute the check command
pub async fn execute(args: &CheckArgs, ctx: &InitContext) -> Result<(), anyhow::Error> {
    let results = check_all_parallel(&ctx.scheduler, ctx.agents.clone()).await;

    if args.json {
        println!("{}", render_json(&results)?);
    } else {
        print!("{}", render_table(&results));
    }
    Ok(())
}

fn render_json(results: &[(AgentId, CycleOutcome)]) -> Result<String, serde_json::Error> {
    let reports: Vec<CheckReport<'_>> = results
        .iter()
        .map(|(agent_id, outcome)| CheckReport { agent_id, outcome })
        .collect();
    serde_json::to_string_pretty(&reports)
}

fn render_table(results: &[(AgentId, CycleOutcome)]) -> String {
    if results.is_empty() {
        return "No agents to check\n".to_string();
    }

    let mut out = String::from("AGENT\tSTATUS\tTIME_MS\tRESULT\n");
    for (agent_id, outcome) in results {
        let line = match outcome {
            CycleOutcome::Recorded {
                observation,
                row_id,
            } => format!(
                "{}\t{}\t{}\trecorded (row {})",
                agent_id, observation.status_code, observation.elapsed_ms, row_id
            ),
            CycleOutcome::PersistFailed { observation, error } => format!(
                "{}\t{}\t{}\tnot recorded: {}",
                agent_id, observation.status_code, observation.elapsed_ms, error
            ),
            CycleOutcome::ProbeFailed { error } => format!("{}\t-\t-\tfailed: {}", agent_id, error),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}
