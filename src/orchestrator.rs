//! Planning and running an analysis pass.
//!
//! Discovery, log matching and policy validation happen up front and fail
//! the whole run. Once work items exist, individual failures only show up in
//! the results.

use crate::cli::AnalyzeArgs;
use crate::config::Config;
use crate::discovery::{discover_agents, discover_logs, filter_agents};
use crate::error::AuditError;
use crate::invoker::Invoker;
use crate::matcher::match_log;
use crate::models::{MatchedAgent, PolicySpec, WorkItem};
use crate::scheduler::{ProgressEvent, ScheduledRun, Scheduler};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything needed to run one analysis pass.
#[derive(Debug, Clone)]
pub struct AnalysisPlan {
    pub policy: PolicySpec,
    pub items: Vec<WorkItem>,
}

impl AnalysisPlan {
    pub fn with_logs(&self) -> usize {
        self.items.iter().filter(|i| i.log.is_some()).count()
    }
}

/// Discover agents and pair each with its execution log.
pub fn match_agents(agents_dir: &Path, logs_dir: &Path) -> Result<Vec<MatchedAgent>, AuditError> {
    let agents = discover_agents(agents_dir);
    if agents.is_empty() {
        return Err(AuditError::NoAgents(agents_dir.to_path_buf()));
    }

    let logs = discover_logs(logs_dir);
    debug!(
        "Discovered {} agents and {} logs",
        agents.len(),
        logs.len()
    );

    Ok(agents
        .into_iter()
        .map(|agent| {
            let log = match_log(&agent.name, &logs).cloned();
            MatchedAgent { agent, log }
        })
        .collect())
}

/// Check a regulation against the configured allow-list.
///
/// An empty list accepts anything. Matching ignores case and returns the
/// allow-listed spelling.
pub fn validate_policy(policy: PolicySpec, allowed: &[String]) -> Result<PolicySpec, AuditError> {
    match policy {
        PolicySpec::Regulation(name) if !allowed.is_empty() => allowed
            .iter()
            .find(|a| a.eq_ignore_ascii_case(&name))
            .map(|a| PolicySpec::Regulation(a.clone()))
            .ok_or_else(|| AuditError::UnknownRegulation {
                name,
                allowed: allowed.to_vec(),
            }),
        other => Ok(other),
    }
}

/// One work item per agent, numbered in discovery order.
pub fn build_work_items(agents: Vec<MatchedAgent>, policy: &PolicySpec) -> Vec<WorkItem> {
    agents
        .into_iter()
        .enumerate()
        .map(|(sequence_index, matched)| WorkItem {
            agent: matched.agent,
            policy: policy.clone(),
            log: matched.log,
            sequence_index,
        })
        .collect()
}

/// Resolve the policy, discover and filter agents, and build work items.
pub fn plan_analysis(config: &Config, args: &AnalyzeArgs) -> Result<AnalysisPlan, AuditError> {
    let policy = validate_policy(args.policy_spec()?, &config.analyzer.regulations)?;

    let matched = match_agents(&config.paths.agents_dir, &config.paths.logs_dir)?;

    let matched = if args.agents.is_empty() {
        matched
    } else {
        let agents = matched.iter().map(|m| m.agent.clone()).collect();
        let kept = filter_agents(agents, &args.agents);
        if kept.is_empty() {
            return Err(AuditError::NoMatchingAgents(args.agents.clone()));
        }
        matched
            .into_iter()
            .filter(|m| kept.contains(&m.agent))
            .collect()
    };

    let items = build_work_items(matched, &policy);
    info!("Planned {} analyses against {}", items.len(), policy);

    Ok(AnalysisPlan { policy, items })
}

/// Run a plan through the scheduler.
pub async fn run_analysis<F>(
    plan: &AnalysisPlan,
    invoker: Arc<dyn Invoker>,
    concurrency: usize,
    on_progress: F,
) -> Result<ScheduledRun, AuditError>
where
    F: FnMut(ProgressEvent<'_>),
{
    let scheduler = Scheduler::new(invoker, concurrency)?;
    Ok(scheduler.run(plan.items.clone(), on_progress).await)
}
