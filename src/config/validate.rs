// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{GraphFile, RawGraphFile, SchedulerConfig};
use crate::errors::{Result, TaskGraphError};

impl TryFrom<RawGraphFile> for GraphFile {
    type Error = crate::errors::TaskGraphError;

    fn try_from(raw: RawGraphFile) -> std::result::Result<Self, Self::Error> {
        let order = validate_raw_config(&raw)?;
        Ok(GraphFile::new_unchecked(raw.scheduler, raw.task, order))
    }
}

/// Validate a raw graph file and return its tasks in dependency order.
fn validate_raw_config(cfg: &RawGraphFile) -> Result<Vec<String>> {
    ensure_has_tasks(cfg)?;
    validate_scheduler_config(&cfg.scheduler)?;
    validate_task_dependencies(cfg)?;
    validate_dag(cfg)
}

fn ensure_has_tasks(cfg: &RawGraphFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskGraphError::ConfigError(
            "graph file must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_scheduler_config(cfg: &SchedulerConfig) -> Result<()> {
    if cfg.close_poll_interval_ms == 0 {
        return Err(TaskGraphError::ConfigError(
            "[scheduler].close_poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.thread_name.trim().is_empty() {
        return Err(TaskGraphError::ConfigError(
            "[scheduler].thread_name must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_task_dependencies(cfg: &RawGraphFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(TaskGraphError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(TaskGraphError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawGraphFile) -> Result<Vec<String>> {
    // Edge direction: dep -> task, so the topological order creates
    // dependencies first.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(TaskGraphError::DagCycle(format!(
                "cycle detected in task DAG involving task '{}'",
                node
            )))
        }
    }
}
