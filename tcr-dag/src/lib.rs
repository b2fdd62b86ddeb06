//! DAG task executor (component H) plus the outer TDD-loop wrapper
//! that retries the whole DAG after an external `FixApplied` signal.
//!
//! The executor itself never attempts automatic cycle breaking: a
//! cycle is a human-in-the-loop recovery case, surfaced the same way a
//! task-failure is, and left to the wrapper's signal-wait-and-restart
//! loop.

use async_trait::async_trait;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tcr_collaborators::Signal;
use tcr_contracts::DagTask;
use tracing::{info, warn};

#[async_trait]
pub trait ShellExecutor: Send + Sync {
    async fn execute(&self, task: &DagTask) -> anyhow::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum DagError {
    #[error("cycle detected in task graph")]
    Cycle,
    #[error("dag stalled: {completed}/{total} complete with no task pending")]
    Stalled { completed: usize, total: usize },
    #[error("task(s) failed: {0:?}")]
    TasksFailed(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagRunResult {
    pub completed: Vec<String>,
}

/// A static set of tasks with declared prerequisites.
pub struct DagExecutor {
    tasks: Vec<DagTask>,
}

impl DagExecutor {
    pub fn new(tasks: Vec<DagTask>) -> Self {
        Self { tasks }
    }

    /// Kahn's algorithm: repeatedly remove nodes with no unresolved
    /// prerequisite. Any node left over once no more can be removed is
    /// part of a cycle.
    fn validate_acyclic(&self) -> Result<(), DagError> {
        let mut remaining_deps: HashMap<&str, HashSet<&str>> = self
            .tasks
            .iter()
            .map(|t| (t.name.as_str(), t.depends_on.iter().map(String::as_str).collect()))
            .collect();

        let mut resolved: HashSet<&str> = HashSet::new();
        loop {
            let ready: Vec<&str> = remaining_deps
                .iter()
                .filter(|(name, deps)| !resolved.contains(*name) && deps.is_empty())
                .map(|(name, _)| *name)
                .collect();

            if ready.is_empty() {
                break;
            }
            for name in &ready {
                resolved.insert(name);
            }
            for deps in remaining_deps.values_mut() {
                for name in &ready {
                    deps.remove(name);
                }
            }
        }

        if resolved.len() == self.tasks.len() {
            Ok(())
        } else {
            Err(DagError::Cycle)
        }
    }

    /// Runs every task to completion. In each iteration, starts every
    /// ready task not yet started (bounded optionally by
    /// `concurrency_cap`), then waits for any one pending task to
    /// finish. On a task failure, drains the remaining pending tasks
    /// before failing the whole DAG.
    pub async fn run(&self, executor: Arc<dyn ShellExecutor>, concurrency_cap: Option<usize>) -> Result<DagRunResult, DagError> {
        self.validate_acyclic()?;

        let mut completed: HashSet<String> = HashSet::new();
        let mut started: HashSet<String> = HashSet::new();
        let mut pending = FuturesUnordered::new();

        loop {
            for task in &self.tasks {
                if completed.contains(&task.name) || started.contains(&task.name) {
                    continue;
                }
                if let Some(cap) = concurrency_cap {
                    if pending.len() >= cap {
                        break;
                    }
                }
                if task.depends_on.iter().all(|dep| completed.contains(dep)) {
                    started.insert(task.name.clone());
                    let exec = Arc::clone(&executor);
                    let task = task.clone();
                    pending.push(async move {
                        let result = exec.execute(&task).await;
                        (task.name, result)
                    });
                }
            }

            if completed.len() == self.tasks.len() {
                let mut completed: Vec<String> = completed.into_iter().collect();
                completed.sort();
                return Ok(DagRunResult { completed });
            }

            let Some((name, result)) = pending.next().await else {
                return Err(DagError::Stalled {
                    completed: completed.len(),
                    total: self.tasks.len(),
                });
            };

            match result {
                Ok(()) => {
                    completed.insert(name);
                }
                Err(err) => {
                    warn!(task = %name, error = %err, "dag task failed");
                    let mut failed = vec![name];
                    while let Some((drained_name, drained_result)) = pending.next().await {
                        if drained_result.is_err() {
                            failed.push(drained_name);
                        }
                    }
                    return Err(DagError::TasksFailed(failed));
                }
            }
        }
    }
}

/// Retries the whole DAG each time a `FixApplied` signal arrives,
/// incrementing an attempt counter. Does not interpret the signal's
/// payload: what counts as "fixed" is entirely up to the human
/// signaller.
pub async fn run_with_human_recovery(
    executor: &DagExecutor,
    shell: Arc<dyn ShellExecutor>,
    fix_signal: &Signal<String>,
    concurrency_cap: Option<usize>,
    max_attempts: u32,
) -> Result<DagRunResult, DagError> {
    let mut attempt = 1;
    loop {
        match executor.run(Arc::clone(&shell), concurrency_cap).await {
            Ok(result) => return Ok(result),
            Err(err) => {
                if attempt >= max_attempts {
                    return Err(err);
                }
                info!(attempt, error = %err, "dag attempt failed, waiting for FixApplied signal");
                match fix_signal.wait().await {
                    Some(message) => {
                        info!(message = %message, "fix applied, restarting dag");
                        attempt += 1;
                    }
                    None => return Err(err),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingExecutor {
        started_order: Mutex<Vec<String>>,
        always_fail: HashSet<String>,
    }

    #[async_trait]
    impl ShellExecutor for RecordingExecutor {
        async fn execute(&self, task: &DagTask) -> anyhow::Result<()> {
            self.started_order.lock().unwrap().push(task.name.clone());
            if self.always_fail.contains(&task.name) {
                anyhow::bail!("task {} failed", task.name);
            }
            Ok(())
        }
    }

    fn diamond() -> Vec<DagTask> {
        vec![
            DagTask::new("a", "echo a", vec![]),
            DagTask::new("b", "echo b", vec!["a".to_string()]),
            DagTask::new("c", "echo c", vec!["a".to_string()]),
            DagTask::new("d", "echo d", vec!["b".to_string(), "c".to_string()]),
        ]
    }

    #[tokio::test]
    async fn diamond_dag_completes_all_tasks_respecting_order() {
        let executor = DagExecutor::new(diamond());
        let shell = Arc::new(RecordingExecutor {
            started_order: Mutex::new(Vec::new()),
            always_fail: HashSet::new(),
        });
        let result = executor.run(shell.clone(), None).await.unwrap();
        assert_eq!(result.completed.len(), 4);

        let order = shell.started_order.lock().unwrap();
        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("d"));
        assert!(pos("c") < pos("d"));
    }

    #[tokio::test]
    async fn cycle_is_detected_without_running_any_task() {
        let tasks = vec![
            DagTask::new("a", "echo a", vec!["b".to_string()]),
            DagTask::new("b", "echo b", vec!["a".to_string()]),
        ];
        let executor = DagExecutor::new(tasks);
        let shell = Arc::new(RecordingExecutor {
            started_order: Mutex::new(Vec::new()),
            always_fail: HashSet::new(),
        });
        let err = executor.run(shell.clone(), None).await.unwrap_err();
        assert!(matches!(err, DagError::Cycle));
        assert!(shell.started_order.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_task_drains_pending_before_failing_the_dag() {
        let tasks = vec![
            DagTask::new("a", "echo a", vec![]),
            DagTask::new("b", "echo b", vec![]),
            DagTask::new("c", "echo c", vec!["a".to_string(), "b".to_string()]),
        ];
        let mut always_fail = HashSet::new();
        always_fail.insert("a".to_string());
        let executor = DagExecutor::new(tasks);
        let shell = Arc::new(RecordingExecutor {
            started_order: Mutex::new(Vec::new()),
            always_fail,
        });
        let err = executor.run(shell, None).await.unwrap_err();
        match err {
            DagError::TasksFailed(failed) => assert!(failed.contains(&"a".to_string())),
            other => panic!("expected TasksFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn human_recovery_retries_after_fix_applied_signal() {
        let tasks = vec![DagTask::new("a", "echo a", vec![])];
        let mut always_fail = HashSet::new();
        always_fail.insert("a".to_string());
        let executor = DagExecutor::new(tasks);
        let shell = Arc::new(RecordingExecutor {
            started_order: Mutex::new(Vec::new()),
            always_fail: always_fail.clone(),
        });

        let (sender, signal) = Signal::<String>::channel();
        tokio::spawn(async move {
            sender.fire("manual patch applied".to_string()).unwrap();
        });

        let result = run_with_human_recovery(&executor, shell, signal.as_ref(), None, 2).await;
        assert!(result.is_err(), "task keeps failing even after retry, so this should still fail");
    }
}
