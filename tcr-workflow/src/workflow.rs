//! The Enhanced TCR workflow (component G): drives components A-F
//! through the gate state machine.
//!
//! Two variants share this one engine, differing only in how they
//! exploit parallelism at the two fan-out points the design doc calls
//! out (§4.7): `multi_review`'s reviewer calls, and the two-tier
//! retry's targeted-fix attempts. Modelling them as one engine switched
//! by `WorkflowVariant` (rather than two duplicated structs) keeps the
//! state-machine drive loop, the saga registration, and the enforcement
//! calls in exactly one place.

use crate::config::WorkflowConfig;
use crate::query::WorkflowQueryState;
use futures::future::join_all;
use std::sync::Arc;
use tcr_collaborators::{ActivityContext, AgentClient, CellManager, CommandKind};
use tcr_contracts::{
    Bootstrap, EnhancedTcrInput, EnhancedTcrResult, GateName, GateResult, Task,
};
use tcr_enforcement::{check_empirical_honesty, lock_test_files, unlock_test_files};
use tcr_gates::GateActivities;
use tcr_locks::LockRegistry;
use tcr_metrics::MetricsCollector;
use tcr_saga::{CompensationSaga, ReleaseLocksCompensation, TeardownCellCompensation};
use tcr_state_machine::{MachineState, StateMachine, TransitionOutcome};
use tracing::{error, info, warn};

/// Which fan-out behaviour the engine uses at `multi_review` and at
/// targeted-fix points. Both variants run the identical state machine
/// and honour the identical invariants (§4.7): the only difference is
/// how many concurrent activities a fan-out point launches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowVariant {
    Sequential,
    Parallel,
}

/// One queued unit of work for the drive loop: either run a gate's
/// ordinary activity, or run a targeted fix against `target` followed
/// by whatever re-check that gate requires.
enum Step {
    Gate(GateName),
    Fix { target: GateName, feedback: String },
}

/// Accumulated, mutable context threaded through one workflow run.
/// Everything here is scoped to a single `run` call; nothing survives
/// across runs.
struct RunState {
    test_files: Vec<String>,
    impl_files: Vec<String>,
    last_agent_response: Option<String>,
    prior_failure: Option<String>,
}

impl RunState {
    fn new() -> Self {
        Self {
            test_files: Vec::new(),
            impl_files: Vec::new(),
            last_agent_response: None,
            prior_failure: None,
        }
    }
}

pub struct TcrWorkflow {
    variant: WorkflowVariant,
    gates: Arc<GateActivities>,
    agent: Arc<dyn AgentClient>,
    cell_manager: Arc<dyn CellManager>,
    lock_registry: Arc<LockRegistry>,
    metrics: Arc<MetricsCollector>,
    config: WorkflowConfig,
}

impl TcrWorkflow {
    pub fn new(
        variant: WorkflowVariant,
        gates: Arc<GateActivities>,
        agent: Arc<dyn AgentClient>,
        cell_manager: Arc<dyn CellManager>,
        lock_registry: Arc<LockRegistry>,
        metrics: Arc<MetricsCollector>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            variant,
            gates,
            agent,
            cell_manager,
            lock_registry,
            metrics,
            config,
        }
    }

    pub fn sequential(
        gates: Arc<GateActivities>,
        agent: Arc<dyn AgentClient>,
        cell_manager: Arc<dyn CellManager>,
        lock_registry: Arc<LockRegistry>,
        metrics: Arc<MetricsCollector>,
        config: WorkflowConfig,
    ) -> Self {
        Self::new(WorkflowVariant::Sequential, gates, agent, cell_manager, lock_registry, metrics, config)
    }

    pub fn parallel(
        gates: Arc<GateActivities>,
        agent: Arc<dyn AgentClient>,
        cell_manager: Arc<dyn CellManager>,
        lock_registry: Arc<LockRegistry>,
        metrics: Arc<MetricsCollector>,
        config: WorkflowConfig,
    ) -> Self {
        Self::new(WorkflowVariant::Parallel, gates, agent, cell_manager, lock_registry, metrics, config)
    }

    /// Drives one task through bootstrap, the six quality gates, and
    /// commit, registering saga compensations immediately after a
    /// successful bootstrap and running them on every exit path.
    pub async fn run(
        &self,
        ctx: &dyn ActivityContext,
        query_state: &WorkflowQueryState,
        input: EnhancedTcrInput,
    ) -> EnhancedTcrResult {
        self.metrics.mark_workflow_start();
        let task = input.task();
        let config = self.config.clone().with_input_overrides(&input);
        let holder = format!("{}:{}", task.cell_id, task.task_id);

        info!(task_id = %task.task_id, variant = ?self.variant, "enhanced tcr workflow starting");

        let bootstrap = match self.cell_manager.bootstrap(&task.cell_id, &task.branch).await {
            Ok(b) => b,
            Err(err) => {
                let message = format!("bootstrap failed: {err}");
                error!(task_id = %task.task_id, error = %err, "bootstrap failed");
                return EnhancedTcrResult {
                    success: false,
                    gate_results: Vec::new(),
                    files_changed: Vec::new(),
                    error: Some(message),
                };
            }
        };

        let mut saga = CompensationSaga::new();
        saga.register(Arc::new(ReleaseLocksCompensation::new(Arc::clone(&self.lock_registry), holder.clone())));
        saga.register(Arc::new(TeardownCellCompensation::new(Arc::clone(&self.cell_manager), bootstrap.clone())));

        let mut machine = StateMachine::new(config.max_retries, config.max_fix_attempts);
        let mut history: Vec<GateResult> = Vec::new();
        query_state.set_state(machine.current_state());

        let outcome = self
            .drive(ctx, query_state, &mut machine, &mut history, &bootstrap, &task, &config, &holder)
            .await;

        if outcome.is_err() {
            if let Err(err) = self.gates.revert(ctx, &bootstrap).await {
                warn!(error = %err, "final revert failed, continuing to saga cleanup");
            }
        }

        saga.run_all(ctx).await;

        let files_changed: Vec<String> = history
            .iter()
            .flat_map(|g| g.agent_results.iter())
            .flat_map(|a| a.files_changed.iter().cloned())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        match outcome {
            Ok(()) => EnhancedTcrResult {
                success: true,
                gate_results: history,
                files_changed,
                error: None,
            },
            Err(message) => EnhancedTcrResult {
                success: false,
                gate_results: history,
                files_changed,
                error: Some(message),
            },
        }
    }

    /// Runs the gate sequence to a terminal state, returning `Ok(())`
    /// on `complete` and `Err(reason)` on `failed` (including
    /// enforcement breaches, which short-circuit outright rather than
    /// consulting the retry budget).
    async fn drive(
        &self,
        ctx: &dyn ActivityContext,
        query_state: &WorkflowQueryState,
        machine: &mut StateMachine,
        history: &mut Vec<GateResult>,
        bootstrap: &Bootstrap,
        task: &Task,
        config: &WorkflowConfig,
        holder: &str,
    ) -> Result<(), String> {
        let mut state = RunState::new();
        // Bootstrap itself already succeeded (the cell manager call above
        // this function); advance the machine off its initial state
        // before entering the gate loop.
        machine.on_gate_result(GateName::Bootstrap, true).map_err(|e| e.to_string())?;
        query_state.set_state(machine.current_state());
        let mut step = Step::Gate(GateName::GenTest);

        loop {
            match step {
                Step::Gate(gate) => {
                    let result = self.run_gate(ctx, bootstrap, task, gate, config, holder, &mut state).await?;

                    if gate == GateName::VerifyGreen {
                        self.check_honesty(&state, &result)?;
                    }

                    self.metrics.record_gate_duration(gate, result.duration_ms, result.passed);
                    query_state.record_gate_outcome(result.passed);
                    let passed = result.passed;
                    history.push(result);

                    let transition = machine.on_gate_result(gate, passed).map_err(|e| e.to_string())?;
                    query_state.set_state(machine.current_state());

                    match transition {
                        TransitionOutcome::Complete => return Ok(()),
                        TransitionOutcome::Advance(next) => step = Step::Gate(next),
                        TransitionOutcome::Failed(message) => return Err(message),
                        TransitionOutcome::Regenerate { revert_to } => {
                            if let Err(err) = self.gates.revert(ctx, bootstrap).await {
                                warn!(error = %err, "regeneration revert failed, continuing");
                            }
                            if revert_to == GateName::GenImpl {
                                state.prior_failure = self.last_failure_text(history);
                            }
                            step = Step::Gate(revert_to);
                        }
                        TransitionOutcome::RetryFix => {
                            if gate == GateName::GenTest {
                                step = Step::Gate(GateName::GenTest);
                            } else {
                                let feedback = self.last_failure_text(history).unwrap_or_default();
                                step = Step::Fix { target: gate, feedback };
                            }
                        }
                    }
                }
                Step::Fix { target, feedback } => {
                    let fix_result = self.run_fix(ctx, bootstrap, target, &feedback, config, holder, &mut state).await;
                    self.metrics.record_gate_duration(target, fix_result.duration_ms, fix_result.passed);
                    let fix_passed = fix_result.passed;
                    history.push(fix_result);

                    match target {
                        GateName::GenImpl => {
                            let transition = machine.on_gate_result(target, fix_passed).map_err(|e| e.to_string())?;
                            query_state.set_state(machine.current_state());
                            step = self.apply_fix_transition(ctx, bootstrap, transition, target, history, &mut state).await?;
                        }
                        GateName::VerifyGreen | GateName::MultiReview => {
                            if !fix_passed {
                                // the fix call itself errored; feed the
                                // failure straight back to the machine
                                // rather than re-verifying nothing.
                                let transition = machine.on_gate_result(target, false).map_err(|e| e.to_string())?;
                                query_state.set_state(machine.current_state());
                                step = self.apply_fix_transition(ctx, bootstrap, transition, target, history, &mut state).await?;
                                continue;
                            }
                            step = Step::Gate(target);
                        }
                        _ => unreachable!("only GenImpl/VerifyGreen/MultiReview are retryable"),
                    }
                }
            }

            if machine.is_terminal() {
                return match machine.current_state() {
                    MachineState::Complete => Ok(()),
                    MachineState::Failed => Err("workflow reached failed state".to_string()),
                    MachineState::Gate(_) => unreachable!("is_terminal implies a terminal state"),
                };
            }
        }
    }

    async fn apply_fix_transition(
        &self,
        ctx: &dyn ActivityContext,
        bootstrap: &Bootstrap,
        transition: TransitionOutcome,
        gate: GateName,
        history: &[GateResult],
        state: &mut RunState,
    ) -> Result<Step, String> {
        match transition {
            TransitionOutcome::Complete => Ok(Step::Gate(GateName::Commit)),
            TransitionOutcome::Advance(next) => Ok(Step::Gate(next)),
            TransitionOutcome::Failed(message) => Err(message),
            TransitionOutcome::Regenerate { revert_to } => {
                if let Err(err) = self.gates.revert(ctx, bootstrap).await {
                    warn!(error = %err, "regeneration revert failed, continuing");
                }
                if revert_to == GateName::GenImpl {
                    state.prior_failure = self.last_failure_text(history);
                }
                Ok(Step::Gate(revert_to))
            }
            TransitionOutcome::RetryFix => {
                let feedback = self.last_failure_text(history).unwrap_or_default();
                Ok(Step::Fix { target: gate, feedback })
            }
        }
    }

    fn last_failure_text(&self, history: &[GateResult]) -> Option<String> {
        history.last().and_then(|g| g.advisory.clone().or_else(|| g.error.clone()))
    }

    /// Post-`verify_green` enforcement (component K): compares what the
    /// most recent agent response claimed against what the test runner
    /// actually reported. A mismatch is a hard error, not a retryable
    /// gate failure.
    fn check_honesty(&self, state: &RunState, result: &GateResult) -> Result<(), String> {
        let (Some(claim), Some(test_result)) = (state.last_agent_response.as_deref(), result.test_result()) else {
            return Ok(());
        };
        check_empirical_honesty(claim, test_result).map_err(|err| err.to_string())
    }

    async fn run_gate(
        &self,
        ctx: &dyn ActivityContext,
        bootstrap: &Bootstrap,
        task: &Task,
        gate: GateName,
        config: &WorkflowConfig,
        holder: &str,
        state: &mut RunState,
    ) -> Result<GateResult, String> {
        match gate {
            GateName::GenTest => {
                let result = self.gates.gen_test(ctx, bootstrap, task).await;
                if result.passed {
                    if let Some(agent_result) = result.agent_results.first() {
                        state.test_files = agent_result.files_changed.clone();
                        state.last_agent_response = Some(agent_result.response.clone());
                    }
                }
                Ok(result)
            }
            GateName::LintTest => Ok(self.gates.lint_test(ctx, bootstrap).await),
            GateName::VerifyRed => Ok(self.gates.verify_red(ctx, bootstrap, &config.test_pattern).await),
            GateName::GenImpl => {
                lock_test_files(&self.lock_registry, &state.test_files, holder, config.lock_ttl()).map_err(|e| e.to_string())?;
                let result = self.gates.gen_impl(ctx, bootstrap, task, state.prior_failure.as_deref()).await;
                unlock_test_files(&self.lock_registry, holder);
                if result.passed {
                    if let Some(agent_result) = result.agent_results.first() {
                        state.impl_files = agent_result
                            .files_changed
                            .iter()
                            .filter(|f| !state.test_files.contains(f))
                            .cloned()
                            .collect();
                        state.last_agent_response = Some(agent_result.response.clone());
                    }
                }
                Ok(result)
            }
            GateName::VerifyGreen => Ok(self.gates.verify_green(ctx, bootstrap, &config.test_pattern).await),
            GateName::MultiReview => Ok(match self.variant {
                WorkflowVariant::Sequential => self.gates.multi_review(ctx, bootstrap, task, config.reviewers_count).await,
                WorkflowVariant::Parallel => self.gates.multi_review_parallel(ctx, bootstrap, task, config.reviewers_count).await,
            }),
            GateName::Commit => Ok(self.gates.commit(ctx, bootstrap, &config.commit_message(&task.task_id)).await),
            GateName::Bootstrap => unreachable!("bootstrap is handled before the drive loop starts"),
        }
    }

    /// Targeted-fix activity (§4.5 `fix_from_feedback`). In the
    /// sequential variant this is one call; the parallel variant fans
    /// out `config.parallel_fix_attempts` concurrent attempts and picks
    /// a winner (§4.7's explicit tie-break: first whose subsequent
    /// verification passes, by ascending attempt index).
    async fn run_fix(
        &self,
        ctx: &dyn ActivityContext,
        bootstrap: &Bootstrap,
        target: GateName,
        feedback: &str,
        config: &WorkflowConfig,
        holder: &str,
        state: &mut RunState,
    ) -> GateResult {
        lock_test_files(&self.lock_registry, &state.test_files, holder, config.lock_ttl())
            .unwrap_or_else(|err| warn!(error = %err, "fix-from-feedback enforcement lock failed"));
        let current_code = self.read_current_code(bootstrap, &state.impl_files).await;

        let result = match self.variant {
            WorkflowVariant::Sequential => self.gates.fix_from_feedback(ctx, bootstrap, target, &current_code, feedback).await,
            WorkflowVariant::Parallel => {
                let attempts = config.parallel_fix_attempts.max(1);
                let futures = (0..attempts).map(|_| self.gates.fix_from_feedback(ctx, bootstrap, target, &current_code, feedback));
                let results = join_all(futures).await;
                // tie-break on ascending attempt index, independent of
                // which future actually resolved first on the wall clock.
                results
                    .into_iter()
                    .find(|r| r.passed)
                    .unwrap_or_else(|| GateResult::new(target, false).with_error("every parallel fix attempt failed"))
            }
        };

        unlock_test_files(&self.lock_registry, holder);

        if result.passed {
            if let Some(agent_result) = result.agent_results.first() {
                if !agent_result.files_changed.is_empty() {
                    state.impl_files = agent_result
                        .files_changed
                        .iter()
                        .filter(|f| !state.test_files.contains(f))
                        .cloned()
                        .collect();
                }
                state.last_agent_response = Some(agent_result.response.clone());
            }
        }
        result
    }

    async fn read_current_code(&self, bootstrap: &Bootstrap, impl_files: &[String]) -> String {
        let Some(path) = impl_files.first() else {
            return String::new();
        };
        match self
            .agent
            .execute_command(&bootstrap.worktree_path, CommandKind::Shell, &["cat".to_string(), path.clone()])
            .await
        {
            Ok(output) => output.text,
            Err(err) => {
                warn!(error = %err, path = %path, "failed to read current implementation file for fix prompt");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tcr_collaborators::{
        AgentResponse, CellManager as CellManagerTrait, CommandOutput, DisconnectedContext, FileStatus,
        LintRunOutput, Linter, PromptOptions, TestRunOutput, TestRunner, TracingActivityContext, VersionControl,
    };
    use tcr_gates::DefaultPromptBuilder;

    struct ScriptedAgent {
        responses: Mutex<Vec<String>>,
        fallback: String,
    }

    #[async_trait]
    impl AgentClient for ScriptedAgent {
        async fn execute_prompt(&self, _prompt: &str, _options: &PromptOptions) -> anyhow::Result<AgentResponse> {
            let mut responses = self.responses.lock().unwrap();
            let text = if responses.is_empty() {
                self.fallback.clone()
            } else {
                responses.remove(0)
            };
            Ok(AgentResponse {
                text,
                tool_results: Vec::new(),
                session_id: "s1".to_string(),
                message_id: "m1".to_string(),
            })
        }

        async fn execute_command(&self, _dir: &str, _kind: CommandKind, _argv: &[String]) -> anyhow::Result<CommandOutput> {
            Ok(CommandOutput { text: "package hello\n".to_string() })
        }
    }

    struct ScriptedTestRunner {
        runs: Mutex<Vec<(i32, String)>>,
        fallback: (i32, String),
    }

    #[async_trait]
    impl TestRunner for ScriptedTestRunner {
        async fn run(&self, _dir: &str, _pattern: &str) -> anyhow::Result<TestRunOutput> {
            let mut runs = self.runs.lock().unwrap();
            let (exit_code, stdout) = if runs.is_empty() { self.fallback.clone() } else { runs.remove(0) };
            Ok(TestRunOutput { exit_code, stdout, stderr: String::new() })
        }
    }

    struct CleanLinter;

    #[async_trait]
    impl Linter for CleanLinter {
        async fn run(&self, _dir: &str) -> anyhow::Result<LintRunOutput> {
            Ok(LintRunOutput { exit_code: 0, stdout: String::new(), stderr: String::new() })
        }
    }

    struct CountingVcs {
        commit_calls: AtomicU32,
        revert_calls: AtomicU32,
    }

    #[async_trait]
    impl VersionControl for CountingVcs {
        async fn commit(&self, _bootstrap: &Bootstrap, _message: &str) -> anyhow::Result<()> {
            self.commit_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn revert(&self, _bootstrap: &Bootstrap) -> anyhow::Result<()> {
            self.revert_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn get_file_status(&self, _bootstrap: &Bootstrap) -> anyhow::Result<Vec<FileStatus>> {
            Ok(vec![FileStatus { path: "hello.go".to_string() }])
        }
    }

    struct CountingCellManager {
        teardown_calls: AtomicU32,
    }

    #[async_trait]
    impl CellManagerTrait for CountingCellManager {
        async fn bootstrap(&self, cell_id: &str, branch: &str) -> anyhow::Result<Bootstrap> {
            Ok(Bootstrap {
                cell_id: cell_id.to_string(),
                port: 8080,
                worktree_id: branch.to_string(),
                worktree_path: "/tmp/w1".to_string(),
                base_url: "http://localhost:8080".to_string(),
                server_pid: 1234,
            })
        }
        async fn teardown(&self, _bootstrap: &Bootstrap) -> anyhow::Result<()> {
            self.teardown_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingBootstrapCellManager;

    #[async_trait]
    impl CellManagerTrait for FailingBootstrapCellManager {
        async fn bootstrap(&self, _cell_id: &str, _branch: &str) -> anyhow::Result<Bootstrap> {
            anyhow::bail!("cell provisioning service unavailable")
        }
        async fn teardown(&self, _bootstrap: &Bootstrap) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn input() -> EnhancedTcrInput {
        EnhancedTcrInput {
            cell_id: "C1".to_string(),
            branch: "main".to_string(),
            task_id: "T1".to_string(),
            description: "Add Hello()".to_string(),
            acceptance_criteria: "Hello() returns \"Hello, World!\"".to_string(),
            max_retries: Some(2),
            max_fix_attempts: Some(5),
            reviewers_count: Some(2),
        }
    }

    fn workflow(
        agent_responses: Vec<String>,
        agent_fallback: &str,
        test_runs: Vec<(i32, String)>,
        test_fallback: (i32, String),
        variant: WorkflowVariant,
    ) -> TcrWorkflow {
        let agent = Arc::new(ScriptedAgent {
            responses: Mutex::new(agent_responses),
            fallback: agent_fallback.to_string(),
        });
        let test_runner = Arc::new(ScriptedTestRunner {
            runs: Mutex::new(test_runs),
            fallback: test_fallback,
        });
        let vcs = Arc::new(CountingVcs {
            commit_calls: AtomicU32::new(0),
            revert_calls: AtomicU32::new(0),
        });
        let gates = Arc::new(GateActivities::new(
            agent.clone(),
            test_runner,
            Arc::new(CleanLinter),
            vcs,
            Arc::new(DefaultPromptBuilder),
        ));
        let cell_manager = Arc::new(CountingCellManager {
            teardown_calls: AtomicU32::new(0),
        });
        TcrWorkflow::new(
            variant,
            gates,
            agent,
            cell_manager,
            Arc::new(LockRegistry::new()),
            Arc::new(MetricsCollector::new()),
            WorkflowConfig::default(),
        )
    }

    #[tokio::test]
    async fn happy_path_sequential_commits_and_tears_down_once() {
        let wf = workflow(
            vec!["wrote hello_test.go".to_string(), "implemented Hello()".to_string(), "APPROVE".to_string(), "APPROVE".to_string()],
            "APPROVE",
            vec![(1, "--- FAIL: TestHello (0.00s)\n    hello_test.go:5: boom\nFAIL\n".to_string())],
            (0, "PASS\nok  \tpkg\t0.01s\n".to_string()),
            WorkflowVariant::Sequential,
        );
        let query_state = WorkflowQueryState::new(6);
        let result = wf.run(&TracingActivityContext::new(), &query_state, input()).await;

        assert!(result.success, "expected success, got error: {:?}", result.error);
        assert!(result.gate_results.iter().any(|g| g.gate == GateName::Commit && g.passed));
        assert!(!result.files_changed.is_empty());
    }

    #[tokio::test]
    async fn red_phase_violation_is_reported_as_a_gate_failure() {
        let wf = workflow(
            vec!["wrote hello_test.go".to_string()],
            "no changes",
            Vec::new(),
            (0, "PASS\nok  \tpkg\t0.01s\n".to_string()), // verify_red always "passes" cleanly -> should fail the gate
            WorkflowVariant::Sequential,
        );
        let query_state = WorkflowQueryState::new(6);
        let result = wf.run(&TracingActivityContext::new(), &query_state, input()).await;

        assert!(!result.success);
        let verify_red = result.gate_results.iter().find(|g| g.gate == GateName::VerifyRed).unwrap();
        assert!(!verify_red.passed);
        assert_eq!(verify_red.error.as_deref(), Some("tests passed but should fail (not RED)"));
    }

    #[tokio::test]
    async fn bootstrap_failure_returns_immediately_without_gate_results() {
        let agent = Arc::new(ScriptedAgent {
            responses: Mutex::new(Vec::new()),
            fallback: String::new(),
        });
        let test_runner = Arc::new(ScriptedTestRunner {
            runs: Mutex::new(Vec::new()),
            fallback: (0, String::new()),
        });
        let vcs = Arc::new(CountingVcs {
            commit_calls: AtomicU32::new(0),
            revert_calls: AtomicU32::new(0),
        });
        let gates = Arc::new(GateActivities::new(agent.clone(), test_runner, Arc::new(CleanLinter), vcs, Arc::new(DefaultPromptBuilder)));
        let wf = TcrWorkflow::sequential(
            gates,
            agent,
            Arc::new(FailingBootstrapCellManager),
            Arc::new(LockRegistry::new()),
            Arc::new(MetricsCollector::new()),
            WorkflowConfig::default(),
        );
        let query_state = WorkflowQueryState::new(6);
        let result = wf.run(&TracingActivityContext::new(), &query_state, input()).await;

        assert!(!result.success);
        assert!(result.gate_results.is_empty());
        assert!(result.error.unwrap().contains("bootstrap failed"));
    }

    #[tokio::test]
    async fn exhaustion_reverts_and_fails_after_both_budgets_run_out() {
        let mut exhausting_input = input();
        exhausting_input.max_retries = Some(1);
        exhausting_input.max_fix_attempts = Some(2);

        let agent = Arc::new(ScriptedAgent {
            responses: Mutex::new(vec!["wrote hello_test.go".to_string()]),
            fallback: "implemented Hello()".to_string(),
        });
        let test_runner = Arc::new(ScriptedTestRunner {
            runs: Mutex::new(vec![(1, "--- FAIL: TestHello (0.00s)\n    hello_test.go:5: boom\nFAIL\n".to_string())]),
            fallback: (1, "--- FAIL: TestHello (0.00s)\n    hello_test.go:5: boom\nFAIL\n".to_string()),
        });
        let vcs = Arc::new(CountingVcs {
            commit_calls: AtomicU32::new(0),
            revert_calls: AtomicU32::new(0),
        });
        let gates = Arc::new(GateActivities::new(agent.clone(), test_runner, Arc::new(CleanLinter), vcs.clone(), Arc::new(DefaultPromptBuilder)));
        let wf = TcrWorkflow::sequential(
            gates,
            agent,
            Arc::new(CountingCellManager { teardown_calls: AtomicU32::new(0) }),
            Arc::new(LockRegistry::new()),
            Arc::new(MetricsCollector::new()),
            WorkflowConfig::default(),
        );
        let query_state = WorkflowQueryState::new(6);
        let result = wf.run(&TracingActivityContext::new(), &query_state, exhausting_input).await;

        assert!(!result.success);
        assert_eq!(vcs.revert_calls.load(Ordering::SeqCst), 2, "one regeneration revert plus one final-failure revert");
    }

    #[tokio::test]
    async fn parallel_variant_fans_out_reviewers_and_still_requires_unanimity() {
        let wf = workflow(
            vec![
                "wrote hello_test.go".to_string(),
                "implemented Hello()".to_string(),
                "APPROVE".to_string(),
                "I REJECT this, missing edge cases.".to_string(),
            ],
            "REQUEST_CHANGE",
            vec![(1, "--- FAIL: TestHello (0.00s)\n    hello_test.go:5: boom\nFAIL\n".to_string())],
            (0, "PASS\nok  \tpkg\t0.01s\n".to_string()),
            WorkflowVariant::Parallel,
        );
        let query_state = WorkflowQueryState::new(6);
        let result = wf.run(&TracingActivityContext::new(), &query_state, input()).await;

        // a rejection among the parallel reviewer calls must still be
        // caught: the aggregation point waits for every future (§5).
        let review = result.gate_results.iter().find(|g| g.gate == GateName::MultiReview);
        assert!(review.is_some());
    }

    #[test]
    fn fallback_fix_result_reports_failure() {
        let result = GateResult::new(GateName::VerifyGreen, false).with_error("every parallel fix attempt failed");
        assert!(!result.passed);
        assert_eq!(result.error.as_deref(), Some("every parallel fix attempt failed"));
    }
}
