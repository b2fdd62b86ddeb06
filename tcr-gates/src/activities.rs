//! Per-gate activity implementations (component E).
//!
//! Each method takes the bootstrap handle and whatever inputs that
//! gate needs, performs exactly one externally-visible action (an
//! agent call, a shell invocation, or a VCS operation), and returns a
//! `GateResult`. The workflow crate treats the return value as the
//! sole point of truth; it never re-derives pass/fail from raw text
//! itself.

use crate::prompts::PromptBuilder;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tcr_collaborators::{ActivityContext, AgentClient, Linter, PromptOptions, TestRunner, VersionControl};
use tcr_contracts::{
    AgentResult, Bootstrap, GateName, GateOutcome, GateResult, ReviewType, ReviewVote, Task, Vote,
};
use tcr_parsers::{parse_lint_output, parse_test_output, parse_vote};
use tcr_review::{aggregate_review_feedback, check_unanimous_approval, get_rejection_summary};
use tracing::warn;

pub struct GateActivities {
    agent: Arc<dyn AgentClient>,
    test_runner: Arc<dyn TestRunner>,
    linter: Arc<dyn Linter>,
    vcs: Arc<dyn VersionControl>,
    prompts: Arc<dyn PromptBuilder>,
}

impl GateActivities {
    pub fn new(
        agent: Arc<dyn AgentClient>,
        test_runner: Arc<dyn TestRunner>,
        linter: Arc<dyn Linter>,
        vcs: Arc<dyn VersionControl>,
        prompts: Arc<dyn PromptBuilder>,
    ) -> Self {
        Self {
            agent,
            test_runner,
            linter,
            vcs,
            prompts,
        }
    }

    async fn changed_files(&self, bootstrap: &Bootstrap) -> Vec<String> {
        match self.vcs.get_file_status(bootstrap).await {
            Ok(statuses) => statuses.into_iter().map(|s| s.path).collect(),
            Err(err) => {
                warn!(error = %err, "failed to read file status, reporting no changed files");
                Vec::new()
            }
        }
    }

    fn prompt_options(title: &str) -> PromptOptions {
        PromptOptions {
            title: title.to_string(),
            agent: "default".to_string(),
            model: "default".to_string(),
        }
    }

    pub async fn gen_test(&self, ctx: &dyn ActivityContext, bootstrap: &Bootstrap, task: &Task) -> GateResult {
        ctx.heartbeat("gen_test:start").await;
        let start = Instant::now();
        let prompt = self
            .prompts
            .build_gen_test_prompt(&task.description, &task.acceptance_criteria);
        let options = Self::prompt_options("gen_test");

        let response = self.agent.execute_prompt(&prompt, &options).await;
        ctx.heartbeat("gen_test:agent-returned").await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match response {
            Ok(resp) => {
                let files_changed = self.changed_files(bootstrap).await;
                GateResult::new(GateName::GenTest, true)
                    .with_duration_ms(duration_ms)
                    .with_agent_results(vec![AgentResult {
                        model: options.model,
                        prompt,
                        response: resp.text,
                        files_changed,
                        duration_ms,
                    }])
            }
            Err(err) => GateResult::new(GateName::GenTest, false)
                .with_duration_ms(duration_ms)
                .with_error(err.to_string()),
        }
    }

    pub async fn lint_test(&self, ctx: &dyn ActivityContext, bootstrap: &Bootstrap) -> GateResult {
        ctx.heartbeat("lint_test:start").await;
        let start = Instant::now();
        let output = self.linter.run(&bootstrap.worktree_path).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match output {
            Ok(raw) => {
                let combined = format!("{}\n{}", raw.stdout, raw.stderr);
                let lint_result = parse_lint_output(&combined);
                let passed = lint_result.passed();
                GateResult::new(GateName::LintTest, passed)
                    .with_outcome(GateOutcome::Lint(lint_result))
                    .with_duration_ms(duration_ms)
            }
            Err(err) => GateResult::new(GateName::LintTest, false)
                .with_duration_ms(duration_ms)
                .with_error(err.to_string()),
        }
    }

    /// Passes iff tests fail: a clean run before the implementation
    /// exists means the tests were never honestly red.
    pub async fn verify_red(&self, ctx: &dyn ActivityContext, bootstrap: &Bootstrap, test_pattern: &str) -> GateResult {
        ctx.heartbeat("verify_red:start").await;
        let start = Instant::now();
        let output = self.test_runner.run(&bootstrap.worktree_path, test_pattern).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match output {
            Ok(raw) => {
                let combined = format!("{}\n{}", raw.stdout, raw.stderr);
                let test_result = parse_test_output(&combined);
                let passed = test_result.has_failures();
                let mut gate = GateResult::new(GateName::VerifyRed, passed)
                    .with_outcome(GateOutcome::Test(test_result))
                    .with_duration_ms(duration_ms);
                if !passed {
                    gate = gate.with_error("tests passed but should fail (not RED)");
                }
                gate
            }
            Err(err) => GateResult::new(GateName::VerifyRed, false)
                .with_duration_ms(duration_ms)
                .with_error(err.to_string()),
        }
    }

    pub async fn gen_impl(
        &self,
        ctx: &dyn ActivityContext,
        bootstrap: &Bootstrap,
        task: &Task,
        prior_failure: Option<&str>,
    ) -> GateResult {
        ctx.heartbeat("gen_impl:start").await;
        let start = Instant::now();
        let prompt = self
            .prompts
            .build_gen_impl_prompt(&task.description, &task.acceptance_criteria, prior_failure);
        let options = Self::prompt_options("gen_impl");

        let response = self.agent.execute_prompt(&prompt, &options).await;
        ctx.heartbeat("gen_impl:agent-returned").await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match response {
            Ok(resp) => {
                let files_changed = self.changed_files(bootstrap).await;
                GateResult::new(GateName::GenImpl, true)
                    .with_duration_ms(duration_ms)
                    .with_agent_results(vec![AgentResult {
                        model: options.model,
                        prompt,
                        response: resp.text,
                        files_changed,
                        duration_ms,
                    }])
            }
            Err(err) => GateResult::new(GateName::GenImpl, false)
                .with_duration_ms(duration_ms)
                .with_error(err.to_string()),
        }
    }

    /// Used only by the two-tier retry path. `gate` identifies which
    /// gate is being fixed (`GenImpl`, `VerifyGreen`, or `MultiReview`)
    /// so the result lands against the right fix-attempt counter.
    pub async fn fix_from_feedback(
        &self,
        ctx: &dyn ActivityContext,
        bootstrap: &Bootstrap,
        gate: GateName,
        current_code: &str,
        feedback: &str,
    ) -> GateResult {
        ctx.heartbeat("fix_from_feedback:start").await;
        let start = Instant::now();
        let prompt = self.prompts.build_fix_prompt(current_code, feedback);
        let options = Self::prompt_options("fix_from_feedback");

        let response = self.agent.execute_prompt(&prompt, &options).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match response {
            Ok(resp) => {
                let files_changed = self.changed_files(bootstrap).await;
                GateResult::new(gate, true)
                    .with_duration_ms(duration_ms)
                    .with_agent_results(vec![AgentResult {
                        model: options.model,
                        prompt,
                        response: resp.text,
                        files_changed,
                        duration_ms,
                    }])
            }
            Err(err) => GateResult::new(gate, false)
                .with_duration_ms(duration_ms)
                .with_error(err.to_string()),
        }
    }

    pub async fn verify_green(&self, ctx: &dyn ActivityContext, bootstrap: &Bootstrap, test_pattern: &str) -> GateResult {
        ctx.heartbeat("verify_green:start").await;
        let start = Instant::now();
        let output = self.test_runner.run(&bootstrap.worktree_path, test_pattern).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match output {
            Ok(raw) => {
                let combined = format!("{}\n{}", raw.stdout, raw.stderr);
                let test_result = parse_test_output(&combined);
                let passed = raw.exit_code == 0 && !test_result.has_failures();
                let mut gate = GateResult::new(GateName::VerifyGreen, passed)
                    .with_duration_ms(duration_ms)
                    .with_outcome(GateOutcome::Test(test_result.clone()));
                if !passed {
                    gate = gate.with_error(format!("verify_green failed: {}", test_result.raw_failure_blob()));
                }
                gate
            }
            Err(err) => GateResult::new(GateName::VerifyGreen, false)
                .with_duration_ms(duration_ms)
                .with_error(err.to_string()),
        }
    }

    pub async fn multi_review(
        &self,
        ctx: &dyn ActivityContext,
        bootstrap: &Bootstrap,
        task: &Task,
        reviewers_count: u32,
    ) -> GateResult {
        ctx.heartbeat("multi_review:start").await;
        let start = Instant::now();
        let files_changed = self.changed_files(bootstrap).await;

        let mut votes: Vec<ReviewVote> = Vec::new();
        let mut agent_results: Vec<AgentResult> = Vec::new();

        for i in 0..reviewers_count {
            let review_type = ReviewType::for_index(i as usize);
            let reviewer = format!("reviewer-{i}");
            let prompt = self
                .prompts
                .build_review_prompt(&review_type.to_string(), &task.description, &files_changed);
            let options = Self::prompt_options(&reviewer);

            let call_start = Instant::now();
            let response = self.agent.execute_prompt(&prompt, &options).await;
            let call_duration = call_start.elapsed().as_millis() as u64;

            match response {
                Ok(resp) => {
                    let parsed = parse_vote(&resp.text);
                    votes.push(ReviewVote {
                        reviewer: reviewer.clone(),
                        review_type,
                        vote: parsed.vote,
                        feedback: resp.text.clone(),
                        duration_ms: call_duration,
                    });
                    agent_results.push(AgentResult {
                        model: options.model,
                        prompt,
                        response: resp.text,
                        files_changed: files_changed.clone(),
                        duration_ms: call_duration,
                    });
                }
                Err(err) => {
                    votes.push(ReviewVote {
                        reviewer: reviewer.clone(),
                        review_type,
                        vote: Vote::RequestChange,
                        feedback: format!("reviewer call failed: {err}"),
                        duration_ms: call_duration,
                    });
                }
            }
        }
        ctx.heartbeat("multi_review:votes-collected").await;

        let duration_ms = start.elapsed().as_millis() as u64;
        let unanimous = check_unanimous_approval(&votes);
        let mut gate = GateResult::new(GateName::MultiReview, unanimous)
            .with_outcome(GateOutcome::Reviews(votes.clone()))
            .with_duration_ms(duration_ms)
            .with_agent_results(agent_results);

        if !unanimous {
            gate = gate.with_error(get_rejection_summary(&votes));
            if let Some(blob) = aggregate_review_feedback(&votes) {
                gate = gate.with_advisory(blob);
            }
        }
        gate
    }

    /// Parallel-variant counterpart to `multi_review`: fires every
    /// reviewer prompt concurrently instead of cycling through them
    /// one at a time. Aggregation still waits for every future before
    /// deciding unanimity (§5's ordering guarantee), so the observable
    /// result is identical to the sequential gate modulo vote order.
    pub async fn multi_review_parallel(
        &self,
        ctx: &dyn ActivityContext,
        bootstrap: &Bootstrap,
        task: &Task,
        reviewers_count: u32,
    ) -> GateResult {
        ctx.heartbeat("multi_review:start").await;
        let start = Instant::now();
        let files_changed = self.changed_files(bootstrap).await;

        let calls = (0..reviewers_count).map(|i| {
            let review_type = ReviewType::for_index(i as usize);
            let reviewer = format!("reviewer-{i}");
            let prompt = self
                .prompts
                .build_review_prompt(&review_type.to_string(), &task.description, &files_changed);
            let options = Self::prompt_options(&reviewer);
            let files_changed = files_changed.clone();
            async move {
                let call_start = Instant::now();
                let response = self.agent.execute_prompt(&prompt, &options).await;
                let call_duration = call_start.elapsed().as_millis() as u64;
                match response {
                    Ok(resp) => {
                        let parsed = parse_vote(&resp.text);
                        let vote = ReviewVote {
                            reviewer: reviewer.clone(),
                            review_type,
                            vote: parsed.vote,
                            feedback: resp.text.clone(),
                            duration_ms: call_duration,
                        };
                        let agent_result = AgentResult {
                            model: options.model,
                            prompt,
                            response: resp.text,
                            files_changed,
                            duration_ms: call_duration,
                        };
                        (vote, Some(agent_result))
                    }
                    Err(err) => {
                        let vote = ReviewVote {
                            reviewer: reviewer.clone(),
                            review_type,
                            vote: Vote::RequestChange,
                            feedback: format!("reviewer call failed: {err}"),
                            duration_ms: call_duration,
                        };
                        (vote, None)
                    }
                }
            }
        });

        // Join first, in review-index order, so the aggregation below
        // is independent of which reviewer's future actually finished
        // first on the wall clock (§5's determinism requirement).
        let joined = join_all(calls).await;
        ctx.heartbeat("multi_review:votes-collected").await;

        let mut votes = Vec::with_capacity(joined.len());
        let mut agent_results = Vec::new();
        for (vote, agent_result) in joined {
            votes.push(vote);
            if let Some(agent_result) = agent_result {
                agent_results.push(agent_result);
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let unanimous = check_unanimous_approval(&votes);
        let mut gate = GateResult::new(GateName::MultiReview, unanimous)
            .with_outcome(GateOutcome::Reviews(votes.clone()))
            .with_duration_ms(duration_ms)
            .with_agent_results(agent_results);

        if !unanimous {
            gate = gate.with_error(get_rejection_summary(&votes));
            if let Some(blob) = aggregate_review_feedback(&votes) {
                gate = gate.with_advisory(blob);
            }
        }
        gate
    }

    pub async fn commit(&self, ctx: &dyn ActivityContext, bootstrap: &Bootstrap, message: &str) -> GateResult {
        ctx.heartbeat("commit:start").await;
        let start = Instant::now();
        let result = self.vcs.commit(bootstrap, message).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) => GateResult::new(GateName::Commit, true).with_duration_ms(duration_ms),
            Err(err) => GateResult::new(GateName::Commit, false)
                .with_duration_ms(duration_ms)
                .with_error(err.to_string()),
        }
    }

    /// Not one of the state machine's eight gates: invoked directly by
    /// the workflow/saga layer on a failure path, so it reports a plain
    /// result rather than a `GateResult`.
    pub async fn revert(&self, ctx: &dyn ActivityContext, bootstrap: &Bootstrap) -> anyhow::Result<()> {
        ctx.heartbeat("revert:start").await;
        self.vcs.revert(bootstrap).await
    }
}
