//! Per-gate activities (component E) and their pluggable prompt
//! wording (§4.5a).

pub mod activities;
pub mod prompts;

pub use activities::GateActivities;
pub use prompts::{DefaultPromptBuilder, PromptBuilder};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tcr_collaborators::{
        ActivityContext, AgentClient, AgentResponse, CommandKind, CommandOutput, DisconnectedContext, FileStatus,
        LintRunOutput, Linter, PromptOptions, TestRunOutput, TestRunner, VersionControl,
    };
    use tcr_contracts::{Bootstrap, GateName, Task};

    struct NoopContext;

    #[async_trait]
    impl ActivityContext for NoopContext {
        async fn heartbeat(&self, _detail: &str) {}
        fn disconnected(&self) -> DisconnectedContext {
            DisconnectedContext::new()
        }
    }

    struct MockAgent {
        response_text: String,
    }

    #[async_trait]
    impl AgentClient for MockAgent {
        async fn execute_prompt(&self, _prompt: &str, _options: &PromptOptions) -> anyhow::Result<AgentResponse> {
            Ok(AgentResponse {
                text: self.response_text.clone(),
                tool_results: Vec::new(),
                session_id: "s1".to_string(),
                message_id: "m1".to_string(),
            })
        }

        async fn execute_command(&self, _dir: &str, _kind: CommandKind, _argv: &[String]) -> anyhow::Result<CommandOutput> {
            Ok(CommandOutput { text: String::new() })
        }
    }

    struct MockTestRunner {
        exit_code: i32,
        stdout: String,
    }

    #[async_trait]
    impl TestRunner for MockTestRunner {
        async fn run(&self, _dir: &str, _pattern: &str) -> anyhow::Result<TestRunOutput> {
            Ok(TestRunOutput {
                exit_code: self.exit_code,
                stdout: self.stdout.clone(),
                stderr: String::new(),
            })
        }
    }

    struct MockLinter;

    #[async_trait]
    impl Linter for MockLinter {
        async fn run(&self, _dir: &str) -> anyhow::Result<LintRunOutput> {
            Ok(LintRunOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    struct MockVcs {
        commit_calls: AtomicU32,
    }

    #[async_trait]
    impl VersionControl for MockVcs {
        async fn commit(&self, _bootstrap: &Bootstrap, _message: &str) -> anyhow::Result<()> {
            self.commit_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn revert(&self, _bootstrap: &Bootstrap) -> anyhow::Result<()> {
            Ok(())
        }

        async fn get_file_status(&self, _bootstrap: &Bootstrap) -> anyhow::Result<Vec<FileStatus>> {
            Ok(vec![FileStatus {
                path: "hello.go".to_string(),
            }])
        }
    }

    fn bootstrap() -> Bootstrap {
        Bootstrap {
            cell_id: "c1".to_string(),
            port: 8080,
            worktree_id: "w1".to_string(),
            worktree_path: "/tmp/w1".to_string(),
            base_url: "http://localhost:8080".to_string(),
            server_pid: 1234,
        }
    }

    fn task() -> Task {
        Task::new("T1", "Add Hello()", "Hello() returns \"Hello, World!\"", "main", "C1")
    }

    fn activities(agent_text: &str, exit_code: i32, stdout: &str) -> GateActivities {
        GateActivities::new(
            Arc::new(MockAgent {
                response_text: agent_text.to_string(),
            }),
            Arc::new(MockTestRunner {
                exit_code,
                stdout: stdout.to_string(),
            }),
            Arc::new(MockLinter),
            Arc::new(MockVcs {
                commit_calls: AtomicU32::new(0),
            }),
            Arc::new(DefaultPromptBuilder),
        )
    }

    #[tokio::test]
    async fn gen_test_passes_when_agent_call_succeeds() {
        let activities = activities("wrote hello_test.go", 0, "");
        let result = activities.gen_test(&NoopContext, &bootstrap(), &task()).await;
        assert!(result.passed);
        assert_eq!(result.agent_results.len(), 1);
        assert_eq!(result.agent_results[0].files_changed, vec!["hello.go".to_string()]);
    }

    #[tokio::test]
    async fn verify_red_fails_when_no_test_failures_parsed() {
        let activities = activities("", 0, "PASS\nok  \tpkg\t0.01s\n");
        let result = activities.verify_red(&NoopContext, &bootstrap(), "./...").await;
        assert!(!result.passed);
        assert_eq!(result.error.as_deref(), Some("tests passed but should fail (not RED)"));
    }

    #[tokio::test]
    async fn verify_red_passes_when_tests_fail() {
        let raw = "--- FAIL: TestHello (0.00s)\n    hello_test.go:5: boom\nFAIL\n";
        let activities = activities("", 1, raw);
        let result = activities.verify_red(&NoopContext, &bootstrap(), "./...").await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn verify_green_requires_clean_exit_and_no_failures() {
        let activities = activities("", 0, "PASS\nok  \tpkg\t0.01s\n");
        let result = activities.verify_green(&NoopContext, &bootstrap(), "./...").await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn verify_green_fails_on_nonzero_exit() {
        let raw = "--- FAIL: TestHello (0.00s)\n    hello_test.go:5: boom\nFAIL\n";
        let activities = activities("", 1, raw);
        let result = activities.verify_green(&NoopContext, &bootstrap(), "./...").await;
        assert!(!result.passed);
        assert!(result.error.unwrap().contains("verify_green failed"));
    }

    #[tokio::test]
    async fn multi_review_unanimous_on_all_approve() {
        let activities = activities("Looks good. APPROVE.", 0, "");
        let result = activities.multi_review(&NoopContext, &bootstrap(), &task(), 2).await;
        assert!(result.passed);
        assert!(result.error.is_none());
        assert_eq!(result.reviews().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn multi_review_fails_and_aggregates_on_rejection() {
        let activities = activities("I REJECT this, missing edge cases.", 0, "");
        let result = activities.multi_review(&NoopContext, &bootstrap(), &task(), 2).await;
        assert!(!result.passed);
        assert!(result.error.unwrap().contains("rejected"));
        assert!(result.advisory.is_some());
    }

    #[tokio::test]
    async fn commit_reports_gate_commit_and_calls_vcs_once() {
        let activities = activities("", 0, "");
        let result = activities.commit(&NoopContext, &bootstrap(), "feat: add Hello()").await;
        assert_eq!(result.gate, GateName::Commit);
        assert!(result.passed);
    }
}
