//! Prompt wording (§4.5a expansion): a pluggable, non-correctness
//! configuration surface. `DefaultPromptBuilder`'s templates are the
//! defaults; callers construct gate activities with a different
//! `Arc<dyn PromptBuilder>` to override wording without touching gate
//! logic.

const GEN_TEST_TEMPLATE: &str = "\
Write exactly one test file for the following task. Do not modify any \
other file.

Task: {description}
Acceptance criteria: {acceptance_criteria}
";

const GEN_IMPL_TEMPLATE: &str = "\
Implement the code needed to satisfy the following task and make its \
tests pass. Do not modify test files.

Task: {description}
Acceptance criteria: {acceptance_criteria}
{prior_failure_section}
";

const FIX_TEMPLATE: &str = "\
The following tests are failing. Make the smallest possible edit to \
the implementation to fix them. Do not modify test files.

Current implementation:
{current_code}

Failure feedback:
{feedback}
";

const REVIEW_TEMPLATE: &str = "\
Review the following change from a {review_type} perspective. Respond \
with exactly one of APPROVE, REQUEST_CHANGE, or REJECT, followed by \
your reasoning.

Task: {description}
Files changed: {files_changed}
";

pub trait PromptBuilder: Send + Sync {
    fn build_gen_test_prompt(&self, description: &str, acceptance_criteria: &str) -> String;

    fn build_gen_impl_prompt(
        &self,
        description: &str,
        acceptance_criteria: &str,
        prior_failure: Option<&str>,
    ) -> String;

    fn build_fix_prompt(&self, current_code: &str, feedback: &str) -> String;

    fn build_review_prompt(&self, review_type: &str, description: &str, files_changed: &[String]) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPromptBuilder;

impl PromptBuilder for DefaultPromptBuilder {
    fn build_gen_test_prompt(&self, description: &str, acceptance_criteria: &str) -> String {
        GEN_TEST_TEMPLATE
            .replace("{description}", description)
            .replace("{acceptance_criteria}", acceptance_criteria)
    }

    fn build_gen_impl_prompt(
        &self,
        description: &str,
        acceptance_criteria: &str,
        prior_failure: Option<&str>,
    ) -> String {
        let prior_failure_section = match prior_failure {
            Some(failure) => format!("\nPrevious attempt's test failures:\n{failure}\n"),
            None => String::new(),
        };
        GEN_IMPL_TEMPLATE
            .replace("{description}", description)
            .replace("{acceptance_criteria}", acceptance_criteria)
            .replace("{prior_failure_section}", &prior_failure_section)
    }

    fn build_fix_prompt(&self, current_code: &str, feedback: &str) -> String {
        FIX_TEMPLATE
            .replace("{current_code}", current_code)
            .replace("{feedback}", feedback)
    }

    fn build_review_prompt(&self, review_type: &str, description: &str, files_changed: &[String]) -> String {
        REVIEW_TEMPLATE
            .replace("{review_type}", review_type)
            .replace("{description}", description)
            .replace("{files_changed}", &files_changed.join(", "))
    }
}
