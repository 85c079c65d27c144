//! Prompt templates for the summary, observation and rule calls

use crate::learning::ClassifierRequest;
use crate::types::Rule;

pub const SUMMARY_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that summarizes documents according to user preferences.";

/// Bullet-joined rule list, as embedded in the prompts
fn rule_list(rules: &[Rule]) -> String {
    rules.join("\n - ")
}

pub fn summary_prompt(rules: &[Rule], source_document: &str) -> String {
    format!(
        r#"
Please summarize the following document in exactly 3-4 concise sentences.
Always include the identifying details of the subject in your summary.
Ensure your summary is useful for a fast-moving, busy reader.

<rules>{}</rules>
<document>{}</document>

ALWAYS follow the rules/preferences flawlessly when generating the summary.

3-4 sentences summary:
"#,
        rule_list(rules),
        source_document
    )
}

pub fn rule_prompt(observation: &str, existing_rules: &[Rule]) -> String {
    format!(
        r#"
We are learning a user's preferences for summarizing text.
Rewrite the following observation, which the user has established as a preference, into an imperative rule that can be used to instruct future LLM summarizations.
If a very similar rule already exists, you should output the existing rule perfectly, word-for-word.

<observation>{}</observation>
<existing_rules>
{}
</existing_rules>

Do not include any other text or commentary in your response.
Rule:"#,
        observation,
        rule_list(existing_rules)
    )
}

pub fn observations_prompt(request: &ClassifierRequest) -> String {
    format!(
        r#"
As an expert system, analyze user feedback to uncover specific user preferences for text summarization.
Focus on the user's feedback, including summary modifications and direct preferences, in the context of their existing observations.
Identify the user's unique preferences, even if unconventional, such as specific styles, formats, or abbreviations.
- For existing themes, use the exact canonical observation string from the <prior_observations_log> and increment the count by 1.
- If no new observations are identified, return the <prior_observations_log> unchanged.
- NEVER increment the count of an observation by more than 1. ONLY increment the count if the observation is semantically the same as the existing observation.

Call the {} tool ONCE with the unified list of observations.

<prior_observations_log>
{}
</prior_observations_log>
<summary_before_important_user_edits>
{}
</summary_before_important_user_edits>
<summary_after_important_user_edits>
{}
</summary_after_important_user_edits>
<new_user_modifications>
{}
</new_user_modifications>
<new_user_direct_preference>
{}
</new_user_direct_preference>"#,
        SUBMIT_OBSERVATIONS_TOOL,
        request.observations_log(),
        request.reference_summary,
        request.working_summary,
        request.diff_rendering,
        request.direct_preference.as_deref().unwrap_or("")
    )
}

pub const SUBMIT_OBSERVATIONS_TOOL: &str = "submit_observations";
