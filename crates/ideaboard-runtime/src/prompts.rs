//! Evaluation prompt for rating providers.
//!
//! One prompt per idea, identical for every provider: the idea itself,
//! the seven-dimension rubric and the JSON output contract the parser
//! expects.

use ideaboard_core::IdeaRecord;

/// Default evaluation prompt.
///
/// `{idea_id}`, `{idea_title}` and `{idea_description}` are substituted;
/// every other brace is literal.
pub const EVALUATION_PROMPT: &str = r#"
You are an expert product evaluator. Please evaluate the following product idea:

IDEA ID: {idea_id}
TITLE: {idea_title}
DESCRIPTION: {idea_description}

Rate this idea on a scale of 1 to 10 (where 10 is the highest) across the following dimensions:

1. Novelty - How original or unique is the idea?
2. Technical Complexity - How challenging is it to implement?
3. Impact Potential - What's the potential benefit or social relevance?
4. Market Viability - How likely is it to succeed commercially?
5. Feasibility - Is it practical to build in the near term?
6. User Desirability - Will users genuinely want or need it?
7. Trend Alignment - Does it align with emerging trends?

For each dimension, provide:
1. A numerical rating (1-10)
2. A brief remark (1-3 lines) explaining your rating

Format your response as a JSON object with the following structure:
{
    "novelty": {"score": <1-10>, "remark": "<your remark>"},
    "technical_complexity": {"score": <1-10>, "remark": "<your remark>"},
    "impact_potential": {"score": <1-10>, "remark": "<your remark>"},
    "market_viability": {"score": <1-10>, "remark": "<your remark>"},
    "feasibility": {"score": <1-10>, "remark": "<your remark>"},
    "user_desirability": {"score": <1-10>, "remark": "<your remark>"},
    "trend_alignment": {"score": <1-10>, "remark": "<your remark>"},
    "overall_impression": "<1-2 sentence summary of your overall impression>"
}

Ensure your response is valid JSON with no additional text before or after.
"#;

const PLACEHOLDERS: [&str; 3] = ["{idea_id}", "{idea_title}", "{idea_description}"];

/// Renders the evaluation prompt for an idea. Pure and total.
#[derive(Debug, Clone)]
pub struct EvaluationPromptBuilder {
    template: String,
}

impl EvaluationPromptBuilder {
    /// Builder with the default template.
    pub fn new() -> Self {
        Self::with_template(EVALUATION_PROMPT)
    }

    /// Builder with a custom template using the same placeholders.
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitute the idea into the template in a single pass, so text
    /// inside the idea is never itself treated as a placeholder.
    pub fn build(&self, idea: &IdeaRecord) -> String {
        let mut prompt = String::with_capacity(
            self.template.len() + idea.title.len() + idea.description.len(),
        );
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find('{') {
            prompt.push_str(&rest[..start]);
            let tail = &rest[start..];

            match PLACEHOLDERS.iter().find(|p| tail.starts_with(**p)) {
                Some(placeholder) => {
                    prompt.push_str(match *placeholder {
                        "{idea_id}" => &idea.id,
                        "{idea_title}" => &idea.title,
                        _ => &idea.description,
                    });
                    rest = &tail[placeholder.len()..];
                }
                None => {
                    prompt.push('{');
                    rest = &tail[1..];
                }
            }
        }

        prompt.push_str(rest);
        prompt
    }
}

impl Default for EvaluationPromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
