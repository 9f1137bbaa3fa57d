//! Prompt templates with `{name}` placeholders.

use std::collections::BTreeSet;

use crate::error::{GenerationStep, GeneratorError, Result};

/// Quiz creation prompt. Placeholders: `text`, `number`, `subject`,
/// `difficulty`, `response_json`.
pub const QUIZ_CREATION: &str = "
Text: {text}
You are an expert MCQ maker. Given the above text, it is your job to \
create a quiz of {number} multiple choice questions for {subject} students at a {difficulty} difficulty level.
Make sure the questions are not repeated and check that every question conforms to the text.
Format your response like RESPONSE_JSON below and use it as a guide. \
Make sure to create {number} MCQs.
### RESPONSE_JSON
{response_json}
";

/// Quiz evaluation prompt used by refine passes. Placeholders: `subject`,
/// `difficulty`, `quiz`.
pub const QUIZ_EVALUATION: &str = "
You are an expert English grammarian and writer. Given a multiple choice quiz for {subject} students \
at a {difficulty} difficulty level, evaluate the complexity of the questions and give a complete analysis of the quiz. \
Use at most 50 words for the analysis.
If the quiz does not suit the cognitive and analytical abilities of the students, \
update the questions and adjust the difficulty so that it matches their level.
Quiz_MCQs:
{quiz}

Review of the above quiz by an expert English writer:
";

/// A text template whose `{name}` placeholders are filled in one pass.
///
/// A placeholder is `{` followed by one or more ASCII letters, digits or
/// underscores and `}`. Any other brace is literal text, and substituted
/// values are never rescanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }

    /// The raw template text.
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Placeholder names, sorted and deduplicated.
    pub fn variables(&self) -> BTreeSet<&str> {
        self.segments()
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Variable(name) => Some(name),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Substitute every placeholder with its value from `values`.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::Generation`] at the prompt step when a placeholder
    /// has no value. Extra values are ignored.
    pub fn format(&self, values: &[(&str, &str)]) -> Result<String> {
        let mut out = String::with_capacity(self.template.len());
        for segment in self.segments() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => {
                    let value = values
                        .iter()
                        .find_map(|(key, value)| (*key == name).then_some(*value))
                        .ok_or_else(|| {
                            GeneratorError::generation(
                                GenerationStep::Prompt,
                                format!("no value for placeholder {{{name}}}"),
                            )
                        })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    fn segments(&self) -> Vec<Segment<'_>> {
        let text = self.template.as_str();
        let mut segments = Vec::new();
        let mut literal_start = 0;
        let mut search_from = 0;

        while let Some(offset) = text[search_from..].find('{') {
            let open = search_from + offset;
            let rest = &text[open + 1..];
            let name_len = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());

            if name_len > 0 && rest[name_len..].starts_with('}') {
                if open > literal_start {
                    segments.push(Segment::Literal(&text[literal_start..open]));
                }
                segments.push(Segment::Variable(&rest[..name_len]));
                literal_start = open + name_len + 2;
                search_from = literal_start;
            } else {
                search_from = open + 1;
            }
        }

        if literal_start < text.len() {
            segments.push(Segment::Literal(&text[literal_start..]));
        }
        segments
    }
}

enum Segment<'a> {
    Literal(&'a str),
    Variable(&'a str),
}

/// The two templates the generator uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    /// Fills the retrieved text and quiz parameters.
    pub creation: PromptTemplate,
    /// Critiques and revises a quiz during refine passes.
    pub evaluation: PromptTemplate,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            creation: PromptTemplate::new(QUIZ_CREATION),
            evaluation: PromptTemplate::new(QUIZ_EVALUATION),
        }
    }
}
