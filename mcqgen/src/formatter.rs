//! Rendering model output as plain-text quizzes.
//!
//! [`format_mcqs`] is total: when the model output cannot be read as a
//! mapping of numbered questions it is passed through unchanged.

use std::fmt;

use serde_json::{Map, Value};
use tracing::warn;

use crate::schema::compare_keys;

/// One question ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedQuestion {
    /// The question's key in the model output, e.g. `"3"`.
    pub key: String,
    pub question: String,
    /// `(letter, text)` pairs in letter order.
    pub options: Vec<(String, String)>,
    /// Letter of the correct option.
    pub correct: String,
}

impl fmt::Display for RenderedQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}\n\n", self.key, self.question)?;
        for (i, (letter, text)) in self.options.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "    {letter}: {text}")?;
        }
        write!(f, "\n\nCorrect: [{}]\n\n", self.correct)
    }
}

/// The formatter's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedQuiz {
    /// Parsed questions in key order.
    Structured(Vec<RenderedQuestion>),
    /// The model output, unchanged, when it could not be parsed.
    Raw(String),
}

impl FormattedQuiz {
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    /// Number of parsed questions; zero for raw output.
    pub fn question_count(&self) -> usize {
        match self {
            Self::Structured(questions) => questions.len(),
            Self::Raw(_) => 0,
        }
    }
}

impl fmt::Display for FormattedQuiz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured(questions) => questions.iter().try_for_each(|q| write!(f, "{q}")),
            Self::Raw(text) => f.write_str(text),
        }
    }
}

/// Render raw model output.
///
/// The output is expected to be a JSON object whose values carry `mcq`,
/// `options` (an object) and `correct`, optionally wrapped in a Markdown
/// code fence. Anything else comes back as [`FormattedQuiz::Raw`] and a
/// warning is logged.
///
/// ```rust
/// use mcqgen::format_mcqs;
///
/// let raw = r#"{"1": {"mcq": "2 + 2?", "options": {"a": "3", "b": "4"}, "correct": "b"}}"#;
/// assert_eq!(
///     format_mcqs(raw).to_string(),
///     "1. 2 + 2?\n\n    a: 3\n    b: 4\n\nCorrect: [b]\n\n"
/// );
/// assert!(!format_mcqs("not json").is_structured());
/// ```
pub fn format_mcqs(raw: &str) -> FormattedQuiz {
    let body = strip_code_fence(raw);
    let parsed = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "model output is not valid JSON, returning it unformatted");
            return FormattedQuiz::Raw(raw.to_string());
        }
    };

    let Value::Object(entries) = parsed else {
        warn!("model output is not a JSON object, returning it unformatted");
        return FormattedQuiz::Raw(raw.to_string());
    };

    match render_entries(&entries) {
        Some(questions) => FormattedQuiz::Structured(questions),
        None => {
            warn!("model output does not match the question shape, returning it unformatted");
            FormattedQuiz::Raw(raw.to_string())
        }
    }
}

fn render_entries(entries: &Map<String, Value>) -> Option<Vec<RenderedQuestion>> {
    let mut keys: Vec<&String> = entries.keys().collect();
    keys.sort_by(|a, b| compare_keys(a, b));

    keys.into_iter()
        .map(|key| {
            let entry = entries.get(key)?.as_object()?;
            let question = text_of(entry.get("mcq")?);
            let correct = text_of(entry.get("correct")?);
            let mut options: Vec<(String, String)> = entry
                .get("options")?
                .as_object()?
                .iter()
                .map(|(letter, text)| (letter.clone(), text_of(text)))
                .collect();
            options.sort_by(|(a, _), (b, _)| a.cmp(b));
            Some(RenderedQuestion { key: key.clone(), question, options, correct })
        })
        .collect()
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Remove a surrounding ```` ``` ```` fence, with or without a language tag.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = after_open.strip_suffix("```") else {
        return trimmed;
    };
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}
