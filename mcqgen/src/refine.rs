//! Iterative quiz refinement.

use mcqgen_model::{Llm, LlmRequest};
use tracing::{debug, error};

use crate::error::{GenerationStep, GeneratorError, Result};
use crate::prompt::PromptTemplates;

/// One model call in a [`RefineChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefineStep {
    /// Draft a quiz with the creation template, `text` bound to the document.
    Initial,
    /// Revise the previous output with the evaluation template, `quiz` bound
    /// to that output.
    Refine,
}

/// A fold over [`RefineStep`]s: one `Initial` call followed by a fixed number
/// of `Refine` calls, each seeing the output of the step before it.
///
/// ```rust
/// use mcqgen::{RefineChain, RefineStep};
///
/// assert_eq!(RefineChain::new(0).steps(), vec![RefineStep::Initial]);
/// assert_eq!(RefineChain::new(2).steps().len(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefineChain {
    extra_passes: usize,
}

impl RefineChain {
    /// A chain with `extra_passes` refine calls after the initial draft.
    pub fn new(extra_passes: usize) -> Self {
        Self { extra_passes }
    }

    /// The calls this chain makes, in order.
    pub fn steps(&self) -> Vec<RefineStep> {
        std::iter::once(RefineStep::Initial)
            .chain(std::iter::repeat_n(RefineStep::Refine, self.extra_passes))
            .collect()
    }

    /// Run the chain over `document` and return the final output.
    ///
    /// `values` fills the remaining placeholders of both templates
    /// (`number`, `subject`, `difficulty`, `response_json`).
    ///
    /// # Errors
    ///
    /// [`GeneratorError::Generation`] at [`GenerationStep::Refine`] when a
    /// template cannot be filled or a model call fails.
    pub async fn run(
        &self,
        llm: &dyn Llm,
        templates: &PromptTemplates,
        document: &str,
        values: &[(&str, &str)],
        temperature: Option<f32>,
    ) -> Result<String> {
        let mut output = String::new();

        for (index, step) in self.steps().into_iter().enumerate() {
            let prompt = match step {
                RefineStep::Initial => fill(templates.creation.format(&with(values, "text", document))),
                RefineStep::Refine => fill(templates.evaluation.format(&with(values, "quiz", &output))),
            }?;

            let mut request = LlmRequest::new(prompt);
            if let Some(temperature) = temperature {
                request = request.with_temperature(temperature);
            }

            let response = llm.generate(request).await.map_err(|e| {
                error!(model = llm.name(), step = index, error = %e, "refine step failed");
                GeneratorError::generation(GenerationStep::Refine, e)
            })?;
            debug!(model = llm.name(), step = index, ?step, output_len = response.text.len(), "refine step done");
            output = response.text;
        }

        Ok(output)
    }
}

fn with<'a>(values: &[(&'a str, &'a str)], key: &'a str, value: &'a str) -> Vec<(&'a str, &'a str)> {
    let mut all = Vec::with_capacity(values.len() + 1);
    all.push((key, value));
    all.extend_from_slice(values);
    all
}

fn fill(prompt: Result<String>) -> Result<String> {
    prompt.map_err(|e| match e {
        GeneratorError::Generation { message, .. } => {
            GeneratorError::Generation { step: GenerationStep::Refine, message }
        }
        other => other,
    })
}
