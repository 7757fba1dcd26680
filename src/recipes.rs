//! Ready-made map-reduce workflows.
//!
//! Two common jobs on long text: summarize it, or answer a question about
//! it. Both are a map pass with one template and a reduce loop with another.
//! The default templates are plain completion-style prompts; pass your own
//! through the `_with` variants.

use crate::template::CHUNK_VAR;
use crate::{MapReduce, Result};

/// Per-chunk summary prompt.
pub const SUMMARY_MAP_TEMPLATE: &str = "Analyze the following text for a detailed summary.\n\n\
    {{{chunk}}}\n\n\
    Provide a detailed summary:";

/// Prompt that merges several summaries.
pub const SUMMARY_REDUCE_TEMPLATE: &str =
    "These are a series of summaries that you are going to summarize:\n\n\
    {{{chunk}}}\n\n\
    Provide a detailed summary in the 3rd party passive voice, removing duplicate information:";

/// Per-chunk answer prompt. `{{{question}}}` is bound before the pass.
pub const QUESTION_MAP_TEMPLATE: &str = "Read the following text:\n\n\
    {{{chunk}}}\n\n\
    Question:\n\n\
    {{{question}}}\n\n\
    Answer:";

/// Prompt that picks the best of several candidate answers.
pub const QUESTION_REDUCE_TEMPLATE: &str = "Question: {{{question}}}\n\
    Possible Answers:\n\
    {{{chunk}}}\n\n\
    Question: {{{question}}}\n\
    Best Answer:";

/// Summarize `text` with the default templates.
///
/// Empty text returns an empty string without calling the generator.
pub async fn summarize(engine: &MapReduce, text: &str) -> Result<String> {
    summarize_with(engine, text, SUMMARY_MAP_TEMPLATE, SUMMARY_REDUCE_TEMPLATE).await
}

/// Summarize `text` with custom map and reduce templates.
pub async fn summarize_with(
    engine: &MapReduce,
    text: &str,
    map_template: &str,
    reduce_template: &str,
) -> Result<String> {
    if text.is_empty() {
        return Ok(String::new());
    }
    let reduction = engine.map_reduce(text, map_template, reduce_template).await?;
    Ok(reduction.into_text())
}

/// Answer `question` from `text` with the default templates.
///
/// Empty text returns an empty string without calling the generator.
pub async fn answer(engine: &MapReduce, text: &str, question: &str) -> Result<String> {
    answer_with(
        engine,
        text,
        question,
        QUESTION_MAP_TEMPLATE,
        QUESTION_REDUCE_TEMPLATE,
    )
    .await
}

/// Answer `question` with custom templates. Both may use `{{{question}}}`.
///
/// The question is bound into the templates before each chunk is rendered, so
/// mustache tags inside the question are rendered too. Unknown names such as
/// `{{name}}` come out empty.
pub async fn answer_with(
    engine: &MapReduce,
    text: &str,
    question: &str,
    map_template: &str,
    reduce_template: &str,
) -> Result<String> {
    if text.is_empty() {
        return Ok(String::new());
    }
    let map_template = bind(engine, map_template, &[("question", question)])?;
    let reduce_template = bind(engine, reduce_template, &[("question", question)])?;

    tracing::info!(question, "answering over {} bytes", text.len());
    let reduction = engine
        .map_reduce(text, &map_template, &reduce_template)
        .await?;
    Ok(reduction.into_text())
}

/// Render everything in `template` except the chunk placeholder.
///
/// The result still contains `{{{chunk}}}` and its token cost includes the
/// bound values, so packing budgets account for them.
fn bind(engine: &MapReduce, template: &str, vars: &[(&str, &str)]) -> Result<String> {
    const KEEP: &str = "{{{chunk}}}";
    let mut all = vars.to_vec();
    all.push((CHUNK_VAR, KEEP));
    engine.renderer().render(template, &all)
}
