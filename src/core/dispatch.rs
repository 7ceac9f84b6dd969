//! Dispatch modes.
//!
//! Maps the editor's selections onto one or more runner invocations and
//! folds the results back:
//!
//! - **SingleReplace** runs once per non-empty selection, concurrently, and
//!   writes each result into its own captured range as soon as it arrives.
//! - **MultiplexReplace** joins every selection with NUL into one invocation
//!   and splits the output back apart, writing all fields in one transaction.
//!
//! Both fall back to a single whole-buffer invocation when nothing is selected.

use futures::stream::{FuturesUnordered, StreamExt};

use super::descriptor::{CommandDescriptor, DispatchMode};
use super::error::{ApplyError, ApplyResult};
use super::runner::{ExecutionResult, ProcessRunner};
use super::selection::{self, classify, transact, Editor, SelectionSet};

/// Separator between fields in multiplexed input and output.
pub const FIELD_SEPARATOR: char = '\0';

/// What an invocation wrote to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The entire buffer, nothing was selected
    WholeBuffer,
    /// One selection, by index
    Selection(usize),
    /// Every selection through one multiplexed invocation
    Multiplexed,
}

/// Outcome of one apply operation.
#[derive(Debug)]
pub struct ApplyReport {
    /// Identifier of the command that ran
    pub identifier: String,

    /// Targets whose result was written
    pub completed: Vec<Target>,

    /// Targets that failed, left untouched in the buffer
    pub failures: Vec<(Target, ApplyError)>,
}

impl ApplyReport {
    fn new(identifier: &str) -> Self {
        Self { identifier: identifier.to_string(), completed: Vec::new(), failures: Vec::new() }
    }

    /// True if nothing failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, target: Target, result: ApplyResult<()>) {
        match result {
            Ok(()) => self.completed.push(target),
            Err(e) => {
                tracing::error!(
                    identifier = %self.identifier,
                    target = ?target,
                    error = %e,
                    "Apply failed"
                );
                self.failures.push((target, e));
            }
        }
    }
}

/// Input for one invocation, captured before anything is spawned.
#[derive(Debug, Clone)]
struct Invocation {
    index: usize,
    input: String,
}

/// Run `descriptor` over the editor's selections, or the whole buffer if
/// none covers text.
pub async fn apply_command<E, R>(
    editor: &mut E,
    descriptor: &CommandDescriptor,
    runner: &R,
) -> ApplyReport
where
    E: Editor + ?Sized,
    R: ProcessRunner + ?Sized,
{
    let mut report = ApplyReport::new(&descriptor.identifier);

    if let DispatchMode::Unknown(mode) = &descriptor.mode {
        let err = ApplyError::UnknownMode {
            identifier: descriptor.identifier.clone(),
            mode: mode.clone(),
        };
        report.record(Target::WholeBuffer, Err(err));
        return report;
    }

    let classification = classify(editor);
    let selections = classification.selections;

    if !classification.has_selection {
        let result = apply_whole_buffer(editor, descriptor, runner).await;
        report.record(Target::WholeBuffer, result);
    } else if descriptor.mode == DispatchMode::MultiplexReplace {
        let result = apply_multiplexed(editor, descriptor, runner, &selections).await;
        report.record(Target::Multiplexed, result);
    } else {
        apply_each(editor, descriptor, runner, &selections, &mut report).await;
    }

    selections.release(editor);
    report
}

/// Run once over the whole buffer and replace it with the output.
async fn apply_whole_buffer<E, R>(
    editor: &mut E,
    descriptor: &CommandDescriptor,
    runner: &R,
) -> ApplyResult<()>
where
    E: Editor + ?Sized,
    R: ProcessRunner + ?Sized,
{
    let text = editor.text();
    let result = runner.run(descriptor, &text).await?;
    transact(editor, |editor| editor.set_text(&result.output));
    Ok(())
}

/// One invocation per non-empty selection, each written back on arrival.
async fn apply_each<E, R>(
    editor: &mut E,
    descriptor: &CommandDescriptor,
    runner: &R,
    selections: &SelectionSet,
    report: &mut ApplyReport,
) where
    E: Editor + ?Sized,
    R: ProcessRunner + ?Sized,
{
    let mut pending: FuturesUnordered<_> = selections
        .non_empty()
        .map(|s| invoke(runner, descriptor, Invocation { index: s.index, input: s.text.clone() }))
        .collect();

    tracing::debug!(
        identifier = %descriptor.identifier,
        invocations = pending.len(),
        "Dispatched per-selection invocations"
    );

    while let Some((index, result)) = pending.next().await {
        let written = match result {
            Ok(output) => {
                if let Some(selection) = selections.get(index) {
                    transact(editor, |editor| {
                        selection::write_selection(editor, selection, &output.output);
                    });
                }
                Ok(())
            }
            Err(e) => Err(e),
        };
        report.record(Target::Selection(index), written);
    }
}

async fn invoke<R>(
    runner: &R,
    descriptor: &CommandDescriptor,
    invocation: Invocation,
) -> (usize, ApplyResult<ExecutionResult>)
where
    R: ProcessRunner + ?Sized,
{
    let result = runner.run(descriptor, &invocation.input).await;
    (invocation.index, result)
}

/// One invocation for all selections, NUL-joined, applied as one transaction.
async fn apply_multiplexed<E, R>(
    editor: &mut E,
    descriptor: &CommandDescriptor,
    runner: &R,
    selections: &SelectionSet,
) -> ApplyResult<()>
where
    E: Editor + ?Sized,
    R: ProcessRunner + ?Sized,
{
    let input = join_fields(selections);
    tracing::debug!(
        identifier = %descriptor.identifier,
        fields = selections.len(),
        "Dispatched multiplexed invocation"
    );

    let result = runner.run(descriptor, &input).await?;
    let fields = split_fields(&result.output);

    if fields.len() != selections.len() {
        return Err(ApplyError::FragmentMismatch {
            identifier: descriptor.identifier.clone(),
            expected: selections.len(),
            actual: fields.len(),
        });
    }

    selection::apply(editor, selections, &fields);
    Ok(())
}

/// Remove every NUL so the separator stays unambiguous.
pub fn sanitize_field(text: &str) -> String {
    text.replace(FIELD_SEPARATOR, "")
}

/// Join selections into one multiplexed input. Empty selections contribute
/// an empty field so indices line up.
pub fn join_fields(selections: &SelectionSet) -> String {
    let fields: Vec<String> = selections
        .iter()
        .map(|s| if s.is_empty() { String::new() } else { sanitize_field(&s.text) })
        .collect();
    fields.join(&FIELD_SEPARATOR.to_string())
}

/// Split multiplexed output back into fields.
pub fn split_fields(output: &str) -> Vec<&str> {
    output.split(FIELD_SEPARATOR).collect()
}
