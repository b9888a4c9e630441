use std::io::{self, Write};

use similar::{ChangeTag, TextDiff};
use tabwriter::TabWriter;

use crate::{
    common::util::{quote_if_whitespace, remove_trailing_linebreak},
    server::state::{ClosestMatch, MockSummary},
};

/// The failure message of `MockServer::verify`.
pub(crate) fn verification_failure(
    summaries: &[MockSummary],
    executed: usize,
    closest: Option<(usize, ClosestMatch)>,
) -> String {
    render_verification_failure(summaries, executed, closest)
        .unwrap_or_else(|err| format!("Cannot render verification report: {}", err))
}

/// The failure message of `Mock::assert`.
pub(crate) fn mock_failure(summary: &MockSummary, closest: Option<ClosestMatch>) -> String {
    render_mock_failure(summary, closest)
        .unwrap_or_else(|err| format!("Cannot render verification report: {}", err))
}

fn render_verification_failure(
    summaries: &[MockSummary],
    executed: usize,
    closest: Option<(usize, ClosestMatch)>,
) -> io::Result<String> {
    let unsatisfied = summaries.iter().filter(|s| !s.is_satisfied()).count();

    let mut tw = TabWriter::new(vec![]);
    writeln!(
        tw,
        "Further request(s) expected leaving {} unsatisfied expectation(s).",
        unsatisfied
    )?;
    writeln!(tw, "{} request(s) executed.", executed)?;
    writeln!(tw)?;

    writeln!(tw, "#\tExpected\tActual\tMock")?;
    for summary in summaries {
        writeln!(
            tw,
            "{}\t{}\t{}\t{}{}",
            summary.id + 1,
            summary.expected,
            summary.hits,
            summary.description,
            if summary.is_satisfied() { "" } else { " (unsatisfied)" }
        )?;
    }

    if let Some((mock_id, closest)) = &closest {
        writeln!(tw)?;
        write_closest_match(&mut tw, *mock_id, closest)?;
    }

    into_string(tw)
}

fn render_mock_failure(summary: &MockSummary, closest: Option<ClosestMatch>) -> io::Result<String> {
    let mut tw = TabWriter::new(vec![]);

    writeln!(
        tw,
        "{} request(s) matched mock #{} ({}), expected {}.",
        summary.hits,
        summary.id + 1,
        summary.description,
        summary.expected
    )?;

    match &closest {
        Some(closest) => {
            writeln!(tw)?;
            write_closest_match(&mut tw, summary.id, closest)?;
        }
        None => writeln!(tw, "No unmatched request has been received by the mock server.")?,
    }

    into_string(tw)
}

fn write_closest_match(
    tw: &mut TabWriter<Vec<u8>>,
    mock_id: usize,
    closest: &ClosestMatch,
) -> io::Result<()> {
    writeln!(tw, "{}", "-".repeat(60))?;
    writeln!(
        tw,
        "Closest request to mock #{} (request number {}): {}",
        mock_id + 1,
        closest.request_index + 1,
        closest.request
    )?;
    writeln!(tw, "{}", "-".repeat(60))?;
    writeln!(tw, "{}", closest.mismatch.error)?;

    if let Some((expected, actual)) = &closest.mismatch.diff {
        writeln!(tw)?;
        writeln!(tw, "Expected:\t{}", quote_if_whitespace(expected))?;
        writeln!(tw, "Received:\t{}", quote_if_whitespace(actual))?;
        writeln!(tw)?;
        writeln!(tw, "{}", diff_output(expected, actual))?;
    }

    Ok(())
}

fn diff_output(expected: &str, actual: &str) -> String {
    let diff = TextDiff::from_lines(expected, actual);

    let mut output = String::from("Diff:");
    output.push('\n');

    let lines: Vec<String> = diff
        .iter_all_changes()
        .map(|change| {
            let prefix = match change.tag() {
                ChangeTag::Equal => "   |",
                ChangeTag::Insert => "+++|",
                ChangeTag::Delete => "---|",
            };
            format!(
                "{} {}",
                prefix,
                remove_trailing_linebreak(&change.to_string_lossy())
            )
        })
        .collect();

    if lines.is_empty() {
        output.push_str("<empty>");
    }
    output.push_str(&lines.join("\n"));
    output
}

fn into_string(mut tw: TabWriter<Vec<u8>>) -> io::Result<String> {
    tw.flush()?;
    let bytes = tw
        .into_inner()
        .map_err(|_| io::Error::other("cannot flush report"))?;
    String::from_utf8(bytes).map_err(io::Error::other)
}
