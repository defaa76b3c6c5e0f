//! Breakpoint persistence
//!
//! Breakpoints are saved with the source as a marker comment at the end of their line. They're
//! stripped out again when the file is opened, leaving the positions to recreate them from.

use crate::debugger::SourcePosition;

pub const BREAKPOINT_MARKER: &str = " //<>//";

fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Remove every breakpoint marker from `text`, returning the clean text and the positions of
/// the lines that were marked. Line endings are normalised to `\n`.
pub fn strip_breakpoint_markers(file: &str, text: &str) -> (String, Vec<SourcePosition>) {
    let mut positions = vec![];

    let lines: Vec<&str> = split_lines(text)
        .into_iter()
        .enumerate()
        .map(|(i, line)| match line.strip_suffix(BREAKPOINT_MARKER) {
            Some(stripped) => {
                positions.push(SourcePosition::new(file.to_string(), i));
                stripped
            }
            None => line,
        })
        .collect();

    (lines.join("\n"), positions)
}

/// Add a breakpoint marker to every line index given, indices past the end are ignored
pub fn add_breakpoint_markers(text: &str, line_indices: &[usize]) -> String {
    let mut lines: Vec<String> = split_lines(text).into_iter().map(String::from).collect();

    for &i in line_indices {
        if let Some(line) = lines.get_mut(i) {
            if !line.ends_with(BREAKPOINT_MARKER) {
                line.push_str(BREAKPOINT_MARKER);
            }
        }
    }

    lines.join("\n")
}
