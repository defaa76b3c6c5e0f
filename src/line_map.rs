//! Source line translation
//!
//! Every line that gets compiled carries a trailer comment naming the tab and line it came from,
//! e.g. `  ellipse(x, y, 5, 5); // Ball.pde:12`. Scanning those trailers in the generated file
//! gives a two way map between the editor's tabs (sketch space) and the generated file (target
//! space).

use std::collections::HashMap;

use crate::debugger::SourcePosition;
use crate::server::{DebugError, DebugErrorKind};

use regex::Regex;

lazy_static! {
    static ref TRAILER: Regex = Regex::new(r"^.* // (.+):(\d+)\s*$").unwrap();
}

const TRAILER_SEPARATOR: &str = " // ";

/// Add a `file:lineIndex` trailer to every line of `text`
pub fn annotate(file: &str, text: &str) -> String {
    text.split('\n')
        .enumerate()
        .map(|(i, line)| format!("{}{}{}:{}", line, TRAILER_SEPARATOR, file, i))
        .collect::<Vec<String>>()
        .join("\n")
}

/// Remove the last trailer comment from every line of `text`, lines without one are kept as is
pub fn strip_annotations(text: &str) -> String {
    text.split('\n')
        .map(|line| match line.rfind(TRAILER_SEPARATOR) {
            Some(idx) => &line[..idx],
            None => line,
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Bidirectional line mapping for one build
#[derive(Clone, Debug)]
pub struct LineMap {
    generated_file: String,
    sketch_to_target: HashMap<SourcePosition, SourcePosition>,
    target_to_sketch: HashMap<SourcePosition, SourcePosition>,
}

impl LineMap {
    /// Scan the annotated generated source and build the map
    pub fn build(generated_file: &str, generated_source: &str) -> Self {
        let mut sketch_to_target = HashMap::new();
        let mut target_to_sketch = HashMap::new();

        for (i, line) in generated_source.lines().enumerate() {
            let captures = match TRAILER.captures(line) {
                Some(c) => c,
                None => continue,
            };

            let line_index: usize = match captures[2].parse() {
                Ok(l) => l,
                Err(_) => continue,
            };

            let sketch = SourcePosition::new(captures[1].to_string(), line_index);
            let target = SourcePosition::new(generated_file.to_string(), i);

            // A sketch line split over several generated lines maps to its first one
            sketch_to_target
                .entry(sketch.clone())
                .or_insert_with(|| target.clone());
            target_to_sketch.insert(target, sketch);
        }

        LineMap {
            generated_file: generated_file.to_string(),
            sketch_to_target,
            target_to_sketch,
        }
    }

    pub fn generated_file(&self) -> &str {
        &self.generated_file
    }

    pub fn len(&self) -> usize {
        self.target_to_sketch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target_to_sketch.is_empty()
    }

    /// Find the generated line for a line in a tab
    pub fn sketch_to_target(&self, pos: &SourcePosition) -> crate::Result<SourcePosition> {
        match self.sketch_to_target.get(pos) {
            Some(p) => Ok(p.clone()),
            None => Err(not_found(pos)),
        }
    }

    /// Find the tab line a generated line came from
    pub fn target_to_sketch(&self, pos: &SourcePosition) -> crate::Result<SourcePosition> {
        match self.target_to_sketch.get(pos) {
            Some(p) => Ok(p.clone()),
            None => Err(not_found(pos)),
        }
    }

    /// Translate in whichever direction makes sense for `pos`, positions in the generated file
    /// go to sketch space and everything else goes to target space.
    pub fn translate(&self, pos: &SourcePosition) -> crate::Result<SourcePosition> {
        if pos.file() == self.generated_file {
            self.target_to_sketch(pos)
        } else {
            self.sketch_to_target(pos)
        }
    }
}

fn not_found(pos: &SourcePosition) -> DebugError {
    DebugError::new(
        DebugErrorKind::UnresolvedLineError,
        "No line mapping found".to_string(),
        format!("No line mapping found for {}", pos),
    )
}
