//! Checkpoint logs produced by the probe suites.

use serde::Serialize;
use std::fmt;

/// One labelled result inside a section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Checkpoint {
    pub label: String,
    pub outcome: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub checkpoints: Vec<Checkpoint>,
}

/// Ordered sections of checkpoints, rendered as text or JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CheckpointLog {
    pub sections: Vec<Section>,
}

impl CheckpointLog {
    /// Starts a new section; later checkpoints land in it.
    pub fn next(&mut self, title: impl Into<String>) {
        self.sections.push(Section {
            title: title.into(),
            checkpoints: Vec::new(),
        });
    }

    /// Records a checkpoint in the current section, opening an untitled one if needed.
    pub fn record(&mut self, label: impl Into<String>, outcome: impl Into<String>) {
        if self.sections.is_empty() {
            self.next("");
        }
        if let Some(section) = self.sections.last_mut() {
            section.checkpoints.push(Checkpoint {
                label: label.into(),
                outcome: outcome.into(),
            });
        }
    }

    pub fn len(&self) -> usize {
        self.sections.iter().map(|s| s.checkpoints.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `[title]` per section, then `  label: outcome` per checkpoint.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&format!("[{}]\n", section.title));
            for checkpoint in &section.checkpoints {
                out.push_str(&format!("  {}: {}\n", checkpoint.label, checkpoint.outcome));
            }
        }
        out
    }

    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// `Success`, or the failing code as eight hex digits.
pub fn status(code: i32) -> String {
    if code >= 0 {
        "Success".to_owned()
    } else {
        format!("Failed ({:08x})", code as u32)
    }
}

/// A 64-bit result as sixteen hex digits, negative values sign-extended.
pub fn hex64(value: i64) -> String {
    format!("{:016x}", value as u64)
}

/// A line where rendered output and a golden file disagree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    /// One-based line number.
    pub line: usize,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |side: &Option<String>| side.as_deref().unwrap_or("<missing>").to_owned();
        write!(
            f,
            "line {}: expected {:?}, got {:?}",
            self.line,
            show(&self.expected),
            show(&self.actual)
        )
    }
}

/// Compares two renderings line by line. Trailing newlines are ignored.
pub fn compare(actual: &str, expected: &str) -> Vec<Mismatch> {
    let actual: Vec<&str> = actual.lines().collect();
    let expected: Vec<&str> = expected.lines().collect();
    (0..actual.len().max(expected.len()))
        .filter_map(|idx| {
            let a = actual.get(idx).copied();
            let e = expected.get(idx).copied();
            (a != e).then(|| Mismatch {
                line: idx + 1,
                expected: e.map(str::to_owned),
                actual: a.map(str::to_owned),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn sample() -> CheckpointLog {
        let mut log = CheckpointLog::default();
        log.next("Slash usage");
        log.record("Doubled slashes at device", status(3));
        log.record("Backslash after bad dir", status(0x8001_0002_u32 as i32));
        log.next("sceIoLseek - offsets");
        log.record("+Negative", hex64(-1));
        log.record("End +1", hex64(0x178));
        log
    }

    #[test]
    fn text_render_matches_expectation() {
        assert_snapshot!(sample().render_text(), @r"
        [Slash usage]
          Doubled slashes at device: Success
          Backslash after bad dir: Failed (80010002)
        [sceIoLseek - offsets]
          +Negative: ffffffffffffffff
          End +1: 0000000000000178
        ");
    }

    #[test]
    fn json_render_matches_expectation() {
        let mut log = CheckpointLog::default();
        log.next("Trailing spaces");
        log.record("Trailing space", "Success");
        assert_snapshot!(log.render_json().expect("json"), @r#"
        {
          "sections": [
            {
              "title": "Trailing spaces",
              "checkpoints": [
                {
                  "label": "Trailing space",
                  "outcome": "Success"
                }
              ]
            }
          ]
        }
        "#);
    }

    #[test]
    fn record_without_section_opens_one() {
        let mut log = CheckpointLog::default();
        log.record("orphan", "Success");
        assert_eq!(log.render_text(), "[]\n  orphan: Success\n");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn compare_reports_each_differing_line() {
        let mismatches = compare("[a]\n  x: Success\n", "[a]\n  x: Failed (80010002)\n  y: Success\n");
        assert_eq!(mismatches.len(), 2);
        assert_eq!(mismatches[0].line, 2);
        assert_eq!(mismatches[1].actual, None);
        assert_eq!(
            mismatches[1].to_string(),
            "line 3: expected \"  y: Success\", got \"<missing>\""
        );
        assert!(compare("[a]\n", "[a]").is_empty());
    }
}
