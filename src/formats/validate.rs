//! Pre-import checks for the `{t, q}` compact dialect.

use serde::Serialize;
use serde_json::Value;

use crate::error::{ImportError, QuestionIssue};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Block the import.
    pub errors: Vec<QuestionIssue>,
    pub warnings: Vec<QuestionIssue>,
    pub info: Vec<String>,
}

impl ValidationReport {
    pub fn is_importable(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, index: usize, message: String) {
        self.errors.push(QuestionIssue::new(index, message));
    }

    fn warning(&mut self, index: usize, message: String) {
        self.warnings.push(QuestionIssue::new(index, message));
    }
}

/// Parses text and validates it as a `{t, q}` payload.
pub fn validate_str(input: &str) -> Result<ValidationReport, ImportError> {
    let value = super::parse_json(input)?;
    if !super::is_compact_longitudinal(&value) {
        return Err(ImportError::SchemaMismatch {
            accepted: vec!["t/q".to_string()],
        });
    }
    Ok(validate_compact(&value))
}

pub fn validate_compact(value: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();
    let empty = Vec::new();
    let entries = value.get("q").and_then(Value::as_array).unwrap_or(&empty);

    let mut valid_questions = 0;
    let mut total_options = 0;

    for (i, entry) in entries.iter().enumerate() {
        let errors_before = report.errors.len();
        check_question(entry, i, &mut report, &mut total_options);
        if report.errors.len() == errors_before {
            valid_questions += 1;
        }
    }

    report
        .info
        .push(format!("{} question(s) checked", entries.len()));
    report
        .info
        .push(format!("{} question(s) ready to import", valid_questions));
    report
        .info
        .push(format!("{} answer option(s) found", total_options));
    report
}

fn check_question(
    entry: &Value,
    i: usize,
    report: &mut ValidationReport,
    total_options: &mut usize,
) {
    match entry.get("x").and_then(Value::as_str) {
        Some(x) if !x.trim().is_empty() => {}
        _ => report.error(i, "missing question text `x`".to_string()),
    }

    match entry.get("dif") {
        None | Some(Value::Null) => report.warning(i, "missing difficulty `dif`".to_string()),
        Some(dif) => {
            if !matches!(dif.as_i64(), Some(1..=3)) {
                report.warning(i, format!("difficulty `dif` should be 1, 2 or 3, got {}", dif));
            }
        }
    }
    if entry.get("qt").map_or(true, Value::is_null) {
        report.warning(i, "missing question type `qt`".to_string());
    }
    if entry.get("id").map_or(true, Value::is_null) {
        report.warning(i, "missing question id `id`".to_string());
    }

    let options = match entry.get("o").and_then(Value::as_array) {
        Some(o) if !o.is_empty() => o,
        _ => {
            report.error(i, "missing or empty option list `o`".to_string());
            return;
        }
    };
    *total_options += options.len();

    let mut correct = 0;
    for (j, option) in options.iter().enumerate() {
        match option.get("text").and_then(Value::as_str) {
            Some(t) if !t.trim().is_empty() => {}
            _ => report.error(i, format!("option {} has no text", j + 1)),
        }
        match option.get("c") {
            Some(Value::Bool(true)) => correct += 1,
            Some(Value::Bool(false)) => {}
            _ => report.error(
                i,
                format!("option {} correctness flag `c` is not a boolean", j + 1),
            ),
        }
    }

    match correct {
        0 => report.error(i, "no option is marked correct".to_string()),
        1 => {}
        n => report.warning(i, format!("{} options are marked correct", n)),
    }
}
