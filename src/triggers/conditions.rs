// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Trigger condition evaluator.
//!
//! Pure functions for evaluating condition trees against event data. Missing
//! fields, non-numeric thresholds, and regex errors all evaluate to false;
//! the evaluator never fails.

use regex::RegexBuilder;
use serde_json::Value;

use super::types::{Condition, MatchMode, ThresholdOp, MAX_NESTING_DEPTH};

/// Resolve a dot-separated path into nested object data.
///
/// `resolve_field(&data, "message.text")` walks `data["message"]["text"]`;
/// any missing step yields `None`.
pub fn resolve_field<'a>(data: &'a Value, dot_path: &str) -> Option<&'a Value> {
    let mut current = data;
    for part in dot_path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Evaluate a condition against event data.
///
/// Returns true if the condition matches. Trees deeper than
/// [`MAX_NESTING_DEPTH`] evaluate to false.
pub fn evaluate(condition: &Condition, data: &Value) -> bool {
    evaluate_at(condition, data, 0)
}

fn evaluate_at(condition: &Condition, data: &Value, depth: usize) -> bool {
    if depth > MAX_NESTING_DEPTH {
        return false;
    }

    match condition {
        Condition::Regex {
            field,
            pattern,
            flags,
        } => eval_regex(data, field, pattern, flags.as_deref()),
        Condition::Keyword {
            field,
            keywords,
            match_mode,
        } => eval_keyword(data, field, keywords, match_mode.unwrap_or(MatchMode::Any)),
        Condition::Threshold {
            field,
            operator,
            value,
        } => eval_threshold(data, field, *operator, *value),
        Condition::And { conditions } => {
            !conditions.is_empty()
                && conditions.iter().all(|c| evaluate_at(c, data, depth + 1))
        }
        Condition::Or { conditions } => {
            conditions.iter().any(|c| evaluate_at(c, data, depth + 1))
        }
        Condition::Not { conditions } => match conditions.first() {
            Some(first) => !evaluate_at(first, data, depth + 1),
            None => false,
        },
    }
}

fn eval_regex(data: &Value, field: &str, pattern: &str, flags: Option<&str>) -> bool {
    let Some(value) = resolve_field(data, field) else {
        return false;
    };
    let text = value_to_text(value);

    let flags = flags.unwrap_or("");
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build();

    match regex {
        Ok(re) => re.is_match(&text),
        Err(_) => false,
    }
}

fn eval_keyword(data: &Value, field: &str, keywords: &[String], mode: MatchMode) -> bool {
    if keywords.is_empty() {
        return false;
    }
    let Some(value) = resolve_field(data, field) else {
        return false;
    };
    let text = value_to_text(value).to_lowercase();

    match mode {
        MatchMode::All => keywords.iter().all(|kw| text.contains(&kw.to_lowercase())),
        MatchMode::Any => keywords.iter().any(|kw| text.contains(&kw.to_lowercase())),
    }
}

fn eval_threshold(data: &Value, field: &str, operator: ThresholdOp, threshold: f64) -> bool {
    let Some(value) = resolve_field(data, field) else {
        return false;
    };
    let Some(num) = value_to_number(value) else {
        return false;
    };

    match operator {
        ThresholdOp::Gt => num > threshold,
        ThresholdOp::Lt => num < threshold,
        ThresholdOp::Eq => num == threshold,
        ThresholdOp::Gte => num >= threshold,
        ThresholdOp::Lte => num <= threshold,
        ThresholdOp::Neq => num != threshold,
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}
