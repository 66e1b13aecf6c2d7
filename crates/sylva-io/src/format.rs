//! Plain-text rendering of explanations.

use sylva_explain::{Explanation, FeatureImportances, FeatureWeight};

/// Render an explanation as an aligned text table.
///
/// Per target: positive weights strongest first, then counts of hidden
/// features, then negative weights weakest first so the strongest negative
/// ends the block. Names are right-justified to the longest name shown in
/// any target. Feature importances, when present, follow as one
/// `name value` line each with four decimals.
#[must_use]
pub fn format_as_text(explanation: &Explanation) -> String {
    let mut lines: Vec<String> = vec![
        explanation.estimator.clone(),
        format!("Explained as: {}", explanation.method),
    ];
    if let Some(description) = &explanation.description {
        lines.push(description.clone());
    }

    let width = explanation
        .targets
        .iter()
        .flat_map(|t| t.feature_weights.pos.iter().chain(&t.feature_weights.neg))
        .map(|fw| fw.feature.chars().count())
        .max()
        .unwrap_or(0);

    for target in &explanation.targets {
        let fw = &target.feature_weights;
        lines.push(format!(
            "y={} (score {:.3}) top features",
            target.target, target.score
        ));
        lines.push("-".repeat(width + 10));
        for weight in &fw.pos {
            lines.push(weight_line(weight, width));
        }
        if fw.pos_remaining > 0 {
            lines.push(remaining_line(fw.pos_remaining, "positive", width));
        }
        if fw.neg_remaining > 0 {
            lines.push(remaining_line(fw.neg_remaining, "negative", width));
        }
        for weight in fw.neg.iter().rev() {
            lines.push(weight_line(weight, width));
        }
        lines.push(String::new());
    }

    if let Some(importances) = &explanation.feature_importances {
        push_importances(&mut lines, importances);
    }

    lines.join("\n")
}

fn push_importances(lines: &mut Vec<String>, importances: &FeatureImportances) {
    let width = importances
        .importances
        .iter()
        .map(|fw| fw.feature.chars().count())
        .max()
        .unwrap_or(0);
    for fw in &importances.importances {
        lines.push(format!("{:>width$} {:.4}", fw.feature, fw.weight));
    }
    if importances.remaining > 0 {
        lines.push(format!(
            "{:>width$}   ({} more features)",
            "...", importances.remaining
        ));
    }
}

fn weight_line(weight: &FeatureWeight, width: usize) -> String {
    format!("{:>width$} {:+8.3}", weight.feature, weight.weight)
}

fn remaining_line(count: usize, sign: &str, width: usize) -> String {
    format!("{:>width$}   ({count} more {sign} features)", "...")
}
