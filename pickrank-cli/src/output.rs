/// Output formatting: terminal table and JSON.
use pickrank_core::{Estimate, RankingResult, RankingState, Status};
use serde::Serialize;

#[derive(Serialize)]
struct JsonRankedItem<'a> {
    rank: usize,
    name: &'a str,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    state: RankingState,
    items: Vec<JsonRankedItem<'a>>,
    residual: &'a [String],
    comparisons_taken: usize,
    estimated_comparisons: Estimate,
}

pub fn format_estimate(estimate: Estimate) -> String {
    if estimate.min == estimate.max {
        estimate.max.to_string()
    } else {
        format!("{}-{}", estimate.min, estimate.max)
    }
}

/// Render a ranking as table text.
pub fn render_table(result: &RankingResult<String>) -> String {
    let mut out = String::new();

    let name_width = result
        .sorted
        .iter()
        .map(|name| name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    out.push_str(&format!(" # | {:<name_width$}\n", "Item"));
    out.push_str(&format!("---|-{}\n", "-".repeat(name_width)));
    for (i, name) in result.sorted.iter().enumerate() {
        out.push_str(&format!("{:>2} | {name}\n", i + 1));
    }

    if !result.residual.is_empty() {
        out.push_str(&format!("\nNot ranked ({}):\n", result.residual.len()));
        for name in &result.residual {
            out.push_str(&format!("   - {name}\n"));
        }
    }

    out.push_str(&format!(
        "\nTook {} comparisons (estimated {})\n",
        result.comparisons_taken,
        format_estimate(result.estimate),
    ));
    out
}

/// Print results as a formatted terminal table.
pub fn print_table(result: &RankingResult<String>) {
    print!("{}", render_table(result));
}

pub fn render_json(state: RankingState, result: &RankingResult<String>) -> serde_json::Result<String> {
    let items = result
        .sorted
        .iter()
        .enumerate()
        .map(|(i, name)| JsonRankedItem { rank: i + 1, name })
        .collect();

    let output = JsonOutput {
        state,
        items,
        residual: &result.residual,
        comparisons_taken: result.comparisons_taken,
        estimated_comparisons: result.estimate,
    };
    serde_json::to_string_pretty(&output)
}

/// Print results as JSON.
pub fn print_json(state: RankingState, result: &RankingResult<String>) {
    match render_json(state, result) {
        Ok(json) => println!("{json}"),
        Err(e) => crate::bail(format!("Failed to encode output: {e}")),
    }
}

/// One-line progress summary for a session that is not finished.
pub fn render_status(status: &Status<String>) -> String {
    let state = match status.state {
        RankingState::Idle => "idle",
        RankingState::Collecting => "collecting",
        RankingState::Comparing => "comparing",
        RankingState::Sorted => "sorted",
    };
    let mut line = format!("{} items, {state}", status.items);
    if let Some(k) = status.top_k {
        line.push_str(&format!(", top {k}"));
    }
    if status.state == RankingState::Comparing {
        line.push_str(&format!(
            ", {} of ~{} comparisons answered",
            status.comparisons_taken,
            format_estimate(status.estimate),
        ));
    }
    if status.queued > 0 {
        line.push_str(&format!(", {} waiting to be inserted", status.queued));
    }
    line
}
