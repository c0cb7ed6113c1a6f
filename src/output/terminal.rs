// Colored terminal output for topic reports.
//
// Topics are listed with their title, keywords and mean weight, followed by
// a horizontal bar chart of the weights scaled to the heaviest topic.

use colored::Colorize;

use crate::pipeline::TopicReport;
use crate::topics::weights::ChartBar;

const BAR_WIDTH: usize = 30;

/// Display a topic report in the terminal.
pub fn display_report(report: &TopicReport) {
    println!(
        "\n{}",
        format!(
            "=== Topics ({} model, {} documents, {} terms) ===",
            report.model_type.to_string().to_uppercase(),
            report.document_count,
            report.vocabulary_size
        )
        .bold()
    );
    println!();

    for topic in report.topics.values() {
        println!("  {} {}", format!("Topic {}", topic.index + 1).bold(), topic.title);
        println!("      Keywords: {}", topic.words.join(", ").dimmed());
        println!("      Mean weight: {:.3}", topic.weight);
        println!();
    }

    display_chart(&report.chart);
}

/// Horizontal bar chart of topic weights.
pub fn display_chart(bars: &[ChartBar]) {
    if bars.is_empty() {
        return;
    }

    println!("{}", "Mean importance per topic".bold());
    for line in chart_lines(bars) {
        println!("  {line}");
    }
}

/// Plain-text chart rows, one per bar, scaled so the largest value fills
/// the full width.
pub fn chart_lines(bars: &[ChartBar]) -> Vec<String> {
    let max = bars.iter().map(|b| b.value).fold(0.0_f64, f64::max);
    let label_width = bars.iter().map(|b| b.label.chars().count()).max().unwrap_or(0);

    bars.iter()
        .map(|bar| {
            let filled = if max > 0.0 {
                ((bar.value / max) * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            let empty = BAR_WIDTH.saturating_sub(filled);
            format!(
                "{:<width$} [{}{}] {:.3}",
                bar.label,
                "=".repeat(filled),
                " ".repeat(empty),
                bar.value,
                width = label_width
            )
        })
        .collect()
}
