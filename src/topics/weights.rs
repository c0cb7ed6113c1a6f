// Topic importance: the column means of the document-topic matrix.
//
// The same numbers are reported per topic and handed to the chart, which
// never sees W, H or the vocabulary.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// One bar of the topic-importance chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartBar {
    pub label: String,
    pub value: f64,
}

/// Mean affinity of each topic across all documents (one value per column of W).
///
/// A matrix with no rows yields zeros rather than NaN.
pub fn aggregate(doc_topic: &Array2<f64>) -> Vec<f64> {
    match doc_topic.mean_axis(Axis(0)) {
        Some(means) => means.to_vec(),
        None => vec![0.0; doc_topic.ncols()],
    }
}

/// Bar-chart series for the aggregate weights, labelled by 1-based topic number.
pub fn chart_series(weights: &[f64]) -> Vec<ChartBar> {
    weights
        .iter()
        .enumerate()
        .map(|(idx, &value)| ChartBar {
            label: format!("Topic {}", idx + 1),
            value,
        })
        .collect()
}
