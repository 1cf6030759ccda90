//! Evaluation: batched inference, accuracy, and mean loss.
use crate::loss;
use crate::network::Perceptron;
use anyhow::{anyhow, Result};
use ndarray::{s, Array1, Array2, ArrayView1};

/// Index of the largest value; the first one wins on ties.
pub fn argmax(row: ArrayView1<f32>) -> usize {
    row.iter()
        .enumerate()
        .fold(0usize, |best, (i, &v)| if v > row[best] { i } else { best })
}

/// Run batched inference over a split and accumulate accuracy and
/// cross-entropy. Returns `(accuracy fraction, mean of batch losses)`.
///
/// Takes the model by shared reference; evaluation never mutates
/// parameters. The final batch may be shorter than `batch_size`.
pub fn evaluate(
    features: &Array2<f32>,
    labels: &Array1<u8>,
    model: &Perceptron,
    batch_size: usize,
) -> Result<(f32, f32)> {
    let total = features.nrows();
    if total == 0 {
        return Err(anyhow!("Empty evaluation split"));
    }
    if labels.len() != total {
        return Err(anyhow!(
            "Split has {} rows but {} labels",
            total,
            labels.len()
        ));
    }
    if features.ncols() != model.input_size() {
        return Err(anyhow!(
            "Split has {} features, model expects {}",
            features.ncols(),
            model.input_size()
        ));
    }
    if batch_size == 0 {
        return Err(anyhow!("Batch size must be positive"));
    }

    let mut correct = 0usize;
    let mut batch_losses = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + batch_size).min(total);
        let x = features.slice(s![start..end, ..]);
        let y = labels.slice(s![start..end]);
        let fwd = model.forward(x);
        batch_losses.push(loss::cross_entropy_labels(fwd.y_hat.view(), y)?);
        for (row, &label) in fwd.y_hat.rows().into_iter().zip(y.iter()) {
            if argmax(row) == label as usize {
                correct += 1;
            }
        }
        start = end;
    }
    let mean_loss = batch_losses.iter().sum::<f32>() / batch_losses.len() as f32;
    Ok((correct as f32 / total as f32, mean_loss))
}
