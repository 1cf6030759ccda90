//! Loss functions operating on batched softmax outputs.
use anyhow::{anyhow, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};

const EPS: f32 = 1e-7;

fn clamp_prob(p: f32) -> f32 {
    if !p.is_finite() || p < EPS {
        EPS
    } else if p > 1.0 - EPS {
        1.0 - EPS
    } else {
        p
    }
}

/// Cross-entropy against one-hot targets, averaged over the batch.
///
/// `pred` rows are expected to be probability distributions (softmax output).
pub fn cross_entropy(pred: ArrayView2<f32>, target: ArrayView2<f32>) -> Result<f32> {
    if pred.dim() != target.dim() {
        return Err(anyhow!(
            "Prediction shape {:?} does not match target shape {:?}",
            pred.dim(),
            target.dim()
        ));
    }
    let batch = pred.nrows();
    if batch == 0 {
        return Err(anyhow!("Empty batch"));
    }
    let mut total = 0.0;
    for (&p, &t) in pred.iter().zip(target.iter()) {
        total -= t * clamp_prob(p).ln();
    }
    Ok(total / batch as f32)
}

/// Cross-entropy against integer class labels, averaged over the batch.
pub fn cross_entropy_labels(pred: ArrayView2<f32>, labels: ArrayView1<u8>) -> Result<f32> {
    if pred.nrows() != labels.len() {
        return Err(anyhow!(
            "Batch size mismatch: {} predictions vs {} labels",
            pred.nrows(),
            labels.len()
        ));
    }
    if pred.nrows() == 0 {
        return Err(anyhow!("Empty batch"));
    }
    let mut total = 0.0;
    for (row, &label) in pred.rows().into_iter().zip(labels.iter()) {
        let label = label as usize;
        if label >= row.len() {
            return Err(anyhow!("Label {} out of range for {} classes", label, row.len()));
        }
        total -= clamp_prob(row[label]).ln();
    }
    Ok(total / pred.nrows() as f32)
}

/// Sum of squared weights, the L2 penalty term reported alongside the loss.
pub fn l2(w: &Array2<f32>) -> f32 {
    w.iter().map(|&v| v * v).sum()
}
