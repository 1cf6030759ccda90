//! Epoch loop, step-decay schedule, and the top-level training driver.
use crate::data::{TestSplit, TrainSplit};
use crate::metrics::evaluate;
use crate::network::Perceptron;
use crate::utils::print_summary_table;
use anyhow::{anyhow, Result};
use ndarray::s;

/// Training configuration, threaded explicitly through the driver.
/// The binary overrides epochs, mu, and batch size.
#[derive(Debug, Clone, Copy)]
pub struct TrainConfig {
    pub epochs: usize,
    /// Learning rate; scaled by 0.2 every 60 epochs.
    pub mu: f32,
    pub batch_size: usize,
    /// Evaluation batch size, independent of the training batch size.
    pub eval_batch_size: usize,
    /// Weight-decay coefficient.
    pub wd: f32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 1000,
            mu: 0.0005,
            batch_size: 100,
            eval_batch_size: 500,
            wd: 0.01,
        }
    }
}

/// One full pass over the training split in fixed contiguous batches.
/// The `n % batch_size` tail rows are not trained on. Returns the mean
/// of the batch losses.
pub fn train_epoch(
    model: &mut Perceptron,
    split: &TrainSplit,
    mu: f32,
    batch_size: usize,
    wd: f32,
) -> Result<f32> {
    let n = split.features.nrows();
    if batch_size == 0 || batch_size > n {
        return Err(anyhow!(
            "Batch size {} is invalid for a split of {} rows",
            batch_size,
            n
        ));
    }
    let nsteps = n / batch_size;
    let mut losses = Vec::with_capacity(nsteps);
    for step in 0..nsteps {
        let start = step * batch_size;
        let end = start + batch_size;
        let x = split.features.slice(s![start..end, ..]);
        let y = split.targets.slice(s![start..end, ..]);
        losses.push(model.train_batch(x, y, mu, wd)?);
    }
    Ok(losses.iter().sum::<f32>() / nsteps as f32)
}

/// Train for `cfg.epochs` epochs, evaluating both splits and printing a
/// progress line after each one. Zero epochs is a valid no-op.
pub fn train(
    model: &mut Perceptron,
    train_split: &TrainSplit,
    test_split: &TestSplit,
    cfg: &TrainConfig,
) -> Result<()> {
    if train_split.features.nrows() == 0 {
        return Err(anyhow!("Training split is empty"));
    }
    if train_split.features.ncols() != model.input_size() {
        return Err(anyhow!(
            "Training split has {} features, model expects {}",
            train_split.features.ncols(),
            model.input_size()
        ));
    }
    if train_split.targets.dim() != (train_split.features.nrows(), model.output_size()) {
        return Err(anyhow!(
            "Target shape {:?} does not match split/model",
            train_split.targets.dim()
        ));
    }

    let mut mu = cfg.mu;
    let mut epoch_losses = Vec::with_capacity(cfg.epochs);
    for epoch in 0..cfg.epochs {
        if (epoch + 1) % 60 == 0 {
            mu *= 0.2;
        }
        let train_loss = train_epoch(model, train_split, mu, cfg.batch_size, cfg.wd)?;
        epoch_losses.push(train_loss);

        let (accuracy_test, loss_test) = evaluate(
            &test_split.features,
            &test_split.labels,
            model,
            cfg.eval_batch_size,
        )?;
        let (accuracy_train, loss_train) = evaluate(
            &train_split.features,
            &train_split.labels,
            model,
            cfg.eval_batch_size,
        )?;
        println!(
            "Epoch {}: accuracy_test = {:.4}, loss_test = {:.4}, accuracy_train = {:.4}, loss_train = {:.4}, loss during training = {:.4}",
            epoch + 1,
            accuracy_test,
            loss_test,
            accuracy_train,
            loss_train,
            train_loss
        );
    }
    print_summary_table(&epoch_losses, "Training Loss");
    Ok(())
}
