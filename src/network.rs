//! Two-layer perceptron with a hand-written forward and backward pass.
//!
//! The backward pass is written out term for term. The output "error" is
//! the residual `y_true - y_hat`, not the exact softmax cross-entropy
//! gradient, and the weight term is the outer product of the batch column
//! sums with the batch-mean error. Both are deliberate; substituting the
//! textbook forms changes the trained model.
use crate::loss;
use anyhow::{anyhow, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use ndarray_rand::rand_distr::{Normal, Uniform};
use ndarray_rand::RandomExt;
use rand::Rng;

/// Model parameters: two weight matrices and two bias vectors, mutated in
/// place by every training batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Perceptron {
    /// (input, hidden)
    pub w0: Array2<f32>,
    /// (hidden,)
    pub b0: Array1<f32>,
    /// (hidden, output)
    pub w1: Array2<f32>,
    /// (output,)
    pub b1: Array1<f32>,
}

/// Intermediate tensors of one forward pass; all four are needed by the
/// backward pass.
#[derive(Debug, Clone)]
pub struct Forward {
    /// Hidden pre-activation, (batch, hidden).
    pub z_h: Array2<f32>,
    /// Standardized ReLU activation, (batch, hidden).
    pub y_h_hat: Array2<f32>,
    /// Output pre-activation, (batch, output).
    pub z: Array2<f32>,
    /// Softmax output, (batch, output).
    pub y_hat: Array2<f32>,
}

impl Perceptron {
    /// Initialize with variance-scaled Normal weights and Uniform[0,1)
    /// biases, using the thread-local RNG.
    pub fn new(input_size: usize, hidden_size: usize, output_size: usize) -> Self {
        Self::with_rng(input_size, hidden_size, output_size, &mut rand::thread_rng())
    }

    /// Initialize from a caller-provided RNG (seeded in tests).
    pub fn with_rng<R: Rng>(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        rng: &mut R,
    ) -> Self {
        let stddev0 = (2.0 / (input_size + hidden_size) as f32).sqrt();
        let stddev1 = (2.0 / (hidden_size + output_size) as f32).sqrt();
        let normal0 = Normal::new(0.0, stddev0).expect("stddev is positive");
        let normal1 = Normal::new(0.0, stddev1).expect("stddev is positive");
        let uniform = Uniform::new(0.0f32, 1.0);
        Self {
            w0: Array2::random_using((input_size, hidden_size), normal0, rng),
            b0: Array1::random_using(hidden_size, uniform, rng),
            w1: Array2::random_using((hidden_size, output_size), normal1, rng),
            b1: Array1::random_using(output_size, uniform, rng),
        }
    }

    /// All-zero parameters, for tests and worked examples.
    pub fn zeros(input_size: usize, hidden_size: usize, output_size: usize) -> Self {
        Self {
            w0: Array2::zeros((input_size, hidden_size)),
            b0: Array1::zeros(hidden_size),
            w1: Array2::zeros((hidden_size, output_size)),
            b1: Array1::zeros(output_size),
        }
    }

    pub fn input_size(&self) -> usize {
        self.w0.nrows()
    }

    pub fn hidden_size(&self) -> usize {
        self.w0.ncols()
    }

    pub fn output_size(&self) -> usize {
        self.w1.ncols()
    }

    /// Forward pass for a batch of flattened inputs.
    ///
    /// The ReLU activations are re-centered by the scalar mean and unbiased
    /// std of the whole activation batch on every call. This is not a
    /// learned batch norm; no running statistics exist.
    pub fn forward(&self, x: ArrayView2<f32>) -> Forward {
        let z_h = x.dot(&self.w0) + &self.b0;
        let mut y_h_hat = z_h.mapv(|v| v.max(0.0));
        let (std, mean) = std_mean(&y_h_hat);
        y_h_hat -= mean;
        if std > f32::EPSILON {
            y_h_hat /= std;
        }
        let z = y_h_hat.dot(&self.w1) + &self.b1;
        let y_hat = softmax_rows(&z);
        Forward { z_h, y_h_hat, z, y_hat }
    }

    /// One gradient-descent update on a batch, in place. Returns the batch
    /// loss: cross-entropy plus `wd * sum(w1^2)` (the reported penalty uses
    /// only `w1` while decay applies to both matrices; the asymmetry is
    /// intentional).
    pub fn train_batch(
        &mut self,
        x: ArrayView2<f32>,
        y_true: ArrayView2<f32>,
        mu: f32,
        wd: f32,
    ) -> Result<f32> {
        if x.ncols() != self.input_size() {
            return Err(anyhow!(
                "Input has {} columns, model expects {}",
                x.ncols(),
                self.input_size()
            ));
        }
        if y_true.dim() != (x.nrows(), self.output_size()) {
            return Err(anyhow!(
                "Target shape {:?} does not match ({}, {})",
                y_true.dim(),
                x.nrows(),
                self.output_size()
            ));
        }
        if x.nrows() == 0 {
            return Err(anyhow!("Empty batch"));
        }

        let fwd = self.forward(x);

        let error = &y_true - &fwd.y_hat;
        // decay terms snapshot the weights before any update is applied
        let decay_w0 = self.w0.mapv(|w| -2.0 * wd * w);
        let decay_w1 = self.w1.mapv(|w| -2.0 * wd * w);
        let loss = loss::cross_entropy(fwd.y_hat.view(), y_true)? + wd * loss::l2(&self.w1);

        let relu_mask = fwd.z_h.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        let error_h = error.dot(&self.w1.t()) * &relu_mask;

        let mean_err = error.mean_axis(Axis(0)).expect("non-empty batch");
        let mean_err_h = error_h.mean_axis(Axis(0)).expect("non-empty batch");
        let hidden_sum = fwd.y_h_hat.sum_axis(Axis(0));
        let input_sum = x.sum_axis(Axis(0));

        let dw1 = hidden_sum
            .insert_axis(Axis(1))
            .dot(&mean_err.view().insert_axis(Axis(0)));
        self.w1.scaled_add(mu, &dw1);
        self.w1.scaled_add(mu, &decay_w1);
        self.b1.scaled_add(mu, &mean_err);

        let dw0 = input_sum
            .insert_axis(Axis(1))
            .dot(&mean_err_h.view().insert_axis(Axis(0)));
        self.w0.scaled_add(mu, &dw0);
        self.w0.scaled_add(mu, &decay_w0);
        self.b0.scaled_add(mu, &mean_err_h);

        Ok(loss)
    }
}

/// Scalar (std, mean) over every element, with the unbiased estimator.
fn std_mean(a: &Array2<f32>) -> (f32, f32) {
    let n = a.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = a.sum() / n as f32;
    let denom = if n > 1 { n - 1 } else { 1 };
    let var = a.iter().map(|&v| (v - mean) * (v - mean)).sum::<f32>() / denom as f32;
    (var.sqrt(), mean)
}

/// Row-wise softmax with max subtraction for stability. A non-finite row
/// falls back to the uniform distribution.
fn softmax_rows(z: &Array2<f32>) -> Array2<f32> {
    let mut out = z.clone();
    for mut row in out.rows_mut() {
        let max = row.iter().fold(f32::MIN, |a, &b| a.max(b));
        row.mapv_inplace(|v| (v - max).exp());
        let sum: f32 = row.sum();
        if !sum.is_finite() || sum <= 0.0 {
            let uniform = 1.0 / row.len() as f32;
            row.fill(uniform);
        } else {
            row /= sum;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn forward_output_rows_are_probability_distributions() {
        let mut rng = StdRng::seed_from_u64(1);
        let model = Perceptron::with_rng(8, 5, 3, &mut rng);
        let x = Array2::from_shape_fn((4, 8), |(r, c)| (r as f32 - c as f32) * 0.3);
        let fwd = model.forward(x.view());
        assert_eq!(fwd.z_h.dim(), (4, 5));
        assert_eq!(fwd.y_h_hat.dim(), (4, 5));
        assert_eq!(fwd.z.dim(), (4, 3));
        assert_eq!(fwd.y_hat.dim(), (4, 3));
        for row in fwd.y_hat.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-5);
            assert!(row.iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn standardized_activations_have_zero_mean() {
        let mut rng = StdRng::seed_from_u64(2);
        let model = Perceptron::with_rng(6, 4, 2, &mut rng);
        let x = Array2::from_shape_fn((5, 6), |(r, c)| (r + c) as f32 * 0.1);
        let fwd = model.forward(x.view());
        let mean = fwd.y_h_hat.sum() / fwd.y_h_hat.len() as f32;
        assert!(mean.abs() < 1e-5);
    }

    #[test]
    fn zero_parameters_give_uniform_output() {
        let model = Perceptron::zeros(4, 3, 2);
        let x = arr2(&[[1.0, -2.0, 0.5, 3.0], [0.0, 0.0, 1.0, -1.0]]);
        let fwd = model.forward(x.view());
        for row in fwd.y_hat.rows() {
            for &p in row.iter() {
                assert!((p - 0.5).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn train_batch_on_zero_parameters_reports_ln_2() {
        let mut model = Perceptron::zeros(4, 3, 2);
        let x = arr2(&[[1.0, -2.0, 0.5, 3.0], [0.0, 0.0, 1.0, -1.0]]);
        let y = arr2(&[[1.0, 0.0], [0.0, 1.0]]);
        let loss = model.train_batch(x.view(), y.view(), 0.01, 0.0).unwrap();
        assert!((loss - std::f32::consts::LN_2).abs() < 1e-6);
    }

    #[test]
    fn train_batch_rejects_mismatched_shapes() {
        let mut model = Perceptron::zeros(4, 3, 2);
        let x = arr2(&[[1.0, 2.0, 3.0]]);
        let y = arr2(&[[1.0, 0.0]]);
        assert!(model.train_batch(x.view(), y.view(), 0.01, 0.0).is_err());

        let x = arr2(&[[1.0, 2.0, 3.0, 4.0]]);
        let y = arr2(&[[1.0, 0.0, 0.0]]);
        assert!(model.train_batch(x.view(), y.view(), 0.01, 0.0).is_err());
    }

    #[test]
    fn seeded_initialization_is_deterministic() {
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let a = Perceptron::with_rng(5, 4, 3, &mut rng_a);
        let b = Perceptron::with_rng(5, 4, 3, &mut rng_b);
        assert_eq!(a, b);
    }

    #[test]
    fn update_moves_parameters() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut model = Perceptron::with_rng(4, 3, 2, &mut rng);
        let before = model.clone();
        let x = arr2(&[[1.0, 0.0, -1.0, 0.5], [0.2, 0.4, 0.6, 0.8]]);
        let y = arr2(&[[1.0, 0.0], [0.0, 1.0]]);
        model.train_batch(x.view(), y.view(), 0.1, 0.01).unwrap();
        assert_ne!(model.b1, before.b1);
        assert_ne!(model.w1, before.w1);
    }

    #[test]
    fn weight_decay_shrinks_weights_when_error_is_zero_mean() {
        // with a symmetric target the residual terms largely cancel, so the
        // decay term dominates the weight magnitude trend
        let mut model = Perceptron::zeros(2, 2, 2);
        model.w1 = arr2(&[[1.0, -1.0], [-1.0, 1.0]]);
        let before = loss::l2(&model.w1);
        let x = arr2(&[[0.0, 0.0]]);
        let y = arr2(&[[0.5, 0.5]]);
        model.train_batch(x.view(), y.view(), 0.1, 0.1).unwrap();
        assert!(loss::l2(&model.w1) < before);
    }
}
