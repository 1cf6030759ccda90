//! Small helpers: synthetic data for smoke tests and console summaries.
use ndarray::{Array1, Array2};
use rand::Rng;

/// Generate a linearly separable classification set: class `c` clusters
/// around a spike at coordinate `c`, with uniform noise. Samples are laid
/// out class by class, so contiguous batches of `n_per_class` rows are
/// class-homogeneous. Requires `input_size >= num_classes`.
pub fn generate_separable_data<R: Rng>(
    n_per_class: usize,
    input_size: usize,
    num_classes: usize,
    rng: &mut R,
) -> (Array2<f32>, Array1<u8>, Array2<f32>) {
    assert!(input_size >= num_classes, "need one spike coordinate per class");
    let n = n_per_class * num_classes;
    let mut features = Array2::zeros((n, input_size));
    let mut labels = Vec::with_capacity(n);
    for class in 0..num_classes {
        for sample in 0..n_per_class {
            let row = class * n_per_class + sample;
            for col in 0..input_size {
                let center = if col == class { 3.0 } else { 0.0 };
                features[(row, col)] = center + rng.gen_range(-0.5..0.5);
            }
            labels.push(class as u8);
        }
    }
    let targets = crate::data::one_hot(&labels, num_classes);
    (features, Array1::from_vec(labels), targets)
}

/// Print simple table for per-epoch losses
pub fn print_summary_table(values: &[f32], title: &str) {
    println!("\n{} Summary Table:", title);
    println!("+----------------+----------+");
    println!("| Epoch Range   | Avg Value|");
    println!("+----------------+----------+");
    if !values.is_empty() {
        let avg = values.iter().sum::<f32>() / values.len() as f32;
        println!("| All Epochs    | {:>8.6} |", avg);
    }
    println!("+----------------+----------+");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn separable_data_is_grouped_by_class() {
        let mut rng = StdRng::seed_from_u64(5);
        let (features, labels, targets) = generate_separable_data(4, 5, 3, &mut rng);
        assert_eq!(features.dim(), (12, 5));
        assert_eq!(labels.len(), 12);
        assert_eq!(targets.dim(), (12, 3));
        for (i, &label) in labels.iter().enumerate() {
            assert_eq!(label as usize, i / 4);
            // the spike coordinate dominates the row
            let row = features.row(i);
            assert!(row[label as usize] > 2.0);
            assert_eq!(targets[(i, label as usize)], 1.0);
        }
    }
}
