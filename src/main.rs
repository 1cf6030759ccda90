use anyhow::Result;
use manual_ml::{prepare_test, prepare_train, train, Perceptron, TrainConfig};
use std::time::Instant;

fn main() -> Result<()> {
    let start = Instant::now();

    let train_split = prepare_train()?;
    let test_split = prepare_test(&train_split.stats)?;
    println!(
        "Loaded {} training rows (augmented) and {} test rows",
        train_split.features.nrows(),
        test_split.features.nrows()
    );

    let mut model = Perceptron::new(784, 100, 10);
    let cfg = TrainConfig {
        epochs: 200,
        mu: 0.001,
        batch_size: 60,
        ..TrainConfig::default()
    };
    train(&mut model, &train_split, &test_split, &cfg)?;

    println!("Elapsed time: {:.2} seconds.", start.elapsed().as_secs_f64());
    Ok(())
}
