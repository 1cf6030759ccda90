//! A two-layer MNIST perceptron trained with hand-written forward and
//! backward passes: no autodiff, no framework optimizer.
//!
//! - Manual gradient updates with weight decay and a 60-epoch step-decay
//!   learning-rate schedule
//! - Data prep that fits min-max + standardization statistics on the
//!   training split and reuses them on the test split
//! - 7x training-set augmentation (four 2-pixel shifts and two 5-degree
//!   rotations per image)
//! - Batched evaluation reporting accuracy and cross-entropy

pub mod augment;
pub mod data;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod train;
pub mod utils;

pub use augment::{rotate, shift, Shift};
pub use data::{one_hot, prepare_test, prepare_train, Stats, TestSplit, TrainSplit};
pub use loss::{cross_entropy, cross_entropy_labels};
pub use metrics::evaluate;
pub use network::{Forward, Perceptron};
pub use train::{train, train_epoch, TrainConfig};
pub use utils::{generate_separable_data, print_summary_table};
