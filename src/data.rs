//! MNIST loading and preprocessing: gzipped IDX parsing, the min-max +
//! standardize pipeline, one-hot encoding, and split preparation.
//!
//! The normalization statistics are fitted once, on the training split, and
//! the resulting [`Stats`] value must be passed unchanged to
//! [`prepare_test`]; refitting on the test split would make the two splits
//! incomparable.
use crate::augment;
use anyhow::{anyhow, Result};
use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::GzDecoder;
use ndarray::{Array1, Array2};
use std::fs::File;
use std::io::{Cursor, Read};

/// Number of classes in MNIST.
pub const NUM_CLASSES: usize = 10;

/// Normalization statistics fitted on the training split.
///
/// `min`/`max` are taken over the raw intensities; `mean`/`std` over the
/// min-max-scaled values. `std` is the unbiased (n-1) estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub std: f32,
}

/// A prepared training split: augmented, flattened, normalized features
/// with both label encodings and the fitted statistics.
#[derive(Debug, Clone)]
pub struct TrainSplit {
    /// (7K, 784) normalized features.
    pub features: Array2<f32>,
    /// Integer labels, used for accuracy reporting.
    pub labels: Array1<u8>,
    /// One-hot labels, used by the training loss.
    pub targets: Array2<f32>,
    /// Statistics to reuse for the test split.
    pub stats: Stats,
}

/// A prepared test split, normalized with the training statistics.
#[derive(Debug, Clone)]
pub struct TestSplit {
    pub features: Array2<f32>,
    pub labels: Array1<u8>,
}

/// One gzipped IDX file: big-endian magic, dimension sizes, then payload.
#[derive(Debug)]
struct IdxFile {
    sizes: Vec<i32>,
    data: Vec<u8>,
}

impl IdxFile {
    fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut gz = GzDecoder::new(reader);
        let mut contents = Vec::new();
        gz.read_to_end(&mut contents)
            .map_err(|e| anyhow!("Gzip read error: {}", e))?;
        let mut r = Cursor::new(&contents);
        let magic = r
            .read_i32::<BigEndian>()
            .map_err(|e| anyhow!("Read magic: {}", e))?;
        let mut sizes = Vec::new();
        let mut data = Vec::new();
        match magic {
            2049 => {
                sizes.push(r.read_i32::<BigEndian>()?);
            }
            2051 => {
                sizes.push(r.read_i32::<BigEndian>()?);
                sizes.push(r.read_i32::<BigEndian>()?);
                sizes.push(r.read_i32::<BigEndian>()?);
            }
            _ => return Err(anyhow!("Invalid magic: {}", magic)),
        }
        r.read_to_end(&mut data)
            .map_err(|e| anyhow!("Read data: {}", e))?;
        Ok(Self { sizes, data })
    }

    fn open(filename: &str) -> Result<Self> {
        let file =
            File::open(filename).map_err(|e| anyhow!("Failed to open {}: {}", filename, e))?;
        Self::from_reader(file)
    }
}

fn open_split_file(name: &str) -> Result<IdxFile> {
    let path = format!("data/{}", name);
    IdxFile::open(&path).or_else(|_| IdxFile::open(name))
}

/// Load raw MNIST images (28x28 intensity grids, 0-255) and labels.
pub fn load_raw(train: bool) -> Result<(Vec<Array2<f32>>, Vec<u8>)> {
    let prefix = if train { "train" } else { "t10k" };
    let labels = open_split_file(&format!("{}-labels-idx1-ubyte.gz", prefix))?;
    let images = open_split_file(&format!("{}-images-idx3-ubyte.gz", prefix))?;
    if images.sizes.len() != 3 {
        return Err(anyhow!("Image file does not carry image dimensions"));
    }
    let num_images = images.sizes[0] as usize;
    let rows = images.sizes[1] as usize;
    let cols = images.sizes[2] as usize;
    let image_size = rows * cols;
    if labels.sizes[0] as usize != num_images {
        return Err(anyhow!(
            "Label count {} does not match image count {}",
            labels.sizes[0],
            num_images
        ));
    }
    if labels.data.len() < num_images {
        return Err(anyhow!("Label data truncated"));
    }
    let mut out_images = Vec::with_capacity(num_images);
    let mut out_labels = Vec::with_capacity(num_images);
    for i in 0..num_images {
        let start = i * image_size;
        if start + image_size > images.data.len() {
            return Err(anyhow!("Image data overflow"));
        }
        let pixels: Vec<f32> = images.data[start..start + image_size]
            .iter()
            .map(|&b| b as f32)
            .collect();
        out_images.push(Array2::from_shape_vec((rows, cols), pixels)?);
        out_labels.push(labels.data[i]);
    }
    if out_images.is_empty() {
        return Err(anyhow!("No MNIST data loaded"));
    }
    Ok((out_images, out_labels))
}

/// Flatten a set of images into an (n, rows*cols) feature matrix.
pub fn flatten(images: &[Array2<f32>]) -> Array2<f32> {
    if images.is_empty() {
        return Array2::zeros((0, 0));
    }
    let pixels = images[0].len();
    let mut out = Array2::zeros((images.len(), pixels));
    for (mut row, image) in out.rows_mut().into_iter().zip(images) {
        for (dst, &src) in row.iter_mut().zip(image.iter()) {
            *dst = src;
        }
    }
    out
}

/// One-hot encode integer labels into an (n, num_classes) indicator matrix.
pub fn one_hot(labels: &[u8], num_classes: usize) -> Array2<f32> {
    let mut out = Array2::zeros((labels.len(), num_classes));
    for (i, &label) in labels.iter().enumerate() {
        if (label as usize) < num_classes {
            out[(i, label as usize)] = 1.0;
        }
    }
    out
}

/// Fit normalization statistics on a raw feature matrix.
pub fn fit_stats(x: &Array2<f32>) -> Stats {
    if x.is_empty() {
        return Stats { min: 0.0, max: 0.0, mean: 0.0, std: 0.0 };
    }
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for &v in x.iter() {
        min = min.min(v);
        max = max.max(v);
    }
    let range = max - min;
    let n = x.len();
    let mut sum = 0.0f64;
    for &v in x.iter() {
        let scaled = if range > f32::EPSILON {
            (v - min) / range
        } else {
            v - min
        };
        sum += scaled as f64;
    }
    let mean = (sum / n as f64) as f32;
    let mut sq_sum = 0.0f64;
    for &v in x.iter() {
        let scaled = if range > f32::EPSILON {
            (v - min) / range
        } else {
            v - min
        };
        let d = (scaled - mean) as f64;
        sq_sum += d * d;
    }
    let denom = if n > 1 { n - 1 } else { 1 };
    let std = (sq_sum / denom as f64).sqrt() as f32;
    Stats { min, max, mean, std }
}

/// Apply the two-stage pipeline in place: min-max scale to [0,1] with the
/// fitted min/max, then standardize with the fitted mean/std. Zero range
/// or zero std skips the corresponding division.
pub fn normalize(x: &mut Array2<f32>, stats: &Stats) {
    let range = stats.max - stats.min;
    for v in x.iter_mut() {
        let mut scaled = *v - stats.min;
        if range > f32::EPSILON {
            scaled /= range;
        }
        scaled -= stats.mean;
        if stats.std > f32::EPSILON {
            scaled /= stats.std;
        }
        *v = scaled;
    }
}

/// Load, augment, flatten, and normalize the training split.
///
/// Returns the split together with the fitted [`Stats`], which the caller
/// must hand to [`prepare_test`].
pub fn prepare_train() -> Result<TrainSplit> {
    let (images, labels) = load_raw(true)?;
    let (images, labels) = augment::expand(images, labels);
    let mut features = flatten(&images);
    let stats = fit_stats(&features);
    normalize(&mut features, &stats);
    let targets = one_hot(&labels, NUM_CLASSES);
    Ok(TrainSplit {
        features,
        labels: Array1::from_vec(labels),
        targets,
        stats,
    })
}

/// Load, flatten, and normalize the test split, reusing the training
/// statistics. The test split is never augmented.
pub fn prepare_test(stats: &Stats) -> Result<TestSplit> {
    let (images, labels) = load_raw(false)?;
    let mut features = flatten(&images);
    normalize(&mut features, stats);
    Ok(TestSplit {
        features,
        labels: Array1::from_vec(labels),
    })
}
