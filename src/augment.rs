//! Training-set augmentation: 2-pixel edge shifts and small rotations.
//!
//! Augmentation runs on raw 28x28 intensity grids, before flattening and
//! normalization, so the fill value is the raw maximum intensity (255).
use ndarray::Array2;

/// Fill intensity for pixels vacated by a shift.
pub const SHIFT_FILL: f32 = 255.0;
/// Shift distance in pixels.
pub const SHIFT_AMOUNT: usize = 2;
/// Rotation magnitude in degrees.
pub const ROTATE_DEGREES: f32 = 5.0;

/// Direction the image content moves in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Up,
    Down,
    Left,
    Right,
}

/// Translate the image by `amount` pixels, filling vacated rows/columns
/// with `fill`. An up-shift moves content toward row 0 and fills the
/// bottom rows, and symmetrically for the other directions.
pub fn shift(image: &Array2<f32>, direction: Shift, amount: usize, fill: f32) -> Array2<f32> {
    let (rows, cols) = image.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| match direction {
        Shift::Up => {
            if r + amount < rows {
                image[(r + amount, c)]
            } else {
                fill
            }
        }
        Shift::Down => {
            if r >= amount {
                image[(r - amount, c)]
            } else {
                fill
            }
        }
        Shift::Left => {
            if c + amount < cols {
                image[(r, c + amount)]
            } else {
                fill
            }
        }
        Shift::Right => {
            if c >= amount {
                image[(r, c - amount)]
            } else {
                fill
            }
        }
    })
}

/// Rotate the image about its center by `degrees` (counterclockwise for
/// positive angles), sampling bilinearly and filling out-of-bounds with 0.
pub fn rotate(image: &Array2<f32>, degrees: f32) -> Array2<f32> {
    let (rows, cols) = image.dim();
    let cy = (rows as f32 - 1.0) / 2.0;
    let cx = (cols as f32 - 1.0) / 2.0;
    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let dy = r as f32 - cy;
        let dx = c as f32 - cx;
        // inverse mapping: where in the source does this output pixel come from
        let sx = cx + cos * dx + sin * dy;
        let sy = cy - sin * dx + cos * dy;
        bilinear(image, sy, sx)
    })
}

fn bilinear(image: &Array2<f32>, y: f32, x: f32) -> f32 {
    let (rows, cols) = image.dim();
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let sample = |r: f32, c: f32| -> f32 {
        if r < 0.0 || c < 0.0 {
            return 0.0;
        }
        let (r, c) = (r as usize, c as usize);
        if r >= rows || c >= cols {
            0.0
        } else {
            image[(r, c)]
        }
    };
    let top = sample(y0, x0) * (1.0 - fx) + sample(y0, x0 + 1.0) * fx;
    let bottom = sample(y0 + 1.0, x0) * (1.0 - fx) + sample(y0 + 1.0, x0 + 1.0) * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Expand a training set 7x: each image contributes itself, one shift in
/// each of the four directions, and the two 5-degree rotations, all with
/// the source label.
pub fn expand(images: Vec<Array2<f32>>, labels: Vec<u8>) -> (Vec<Array2<f32>>, Vec<u8>) {
    let mut out_images = Vec::with_capacity(images.len() * 7);
    let mut out_labels = Vec::with_capacity(labels.len() * 7);
    for (image, label) in images.into_iter().zip(labels) {
        out_images.push(image.clone());
        out_images.push(shift(&image, Shift::Down, SHIFT_AMOUNT, SHIFT_FILL));
        out_images.push(shift(&image, Shift::Up, SHIFT_AMOUNT, SHIFT_FILL));
        out_images.push(shift(&image, Shift::Right, SHIFT_AMOUNT, SHIFT_FILL));
        out_images.push(shift(&image, Shift::Left, SHIFT_AMOUNT, SHIFT_FILL));
        out_images.push(rotate(&image, ROTATE_DEGREES));
        out_images.push(rotate(&image, -ROTATE_DEGREES));
        out_labels.extend(std::iter::repeat(label).take(7));
    }
    (out_images, out_labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn ramp(rows: usize, cols: usize) -> Array2<f32> {
        Array2::from_shape_fn((rows, cols), |(r, c)| (r * cols + c) as f32)
    }

    #[test]
    fn up_shift_fills_bottom_rows_and_moves_content_up() {
        let img = ramp(6, 6);
        let shifted = shift(&img, Shift::Up, 2, 255.0);
        for r in 0..4 {
            for c in 0..6 {
                assert_eq!(shifted[(r, c)], img[(r + 2, c)]);
            }
        }
        for r in 4..6 {
            for c in 0..6 {
                assert_eq!(shifted[(r, c)], 255.0);
            }
        }
    }

    #[test]
    fn down_shift_fills_top_rows() {
        let img = ramp(6, 6);
        let shifted = shift(&img, Shift::Down, 2, 255.0);
        for c in 0..6 {
            assert_eq!(shifted[(0, c)], 255.0);
            assert_eq!(shifted[(1, c)], 255.0);
            assert_eq!(shifted[(5, c)], img[(3, c)]);
        }
    }

    #[test]
    fn left_and_right_shifts_fill_opposite_columns() {
        let img = ramp(6, 6);
        let left = shift(&img, Shift::Left, 2, 255.0);
        let right = shift(&img, Shift::Right, 2, 255.0);
        for r in 0..6 {
            assert_eq!(left[(r, 4)], 255.0);
            assert_eq!(left[(r, 5)], 255.0);
            assert_eq!(left[(r, 0)], img[(r, 2)]);
            assert_eq!(right[(r, 0)], 255.0);
            assert_eq!(right[(r, 1)], 255.0);
            assert_eq!(right[(r, 5)], img[(r, 3)]);
        }
    }

    #[test]
    fn zero_rotation_is_identity() {
        let img = ramp(8, 8);
        let rotated = rotate(&img, 0.0);
        for (a, b) in rotated.iter().zip(img.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn rotation_preserves_shape_and_center_pixel_of_odd_grid() {
        let mut img = Array2::zeros((7, 7));
        img[(3, 3)] = 100.0;
        let rotated = rotate(&img, 5.0);
        assert_eq!(rotated.dim(), (7, 7));
        assert!((rotated[(3, 3)] - 100.0).abs() < 1e-3);
    }

    #[test]
    fn expand_produces_seven_variants_per_image_with_shared_labels() {
        let images = vec![ramp(4, 4), Array2::zeros((4, 4))];
        let labels = vec![3u8, 8];
        let (out_images, out_labels) = expand(images.clone(), labels);
        assert_eq!(out_images.len(), 14);
        assert_eq!(out_labels.len(), 14);
        assert!(out_labels[..7].iter().all(|&l| l == 3));
        assert!(out_labels[7..].iter().all(|&l| l == 8));
        // the original leads each group of seven
        assert_eq!(out_images[0], images[0]);
        assert_eq!(out_images[7], images[1]);
    }
}
