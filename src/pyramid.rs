//! Synthetic volumes and Gaussian image pyramids

use ndarray::{Array3, Axis};
use rand::Rng;

/// Downscale factor between consecutive pyramid levels
pub const DOWNSCALE: usize = 2;

/// Gaussian kernel radius in units of sigma
const TRUNCATE: f64 = 4.0;

/// Volume of shape `(size, size, size)` filled with integers drawn uniformly
/// from `[0, 255)`
pub fn random_volume<R: Rng>(size: usize, rng: &mut R) -> Array3<f32> {
    Array3::from_shape_simple_fn((size, size, size), || f32::from(rng.random_range(0..255u8)))
}

/// Gaussian pyramid of a volume.
///
/// Level 0 is the input. Each following level is the previous one smoothed
/// with sigma `2 * DOWNSCALE / 6` and resampled to `ceil(n / DOWNSCALE)`
/// along every axis. The pyramid ends once resampling no longer changes the
/// shape, so a cube always ends at 1x1x1.
pub fn pyramid_gaussian(volume: Array3<f32>) -> Vec<Array3<f32>> {
    let sigma = 2.0 * DOWNSCALE as f64 / 6.0;
    let kernel = gaussian_kernel(sigma);
    let mut levels = vec![volume];

    loop {
        let Some(prev) = levels.last() else { break };
        let shape = prev.shape();
        let next_shape: Vec<usize> = shape.iter().map(|&n| n.div_ceil(DOWNSCALE)).collect();
        if next_shape == shape {
            break;
        }

        let mut smoothed = prev.clone();
        for axis in 0..3 {
            smooth_axis(&mut smoothed, axis, &kernel);
        }
        let mut resized = smoothed;
        for axis in 0..3 {
            resized = resize_axis(&resized, axis, next_shape[axis]);
        }
        levels.push(resized);
    }

    levels
}

/// Cast a level to 8 bits, truncating toward zero and clamping to `[0, 255]`
pub fn to_u8(level: &Array3<f32>) -> Array3<u8> {
    level.mapv(|v| v.clamp(0.0, 255.0) as u8)
}

fn gaussian_kernel(sigma: f64) -> Vec<f32> {
    let radius = (TRUNCATE * sigma + 0.5) as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / total) as f32).collect()
}

/// Mirror an index into `[0, n)` repeating the edge sample (`d c b a | a b c d`)
fn reflect(i: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let i = i.rem_euclid(period);
    if i >= n {
        (period - 1 - i) as usize
    } else {
        i as usize
    }
}

fn smooth_axis(volume: &mut Array3<f32>, axis: usize, kernel: &[f32]) {
    let radius = (kernel.len() / 2) as isize;
    let mut line = Vec::new();

    for mut lane in volume.lanes_mut(Axis(axis)) {
        line.clear();
        line.extend(lane.iter().copied());
        let n = line.len();
        for (i, out) in lane.iter_mut().enumerate() {
            *out = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * line[reflect(i as isize + k as isize - radius, n)])
                .sum();
        }
    }
}

/// Linear resampling of one axis, sampling output voxel centers
fn resize_axis(volume: &Array3<f32>, axis: usize, out_len: usize) -> Array3<f32> {
    let len = volume.len_of(Axis(axis));
    let mut shape = volume.raw_dim();
    shape[axis] = out_len;
    let mut out = Array3::zeros(shape);

    let scale = len as f64 / out_len as f64;
    let taps: Vec<(usize, usize, f32)> = (0..out_len)
        .map(|i| {
            let c = ((i as f64 + 0.5) * scale - 0.5).clamp(0.0, (len - 1) as f64);
            let lo = c.floor() as usize;
            let hi = (lo + 1).min(len - 1);
            (lo, hi, (c - lo as f64) as f32)
        })
        .collect();

    for (src, mut dst) in volume
        .lanes(Axis(axis))
        .into_iter()
        .zip(out.lanes_mut(Axis(axis)))
    {
        for (d, &(lo, hi, t)) in dst.iter_mut().zip(taps.iter()) {
            *d = src[lo] * (1.0 - t) + src[hi] * t;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_kernel_is_normalised() {
        let kernel = gaussian_kernel(2.0 / 3.0);
        assert_eq!(kernel.len(), 7);
        let total: f32 = kernel.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(kernel[3] > kernel[2]);
    }

    #[test]
    fn test_reflect() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
        assert_eq!(reflect(0, 1), 0);
        assert_eq!(reflect(-3, 1), 0);
    }

    #[test]
    fn test_pyramid_shapes_for_128() {
        let mut rng = StdRng::seed_from_u64(7);
        let levels = pyramid_gaussian(random_volume(128, &mut rng));
        let edges: Vec<usize> = levels.iter().map(|l| l.shape()[0]).collect();
        assert_eq!(edges, vec![128, 64, 32, 16, 8, 4, 2, 1]);
        for level in &levels {
            let s = level.shape();
            assert_eq!(s[0], s[1]);
            assert_eq!(s[1], s[2]);
        }
    }

    #[test]
    fn test_pyramid_odd_edge_strictly_decreases() {
        let mut rng = StdRng::seed_from_u64(1);
        let levels = pyramid_gaussian(random_volume(5, &mut rng));
        let edges: Vec<usize> = levels.iter().map(|l| l.shape()[0]).collect();
        assert_eq!(edges, vec![5, 3, 2, 1]);
    }

    #[test]
    fn test_single_voxel_has_one_level() {
        let levels = pyramid_gaussian(Array3::from_elem((1, 1, 1), 3.0));
        assert_eq!(levels.len(), 1);
    }

    #[test]
    fn test_constant_volume_stays_constant() {
        let levels = pyramid_gaussian(Array3::from_elem((9, 9, 9), 42.0));
        for level in &levels {
            assert!(level.iter().all(|&v| (v - 42.0).abs() < 1e-3));
        }
    }

    #[test]
    fn test_values_stay_in_byte_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let volume = random_volume(16, &mut rng);
        assert!(volume.iter().all(|&v| (0.0..255.0).contains(&v) && v.fract() == 0.0));

        for level in pyramid_gaussian(volume) {
            assert!(level.iter().all(|&v| (0.0..=255.0).contains(&v)));
            let bytes = to_u8(&level);
            assert_eq!(bytes.shape(), level.shape());
        }
    }

    #[test]
    fn test_to_u8_truncates_and_clamps() {
        let level = Array3::from_shape_vec((1, 1, 4), vec![-3.0, 1.9, 254.99, 300.0]).unwrap();
        let bytes: Vec<u8> = to_u8(&level).iter().copied().collect();
        assert_eq!(bytes, vec![0, 1, 254, 255]);
    }
}
