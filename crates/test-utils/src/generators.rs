//! Test data generators for synthetic precipitation fields.
//!
//! These generators create predictable, verifiable patterns that can be used
//! across the test suite. All value grids are row-major, one row per latitude.

/// Sentinel used by the data source for "no data" cells.
pub const NO_DATA: f32 = -999.0;

/// Evenly spaced axis from `start` to `end` inclusive with `count` samples.
///
/// `start > end` produces a descending axis.
///
/// # Example
///
/// ```
/// use test_utils::axis;
///
/// assert_eq!(axis(-2.0, 2.0, 5), vec![-2.0, -1.0, 0.0, 1.0, 2.0]);
/// assert_eq!(axis(1.0, 0.0, 3), vec![1.0, 0.5, 0.0]);
/// ```
pub fn axis(start: f32, end: f32, count: usize) -> Vec<f32> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f32;
            (0..count).map(|i| start + step * i as f32).collect()
        }
    }
}

/// Creates a grid whose cell values encode their position.
///
/// Each cell value is `row * 1000 + col`, so a reader can check that
/// grid[row][col] landed where expected.
///
/// # Example
///
/// ```
/// use test_utils::create_index_grid;
///
/// let grid = create_index_grid(3, 2);
/// assert_eq!(grid, vec![0.0, 1.0, 2.0, 1000.0, 1001.0, 1002.0]);
/// ```
pub fn create_index_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((row * 1000 + col) as f32);
        }
    }
    data
}

/// Creates a grid with random-ish but deterministic precipitation values.
///
/// About a quarter of the cells carry rain up to 150 mm, one cell in
/// sixteen is a heavy outlier up to 600 mm, the rest are dry.
pub fn create_precipitation_grid(width: usize, height: usize, seed: u32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let hash = simple_hash(col as u32, row as u32, seed);
            let precip = match hash % 16 {
                0 => (hash % 60_000) as f32 / 100.0,
                1..=3 => (hash % 15_000) as f32 / 100.0,
                _ => 0.0,
            };
            data.push(precip);
        }
    }
    data
}

/// Replace cells outside a centered ellipse with [`NO_DATA`].
///
/// Mimics a land mask: the interior keeps its values, the "ocean" around
/// it becomes missing data.
pub fn apply_island_mask(data: &mut [f32], width: usize, height: usize) {
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let rx = (width as f32 / 2.0).max(1.0);
    let ry = (height as f32 / 2.0).max(1.0);

    for row in 0..height {
        for col in 0..width {
            let dx = (col as f32 - cx) / rx;
            let dy = (row as f32 - cy) / ry;
            if dx * dx + dy * dy > 1.0 {
                data[row * width + col] = NO_DATA;
            }
        }
    }
}

/// Creates a smooth west-to-east ramp from 0 to `max`.
pub fn create_ramp_grid(width: usize, height: usize, max: f32) -> Vec<f32> {
    let denom = width.saturating_sub(1).max(1) as f32;
    let mut data = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            data.push(max * col as f32 / denom);
        }
    }
    data
}

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_edge_counts() {
        assert!(axis(0.0, 1.0, 0).is_empty());
        assert_eq!(axis(3.0, 9.0, 1), vec![3.0]);
    }

    #[test]
    fn test_precipitation_grid_deterministic() {
        let a = create_precipitation_grid(20, 10, 7);
        let b = create_precipitation_grid(20, 10, 7);
        let c = create_precipitation_grid(20, 10, 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|v| *v >= 0.0 && *v < 600.0));
    }

    #[test]
    fn test_island_mask_keeps_center() {
        let mut data = create_constant_grid(9, 9, 5.0);
        apply_island_mask(&mut data, 9, 9);
        assert_eq!(data[4 * 9 + 4], 5.0);
        assert_eq!(data[0], NO_DATA);
        assert_eq!(data[80], NO_DATA);
    }

    #[test]
    fn test_ramp_grid() {
        let data = create_ramp_grid(5, 2, 100.0);
        assert_eq!(&data[..5], &[0.0, 25.0, 50.0, 75.0, 100.0]);
        assert_eq!(&data[5..], &data[..5]);
    }
}
