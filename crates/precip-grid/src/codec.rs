//! Binary wire format for precipitation grids.
//!
//! Layout (little-endian), a fixed 52-byte header followed by the payload:
//!
//! ```text
//! int32   latCount, lonCount, timeIndex, totalTimes
//! float32 minLat, maxLat, minLon, maxLon
//! float32 statsMin, statsMax, statsMean, actualMin, actualMax
//! float32[latCount]            lat
//! float32[lonCount]            lon
//! float32[latCount*lonCount]   values (row-major, row = lat index)
//! ```
//!
//! Floats are moved as raw bits, so `decode(encode(g)) == g` holds exactly.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Deserialize;
use tracing::debug;

use crate::error::{GridError, Result};
use crate::types::{Bounds, Grid, GridStats, SENTINEL};

/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 52;

/// MIME type the grid endpoint serves.
pub const CONTENT_TYPE: &str = "application/octet-stream";

/// Total encoded size for the given dimensions, if addressable.
pub fn encoded_len(lat_count: usize, lon_count: usize) -> Option<usize> {
    lat_count
        .checked_mul(lon_count)?
        .checked_add(lat_count)?
        .checked_add(lon_count)?
        .checked_mul(4)?
        .checked_add(HEADER_LEN)
}

/// Decode a binary grid buffer.
///
/// Fails when the buffer is shorter than the header or the declared
/// payload, or when a declared count is not positive. Bytes past the
/// declared payload are ignored.
pub fn decode(buffer: &[u8]) -> Result<Grid> {
    if buffer.len() < HEADER_LEN {
        return Err(GridError::BufferTooShort {
            expected: HEADER_LEN,
            actual: buffer.len(),
        });
    }

    let mut buf = buffer;
    let lat_count = buf.get_i32_le();
    let lon_count = buf.get_i32_le();
    let time_index = buf.get_i32_le();
    let total_times = buf.get_i32_le();

    if lat_count <= 0 {
        return Err(GridError::InvalidCount {
            field: "latCount",
            value: lat_count,
        });
    }
    if lon_count <= 0 {
        return Err(GridError::InvalidCount {
            field: "lonCount",
            value: lon_count,
        });
    }

    let n = lat_count as usize;
    let m = lon_count as usize;
    let expected = encoded_len(n, m).ok_or(GridError::SizeOverflow {
        lat_count,
        lon_count,
    })?;
    if buffer.len() < expected {
        return Err(GridError::BufferTooShort {
            expected,
            actual: buffer.len(),
        });
    }
    if buffer.len() > expected {
        debug!(
            trailing = buffer.len() - expected,
            "Ignoring bytes past the declared grid payload"
        );
    }

    let min_lat = buf.get_f32_le();
    let max_lat = buf.get_f32_le();
    let min_lon = buf.get_f32_le();
    let max_lon = buf.get_f32_le();
    let bounds = Bounds::new(min_lat, max_lat, min_lon, max_lon);

    let stats = GridStats {
        min: buf.get_f32_le(),
        max: buf.get_f32_le(),
        mean: buf.get_f32_le(),
        actual_min: buf.get_f32_le(),
        actual_max: buf.get_f32_le(),
    };

    let lat = read_f32s(&mut buf, n);
    let lon = read_f32s(&mut buf, m);
    let values = read_f32s(&mut buf, n * m);

    debug!(
        lat_count = n,
        lon_count = m,
        time_index,
        total_times,
        "Decoded grid"
    );

    Ok(Grid::new(lat, lon, values, bounds, stats)?.with_time(time_index, total_times))
}

/// Encode a grid into the binary wire format.
pub fn encode(grid: &Grid) -> Bytes {
    let n = grid.height();
    let m = grid.width();
    let mut buf = BytesMut::with_capacity(HEADER_LEN + 4 * (n + m + n * m));

    buf.put_i32_le(n as i32);
    buf.put_i32_le(m as i32);
    buf.put_i32_le(grid.time_index());
    buf.put_i32_le(grid.total_times());

    let bounds = grid.bounds();
    buf.put_f32_le(bounds.min_lat);
    buf.put_f32_le(bounds.max_lat);
    buf.put_f32_le(bounds.min_lon);
    buf.put_f32_le(bounds.max_lon);

    let stats = grid.stats();
    buf.put_f32_le(stats.min);
    buf.put_f32_le(stats.max);
    buf.put_f32_le(stats.mean);
    buf.put_f32_le(stats.actual_min);
    buf.put_f32_le(stats.actual_max);

    for &v in grid.lat().iter().chain(grid.lon()).chain(grid.values()) {
        buf.put_f32_le(v);
    }

    buf.freeze()
}

fn read_f32s(buf: &mut &[u8], count: usize) -> Vec<f32> {
    (0..count).map(|_| buf.get_f32_le()).collect()
}

/// JSON form of a grid served by the text endpoint.
///
/// Missing cells arrive either as the sentinel or as `null`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridDocument {
    lat: Vec<f32>,
    lon: Vec<f32>,
    values: Vec<Vec<Option<f32>>>,
    bounds: Bounds,
    stats: GridStats,
    #[serde(default)]
    time_index: i32,
    #[serde(default = "default_total_times")]
    total_times: i32,
}

fn default_total_times() -> i32 {
    1
}

/// Decode the JSON grid document into a [`Grid`].
pub fn decode_json(text: &str) -> Result<Grid> {
    let doc: GridDocument =
        serde_json::from_str(text).map_err(|e| GridError::InvalidDocument(e.to_string()))?;

    let rows = doc
        .values
        .into_iter()
        .map(|row| row.into_iter().map(|v| v.unwrap_or(SENTINEL)).collect())
        .collect();

    Ok(Grid::from_rows(doc.lat, doc.lon, rows, doc.bounds, doc.stats)?
        .with_time(doc.time_index, doc.total_times))
}
