//! Common test fixtures for precip-overlay tests.
//!
//! This module provides pre-defined test data for the scenarios the engine
//! sees in practice.

/// Grid domain specifications.
pub mod domain {
    /// Geographic domain of a regular lat/lon grid.
    #[derive(Debug, Clone, Copy)]
    pub struct DomainSpec {
        pub width: usize,
        pub height: usize,
        pub min_lon: f32,
        pub max_lon: f32,
        pub min_lat: f32,
        pub max_lat: f32,
    }

    /// Maritime-continent regional model domain, subsampled by 2.
    pub const MARITIME: DomainSpec = DomainSpec {
        width: 185,
        height: 69,
        min_lon: 95.0,
        max_lon: 141.0,
        min_lat: -11.0,
        max_lat: 6.0,
    };

    /// Tiny domain for fast unit tests.
    pub const TINY: DomainSpec = DomainSpec {
        width: 4,
        height: 3,
        min_lon: 100.0,
        max_lon: 103.0,
        min_lat: -1.0,
        max_lat: 1.0,
    };
}

/// GeoJSON region fixtures.
pub mod geojson {
    /// Square polygon covering [0.25, 1.25] on both axes.
    pub const UNIT_SQUARE: &str = r#"{
        "type": "Polygon",
        "coordinates": [[[0.25, 0.25], [1.25, 0.25], [1.25, 1.25], [0.25, 1.25], [0.25, 0.25]]]
    }"#;

    /// Two disjoint squares as a MultiPolygon.
    pub const TWO_SQUARES: &str = r#"{
        "type": "MultiPolygon",
        "coordinates": [
            [[[-0.5, -0.5], [0.5, -0.5], [0.5, 0.5], [-0.5, 0.5], [-0.5, -0.5]]],
            [[[1.5, 1.5], [2.5, 1.5], [2.5, 2.5], [1.5, 2.5], [1.5, 1.5]]]
        ]
    }"#;

    /// Build a closed square ring feature around (`lon`, `lat`).
    pub fn square_feature(lon: f64, lat: f64, half: f64) -> String {
        serde_json::json!({
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [lon - half, lat - half],
                    [lon + half, lat - half],
                    [lon + half, lat + half],
                    [lon - half, lat + half],
                    [lon - half, lat - half]
                ]]
            }
        })
        .to_string()
    }
}
