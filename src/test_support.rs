use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

use crate::config::{DataConfig, StayConfig};
use crate::model::GeoPoint;

/// The bundled data files under `data/`.
pub fn fixture_data_config() -> DataConfig {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
    DataConfig {
        geo: root.join("geo.json"),
        rates: root.join("rates.json"),
        hotels: root.join("hotels.json"),
    }
}

/// Default configuration pointed at the bundled data files and listening on
/// loopback.
pub fn fixture_config() -> StayConfig {
    StayConfig {
        listen: [127, 0, 0, 1].into(),
        data: fixture_data_config(),
        ..StayConfig::default()
    }
}

/// `count` points with ids `p0..`, spread uniformly over the whole globe.
pub fn sample_points(count: usize, seed: u64) -> Vec<GeoPoint> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| GeoPoint::new(format!("p{i}"), rng.gen_range(-90.0..=90.0), rng.gen_range(-180.0..180.0)))
        .collect()
}

/// `count` points scattered within roughly `spread_degrees` of a centre.
pub fn clustered_points(count: usize, lat: f64, lon: f64, spread_degrees: f64, seed: u64) -> Vec<GeoPoint> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let lat = (lat + rng.gen_range(-spread_degrees..=spread_degrees)).clamp(-90.0, 90.0);
            let lon = lon + rng.gen_range(-spread_degrees..=spread_degrees);
            let lon = (lon + 180.0).rem_euclid(360.0) - 180.0;
            GeoPoint::new(format!("c{i}"), lat, lon)
        })
        .collect()
}
