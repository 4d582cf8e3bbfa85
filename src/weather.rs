//! Weather provider (spec.md C5): injectable weather capability with a
//! TTL cache wrapper and a deterministic synthetic fallback generator.
//!
//! Real NOAA/OpenWeatherMap HTTP clients are out of scope for this
//! crate (spec.md §2.1 Non-goals); callers inject their own
//! `WeatherProvider` implementation and this module supplies the
//! caching chain and the offline fallback so `plan_route` still works
//! with zero external wiring.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::geodesy::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherSample {
    pub wind_speed_knots: f64,
    pub wind_direction_deg: f64,
    pub wave_height_m: f64,
    pub current_speed_ms: f64,
    pub current_direction_deg: f64,
    pub sst_c: f64,
    pub source_tag: &'static str,
}

impl WeatherSample {
    /// Combined cost multiplier from wind and wave effects, ported from
    /// `apply_weather_to_route_cost`'s `wind_factor * wave_factor`.
    pub fn cost_multiplier(&self) -> f64 {
        let wind_factor = 1.0 + (self.wind_speed_knots / 20.0) * 0.3;
        let wave_factor = 1.0 + (self.wave_height_m / 2.0) * 0.2;
        wind_factor * wave_factor
    }

    /// `segment_cost`'s wind term (spec.md §4.6): `1 + (wind_kt/20) * 0.2`.
    pub fn wind_factor(&self) -> f64 {
        1.0 + (self.wind_speed_knots / 20.0) * 0.2
    }
}

/// Piecewise-linear Beaufort-like estimate of significant wave height
/// from wind speed alone, used when a provider reports wind but not sea
/// state directly (spec.md §4.5).
pub fn estimate_wave_height_m(wind_speed_knots: f64) -> f64 {
    let kt = wind_speed_knots.max(0.0);
    if kt < 4.0 {
        0.1
    } else if kt < 11.0 {
        0.1 + (kt - 4.0) / 7.0 * 0.4
    } else if kt < 17.0 {
        0.5 + (kt - 11.0) / 6.0 * 0.7
    } else if kt < 22.0 {
        1.2 + (kt - 17.0) / 5.0 * 0.8
    } else if kt < 28.0 {
        2.0 + (kt - 22.0) / 6.0 * 1.5
    } else if kt < 34.0 {
        3.5 + (kt - 28.0) / 6.0 * 2.0
    } else if kt < 41.0 {
        5.5 + (kt - 34.0) / 7.0 * 2.5
    } else {
        8.0 + (kt - 41.0) / 10.0 * 3.0
    }
}

/// Injectable weather capability (spec.md C5). Implementations may hit
/// a real forecast API; `None` signals "no data for this point", which
/// the chain treats as a miss and falls through to the next provider.
pub trait WeatherProvider: Send + Sync {
    fn sample(&self, point: &Coordinate, forecast_hours: u32) -> Option<WeatherSample>;
}

/// Deterministic offline fallback: conditions vary by latitude band
/// only (calmer in the tropics, rougher toward the poles), with no
/// wall-clock or RNG dependency so repeated calls with the same point
/// are reproducible, matching the idempotence law (spec.md §8).
pub struct SyntheticWeatherProvider;

impl WeatherProvider for SyntheticWeatherProvider {
    fn sample(&self, point: &Coordinate, _forecast_hours: u32) -> Option<WeatherSample> {
        let lat_factor = ((point.lat + 60.0) / 120.0).clamp(0.0, 1.0);
        // Small deterministic jitter from the point itself, not wall-clock
        // or an RNG, so repeated calls for the same point agree exactly.
        let jitter = ((point.lat * 37.0 + point.lon * 11.0).sin() * 0.5 + 0.5) * 0.2 - 0.1;
        let base_wind = (8.0 + lat_factor * 15.0) * (1.0 + jitter);

        Some(WeatherSample {
            wind_speed_knots: base_wind.max(0.0),
            wind_direction_deg: (point.lon.rem_euclid(360.0) + point.lat.rem_euclid(10.0)) % 360.0,
            wave_height_m: estimate_wave_height_m(base_wind),
            current_speed_ms: 0.15 + lat_factor * 0.35,
            current_direction_deg: (point.lat.rem_euclid(360.0) + 90.0) % 360.0,
            sst_c: 28.0 - lat_factor * 25.0,
            source_tag: "synthetic",
        })
    }
}

struct CacheEntry {
    sampled_at: DateTime<Utc>,
    sample: WeatherSample,
}

/// Chains a list of providers in order of preference and caches hits
/// for `ttl_seconds`, mirroring `RealTimeWeatherService`'s
/// try-each-provider-then-mock strategy. The final provider in the
/// chain should be infallible (e.g. [`SyntheticWeatherProvider`]) so
/// `sample` always returns something.
pub struct WeatherChain {
    providers: Vec<Box<dyn WeatherProvider>>,
    ttl_seconds: i64,
    cache: Mutex<HashMap<(i64, i64), CacheEntry>>,
}

impl WeatherChain {
    pub fn new(providers: Vec<Box<dyn WeatherProvider>>, ttl_seconds: i64) -> Self {
        Self {
            providers,
            ttl_seconds,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Chain backed only by the synthetic fallback, for standalone use.
    pub fn synthetic(ttl_seconds: i64) -> Self {
        Self::new(vec![Box::new(SyntheticWeatherProvider)], ttl_seconds)
    }

    fn cache_key(point: &Coordinate) -> (i64, i64) {
        ((point.lat * 100.0).round() as i64, (point.lon * 100.0).round() as i64)
    }

    pub fn sample(&self, point: &Coordinate, forecast_hours: u32, now: DateTime<Utc>) -> WeatherSample {
        let key = Self::cache_key(point);
        if let Some(entry) = self.cache.lock().unwrap().get(&key) {
            if (now - entry.sampled_at).num_seconds() < self.ttl_seconds {
                return entry.sample;
            }
        }

        for provider in &self.providers {
            if let Some(sample) = provider.sample(point, forecast_hours) {
                self.cache
                    .lock()
                    .unwrap()
                    .insert(key, CacheEntry { sampled_at: now, sample });
                return sample;
            }
        }

        // No provider answered; synthesize once more without caching so
        // a later provider outage can recover without waiting out a TTL.
        log::warn!(
            "weather provider chain exhausted for ({:.2}, {:.2}), falling back to synthetic sample",
            point.lat,
            point.lon
        );
        SyntheticWeatherProvider.sample(point, forecast_hours).expect("synthetic provider never returns None")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysMiss;
    impl WeatherProvider for AlwaysMiss {
        fn sample(&self, _point: &Coordinate, _forecast_hours: u32) -> Option<WeatherSample> {
            None
        }
    }

    #[test]
    fn synthetic_is_deterministic() {
        let provider = SyntheticWeatherProvider;
        let p = Coordinate::new(10.0, 50.0);
        let a = provider.sample(&p, 0).unwrap();
        let b = provider.sample(&p, 0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn chain_falls_through_to_synthetic() {
        let chain = WeatherChain::new(vec![Box::new(AlwaysMiss), Box::new(SyntheticWeatherProvider)], 3600);
        let sample = chain.sample(&Coordinate::new(0.0, 0.0), 0, Utc::now());
        assert!(sample.wind_speed_knots > 0.0);
    }

    #[test]
    fn chain_caches_within_ttl() {
        struct CountingProvider(Mutex<u32>);
        impl WeatherProvider for CountingProvider {
            fn sample(&self, _point: &Coordinate, _forecast_hours: u32) -> Option<WeatherSample> {
                *self.0.lock().unwrap() += 1;
                Some(WeatherSample {
                    wind_speed_knots: 5.0,
                    wind_direction_deg: 0.0,
                    wave_height_m: 1.0,
                    current_speed_ms: 0.15,
                    current_direction_deg: 0.0,
                    sst_c: 25.0,
                    source_tag: "test",
                })
            }
        }

        let chain = WeatherChain::new(vec![Box::new(CountingProvider(Mutex::new(0)))], 3600);
        let p = Coordinate::new(1.0, 1.0);
        let now = Utc::now();
        chain.sample(&p, 0, now);
        chain.sample(&p, 0, now);
        // Cache hit means the second sample() call doesn't touch the provider.
        let entry_exists = chain.cache.lock().unwrap().contains_key(&WeatherChain::cache_key(&p));
        assert!(entry_exists);
    }

    #[test]
    fn higher_wind_and_waves_raise_cost_multiplier() {
        let calm = WeatherSample {
            wind_speed_knots: 0.0,
            wind_direction_deg: 0.0,
            wave_height_m: 0.0,
            current_speed_ms: 0.0,
            current_direction_deg: 0.0,
            sst_c: 25.0,
            source_tag: "test",
        };
        let rough = WeatherSample {
            wind_speed_knots: 30.0,
            wind_direction_deg: 0.0,
            wave_height_m: 4.0,
            current_speed_ms: 0.0,
            current_direction_deg: 0.0,
            sst_c: 25.0,
            source_tag: "test",
        };
        assert!(rough.cost_multiplier() > calm.cost_multiplier());
    }

    #[test]
    fn wave_height_estimate_increases_with_wind() {
        assert!(estimate_wave_height_m(5.0) < estimate_wave_height_m(25.0));
        assert!(estimate_wave_height_m(25.0) < estimate_wave_height_m(45.0));
    }
}
