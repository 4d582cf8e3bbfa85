//! Fuel/voyage model (spec.md C6): cubic speed-consumption law, vessel
//! catalog, and speed-scenario comparison.

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};

/// A single vessel class's physical and consumption characteristics,
/// ported from the reference vessel specification table (spec.md §2.3
/// supplemented feature).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub design_speed_knots: f64,
    pub max_speed_knots: f64,
    pub nominal_consumption_t_per_day: f64,
    pub fuel_tank_capacity_t: f64,
    pub wave_sensitivity_factor: f64,
}

/// Injectable source of vessel specifications (spec.md C6's `VesselCatalog`).
pub trait VesselCatalog: Send + Sync {
    fn get(&self, vessel_id: &str) -> Option<VesselSpec>;
}

/// In-memory catalog of the nine reference vessel classes; the default
/// `VesselCatalog` so the crate is runnable without external wiring.
pub struct DefaultVesselCatalog {
    vessels: Vec<VesselSpec>,
}

impl Default for DefaultVesselCatalog {
    fn default() -> Self {
        Self {
            vessels: build_catalog(),
        }
    }
}

impl VesselCatalog for DefaultVesselCatalog {
    fn get(&self, vessel_id: &str) -> Option<VesselSpec> {
        self.vessels.iter().find(|v| v.id == vessel_id).cloned()
    }
}

impl DefaultVesselCatalog {
    pub fn all(&self) -> &[VesselSpec] {
        &self.vessels
    }
}

fn build_catalog() -> Vec<VesselSpec> {
    vec![
        VesselSpec {
            id: "container_4000",
            name: "Container Ship 4000 TEU",
            design_speed_knots: 17.5,
            max_speed_knots: 20.0,
            nominal_consumption_t_per_day: 58.0,
            fuel_tank_capacity_t: 3000.0,
            wave_sensitivity_factor: 1.2,
        },
        VesselSpec {
            id: "container_10000",
            name: "Container Ship 10000 TEU",
            design_speed_knots: 19.0,
            max_speed_knots: 20.5,
            nominal_consumption_t_per_day: 220.0,
            fuel_tank_capacity_t: 4750.0,
            wave_sensitivity_factor: 1.3,
        },
        VesselSpec {
            id: "container_14000",
            name: "Container Ship 14000 TEU (Neo-Panamax)",
            design_speed_knots: 19.5,
            max_speed_knots: 22.0,
            nominal_consumption_t_per_day: 280.0,
            fuel_tank_capacity_t: 6000.0,
            wave_sensitivity_factor: 1.25,
        },
        VesselSpec {
            id: "bulk_50k",
            name: "Bulk Carrier 50000 DWT",
            design_speed_knots: 14.0,
            max_speed_knots: 15.0,
            nominal_consumption_t_per_day: 42.0,
            fuel_tank_capacity_t: 2500.0,
            wave_sensitivity_factor: 1.15,
        },
        VesselSpec {
            id: "bulk_75k",
            name: "Bulk Carrier 75000 DWT (Capesize)",
            design_speed_knots: 13.5,
            max_speed_knots: 14.5,
            nominal_consumption_t_per_day: 65.0,
            fuel_tank_capacity_t: 3500.0,
            wave_sensitivity_factor: 1.18,
        },
        VesselSpec {
            id: "tanker_aframax",
            name: "Tanker Aframax (40000 DWT)",
            design_speed_knots: 14.5,
            max_speed_knots: 15.5,
            nominal_consumption_t_per_day: 38.0,
            fuel_tank_capacity_t: 2300.0,
            wave_sensitivity_factor: 1.20,
        },
        VesselSpec {
            id: "tanker_vlcc",
            name: "Tanker VLCC (300000 DWT)",
            design_speed_knots: 15.0,
            max_speed_knots: 15.5,
            nominal_consumption_t_per_day: 210.0,
            fuel_tank_capacity_t: 8000.0,
            wave_sensitivity_factor: 1.22,
        },
        VesselSpec {
            id: "general_cargo",
            name: "General Cargo Ship 26700 DWT",
            design_speed_knots: 14.5,
            max_speed_knots: 16.0,
            nominal_consumption_t_per_day: 31.0,
            fuel_tank_capacity_t: 1800.0,
            wave_sensitivity_factor: 1.25,
        },
        VesselSpec {
            id: "roro",
            name: "Ro-Ro Ship 5000 CEU",
            design_speed_knots: 20.0,
            max_speed_knots: 22.0,
            nominal_consumption_t_per_day: 95.0,
            fuel_tank_capacity_t: 2000.0,
            wave_sensitivity_factor: 1.35,
        },
    ]
}

/// Tons of CO2 emitted per ton of fuel burned.
pub const CO2_PER_FUEL_TON: f64 = 3.17;

/// Approximate fuel cost, USD per metric ton, used only for the
/// supplemented speed-scenario comparison's cost column.
const FUEL_COST_USD_PER_TON: f64 = 450.0;

/// Computed metrics for one voyage leg or whole route (spec.md C6 output).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VoyageMetrics {
    pub distance_nm: f64,
    pub time_hours: f64,
    pub fuel_tons: f64,
    pub co2_tons: f64,
    pub tanks_needed: f64,
    pub sufficient_fuel: bool,
}

/// One row of a speed-scenario comparison (spec.md §2.3 supplemented feature).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpeedScenario {
    pub speed_knots: f64,
    pub time_days: f64,
    pub fuel_tons: f64,
    pub co2_tons: f64,
    pub cost_usd: f64,
}

pub struct FuelVoyageModel<'a> {
    vessel: &'a VesselSpec,
}

impl<'a> FuelVoyageModel<'a> {
    pub fn new(vessel: &'a VesselSpec) -> Self {
        Self { vessel }
    }

    /// Daily fuel burn (t/day) at `speed_knots` under `weather_factor`
    /// and `load_factor`, following the cubic consumption law
    /// `Fuel = Fuel_base * (V/V_design)^3 * (0.6 + 0.4*load) * weather`.
    pub fn daily_consumption_t(&self, speed_knots: f64, weather_factor: f64, load_factor: f64) -> f64 {
        let speed_ratio = speed_knots / self.vessel.design_speed_knots;
        let speed_factor = speed_ratio.powi(3);
        let load_adjusted = 0.6 + 0.4 * load_factor;
        self.vessel.nominal_consumption_t_per_day * speed_factor * load_adjusted * weather_factor
    }

    /// Cost of one leg of `distance_nm` travelled at `speed_knots`.
    pub fn segment_cost(&self, distance_nm: f64, speed_knots: f64, weather_factor: f64, load_factor: f64) -> Result<VoyageMetrics> {
        if speed_knots <= 0.0 {
            return Err(PlanError::UnknownVessel(format!(
                "non-positive speed {speed_knots} for vessel {}",
                self.vessel.id
            )));
        }

        let time_hours = distance_nm / speed_knots;
        let time_days = time_hours / 24.0;
        let daily = self.daily_consumption_t(speed_knots, weather_factor, load_factor);
        let fuel_tons = daily * time_days;
        let co2_tons = fuel_tons * CO2_PER_FUEL_TON;
        let tanks_needed = if self.vessel.fuel_tank_capacity_t > 0.0 {
            fuel_tons / self.vessel.fuel_tank_capacity_t
        } else {
            0.0
        };

        Ok(VoyageMetrics {
            distance_nm,
            time_hours,
            fuel_tons,
            co2_tons,
            tanks_needed,
            sufficient_fuel: fuel_tons <= self.vessel.fuel_tank_capacity_t,
        })
    }

    /// Compares fuel/time/CO2/cost across candidate speeds and reports
    /// the most economical by fuel burned (spec.md §2.3 supplemented
    /// `compare_speeds`).
    pub fn compare_speeds(&self, distance_nm: f64, speeds_knots: &[f64], weather_factor: f64) -> Result<Vec<SpeedScenario>> {
        speeds_knots
            .iter()
            .map(|&speed| {
                let metrics = self.segment_cost(distance_nm, speed, weather_factor, 1.0)?;
                Ok(SpeedScenario {
                    speed_knots: speed,
                    time_days: metrics.time_hours / 24.0,
                    fuel_tons: metrics.fuel_tons,
                    co2_tons: metrics.co2_tons,
                    cost_usd: metrics.fuel_tons * FUEL_COST_USD_PER_TON,
                })
            })
            .collect()
    }
}

/// Sums per-leg metrics into a whole-route total.
pub fn accumulate(legs: &[VoyageMetrics]) -> VoyageMetrics {
    let mut total = VoyageMetrics {
        distance_nm: 0.0,
        time_hours: 0.0,
        fuel_tons: 0.0,
        co2_tons: 0.0,
        tanks_needed: 0.0,
        sufficient_fuel: true,
    };
    for leg in legs {
        total.distance_nm += leg.distance_nm;
        total.time_hours += leg.time_hours;
        total.fuel_tons += leg.fuel_tons;
        total.co2_tons += leg.co2_tons;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup_by_id() {
        let catalog = DefaultVesselCatalog::default();
        assert!(catalog.get("container_10000").is_some());
        assert!(catalog.get("not_a_vessel").is_none());
    }

    #[test]
    fn doubling_speed_increases_fuel_roughly_eightfold() {
        let vessel = DefaultVesselCatalog::default().get("container_4000").unwrap();
        let model = FuelVoyageModel::new(&vessel);
        let at_design = model.daily_consumption_t(vessel.design_speed_knots, 1.0, 1.0);
        let at_double = model.daily_consumption_t(vessel.design_speed_knots * 2.0, 1.0, 1.0);
        let ratio = at_double / at_design;
        assert!((ratio - 8.0).abs() < 1e-6);
    }

    #[test]
    fn weather_factor_scales_consumption_linearly() {
        let vessel = DefaultVesselCatalog::default().get("bulk_50k").unwrap();
        let model = FuelVoyageModel::new(&vessel);
        let calm = model.daily_consumption_t(vessel.design_speed_knots, 1.0, 1.0);
        let stormy = model.daily_consumption_t(vessel.design_speed_knots, 2.0, 1.0);
        assert!((stormy - calm * 2.0).abs() < 1e-9);
    }

    #[test]
    fn segment_cost_rejects_non_positive_speed() {
        let vessel = DefaultVesselCatalog::default().get("roro").unwrap();
        let model = FuelVoyageModel::new(&vessel);
        assert!(model.segment_cost(100.0, 0.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn compare_speeds_flags_most_economical() {
        let vessel = DefaultVesselCatalog::default().get("container_4000").unwrap();
        let model = FuelVoyageModel::new(&vessel);
        let scenarios = model.compare_speeds(1000.0, &[12.0, 17.5, 20.0], 1.0).unwrap();
        let cheapest = scenarios.iter().min_by(|a, b| a.fuel_tons.partial_cmp(&b.fuel_tons).unwrap()).unwrap();
        assert_eq!(cheapest.speed_knots, 12.0);
    }
}
