use maritime_router::orchestrator::{AlgorithmHint, PlanRequest, RouteOrchestrator};
use maritime_router::Coordinate;
use std::time::Instant;

fn main() {
    env_logger::init();
    println!("--- Maritime Router CLI Debugger ---");

    let start = Coordinate::new(19.076, 72.877); // Mumbai
    let destination = Coordinate::new(13.194, 80.282); // Chennai

    let orchestrator = RouteOrchestrator::default();

    for (label, hint) in [
        ("auto (sampling -> grid A* fallback)", AlgorithmHint::Auto),
        ("forced grid A*", AlgorithmHint::GridAStarOnly),
    ] {
        println!("\n--- Plan: {label} ---");
        let start_time = Instant::now();

        let request = PlanRequest::new(start, destination, "container_10000")
            .with_algorithm_hint(hint)
            .with_seed(42);

        match orchestrator.plan_route(request) {
            Ok(result) => {
                let duration = start_time.elapsed();
                println!("Algorithm selected: {}", result.diagnostics.algorithm_selected);
                println!("Waypoints: {}", result.waypoints.len());
                println!(
                    "Distance: {:.1} nm (straight line {:.1} nm, efficiency {:.2})",
                    result.metrics.distance_nm,
                    result.diagnostics.straight_line_nm,
                    result.diagnostics.efficiency_vs_straight_line
                );
                println!(
                    "Time: {:.1} h, fuel: {:.1} t, CO2: {:.1} t, risk: {}",
                    result.metrics.time_hours,
                    result.metrics.fuel_tons,
                    result.metrics.co2_tons,
                    result.diagnostics.risk_assessment
                );
                println!("Planning time: {duration:?}");

                if let Some(first) = result.waypoints.first() {
                    println!("First waypoint: lat {:.4}, lon {:.4}", first.lat, first.lon);
                }

                let replanned = orchestrator.replan_route(result.route_id, &[]);
                match replanned {
                    Ok(Some(r)) => println!("Replan (no obstacles): {:.1} nm", r.metrics.distance_nm),
                    Ok(None) => println!("Replan found no alternative"),
                    Err(e) => println!("Replan failed: {e}"),
                }
            }
            Err(e) => println!("Plan failed: {e}"),
        }
    }

    println!("\nDebug completed.");
}
