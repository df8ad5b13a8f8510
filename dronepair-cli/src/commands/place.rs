//! Place command - camera pair around a fixed coordinate.

use dronepair::clock::{Clock, SharedRng, SystemClock};
use dronepair::coord::Coordinate;
use dronepair::correspondence::PinholeRenderer;
use dronepair::location::ResolvedLocation;
use dronepair::service::ServiceBuilder;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the place command.
pub struct PlaceArgs {
    pub lat: f64,
    pub lon: f64,
    pub seed: Option<u64>,
    pub json: bool,
}

/// Run the place command.
pub fn run(runner: &CliRunner, args: PlaceArgs) -> Result<(), CliError> {
    runner.log_startup("place");
    let config = runner.config();

    let coordinate =
        Coordinate::checked(args.lat, args.lon).map_err(|e| CliError::Argument(e.to_string()))?;
    let rng = args.seed.map(SharedRng::seeded).unwrap_or_default();
    let generator = ServiceBuilder::new(config).rng(rng).pair_generator()?;

    let location = ResolvedLocation::new(coordinate, None, SystemClock.now());
    let mut renderer = PinholeRenderer::default();
    let pair = generator
        .generate_for(location, &mut renderer)
        .map_err(|e| CliError::Pair(e.into()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&pair)?);
        return Ok(());
    }

    println!("Anchor: {}", pair.location.name);
    for (label, pose) in [("Camera 1", &pair.poses.first), ("Camera 2", &pair.poses.second)] {
        println!("{}:", label);
        println!("  Position:  {}", pose.coordinate);
        println!("  Height:    {:.1} m", pose.height_m);
        println!("  Distance:  {:.1} m", pose.distance_m);
        println!("  Bearing:   {:.1}°", pose.bearing_deg);
        println!("  Heading:   {:.1}°", pose.heading_deg());
        println!("  Pitch:     {:.1}°", pose.pitch_deg());
    }
    println!(
        "Bearing difference: {:.1}°",
        pair.poses.bearing_difference_deg()
    );
    for (label, point) in [
        ("Camera 1", pair.correspondence.first),
        ("Camera 2", pair.correspondence.second),
    ] {
        match point {
            Some(p) => println!("{} projection: ({:.1}, {:.1})", label, p.x, p.y),
            None => println!("{} projection: not visible", label),
        }
    }
    println!("Classification: {}", pair.correspondence.classification);
    Ok(())
}
