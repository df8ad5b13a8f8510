//! Generate command - produce random landmark locations or view pairs.

use dronepair::clock::SharedRng;
use dronepair::correspondence::{PairGenerator, PinholeRenderer};
use dronepair::location::ResolvedLocation;
use dronepair::lookup::AsyncHttpClient;
use dronepair::service::{LocationService, ServiceBuilder};
use tracing::info;

use crate::error::CliError;
use crate::runner::{install_ctrlc, CliRunner};

/// Invalid pairs tolerated per requested pair before giving up.
const PAIR_ATTEMPTS: u32 = 10;

/// Arguments for the generate command.
pub struct GenerateArgs {
    pub count: usize,
    pub json: bool,
    pub pairs: bool,
    pub seed: Option<u64>,
}

/// Run the generate command.
pub fn run(runner: &CliRunner, args: GenerateArgs) -> Result<(), CliError> {
    runner.log_startup("generate");
    let config = runner.config();

    let rng = args.seed.map(SharedRng::seeded).unwrap_or_default();
    let builder = ServiceBuilder::new(config).rng(rng);
    let pairs = if args.pairs {
        Some(builder.pair_generator()?)
    } else {
        None
    };
    let service = builder.build()?;
    let shutdown = install_ctrlc()?;

    runner.runtime().block_on(async {
        let mut renderer = PinholeRenderer::default();
        let mut produced = 0;

        while produced < args.count {
            let line = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                line = next_line(&service, pairs.as_ref(), &mut renderer, args.json) => line?,
            };
            println!("{}", line);
            produced += 1;
        }

        let status = service.status();
        info!(
            produced,
            requested = args.count,
            queued = status.queue_len,
            lookups = status.produced,
            "Generation finished"
        );
        service.shutdown().await;
        Ok::<(), CliError>(())
    })
}

async fn next_line<C>(
    service: &LocationService<C>,
    pairs: Option<&PairGenerator>,
    renderer: &mut PinholeRenderer,
    json: bool,
) -> Result<String, CliError>
where
    C: AsyncHttpClient + 'static,
{
    match pairs {
        Some(generator) => {
            let pair = generator
                .generate_valid(service, renderer, PAIR_ATTEMPTS)
                .await?;
            if json {
                Ok(serde_json::to_string(&pair)?)
            } else {
                let first = &pair.poses.first;
                let second = &pair.poses.second;
                Ok(format!(
                    "{}  {}  cam1 {:.0}° {:.0} m @ {:.0} m  cam2 {:.0}° {:.0} m @ {:.0} m",
                    pair.location.name,
                    pair.correspondence.classification,
                    first.bearing_deg,
                    first.distance_m,
                    first.height_m,
                    second.bearing_deg,
                    second.distance_m,
                    second.height_m,
                ))
            }
        }
        None => {
            let location = service.generate_random_location().await?;
            if json {
                Ok(serde_json::to_string(&location)?)
            } else {
                Ok(describe(&location))
            }
        }
    }
}

fn describe(location: &ResolvedLocation) -> String {
    format!(
        "{}  ({})",
        location.name,
        location.region.as_deref().unwrap_or("unknown region")
    )
}
