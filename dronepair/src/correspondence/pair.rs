//! One full view-pair generation cycle.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::renderer::{RenderError, SceneRenderer, ViewId};
use super::validator::{Correspondence, CorrespondenceValidator};
use crate::camera::{Anchor, CameraPair, CameraPlacer};
use crate::clock::SharedRng;
use crate::location::ResolvedLocation;
use crate::lookup::AsyncHttpClient;
use crate::service::{GenerationError, LocationService};

/// Errors from pair generation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PairError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// Every attempt produced an invalid correspondence.
    #[error("no usable view pair after {attempts} attempts")]
    NoValidPair { attempts: u32 },
}

/// A landmark, the two cameras looking at it and how well it lines up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewPair {
    pub location: ResolvedLocation,
    pub anchor: Anchor,
    pub poses: CameraPair,
    pub correspondence: Correspondence,
}

/// Places cameras around a location, renders both views and classifies
/// the anchor's projections.
#[derive(Debug, Clone)]
pub struct PairGenerator {
    placer: CameraPlacer,
    validator: CorrespondenceValidator,
    rng: SharedRng,
}

impl PairGenerator {
    pub fn new(placer: CameraPlacer, validator: CorrespondenceValidator, rng: SharedRng) -> Self {
        Self {
            placer,
            validator,
            rng,
        }
    }

    pub fn placer(&self) -> &CameraPlacer {
        &self.placer
    }

    pub fn validator(&self) -> &CorrespondenceValidator {
        &self.validator
    }

    /// Runs one cycle for a known location.
    pub fn generate_for<R: SceneRenderer + ?Sized>(
        &self,
        location: ResolvedLocation,
        renderer: &mut R,
    ) -> Result<ViewPair, RenderError> {
        let anchor = Anchor::new(location.coordinate);
        let poses = self.rng.with(|rng| self.placer.place(&anchor, rng));

        for (view, pose) in ViewId::BOTH.into_iter().zip(poses.poses()) {
            renderer.set_camera_pose(view, pose)?;
            renderer.render_frame(view)?;
        }

        let correspondence = self.validator.correspondence(
            anchor,
            renderer.project_to_screen(ViewId::First, anchor.position),
            renderer.project_to_screen(ViewId::Second, anchor.position),
            renderer.viewport(ViewId::First),
            renderer.viewport(ViewId::Second),
        );

        debug!(
            name = %location.name,
            bearing_diff = poses.bearing_difference_deg(),
            classification = %correspondence.classification,
            "View pair generated"
        );

        Ok(ViewPair {
            location,
            anchor,
            poses,
            correspondence,
        })
    }

    /// Obtains a location from `service` and runs one cycle.
    pub async fn generate<C, R>(
        &self,
        service: &LocationService<C>,
        renderer: &mut R,
    ) -> Result<ViewPair, PairError>
    where
        C: AsyncHttpClient + 'static,
        R: SceneRenderer + ?Sized,
    {
        let location = service.generate_random_location().await?;
        Ok(self.generate_for(location, renderer)?)
    }

    /// Repeats [`generate`](Self::generate) until the pair is not
    /// [`Invalid`](super::Classification::Invalid).
    ///
    /// Location and render failures end the loop immediately.
    pub async fn generate_valid<C, R>(
        &self,
        service: &LocationService<C>,
        renderer: &mut R,
        max_attempts: u32,
    ) -> Result<ViewPair, PairError>
    where
        C: AsyncHttpClient + 'static,
        R: SceneRenderer + ?Sized,
    {
        let attempts = max_attempts.max(1);
        for attempt in 1..=attempts {
            let pair = self.generate(service, renderer).await?;
            if pair.correspondence.is_correct() {
                return Ok(pair);
            }
            debug!(attempt, attempts, "Discarding invalid view pair");
        }
        Err(PairError::NoValidPair { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraPose, PlacementConfig};
    use crate::clock::ManualClock;
    use crate::coord::Coordinate;
    use crate::correspondence::{Classification, PinholeRenderer, ScreenPoint, Viewport};
    use crate::location::{test_source, JitterConfig};
    use crate::lookup::{HttpResponse, MockAsyncHttpClient};
    use crate::prefetch::PrefetchConfig;
    use crate::service::ConsumerConfig;
    use glam::DVec3;

    const BODY: &[u8] = br#"{"elements":[{"center":{"lat":48.0,"lon":2.0}}]}"#;

    fn generator() -> PairGenerator {
        PairGenerator::new(
            CameraPlacer::new(PlacementConfig::default()).unwrap(),
            CorrespondenceValidator::default(),
            SharedRng::seeded(3),
        )
    }

    fn service() -> LocationService<MockAsyncHttpClient> {
        let source = test_source(
            MockAsyncHttpClient::always(Ok(HttpResponse::ok(BODY.to_vec()))),
            JitterConfig::disabled(),
            ManualClock::starting_now(),
        );
        LocationService::new(source, PrefetchConfig::default(), ConsumerConfig::default())
    }

    /// Renderer that never sees the anchor.
    struct BlindRenderer {
        frames: u32,
    }

    impl SceneRenderer for BlindRenderer {
        fn viewport(&self, _view: ViewId) -> Viewport {
            Viewport::new(800.0, 600.0)
        }

        fn set_camera_pose(&mut self, _view: ViewId, _pose: &CameraPose) -> Result<(), RenderError> {
            Ok(())
        }

        fn render_frame(&mut self, _view: ViewId) -> Result<(), RenderError> {
            self.frames += 1;
            Ok(())
        }

        fn project_to_screen(&self, _view: ViewId, _point: DVec3) -> Option<ScreenPoint> {
            None
        }
    }

    struct BrokenRenderer;

    impl SceneRenderer for BrokenRenderer {
        fn viewport(&self, _view: ViewId) -> Viewport {
            Viewport::new(800.0, 600.0)
        }

        fn set_camera_pose(&mut self, _view: ViewId, _pose: &CameraPose) -> Result<(), RenderError> {
            Err(RenderError("device lost".to_string()))
        }

        fn render_frame(&mut self, _view: ViewId) -> Result<(), RenderError> {
            Ok(())
        }

        fn project_to_screen(&self, _view: ViewId, _point: DVec3) -> Option<ScreenPoint> {
            None
        }
    }

    fn location() -> ResolvedLocation {
        ResolvedLocation::new(Coordinate::new(48.0, 2.0), None, chrono::Utc::now())
    }

    #[test]
    fn test_pinhole_pair_is_ideal() {
        let mut renderer = PinholeRenderer::default();
        let pair = generator().generate_for(location(), &mut renderer).unwrap();

        assert_eq!(pair.correspondence.classification, Classification::Ideal);
        assert_eq!(renderer.frames_rendered(), 2);
        assert_eq!(pair.anchor.coordinate, Coordinate::new(48.0, 2.0));
        let diff = pair.poses.bearing_difference_deg();
        assert!((30.0..=120.0).contains(&diff), "bearing diff {}", diff);
    }

    #[test]
    fn test_missing_projection_is_invalid() {
        let mut renderer = BlindRenderer { frames: 0 };
        let pair = generator().generate_for(location(), &mut renderer).unwrap();
        assert_eq!(pair.correspondence.classification, Classification::Invalid);
        assert_eq!(renderer.frames, 2);
    }

    #[test]
    fn test_render_failure_propagates() {
        let err = generator()
            .generate_for(location(), &mut BrokenRenderer)
            .unwrap_err();
        assert_eq!(err, RenderError("device lost".to_string()));
    }

    #[tokio::test]
    async fn test_generate_uses_service_location() {
        let service = service();
        let mut renderer = PinholeRenderer::default();

        let pair = generator().generate(&service, &mut renderer).await.unwrap();
        assert_eq!(pair.location.coordinate, Coordinate::new(48.0, 2.0));
        assert!(pair.correspondence.is_correct());
        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_generate_valid_gives_up() {
        let service = service();
        let mut renderer = BlindRenderer { frames: 0 };

        let err = generator()
            .generate_valid(&service, &mut renderer, 3)
            .await
            .unwrap_err();
        assert_eq!(err, PairError::NoValidPair { attempts: 3 });
        assert_eq!(renderer.frames, 6);
        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let source = test_source(
            MockAsyncHttpClient::always(Ok(HttpResponse::status(503))),
            JitterConfig::disabled(),
            ManualClock::starting_now(),
        );
        let service = LocationService::new(
            source,
            PrefetchConfig::default(),
            ConsumerConfig {
                sync_attempts: 2,
                ..ConsumerConfig::default()
            },
        );

        let err = generator()
            .generate(&service, &mut PinholeRenderer::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PairError::Generation(GenerationError::Exhausted { attempts: 2 })
        );
        service.shutdown().await;
    }
}
