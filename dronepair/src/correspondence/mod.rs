//! Rendering-side view pair generation and correspondence checks.
//!
//! A [`PairGenerator`] takes a resolved landmark, places two cameras looking
//! at it, asks a [`SceneRenderer`] to draw both views and projects the
//! anchor back onto each screen. The [`CorrespondenceValidator`] then
//! decides whether the anchor is comfortably visible in both frames
//! ([`Classification::Ideal`]), only barely on screen
//! ([`Classification::Forced`]) or unusable ([`Classification::Invalid`]).

mod pair;
mod renderer;
mod validator;

pub use pair::{PairError, PairGenerator, ViewPair};
pub use renderer::{
    PinholeRenderer, RenderError, SceneRenderer, ViewId, DEFAULT_HORIZONTAL_FOV_DEG,
};
pub use validator::{
    Classification, Correspondence, CorrespondenceValidator, ScreenPoint, Viewport,
    DEFAULT_SAFE_MARGIN,
};
