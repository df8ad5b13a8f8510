//! Classification of projected anchor pairs.
//!
//! ```text
//!  0                                   width
//!  ┌─────────────────────────────────────┐ 0
//!  │  forced                             │
//!  │     ┌───────────────────────────┐   │ margin_y
//!  │     │                           │   │
//!  │     │          ideal            │   │
//!  │     │                           │   │
//!  │     └───────────────────────────┘   │ height - margin_y
//!  │                                     │
//!  └─────────────────────────────────────┘ height
//!     outside, or no projection: invalid
//! ```
//!
//! A pair is as good as its worse view.

use serde::{Deserialize, Serialize};

use crate::camera::Anchor;

/// Default safe margin as a fraction of each viewport dimension.
pub const DEFAULT_SAFE_MARGIN: f64 = 0.1;

/// A projected position in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Viewport size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width / 2.0, self.height / 2.0)
    }

    /// Whether `p` lies inside the rectangle inset by `margin` of each side.
    fn contains_inset(&self, p: ScreenPoint, margin: f64) -> bool {
        let mx = self.width * margin;
        let my = self.height * margin;
        p.x >= mx && p.x <= self.width - mx && p.y >= my && p.y <= self.height - my
    }
}

/// Quality of a view pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Anchor well inside both views.
    Ideal,
    /// Anchor visible in both views but near an edge in at least one.
    Forced,
    /// Anchor off-screen or unprojectable in at least one view.
    Invalid,
}

impl Classification {
    pub fn is_correct(&self) -> bool {
        !matches!(self, Classification::Invalid)
    }

    pub fn is_forced_match(&self) -> bool {
        !matches!(self, Classification::Ideal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Ideal => "ideal",
            Classification::Forced => "forced",
            Classification::Invalid => "invalid",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The anchor's projections into both views and their classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub anchor: Anchor,
    pub first: Option<ScreenPoint>,
    pub second: Option<ScreenPoint>,
    pub classification: Classification,
}

impl Correspondence {
    pub fn is_correct(&self) -> bool {
        self.classification.is_correct()
    }

    pub fn is_forced_match(&self) -> bool {
        self.classification.is_forced_match()
    }
}

/// Classifies anchor projections against a safe margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrespondenceValidator {
    safe_margin: f64,
}

impl Default for CorrespondenceValidator {
    fn default() -> Self {
        Self {
            safe_margin: DEFAULT_SAFE_MARGIN,
        }
    }
}

impl CorrespondenceValidator {
    /// Creates a validator; `safe_margin` is clamped to [0, 0.5].
    pub fn new(safe_margin: f64) -> Self {
        let safe_margin = if safe_margin.is_finite() {
            safe_margin.clamp(0.0, 0.5)
        } else {
            DEFAULT_SAFE_MARGIN
        };
        Self { safe_margin }
    }

    pub fn safe_margin(&self) -> f64 {
        self.safe_margin
    }

    /// Classifies a pair of projections into equally sized viewports.
    ///
    /// A missing projection is always [`Classification::Invalid`].
    pub fn classify(
        &self,
        first: Option<ScreenPoint>,
        second: Option<ScreenPoint>,
        width: f64,
        height: f64,
    ) -> Classification {
        let viewport = Viewport::new(width, height);
        self.classify_views(first, second, viewport, viewport)
    }

    /// Classifies a pair of projections, each against its own viewport.
    pub fn classify_views(
        &self,
        first: Option<ScreenPoint>,
        second: Option<ScreenPoint>,
        first_viewport: Viewport,
        second_viewport: Viewport,
    ) -> Classification {
        let (Some(a), Some(b)) = (first, second) else {
            return Classification::Invalid;
        };

        let inside = |margin: f64| {
            first_viewport.contains_inset(a, margin) && second_viewport.contains_inset(b, margin)
        };

        if inside(self.safe_margin) {
            Classification::Ideal
        } else if inside(0.0) {
            Classification::Forced
        } else {
            Classification::Invalid
        }
    }

    /// Classifies and packages the result with its anchor.
    pub fn correspondence(
        &self,
        anchor: Anchor,
        first: Option<ScreenPoint>,
        second: Option<ScreenPoint>,
        first_viewport: Viewport,
        second_viewport: Viewport,
    ) -> Correspondence {
        Correspondence {
            anchor,
            first,
            second,
            classification: self.classify_views(first, second, first_viewport, second_viewport),
        }
    }
}
