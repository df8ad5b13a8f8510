//! DronePair - paired aerial views of real landmarks
//!
//! This library picks random places inside configured regions, snaps them
//! to the nearest real building through public Overpass instances, keeps a
//! prefetched queue of such landmarks ready, and places two virtual drone
//! cameras looking at each one. The anchor's projection into both rendered
//! views decides whether the pair is usable as correspondence training data.
//!
//! ```ignore
//! use dronepair::config::ConfigFile;
//! use dronepair::service::ServiceBuilder;
//!
//! let config = ConfigFile::load_or_default(&ConfigFile::default_path()?)?;
//! let service = ServiceBuilder::new(&config).build()?;
//! let location = service.generate_random_location().await?;
//! println!("{}", location.name);
//! ```

pub mod cache;
pub mod camera;
pub mod clock;
pub mod config;
pub mod coord;
pub mod correspondence;
pub mod location;
pub mod logging;
pub mod lookup;
pub mod prefetch;
pub mod progress;
pub mod service;
