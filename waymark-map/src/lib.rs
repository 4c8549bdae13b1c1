//! Platform-agnostic map component
//!
//! `MapView` takes waypoints, a region and optional route/pen paths, clusters the
//! waypoints for the visible region, turns features into marker descriptors and
//! drives a [`MapBackend`]. Two backends implement the same contract: a native map
//! SDK model and a web GL map SDK model. Which one `PlatformMap` uses is decided at
//! build time by the `web` feature, so callers never branch on platform.

pub mod backend;
pub mod camera;
pub mod marker;
pub mod overlay;
pub mod props;
pub mod snapshot;
pub mod view;

pub use backend::{BackendKind, Container, MapBackend, NativeBackend, WebBackend, WebCamera};
pub use marker::{MarkerContext, MarkerDescriptor, MarkerKey, MarkerRenderer, MarkerShape};
pub use overlay::{OverlayScene, RouteOverlay, RouteStyle};
pub use props::{GestureSettings, MapCallbacks, MapProps, PressEvent};
pub use snapshot::{Snapshot, SnapshotOptions, SnapshotOutput};
pub use view::{EventFlow, MapEvent, MapHandle, MapView};

use waymark_common::config;

#[cfg(not(feature = "web"))]
pub type PlatformBackend = NativeBackend;

#[cfg(feature = "web")]
pub type PlatformBackend = WebBackend;

/// The map component for the platform this crate was built for
pub type PlatformMap = MapView<PlatformBackend>;

/// Build the platform map from the installed configuration
pub fn platform_map(props: MapProps) -> PlatformMap {
    let config = config::global();
    MapView::with_config(PlatformBackend::new(config), props, config)
}
