//! Marker renderer
//!
//! A pure mapping from a clustered feature plus the map's interaction state to the
//! descriptor a backend draws. Color rules, in priority order:
//!
//! 1. `pin` mode: primary
//! 2. `waypoint` mode: start color for the first waypoint, end color for the last
//!    (when there is more than one), primary otherwise
//! 3. `pen` mode: pen color
//! 4. waypoint carries `isFiltered`: primary when filtered, secondary when not
//! 5. selected waypoint: primary; others use their `markerColor`, else secondary

use std::time::Duration;

use serde::Serialize;
use waymark_cluster::feature::abbreviate_count;
use waymark_cluster::{ClusterId, Feature, LeafFeature};
use waymark_common::{Color, Coordinate, DrawingMode, Palette};

/// Diameter of a cluster badge
pub const CLUSTER_BADGE_SIZE: u32 = 36;

/// Duration of the viewport animation after pressing a cluster
pub const CLUSTER_PRESS_ANIMATION: Duration = Duration::from_millis(500);

pub const SELECTED_BORDER_WIDTH: f32 = 3.0;
pub const DEFAULT_BORDER_WIDTH: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerShape {
    Circle,
    ClusterBadge,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Border {
    pub width: f32,
    pub color: Color,
}

/// What a press on a marker refers to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarkerKey {
    Waypoint(String),
    Cluster(ClusterId),
}

/// Everything a backend needs to draw one marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerDescriptor {
    /// Waypoint id, or the cluster handle in text form
    pub id: String,
    #[serde(skip)]
    pub key: MarkerKey,
    pub coordinate: Coordinate,
    pub color: Color,
    /// Advisory diameter in points
    pub size: u32,
    pub shape: MarkerShape,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "labelColor", skip_serializing_if = "Option::is_none")]
    pub label_color: Option<Color>,
    pub border: Border,
    pub selected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MarkerDescriptor {
    pub fn is_cluster(&self) -> bool {
        matches!(self.key, MarkerKey::Cluster(_))
    }
}

/// Interaction state shared by every marker of one render pass
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerContext<'a> {
    pub drawing_mode: Option<DrawingMode>,
    pub selected: Option<&'a str>,
    /// Length of the caller's waypoint list
    pub total: usize,
}

/// Advisory marker diameter for a drawing mode
pub fn marker_size(mode: Option<DrawingMode>) -> u32 {
    match mode {
        Some(DrawingMode::Pin) => 16,
        Some(DrawingMode::Waypoint) => 14,
        Some(DrawingMode::Pen) => 8,
        None => 10,
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarkerRenderer {
    palette: Palette,
}

impl MarkerRenderer {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Fill color of an individual waypoint marker
    pub fn leaf_color(&self, leaf: &LeafFeature, ctx: &MarkerContext<'_>) -> Color {
        let palette = &self.palette;
        match ctx.drawing_mode {
            Some(DrawingMode::Pin) => palette.primary,
            Some(DrawingMode::Waypoint) => {
                if leaf.index == 0 {
                    palette.start
                } else if ctx.total > 1 && leaf.index == ctx.total - 1 {
                    palette.end
                } else {
                    palette.primary
                }
            }
            Some(DrawingMode::Pen) => palette.pen,
            None => match leaf.is_filtered {
                Some(true) => palette.primary,
                Some(false) => palette.secondary,
                None if is_selected(leaf, ctx) => palette.primary,
                None => leaf
                    .marker_color
                    .as_deref()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(palette.secondary),
            },
        }
    }

    pub fn render(&self, feature: &Feature, ctx: &MarkerContext<'_>) -> MarkerDescriptor {
        match feature {
            Feature::Leaf(leaf) => self.render_leaf(leaf, ctx),
            Feature::Cluster(cluster) => MarkerDescriptor {
                id: cluster.id.to_string(),
                key: MarkerKey::Cluster(cluster.id),
                coordinate: cluster.coordinate,
                color: self.palette.primary,
                size: CLUSTER_BADGE_SIZE,
                shape: MarkerShape::ClusterBadge,
                label: Some(abbreviate_count(cluster.point_count)),
                label_color: Some(self.palette.cluster_text),
                border: Border {
                    width: DEFAULT_BORDER_WIDTH,
                    color: self.palette.neutral,
                },
                selected: false,
                title: None,
                description: None,
            },
        }
    }

    pub fn render_all(&self, features: &[Feature], ctx: &MarkerContext<'_>) -> Vec<MarkerDescriptor> {
        features.iter().map(|feature| self.render(feature, ctx)).collect()
    }

    fn render_leaf(&self, leaf: &LeafFeature, ctx: &MarkerContext<'_>) -> MarkerDescriptor {
        let selected = is_selected(leaf, ctx);
        let border = if selected {
            Border {
                width: SELECTED_BORDER_WIDTH,
                color: self.palette.primary,
            }
        } else {
            Border {
                width: DEFAULT_BORDER_WIDTH,
                color: self.palette.neutral,
            }
        };

        MarkerDescriptor {
            id: leaf.id.clone(),
            key: MarkerKey::Waypoint(leaf.id.clone()),
            coordinate: leaf.coordinate,
            color: self.leaf_color(leaf, ctx),
            size: marker_size(ctx.drawing_mode),
            shape: MarkerShape::Circle,
            label: None,
            label_color: None,
            border,
            selected,
            title: leaf.title.clone(),
            description: leaf.description.clone(),
        }
    }
}

fn is_selected(leaf: &LeafFeature, ctx: &MarkerContext<'_>) -> bool {
    ctx.selected == Some(leaf.id.as_str())
}
