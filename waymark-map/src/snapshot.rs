//! SVG snapshots of a native map scene
//!
//! Draws the retained scene with an equirectangular projection of the snapshot
//! region: polylines first, then overlay indicators, then markers on top.

use std::fmt::Write as _;
use std::path::PathBuf;

use waymark_common::{Coordinate, Region, Result};

use crate::marker::{MarkerDescriptor, MarkerShape};
use crate::overlay::{LineCap, LineJoin, OverlayScene};

pub const SVG_MIME: &str = "image/svg+xml";

const BACKGROUND: &str = "#eef2f4";
const FONT_FAMILY: &str = "sans-serif";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SnapshotOutput {
    /// Keep the image bytes in memory
    #[default]
    Inline,
    /// Write the image to this path
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotOptions {
    pub width: u32,
    pub height: u32,
    /// Region to draw; `None` uses the map's current region
    pub region: Option<Region>,
    pub output: SnapshotOutput,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            region: None,
            output: SnapshotOutput::Inline,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub width: u32,
    pub height: u32,
    pub mime: &'static str,
    pub data: Vec<u8>,
    /// Set when the snapshot was written to a file
    pub path: Option<PathBuf>,
}

impl Snapshot {
    /// Render the scene and deliver it as `options.output` asks
    pub fn capture(
        options: &SnapshotOptions,
        region: &Region,
        markers: &[MarkerDescriptor],
        overlay: &OverlayScene,
    ) -> Result<Self> {
        let svg = render_svg(region, options.width, options.height, markers, overlay);
        let path = match &options.output {
            SnapshotOutput::Inline => None,
            SnapshotOutput::File(path) => {
                std::fs::write(path, svg.as_bytes())?;
                tracing::debug!(path = %path.display(), bytes = svg.len(), "snapshot written");
                Some(path.clone())
            }
        };

        Ok(Self {
            width: options.width,
            height: options.height,
            mime: SVG_MIME,
            data: svg.into_bytes(),
            path,
        })
    }
}

struct Projector {
    west: f64,
    north: f64,
    lng_span: f64,
    lat_span: f64,
    width: f64,
    height: f64,
}

impl Projector {
    fn new(region: &Region, width: u32, height: u32) -> Self {
        let [west, _, _, north] = region.bounds();
        Self {
            west,
            north,
            lng_span: region.longitude_delta.max(f64::EPSILON),
            lat_span: region.latitude_delta.max(f64::EPSILON),
            width: f64::from(width),
            height: f64::from(height),
        }
    }

    fn project(&self, coordinate: &Coordinate) -> (f64, f64) {
        (
            (coordinate.longitude - self.west) / self.lng_span * self.width,
            (self.north - coordinate.latitude) / self.lat_span * self.height,
        )
    }
}

/// Render the scene as a standalone SVG document
pub fn render_svg(
    region: &Region,
    width: u32,
    height: u32,
    markers: &[MarkerDescriptor],
    overlay: &OverlayScene,
) -> String {
    let projector = Projector::new(region, width, height);
    let mut svg = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(svg, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        svg,
        r#"<svg width="{width}" height="{height}" viewBox="0 0 {width} {height}" xmlns="http://www.w3.org/2000/svg">"#
    );
    let _ = writeln!(
        svg,
        r#"  <rect width="{width}" height="{height}" fill="{BACKGROUND}"/>"#
    );

    for line in &overlay.polylines {
        let points: Vec<String> = line
            .coordinates
            .iter()
            .map(|c| {
                let (x, y) = projector.project(c);
                format!("{x:.2},{y:.2}")
            })
            .collect();
        let cap = match line.cap {
            LineCap::Butt => "butt",
            LineCap::Round => "round",
        };
        let join = match line.join {
            LineJoin::Miter => "miter",
            LineJoin::Round => "round",
        };
        let _ = writeln!(
            svg,
            r#"  <polyline points="{}" fill="none" stroke="{}" stroke-width="{}" stroke-linecap="{cap}" stroke-linejoin="{join}"/>"#,
            points.join(" "),
            line.color,
            line.width
        );
    }

    for marker in &overlay.markers {
        let (x, y) = projector.project(&marker.coordinate);
        let _ = writeln!(
            svg,
            r#"  <circle cx="{x:.2}" cy="{y:.2}" r="{}" fill="{}"/>"#,
            f64::from(marker.size) / 2.0,
            marker.color
        );
    }

    for marker in markers {
        let (x, y) = projector.project(&marker.coordinate);
        let radius = f64::from(marker.size) / 2.0;
        let _ = writeln!(
            svg,
            r#"  <circle cx="{x:.2}" cy="{y:.2}" r="{radius}" fill="{}" stroke="{}" stroke-width="{}">"#,
            marker.color, marker.border.color, marker.border.width
        );
        if let Some(title) = &marker.title {
            let _ = writeln!(svg, "    <title>{}</title>", escape(title));
        }
        let _ = writeln!(svg, "  </circle>");

        if marker.shape == MarkerShape::ClusterBadge {
            if let Some(label) = &marker.label {
                let _ = writeln!(
                    svg,
                    r#"  <text x="{x:.2}" y="{y:.2}" font-family="{FONT_FAMILY}" font-size="12px" text-anchor="middle" dominant-baseline="central" fill="{}">{}</text>"#,
                    marker.label_color.unwrap_or(marker.border.color),
                    escape(label)
                );
            }
        }
    }

    svg.push_str("</svg>\n");
    svg
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
