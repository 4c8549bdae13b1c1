//! Cluster and leaf features returned by viewport queries

use serde_json::{json, Map, Value};
use waymark_common::{Coordinate, Waypoint};

use crate::index::ClusterId;

/// A single waypoint rendered on its own
#[derive(Debug, Clone, PartialEq)]
pub struct LeafFeature {
    /// Position of the waypoint in the caller's list
    pub index: usize,
    /// The waypoint's identity (explicit id or positional fallback)
    pub id: String,
    pub coordinate: Coordinate,
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_filtered: Option<bool>,
    pub marker_color: Option<String>,
}

impl LeafFeature {
    pub fn from_waypoint(waypoint: &Waypoint, index: usize) -> Self {
        Self {
            index,
            id: waypoint.key(index),
            coordinate: waypoint.coordinate(),
            title: waypoint.title.clone(),
            description: waypoint.description.clone(),
            is_filtered: waypoint.is_filtered,
            marker_color: waypoint.marker_color.clone(),
        }
    }
}

/// Several nearby waypoints merged at the queried zoom
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterFeature {
    pub id: ClusterId,
    /// Weighted centroid of the merged points
    pub coordinate: Coordinate,
    pub point_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Leaf(LeafFeature),
    Cluster(ClusterFeature),
}

impl Feature {
    pub fn is_cluster(&self) -> bool {
        matches!(self, Feature::Cluster(_))
    }

    pub fn coordinate(&self) -> Coordinate {
        match self {
            Feature::Leaf(leaf) => leaf.coordinate,
            Feature::Cluster(cluster) => cluster.coordinate,
        }
    }

    /// Number of waypoints this feature stands for
    pub fn point_count(&self) -> usize {
        match self {
            Feature::Leaf(_) => 1,
            Feature::Cluster(cluster) => cluster.point_count,
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafFeature> {
        match self {
            Feature::Leaf(leaf) => Some(leaf),
            Feature::Cluster(_) => None,
        }
    }

    /// GeoJSON `Feature` with a `cluster` flag in its properties
    pub fn to_geojson(&self) -> Value {
        let coordinate = self.coordinate();
        let mut properties = Map::new();
        match self {
            Feature::Cluster(cluster) => {
                properties.insert("cluster".into(), Value::Bool(true));
                properties.insert("cluster_id".into(), Value::String(cluster.id.to_string()));
                properties.insert("point_count".into(), json!(cluster.point_count));
                properties.insert(
                    "point_count_abbreviated".into(),
                    Value::String(abbreviate_count(cluster.point_count)),
                );
            }
            Feature::Leaf(leaf) => {
                properties.insert("cluster".into(), Value::Bool(false));
                properties.insert("id".into(), Value::String(leaf.id.clone()));
                properties.insert("index".into(), json!(leaf.index));
                if let Some(title) = &leaf.title {
                    properties.insert("title".into(), Value::String(title.clone()));
                }
                if let Some(filtered) = leaf.is_filtered {
                    properties.insert("isFiltered".into(), Value::Bool(filtered));
                }
            }
        }

        json!({
            "type": "Feature",
            "geometry": {
                "type": "Point",
                "coordinates": [coordinate.longitude, coordinate.latitude],
            },
            "properties": Value::Object(properties),
        })
    }
}

/// GeoJSON `FeatureCollection` of query results
pub fn feature_collection(features: &[Feature]) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": features.iter().map(Feature::to_geojson).collect::<Vec<_>>(),
    })
}

/// Badge text: `7`, `1.2k`, `34k`
pub fn abbreviate_count(count: usize) -> String {
    if count >= 10_000 {
        format!("{}k", (count as f64 / 1000.0).round())
    } else if count >= 1000 {
        format!("{}k", (count as f64 / 100.0).round() / 10.0)
    } else {
        count.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviate_count() {
        assert_eq!(abbreviate_count(7), "7");
        assert_eq!(abbreviate_count(999), "999");
        assert_eq!(abbreviate_count(1234), "1.2k");
        assert_eq!(abbreviate_count(34_499), "34k");
    }

    #[test]
    fn test_leaf_geojson() {
        let waypoint = Waypoint::new(50.0, 4.0).with_title("Parking").with_filtered(false);
        let feature = Feature::Leaf(LeafFeature::from_waypoint(&waypoint, 3));
        let geojson = feature.to_geojson();

        assert_eq!(geojson["geometry"]["coordinates"], json!([4.0, 50.0]));
        assert_eq!(geojson["properties"]["cluster"], json!(false));
        assert_eq!(geojson["properties"]["id"], json!("waypoint-3"));
        assert_eq!(geojson["properties"]["title"], json!("Parking"));
        assert_eq!(geojson["properties"]["isFiltered"], json!(false));
    }

    #[test]
    fn test_cluster_geojson() {
        let feature = Feature::Cluster(ClusterFeature {
            id: ClusterId::new(4, 12),
            coordinate: Coordinate::new(1.0, 2.0),
            point_count: 1500,
        });
        let geojson = feature.to_geojson();

        assert_eq!(geojson["properties"]["cluster"], json!(true));
        assert_eq!(geojson["properties"]["cluster_id"], json!("z4-12"));
        assert_eq!(geojson["properties"]["point_count"], json!(1500));
        assert_eq!(geojson["properties"]["point_count_abbreviated"], json!("1.5k"));
        assert_eq!(feature.point_count(), 1500);
    }
}
