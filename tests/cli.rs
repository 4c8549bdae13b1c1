//! End-to-end tests of the preview CLI

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

const CITY: &str = "50.85,4.35,0.5,0.5";

/// Writes five waypoints a few meters apart
fn write_waypoints(dir: &Path) -> PathBuf {
    let waypoints: Vec<Value> = (0..5)
        .map(|i| {
            serde_json::json!({
                "latitude": 50.85 + i as f64 * 1e-4,
                "longitude": 4.35,
                "id": format!("wp-{i}"),
                "title": format!("Stop {i}"),
            })
        })
        .collect();
    let path = dir.join("waypoints.json");
    std::fs::write(&path, serde_json::to_string(&waypoints).unwrap()).unwrap();
    path
}

fn write_route(dir: &Path) -> PathBuf {
    let path = dir.join("route.json");
    std::fs::write(
        &path,
        r#"[{"latitude": 50.85, "longitude": 4.35}, {"latitude": 50.86, "longitude": 4.37}]"#,
    )
    .unwrap();
    path
}

fn waymark() -> Command {
    let mut cmd = Command::cargo_bin("waymark").unwrap();
    cmd.env_remove("WAYMARK_ACCESS_TOKEN").env_remove("RUST_LOG");
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    waymark()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("clusters"))
        .stdout(predicate::str::contains("expand"))
        .stdout(predicate::str::contains("render"));
}

#[test]
fn test_clusters_outputs_feature_collection() {
    let dir = TempDir::new().unwrap();
    let waypoints = write_waypoints(dir.path());

    let json = stdout_json(waymark().args([
        "clusters",
        "--waypoints",
        waypoints.to_str().unwrap(),
        "--region",
        CITY,
    ]));

    assert_eq!(json["type"], "FeatureCollection");
    let features = json["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["properties"]["cluster"], true);
    assert_eq!(features[0]["properties"]["point_count"], 5);
}

#[test]
fn test_clusters_drawing_mode_returns_every_waypoint() {
    let dir = TempDir::new().unwrap();
    let waypoints = write_waypoints(dir.path());

    let json = stdout_json(waymark().args([
        "clusters",
        "--waypoints",
        waypoints.to_str().unwrap(),
        "--region",
        CITY,
        "--mode",
        "pen",
    ]));
    let features = json["features"].as_array().unwrap();
    assert_eq!(features.len(), 5);
    assert!(features.iter().all(|f| f["properties"]["cluster"] == false));
}

#[test]
fn test_expand_cluster_from_clusters_output() {
    let dir = TempDir::new().unwrap();
    let waypoints = write_waypoints(dir.path());

    let clusters = stdout_json(waymark().args([
        "clusters",
        "--waypoints",
        waypoints.to_str().unwrap(),
        "--region",
        CITY,
    ]));
    let cluster_id = clusters["features"][0]["properties"]["cluster_id"]
        .as_str()
        .unwrap()
        .to_string();

    let expansion = stdout_json(waymark().args([
        "expand",
        "--waypoints",
        waypoints.to_str().unwrap(),
        "--cluster",
        &cluster_id,
    ]));
    assert_eq!(expansion["cluster"], cluster_id.as_str());
    assert_eq!(expansion["leaves"].as_array().unwrap().len(), 5);
    assert!(expansion["region"]["latitudeDelta"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_expand_unknown_cluster_fails() {
    let dir = TempDir::new().unwrap();
    let waypoints = write_waypoints(dir.path());

    waymark()
        .args([
            "expand",
            "--waypoints",
            waypoints.to_str().unwrap(),
            "--cluster",
            "z3-999",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("z3-999"));
}

#[test]
fn test_expand_cluster_beyond_zoom_range_fails() {
    let dir = TempDir::new().unwrap();
    let waypoints = write_waypoints(dir.path());

    for id in ["z30-0", "z16-0"] {
        waymark()
            .args([
                "expand",
                "--waypoints",
                waypoints.to_str().unwrap(),
                "--cluster",
                id,
            ])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains(id))
            .stderr(predicate::str::contains("panicked").not());
    }
}

#[test]
fn test_render_rejects_out_of_range_route_point() {
    let dir = TempDir::new().unwrap();
    let route = dir.path().join("route.json");
    std::fs::write(&route, r#"[{"latitude": 50.85, "longitude": 200.0}]"#).unwrap();

    waymark()
        .args([
            "render",
            "--backend",
            "native",
            "--route",
            route.to_str().unwrap(),
            "--region",
            CITY,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid coordinate"));
}

#[test]
fn test_invalid_region_is_rejected() {
    let dir = TempDir::new().unwrap();
    let waypoints = write_waypoints(dir.path());

    waymark()
        .args([
            "clusters",
            "--waypoints",
            waypoints.to_str().unwrap(),
            "--region",
            "50.85,4.35",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("lat,lng,latDelta,lngDelta"));
}

#[test]
fn test_render_native_scene_and_snapshot() {
    let dir = TempDir::new().unwrap();
    let waypoints = write_waypoints(dir.path());
    let route = write_route(dir.path());
    let snapshot = dir.path().join("map.svg");

    let scene = stdout_json(waymark().args([
        "render",
        "--backend",
        "native",
        "--waypoints",
        waypoints.to_str().unwrap(),
        "--route",
        route.to_str().unwrap(),
        "--region",
        CITY,
        "--mode",
        "waypoint",
        "--start-end",
        "--snapshot",
        snapshot.to_str().unwrap(),
    ]));

    assert_eq!(scene["backend"], "native");
    assert_eq!(scene["annotations"].as_array().unwrap().len(), 5);
    assert_eq!(scene["polylines"].as_array().unwrap().len(), 1);
    assert_eq!(scene["overlayMarkers"].as_array().unwrap().len(), 2);

    let svg = std::fs::read_to_string(&snapshot).unwrap();
    assert!(svg.contains("<polyline"));
    assert!(svg.contains("Stop 4"));
}

#[test]
fn test_render_web_requires_access_token() {
    let dir = TempDir::new().unwrap();
    let waypoints = write_waypoints(dir.path());

    waymark()
        .args([
            "render",
            "--backend",
            "web",
            "--waypoints",
            waypoints.to_str().unwrap(),
            "--region",
            CITY,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not be initialized"));
}

#[test]
fn test_render_web_with_config() {
    let dir = TempDir::new().unwrap();
    let waypoints = write_waypoints(dir.path());
    let config = dir.path().join("waymark.toml");
    std::fs::write(&config, "access_token = \"pk.test\"\nstyle = \"dark\"\n").unwrap();

    let scene = stdout_json(waymark().args([
        "render",
        "--backend",
        "web",
        "--config",
        config.to_str().unwrap(),
        "--waypoints",
        waypoints.to_str().unwrap(),
        "--region",
        CITY,
    ]));

    assert_eq!(scene["backend"], "web");
    assert_eq!(scene["style"]["url"], "mapbox://styles/mapbox/dark-v11");
    assert!(scene["camera"]["zoom"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_web_backend_rejects_snapshot() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("waymark.toml");
    std::fs::write(&config, "access_token = \"pk.test\"\n").unwrap();

    waymark()
        .args([
            "render",
            "--backend",
            "web",
            "--config",
            config.to_str().unwrap(),
            "--region",
            CITY,
            "--snapshot",
            dir.path().join("map.svg").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("native backend"));
}
