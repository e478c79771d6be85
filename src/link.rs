//! Neuroglancer viewer links
//!
//! A link is the viewer address followed by `#!` and the viewer state as
//! compact, percent-encoded JSON. Field order in the state is significant to
//! the viewer, so the state is built from structs rather than maps.

use serde::Serialize;

/// Characters the viewer leaves unescaped in the state fragment
const FRAGMENT_SAFE: &str = "~@#$&()*!+=:;,.?/'-_";

#[derive(Debug, Clone, Serialize)]
pub struct ViewerState {
    pub layers: Vec<ImageLayer>,
    pub navigation: Navigation,
    pub layout: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageLayer {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub blend: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Navigation {
    pub pose: Pose,
    #[serde(rename = "zoomFactor")]
    pub zoom_factor: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pose {
    pub position: Position,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub voxel_size: [f64; 3],
    pub voxel_coordinates: [f64; 3],
}

impl ViewerState {
    /// One precomputed image layer served from `server_url`, in a four panel
    /// layout
    pub fn single_image(
        server_url: &str,
        dataset: &str,
        voxel_size: [f64; 3],
        coords: [f64; 3],
        zoom: f64,
    ) -> Self {
        Self {
            layers: vec![ImageLayer {
                source: format!(
                    "precomputed://{}/{}",
                    server_url.trim_end_matches('/'),
                    dataset
                ),
                kind: "image".to_string(),
                blend: "default".to_string(),
                name: dataset.to_string(),
            }],
            navigation: Navigation {
                pose: Pose {
                    position: Position {
                        voxel_size,
                        voxel_coordinates: coords,
                    },
                },
                zoom_factor: zoom,
            },
            layout: "4panel".to_string(),
        }
    }

    /// Encode the state as a link into the viewer at `viewer_url`
    pub fn to_url(&self, viewer_url: &str) -> String {
        // serializing plain structs of strings and floats cannot fail
        let json = serde_json::to_string(self).unwrap_or_default();
        format!(
            "{}/#!{}",
            viewer_url.trim_end_matches('/'),
            encode_fragment(&json)
        )
    }
}

/// Link opening `dataset` from this server in the viewer
pub fn viewer_link(
    viewer_url: &str,
    server_url: &str,
    dataset: &str,
    voxel_size: [f64; 3],
    coords: [f64; 3],
    zoom: f64,
) -> String {
    ViewerState::single_image(server_url, dataset, voxel_size, coords, zoom).to_url(viewer_url)
}

fn encode_fragment(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut buf = [0u8; 4];
    for c in json.chars() {
        if c.is_ascii_alphanumeric() || FRAGMENT_SAFE.contains(c) {
            out.push(c);
        } else {
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    out
}
