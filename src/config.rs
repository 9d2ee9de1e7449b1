//! User preferences for the annotator.
//!
//! Loaded once per run from a JSON file (or defaults) and passed explicitly
//! into the pipeline; nothing reads configuration ambiently.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Preferences controlling node placement and image naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefs {
    /// Accepted `id` values for an existing insertion node, in priority
    /// order. The first entry is also the default `id`/`class` for nodes
    /// this tool creates.
    pub node_element_id: Vec<String>,
    /// Tag name used when a new insertion node has to be created.
    pub node_element_tagname: String,
    /// Optional `epub:type` annotation for created nodes.
    pub node_element_type: Option<String>,
    /// Asset name template for the marker image. Supports `{pagename}` and
    /// `{pagename_noext}` placeholders.
    pub imagepath_fmt: String,
    /// Content-probability heuristic constants.
    pub score: ScoreConfig,
    /// Edge length of one QR module in pixels.
    pub qr_module_px: u32,
}

impl Default for Prefs {
    fn default() -> Self {
        Self {
            node_element_id: vec![
                "qrtracker".to_string(),
                "qrtrack".to_string(),
                "filidel".to_string(),
            ],
            node_element_tagname: "aside".to_string(),
            node_element_type: None,
            imagepath_fmt: "filidelqr-{pagename_noext}.png".to_string(),
            score: ScoreConfig::default(),
            qr_module_px: 8,
        }
    }
}

/// Constants of the chapter-content heuristic.
///
/// These are empirically tuned values carried over unchanged from the
/// original tool; they are exposed here rather than hard-coded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Starting score for every page.
    pub base: f32,
    /// Pages at least this many raw bytes are accepted at the base score
    /// without further inspection.
    pub large_page_bytes: usize,
    /// Added when the page declares the `epub` namespace.
    pub semantic_bonus: f32,
    /// Subtracted per element typed `introduction`.
    pub introduction_penalty: f32,
    /// Added when the page contains no `img`/`svg` elements.
    pub no_image_bonus: f32,
    /// Multiplier for the image-count / byte-size density penalty.
    pub image_density_scale: f32,
    /// Minimum score for a page to be treated as a chapter.
    pub min_score: f32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            base: 0.8,
            large_page_bytes: 10240,
            semantic_bonus: 0.3,
            introduction_penalty: 0.7,
            no_image_bonus: 0.3,
            image_density_scale: 1024.0,
            min_score: 0.3,
        }
    }
}

impl Prefs {
    /// Load preferences from a JSON file.
    ///
    /// Missing fields fall back to their defaults, so a prefs file only
    /// needs to list the values it overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// First configured insertion-node identifier.
    pub fn primary_id(&self) -> &str {
        self.node_element_id
            .first()
            .map(String::as_str)
            .unwrap_or("qrtracker")
    }

    /// Marker asset name for a page, derived from the filename template.
    pub fn marker_name(&self, page_name: &str) -> String {
        let base = crate::util::basename(page_name);
        let noext = crate::util::basename_noext(page_name);
        self.imagepath_fmt
            .replace("{pagename}", base)
            .replace("{pagename_noext}", noext)
    }
}
