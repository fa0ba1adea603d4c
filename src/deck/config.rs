//! Deck configuration files.
//!
//! ```yaml
//! template: template.pptx
//! outputName: "{orgName} Cadence {date}.pptx"
//! orgCharts:
//!   - name: Vendor
//!     organization: /vendor
//!     css: vendor.css
//!     accented: /meeting/invitees
//!     noteworthy: /meeting/noteworthyPeople
//!     prune: true
//!     md5: 806d699051334f4bb806bd8584979894
//!     extension: png
//! images:
//!   - md5: 4ee110e505b11ef1ca5f98fabebe8e2f
//!     extension: png
//!     source: images/logo.png
//! ```
//!
//! Paths are relative to the configuration file's directory. Data locations
//! (`organization`, `accented`, `noteworthy`) are JSON pointers into the
//! merged data object.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};
use crate::data::DataFormat;

/// Default output file name pattern.
pub const DEFAULT_OUTPUT_NAME: &str = "{orgName} Cadence {date}.pptx";

/// One org chart to generate and substitute into the deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrgChartConfig {
    /// Artifact file-name stem; defaults to the organization's name
    #[serde(default)]
    pub name: Option<String>,
    /// JSON pointer to the organization; `""` is the data root
    pub organization: String,
    /// Stylesheet file embedded into the SVG
    #[serde(default)]
    pub css: Option<PathBuf>,
    /// JSON pointer to a list of people to accent
    #[serde(default)]
    pub accented: Option<String>,
    /// JSON pointer to a list of noteworthy people
    #[serde(default)]
    pub noteworthy: Option<String>,
    #[serde(default)]
    pub prune: bool,
    /// MD5 of the placeholder image the chart replaces
    pub md5: String,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub width_inches: Option<f64>,
    #[serde(default)]
    pub height_inches: Option<f64>,
    #[serde(default)]
    pub pixels_per_inch: Option<f64>,
}

/// A static image substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImageConfig {
    pub md5: String,
    #[serde(default)]
    pub extension: Option<String>,
    /// File holding the new image
    pub source: PathBuf,
}

/// Describes how a deck is assembled.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeckConfig {
    /// Template archive
    #[serde(default)]
    pub template: Option<PathBuf>,
    /// Output file name pattern with `{orgName}` and `{date}` variables
    #[serde(default)]
    pub output_name: Option<String>,
    #[serde(default)]
    pub org_charts: Vec<OrgChartConfig>,
    #[serde(default)]
    pub images: Vec<ImageConfig>,
}

impl DeckConfig {
    /// Parse configuration text.
    pub fn parse(text: &str, format: DataFormat) -> Result<Self> {
        parse_config(text, format).map_err(Error::Config)
    }

    /// Load a configuration file, resolving its relative paths.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = DataFormat::from_path(path).ok_or_else(|| {
            Error::Config(format!(
                "unsupported configuration file extension: {}",
                path.display()
            ))
        })?;
        let text = tokio::fs::read_to_string(path).await?;
        let config = parse_config(&text, format)
            .map_err(|message| Error::Config(format!("{}: {message}", path.display())))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.resolve_paths(base))
    }

    /// Make relative paths relative to `base`.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        if let Some(template) = self.template.as_mut() {
            resolve(template);
        }
        for chart in &mut self.org_charts {
            if let Some(css) = chart.css.as_mut() {
                resolve(css);
            }
        }
        for image in &mut self.images {
            resolve(&mut image.source);
        }
        self
    }

    #[inline]
    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = Some(template.into());
        self
    }

    #[inline]
    pub fn with_org_chart(mut self, chart: OrgChartConfig) -> Self {
        self.org_charts.push(chart);
        self
    }

    #[inline]
    pub fn with_image(mut self, image: ImageConfig) -> Self {
        self.images.push(image);
        self
    }

    pub fn output_name(&self) -> &str {
        self.output_name.as_deref().unwrap_or(DEFAULT_OUTPUT_NAME)
    }
}

fn parse_config(text: &str, format: DataFormat) -> std::result::Result<DeckConfig, String> {
    match format {
        DataFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        DataFormat::Yaml => serde_saphyr::from_str(text).map_err(|e| e.to_string()),
    }
}
