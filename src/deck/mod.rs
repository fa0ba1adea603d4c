//! Deck assembly.
//!
//! [`DeckBuilder::build`] runs the whole pipeline:
//!
//! 1. load and merge the data paths
//! 2. store the meeting date in the data
//! 3. generate every configured org chart concurrently
//! 4. optionally save the charts' DOT, SVG and PNG next to the deck
//! 5. render the template, swap images and write the deck

mod config;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Days, Local, NaiveDate};
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::common::{Error, Result};
use crate::data;
use crate::orgchart::{OrgChart, OrgChartGenerator, OrgChartParams, Organization, Person};
use crate::template::filters::parse_date;
use crate::template::value::Value;
use crate::template::{ReplacementImage, Templater, TemplaterOptions};

pub use config::{DEFAULT_OUTPUT_NAME, DeckConfig, ImageConfig, OrgChartConfig};

/// Data pointer of the meeting object.
const MEETING_POINTER: &str = "/meeting";

/// When the meeting takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingDate {
    Today,
    Tomorrow,
    On(NaiveDate),
}

impl MeetingDate {
    /// The calendar date relative to `today`.
    pub fn resolve(self, today: NaiveDate) -> NaiveDate {
        match self {
            MeetingDate::Today => today,
            MeetingDate::Tomorrow => today.checked_add_days(Days::new(1)).unwrap_or(today),
            MeetingDate::On(date) => date,
        }
    }
}

impl FromStr for MeetingDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "today" => Ok(MeetingDate::Today),
            "tomorrow" => Ok(MeetingDate::Tomorrow),
            other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
                .map(MeetingDate::On)
                .map_err(|_| {
                    Error::Config(format!(
                        "invalid meeting date '{other}': expected 'today', 'tomorrow' or YYYY-MM-DD"
                    ))
                }),
        }
    }
}

impl fmt::Display for MeetingDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeetingDate::Today => f.write_str("today"),
            MeetingDate::Tomorrow => f.write_str("tomorrow"),
            MeetingDate::On(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Inputs of one deck build.
#[derive(Debug, Clone, Default)]
pub struct DeckRequest {
    /// Data files or directories, merged in order
    pub data_paths: Vec<PathBuf>,
    /// Overrides the configured template
    pub template_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub meeting_date: Option<MeetingDate>,
    /// Write each org chart's DOT, SVG and PNG to the output directory
    pub save_org_charts: bool,
}

impl DeckRequest {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_paths.push(path.into());
        self
    }

    #[inline]
    pub fn with_template_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_file = Some(path.into());
        self
    }

    #[inline]
    pub fn with_meeting_date(mut self, date: MeetingDate) -> Self {
        self.meeting_date = Some(date);
        self
    }

    #[inline]
    pub fn with_save_org_charts(mut self, save: bool) -> Self {
        self.save_org_charts = save;
        self
    }
}

/// Files produced by a deck build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckOutput {
    pub deck_path: PathBuf,
    /// Saved org chart artifacts, if requested
    pub artifacts: Vec<PathBuf>,
}

/// Assembles decks from one configuration.
#[derive(Debug, Clone, Default)]
pub struct DeckBuilder {
    config: DeckConfig,
    generator: OrgChartGenerator,
    templater_options: TemplaterOptions,
}

impl DeckBuilder {
    pub fn new(config: DeckConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[inline]
    pub fn with_generator(mut self, generator: OrgChartGenerator) -> Self {
        self.generator = generator;
        self
    }

    #[inline]
    pub fn with_templater_options(mut self, options: TemplaterOptions) -> Self {
        self.templater_options = options;
        self
    }

    pub fn config(&self) -> &DeckConfig {
        &self.config
    }

    pub async fn build(&self, request: &DeckRequest) -> Result<DeckOutput> {
        let template = request
            .template_file
            .clone()
            .or_else(|| self.config.template.clone())
            .ok_or_else(|| Error::Config("no template file configured".to_string()))?;
        if request.data_paths.is_empty() {
            return Err(Error::Config("no data paths given".to_string()));
        }

        let mut data = data::load_data_paths(&request.data_paths).await?;
        let today = Local::now().date_naive();
        if let Some(meeting_date) = request.meeting_date {
            let date = meeting_date.resolve(today);
            if !set_meeting_date(&mut data, date) {
                warn!(%date, "data has no meeting object; meeting date not stored");
            }
        }

        let org_name = data
            .get("orgName")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::Data("data has no 'orgName' string".to_string()))?
            .to_string();
        let date = meeting_date_of(&data).unwrap_or(today);

        let params = try_join_all(
            self.config
                .org_charts
                .iter()
                .map(|chart| org_chart_params(&data, chart)),
        )
        .await?;
        let charts =
            try_join_all(params.iter().map(|params| self.generator.generate(params))).await?;

        tokio::fs::create_dir_all(&request.output_dir).await?;
        let artifacts = if request.save_org_charts {
            save_org_charts(&request.output_dir, &self.config.org_charts, &params, &charts).await?
        } else {
            Vec::new()
        };

        let mut images: Vec<ReplacementImage> = self
            .config
            .org_charts
            .iter()
            .zip(charts)
            .map(|(chart, generated)| ReplacementImage {
                old_image_md5: chart.md5.clone(),
                old_image_extension: chart.extension.clone(),
                new_image_buffer: generated.png,
            })
            .collect();
        images.extend(try_join_all(self.config.images.iter().map(load_image)).await?);

        let deck_path = request
            .output_dir
            .join(output_file_name(self.config.output_name(), &org_name, date));
        let mut templater =
            Templater::create_with_options(&template, self.templater_options.clone()).await?;
        templater.render_json(&data)?;
        templater.replace_images(&images)?;
        templater.generate_output_file(&deck_path).await?;

        info!(deck = %deck_path.display(), charts = params.len(), images = images.len(), "deck built");
        Ok(DeckOutput {
            deck_path,
            artifacts,
        })
    }
}

/// Build a deck with the default org chart generator and templater options.
pub async fn build_deck(config: DeckConfig, request: &DeckRequest) -> Result<DeckOutput> {
    DeckBuilder::new(config).build(request).await
}

/// Store `date` as `YYYY-MM-DD` at `/meeting/date`. Returns `false` when the
/// data has no meeting object.
pub fn set_meeting_date(data: &mut JsonValue, date: NaiveDate) -> bool {
    match data.pointer_mut(MEETING_POINTER) {
        Some(JsonValue::Object(meeting)) => {
            meeting.insert(
                "date".to_string(),
                JsonValue::String(date.format("%Y-%m-%d").to_string()),
            );
            true
        },
        _ => false,
    }
}

/// The calendar date of `/meeting/date`, if it parses as a date.
pub fn meeting_date_of(data: &JsonValue) -> Option<NaiveDate> {
    let value = data.pointer("/meeting/date")?;
    parse_date(&Value::from(value)).map(|date| date.date_naive())
}

/// Replace characters that are invalid in file names with `!`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '!',
            c if c.is_control() => '!',
            c => c,
        })
        .collect()
}

/// Expand `{orgName}` and `{date}` in an output name pattern.
pub fn output_file_name(pattern: &str, org_name: &str, date: NaiveDate) -> String {
    pattern
        .replace("{orgName}", &sanitize_file_name(org_name))
        .replace("{date}", &date.format("%Y-%m-%d").to_string())
}

fn lookup<T: DeserializeOwned>(data: &JsonValue, pointer: &str, what: &str) -> Result<Option<T>> {
    let Some(value) = data.pointer(pointer) else {
        return Ok(None);
    };
    serde_json::from_value(value.clone())
        .map(Some)
        .map_err(|e| Error::Data(format!("{what} at '{pointer}': {e}")))
}

fn people(data: &JsonValue, pointer: Option<&str>) -> Result<Vec<Person>> {
    let Some(pointer) = pointer else {
        return Ok(Vec::new());
    };
    let people = lookup::<Vec<Person>>(data, pointer, "people")?;
    if people.is_none() {
        debug!(pointer, "no people at pointer");
    }
    Ok(people.unwrap_or_default())
}

async fn org_chart_params(data: &JsonValue, chart: &OrgChartConfig) -> Result<OrgChartParams> {
    let organization: Organization = lookup(data, &chart.organization, "organization")?
        .ok_or_else(|| Error::Data(format!("no organization at '{}'", chart.organization)))?;
    let css = match &chart.css {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => String::new(),
    };

    let mut params = OrgChartParams::new(organization, css)
        .with_accented_people(people(data, chart.accented.as_deref())?)
        .with_noteworthy_people(people(data, chart.noteworthy.as_deref())?)
        .with_prune(chart.prune);
    params.width_inches = chart.width_inches;
    params.height_inches = chart.height_inches;
    params.pixels_per_inch = chart.pixels_per_inch;
    Ok(params)
}

async fn load_image(image: &ImageConfig) -> Result<ReplacementImage> {
    Ok(ReplacementImage {
        old_image_md5: image.md5.clone(),
        old_image_extension: image.extension.clone(),
        new_image_buffer: tokio::fs::read(&image.source).await?,
    })
}

async fn save_org_charts(
    dir: &Path,
    configs: &[OrgChartConfig],
    params: &[OrgChartParams],
    charts: &[OrgChart],
) -> Result<Vec<PathBuf>> {
    let mut files: Vec<(PathBuf, &[u8])> = Vec::with_capacity(charts.len() * 3);
    for ((config, params), chart) in configs.iter().zip(params).zip(charts) {
        let name = config
            .name
            .as_deref()
            .unwrap_or(params.organization.org_name.as_str());
        let stem = format!("{} Org Chart", sanitize_file_name(name));
        files.push((dir.join(format!("{stem}.dot")), chart.dot.as_bytes()));
        files.push((dir.join(format!("{stem}.svg")), chart.svg.as_slice()));
        files.push((dir.join(format!("{stem}.png")), chart.png.as_slice()));
    }

    try_join_all(
        files
            .iter()
            .map(|(path, bytes)| tokio::fs::write(path, bytes)),
    )
    .await?;
    debug!(files = files.len(), "saved org chart artifacts");
    Ok(files.into_iter().map(|(path, _)| path).collect())
}
