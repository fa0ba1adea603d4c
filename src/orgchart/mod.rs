//! Org chart generation.
//!
//! The pipeline turns an [`Organization`] into a PNG sized for a slide:
//!
//! 1. describe the staff tree as a Graphviz graph ([`GraphBuilder`])
//! 2. lay it out with the external `dot` program ([`LayoutEngine`])
//! 3. fit the SVG to the target aspect ratio and inject CSS ([`svg`])
//! 4. rasterize the SVG ([`raster`])
//!
//! ```no_run
//! use dex::orgchart::{OrgChartParams, Organization, generate_org_chart};
//!
//! # async fn example(org: Organization) -> dex::Result<()> {
//! let params = OrgChartParams::new(org, "svg > rect { fill: white; }").with_prune(false);
//! let chart = generate_org_chart(&params).await?;
//! std::fs::write("org.png", &chart.png)?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod config;
pub mod graph;
pub mod layout;
pub mod model;
pub mod raster;
pub mod svg;
pub mod traverse;

use tracing::info;

use crate::common::{Error, Result};

pub use builder::GraphBuilder;
pub use config::OrgChartOptions;
pub use graph::Graph;
pub use layout::LayoutEngine;
pub use model::{Direction, Justification, NamedPhone, NamedUrl, Organization, Person, StaffMember};
pub use traverse::{find_person_by_value, prune_staff, traverse_staff, visit_staff};

/// What to chart and how to highlight it.
#[derive(Debug, Clone)]
pub struct OrgChartParams {
    pub organization: Organization,
    /// Stylesheet embedded into the SVG
    pub css: String,
    /// People highlighted strongly (`accent` class)
    pub accented_people: Vec<Person>,
    /// People highlighted less strongly (`note` class)
    pub noteworthy_people: Vec<Person>,
    /// Drop everyone not linked to an accented or noteworthy person
    pub prune: bool,
    pub width_inches: Option<f64>,
    pub height_inches: Option<f64>,
    pub pixels_per_inch: Option<f64>,
}

impl OrgChartParams {
    pub fn new(organization: Organization, css: impl Into<String>) -> Self {
        Self {
            organization,
            css: css.into(),
            accented_people: Vec::new(),
            noteworthy_people: Vec::new(),
            prune: false,
            width_inches: None,
            height_inches: None,
            pixels_per_inch: None,
        }
    }

    #[inline]
    pub fn with_accented_people(mut self, people: Vec<Person>) -> Self {
        self.accented_people = people;
        self
    }

    #[inline]
    pub fn with_noteworthy_people(mut self, people: Vec<Person>) -> Self {
        self.noteworthy_people = people;
        self
    }

    #[inline]
    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    #[inline]
    pub fn with_size_inches(mut self, width: f64, height: f64) -> Self {
        self.width_inches = Some(width);
        self.height_inches = Some(height);
        self
    }

    #[inline]
    pub fn with_pixels_per_inch(mut self, pixels_per_inch: f64) -> Self {
        self.pixels_per_inch = Some(pixels_per_inch);
        self
    }

    /// `options` with this call's size and density overrides applied.
    fn resolve(&self, options: &OrgChartOptions) -> OrgChartOptions {
        let mut resolved = options.clone();
        if let Some(width) = self.width_inches {
            resolved.width_inches = width;
        }
        if let Some(height) = self.height_inches {
            resolved.height_inches = height;
        }
        if let Some(ppi) = self.pixels_per_inch {
            resolved.pixels_per_inch = ppi;
        }
        resolved
    }
}

/// A generated org chart.
#[derive(Debug, Clone)]
pub struct OrgChart {
    pub graph: Graph,
    /// The DOT text handed to the layout engine
    pub dot: String,
    /// Normalized SVG
    pub svg: Vec<u8>,
    pub png: Vec<u8>,
}

/// Runs the org chart pipeline with fixed options and layout engine.
#[derive(Debug, Clone, Default)]
pub struct OrgChartGenerator {
    options: OrgChartOptions,
    engine: LayoutEngine,
}

impl OrgChartGenerator {
    pub fn new(options: OrgChartOptions, engine: LayoutEngine) -> Self {
        Self { options, engine }
    }

    pub fn options(&self) -> &OrgChartOptions {
        &self.options
    }

    /// Build the graph only, without running the layout engine.
    pub fn build_graph(&self, params: &OrgChartParams) -> Result<Graph> {
        let options = params.resolve(&self.options);
        build_graph(params, &options)
    }

    pub async fn generate(&self, params: &OrgChartParams) -> Result<OrgChart> {
        let options = params.resolve(&self.options);
        let org_name = params.organization.org_name.as_str();

        let graph = build_graph(params, &options)?;
        let dot = graph.to_dot();
        let raw_svg = self.engine.render_svg(&dot).await?;

        let aspect_ratio = options.width_inches / options.height_inches;
        let svg = svg::normalize_svg(&raw_svg, aspect_ratio, &params.css)?;

        let width = pixels(options.width_inches, options.pixels_per_inch)?;
        let height = pixels(options.height_inches, options.pixels_per_inch)?;
        let png = {
            let svg = svg.clone();
            tokio::task::spawn_blocking(move || raster::rasterize_png(&svg, width, height))
                .await
                .map_err(|e| Error::Raster(e.to_string()))??
        };

        info!(org = org_name, width, height, "rendered org chart");
        Ok(OrgChart {
            graph,
            dot,
            svg,
            png,
        })
    }
}

fn build_graph(params: &OrgChartParams, options: &OrgChartOptions) -> Result<Graph> {
    let organization = &params.organization;
    let pruned;
    let staff = if params.prune {
        pruned = prune_staff(
            &organization.staff,
            &params.accented_people,
            &params.noteworthy_people,
        );
        pruned.as_slice()
    } else {
        organization.staff.as_slice()
    };

    GraphBuilder::new(organization, staff, options)
        .with_accented(&params.accented_people)
        .with_noteworthy(&params.noteworthy_people)
        .build()
}

fn pixels(inches: f64, pixels_per_inch: f64) -> Result<u32> {
    let pixels = (inches * pixels_per_inch).round();
    if !(1.0..=f64::from(u32::MAX)).contains(&pixels) {
        return Err(Error::Raster(format!(
            "invalid raster size {inches} in at {pixels_per_inch} px/in"
        )));
    }
    Ok(pixels as u32)
}

/// Generate an org chart with the default dimensions and `dot` on `PATH`.
pub async fn generate_org_chart(params: &OrgChartParams) -> Result<OrgChart> {
    OrgChartGenerator::default().generate(params).await
}
