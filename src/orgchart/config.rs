/// Dimensions used when laying out and rasterizing org charts.
///
/// The defaults match a 16:9 presentation slide.
///
/// # Examples
///
/// ```rust
/// use dex::orgchart::OrgChartOptions;
///
/// let options = OrgChartOptions::new()
///     .with_size_inches(10.0, 7.5)
///     .with_pixels_per_inch(96.0);
/// assert_eq!(options.width_inches, 10.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OrgChartOptions {
    /// Target graphic width
    pub width_inches: f64,
    /// Target graphic height
    pub height_inches: f64,
    /// Rasterization density
    pub pixels_per_inch: f64,
    /// Padding around the drawing
    pub padding_inches: f64,
    /// Font size of the chart title
    pub graph_font_size: f64,
    /// Font size of team cluster labels
    pub cluster_font_size: f64,
    pub node_width_inches: f64,
    pub node_height_inches: f64,
    pub node_font_size: f64,
}

impl Default for OrgChartOptions {
    fn default() -> Self {
        Self {
            width_inches: 13.333,
            height_inches: 7.5,
            pixels_per_inch: 240.0,
            padding_inches: 0.5,
            graph_font_size: 40.0,
            cluster_font_size: 24.0,
            node_width_inches: 3.25,
            node_height_inches: 0.75,
            node_font_size: 14.0,
        }
    }
}

impl OrgChartOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target graphic size.
    #[inline]
    pub fn with_size_inches(mut self, width: f64, height: f64) -> Self {
        self.width_inches = width;
        self.height_inches = height;
        self
    }

    #[inline]
    pub fn with_pixels_per_inch(mut self, pixels_per_inch: f64) -> Self {
        self.pixels_per_inch = pixels_per_inch;
        self
    }

    /// Set the node box size.
    #[inline]
    pub fn with_node_size_inches(mut self, width: f64, height: f64) -> Self {
        self.node_width_inches = width;
        self.node_height_inches = height;
        self
    }
}
