/// Configuration options for template rendering.
///
/// # Examples
///
/// ```rust
/// use dex::template::TemplaterOptions;
///
/// // Defaults: `{{` / `}}` delimiters, paragraph loops enabled
/// let options = TemplaterOptions::default();
///
/// // Or customize
/// let options = TemplaterOptions::new()
///     .with_delimiters("[[", "]]")
///     .with_paragraph_loop(false);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplaterOptions {
    /// Opening placeholder delimiter
    pub start_delimiter: String,
    /// Closing placeholder delimiter
    pub end_delimiter: String,
    /// Drop the paragraphs holding loop tags when each tag sits alone in its paragraph
    pub paragraph_loop: bool,
}

impl Default for TemplaterOptions {
    fn default() -> Self {
        Self {
            start_delimiter: "{{".to_string(),
            end_delimiter: "}}".to_string(),
            paragraph_loop: true,
        }
    }
}

impl TemplaterOptions {
    /// Create a new `TemplaterOptions` with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the placeholder delimiters.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dex::template::TemplaterOptions;
    ///
    /// let options = TemplaterOptions::new().with_delimiters("<<", ">>");
    /// assert_eq!(options.start_delimiter, "<<");
    /// ```
    #[inline]
    pub fn with_delimiters(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_delimiter = start.into();
        self.end_delimiter = end.into();
        self
    }

    /// Set whether loop tags alone in a paragraph remove that paragraph.
    #[inline]
    pub fn with_paragraph_loop(mut self, enabled: bool) -> Self {
        self.paragraph_loop = enabled;
        self
    }
}
