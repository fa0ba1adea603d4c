//! Dex - assembles customer slide decks from presentation templates
//!
//! A deck is built from three inputs: a template presentation with
//! `{{placeholder}}` expressions, a structured data object loaded from JSON
//! or YAML files, and org chart images generated from the data.
//!
//! # Features
//!
//! - **Template rendering**: placeholders, sections and loops evaluated
//!   against arbitrary nested data, with `case`, `date`, `limit`, `orderBy`,
//!   `partition` and `where` filters
//! - **Image replacement**: embedded media located by content hash and
//!   swapped for new bytes
//! - **Org charts**: staff trees laid out with Graphviz, fitted to the slide's
//!   aspect ratio and rasterized to PNG
//! - **Data loading**: file or directory data sources with `$ref` pointers
//!
//! # Example - Rendering a template
//!
//! ```no_run
//! use dex::template::Templater;
//!
//! # async fn example() -> dex::Result<()> {
//! let mut templater = Templater::create("template.pptx").await?;
//! templater.render_json(&serde_json::json!({
//!     "orgName": "Acme",
//!     "people": [{"name": "Ada"}, {"name": "Bob"}]
//! }))?;
//! templater.generate_output_file("out/Acme.pptx").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Building a deck
//!
//! ```no_run
//! use dex::deck::{DeckConfig, DeckRequest, MeetingDate, build_deck};
//!
//! # async fn example() -> dex::Result<()> {
//! let config = DeckConfig::load("deck.yaml").await?;
//! let request = DeckRequest::new("out")
//!     .with_data_path("data/acme")
//!     .with_meeting_date(MeetingDate::Tomorrow);
//! let output = build_deck(config, &request).await?;
//! println!("wrote {}", output.deck_path.display());
//! # Ok(())
//! # }
//! ```

/// Shared error type and XML helpers
pub mod common;

/// Ordered, mutable view of zip-packaged documents
pub mod archive;

/// Placeholder expressions, filters and the archive template renderer
pub mod template;

/// Org chart graph building, layout, SVG normalization and rasterization
pub mod orgchart;

/// JSON/YAML data document loading and merging
pub mod data;

/// Deck configuration and end-to-end assembly
pub mod deck;

pub use common::{Error, Result};
