//! Document templating: placeholder expressions, filters and the archive
//! renderer.

mod config;
pub mod expr;
pub mod filters;
pub mod part;
pub mod templater;
pub mod value;

pub use config::TemplaterOptions;
pub use part::PartTemplate;
pub use templater::{MEDIA_DIR, ReplacementImage, Templater, TemplaterState, md5_hex};
pub use value::Value;
