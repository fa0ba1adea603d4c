//! XML text helpers used by the template renderer.

mod escape;

pub use escape::{escape_xml, unescape_xml};
