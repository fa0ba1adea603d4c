//! Archive template renderer.
//!
//! [`Templater`] owns an [`Archive`] and moves through
//! `Loaded → Rendered → Finalized`:
//!
//! ```no_run
//! # use dex::template::{ReplacementImage, Templater};
//! # async fn example() -> dex::Result<()> {
//! let mut templater = Templater::create("template.pptx").await?;
//! templater.render_json(&serde_json::json!({"orgName": "Acme"}))?;
//! templater.replace_images(&[ReplacementImage {
//!     old_image_md5: "0cc175b9c0f1b6a831c399e269772661".to_string(),
//!     old_image_extension: Some("png".to_string()),
//!     new_image_buffer: std::fs::read("chart.png")?,
//! }])?;
//! templater.generate_output_file("out/Acme.pptx").await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use chrono::{DateTime, FixedOffset, Local};
use indexmap::IndexMap;
use md5::{Digest, Md5};
use rayon::prelude::*;
use tracing::{debug, info};

use super::config::TemplaterOptions;
use super::expr::Scope;
use super::part::PartTemplate;
use super::value::Value;
use crate::archive::Archive;
use crate::common::{Error, Result};

/// Directory holding embedded media inside a presentation package.
pub const MEDIA_DIR: &str = "ppt/media/";

const UTIL_KEY: &str = "$util";

/// A request to swap one embedded image for new content.
///
/// The image is addressed by the MD5 of its current bytes because media
/// entries get renamed as a deck is edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementImage {
    /// Hex MD5 of the image to replace.
    pub old_image_md5: String,
    /// Only consider entries whose name ends with this suffix.
    pub old_image_extension: Option<String>,
    pub new_image_buffer: Vec<u8>,
}

/// Lifecycle of a [`Templater`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplaterState {
    Loaded,
    Rendered,
    Finalized,
}

/// Renders data into a zip-packaged document and swaps embedded images.
#[derive(Debug)]
pub struct Templater {
    archive: Archive,
    options: TemplaterOptions,
    state: TemplaterState,
}

impl Templater {
    /// Load a template from disk with default options.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with_options(path, TemplaterOptions::default()).await
    }

    pub async fn create_with_options(
        path: impl AsRef<Path>,
        options: TemplaterOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let templater = Self::from_bytes(&bytes, options)?;
        info!(path = %path.display(), entries = templater.archive.len(), "loaded template");
        Ok(templater)
    }

    /// Load a template from archive bytes.
    pub fn from_bytes(bytes: &[u8], options: TemplaterOptions) -> Result<Self> {
        Ok(Self {
            archive: Archive::from_bytes(bytes)?,
            options,
            state: TemplaterState::Loaded,
        })
    }

    /// Load, render, replace images and write in one go.
    pub async fn execute(
        template_path: impl AsRef<Path>,
        data: &Value,
        replacement_images: &[ReplacementImage],
        output_path: impl AsRef<Path>,
    ) -> Result<()> {
        let mut templater = Self::create(template_path).await?;
        templater.render(data)?;
        templater.replace_images(replacement_images)?;
        templater.generate_output_file(output_path).await
    }

    pub fn state(&self) -> TemplaterState {
        self.state
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn options(&self) -> &TemplaterOptions {
        &self.options
    }

    /// Render a JSON data object.
    pub fn render_json(&mut self, data: &serde_json::Value) -> Result<()> {
        self.render(&Value::from(data))
    }

    /// Render every XML part against `data`.
    ///
    /// Besides the data, templates can use `$util.now`, the local time at
    /// which rendering started. Parts without placeholders are left intact.
    pub fn render(&mut self, data: &Value) -> Result<()> {
        if self.state != TemplaterState::Loaded {
            return Err(Error::InvalidState(format!(
                "render requires a freshly loaded template (state: {:?})",
                self.state
            )));
        }

        let data = with_helpers(data, Local::now().fixed_offset());
        let scope = Scope::root(&data);

        let xml_parts: Vec<String> = self
            .archive
            .files()
            .filter(|(name, _)| name.ends_with(".xml"))
            .map(|(name, _)| name.to_string())
            .collect();

        let mut rendered_parts = 0usize;
        let mut tags = 0usize;
        for name in xml_parts {
            let Some(bytes) = self.archive.get(&name) else {
                continue;
            };
            let Ok(xml) = std::str::from_utf8(bytes) else {
                debug!(part = %name, "skipping non UTF-8 part");
                continue;
            };
            let Some(template) = PartTemplate::compile(xml, &self.options)? else {
                continue;
            };

            let rendered = template.render(&scope)?;
            debug!(part = %name, tags = template.tag_count(), "rendered part");
            tags += template.tag_count();
            rendered_parts += 1;
            self.archive.set(name, rendered.into_bytes());
        }

        info!(parts = rendered_parts, tags, "rendered template");
        self.state = TemplaterState::Rendered;
        Ok(())
    }

    /// Replace the first media entry whose content hash matches.
    pub fn replace_image(&mut self, image: &ReplacementImage) -> Result<()> {
        if self.state == TemplaterState::Finalized {
            return Err(Error::InvalidState(
                "cannot replace images after the output was generated".to_string(),
            ));
        }

        let key = find_media_by_md5(
            &self.archive,
            &image.old_image_md5,
            image.old_image_extension.as_deref(),
        )
        .ok_or_else(|| Error::ImageNotFound {
            md5: image.old_image_md5.clone(),
            extension: image.old_image_extension.clone(),
        })?;

        info!(entry = %key, md5 = %image.old_image_md5, bytes = image.new_image_buffer.len(), "replaced image");
        self.archive.set(key, image.new_image_buffer.clone());
        Ok(())
    }

    /// Replace images in the given order, stopping at the first failure.
    pub fn replace_images(&mut self, images: &[ReplacementImage]) -> Result<()> {
        images.iter().try_for_each(|image| self.replace_image(image))
    }

    /// Serialize the current archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.archive.to_bytes()
    }

    /// Write the document, creating parent directories as needed.
    pub async fn generate_output_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if self.state == TemplaterState::Finalized {
            return Err(Error::InvalidState("output was already generated".to_string()));
        }

        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = self.to_bytes()?;
        tokio::fs::write(path, &bytes).await?;

        info!(path = %path.display(), bytes = bytes.len(), "wrote output document");
        self.state = TemplaterState::Finalized;
        Ok(())
    }
}

/// The data object with `$util` set on top; non-object data is replaced.
fn with_helpers(data: &Value, now: DateTime<FixedOffset>) -> Value {
    let mut util = IndexMap::new();
    util.insert("now".to_string(), Value::Date(now));

    let mut root = match data {
        Value::Object(map) => map.clone(),
        _ => IndexMap::new(),
    };
    root.insert(UTIL_KEY.to_string(), Value::Object(util));
    Value::Object(root)
}

/// Lower-case hex MD5 of `data`.
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

/// Name of the first media entry, in archive order, with the given hash.
fn find_media_by_md5(archive: &Archive, md5: &str, extension: Option<&str>) -> Option<String> {
    let wanted = md5.to_ascii_lowercase();
    let candidates: Vec<(&str, &[u8])> = archive
        .files()
        .filter(|(name, _)| name.starts_with(MEDIA_DIR))
        .filter(|(name, _)| extension.is_none_or(|ext| name.ends_with(ext)))
        .collect();

    debug!(candidates = candidates.len(), md5 = %wanted, "hashing media candidates");
    candidates
        .par_iter()
        .find_first(|(_, data)| md5_hex(data) == wanted)
        .map(|(name, _)| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::zip_of;
    use chrono::Datelike;
    use serde_json::json;

    const SLIDE: &str = concat!(
        r#"<p:sld xmlns:a="a" xmlns:p="p"><p:txBody>"#,
        "<a:p><a:r><a:t>{{orgName}} Cadence</a:t></a:r></a:p>",
        "<a:p><a:r><a:t>{{#people}}</a:t></a:r></a:p>",
        "<a:p><a:r><a:t>{{name}}</a:t></a:r></a:p>",
        "<a:p><a:r><a:t>{{/people}}</a:t></a:r></a:p>",
        "</p:txBody></p:sld>"
    );
    const STATIC_SLIDE: &str = r#"<p:sld xmlns:a="a"><a:p><a:r><a:t>Static &amp; plain</a:t></a:r></a:p></p:sld>"#;

    fn deck() -> Vec<u8> {
        zip_of(&[
            ("[Content_Types].xml", b"<Types/>"),
            ("ppt/slides/slide1.xml", SLIDE.as_bytes()),
            ("ppt/slides/slide2.xml", STATIC_SLIDE.as_bytes()),
            ("ppt/media/image1.png", b"old-png"),
            ("ppt/media/image2.jpeg", b"old-jpeg"),
            ("ppt/media/image3.png", b"old-jpeg"),
        ])
    }

    fn templater() -> Templater {
        Templater::from_bytes(&deck(), TemplaterOptions::default()).unwrap()
    }

    fn part(t: &Templater, name: &str) -> String {
        String::from_utf8(t.archive().get(name).unwrap().to_vec()).unwrap()
    }

    #[test]
    fn renders_values_and_paragraph_loops() {
        let mut t = templater();
        t.render_json(&json!({"orgName": "Acme", "people": [{"name": "Ada"}, {"name": "Bob"}]}))
            .unwrap();
        let slide = part(&t, "ppt/slides/slide1.xml");
        assert!(slide.contains("<a:t>Acme Cadence</a:t>"));
        assert!(slide.contains("<a:t>Ada</a:t></a:r></a:p><a:p><a:r><a:t>Bob</a:t>"));
        assert!(!slide.contains("{{"));
        assert_eq!(t.state(), TemplaterState::Rendered);
    }

    #[test]
    fn parts_without_placeholders_are_byte_identical() {
        let mut t = templater();
        t.render_json(&json!({"orgName": "Acme", "people": []})).unwrap();
        assert_eq!(part(&t, "ppt/slides/slide2.xml"), STATIC_SLIDE);
        assert_eq!(t.archive().get("[Content_Types].xml"), Some(&b"<Types/>"[..]));
    }

    #[test]
    fn exposes_current_time_helper() {
        let bytes = zip_of(&[(
            "ppt/slides/slide1.xml",
            b"<a:p><a:r><a:t>{{$util.now | date:'YYYY'}}</a:t></a:r></a:p>",
        )]);
        let mut t = Templater::from_bytes(&bytes, TemplaterOptions::default()).unwrap();
        t.render(&Value::Null).unwrap();
        let year = Local::now().year().to_string();
        assert_eq!(part(&t, "ppt/slides/slide1.xml"), format!("<a:p><a:r><a:t>{year}</a:t></a:r></a:p>"));
    }

    #[test]
    fn helpers_take_precedence_over_data() {
        let bytes = zip_of(&[(
            "ppt/slides/slide1.xml",
            b"<a:p><a:r><a:t>{{$util.now | date:'YYYY'}} {{orgName}}</a:t></a:r></a:p>",
        )]);
        let mut t = Templater::from_bytes(&bytes, TemplaterOptions::default()).unwrap();
        t.render_json(&json!({"orgName": "Acme", "$util": {"now": "shadowed"}})).unwrap();
        let year = Local::now().year().to_string();
        assert_eq!(
            part(&t, "ppt/slides/slide1.xml"),
            format!("<a:p><a:r><a:t>{year} Acme</a:t></a:r></a:p>")
        );
    }

    #[test]
    fn malformed_placeholder_fails_render() {
        let bytes = zip_of(&[("ppt/slides/slide1.xml", b"<a:p><a:r><a:t>{{ a ! }}</a:t></a:r></a:p>")]);
        let mut t = Templater::from_bytes(&bytes, TemplaterOptions::default()).unwrap();
        assert!(matches!(
            t.render(&Value::Null),
            Err(Error::TemplateExpression { .. })
        ));
    }

    #[test]
    fn replaces_image_once_by_hash() {
        let mut t = templater();
        let request = ReplacementImage {
            old_image_md5: md5_hex(b"old-png"),
            old_image_extension: None,
            new_image_buffer: b"new-png".to_vec(),
        };
        t.replace_image(&request).unwrap();
        assert_eq!(t.archive().get("ppt/media/image1.png"), Some(&b"new-png"[..]));

        let err = t.replace_image(&request).unwrap_err();
        assert!(matches!(err, Error::ImageNotFound { .. }));
    }

    #[test]
    fn first_match_in_archive_order_wins() {
        let mut t = templater();
        t.replace_image(&ReplacementImage {
            old_image_md5: md5_hex(b"old-jpeg"),
            old_image_extension: None,
            new_image_buffer: b"x".to_vec(),
        })
        .unwrap();
        assert_eq!(t.archive().get("ppt/media/image2.jpeg"), Some(&b"x"[..]));
        assert_eq!(t.archive().get("ppt/media/image3.png"), Some(&b"old-jpeg"[..]));
    }

    #[test]
    fn extension_filter_narrows_candidates() {
        let mut t = templater();
        t.replace_image(&ReplacementImage {
            old_image_md5: md5_hex(b"old-jpeg"),
            old_image_extension: Some("png".to_string()),
            new_image_buffer: b"y".to_vec(),
        })
        .unwrap();
        assert_eq!(t.archive().get("ppt/media/image2.jpeg"), Some(&b"old-jpeg"[..]));
        assert_eq!(t.archive().get("ppt/media/image3.png"), Some(&b"y"[..]));

        let err = t
            .replace_image(&ReplacementImage {
                old_image_md5: md5_hex(b"old-png"),
                old_image_extension: Some("gif".to_string()),
                new_image_buffer: Vec::new(),
            })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "Image not found: no media entry with MD5 {} and extension 'gif'",
                md5_hex(b"old-png")
            )
        );
    }

    #[test]
    fn rejects_out_of_order_operations() {
        let mut t = templater();
        t.render(&Value::Null).unwrap();
        assert!(matches!(t.render(&Value::Null), Err(Error::InvalidState(_))));
    }

    #[test]
    fn invalid_archive_bytes_fail_to_load() {
        let err = Templater::from_bytes(b"nope", TemplaterOptions::default()).unwrap_err();
        assert!(matches!(err, Error::ArchiveFormat(_)));
    }

    #[tokio::test]
    async fn writes_output_and_finalizes() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.pptx");
        tokio::fs::write(&template_path, deck()).await.unwrap();

        let output = dir.path().join("nested/out/deck.pptx");
        let mut t = Templater::create(&template_path).await.unwrap();
        t.render_json(&json!({"orgName": "Acme", "people": []})).unwrap();
        t.generate_output_file(&output).await.unwrap();
        assert_eq!(t.state(), TemplaterState::Finalized);

        let written = tokio::fs::read(&output).await.unwrap();
        let reread = Archive::from_bytes(&written).unwrap();
        let original = Archive::from_bytes(&deck()).unwrap();
        assert_eq!(
            reread.names().collect::<Vec<_>>(),
            original.names().collect::<Vec<_>>()
        );
        for name in original.names().filter(|name| *name != "ppt/slides/slide1.xml") {
            assert_eq!(reread.get(name), original.get(name), "{name}");
        }
        let slide = String::from_utf8(reread.get("ppt/slides/slide1.xml").unwrap().to_vec()).unwrap();
        assert!(slide.starts_with(r#"<p:sld xmlns:a="a" xmlns:p="p"><p:txBody><a:p><a:r><a:t>Acme Cadence</a:t>"#));

        let err = t
            .replace_image(&ReplacementImage {
                old_image_md5: md5_hex(b"old-png"),
                old_image_extension: None,
                new_image_buffer: Vec::new(),
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn execute_runs_the_whole_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.pptx");
        tokio::fs::write(&template_path, deck()).await.unwrap();
        let output = dir.path().join("out.pptx");

        let data = Value::from(json!({"orgName": "Acme", "people": [{"name": "Ada"}]}));
        let images = [ReplacementImage {
            old_image_md5: md5_hex(b"old-png"),
            old_image_extension: Some(".png".to_string()),
            new_image_buffer: b"chart".to_vec(),
        }];
        Templater::execute(&template_path, &data, &images, &output).await.unwrap();

        let archive = Archive::from_bytes(&tokio::fs::read(&output).await.unwrap()).unwrap();
        assert_eq!(archive.get("ppt/media/image1.png"), Some(&b"chart"[..]));
    }
}
