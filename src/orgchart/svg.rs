//! SVG normalization.
//!
//! Graphviz sizes its drawing to the content, so the result rarely has the
//! slide's aspect ratio. [`normalize_svg`] grows the short side of the root
//! viewport and view box so the drawing sits centered on a canvas of the
//! target ratio, then injects the caller's stylesheet and a full-bleed
//! background `<rect>` ahead of the original content.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::common::{Error, Result};
use crate::template::value::format_number;

/// Width and height in SVG user units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// A `viewBox` rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    fn parse(text: &str) -> Option<Self> {
        let mut parts = text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<f64>().ok());
        let view_box = ViewBox {
            x: parts.next()??,
            y: parts.next()??,
            width: parts.next()??,
            height: parts.next()??,
        };
        parts.next().is_none().then_some(view_box)
    }

    fn to_attribute(self) -> String {
        [self.x, self.y, self.width, self.height]
            .map(format_number)
            .join(" ")
    }
}

/// Grow `viewport` to `aspect_ratio` (width / height), keeping the content
/// centered.
///
/// When the source is proportionally wider than the target, the height grows
/// and the view box moves up by half the growth; otherwise the width grows
/// and the view box moves left. The view box is scaled by the same factor as
/// the viewport.
pub fn compute_viewport(viewport: Size, view_box: ViewBox, aspect_ratio: f64) -> (Size, ViewBox) {
    let mut new_viewport = viewport;
    let mut new_view_box = view_box;

    if viewport.width / viewport.height > aspect_ratio {
        new_viewport.height = viewport.width / aspect_ratio;
        new_view_box.height = view_box.height * new_viewport.height / viewport.height;
        new_view_box.y = view_box.y - (new_view_box.height - view_box.height) / 2.0;
    } else {
        new_viewport.width = viewport.height * aspect_ratio;
        new_view_box.width = view_box.width * new_viewport.width / viewport.width;
        new_view_box.x = view_box.x - (new_view_box.width - view_box.width) / 2.0;
    }

    (new_viewport, new_view_box)
}

/// Rewrite an SVG document to `aspect_ratio`, embedding `css`.
///
/// The root element's `width`/`height` are rewritten in points. Any
/// `DOCTYPE` is dropped.
pub fn normalize_svg(svg: &[u8], aspect_ratio: f64, css: &str) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(svg).map_err(|e| Error::Svg(format!("not UTF-8: {e}")))?;
    let mut reader = Reader::from_str(text);
    let mut writer = Writer::new(Vec::with_capacity(svg.len() + css.len() + 128));
    let mut seen_root = false;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Eof => break,
            Event::DocType(_) => {},
            Event::Start(start) if !seen_root => {
                seen_root = true;
                let (root, view_box) = rewrite_root(&start, aspect_ratio)?;
                let prefix = element_prefix(&root)?;
                writer.write_event(Event::Start(root))?;
                write_background(&mut writer, &prefix, css, view_box)?;
            },
            Event::Empty(start) if !seen_root => {
                seen_root = true;
                let (root, view_box) = rewrite_root(&start, aspect_ratio)?;
                let prefix = element_prefix(&root)?;
                writer.write_event(Event::Start(root))?;
                write_background(&mut writer, &prefix, css, view_box)?;
                writer.write_event(Event::End(BytesEnd::new(format!("{prefix}svg"))))?;
            },
            other => writer.write_event(other)?,
        }
    }

    if !seen_root {
        return Err(Error::Svg("document has no root element".to_string()));
    }
    Ok(writer.into_inner())
}

fn rewrite_root(start: &BytesStart<'_>, aspect_ratio: f64) -> Result<(BytesStart<'static>, ViewBox)> {
    if start.local_name().as_ref() != b"svg" {
        return Err(Error::Svg("root element is not <svg>".to_string()));
    }

    let mut width = None;
    let mut height = None;
    let mut view_box = None;
    let mut others = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Svg(e.to_string()))?;
        let value = std::str::from_utf8(&attr.value)
            .map_err(|e| Error::Svg(e.to_string()))?
            .to_string();
        match attr.key.as_ref() {
            b"width" => width = Some(value),
            b"height" => height = Some(value),
            b"viewBox" => view_box = Some(value),
            key => others.push((key.to_vec(), value.into_bytes())),
        }
    }

    let viewport = Size {
        width: parse_length(width.as_deref(), "width")?,
        height: parse_length(height.as_deref(), "height")?,
    };
    let view_box_text = view_box.ok_or_else(|| Error::Svg("missing viewBox".to_string()))?;
    let view_box = ViewBox::parse(&view_box_text)
        .ok_or_else(|| Error::Svg(format!("unparsable viewBox '{view_box_text}'")))?;
    if viewport.width <= 0.0 || viewport.height <= 0.0 {
        return Err(Error::Svg("viewport has no area".to_string()));
    }

    let (viewport, view_box) = compute_viewport(viewport, view_box, aspect_ratio);

    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| Error::Svg(e.to_string()))?
        .to_string();
    let mut root = BytesStart::new(name);
    for (key, value) in &others {
        root.push_attribute((key.as_slice(), value.as_slice()));
    }
    root.push_attribute(("width", format!("{}pt", format_number(viewport.width)).as_str()));
    root.push_attribute(("height", format!("{}pt", format_number(viewport.height)).as_str()));
    root.push_attribute(("viewBox", view_box.to_attribute().as_str()));
    Ok((root, view_box))
}

/// Leading number of a length such as `620pt`.
fn parse_length(value: Option<&str>, name: &str) -> Result<f64> {
    let value = value.ok_or_else(|| Error::Svg(format!("missing {name}")))?;
    let trimmed = value.trim();
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map_or(trimmed.len(), |(i, _)| i);
    trimmed[..end]
        .parse::<f64>()
        .map_err(|_| Error::Svg(format!("unparsable {name} '{value}'")))
}

/// Namespace prefix of the root element including the colon, or `""`.
fn element_prefix(root: &BytesStart<'_>) -> Result<String> {
    Ok(match root.name().prefix() {
        Some(prefix) => format!(
            "{}:",
            std::str::from_utf8(prefix.as_ref()).map_err(|e| Error::Svg(e.to_string()))?
        ),
        None => String::new(),
    })
}

fn write_background(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    css: &str,
    view_box: ViewBox,
) -> Result<()> {
    let style = format!("{prefix}style");
    writer.write_event(Event::Start(BytesStart::new(style.as_str())))?;
    writer.write_event(Event::Text(BytesText::new(css)))?;
    writer.write_event(Event::End(BytesEnd::new(style.as_str())))?;

    let x = format_number(view_box.x);
    let y = format_number(view_box.y);
    let width = format_number(view_box.width);
    let height = format_number(view_box.height);
    let rect = BytesStart::new(format!("{prefix}rect")).with_attributes([
        ("x", x.as_str()),
        ("y", y.as_str()),
        ("width", width.as_str()),
        ("height", height.as_str()),
    ]);
    writer.write_event(Event::Empty(rect))?;
    Ok(())
}

/// Read the root `width`, `height` (as numbers) and `viewBox` of an SVG.
pub fn read_dimensions(svg: &[u8]) -> Result<(Size, ViewBox)> {
    let text = std::str::from_utf8(svg).map_err(|e| Error::Svg(format!("not UTF-8: {e}")))?;
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event()? {
            Event::Start(start) | Event::Empty(start) => {
                let attr = |name: &[u8]| -> Result<Option<String>> {
                    let found = start
                        .try_get_attribute(name)
                        .map_err(|e| Error::Svg(e.to_string()))?;
                    Ok(found.map(|a| String::from_utf8_lossy(&a.value).into_owned()))
                };
                let size = Size {
                    width: parse_length(attr(b"width")?.as_deref(), "width")?,
                    height: parse_length(attr(b"height")?.as_deref(), "height")?,
                };
                let view_box = attr(b"viewBox")?
                    .as_deref()
                    .and_then(ViewBox::parse)
                    .ok_or_else(|| Error::Svg("missing viewBox".to_string()))?;
                return Ok((size, view_box));
            },
            Event::Eof => return Err(Error::Svg("document has no root element".to_string())),
            _ => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAPHVIZ_SVG: &str = concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n",
        "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\"\n",
        " \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n",
        "<svg width=\"800pt\" height=\"600pt\" viewBox=\"0.00 0.00 800.00 600.00\" ",
        "xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">\n",
        "<g id=\"graph0\" class=\"graph\"><text x=\"10\" y=\"20\">A &amp; B</text></g>\n",
        "</svg>\n",
    );

    #[test]
    fn taller_sources_grow_in_width() {
        let (viewport, view_box) = compute_viewport(
            Size { width: 800.0, height: 600.0 },
            ViewBox { x: 0.0, y: 0.0, width: 800.0, height: 600.0 },
            16.0 / 9.0,
        );
        assert_eq!(viewport.height, 600.0);
        assert!((viewport.width - 600.0 * 16.0 / 9.0).abs() < 1e-9);
        assert_eq!(view_box.width, viewport.width);
        assert!((view_box.x + (view_box.width - 800.0) / 2.0).abs() < 1e-9);
        assert_eq!(view_box.y, 0.0);
    }

    #[test]
    fn wider_sources_grow_in_height() {
        let (viewport, view_box) = compute_viewport(
            Size { width: 1600.0, height: 400.0 },
            ViewBox { x: 0.0, y: 0.0, width: 1600.0, height: 400.0 },
            16.0 / 9.0,
        );
        assert_eq!(viewport.width, 1600.0);
        assert!((viewport.height - 900.0).abs() < 1e-9);
        assert!((view_box.height - 900.0).abs() < 1e-9);
        assert!((view_box.y + 250.0).abs() < 1e-9);
        assert_eq!(view_box.x, 0.0);
    }

    #[test]
    fn scaled_view_boxes_grow_proportionally() {
        let (_, view_box) = compute_viewport(
            Size { width: 400.0, height: 400.0 },
            ViewBox { x: 0.0, y: 0.0, width: 800.0, height: 800.0 },
            2.0,
        );
        assert_eq!(view_box.width, 1600.0);
        assert_eq!(view_box.x, -400.0);
    }

    #[test]
    fn matching_ratio_is_left_alone() {
        let size = Size { width: 160.0, height: 90.0 };
        let view_box = ViewBox { x: 0.0, y: 0.0, width: 160.0, height: 90.0 };
        let (new_size, new_view_box) = compute_viewport(size, view_box, 16.0 / 9.0);
        assert!((new_size.width - 160.0).abs() < 1e-9);
        assert!((new_view_box.x).abs() < 1e-9);
    }

    #[test]
    fn normalizes_graphviz_output() {
        let out = normalize_svg(GRAPHVIZ_SVG.as_bytes(), 2.0, "svg > rect { fill: white; }").unwrap();
        let text = String::from_utf8(out.clone()).unwrap();

        assert!(!text.contains("DOCTYPE"));
        assert!(text.contains("width=\"1200pt\""));
        assert!(text.contains("height=\"600pt\""));
        assert!(text.contains("viewBox=\"-200 0 1200 600\""));
        assert!(text.contains("xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(text.contains("<style>svg &gt; rect { fill: white; }</style>"));
        assert!(text.contains("<rect x=\"-200\" y=\"0\" width=\"1200\" height=\"600\"/>"));
        assert!(text.contains("A &amp; B"));

        // Style and background come before the original content.
        let style = text.find("<style>").unwrap();
        let group = text.find("<g id=\"graph0\"").unwrap();
        assert!(style < group);

        let (size, view_box) = read_dimensions(&out).unwrap();
        assert_eq!(size, Size { width: 1200.0, height: 600.0 });
        assert_eq!(view_box.x, -200.0);
    }

    #[test]
    fn keeps_the_root_namespace_prefix() {
        let svg = br#"<svg:svg xmlns:svg="http://www.w3.org/2000/svg" width="100pt" height="100pt" viewBox="0 0 100 100"><svg:g/></svg:svg>"#;
        let out = String::from_utf8(normalize_svg(svg, 2.0, "g{}").unwrap()).unwrap();
        assert!(out.starts_with(r#"<svg:svg xmlns:svg="http://www.w3.org/2000/svg" width="200pt""#), "{out}");
        assert!(out.contains(r#"<svg:style>g{}</svg:style><svg:rect x="-50" y="0" width="200" height="100"/><svg:g/>"#), "{out}");
        assert!(out.ends_with("</svg:svg>"));

        let empty = br#"<svg:svg xmlns:svg="s" width="1" height="1" viewBox="0 0 1 1"/>"#;
        let out = String::from_utf8(normalize_svg(empty, 1.0, "").unwrap()).unwrap();
        assert!(out.ends_with("<svg:rect x=\"0\" y=\"0\" width=\"1\" height=\"1\"/></svg:svg>"), "{out}");
    }

    #[test]
    fn rejects_svg_without_dimensions() {
        let err = normalize_svg(b"<svg viewBox=\"0 0 1 1\"/>", 2.0, "").unwrap_err();
        assert!(matches!(err, Error::Svg(ref msg) if msg.contains("width")));

        let err = normalize_svg(b"<svg width=\"1\" height=\"1\"/>", 2.0, "").unwrap_err();
        assert!(matches!(err, Error::Svg(ref msg) if msg.contains("viewBox")));

        let err = normalize_svg(b"<html/>", 2.0, "").unwrap_err();
        assert!(matches!(err, Error::Svg(_)));
    }

    #[test]
    fn parses_lengths_with_units() {
        assert_eq!(parse_length(Some("620pt"), "width").unwrap(), 620.0);
        assert_eq!(parse_length(Some(" 12.5 "), "width").unwrap(), 12.5);
        assert!(parse_length(Some("pt"), "width").is_err());
    }
}
