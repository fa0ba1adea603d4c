//! SVG to PNG rasterization.

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::common::{Error, Result};

/// System fonts, loaded once per process.
static FONTS: Lazy<Arc<usvg::fontdb::Database>> = Lazy::new(|| {
    let mut fonts = usvg::fontdb::Database::new();
    fonts.load_system_fonts();
    Arc::new(fonts)
});

/// Render `svg` into a `width` × `height` PNG, stretching the document's
/// intrinsic size to fill the pixmap.
pub fn rasterize_png(svg: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let options = usvg::Options {
        fontdb: FONTS.clone(),
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_data(svg, &options).map_err(|e| Error::Raster(e.to_string()))?;

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| Error::Raster(format!("cannot allocate a {width}x{height} pixmap")))?;

    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let png = pixmap.encode_png().map_err(|e| Error::Raster(e.to_string()))?;
    debug!(width, height, bytes = png.len(), "rasterized svg");
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &[u8] = br#"<svg xmlns="http://www.w3.org/2000/svg" width="10pt" height="5pt" viewBox="0 0 10 5"><rect x="0" y="0" width="10" height="5" fill="red"/></svg>"#;

    fn png_size(png: &[u8]) -> (u32, u32) {
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let width = u32::from_be_bytes(png[16..20].try_into().unwrap());
        let height = u32::from_be_bytes(png[20..24].try_into().unwrap());
        (width, height)
    }

    #[test]
    fn renders_at_the_requested_size() {
        let png = rasterize_png(SQUARE, 40, 20).unwrap();
        assert_eq!(png_size(&png), (40, 20));

        let pixmap = tiny_skia::Pixmap::decode_png(&png).unwrap();
        let center = pixmap.pixel(20, 10).unwrap();
        assert_eq!((center.red(), center.green(), center.blue()), (255, 0, 0));
    }

    #[test]
    fn invalid_svg_is_a_raster_error() {
        let err = rasterize_png(b"not svg", 10, 10).unwrap_err();
        assert!(matches!(err, Error::Raster(_)));
    }

    #[test]
    fn zero_sized_output_is_rejected() {
        let err = rasterize_png(SQUARE, 0, 10).unwrap_err();
        assert!(matches!(err, Error::Raster(ref msg) if msg.contains("pixmap")));
    }
}
