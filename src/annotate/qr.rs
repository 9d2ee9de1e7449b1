//! QR marker rendering and embedding.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder, Luma};
use qrcode::{Color, QrCode};
use tracing::debug;

use crate::book::Book;
use crate::config::Prefs;
use crate::dom::{NodeId, PageDom};
use crate::error::Result;

/// Modules of quiet zone around the symbol; readers need at least four.
const QUIET_ZONE_MODULES: u32 = 4;

/// Marker text encoded into the QR symbol.
pub fn marker_text(book_title: &str, chapter_title: &str) -> String {
    format!("Completed {} - {}", book_title, chapter_title)
}

/// Generate the marker image for a page and register it as an asset.
///
/// Returns the registered asset name (deterministic per page, so a rerun
/// overwrites rather than accumulates).
pub fn generate_marker(book: &mut Book, name: &str, text: &str, prefs: &Prefs) -> Result<String> {
    let png = render_qr_png(text, prefs.qr_module_px)?;
    let asset_name = prefs.marker_name(name);
    debug!(page = %name, asset = %asset_name, bytes = png.len(), "registered marker image");
    book.add_resource(asset_name.clone(), png, "image/png");
    Ok(asset_name)
}

/// Encode `text` as a QR symbol and render it to PNG bytes:
/// black-on-white square modules, `module_px` pixels per module.
pub fn render_qr_png(text: &str, module_px: u32) -> Result<Vec<u8>> {
    let code = QrCode::new(text.as_bytes())?;
    let modules = code.width() as u32;
    let colors = code.to_colors();

    let module_px = module_px.max(1);
    let size = (modules + 2 * QUIET_ZONE_MODULES) * module_px;
    let mut img = GrayImage::from_pixel(size, size, Luma([255u8]));

    for (i, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let mx = (i as u32 % modules + QUIET_ZONE_MODULES) * module_px;
        let my = (i as u32 / modules + QUIET_ZONE_MODULES) * module_px;
        for dy in 0..module_px {
            for dx in 0..module_px {
                img.put_pixel(mx + dx, my + dy, Luma([0u8]));
            }
        }
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(
        img.as_raw(),
        size,
        size,
        ExtendedColorType::L8,
    )?;
    Ok(png)
}

/// Link the marker image into the insertion node.
///
/// Reuses the node's first descendant `img` when one exists, otherwise
/// appends a new one; either way exactly one reference remains.
pub fn embed_marker(
    book: &mut Book,
    dom: &mut PageDom,
    name: &str,
    node: NodeId,
    image_name: &str,
) {
    let img = dom
        .descendants(node)
        .find(|&id| dom.element_local_name(id) == Some("img"));

    let img = match img {
        Some(img) => img,
        None => {
            let img = dom.create_element("img", vec![]);
            dom.append(node, img);
            let tail = dom.create_text("\n");
            dom.append(node, tail);
            img
        }
    };

    let href = book.name_to_href(image_name, name);
    dom.set_attr(img, "src", &href);
    book.mark_dirty(name);
}
