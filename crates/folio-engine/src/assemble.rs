//! Document assembly: one page image per PDF page, in page-number order.

use flate2::Compression;
use flate2::write::ZlibEncoder;
use folio_common::protocol::{FetchedItem, PageFormat};
use image::{ColorType, ImageFormat};
use lopdf::{Document as LoDocument, Object as LoObject, Stream as LoStream, dictionary};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Fraction of the page an image may occupy along its limiting axis.
pub const MARGIN_FACTOR: f64 = 0.9;

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("no page could be rendered")]
    NoPages,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF error: {0}")]
    Pdf(String),
}

/// Position and size of an image on its page, in points from the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Uniformly scale an image to fit the page with a margin, centred.
pub fn fit_centered(page: (f64, f64), image: (f64, f64)) -> Placement {
    let (page_width, page_height) = page;
    let (image_width, image_height) = image;
    let scale = (page_width / image_width).min(page_height / image_height) * MARGIN_FACTOR;
    let width = image_width * scale;
    let height = image_height * scale;
    Placement {
        scale,
        x: (page_width - width) / 2.0,
        y: (page_height - height) / 2.0,
        width,
        height,
    }
}

#[derive(Debug, Clone)]
pub struct AssembleOutcome {
    pub path: PathBuf,
    pub pages: usize,
    /// Ids of items that could not be decoded.
    pub skipped: Vec<String>,
}

/// Order items by sequence number; unnumbered items keep their relative order at the end.
pub fn page_order(items: &[FetchedItem]) -> Vec<&FetchedItem> {
    let mut ordered: Vec<&FetchedItem> = items.iter().collect();
    ordered.sort_by_key(|item| item.sort_key());
    ordered
}

/// Build a PDF at `output` from the fetched images.
///
/// Images that fail to decode are logged and skipped. Nothing is written when
/// no page succeeds.
pub fn assemble(
    items: &[FetchedItem],
    output: &Path,
    format: PageFormat,
) -> Result<AssembleOutcome, AssembleError> {
    let (page_width, page_height) = format.size();
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<LoObject> = Vec::new();
    let mut skipped = Vec::new();

    for item in page_order(items) {
        let image = match load_page_image(&item.path) {
            Ok(image) => image,
            Err(e) => {
                warn!("Failed to add {} to PDF: {}", item.id, e);
                skipped.push(item.id.clone());
                continue;
            }
        };
        let (pixel_width, pixel_height) = (image.width, image.height);
        if pixel_width == 0 || pixel_height == 0 {
            warn!("Failed to add {} to PDF: empty image", item.id);
            skipped.push(item.id.clone());
            continue;
        }

        let image_id = doc.add_object(
            LoStream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(pixel_width),
                    "Height" => i64::from(pixel_height),
                    "ColorSpace" => image.color_space,
                    "BitsPerComponent" => 8,
                    "Filter" => image.filter,
                },
                image.data,
            )
            .with_compression(false),
        );

        let placement = fit_centered(
            (page_width, page_height),
            (f64::from(pixel_width), f64::from(pixel_height)),
        );
        let content = format!(
            "q {:.4} 0 0 {:.4} {:.4} {:.4} cm /Im0 Do Q\n",
            placement.width, placement.height, placement.x, placement.y
        )
        .into_bytes();
        let content_id = doc.add_object(LoStream::new(dictionary! {}, content));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
            "MediaBox" => vec![
                LoObject::Integer(0),
                LoObject::Integer(0),
                LoObject::Integer(page_width as i64),
                LoObject::Integer(page_height as i64),
            ],
        });
        kids.push(LoObject::Reference(page_id));
        info!("Added {} to PDF", item.id);
    }

    if kids.is_empty() {
        return Err(AssembleError::NoPages);
    }

    let pages = kids.len();
    doc.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| AssembleError::Pdf(e.to_string()))?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, bytes)?;

    info!("PDF saved with {} pages ({} skipped)", pages, skipped.len());
    Ok(AssembleOutcome {
        path: output.to_path_buf(),
        pages,
        skipped,
    })
}

/// Image XObject payload, already encoded for the PDF.
struct PageImage {
    width: u32,
    height: u32,
    color_space: &'static str,
    filter: &'static str,
    data: Vec<u8>,
}

/// Format is sniffed from content; the file extension is not trusted. JPEG
/// bytes are embedded unchanged, anything else is flattened to RGB and
/// deflated before it joins the document.
fn load_page_image(path: &Path) -> Result<PageImage, image::ImageError> {
    let bytes = std::fs::read(path)?;
    let format = image::guess_format(&bytes)?;
    let decoded = image::load_from_memory_with_format(&bytes, format)?;
    let (width, height) = (decoded.width(), decoded.height());

    if format == ImageFormat::Jpeg {
        let color_space = match decoded.color() {
            ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16 => "DeviceGray",
            _ => "DeviceRGB",
        };
        return Ok(PageImage {
            width,
            height,
            color_space,
            filter: "DCTDecode",
            data: bytes,
        });
    }

    let rgb = decoded.to_rgb8();
    Ok(PageImage {
        width,
        height,
        color_space: "DeviceRGB",
        filter: "FlateDecode",
        data: flate_compress(rgb.as_raw())?,
    })
}

fn flate_compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
