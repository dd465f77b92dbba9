//! Multi-page PDF assembly over completed artifacts.
//!
//! Each completed artifact gets its own A4 page, in registry order.
//! The artifact is decoded for its dimensions and re-encoded as a
//! baseline JPEG image XObject (DCTDecode), scaled to fit inside a
//! fixed margin and centered.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::error::{ConvertError, Result};
use crate::registry::Artifact;

/// A4 page size in PDF points.
const PAGE_WIDTH: f64 = 595.28;
const PAGE_HEIGHT: f64 = 841.89;

/// Fixed page margin, 10 mm in points.
const MARGIN: f64 = 28.35;

/// JPEG quality used for the embedded page images.
const EMBED_QUALITY: u8 = 90;

/// Assemble the given artifacts, one page each in iteration order,
/// into a single PDF. Fails with [`ConvertError::EmptyAssembly`] when
/// the iterator is empty; no output is produced in that case.
pub fn assemble<'a>(artifacts: impl Iterator<Item = &'a Artifact>) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    for (index, artifact) in artifacts.enumerate() {
        let page = EmbeddedImage::from_artifact(artifact)?;
        let page_id = add_page(&mut doc, pages_id, index, page)?;
        kids.push(page_id.into());
    }

    if kids.is_empty() {
        return Err(ConvertError::EmptyAssembly);
    }

    let page_count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Cursor::new(Vec::new());
    doc.save_to(&mut buffer)
        .map_err(|e| ConvertError::PdfAssembly(e.to_string()))?;

    let bytes = buffer.into_inner();
    tracing::debug!("assembled {} page pdf ({} bytes)", page_count, bytes.len());
    Ok(bytes)
}

/// An artifact re-encoded for embedding: baseline JPEG plus pixel
/// dimensions.
struct EmbeddedImage {
    width: u32,
    height: u32,
    jpeg: Vec<u8>,
}

impl EmbeddedImage {
    fn from_artifact(artifact: &Artifact) -> Result<Self> {
        let decoded =
            image::load_from_memory(artifact.bytes()).map_err(|e| ConvertError::Decode {
                name: format!("{} artifact", artifact.format()),
                message: e.to_string(),
            })?;
        let (width, height) = (decoded.width(), decoded.height());

        let mut buffer = Cursor::new(Vec::new());
        decoded
            .to_rgb8()
            .write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, EMBED_QUALITY))
            .map_err(|e| ConvertError::Encode {
                format: artifact.format(),
                message: e.to_string(),
            })?;

        Ok(Self {
            width,
            height,
            jpeg: buffer.into_inner(),
        })
    }

    /// Placement inside the page margins: uniform `min` scale,
    /// centered on both axes.
    fn placement(&self) -> (f64, f64, f64, f64) {
        let max_width = PAGE_WIDTH - 2.0 * MARGIN;
        let max_height = PAGE_HEIGHT - 2.0 * MARGIN;
        let scale = (max_width / f64::from(self.width)).min(max_height / f64::from(self.height));
        let width = f64::from(self.width) * scale;
        let height = f64::from(self.height) * scale;
        let x = (PAGE_WIDTH - width) / 2.0;
        let y = (PAGE_HEIGHT - height) / 2.0;
        (x, y, width, height)
    }
}

fn add_page(
    doc: &mut Document,
    pages_id: lopdf::ObjectId,
    index: usize,
    page: EmbeddedImage,
) -> Result<lopdf::ObjectId> {
    let image_name = format!("Im{}", index + 1);
    let (x, y, width, height) = page.placement();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => page.width as i64,
            "Height" => page.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        page.jpeg,
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.into(),
                    0.into(),
                    height.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(image_name.clone().into_bytes())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| ConvertError::PdfAssembly(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                image_name => image_id,
            },
        },
    }))
}
