use folio_engine::assemble::{AssembleError, assemble};
use folio_engine::protocol::{FetchedItem, PageFormat};
use image::{ImageFormat, Rgb, RgbImage};
use lopdf::Document;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(width, height, Rgb([200, 30, 30]))
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}

fn fetched(id: &str, path: PathBuf, sequence: Option<u64>) -> FetchedItem {
    FetchedItem {
        id: id.to_string(),
        path,
        sequence,
    }
}

/// Pixel width of the image placed on each page, in page order.
fn page_image_widths(pdf: &Path) -> Vec<i64> {
    let doc = Document::load(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let page = doc.get_dictionary(page_id).unwrap();
            let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
            let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
            let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
            let stream = doc.get_object(image_id).unwrap().as_stream().unwrap();
            stream.dict.get(b"Width").unwrap().as_i64().unwrap()
        })
        .collect()
}

#[test]
fn pages_follow_sequence_with_gaps_closed() {
    let dir = TempDir::new().unwrap();
    let items = vec![
        fetched("page2", write_image(dir.path(), "page2.png", 30, 40), Some(2)),
        fetched("page0", write_image(dir.path(), "page0.png", 10, 40), Some(0)),
    ];
    let output = dir.path().join("out").join("book.pdf");

    let outcome = assemble(&items, &output, PageFormat::A4).unwrap();

    assert_eq!(outcome.pages, 2);
    assert!(outcome.skipped.is_empty());
    assert_eq!(outcome.path, output);
    assert_eq!(page_image_widths(&output), vec![10, 30]);
}

#[test]
fn unnumbered_items_go_last() {
    let dir = TempDir::new().unwrap();
    let items = vec![
        fetched("cover", write_image(dir.path(), "cover.png", 50, 50), None),
        fetched("page1", write_image(dir.path(), "page1.png", 11, 50), Some(1)),
        fetched("page0", write_image(dir.path(), "page0.png", 10, 50), Some(0)),
    ];
    let output = dir.path().join("book.pdf");

    assemble(&items, &output, PageFormat::Letter).unwrap();
    assert_eq!(page_image_widths(&output), vec![10, 11, 50]);
}

#[test]
fn mislabeled_extension_is_decoded_by_content() {
    let dir = TempDir::new().unwrap();
    let png = write_image(dir.path(), "scan.png", 12, 12);
    let labeled_jpg = dir.path().join("page0.jpg");
    std::fs::rename(&png, &labeled_jpg).unwrap();
    let output = dir.path().join("book.pdf");

    let outcome = assemble(&[fetched("page0", labeled_jpg, Some(0))], &output, PageFormat::A4)
        .unwrap();
    assert_eq!(outcome.pages, 1);
}

fn page_image_stream(pdf: &Path) -> lopdf::Stream {
    let doc = Document::load(pdf).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let page = doc.get_dictionary(page_id).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
    let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
    doc.get_object(image_id).unwrap().as_stream().unwrap().clone()
}

#[test]
fn jpeg_bytes_are_embedded_unchanged() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("page0.jpg");
    RgbImage::from_pixel(64, 48, Rgb([90, 120, 200]))
        .save_with_format(&path, ImageFormat::Jpeg)
        .unwrap();
    let output = dir.path().join("book.pdf");

    assemble(&[fetched("page0", path.clone(), Some(0))], &output, PageFormat::A4).unwrap();

    let stream = page_image_stream(&output);
    assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
    assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 64);
    assert_eq!(stream.content, std::fs::read(&path).unwrap());
}

#[test]
fn decoded_pages_are_stored_deflated() {
    let dir = TempDir::new().unwrap();
    let path = write_image(dir.path(), "page0.png", 300, 400);
    let output = dir.path().join("book.pdf");

    assemble(&[fetched("page0", path, Some(0))], &output, PageFormat::A4).unwrap();

    let stream = page_image_stream(&output);
    assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"FlateDecode");
    assert!(stream.content.len() < 300 * 400 * 3 / 10);
}

#[test]
fn undecodable_image_is_skipped() {
    let dir = TempDir::new().unwrap();
    let broken = dir.path().join("page1.jpg");
    std::fs::write(&broken, b"<html>Access denied</html>").unwrap();
    let items = vec![
        fetched("page0", write_image(dir.path(), "page0.png", 20, 20), Some(0)),
        fetched("page1", broken, Some(1)),
        fetched("page2", write_image(dir.path(), "page2.png", 22, 20), Some(2)),
    ];
    let output = dir.path().join("book.pdf");

    let outcome = assemble(&items, &output, PageFormat::A4).unwrap();
    assert_eq!(outcome.pages, 2);
    assert_eq!(outcome.skipped, vec!["page1".to_string()]);
    assert_eq!(page_image_widths(&output), vec![20, 22]);
}

#[test]
fn nothing_is_written_when_no_page_decodes() {
    let dir = TempDir::new().unwrap();
    let broken = dir.path().join("page0.png");
    std::fs::write(&broken, b"truncated").unwrap();
    let missing = dir.path().join("page1.png");
    let output = dir.path().join("book.pdf");

    let err = assemble(
        &[fetched("page0", broken, Some(0)), fetched("page1", missing, Some(1))],
        &output,
        PageFormat::A4,
    )
    .unwrap_err();
    assert!(matches!(err, AssembleError::NoPages));
    assert!(!output.exists());
}

#[test]
fn pages_use_the_requested_format() {
    let dir = TempDir::new().unwrap();
    let items = vec![fetched("page0", write_image(dir.path(), "page0.png", 100, 100), Some(0))];
    let output = dir.path().join("letter.pdf");
    assemble(&items, &output, PageFormat::Letter).unwrap();

    let doc = Document::load(&output).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let page = doc.get_dictionary(page_id).unwrap();
    let media_box: Vec<i64> = page
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    assert_eq!(media_box, vec![0, 0, 612, 792]);
}
