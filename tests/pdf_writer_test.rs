// PdfPageWriter tests: draw commands, page tree, image XObjects.

use image::{Rgba, RgbaImage};
use lopdf::{Dictionary, Document, Object, ObjectId};
use pdf_layering::error::LayerError;
use pdf_layering::geometry::projection::{CanvasSize, Placement};
use pdf_layering::layers::encode::encode_layer;
use pdf_layering::layers::{EncodedImage, EncoderChoice};
use pdf_layering::pdf::DocumentSink;
use pdf_layering::pdf::writer::PdfPageWriter;

fn opaque_jpeg() -> EncodedImage {
    let img = RgbaImage::from_pixel(16, 16, Rgba([120, 60, 30, 255]));
    encode_layer(&img, EncoderChoice::LossyPhotographic(25)).expect("jpeg layer")
}

fn translucent_flate() -> EncodedImage {
    let img = RgbaImage::from_fn(8, 8, |x, _| {
        if x < 4 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    encode_layer(&img, EncoderChoice::LosslessFlat).expect("flate layer")
}

fn full_page(canvas: CanvasSize) -> Placement {
    Placement {
        x: 0.0,
        y: 0.0,
        width: canvas.width,
        height: canvas.height,
    }
}

fn page_dict(doc: &Document, page_id: ObjectId) -> &Dictionary {
    doc.get_dictionary(page_id).expect("page dictionary")
}

fn xobjects<'a>(doc: &'a Document, page_id: ObjectId) -> &'a Dictionary {
    let resources_id = page_dict(doc, page_id)
        .get(b"Resources")
        .and_then(Object::as_reference)
        .expect("resources reference");
    doc.get_dictionary(resources_id)
        .expect("resources dictionary")
        .get(b"XObject")
        .and_then(Object::as_dict)
        .expect("xobject dictionary")
}

// ============================================================
// 1. Draw commands
// ============================================================

#[test]
fn test_draw_command_flips_y() {
    let placement = Placement {
        x: 10.0,
        y: 20.0,
        width: 100.0,
        height: 50.0,
    };
    let cmd = PdfPageWriter::build_draw_command("Im0", &placement, 792.0);
    assert_eq!(
        cmd,
        "q 100.0000 0 0 50.0000 10.0000 722.0000 cm /Im0 Do Q\n"
    );
}

#[test]
fn test_draw_command_full_page() {
    let cmd = PdfPageWriter::build_draw_command("Im3", &full_page(CanvasSize::LETTER), 792.0);
    assert_eq!(
        cmd,
        "q 612.0000 0 0 792.0000 0.0000 0.0000 cm /Im3 Do Q\n"
    );
}

// ============================================================
// 2. Document structure
// ============================================================

#[test]
fn test_two_pages_round_trip_through_lopdf() {
    let mut writer = PdfPageWriter::new();

    writer.begin_page(CanvasSize::LETTER).unwrap();
    writer.draw_image(&full_page(CanvasSize::LETTER), &opaque_jpeg()).unwrap();
    writer
        .draw_image(
            &Placement {
                x: 100.0,
                y: 100.0,
                width: 50.0,
                height: 50.0,
            },
            &translucent_flate(),
        )
        .unwrap();
    writer.end_page().unwrap();

    writer.begin_page(CanvasSize::A4).unwrap();
    writer.draw_image(&full_page(CanvasSize::A4), &opaque_jpeg()).unwrap();
    writer.end_page().unwrap();
    assert_eq!(writer.page_count(), 2);

    let bytes = writer.finish().expect("finish");
    assert!(bytes.starts_with(b"%PDF-1.5"));

    let doc = Document::load_mem(&bytes).expect("lopdf parses output");
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 2);

    let first = pages[&1];
    let media_box = page_dict(&doc, first)
        .get(b"MediaBox")
        .and_then(Object::as_array)
        .expect("media box");
    assert_eq!(media_box[2].as_float().unwrap(), 612.0);
    assert_eq!(media_box[3].as_float().unwrap(), 792.0);

    let xobj = xobjects(&doc, first);
    assert_eq!(xobj.len(), 2);

    // Second image on page 1 carries an SMask; the background does not.
    let bg_id = xobj.get(b"Im0").and_then(Object::as_reference).unwrap();
    let fg_id = xobj.get(b"Im1").and_then(Object::as_reference).unwrap();
    let bg = doc.get_object(bg_id).and_then(Object::as_stream).unwrap();
    let fg = doc.get_object(fg_id).and_then(Object::as_stream).unwrap();
    assert_eq!(bg.dict.get(b"Filter").and_then(Object::as_name).unwrap(), b"DCTDecode");
    assert!(bg.dict.get(b"SMask").is_err());
    assert_eq!(fg.dict.get(b"Filter").and_then(Object::as_name).unwrap(), b"FlateDecode");
    let smask_id = fg.dict.get(b"SMask").and_then(Object::as_reference).unwrap();
    let smask = doc.get_object(smask_id).and_then(Object::as_stream).unwrap();
    assert_eq!(
        smask.dict.get(b"ColorSpace").and_then(Object::as_name).unwrap(),
        b"DeviceGray"
    );

    let content = doc.get_page_content(first).expect("page content");
    let content = String::from_utf8_lossy(&content);
    let bg_pos = content.find("/Im0 Do").expect("background drawn");
    let fg_pos = content.find("/Im1 Do").expect("foreground drawn");
    assert!(bg_pos < fg_pos, "background must be drawn first");
    assert!(content.contains("q 50.0000 0 0 50.0000 100.0000 642.0000 cm /Im1 Do Q"));

    let second_box = page_dict(&doc, pages[&2])
        .get(b"MediaBox")
        .and_then(Object::as_array)
        .unwrap();
    assert!((second_box[2].as_float().unwrap() - 595.276).abs() < 0.01);
}

#[test]
fn test_finish_without_pages_fails() {
    let writer = PdfPageWriter::new();
    assert!(matches!(writer.finish(), Err(LayerError::SinkError(_))));
}

#[test]
fn test_finish_with_open_page_fails() {
    let mut writer = PdfPageWriter::new();
    writer.begin_page(CanvasSize::LETTER).unwrap();
    assert!(matches!(writer.finish(), Err(LayerError::SinkError(_))));
}

#[test]
fn test_sink_protocol_errors() {
    let mut writer = PdfPageWriter::new();
    let placement = full_page(CanvasSize::LETTER);
    assert!(writer.draw_image(&placement, &opaque_jpeg()).is_err());
    assert!(writer.end_page().is_err());

    writer.begin_page(CanvasSize::LETTER).unwrap();
    assert!(writer.begin_page(CanvasSize::LETTER).is_err());

    let empty = EncodedImage {
        width: 0,
        ..opaque_jpeg()
    };
    assert!(matches!(
        writer.draw_image(&placement, &empty),
        Err(LayerError::SinkError(_))
    ));
}
