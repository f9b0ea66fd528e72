//! Loading real PDF bytes built with lopdf.

use lenscrl::{load_bytes, DocumentModel, ExtractionPipeline, ImageFormat, LoadOptions, MemorySink, PdfLoader};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// One Letter page: heading "1.1 Introduction" near the top and a 2x2 RGB
/// image drawn at 300x200 points below it.
fn manual_pdf(title: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 2,
            "Height" => 2,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        vec![200u8; 12],
    ));

    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 14.into()]),
            Operation::new("Td", vec![72.into(), 680.into()]),
            Operation::new("Tj", vec![Object::string_literal("1.1")]),
            Operation::new("Td", vec![28.into(), 0.into()]),
            Operation::new("Tj", vec![Object::string_literal("Introduction")]),
            Operation::new("ET", vec![]),
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![300.into(), 0.into(), 0.into(), 200.into(), 156.into(), 300.into()],
            ),
            Operation::new("Do", vec!["Im1".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => dictionary! { "Im1" => image_id },
        },
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
    });
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

#[test]
fn test_load_spans_and_images() {
    let doc = load_bytes(&manual_pdf("Manual PROCSG02")).unwrap();
    assert_eq!(doc.page_count(), 1);
    assert_eq!(doc.metadata().title.as_deref(), Some("Manual PROCSG02"));
    assert!(doc.source_name().is_none());

    let page = doc.page(0).unwrap();
    assert_eq!(page.dimensions(), (612.0, 792.0));

    let texts: Vec<&str> = page.spans.iter().map(|s| s.trimmed()).collect();
    assert_eq!(texts, vec!["1.1", "Introduction"]);
    let number = &page.spans[0];
    assert!(number.bold);
    assert_eq!(number.font_size, Some(14.0));
    assert!((number.bbox.y0 - 100.8).abs() < 0.5);

    assert_eq!(page.images.len(), 1);
    let image = &page.images[0];
    assert_eq!(image.format, ImageFormat::Png);
    assert_eq!((image.pixel_width, image.pixel_height), (Some(2), Some(2)));
    assert!((image.bbox.x0 - 156.0).abs() < 0.01);
    assert!((image.bbox.y0 - 292.0).abs() < 0.01);
    assert!((image.bbox.y1 - 492.0).abs() < 0.01);
}

#[test]
fn test_text_only_skips_images() {
    let loader = PdfLoader::from_bytes_with_options(&manual_pdf("x"), LoadOptions::new().text_only()).unwrap();
    let doc = loader.load().unwrap();
    assert!(doc.page(0).unwrap().images.is_empty());
    assert_eq!(doc.page(0).unwrap().spans.len(), 2);
}

#[test]
fn test_loaded_pdf_through_pipeline() {
    let doc = load_bytes(&manual_pdf("Manual PROCSG02")).unwrap();
    let mut sink = MemorySink::new();
    let result = ExtractionPipeline::default().run(&doc, &mut sink);

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.manual_name.as_deref(), Some("PROCSG02"));
    assert_eq!(sink.filenames(), vec!["CRL-PROCSG02-1.1.png"]);

    let png = sink.get("CRL-PROCSG02-1.1.png").unwrap();
    assert_eq!(ImageFormat::detect(png), Some(ImageFormat::Png));
}

#[test]
fn test_garbage_bytes_fail_to_load() {
    assert!(load_bytes(b"%PDF-1.5 not really").is_err());
}
