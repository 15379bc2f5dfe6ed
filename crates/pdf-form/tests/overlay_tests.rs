//! Drawing on pages through overlays

mod common;

use common::*;
use pdf_form::{create_overlays, Color, FormError, OverlayInstruction, PdfForm};
use pretty_assertions::assert_eq;
use serde_json::json;

fn page_content(form: &PdfForm, page: usize) -> String {
    let doc = reopen(&form.to_bytes().unwrap());
    let page_id = doc.page_id(page).unwrap();
    String::from_utf8_lossy(&doc.page_content(page_id)).into_owned()
}

#[test]
fn test_rotated_image_leaves_other_pages_identical() {
    let form = PdfForm::new(&three_page_template())
        .unwrap()
        .fill(&json!({ "name": "Ada", "subscribe": true, "plan": 1 }), false)
        .unwrap();

    let drawn = form
        .draw_image(&png(), 1, 100.0, 100.0, 50.0, 50.0, 90.0)
        .expect("Failed to draw image");

    let before = form.pages().unwrap();
    let after = drawn.pages().unwrap();
    assert_eq!(after.len(), 3);
    assert_ne!(before[0].to_bytes().unwrap(), after[0].to_bytes().unwrap());
    for page in 1..3 {
        assert_eq!(
            before[page].to_bytes().unwrap(),
            after[page].to_bytes().unwrap(),
            "page {} changed",
            page + 1
        );
    }

    let content = page_content(&drawn, 1);
    assert!(content.contains("(Page 1) Tj"));
    assert!(content.contains("1 0 0 1 0 0 cm\n/Ov1 Do"));

    // Fields on the drawn page are untouched
    assert_eq!(value_layer(&form), value_layer(&drawn));
}

#[test]
fn test_draw_text_and_line_use_one_overlay() {
    let form = PdfForm::new(&three_page_template()).unwrap();
    let drawn = form
        .draw(&[
            OverlayInstruction::Text {
                page: 2,
                x: 72.0,
                y: 72.0,
                text: "Approved".to_string(),
                font: "Times-Bold".to_string(),
                font_size: 14.0,
                color: Color::blue(),
            },
            OverlayInstruction::Line {
                page: 2,
                x1: 72.0,
                y1: 70.0,
                x2: 200.0,
                y2: 70.0,
                color: Color::blue(),
                width: 1.0,
            },
        ])
        .unwrap();

    let content = page_content(&drawn, 2);
    assert_eq!(content.matches(" Do").count(), 1);
    assert!(!page_content(&drawn, 1).contains(" Do"));

    let bytes = String::from_utf8_lossy(&drawn.to_bytes().unwrap()).into_owned();
    assert!(bytes.contains("(Approved) Tj"));
    assert!(bytes.contains("/Times-Bold"));
}

#[test]
fn test_draw_rejects_bad_instructions() {
    let form = PdfForm::new(&three_page_template()).unwrap();

    assert!(matches!(
        form.draw_text("late", 4, 10.0, 10.0),
        Err(FormError::InvalidPage(4, 3))
    ));
    assert!(matches!(
        form.draw_image(b"not an image", 1, 0.0, 0.0, 10.0, 10.0, 0.0),
        Err(FormError::InvalidImage(_))
    ));
    assert!(matches!(
        form.draw(&[OverlayInstruction::Text {
            page: 1,
            x: 0.0,
            y: 0.0,
            text: "x".to_string(),
            font: "Comic Sans".to_string(),
            font_size: 12.0,
            color: Color::black(),
        }]),
        Err(FormError::InvalidFont { .. })
    ));
    assert!(matches!(
        form.draw_line(1, (0.0, 0.0), (10.0, 10.0), Color::rgb(2.0, 0.0, 0.0)),
        Err(FormError::InvalidColor { .. })
    ));
}

#[test]
fn test_create_overlays_for_one_page() {
    let form = PdfForm::new(&three_page_template()).unwrap();
    let instructions = [
        OverlayInstruction::Line {
            page: 1,
            x1: 0.0,
            y1: 0.0,
            x2: 10.0,
            y2: 10.0,
            color: Color::red(),
            width: 1.0,
        },
        OverlayInstruction::Line {
            page: 3,
            x1: 0.0,
            y1: 0.0,
            x2: 10.0,
            y2: 10.0,
            color: Color::red(),
            width: 1.0,
        },
    ];

    let overlays = create_overlays(form.document(), Some(3), &instructions).unwrap();
    assert_eq!(overlays.len(), 3);
    assert!(overlays[0].is_none());
    assert!(overlays[1].is_none());

    let overlay = reopen(overlays[2].as_ref().unwrap());
    let page_id = overlay.page_id(1).unwrap();
    assert_eq!(overlay.page_size(page_id).unwrap(), (612.0, 792.0));
}

#[test]
fn test_coordinate_grid_covers_every_page() {
    let form = PdfForm::new(&three_page_template()).unwrap();
    let grid = form.coordinate_grid().unwrap();

    for page in 1..=3 {
        assert!(page_content(&grid, page).contains(" Do"), "page {page} has no grid");
    }
    let bytes = String::from_utf8_lossy(&grid.to_bytes().unwrap()).into_owned();
    assert!(bytes.contains("100, 100"));
    assert!(bytes.contains("500, 700"));

    assert!(matches!(
        form.generate_coordinate_grid(Color::red(), 0.0),
        Err(FormError::InvalidFormData(_))
    ));
}
