//! In-memory form fixtures shared by the integration tests

#![allow(dead_code)]

use base64::Engine;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use pdf_core::PdfDocument;

/// `/Ff` bits used by the fixtures
pub const COMB: i64 = 1 << 24;
pub const COMBO: i64 = 1 << 17;
pub const PUSHBUTTON: i64 = 1 << 16;
pub const RADIO: i64 = 1 << 15;
pub const NO_TOGGLE_TO_OFF: i64 = 1 << 14;

/// Builds a Letter-sized form page by page
pub struct FormBuilder {
    doc: Document,
    pages_id: ObjectId,
    pages: Vec<(ObjectId, Vec<Object>)>,
    fields: Vec<Object>,
}

impl FormBuilder {
    /// `pages` pages, each showing its own number
    pub fn new(pages: usize) -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let pages = (1..=pages)
            .map(|n| {
                let content = format!("BT /F1 24 Tf 72 720 Td (Page {n}) Tj ET");
                let contents = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
                let page_id = doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "Contents" => contents,
                });
                (page_id, Vec::new())
            })
            .collect();

        Self {
            doc,
            pages_id,
            pages,
            fields: Vec::new(),
        }
    }

    fn page_id(&self, page: usize) -> ObjectId {
        self.pages[page - 1].0
    }

    /// Register a terminal field that is its own widget annotation
    fn widget(&mut self, page: usize, rect: [i64; 4], mut dict: Dictionary) -> ObjectId {
        dict.set("Type", "Annot");
        dict.set("Subtype", "Widget");
        dict.set("Rect", rect.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>());
        dict.set("P", self.page_id(page));
        let id = self.doc.add_object(dict);
        self.pages[page - 1].1.push(Object::Reference(id));
        id
    }

    pub fn text(&mut self, page: usize, name: &str, rect: [i64; 4]) -> ObjectId {
        self.text_with(page, name, rect, Dictionary::new())
    }

    /// Text field with extra entries such as `/MaxLen` or `/Ff`
    pub fn text_with(&mut self, page: usize, name: &str, rect: [i64; 4], extra: Dictionary) -> ObjectId {
        let mut dict = dictionary! {
            "FT" => "Tx",
            "T" => Object::string_literal(name),
            "DA" => Object::string_literal("/Helv 10 Tf 0 g"),
        };
        for (key, value) in extra.iter() {
            dict.set(key.clone(), value.clone());
        }
        let id = self.widget(page, rect, dict);
        self.fields.push(Object::Reference(id));
        id
    }

    pub fn checkbox(&mut self, page: usize, name: &str, rect: [i64; 4]) -> ObjectId {
        let normal = self.states(&["Yes", "Off"]);
        let id = self.widget(
            page,
            rect,
            dictionary! {
                "FT" => "Btn",
                "T" => Object::string_literal(name),
                "V" => "Off",
                "AS" => "Off",
                "AP" => dictionary! { "N" => normal },
            },
        );
        self.fields.push(Object::Reference(id));
        id
    }

    /// Radio group with one kid per state, laid out left to right
    pub fn radio(&mut self, page: usize, name: &str, states: &[&str]) -> ObjectId {
        self.radio_group(page, name, states, false)
    }

    /// Radio group whose flags sit on each kid annotation, not the parent
    pub fn radio_with_kid_flags(&mut self, page: usize, name: &str, states: &[&str]) -> ObjectId {
        self.radio_group(page, name, states, true)
    }

    fn radio_group(&mut self, page: usize, name: &str, states: &[&str], kid_flags: bool) -> ObjectId {
        let parent = self.doc.new_object_id();
        let mut kids = Vec::new();
        for (i, state) in states.iter().enumerate() {
            let normal = self.states(&[*state, "Off"]);
            let x = 100 + 30 * i as i64;
            let mut dict = dictionary! {
                "Parent" => parent,
                "AS" => "Off",
                "AP" => dictionary! { "N" => normal },
            };
            if kid_flags {
                dict.set("Ff", RADIO | NO_TOGGLE_TO_OFF);
            }
            let kid = self.widget(page, [x, 500, x + 20, 520], dict);
            kids.push(Object::Reference(kid));
        }

        let mut dict = dictionary! {
            "FT" => "Btn",
            "T" => Object::string_literal(name),
            "V" => "Off",
            "Kids" => kids,
        };
        if !kid_flags {
            dict.set("Ff", RADIO | NO_TOGGLE_TO_OFF);
        }
        self.doc.objects.insert(parent, Object::Dictionary(dict));
        self.fields.push(Object::Reference(parent));
        parent
    }

    pub fn dropdown(&mut self, page: usize, name: &str, options: &[&str]) -> ObjectId {
        let opt: Vec<Object> = options.iter().map(|o| Object::string_literal(*o)).collect();
        let id = self.widget(
            page,
            [100, 400, 250, 420],
            dictionary! {
                "FT" => "Ch",
                "Ff" => COMBO,
                "T" => Object::string_literal(name),
                "Opt" => opt,
                "DA" => Object::string_literal("/Helv 10 Tf 0 g"),
            },
        );
        self.fields.push(Object::Reference(id));
        id
    }

    /// Icon-only push button, the usual image placeholder
    pub fn image(&mut self, page: usize, name: &str, rect: [i64; 4]) -> ObjectId {
        let id = self.widget(
            page,
            rect,
            dictionary! {
                "FT" => "Btn",
                "Ff" => PUSHBUTTON,
                "T" => Object::string_literal(name),
                "MK" => dictionary! { "TP" => 1 },
            },
        );
        self.fields.push(Object::Reference(id));
        id
    }

    pub fn signature(&mut self, page: usize, name: &str, rect: [i64; 4]) -> ObjectId {
        let id = self.widget(
            page,
            rect,
            dictionary! {
                "FT" => "Sig",
                "T" => Object::string_literal(name),
            },
        );
        self.fields.push(Object::Reference(id));
        id
    }

    /// Text field written the way Sejda does: the annotation carries a
    /// generated name of its own and the real one sits on the parent
    pub fn sejda_text(&mut self, page: usize, name: &str, rect: [i64; 4]) -> ObjectId {
        let parent = self.doc.new_object_id();
        let kid = self.widget(
            page,
            rect,
            dictionary! {
                "Parent" => parent,
                "T" => Object::string_literal(format!("{name}_widget")),
            },
        );
        self.doc.objects.insert(
            parent,
            Object::Dictionary(dictionary! {
                "FT" => "Tx",
                "T" => Object::string_literal(name),
                "DA" => Object::string_literal("/Helv 10 Tf 0 g"),
                "Kids" => vec![Object::Reference(kid)],
            }),
        );
        self.fields.push(Object::Reference(parent));
        parent
    }

    /// Appearance state dictionary with an empty stream per state
    fn states(&mut self, names: &[&str]) -> Dictionary {
        let mut dict = Dictionary::new();
        for name in names {
            let stream = self.doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0.into(), 0.into(), 20.into(), 20.into()],
                },
                Vec::new(),
            ));
            dict.set(name.as_bytes(), stream);
        }
        dict
    }

    pub fn build(mut self) -> Vec<u8> {
        let mut kids = Vec::new();
        for (page_id, annots) in &self.pages {
            if let Ok(Object::Dictionary(page)) = self.doc.get_object_mut(*page_id) {
                if !annots.is_empty() {
                    page.set("Annots", annots.clone());
                }
            }
            kids.push(Object::Reference(*page_id));
        }

        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => dictionary! {
                    "Font" => dictionary! {
                        "F1" => dictionary! {
                            "Type" => "Font",
                            "Subtype" => "Type1",
                            "BaseFont" => "Helvetica",
                        },
                    },
                },
            }),
        );

        let acroform = self.doc.add_object(dictionary! {
            "Fields" => self.fields.clone(),
            "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
            "DR" => dictionary! {
                "Font" => dictionary! {
                    "Helv" => dictionary! {
                        "Type" => "Font",
                        "Subtype" => "Type1",
                        "BaseFont" => "Helvetica",
                    },
                },
            },
            "NeedAppearances" => false,
        });
        let catalog = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
            "AcroForm" => acroform,
        });
        self.doc.trailer.set("Root", catalog);

        let mut buffer = Vec::new();
        self.doc.save_to(&mut buffer).expect("Failed to save fixture");
        buffer
    }
}

/// Three pages: `name` on the first, `subscribe` on the second and a
/// `plan` radio group with three options on the third
pub fn three_page_template() -> Vec<u8> {
    let mut builder = FormBuilder::new(3);
    builder.text(1, "name", [100, 700, 300, 720]);
    builder.checkbox(2, "subscribe", [100, 600, 120, 620]);
    builder.radio(3, "plan", &["basic", "pro", "team"]);
    builder.build()
}

/// Single page with a text field and a checkbox
pub fn one_page_template() -> Vec<u8> {
    let mut builder = FormBuilder::new(1);
    builder.text(1, "name", [100, 700, 300, 720]);
    builder.checkbox(1, "subscribe", [100, 600, 120, 620]);
    builder.build()
}

/// One page with every other kind of field
pub fn kitchen_sink_template() -> Vec<u8> {
    let mut builder = FormBuilder::new(1);
    builder.text_with(
        1,
        "zip",
        [100, 650, 200, 670],
        dictionary! { "MaxLen" => 5, "Ff" => COMB },
    );
    builder.dropdown(1, "color", &["red", "green", "blue"]);
    builder.image(1, "photo", [300, 300, 400, 400]);
    builder.signature(1, "signature", [300, 100, 500, 150]);
    builder.build()
}

/// 8x8 opaque RGB PNG
pub fn png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([20, 40, 200]));
    let mut buffer = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
        .expect("Failed to create PNG");
    buffer
}

pub fn png_base64() -> String {
    base64::engine::general_purpose::STANDARD.encode(png())
}

/// Parse serialized output for inspection
pub fn reopen(bytes: &[u8]) -> PdfDocument {
    PdfDocument::open_from_bytes(bytes).expect("Output should parse")
}

/// Text of a string object, ignoring its encoding form
pub fn text(obj: Option<&Object>) -> Option<String> {
    match obj? {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Name of a name object
pub fn name(obj: Option<&Object>) -> Option<String> {
    match obj? {
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// `/V` of every field and `/AS` of every annotation, by field name
pub fn value_layer(form: &pdf_form::PdfForm) -> Vec<String> {
    let doc = form.document();
    form.widgets()
        .values()
        .map(|widget| {
            let states: Vec<String> = widget
                .annotation_ids()
                .iter()
                .map(|annot| format!("{:?}", doc.get(*annot, b"AS")))
                .collect();
            format!(
                "{} V={:?} AS={states:?}",
                widget.key,
                doc.get(widget.field_id(), b"V")
            )
        })
        .collect()
}

/// Decompressed content of a widget's normal appearance stream
pub fn appearance_content(doc: &PdfDocument, annot: ObjectId) -> String {
    let stream = doc
        .get(annot, b"AP")
        .and_then(|ap| ap.as_dict().ok())
        .and_then(|ap| ap.get(b"N").ok())
        .map(|n| doc.resolve(n))
        .and_then(|n| n.as_stream().ok())
        .expect("Widget should have a normal appearance stream");
    let content = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    String::from_utf8_lossy(&content).into_owned()
}
