//! Value-typed entry point over a document and its widgets

use crate::assembly::{change_version, concatenate, extract_page, version};
use crate::filler::{fill, set_need_appearances};
use crate::options::FormOptions;
use crate::overlay::{create_overlays, generate_coordinate_grid, merge, OverlayInstruction};
use crate::schema::{generate_schema, sample_data, validate_data};
use crate::template::build_widgets;
use crate::widget::{FieldValue, Widget, WidgetKind};
use crate::{FormError, Result};
use indexmap::IndexMap;
use pdf_core::{Color, PdfDocument};
use serde_json::{Map, Value};
use std::ops::Add;

/// Grid spacing used by [`PdfForm::coordinate_grid`]
const DEFAULT_GRID_MARGIN: f64 = 100.0;
/// Line width for [`PdfForm::draw_line`]
const DEFAULT_LINE_WIDTH: f64 = 1.0;

/// A form document together with its widget model
///
/// Every operation leaves `self` untouched and returns a new form, so a
/// loaded template can be filled any number of times.
#[derive(Debug, Clone)]
pub struct PdfForm {
    document: PdfDocument,
    widgets: IndexMap<String, Widget>,
    options: FormOptions,
}

impl PdfForm {
    /// Load a form with default options
    pub fn new(bytes: &[u8]) -> Result<Self> {
        Self::with_options(bytes, FormOptions::default())
    }

    /// Load a form, applying `options` to its text widgets
    pub fn with_options(bytes: &[u8], options: FormOptions) -> Result<Self> {
        let document = PdfDocument::open_from_bytes(bytes)?;
        Self::from_document(document, options)
    }

    /// Wrap an already parsed document
    pub fn from_document(document: PdfDocument, options: FormOptions) -> Result<Self> {
        options.validate()?;

        let mut widgets = build_widgets(&document, options.sejda);
        for widget in widgets.values_mut() {
            apply_global_style(widget, &options);
            widget.validate()?;
        }

        Ok(Self {
            document,
            widgets,
            options,
        })
    }

    /// A form with no pages; concatenating with it changes nothing
    pub fn empty() -> Self {
        Self {
            document: PdfDocument::with_version("1.7"),
            widgets: IndexMap::new(),
            options: FormOptions::default(),
        }
    }

    pub fn document(&self) -> &PdfDocument {
        &self.document
    }

    pub fn widgets(&self) -> &IndexMap<String, Widget> {
        &self.widgets
    }

    /// Widgets for adjusting styles or constraints before a fill
    pub fn widgets_mut(&mut self) -> &mut IndexMap<String, Widget> {
        &mut self.widgets
    }

    pub fn widget(&self, key: &str) -> Option<&Widget> {
        self.widgets.get(key)
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    /// Fill fields from a JSON object keyed by field name
    ///
    /// Keys without a matching widget are skipped. Nothing is written
    /// unless every value passes validation.
    pub fn fill(&self, data: &Value, flatten: bool) -> Result<PdfForm> {
        let Some(data) = data.as_object() else {
            return Err(FormError::InvalidFormData(format!(
                "expected a JSON object, got {data}"
            )));
        };

        let mut widgets = self.widgets.clone();
        for (key, value) in data {
            let Some(widget) = widgets.get_mut(key) else {
                log::debug!("no field named {key}, skipping");
                continue;
            };
            widget.value = Some(FieldValue::from_json(key, value)?);
        }

        let mut document = fill(&self.document, &widgets, flatten)?;
        set_need_appearances(&mut document, self.options.need_appearances)?;

        Ok(Self {
            document,
            widgets,
            options: self.options.clone(),
        })
    }

    /// Write `text` at `(x, y)` on `page` in the global font
    pub fn draw_text(&self, text: &str, page: usize, x: f64, y: f64) -> Result<PdfForm> {
        self.draw(&[OverlayInstruction::Text {
            page,
            x,
            y,
            text: text.to_string(),
            font: self.options.global_font.clone(),
            font_size: self.options.global_font_size,
            color: self.options.global_font_color,
        }])
    }

    /// Place a JPEG or PNG image, rotated clockwise by `rotation` degrees
    #[allow(clippy::too_many_arguments)]
    pub fn draw_image(
        &self,
        data: &[u8],
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        rotation: f64,
    ) -> Result<PdfForm> {
        self.draw(&[OverlayInstruction::Image {
            page,
            x,
            y,
            width,
            height,
            data: data.to_vec(),
            rotation,
        }])
    }

    pub fn draw_line(
        &self,
        page: usize,
        from: (f64, f64),
        to: (f64, f64),
        color: Color,
    ) -> Result<PdfForm> {
        self.draw(&[OverlayInstruction::Line {
            page,
            x1: from.0,
            y1: from.1,
            x2: to.0,
            y2: to.1,
            color,
            width: DEFAULT_LINE_WIDTH,
        }])
    }

    /// Apply a batch of drawing instructions in one overlay per page
    pub fn draw(&self, instructions: &[OverlayInstruction]) -> Result<PdfForm> {
        let overlays = create_overlays(&self.document, None, instructions)?;
        Ok(self.with_document(merge(&self.document, &overlays)?))
    }

    /// Labelled grid every `margin` points on every page
    pub fn generate_coordinate_grid(&self, color: Color, margin: f64) -> Result<PdfForm> {
        Ok(self.with_document(generate_coordinate_grid(&self.document, color, margin)?))
    }

    /// Red grid every 100 points
    pub fn coordinate_grid(&self) -> Result<PdfForm> {
        self.generate_coordinate_grid(Color::red(), DEFAULT_GRID_MARGIN)
    }

    /// One single-page form per page, in order
    pub fn pages(&self) -> Result<Vec<PdfForm>> {
        (1..=self.page_count())
            .map(|page| self.rebuild(extract_page(&self.document, page)?))
            .collect()
    }

    /// `self` followed by every page of `other`
    pub fn concat(&self, other: &PdfForm) -> Result<PdfForm> {
        self.rebuild(concatenate(&self.document, &other.document)?)
    }

    /// Recognized header or catalog version
    pub fn version(&self) -> Option<String> {
        version(&self.document)
    }

    pub fn change_version(&self, target: &str) -> Result<PdfForm> {
        Ok(self.with_document(change_version(&self.document, target)?))
    }

    /// JSON schema describing the values [`PdfForm::fill`] accepts
    pub fn schema(&self) -> Value {
        generate_schema(&self.widgets)
    }

    pub fn sample_data(&self) -> Map<String, Value> {
        sample_data(&self.widgets)
    }

    /// Check `data` against [`PdfForm::schema`]
    pub fn validate_data(&self, data: &Value) -> Result<()> {
        validate_data(&self.schema(), data)
    }

    /// Serialize the document
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.document.to_bytes()?)
    }

    /// Same widgets over a document whose fields were not touched
    fn with_document(&self, document: PdfDocument) -> PdfForm {
        Self {
            document,
            widgets: self.widgets.clone(),
            options: self.options.clone(),
        }
    }

    /// Fresh widget model over a restructured document
    fn rebuild(&self, document: PdfDocument) -> Result<PdfForm> {
        Self::from_document(document, self.options.clone())
    }
}

impl Default for PdfForm {
    fn default() -> Self {
        Self::empty()
    }
}

impl Add for &PdfForm {
    type Output = Result<PdfForm>;

    fn add(self, other: &PdfForm) -> Self::Output {
        self.concat(other)
    }
}

/// Fill unset text style attributes from the form options
fn apply_global_style(widget: &mut Widget, options: &FormOptions) {
    match widget.kind {
        WidgetKind::Text | WidgetKind::Dropdown => {}
        WidgetKind::Checkbox | WidgetKind::Radio | WidgetKind::Signature | WidgetKind::Image => {
            return
        }
    }

    let style = &mut widget.style;
    style.font.get_or_insert_with(|| options.global_font.clone());
    style.font_size.get_or_insert(options.global_font_size);
    style.font_color.get_or_insert(options.global_font_color);
}
