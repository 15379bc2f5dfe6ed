//! Appearance streams for filled text fields

use crate::widget::Widget;
use crate::Result;
use pdf_core::{simple_word_wrap, Align, Canvas, CanvasFont, Color};

/// Gap between the widget border and its text, in points
const PADDING: f64 = 2.0;
/// Line height as a multiple of the font size
const LEADING: f64 = 1.15;
/// Approximate cap height as a fraction of the font size
const CAP_HEIGHT: f64 = 0.7;

/// Draw `text` the way a viewer would show it inside the widget
///
/// Comb fields put one character in the middle of each of `max_length`
/// cells. Other fields are wrapped at `wrap_length` characters (or at
/// explicit line breaks), aligned per the widget's quadding and shifted by
/// its offsets. A single line is centered vertically; several lines start
/// at the top.
pub(crate) fn text_appearance(
    widget: &Widget,
    text: &str,
    font: &CanvasFont,
    font_size: f32,
    color: Color,
) -> Result<Canvas> {
    let width = widget.width();
    let height = widget.height();
    let size = font_size as f64;
    let style = &widget.style;

    let mut canvas = Canvas::new(width, height);
    canvas.push_operators(b"/Tx BMC\nq\n");
    canvas.push_operators(
        format!("{PADDING} {PADDING} {} {} re\nW\nn\n", width - 2.0 * PADDING, height - 2.0 * PADDING).as_bytes(),
    );

    let centered_baseline = (height - size * CAP_HEIGHT) / 2.0 + style.y_offset;
    let comb_cells = widget
        .constants
        .max_length
        .filter(|cells| widget.constants.comb && *cells > 0);

    if let Some(cells) = comb_cells {
        let cell_width = width / cells as f64;
        for (i, c) in text.chars().take(cells).enumerate() {
            let x = cell_width * (i as f64 + 0.5) + style.x_offset;
            canvas.draw_text_aligned(
                x,
                centered_baseline,
                &c.to_string(),
                font,
                font_size,
                color,
                Align::Center,
            )?;
        }
    } else {
        let lines = match style.wrap_length {
            Some(max_chars) => simple_word_wrap(text, max_chars),
            None => text.split('\n').map(str::to_string).collect(),
        };
        let x = match style.alignment {
            Align::Left => PADDING,
            Align::Center => width / 2.0,
            Align::Right => width - PADDING,
        } + style.x_offset;
        let first_baseline = if lines.len() > 1 {
            height - PADDING - size + style.y_offset
        } else {
            centered_baseline
        };

        for (i, line) in lines.iter().enumerate() {
            let y = first_baseline - i as f64 * size * LEADING;
            canvas.draw_text_aligned(x, y, line, font, font_size, color, style.alignment)?;
        }
    }

    canvas.push_operators(b"Q\nEMC\n");
    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::WidgetKind;
    use pdf_core::StandardFont;

    fn text_widget(width: f64, height: f64) -> Widget {
        let mut widget = Widget::new("field", WidgetKind::Text);
        widget.rect = [100.0, 100.0, 100.0 + width, 100.0 + height];
        widget
    }

    fn render(widget: &Widget, text: &str) -> String {
        let canvas = text_appearance(
            widget,
            text,
            &StandardFont::Courier.into(),
            10.0,
            Color::black(),
        )
        .expect("Failed to build appearance");
        assert_eq!(canvas.width(), widget.width());
        String::from_utf8(canvas.content().to_vec()).unwrap()
    }

    #[test]
    fn test_single_line_is_marked_and_clipped() {
        let content = render(&text_widget(120.0, 20.0), "Ada");
        assert!(content.starts_with("/Tx BMC\nq\n2 2 116 16 re\nW\nn\n"));
        assert!(content.ends_with("Q\nEMC\n"));
        // Left aligned at the padding, baseline centered: (20 - 7) / 2
        assert!(content.contains("2 6.5 Td\n(Ada) Tj"));
    }

    #[test]
    fn test_right_alignment_and_offsets() {
        let mut widget = text_widget(120.0, 20.0);
        widget.style.alignment = Align::Right;
        widget.style.x_offset = -4.0;
        widget.style.y_offset = 1.5;

        let content = render(&widget, "Ada");
        // Courier is 6pt per character at size 10
        assert!(content.contains("96 8 Td"));
    }

    #[test]
    fn test_wrapped_lines_start_at_top() {
        let mut widget = text_widget(200.0, 60.0);
        widget.style.wrap_length = Some(5);

        let content = render(&widget, "one two three");
        assert_eq!(content.matches(" Tj").count(), 3);
        assert!(content.contains("2 48 Td\n(one) Tj"));
        assert!(content.contains("2 36.5 Td\n(two) Tj"));
    }

    #[test]
    fn test_comb_puts_one_char_per_cell() {
        let mut widget = text_widget(100.0, 20.0);
        widget.constants.max_length = Some(5);
        widget.constants.comb = true;

        let content = render(&widget, "1234");
        assert_eq!(content.matches(" Tj").count(), 4);
        // Cell width 20, each character centered: 10 - 3 = 7
        assert!(content.contains("7 6.5 Td\n(1) Tj"));
        assert!(content.contains("67 6.5 Td\n(4) Tj"));
    }

    #[test]
    fn test_empty_text_draws_nothing() {
        let content = render(&text_widget(100.0, 20.0), "");
        assert!(!content.contains("Tj"));
    }
}
