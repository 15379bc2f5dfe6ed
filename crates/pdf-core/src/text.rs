//! Text rendering utilities

use crate::document::Color;
use crate::Align;

/// Context for rendering text
pub struct TextRenderContext {
    /// PDF font resource name (e.g., "F1")
    pub font_name: String,
    /// Font size in points
    pub font_size: f32,
    /// Text width in points (for alignment)
    pub text_width: f64,
    /// Text color (RGB)
    pub color: Color,
}

/// Calculate X offset for text alignment
///
/// # Arguments
/// * `text_width` - Width of text in points
/// * `container_width` - Available width for alignment
/// * `align` - Desired alignment
pub fn calculate_x_offset(text_width: f64, container_width: f64, align: Align) -> f64 {
    match align {
        Align::Left => 0.0,
        Align::Center => (container_width - text_width) / 2.0,
        Align::Right => container_width - text_width,
    }
}

/// Encode text as a PDF literal string for a WinAnsi-encoded font
///
/// Delimiters are escaped, Latin-1 characters outside ASCII become octal
/// escapes and anything the encoding cannot represent becomes `?`.
pub fn encode_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('(');
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ' '..='~' => out.push(c),
            '\u{A0}'..='\u{FF}' => out.push_str(&format!("\\{:03o}", c as u32)),
            _ => out.push('?'),
        }
    }
    out.push(')');
    out
}

/// Generate PDF operators for text insertion
///
/// Creates the PDF text operators (BT, rg, Tf, Td, Tj, ET) to render text
/// at a specific position with alignment support.
///
/// # Arguments
/// * `encoded` - Encoded string operand, hex (`<0041>`) or literal (`(A)`)
/// * `x` - X coordinate in points (PDF coordinates, from left)
/// * `y` - Y coordinate in points (PDF coordinates, from bottom)
/// * `align` - Text alignment relative to `x`
/// * `ctx` - Text rendering context
pub fn generate_text_operators(
    encoded: &str,
    x: f64,
    y: f64,
    align: Align,
    ctx: &TextRenderContext,
) -> Vec<u8> {
    let x_offset = match align {
        Align::Left => 0.0,
        Align::Center => -ctx.text_width / 2.0,
        Align::Right => -ctx.text_width,
    };
    let final_x = x + x_offset;

    let mut ops = String::new();
    ops.push_str("BT\n");
    ops.push_str(&format!(
        "{} {} {} rg\n",
        ctx.color.r, ctx.color.g, ctx.color.b
    ));
    ops.push_str(&format!("/{} {} Tf\n", ctx.font_name, ctx.font_size));
    ops.push_str(&format!("{final_x} {y} Td\n"));
    ops.push_str(&format!("{encoded} Tj\n"));
    ops.push_str("ET\n");

    ops.into_bytes()
}

/// Split text into lines of at most `max_chars` characters, breaking on
/// whitespace
///
/// Words longer than `max_chars` keep a line of their own. Explicit line
/// breaks in the input are preserved.
pub fn simple_word_wrap(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();
            if current_line.is_empty() {
                current_line = word.to_string();
                current_len = word_len;
            } else if current_len + 1 + word_len <= max_chars {
                current_line.push(' ');
                current_line.push_str(word);
                current_len += 1 + word_len;
            } else {
                lines.push(std::mem::take(&mut current_line));
                current_line = word.to_string();
                current_len = word_len;
            }
        }
        lines.push(current_line);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(font_name: &str, font_size: f32, text_width: f64) -> TextRenderContext {
        TextRenderContext {
            font_name: font_name.to_string(),
            font_size,
            text_width,
            color: Color::black(),
        }
    }

    #[test]
    fn test_x_offset() {
        assert_eq!(calculate_x_offset(100.0, 500.0, Align::Left), 0.0);
        assert_eq!(calculate_x_offset(100.0, 500.0, Align::Center), 200.0);
        assert_eq!(calculate_x_offset(100.0, 500.0, Align::Right), 400.0);
    }

    #[test]
    fn test_encode_literal_escapes() {
        assert_eq!(encode_literal("Ada"), "(Ada)");
        assert_eq!(encode_literal("a(b)c\\"), "(a\\(b\\)c\\\\)");
        assert_eq!(encode_literal("é"), "(\\351)");
        assert_eq!(encode_literal("日"), "(?)");
    }

    #[test]
    fn test_generate_text_operators_left() {
        let ops = generate_text_operators("(Hello)", 100.0, 700.0, Align::Left, &ctx("F1", 12.0, 100.0));
        let ops_str = String::from_utf8(ops).unwrap();

        assert_eq!(ops_str, "BT\n0 0 0 rg\n/F1 12 Tf\n100 700 Td\n(Hello) Tj\nET\n");
    }

    #[test]
    fn test_generate_text_operators_center() {
        let ops =
            generate_text_operators("<0054006500730074>", 200.0, 600.0, Align::Center, &ctx("F2", 14.0, 100.0));
        let ops_str = String::from_utf8(ops).unwrap();

        assert!(ops_str.contains("/F2 14 Tf"));
        assert!(ops_str.contains("150 600 Td"));
        assert!(ops_str.contains("<0054006500730074> Tj"));
    }

    #[test]
    fn test_generate_text_operators_right() {
        let ops = generate_text_operators("(Right)", 300.0, 500.0, Align::Right, &ctx("F3", 16.0, 80.0));
        let ops_str = String::from_utf8(ops).unwrap();

        assert!(ops_str.contains("220 500 Td"));
    }

    #[test]
    fn test_generate_text_operators_with_color() {
        let mut context = ctx("F1", 12.0, 100.0);
        context.color = Color::red();

        let ops = generate_text_operators("<0041>", 100.0, 700.0, Align::Left, &context);
        let ops_str = String::from_utf8(ops).unwrap();

        assert!(ops_str.contains("1 0 0 rg"));
    }

    #[test]
    fn test_simple_word_wrap() {
        let lines = simple_word_wrap("Hello world this is a test", 12);
        assert_eq!(lines, vec!["Hello world", "this is a", "test"]);
    }

    #[test]
    fn test_word_wrap_edges() {
        assert_eq!(simple_word_wrap("Hello world", 0), vec!["Hello world"]);
        assert_eq!(simple_word_wrap("", 10), vec![""]);
        assert_eq!(simple_word_wrap("Hello world", 11), vec!["Hello world"]);
        assert_eq!(simple_word_wrap("Hello world", 10), vec!["Hello", "world"]);
        assert_eq!(
            simple_word_wrap("Supercalifragilistic", 10),
            vec!["Supercalifragilistic"]
        );
    }

    #[test]
    fn test_word_wrap_counts_chars_not_bytes() {
        let lines = simple_word_wrap("ééé ééé", 7);
        assert_eq!(lines, vec!["ééé ééé"]);
    }

    #[test]
    fn test_word_wrap_keeps_line_breaks() {
        let lines = simple_word_wrap("one\ntwo three", 20);
        assert_eq!(lines, vec!["one", "two three"]);
    }
}
