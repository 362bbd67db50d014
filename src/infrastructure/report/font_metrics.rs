// Advance widths for the standard Helvetica font, in 1/1000 em, for the
// printable ASCII range 0x20..=0x7E (from the Adobe core font metrics).
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const FALLBACK_WIDTH: u16 = 556;
const BOLD_SCALE: f32 = 1.06;

pub const ELLIPSIS: &str = "...";

fn glyph_width(ch: char) -> u16 {
    let code = ch as u32;
    if (0x20..=0x7E).contains(&code) {
        HELVETICA_WIDTHS[(code - 0x20) as usize]
    } else {
        FALLBACK_WIDTH
    }
}

/// Rendered width of `text` in points.
pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let units: u32 = text.chars().map(|ch| u32::from(glyph_width(ch))).sum();
    let width = units as f32 * size / 1000.0;
    if bold {
        width * BOLD_SCALE
    } else {
        width
    }
}

/// Truncate `text` with a trailing ellipsis so it fits in `max_width`.
pub fn fit_text(text: &str, size: f32, bold: bool, max_width: f32) -> String {
    if text_width(text, size, bold) <= max_width {
        return text.to_string();
    }

    let budget = max_width - text_width(ELLIPSIS, size, bold);
    if budget <= 0.0 {
        return String::new();
    }

    let mut fitted = String::new();
    let mut used = 0.0;
    for ch in text.chars() {
        let mut buf = [0u8; 4];
        let advance = text_width(ch.encode_utf8(&mut buf), size, bold);
        if used + advance > budget {
            break;
        }
        used += advance;
        fitted.push(ch);
    }
    fitted.push_str(ELLIPSIS);
    fitted
}

/// Greedy word wrap to `max_width`; words longer than a line are truncated.
pub fn wrap_text(text: &str, size: f32, bold: bool, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if text_width(&candidate, size, bold) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        current = fit_text(word, size, bold, max_width);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
