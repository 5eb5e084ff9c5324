pub const DEFAULT_APPROX_CHAR_WIDTH: f64 = 10.0;

const NARROW_CHARS: [char; 8] = ['i', 'l', 'j', ',', '.', ';', '!', '1'];
const NARROW_CHAR_RATIO: f64 = 0.5;
const ELLIPSIS: &str = "...";

fn guess_char_width(c: char, approx_char_width: f64) -> f64 {
    if NARROW_CHARS.contains(&c) {
        approx_char_width * NARROW_CHAR_RATIO
    } else {
        approx_char_width
    }
}

/// Rough rendered width of `text` in pixels.
pub fn approximate_width(text: &str, approx_char_width: f64) -> f64 {
    text.chars().map(|c| guess_char_width(c, approx_char_width)).sum()
}

/// Truncate an axis label with the default character width.
pub fn truncate_label(text: &str, max_width: f64) -> String {
    truncate_label_with(text, max_width, DEFAULT_APPROX_CHAR_WIDTH)
}

/// Keep the longest prefix that fits in `max_width` and mark the cut with
/// an ellipsis. Text that already fits is returned as is.
pub fn truncate_label_with(text: &str, max_width: f64, approx_char_width: f64) -> String {
    if approximate_width(text, approx_char_width) <= max_width {
        return text.to_string();
    }

    let mut total_width = 0.0;
    let mut prefix = String::new();
    for c in text.chars() {
        total_width += guess_char_width(c, approx_char_width);
        if total_width > max_width {
            break;
        }
        prefix.push(c);
    }

    prefix.push_str(ELLIPSIS);
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_unchanged() {
        assert_eq!(truncate_label("prod", 40.0), "prod");
        assert_eq!(truncate_label("", 0.0), "");
    }

    #[test]
    fn test_narrow_chars_count_half() {
        assert_eq!(approximate_width("ill", 10.0), 15.0);
        assert_eq!(approximate_width("a1!", 10.0), 20.0);
        assert_eq!(truncate_label("illi", 20.0), "illi");
    }

    #[test]
    fn test_truncates_with_ellipsis() {
        assert_eq!(truncate_label("catalog-service", 50.0), "catal...");
        assert_eq!(truncate_label_with("abcdef", 9.0, 3.0), "abc...");
    }

    #[test]
    fn test_zero_width_keeps_only_ellipsis() {
        assert_eq!(truncate_label("abc", 0.0), "...");
    }
}
