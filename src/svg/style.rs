/// AutoCAD colour indices cycled over layers: white, red, green, blue,
/// orange, magenta, cyan, yellow
const LAYER_COLORS: [i16; 8] = [7, 1, 3, 5, 30, 6, 4, 2];

/// Layer name used for shapes outside any layer
pub const DEFAULT_LAYER: &str = "0";

/// ACI colour for the layer at `position` in the layer table
pub fn layer_color(position: usize) -> i16 {
    LAYER_COLORS[position % LAYER_COLORS.len()]
}

/// Longest layer name an R12 reader accepts
const MAX_LAYER_NAME: usize = 31;

/// Make a layer name valid for R12: ASCII letters, digits, `$`, `-` and `_`,
/// at most 31 characters. Anything else becomes `_`.
pub fn sanitize_layer_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|ch| match ch {
            c if c.is_ascii_alphanumeric() || matches!(c, '$' | '-' | '_') => c,
            _ => '_',
        })
        .take(MAX_LAYER_NAME)
        .collect();

    if cleaned.is_empty() {
        DEFAULT_LAYER.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_cycles() {
        assert_eq!(layer_color(0), 7);
        assert_eq!(layer_color(3), 5);
        assert_eq!(layer_color(8), 7);
        assert_eq!(layer_color(9), 1);
    }

    #[test]
    fn test_sanitize_replaces_reserved_characters() {
        assert_eq!(sanitize_layer_name("Cut/Outer: 3mm"), "Cut_Outer__3mm");
        assert_eq!(sanitize_layer_name("a\tb"), "a_b");
        assert_eq!(sanitize_layer_name("Engrave"), "Engrave");
        assert_eq!(sanitize_layer_name("$TOP-1_a"), "$TOP-1_a");
    }

    #[test]
    fn test_sanitize_spaces_and_non_ascii() {
        assert_eq!(sanitize_layer_name("Cut Outline"), "Cut_Outline");
        assert_eq!(sanitize_layer_name("Gravur Ä"), "Gravur__");
    }

    #[test]
    fn test_sanitize_truncates_long_names() {
        let name = sanitize_layer_name(&"x".repeat(40));
        assert_eq!(name.len(), 31);
    }

    #[test]
    fn test_sanitize_empty_name() {
        assert_eq!(sanitize_layer_name(""), "0");
        assert_eq!(sanitize_layer_name("   "), "0");
    }
}
