//! Color normalization for style payloads.
//!
//! Accepted inputs: CSS named colors, `#abc`, `#aabbcc`, `rgb(r, g, b)`, and
//! `rgba(r, g, b, a)` (alpha ignored). Everything normalizes to lowercase
//! 6-digit hex without the leading `#`. Malformed values return `None` and
//! are dropped from the payload by the caller.

/// Normalize a color string, or `None` if it cannot be parsed.
#[must_use]
pub fn normalize_color(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(hex) = trimmed.strip_prefix('#') {
        return normalize_hex(hex);
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("rgb(") || lower.starts_with("rgba(") {
        return normalize_rgb(&lower);
    }
    named_color(&lower).map(ToOwned::to_owned)
}

fn normalize_hex(hex: &str) -> Option<String> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => Some(
            hex.chars()
                .flat_map(|c| [c, c])
                .collect::<String>()
                .to_ascii_lowercase(),
        ),
        6 => Some(hex.to_ascii_lowercase()),
        _ => None,
    }
}

fn normalize_rgb(lower: &str) -> Option<String> {
    let inner = lower.split_once('(')?.1.strip_suffix(')')?;
    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    let is_rgba = lower.starts_with("rgba(");
    if (is_rgba && parts.len() != 4) || (!is_rgba && parts.len() != 3) {
        return None;
    }
    let r = parts[0].parse::<u16>().ok().filter(|&v| v <= 255)?;
    let g = parts[1].parse::<u16>().ok().filter(|&v| v <= 255)?;
    let b = parts[2].parse::<u16>().ok().filter(|&v| v <= 255)?;
    if is_rgba {
        // Alpha must at least parse; its value is discarded.
        let _ = parts[3].parse::<f64>().ok()?;
    }
    Some(format!("{r:02x}{g:02x}{b:02x}"))
}

/// The CSS named color table.
#[allow(clippy::too_many_lines)]
fn named_color(name: &str) -> Option<&'static str> {
    let hex = match name {
        "aliceblue" => "f0f8ff",
        "antiquewhite" => "faebd7",
        "aqua" | "cyan" => "00ffff",
        "aquamarine" => "7fffd4",
        "azure" => "f0ffff",
        "beige" => "f5f5dc",
        "bisque" => "ffe4c4",
        "black" => "000000",
        "blanchedalmond" => "ffebcd",
        "blue" => "0000ff",
        "blueviolet" => "8a2be2",
        "brown" => "a52a2a",
        "burlywood" => "deb887",
        "cadetblue" => "5f9ea0",
        "chartreuse" => "7fff00",
        "chocolate" => "d2691e",
        "coral" => "ff7f50",
        "cornflowerblue" => "6495ed",
        "cornsilk" => "fff8dc",
        "crimson" => "dc143c",
        "darkblue" => "00008b",
        "darkcyan" => "008b8b",
        "darkgoldenrod" => "b8860b",
        "darkgray" | "darkgrey" => "a9a9a9",
        "darkgreen" => "006400",
        "darkkhaki" => "bdb76b",
        "darkmagenta" => "8b008b",
        "darkolivegreen" => "556b2f",
        "darkorange" => "ff8c00",
        "darkorchid" => "9932cc",
        "darkred" => "8b0000",
        "darksalmon" => "e9967a",
        "darkseagreen" => "8fbc8f",
        "darkslateblue" => "483d8b",
        "darkslategray" | "darkslategrey" => "2f4f4f",
        "darkturquoise" => "00ced1",
        "darkviolet" => "9400d3",
        "deeppink" => "ff1493",
        "deepskyblue" => "00bfff",
        "dimgray" | "dimgrey" => "696969",
        "dodgerblue" => "1e90ff",
        "firebrick" => "b22222",
        "floralwhite" => "fffaf0",
        "forestgreen" => "228b22",
        "fuchsia" | "magenta" => "ff00ff",
        "gainsboro" => "dcdcdc",
        "ghostwhite" => "f8f8ff",
        "gold" => "ffd700",
        "goldenrod" => "daa520",
        "gray" | "grey" => "808080",
        "green" => "008000",
        "greenyellow" => "adff2f",
        "honeydew" => "f0fff0",
        "hotpink" => "ff69b4",
        "indianred" => "cd5c5c",
        "indigo" => "4b0082",
        "ivory" => "fffff0",
        "khaki" => "f0e68c",
        "lavender" => "e6e6fa",
        "lavenderblush" => "fff0f5",
        "lawngreen" => "7cfc00",
        "lemonchiffon" => "fffacd",
        "lightblue" => "add8e6",
        "lightcoral" => "f08080",
        "lightcyan" => "e0ffff",
        "lightgoldenrodyellow" => "fafad2",
        "lightgray" | "lightgrey" => "d3d3d3",
        "lightgreen" => "90ee90",
        "lightpink" => "ffb6c1",
        "lightsalmon" => "ffa07a",
        "lightseagreen" => "20b2aa",
        "lightskyblue" => "87cefa",
        "lightslategray" | "lightslategrey" => "778899",
        "lightsteelblue" => "b0c4de",
        "lightyellow" => "ffffe0",
        "lime" => "00ff00",
        "limegreen" => "32cd32",
        "linen" => "faf0e6",
        "maroon" => "800000",
        "mediumaquamarine" => "66cdaa",
        "mediumblue" => "0000cd",
        "mediumorchid" => "ba55d3",
        "mediumpurple" => "9370db",
        "mediumseagreen" => "3cb371",
        "mediumslateblue" => "7b68ee",
        "mediumspringgreen" => "00fa9a",
        "mediumturquoise" => "48d1cc",
        "mediumvioletred" => "c71585",
        "midnightblue" => "191970",
        "mintcream" => "f5fffa",
        "mistyrose" => "ffe4e1",
        "moccasin" => "ffe4b5",
        "navajowhite" => "ffdead",
        "navy" => "000080",
        "oldlace" => "fdf5e6",
        "olive" => "808000",
        "olivedrab" => "6b8e23",
        "orange" => "ffa500",
        "orangered" => "ff4500",
        "orchid" => "da70d6",
        "palegoldenrod" => "eee8aa",
        "palegreen" => "98fb98",
        "paleturquoise" => "afeeee",
        "palevioletred" => "db7093",
        "papayawhip" => "ffefd5",
        "peachpuff" => "ffdab9",
        "peru" => "cd853f",
        "pink" => "ffc0cb",
        "plum" => "dda0dd",
        "powderblue" => "b0e0e6",
        "purple" => "800080",
        "rebeccapurple" => "663399",
        "red" => "ff0000",
        "rosybrown" => "bc8f8f",
        "royalblue" => "4169e1",
        "saddlebrown" => "8b4513",
        "salmon" => "fa8072",
        "sandybrown" => "f4a460",
        "seagreen" => "2e8b57",
        "seashell" => "fff5ee",
        "sienna" => "a0522d",
        "silver" => "c0c0c0",
        "skyblue" => "87ceeb",
        "slateblue" => "6a5acd",
        "slategray" | "slategrey" => "708090",
        "snow" => "fffafa",
        "springgreen" => "00ff7f",
        "steelblue" => "4682b4",
        "tan" => "d2b48c",
        "teal" => "008080",
        "thistle" => "d8bfd8",
        "tomato" => "ff6347",
        "turquoise" => "40e0d0",
        "violet" => "ee82ee",
        "wheat" => "f5deb3",
        "white" => "ffffff",
        "whitesmoke" => "f5f5f5",
        "yellow" => "ffff00",
        "yellowgreen" => "9acd32",
        _ => return None,
    };
    Some(hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_colors_normalize() {
        assert_eq!(normalize_color("red").as_deref(), Some("ff0000"));
        assert_eq!(normalize_color("RebeccaPurple").as_deref(), Some("663399"));
        assert_eq!(normalize_color("GREY").as_deref(), Some("808080"));
        assert_eq!(normalize_color("  teal  ").as_deref(), Some("008080"));
    }

    #[test]
    fn short_hex_expands() {
        assert_eq!(normalize_color("#abc").as_deref(), Some("aabbcc"));
        assert_eq!(normalize_color("#F0C").as_deref(), Some("ff00cc"));
    }

    #[test]
    fn long_hex_lowercases() {
        assert_eq!(normalize_color("#AABBCC").as_deref(), Some("aabbcc"));
        assert_eq!(normalize_color("#1a2b3c").as_deref(), Some("1a2b3c"));
    }

    #[test]
    fn rgb_and_rgba_convert() {
        assert_eq!(normalize_color("rgb(255, 0, 128)").as_deref(), Some("ff0080"));
        assert_eq!(
            normalize_color("rgba(0, 128, 255, 0.5)").as_deref(),
            Some("0080ff")
        );
        assert_eq!(normalize_color("RGB(1,2,3)").as_deref(), Some("010203"));
    }

    #[test]
    fn malformed_colors_are_dropped() {
        assert_eq!(normalize_color(""), None);
        assert_eq!(normalize_color("#ab"), None);
        assert_eq!(normalize_color("#ggg"), None);
        assert_eq!(normalize_color("#abcd"), None);
        assert_eq!(normalize_color("rgb(300, 0, 0)"), None);
        assert_eq!(normalize_color("rgb(1, 2)"), None);
        assert_eq!(normalize_color("rgba(1, 2, 3)"), None);
        assert_eq!(normalize_color("not-a-color"), None);
    }
}
