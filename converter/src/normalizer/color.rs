//! Hex color handling.
//!
//! Source formats write alpha last (`#RRGGBBAA`, CSS order) while AndroidIDE
//! parses `#AARRGGBB`. Everything that passes through [`canonical_hex`] comes
//! out as upper-case `#RRGGBB`, or `#AARRGGBB` when not fully opaque.

use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

fn nibble(c: char) -> Option<u8> {
    c.to_digit(16).map(|digit| digit as u8)
}

impl Rgba {
    /// Parses `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA`.
    pub fn parse(value: &str) -> Option<Rgba> {
        let digits = value.trim().strip_prefix('#')?;
        let nibbles: Vec<u8> = digits.chars().map(nibble).collect::<Option<_>>()?;
        let channels: Vec<u8> = match nibbles.len() {
            3 | 4 => nibbles.iter().map(|n| n * 17).collect(),
            6 | 8 => nibbles.chunks(2).map(|pair| pair[0] * 16 + pair[1]).collect(),
            _ => return None,
        };
        Some(Rgba {
            r: channels[0],
            g: channels[1],
            b: channels[2],
            a: channels.get(3).copied().unwrap_or(u8::MAX),
        })
    }

    pub fn to_hex(self) -> String {
        if self.a == u8::MAX {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.a, self.r, self.g, self.b)
        }
    }

    /// Multiplies every channel by `factor`, truncating and clamping to 0..=255.
    pub fn scale(self, factor: f32) -> Rgba {
        let channel = |value: u8| (f32::from(value) * factor).clamp(0.0, 255.0) as u8;
        Rgba {
            r: channel(self.r),
            g: channel(self.g),
            b: channel(self.b),
            a: self.a,
        }
    }

    pub fn with_alpha(self, alpha: f32) -> Rgba {
        Rgba {
            a: (255.0 * alpha).clamp(0.0, 255.0) as u8,
            ..self
        }
    }
}

pub fn is_valid_hex(value: &str) -> bool {
    Rgba::parse(value).is_some()
}

pub fn canonical_hex(value: &str) -> Option<String> {
    Rgba::parse(value).map(Rgba::to_hex)
}

/// Lowercases `source` and replaces everything but ASCII letters and digits with `_`.
pub fn sanitize_key(source: &str) -> String {
    let key: String = source
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if key.is_empty() { "color".to_string() } else { key }
}

/// Named colors collected while normalizing, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Definitions {
    entries: IndexMap<String, String>,
}

impl Definitions {
    /// Registers `hex` under a key derived from `source_key` and returns it.
    ///
    /// The same source key and value always yield the same key. A different
    /// value whose key is taken receives the first free `_2`, `_3`, ... suffix.
    pub fn register(&mut self, source_key: &str, hex: &str) -> String {
        let base = sanitize_key(source_key);
        let mut candidate = base.clone();
        let mut suffix = 2;
        loop {
            match self.entries.get(&candidate) {
                Some(existing) if existing == hex => return candidate,
                Some(_) => {
                    candidate = format!("{base}_{suffix}");
                    suffix += 1;
                }
                None => {
                    self.entries.insert(candidate.clone(), hex.to_string());
                    return candidate;
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_inner(self) -> IndexMap<String, String> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::*;

    #[test]
    fn test_short_forms_expand() {
        assert_eq!(canonical_hex("#abc").as_deref(), Some("#AABBCC"));
        assert_eq!(canonical_hex("#abc8").as_deref(), Some("#88AABBCC"));
    }

    #[test]
    fn test_alpha_moves_to_front() {
        assert_eq!(canonical_hex("#11223344").as_deref(), Some("#44112233"));
        assert_eq!(canonical_hex("#112233ff").as_deref(), Some("#112233"));
    }

    #[test]
    fn test_rejects_malformed_colors() {
        assert_none!(canonical_hex("112233"));
        assert_none!(canonical_hex("#12345"));
        assert_none!(canonical_hex("#ggg"));
        assert_none!(canonical_hex("red"));
        assert!(!is_valid_hex(""));
    }

    #[test]
    fn test_scale_truncates_and_clamps() {
        let color = assert_some!(Rgba::parse("#222222"));
        assert_eq!(color.scale(1.1).to_hex(), "#252525");
        assert_eq!(color.scale(0.9).to_hex(), "#1E1E1E");
        let bright = assert_some!(Rgba::parse("#F0F0F0"));
        assert_eq!(bright.scale(1.5).to_hex(), "#FFFFFF");
    }

    #[test]
    fn test_with_alpha_uses_android_order() {
        let color = assert_some!(Rgba::parse("#DDDDDD"));
        assert_eq!(color.with_alpha(0.3).to_hex(), "#4CDDDDDD");
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("editor.background"), "editor_background");
        assert_eq!(sanitize_key("*.selectionBackground"), "__selectionbackground");
        assert_eq!(sanitize_key(""), "color");
    }

    #[test]
    fn test_register_is_deterministic() {
        let mut definitions = Definitions::default();
        let first = definitions.register("editor.background", "#112233");
        let again = definitions.register("editor.background", "#112233");
        assert_eq!(first, "editor_background");
        assert_eq!(first, again);
    }

    #[test]
    fn test_register_suffixes_conflicting_values() {
        let mut definitions = Definitions::default();
        definitions.register("editor.background", "#112233");
        let second = definitions.register("editor_background", "#445566");
        let third = definitions.register("editor-background", "#778899");
        assert_eq!(second, "editor_background_2");
        assert_eq!(third, "editor_background_3");
        assert_eq!(definitions.get("editor_background_2"), Some("#445566"));
    }
}
