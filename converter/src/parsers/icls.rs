use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::ThemeFormat;
use crate::pipeline::ConversionError;

/// Deepest `baseAttributes` chain followed before giving up.
const MAX_INHERITANCE_DEPTH: usize = 8;

/// A text attribute from the `<attributes>` section of an ICLS scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IclsAttribute {
    pub name: String,
    pub foreground: Option<String>,
    pub background: Option<String>,
    /// 0 plain, 1 bold, 2 italic, 3 bold italic.
    pub font_type: Option<u8>,
    pub effect_type: Option<u8>,
    pub effect_color: Option<String>,
    pub base_attributes: Option<String>,
}

impl IclsAttribute {
    pub fn bold(&self) -> bool {
        self.font_type.is_some_and(|font| font & 1 != 0)
    }

    pub fn italic(&self) -> bool {
        self.font_type.is_some_and(|font| font & 2 != 0)
    }

    /// IntelliJ effect type 3 is a strikeout line.
    pub fn strikethrough(&self) -> bool {
        self.effect_type == Some(3)
    }

    fn has_own_style(&self) -> bool {
        self.foreground.is_some()
            || self.background.is_some()
            || self.font_type.is_some()
            || self.effect_type.is_some()
    }
}

/// Parsed IntelliJ color scheme (`.icls`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IclsScheme {
    pub name: Option<String>,
    pub parent_scheme: Option<String>,
    pub colors: IndexMap<String, String>,
    pub attributes: Vec<IclsAttribute>,
}

impl IclsScheme {
    pub fn attribute(&self, name: &str) -> Option<&IclsAttribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    /// Returns the attribute, following `baseAttributes` when it carries no
    /// styling of its own.
    pub fn resolved_attribute(&self, name: &str) -> Option<&IclsAttribute> {
        let mut current = self.attribute(name)?;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if current.has_own_style() {
                return Some(current);
            }
            let base = current.base_attributes.as_deref()?;
            current = self.attribute(base)?;
        }
        None
    }

    /// Darkness implied by the bundled scheme this one derives from.
    pub fn declared_dark(&self) -> Option<bool> {
        match self.parent_scheme.as_deref()? {
            "Darcula" => Some(true),
            "Default" | "IntelliJ Light" => Some(false),
            _ => None,
        }
    }
}

/// ICLS stores colors as bare hex digits; prefix them with `#`.
fn normalize_color(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with('#') {
        return Some(raw.to_string());
    }
    let is_hex = raw.chars().all(|c| c.is_ascii_hexdigit());
    if is_hex && matches!(raw.len(), 3 | 6 | 8) {
        Some(format!("#{raw}"))
    } else {
        Some(raw.to_string())
    }
}

fn malformed(reason: impl std::fmt::Display) -> ConversionError {
    ConversionError::malformed(ThemeFormat::JetBrainsIcls, reason)
}

fn attribute(element: &BytesStart<'_>, key: &str) -> Result<Option<String>, ConversionError> {
    let Some(attribute) = element.try_get_attribute(key).map_err(malformed)? else {
        return Ok(None);
    };
    let value = attribute.unescape_value().map_err(malformed)?;
    Ok(Some(value.into_owned()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Colors,
    Attributes,
}

fn apply_value_option(
    target: &mut IclsAttribute,
    element: &BytesStart<'_>,
) -> Result<(), ConversionError> {
    let (Some(name), Some(value)) = (attribute(element, "name")?, attribute(element, "value")?)
    else {
        return Ok(());
    };
    match name.as_str() {
        "FOREGROUND" => target.foreground = normalize_color(&value),
        "BACKGROUND" => target.background = normalize_color(&value),
        "EFFECT_COLOR" => target.effect_color = normalize_color(&value),
        "FONT_TYPE" => target.font_type = value.trim().parse().ok(),
        "EFFECT_TYPE" => target.effect_type = value.trim().parse().ok(),
        _ => {}
    }
    Ok(())
}

pub fn parse(text: &str) -> Result<IclsScheme, ConversionError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut scheme = IclsScheme::default();
    let mut root_seen = false;
    let mut section = Section::Other;
    let mut current: Option<IclsAttribute> = None;
    let mut in_value = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            malformed(format!("XML error at byte {}: {e}", reader.buffer_position()))
        })?;
        match event {
            Event::Start(ref element) | Event::Empty(ref element) => {
                let self_closing = matches!(event, Event::Empty(_));
                let tag = element.name();
                if !root_seen {
                    if tag.as_ref() != b"scheme" {
                        return Err(malformed(format!(
                            "root element is <{}>, expected <scheme>",
                            String::from_utf8_lossy(tag.as_ref())
                        )));
                    }
                    root_seen = true;
                    scheme.name = attribute(element, "name")?;
                    scheme.parent_scheme = attribute(element, "parent_scheme")?;
                    continue;
                }
                match (section, tag.as_ref()) {
                    (_, b"colors") if !self_closing => section = Section::Colors,
                    (_, b"attributes") if !self_closing => section = Section::Attributes,
                    (Section::Colors, b"option") => {
                        if let (Some(name), Some(value)) =
                            (attribute(element, "name")?, attribute(element, "value")?)
                        {
                            if let Some(color) = normalize_color(&value) {
                                scheme.colors.insert(name, color);
                            }
                        }
                    }
                    (Section::Attributes, b"value") if current.is_some() && !self_closing => {
                        in_value = true;
                    }
                    (Section::Attributes, b"option") if in_value => {
                        if let Some(target) = current.as_mut() {
                            apply_value_option(target, element)?;
                        }
                    }
                    (Section::Attributes, b"option") => {
                        let Some(name) = attribute(element, "name")? else {
                            continue;
                        };
                        let parsed = IclsAttribute {
                            name,
                            base_attributes: attribute(element, "baseAttributes")?,
                            ..Default::default()
                        };
                        if self_closing {
                            scheme.attributes.push(parsed);
                        } else {
                            current = Some(parsed);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref element) => match element.name().as_ref() {
                b"colors" | b"attributes" => section = Section::Other,
                b"value" => in_value = false,
                b"option" if section == Section::Attributes && !in_value => {
                    if let Some(parsed) = current.take() {
                        scheme.attributes.push(parsed);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_seen {
        return Err(malformed("document has no <scheme> root element"));
    }
    Ok(scheme)
}
