//! # Class lists
//!
//! Merging utility-class strings and translating inline style properties
//! into Tailwind classes.
//!
//! ## Translation
//!
//! Known properties map to their utility prefix with an arbitrary value
//! (`width: 100px` -> `w-[100px]`), keyword properties map to the keyword
//! class (`display: flex` -> `flex`), and anything else falls back to an
//! arbitrary property (`[mix-blend-mode:multiply]`). Applying a style
//! removes every existing class of the same utility group first, so the
//! class list never carries two values for one property.

use std::collections::HashSet;

const ARBITRARY_PREFIXES: &[(&str, &str)] = &[
    ("width", "w"),
    ("height", "h"),
    ("min-width", "min-w"),
    ("min-height", "min-h"),
    ("max-width", "max-w"),
    ("max-height", "max-h"),
    ("margin", "m"),
    ("margin-top", "mt"),
    ("margin-right", "mr"),
    ("margin-bottom", "mb"),
    ("margin-left", "ml"),
    ("padding", "p"),
    ("padding-top", "pt"),
    ("padding-right", "pr"),
    ("padding-bottom", "pb"),
    ("padding-left", "pl"),
    ("gap", "gap"),
    ("top", "top"),
    ("right", "right"),
    ("bottom", "bottom"),
    ("left", "left"),
    ("opacity", "opacity"),
    ("z-index", "z"),
    ("border-radius", "rounded"),
    ("background-color", "bg"),
    ("font-weight", "font"),
    ("line-height", "leading"),
    ("letter-spacing", "tracking"),
];

const FONT_SIZES: &[&str] = &[
    "xs", "sm", "base", "lg", "xl", "2xl", "3xl", "4xl", "5xl", "6xl", "7xl", "8xl", "9xl",
];
const TEXT_ALIGNS: &[&str] = &["left", "center", "right", "justify", "start", "end"];

const DISPLAY_CLASSES: &[&str] = &[
    "block", "inline-block", "inline", "flex", "inline-flex", "grid", "inline-grid", "table",
    "contents", "hidden",
];
const POSITION_CLASSES: &[&str] = &["static", "fixed", "absolute", "relative", "sticky"];
const FLEX_DIRECTION_CLASSES: &[&str] = &["flex-row", "flex-row-reverse", "flex-col", "flex-col-reverse"];

/// Whitespace-separated class tokens
pub fn tokenize(classes: &str) -> Vec<&str> {
    classes.split_whitespace().collect()
}

/// Union of both lists: existing order kept, new classes appended once
pub fn merge_classes(existing: &str, added: &str) -> String {
    let mut seen = HashSet::new();
    tokenize(existing)
        .into_iter()
        .chain(tokenize(added))
        .filter(|class| seen.insert(*class))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tailwind class for one style property, `None` for an unset value
pub fn style_to_class(property: &str, value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let class = match property {
        "display" => match value {
            "none" => "hidden".to_string(),
            other if DISPLAY_CLASSES.contains(&other) => other.to_string(),
            other => arbitrary_property(property, other),
        },
        "position" if POSITION_CLASSES.contains(&value) => value.to_string(),
        "flex-direction" => match value {
            "row" => "flex-row".to_string(),
            "row-reverse" => "flex-row-reverse".to_string(),
            "column" => "flex-col".to_string(),
            "column-reverse" => "flex-col-reverse".to_string(),
            other => arbitrary_property(property, other),
        },
        "color" => format!("text-[{}]", arbitrary_value(value)),
        "font-size" => format!("text-[{}]", arbitrary_value(value)),
        _ => match prefix_for(property) {
            Some(prefix) => format!("{}-[{}]", prefix, arbitrary_value(value)),
            None => arbitrary_property(property, value),
        },
    };
    Some(class)
}

/// Replaces same-group classes with the translated style classes
pub fn apply_styles<'a, I>(existing: &str, styles: I) -> String
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let mut classes: Vec<String> = tokenize(existing).into_iter().map(String::from).collect();
    for (property, value) in styles {
        classes.retain(|class| !in_group(class, property));
        if let Some(class) = value.and_then(|value| style_to_class(property, value)) {
            classes.push(class);
        }
    }
    merge_classes(&classes.join(" "), "")
}

fn prefix_for(property: &str) -> Option<&'static str> {
    ARBITRARY_PREFIXES
        .iter()
        .find(|(name, _)| *name == property)
        .map(|(_, prefix)| *prefix)
}

fn arbitrary_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join("_")
}

fn arbitrary_property(property: &str, value: &str) -> String {
    format!("[{}:{}]", property, arbitrary_value(value))
}

fn is_color_value(value: &str) -> bool {
    value.starts_with('#')
        || value.starts_with("rgb")
        || value.starts_with("hsl")
        || value.starts_with("color:")
        || value.chars().all(|c| c.is_ascii_alphabetic())
}

/// Whether `class` sets `property`. Variant classes (`hover:...`) never match.
fn in_group(class: &str, property: &str) -> bool {
    if let Some(rest) = class.strip_prefix('[') {
        return rest
            .strip_prefix(property)
            .is_some_and(|rest| rest.starts_with(':'));
    }
    if class.contains(':') && !class.contains("[") {
        return false;
    }
    match property {
        "display" => DISPLAY_CLASSES.contains(&class),
        "position" => POSITION_CLASSES.contains(&class),
        "flex-direction" => FLEX_DIRECTION_CLASSES.contains(&class),
        "color" | "font-size" => {
            let Some(value) = class.strip_prefix("text-") else {
                return false;
            };
            if TEXT_ALIGNS.contains(&value) {
                return false;
            }
            let is_size = match value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
                Some(arbitrary) => !is_color_value(arbitrary),
                None => FONT_SIZES.contains(&value),
            };
            is_size == (property == "font-size")
        }
        _ => match prefix_for(property) {
            Some(prefix) => class
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('-')),
            None => false,
        },
    }
}
