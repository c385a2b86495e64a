//! Validation gate for the content document.
//!
//! Explicit per-entity validators over the decoded JSON value, each
//! producing field-level violations the admin UI can render next to its
//! inputs. A document is only handed to the rest of the system (or to
//! storage) after this gate passes, regardless of which backend it came
//! from.
//!
//! Violation paths are dotted with numeric indices, e.g. `services.2.title`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{BlockLayout, ContentDocument};

/// A single field-level schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Validate an arbitrary decoded JSON value against the content schema and,
/// when clean, deserialize it into the typed document.
pub fn parse_document(value: Value) -> Result<ContentDocument, Vec<Violation>> {
    let violations = validate_document(&value);
    if !violations.is_empty() {
        return Err(violations);
    }
    // The validator guarantees the shape, so a decode failure here is a
    // validator bug, not a user error; still reported as a violation so
    // the caller has one failure path.
    serde_json::from_value(value)
        .map_err(|e| vec![Violation::new("", format!("document failed to decode: {e}"))])
}

/// Run every entity validator against the document root.
pub fn validate_document(value: &Value) -> Vec<Violation> {
    let mut out = Vec::new();

    let Some(root) = value.as_object() else {
        out.push(Violation::new("", "document must be a JSON object"));
        return out;
    };

    match root.get("navBar") {
        Some(nav) => validate_nav_bar(nav, "navBar", &mut out),
        None => out.push(Violation::new("navBar", "is required")),
    }

    match root.get("home") {
        Some(home) => validate_home(home, "home", &mut out),
        None => out.push(Violation::new("home", "is required")),
    }

    validate_collection(root, "services", validate_service, &mut out);
    validate_collection(root, "locations", validate_location, &mut out);
    validate_collection(root, "testimonials", validate_testimonial, &mut out);

    check_unique_keys(root, "services", "slug", &mut out);
    check_unique_keys(root, "locations", "slug", &mut out);
    check_unique_keys(root, "testimonials", "id", &mut out);

    if let Some(flags) = root.get("dynamicPages") {
        validate_dynamic_pages(flags, "dynamicPages", &mut out);
    }

    out
}

fn validate_nav_bar(value: &Value, path: &str, out: &mut Vec<Violation>) {
    let Some(obj) = as_object(value, path, out) else {
        return;
    };
    require_str(obj, path, "logoSrc", out);
    require_str(obj, path, "logoHref", out);
    require_str(obj, path, "ctaLabel", out);

    if let Some(links) = obj.get("links") {
        let links_path = join(path, "links");
        let Some(items) = as_array(links, &links_path, out) else {
            return;
        };
        for (idx, link) in items.iter().enumerate() {
            let link_path = format!("{links_path}.{idx}");
            if let Some(link_obj) = as_object(link, &link_path, out) {
                require_str(link_obj, &link_path, "label", out);
                require_str(link_obj, &link_path, "href", out);
            }
        }
    }
}

fn validate_home(value: &Value, path: &str, out: &mut Vec<Violation>) {
    let Some(obj) = as_object(value, path, out) else {
        return;
    };

    match obj.get("hero") {
        Some(hero) => validate_hero(hero, &join(path, "hero"), out),
        None => out.push(Violation::new(join(path, "hero"), "is required")),
    }

    for key in [
        "servicesIntro",
        "locationsIntro",
        "testimonialsIntro",
        "formIntro",
    ] {
        match obj.get(key) {
            Some(intro) => validate_intro(intro, &join(path, key), out),
            None => out.push(Violation::new(join(path, key), "is required")),
        }
    }
}

fn validate_hero(value: &Value, path: &str, out: &mut Vec<Violation>) {
    let Some(obj) = as_object(value, path, out) else {
        return;
    };
    require_str(obj, path, "headline", out);
    require_str(obj, path, "body", out);
    require_str(obj, path, "ctaLabel", out);
    require_str(obj, path, "imageSrc", out);
}

fn validate_intro(value: &Value, path: &str, out: &mut Vec<Violation>) {
    let Some(obj) = as_object(value, path, out) else {
        return;
    };
    require_str(obj, path, "heading", out);
    optional_str(obj, path, "eyebrow", out);
    optional_str(obj, path, "body", out);
}

fn validate_service(value: &Value, path: &str, out: &mut Vec<Violation>) {
    let Some(obj) = as_object(value, path, out) else {
        return;
    };
    require_str(obj, path, "slug", out);
    require_bool(obj, path, "display", out);
    require_str(obj, path, "iconSrc", out);
    require_str(obj, path, "title", out);
    require_str(obj, path, "excerpt", out);
    require_str(obj, path, "heroImageSrc", out);
    validate_blocks(obj, path, out);
}

fn validate_location(value: &Value, path: &str, out: &mut Vec<Violation>) {
    let Some(obj) = as_object(value, path, out) else {
        return;
    };
    require_str(obj, path, "slug", out);
    require_str(obj, path, "name", out);
    require_str(obj, path, "iconKey", out);
    optional_str(obj, path, "description", out);
    optional_str(obj, path, "heroImageSrc", out);
    validate_blocks(obj, path, out);
}

fn validate_block(value: &Value, path: &str, out: &mut Vec<Violation>) {
    let Some(obj) = as_object(value, path, out) else {
        return;
    };
    require_str(obj, path, "heading", out);
    optional_str(obj, path, "eyebrow", out);
    optional_str(obj, path, "body", out);
    optional_str(obj, path, "iconSrc", out);
    optional_str(obj, path, "imageSrc", out);

    let layout_path = join(path, "layout");
    match obj.get("layout") {
        Some(Value::String(s)) if BlockLayout::from_str(s).is_some() => {}
        Some(Value::String(s)) => out.push(Violation::new(
            layout_path,
            format!("must be one of left, right, center (got \"{s}\")"),
        )),
        Some(_) => out.push(Violation::new(layout_path, "must be a string")),
        None => out.push(Violation::new(layout_path, "is required")),
    }
}

fn validate_testimonial(value: &Value, path: &str, out: &mut Vec<Violation>) {
    let Some(obj) = as_object(value, path, out) else {
        return;
    };
    require_str(obj, path, "id", out);
    require_str(obj, path, "locationSlug", out);
    require_str(obj, path, "quote", out);
    require_str(obj, path, "clientName", out);
    optional_str(obj, path, "locationLabel", out);
}

fn validate_dynamic_pages(value: &Value, path: &str, out: &mut Vec<Violation>) {
    let Some(obj) = as_object(value, path, out) else {
        return;
    };
    require_bool(obj, path, "services", out);
    require_bool(obj, path, "locations", out);
}

/// Validate an optional top-level collection; absence default-fills to empty.
fn validate_collection(
    root: &Map<String, Value>,
    key: &str,
    validate_item: fn(&Value, &str, &mut Vec<Violation>),
    out: &mut Vec<Violation>,
) {
    let Some(value) = root.get(key) else {
        return;
    };
    let Some(items) = as_array(value, key, out) else {
        return;
    };
    for (idx, item) in items.iter().enumerate() {
        validate_item(item, &format!("{key}.{idx}"), out);
    }
}

/// Report duplicate unique keys, anchored at the later occurrence.
fn check_unique_keys(root: &Map<String, Value>, collection: &str, key: &str, out: &mut Vec<Violation>) {
    let Some(items) = root.get(collection).and_then(Value::as_array) else {
        return;
    };
    let mut seen = std::collections::HashSet::new();
    for (idx, item) in items.iter().enumerate() {
        let Some(value) = item.get(key).and_then(Value::as_str) else {
            continue;
        };
        if !seen.insert(value) {
            out.push(Violation::new(
                format!("{collection}.{idx}.{key}"),
                format!("duplicate {key} \"{value}\""),
            ));
        }
    }
}

fn validate_blocks(obj: &Map<String, Value>, path: &str, out: &mut Vec<Violation>) {
    let Some(blocks) = obj.get("blocks") else {
        return;
    };
    let blocks_path = join(path, "blocks");
    let Some(items) = as_array(blocks, &blocks_path, out) else {
        return;
    };
    for (idx, block) in items.iter().enumerate() {
        validate_block(block, &format!("{blocks_path}.{idx}"), out);
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn as_object<'a>(
    value: &'a Value,
    path: &str,
    out: &mut Vec<Violation>,
) -> Option<&'a Map<String, Value>> {
    match value.as_object() {
        Some(obj) => Some(obj),
        None => {
            out.push(Violation::new(path, "must be an object"));
            None
        }
    }
}

fn as_array<'a>(value: &'a Value, path: &str, out: &mut Vec<Violation>) -> Option<&'a Vec<Value>> {
    match value.as_array() {
        Some(items) => Some(items),
        None => {
            out.push(Violation::new(path, "must be an array"));
            None
        }
    }
}

fn require_str(obj: &Map<String, Value>, prefix: &str, key: &str, out: &mut Vec<Violation>) {
    let path = join(prefix, key);
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => {}
        Some(Value::String(_)) => out.push(Violation::new(path, "must not be empty")),
        Some(_) => out.push(Violation::new(path, "must be a string")),
        None => out.push(Violation::new(path, "is required")),
    }
}

/// Optional fields may be absent or null; when present they must be strings.
/// Empty strings are allowed (the admin UI stores cleared inputs as "").
fn optional_str(obj: &Map<String, Value>, prefix: &str, key: &str, out: &mut Vec<Violation>) {
    match obj.get(key) {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => out.push(Violation::new(join(prefix, key), "must be a string")),
    }
}

fn require_bool(obj: &Map<String, Value>, prefix: &str, key: &str, out: &mut Vec<Violation>) {
    let path = join(prefix, key);
    match obj.get(key) {
        Some(Value::Bool(_)) => {}
        Some(_) => out.push(Violation::new(path, "must be a boolean")),
        None => out.push(Violation::new(path, "is required")),
    }
}
