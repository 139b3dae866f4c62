//! Naming transforms shared by every emitter.
//!
//! All functions are pure and total: unknown shapes fall through to the
//! simplest rule instead of failing.

/// `ProductCategory` → `product_category`.
///
/// An underscore is inserted before each uppercase letter that follows a
/// lowercase letter or digit, then the whole string is lowercased. Runs of
/// capitals stay together (`CategoryID` → `category_id`), and input that is
/// already snake_case passes through unchanged.
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev: Option<char> = None;
    for ch in s.chars() {
        if ch.is_uppercase() {
            if let Some(p) = prev {
                if p.is_lowercase() || p.is_ascii_digit() {
                    out.push('_');
                }
            }
        }
        out.extend(ch.to_lowercase());
        prev = Some(ch);
    }
    out
}

/// `ProductCategory` → `productCategory`. Only the first character changes.
pub fn to_lower_camel(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `product_category_id` → `ProductCategoryID`.
///
/// Used to name fields derived from introspected columns. The `id` segment
/// renders as `ID` so the result round-trips through [`to_snake_case`].
pub fn to_upper_camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for segment in s.split(|c: char| c == '_' || c == '-' || c == ' ') {
        if segment.is_empty() {
            continue;
        }
        if segment.eq_ignore_ascii_case("id") {
            out.push_str("ID");
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// English plural heuristics: `Category` → `Categories`, `Box` → `Boxes`,
/// `Product` → `Products`.
pub fn to_plural(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();

    if let Some(stem) = word.strip_suffix('y').or_else(|| word.strip_suffix('Y')) {
        let before = stem.chars().last();
        if before.map_or(false, |c| c.is_alphabetic() && !is_vowel(c)) {
            return format!("{}ies", stem);
        }
    }

    if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| lower.ends_with(suffix)) {
        return format!("{}es", word);
    }

    format!("{}s", word)
}

fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
}

/// Default table name: `ProductCategory` → `product_categories`.
pub fn table_name_for(struct_name: &str) -> String {
    to_snake_case(&to_plural(struct_name))
}

/// Default API prefix: `ProductCategory` → `productCategory`.
///
/// The singular lower-camel form is used everywhere; nothing pluralizes it.
pub fn default_api_prefix(struct_name: &str) -> String {
    to_lower_camel(struct_name)
}

/// Stem shared by every generated file of an entity.
pub fn file_stem(struct_name: &str) -> String {
    to_lower_camel(struct_name)
}

/// Route segment for an API prefix, without surrounding slashes.
pub fn route_segment(api_prefix: &str) -> &str {
    api_prefix.trim_matches('/')
}

/// Whether `s` is usable as a type identifier in the generated sources.
pub fn is_type_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// Whether `s` is usable as a Go package name: lowercase ASCII letters,
/// digits and underscores, starting with a letter.
pub fn is_package_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {
            chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        }
        _ => false,
    }
}

/// Whether `s` is a single URL / path segment such as `admin` or `sys-tools`.
pub fn is_path_segment(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        _ => false,
    }
}

/// Collapse every run of whitespace and control characters into a single
/// space, so free text can sit on one line of generated source.
pub fn single_line(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s
        .split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|w| !w.is_empty())
    {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
