//! Markdown-section binder.
//!
//! Model output written as `# Heading` sections is split into named
//! sections, and each section is assigned to the model property with the
//! same name (case-insensitive). Properties are declared explicitly through
//! [`CodexModel::properties`].

use crate::proteus::{to_bool, to_enum, EnumDescriptor, TolerantEnum};
use quill_core::AppResult;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// Section name used for text before the first heading.
pub const INTRO_SECTION: &str = "Intro";

/// Named sections of a markdown-like document, in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Sections {
    entries: Vec<(String, String)>,
}

impl Sections {
    /// Split `text` on markdown headings.
    pub fn parse(text: &str) -> Self {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let mut sections = Self::default();
        let mut key = INTRO_SECTION.to_string();
        let mut buffer: Vec<&str> = Vec::new();

        for line in normalized.split('\n').map(str::trim) {
            match heading_text(line) {
                Some(heading) => {
                    sections.flush(&key, &buffer);
                    key = heading.to_string();
                    buffer.clear();
                }
                None => buffer.push(line),
            }
        }
        sections.flush(&key, &buffer);

        tracing::debug!(count = sections.len(), "Parsed codex sections");
        sections
    }

    fn flush(&mut self, key: &str, lines: &[&str]) {
        let body = lines.join("\n").trim_matches('\n').to_string();
        // A heading with no content is not a section.
        if body.is_empty() {
            tracing::trace!(section = key, "Skipping empty section");
            return;
        }
        self.insert(key, body);
    }

    /// Insert a section, replacing one with the same name.
    pub fn insert(&mut self, name: &str, body: String) {
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = body,
            None => self.entries.push((name.to_string(), body)),
        }
    }

    /// Section body by case-insensitive name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, body)| body.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, body)| (name.as_str(), body.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn heading_text(line: &str) -> Option<&str> {
    if !line.starts_with('#') {
        return None;
    }
    let text = line
        .trim_start_matches('#')
        .trim()
        .trim_end_matches('#')
        .trim();
    (!text.is_empty()).then_some(text)
}

/// Value type of a bindable property.
#[derive(Debug, Clone, Copy)]
pub enum PropertyKind {
    Text,
    Bool,
    Enum(&'static EnumDescriptor),
}

type Assign<M> = Box<dyn Fn(&mut M, &str) -> AppResult<Binding> + Send + Sync>;

/// How a section landed on its property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Bound,
    /// Enum property fell back to its no-match member
    NoMatch,
}

/// One writable property of a [`CodexModel`].
pub struct Property<M> {
    name: &'static str,
    kind: PropertyKind,
    assign: Assign<M>,
}

impl<M: 'static> Property<M> {
    /// String property, assigned verbatim.
    pub fn text(name: &'static str, setter: fn(&mut M, String)) -> Self {
        Self {
            name,
            kind: PropertyKind::Text,
            assign: Box::new(move |model, section| {
                setter(model, section.to_string());
                Ok(Binding::Bound)
            }),
        }
    }

    /// Boolean property, converted with [`to_bool`].
    pub fn boolean(name: &'static str, setter: fn(&mut M, bool)) -> Self {
        Self {
            name,
            kind: PropertyKind::Bool,
            assign: Box::new(move |model, section| {
                setter(model, to_bool(section)?);
                Ok(Binding::Bound)
            }),
        }
    }

    /// Enum property, converted with [`to_enum`].
    pub fn enumeration<E: TolerantEnum>(name: &'static str, setter: fn(&mut M, E)) -> Self {
        Self {
            name,
            kind: PropertyKind::Enum(E::descriptor()),
            assign: Box::new(move |model, section| {
                let value = to_enum::<E>(section)?;
                setter(model, value);
                Ok(if value.is_no_match() {
                    Binding::NoMatch
                } else {
                    Binding::Bound
                })
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }
}

impl<M> fmt::Debug for Property<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// A type whose fields can be filled from markdown sections.
pub trait CodexModel: Default + 'static {
    fn properties() -> Vec<Property<Self>>;
}

/// Result of binding sections onto a model.
#[derive(Debug, Clone)]
pub struct CodexBinding<M> {
    pub model: M,
    /// Properties with no matching section, left at their defaults
    pub unbound_properties: Vec<String>,
    /// Enum properties that landed on their no-match member
    pub no_match_properties: Vec<String>,
}

impl<M> CodexBinding<M> {
    /// Every property bound, and no enum fell back to no-match.
    pub fn is_complete(&self) -> bool {
        self.unbound_properties.is_empty() && self.no_match_properties.is_empty()
    }
}

/// Binds markdown sections onto a [`CodexModel`].
///
/// ```
/// use quill_extract::codex::{CodexModel, HermeticCodex, Property};
///
/// #[derive(Default)]
/// struct Review {
///     summary: String,
///     approved: bool,
/// }
///
/// impl CodexModel for Review {
///     fn properties() -> Vec<Property<Self>> {
///         vec![
///             Property::text("Summary", |m: &mut Review, v| m.summary = v),
///             Property::boolean("Approved", |m: &mut Review, v| m.approved = v),
///         ]
///     }
/// }
///
/// let bound = HermeticCodex::<Review>::bind("# Summary\nLooks fine.\n# Approved\nyes").unwrap();
/// assert!(bound.is_complete());
/// assert!(bound.model.approved);
/// ```
pub struct HermeticCodex<M> {
    _model: PhantomData<M>,
}

impl<M: CodexModel> HermeticCodex<M> {
    /// Parse `text` into sections and bind them onto a default `M`.
    pub fn bind(text: &str) -> AppResult<CodexBinding<M>> {
        Self::bind_sections(&Sections::parse(text))
    }

    pub fn bind_sections(sections: &Sections) -> AppResult<CodexBinding<M>> {
        let mut model = M::default();
        let mut unbound_properties = Vec::new();
        let mut no_match_properties = Vec::new();

        for property in M::properties() {
            match sections.get(property.name) {
                Some(body) => {
                    if (property.assign)(&mut model, body)? == Binding::NoMatch {
                        no_match_properties.push(property.name.to_string());
                    }
                }
                None => unbound_properties.push(property.name.to_string()),
            }
        }

        if !unbound_properties.is_empty() {
            tracing::debug!("Unbound codex properties: {:?}", unbound_properties);
        }

        Ok(CodexBinding {
            model,
            unbound_properties,
            no_match_properties,
        })
    }

    /// Heading skeleton asking a model for output this codex can bind.
    pub fn format_instructions() -> String {
        M::properties()
            .iter()
            .map(|property| {
                let hint = match property.kind {
                    PropertyKind::Text => "<text>".to_string(),
                    PropertyKind::Bool => "<yes or no>".to_string(),
                    PropertyKind::Enum(descriptor) => {
                        format!("<one of: {}>", descriptor.answer_names().join(", "))
                    }
                };
                format!("## {}\n{}", property.name, hint)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::tolerant_enum! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        enum YesNo {
            Yes ["true", "y"],
            No ["false", "n"],
            #[default]
            NoMatch,
        }
    }

    #[derive(Debug, Default)]
    struct ExampleModel {
        yes_no: YesNo,
        some_bool: bool,
        description: String,
    }

    impl CodexModel for ExampleModel {
        fn properties() -> Vec<Property<Self>> {
            vec![
                Property::enumeration("YesNo", |m: &mut ExampleModel, v: YesNo| m.yes_no = v),
                Property::boolean("SomeBool", |m: &mut ExampleModel, v| m.some_bool = v),
                Property::text("Description", |m: &mut ExampleModel, v| m.description = v),
            ]
        }
    }

    const FULL: &str = "This is the introduction.\r\n\r\n## YesNo\r\nyes\r\n\r\n## SomeBool\r\nTrue\r\n\r\n## Description\r\nThis is a test description.\r\n";

    #[test]
    fn test_sections_parse() {
        let sections = Sections::parse(FULL);
        let names: Vec<_> = sections.names().collect();
        assert_eq!(names, vec!["Intro", "YesNo", "SomeBool", "Description"]);
        assert_eq!(sections.get("intro"), Some("This is the introduction."));
        assert_eq!(sections.get("SOMEBOOL"), Some("True"));
    }

    #[test]
    fn test_bind_complete_model() {
        let bound = HermeticCodex::<ExampleModel>::bind(FULL).unwrap();

        assert_eq!(bound.model.yes_no, YesNo::Yes);
        assert!(bound.model.some_bool);
        assert_eq!(bound.model.description, "This is a test description.");
        assert_eq!(bound.model.description.len(), 27);
        assert!(bound.is_complete());
    }

    #[test]
    fn test_missing_enum_section_is_incomplete() {
        let text = "Intro text\n## SomeBool\nno\n## Description\nShort.";
        let bound = HermeticCodex::<ExampleModel>::bind(text).unwrap();

        assert_eq!(bound.model.yes_no, YesNo::NoMatch);
        assert!(!bound.model.some_bool);
        assert_eq!(bound.unbound_properties, vec!["YesNo".to_string()]);
        assert!(!bound.is_complete());
    }

    #[test]
    fn test_unmatched_enum_value_is_incomplete() {
        let text = "# YesNo\nperhaps\n# SomeBool\ny\n# Description\nx";
        let bound = HermeticCodex::<ExampleModel>::bind(text).unwrap();

        assert!(bound.unbound_properties.is_empty());
        assert_eq!(bound.no_match_properties, vec!["YesNo".to_string()]);
        assert!(!bound.is_complete());
    }

    #[test]
    fn test_invalid_bool_section_errors() {
        let text = "# YesNo\nyes\n# SomeBool\nprobably\n# Description\nx";
        assert!(HermeticCodex::<ExampleModel>::bind(text).is_err());
    }

    #[test]
    fn test_multiline_section_and_heading_edge_cases() {
        let text = "### Description ###\n  first line  \n\n second line\n#\n";
        let sections = Sections::parse(text);
        assert_eq!(sections.get("description"), Some("first line\n\nsecond line\n#"));
        assert!(sections.get("Intro").is_none());
    }

    #[test]
    fn test_empty_trailing_section_is_unbound() {
        let bound = HermeticCodex::<ExampleModel>::bind("## YesNo\nyes\n## SomeBool\n").unwrap();

        assert_eq!(bound.model.yes_no, YesNo::Yes);
        assert!(!bound.model.some_bool);
        assert_eq!(
            bound.unbound_properties,
            vec!["SomeBool".to_string(), "Description".to_string()]
        );
        assert!(!bound.is_complete());
    }

    #[test]
    fn test_empty_middle_sections_are_unbound() {
        let text = "## YesNo\n\n   \n## SomeBool\n## Description\nStill here.";
        let sections = Sections::parse(text);
        let names: Vec<_> = sections.names().collect();
        assert_eq!(names, vec!["Description"]);

        let bound = HermeticCodex::<ExampleModel>::bind_sections(&sections).unwrap();
        assert_eq!(bound.model.yes_no, YesNo::NoMatch);
        assert_eq!(bound.model.description, "Still here.");
        assert_eq!(
            bound.unbound_properties,
            vec!["YesNo".to_string(), "SomeBool".to_string()]
        );
        assert!(bound.no_match_properties.is_empty());
    }

    #[test]
    fn test_format_instructions() {
        let instructions = HermeticCodex::<ExampleModel>::format_instructions();
        assert!(instructions.starts_with("## YesNo\n<one of: Yes, No>"));
        assert!(instructions.contains("## SomeBool\n<yes or no>"));
        assert!(instructions.ends_with("## Description\n<text>"));
    }
}
