// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declarative default property values.
//!
//! A [`DefaultTable`] says, for each widget kind and [`Property`], where the
//! initial value comes from: a literal, or a key in a [`StyleSheet`] with a
//! literal fallback. Resolving a kind against a sheet is done once and yields
//! [`ResolvedDefaults`], which [`LayoutTree::apply_defaults`] turns into
//! ordinary setter calls.
//!
//! ```text
//! # theme.style
//! Widget.Margin = 2
//! Stack.Width   = Fit
//! ```

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

use kurbo::Size;

use crate::measure::{Alignment, Axis, Measure};
use crate::node::NodeId;
use crate::tree::LayoutTree;

/// Kind whose entries apply to every widget.
pub const BASE_KIND: &str = "Widget";

/// A node property with a declarative default.
///
/// Variants are declared in application order: bounds before sizes, so
/// that a `Fixed` default is checked against the final bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Property {
    /// [`NodeFlags::visible`](crate::node::NodeFlags::visible).
    Visible,
    /// [`NodeFlags::enabled`](crate::node::NodeFlags::enabled).
    Enabled,
    /// [`NodeFlags::cache_enabled`](crate::node::NodeFlags::cache_enabled).
    CacheEnabled,
    /// [`NodeFlags::clip_to_client`](crate::node::NodeFlags::clip_to_client).
    ClipToClient,
    /// Margin.
    Margin,
    /// Minimum size.
    MinimumSize,
    /// Maximum size.
    MaximumSize,
    /// Width policy.
    Width,
    /// Height policy.
    Height,
    /// Horizontal alignment.
    HorizontalAlignment,
    /// Vertical alignment.
    VerticalAlignment,
    /// Explicit left offset.
    Left,
    /// Explicit top offset.
    Top,
}

impl Property {
    /// The kind of value the property takes.
    #[must_use]
    pub const fn value_kind(self) -> ValueKind {
        match self {
            Self::Visible | Self::Enabled | Self::CacheEnabled | Self::ClipToClient => {
                ValueKind::Flag
            }
            Self::Margin | Self::Left | Self::Top => ValueKind::Length,
            Self::MinimumSize | Self::MaximumSize => ValueKind::Size,
            Self::Width | Self::Height => ValueKind::Measure,
            Self::HorizontalAlignment | Self::VerticalAlignment => ValueKind::Alignment,
        }
    }

    /// Parses a style value for this property.
    pub fn parse_value(self, text: &str) -> Option<PropertyValue> {
        let text = text.trim();
        match self.value_kind() {
            ValueKind::Flag => match text {
                "true" => Some(PropertyValue::Flag(true)),
                "false" => Some(PropertyValue::Flag(false)),
                _ => None,
            },
            ValueKind::Length => parse_length(text).map(PropertyValue::Length),
            ValueKind::Size => {
                let (w, h) = text.split_once([',', ' '])?;
                Some(PropertyValue::Size(Size::new(
                    parse_length(w)?,
                    parse_length(h)?,
                )))
            }
            ValueKind::Measure => Measure::from_str(text).ok().map(PropertyValue::Measure),
            ValueKind::Alignment => {
                let a = match text {
                    "Start" | "Left" | "Top" => Alignment::Start,
                    "Center" => Alignment::Center,
                    "End" | "Right" | "Bottom" => Alignment::End,
                    _ => return None,
                };
                Some(PropertyValue::Alignment(a))
            }
        }
    }
}

fn parse_length(text: &str) -> Option<f64> {
    let v: f64 = text.trim().parse().ok()?;
    (v.is_finite() && v >= 0.0).then_some(v)
}

/// The type of a [`PropertyValue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`PropertyValue::Measure`].
    Measure,
    /// [`PropertyValue::Alignment`].
    Alignment,
    /// [`PropertyValue::Length`].
    Length,
    /// [`PropertyValue::Size`].
    Size,
    /// [`PropertyValue::Flag`].
    Flag,
}

impl ValueKind {
    /// Lowercase name, for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Measure => "measure",
            Self::Alignment => "alignment",
            Self::Length => "length",
            Self::Size => "size",
            Self::Flag => "flag",
        }
    }
}

/// A property value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PropertyValue {
    /// A size policy.
    Measure(Measure),
    /// An alignment.
    Alignment(Alignment),
    /// A length in pixels.
    Length(f64),
    /// A size in pixels.
    Size(Size),
    /// A boolean.
    Flag(bool),
}

impl PropertyValue {
    /// The type of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Measure(_) => ValueKind::Measure,
            Self::Alignment(_) => ValueKind::Alignment,
            Self::Length(_) => ValueKind::Length,
            Self::Size(_) => ValueKind::Size,
            Self::Flag(_) => ValueKind::Flag,
        }
    }
}

/// Where a default value comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum DefaultSource {
    /// A fixed value.
    Literal(PropertyValue),
    /// A style key, with the value used when the sheet lacks it.
    Style {
        /// Key looked up in the [`StyleSheet`].
        key: String,
        /// Value used when the key is absent.
        fallback: PropertyValue,
    },
}

impl DefaultSource {
    /// A style-key source.
    #[must_use]
    pub fn style(key: impl Into<String>, fallback: PropertyValue) -> Self {
        Self::Style {
            key: key.into(),
            fallback,
        }
    }

    fn fallback(&self) -> PropertyValue {
        match self {
            Self::Literal(v) | Self::Style { fallback: v, .. } => *v,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A default that cannot be resolved.
#[derive(Clone, Debug, PartialEq)]
pub enum DefaultsError {
    /// A style value does not parse as the property's type.
    InvalidStyleValue {
        /// The style key.
        key: String,
        /// The offending text.
        value: String,
        /// Expected value type.
        expected: ValueKind,
    },
    /// A table entry has a value of the wrong type.
    TypeMismatch {
        /// The property.
        property: Property,
        /// The type found in the table.
        found: ValueKind,
    },
}

impl fmt::Display for DefaultsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStyleValue {
                key,
                value,
                expected,
            } => write!(
                f,
                "style key `{key}` has value `{value}`, expected a {}",
                expected.name()
            ),
            Self::TypeMismatch { property, found } => write!(
                f,
                "default for {property:?} is a {}, expected a {}",
                found.name(),
                property.value_kind().name()
            ),
        }
    }
}

impl core::error::Error for DefaultsError {}

/// Why a style sheet line could not be parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleParseErrorKind {
    /// The line has no `=`.
    MissingEquals,
    /// The key is empty.
    EmptyKey,
}

/// A malformed style sheet line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StyleParseError {
    /// One-based line number.
    pub line: usize,
    /// What is wrong with it.
    pub kind: StyleParseErrorKind,
}

impl fmt::Display for StyleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            StyleParseErrorKind::MissingEquals => "expected `key = value`",
            StyleParseErrorKind::EmptyKey => "empty key",
        };
        write!(f, "line {}: {what}", self.line)
    }
}

impl core::error::Error for StyleParseError {}

// ---------------------------------------------------------------------------
// StyleSheet
// ---------------------------------------------------------------------------

/// String values keyed by style key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleSheet {
    values: BTreeMap<String, String>,
}

impl StyleSheet {
    /// An empty sheet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Looks up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the sheet has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromStr for StyleSheet {
    type Err = StyleParseError;

    /// Parses `key = value` lines. Blank lines and text after `#` are
    /// ignored; later keys replace earlier ones.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut sheet = Self::new();
        for (n, raw) in s.lines().enumerate() {
            let line = raw.split_once('#').map_or(raw, |(before, _)| before).trim();
            if line.is_empty() {
                continue;
            }
            let error = |kind| StyleParseError { line: n + 1, kind };
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| error(StyleParseErrorKind::MissingEquals))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(error(StyleParseErrorKind::EmptyKey));
            }
            sheet.set(key, value.trim());
        }
        Ok(sheet)
    }
}

// ---------------------------------------------------------------------------
// DefaultTable
// ---------------------------------------------------------------------------

/// Defaults by widget kind and property.
#[derive(Clone, Debug, Default)]
pub struct DefaultTable {
    entries: BTreeMap<(String, Property), DefaultSource>,
}

impl DefaultTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The engine's defaults for the built-in widgets.
    #[must_use]
    pub fn builtin() -> Self {
        use PropertyValue as V;

        let mut t = Self::new();
        let base = [
            (Property::Visible, V::Flag(true)),
            (Property::Enabled, V::Flag(true)),
            (Property::CacheEnabled, V::Flag(false)),
            (Property::ClipToClient, V::Flag(true)),
            (Property::MinimumSize, V::Size(Size::new(1.0, 1.0))),
            (Property::MaximumSize, V::Size(Size::ZERO)),
            (Property::Width, V::Measure(Measure::Inherit)),
            (Property::Height, V::Measure(Measure::Inherit)),
            (Property::HorizontalAlignment, V::Alignment(Alignment::Center)),
            (Property::VerticalAlignment, V::Alignment(Alignment::Center)),
            (Property::Left, V::Length(0.0)),
            (Property::Top, V::Length(0.0)),
        ];
        for (property, value) in base {
            t.insert(BASE_KIND, property, DefaultSource::Literal(value));
        }
        t.insert(
            BASE_KIND,
            Property::Margin,
            DefaultSource::style("Widget.Margin", V::Length(0.0)),
        );
        t.insert(
            "Group",
            Property::CacheEnabled,
            DefaultSource::style("Group.CacheEnabled", V::Flag(false)),
        );
        t.insert(
            "Stack",
            Property::Width,
            DefaultSource::style("Stack.Width", V::Measure(Measure::Inherit)),
        );
        t.insert(
            "Stack",
            Property::Height,
            DefaultSource::style("Stack.Height", V::Measure(Measure::Inherit)),
        );
        t.insert(
            "Panel",
            Property::Margin,
            DefaultSource::style("Panel.Margin", V::Length(0.0)),
        );
        t
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, kind: impl Into<String>, property: Property, source: DefaultSource) {
        self.entries.insert((kind.into(), property), source);
    }

    /// The entry for `kind` and `property`, without falling back to the base
    /// kind.
    #[must_use]
    pub fn get(&self, kind: &str, property: Property) -> Option<&DefaultSource> {
        self.entries.get(&(kind.to_owned(), property))
    }

    /// Resolves every default for `kind` against `sheet`.
    ///
    /// Entries for `kind` override those of [`BASE_KIND`].
    pub fn resolve(&self, kind: &str, sheet: &StyleSheet) -> Result<ResolvedDefaults, DefaultsError> {
        let mut sources: BTreeMap<Property, &DefaultSource> = BTreeMap::new();
        for layer in [BASE_KIND, kind] {
            for ((k, property), source) in &self.entries {
                if k == layer {
                    sources.insert(*property, source);
                }
            }
        }

        let mut values = Vec::with_capacity(sources.len());
        for (property, source) in sources {
            let fallback = source.fallback();
            if fallback.kind() != property.value_kind() {
                return Err(DefaultsError::TypeMismatch {
                    property,
                    found: fallback.kind(),
                });
            }
            let value = match source {
                DefaultSource::Literal(v) => *v,
                DefaultSource::Style { key, fallback } => match sheet.get(key) {
                    None => *fallback,
                    Some(text) => property.parse_value(text).ok_or_else(|| {
                        DefaultsError::InvalidStyleValue {
                            key: key.clone(),
                            value: text.to_owned(),
                            expected: property.value_kind(),
                        }
                    })?,
                },
            };
            values.push((property, value));
        }
        Ok(ResolvedDefaults { values })
    }
}

/// Defaults of one widget kind, ready to apply.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedDefaults {
    values: Vec<(Property, PropertyValue)>,
}

impl ResolvedDefaults {
    /// Values in application order.
    pub fn iter(&self) -> impl Iterator<Item = (Property, PropertyValue)> + '_ {
        self.values.iter().copied()
    }

    /// The value for `property`, if any.
    #[must_use]
    pub fn get(&self, property: Property) -> Option<PropertyValue> {
        self.values
            .iter()
            .find(|(p, _)| *p == property)
            .map(|(_, v)| *v)
    }
}

impl LayoutTree {
    /// Applies resolved defaults to `id` through the ordinary setters.
    pub fn apply_defaults(&mut self, id: NodeId, defaults: &ResolvedDefaults) {
        for (property, value) in defaults.iter() {
            match (property, value) {
                (Property::Visible, PropertyValue::Flag(v)) => self.set_visible(id, v),
                (Property::Enabled, PropertyValue::Flag(v)) => self.set_enabled(id, v),
                (Property::CacheEnabled, PropertyValue::Flag(v)) => self.set_cache_enabled(id, v),
                (Property::ClipToClient, PropertyValue::Flag(v)) => {
                    self.set_clip_to_client(id, v);
                }
                (Property::Margin, PropertyValue::Length(v)) => self.set_margin(id, v),
                (Property::MinimumSize, PropertyValue::Size(v)) => self.set_minimum_size(id, v),
                (Property::MaximumSize, PropertyValue::Size(v)) => self.set_maximum_size(id, v),
                (Property::Width, PropertyValue::Measure(m)) => self.set_width(id, m),
                (Property::Height, PropertyValue::Measure(m)) => self.set_height(id, m),
                (Property::HorizontalAlignment, PropertyValue::Alignment(a)) => {
                    self.set_alignment(id, Axis::Horizontal, a);
                }
                (Property::VerticalAlignment, PropertyValue::Alignment(a)) => {
                    self.set_alignment(id, Axis::Vertical, a);
                }
                (Property::Left, PropertyValue::Length(v)) => {
                    self.set_offset(id, Axis::Horizontal, v);
                }
                (Property::Top, PropertyValue::Length(v)) => self.set_offset(id, Axis::Vertical, v),
                (property, value) => {
                    log::debug!("skipping {property:?} default of type {:?}", value.kind());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Color;
    use crate::widget::{Panel, Stack};

    #[test]
    fn parse_sheet() {
        let sheet: StyleSheet = "# theme\nWidget.Margin = 4\n\nStack.Width=Fit # trailing\n"
            .parse()
            .unwrap();
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.get("Widget.Margin"), Some("4"));
        assert_eq!(sheet.get("Stack.Width"), Some("Fit"));
    }

    #[test]
    fn parse_errors_carry_line() {
        let err = "a = 1\nnonsense\n".parse::<StyleSheet>().unwrap_err();
        assert_eq!(
            err,
            StyleParseError {
                line: 2,
                kind: StyleParseErrorKind::MissingEquals
            }
        );
        let err = " = 1".parse::<StyleSheet>().unwrap_err();
        assert_eq!(err.kind, StyleParseErrorKind::EmptyKey);
    }

    #[test]
    fn kind_entries_override_base() {
        let table = DefaultTable::builtin();
        let mut sheet = StyleSheet::new();
        sheet.set("Stack.Width", "Fit");
        sheet.set("Widget.Margin", "3");

        let stack = table.resolve("Stack", &sheet).unwrap();
        assert_eq!(stack.get(Property::Width), Some(PropertyValue::Measure(Measure::Fit)));
        assert_eq!(stack.get(Property::Margin), Some(PropertyValue::Length(3.0)));

        let panel = table.resolve("Panel", &sheet).unwrap();
        // Panel.Margin is not in the sheet: its own fallback wins over the
        // base entry.
        assert_eq!(panel.get(Property::Margin), Some(PropertyValue::Length(0.0)));
        assert_eq!(panel.get(Property::Width), Some(PropertyValue::Measure(Measure::Inherit)));
    }

    #[test]
    fn wrong_style_type_is_an_error() {
        let mut sheet = StyleSheet::new();
        sheet.set("Widget.Margin", "wide");
        // Panel overrides the margin with a key the sheet lacks.
        assert!(DefaultTable::builtin().resolve("Panel", &sheet).is_ok());
        let err = DefaultTable::builtin().resolve("Group", &sheet).unwrap_err();
        assert_eq!(
            err,
            DefaultsError::InvalidStyleValue {
                key: "Widget.Margin".into(),
                value: "wide".into(),
                expected: ValueKind::Length,
            }
        );
    }

    #[test]
    fn literal_type_is_checked() {
        let mut table = DefaultTable::new();
        table.insert(
            BASE_KIND,
            Property::Width,
            DefaultSource::Literal(PropertyValue::Flag(true)),
        );
        assert!(matches!(
            table.resolve("Panel", &StyleSheet::new()),
            Err(DefaultsError::TypeMismatch {
                property: Property::Width,
                found: ValueKind::Flag
            })
        ));
    }

    #[test]
    fn value_parsing() {
        assert_eq!(
            Property::MinimumSize.parse_value("10, 20"),
            Some(PropertyValue::Size(Size::new(10.0, 20.0)))
        );
        assert_eq!(
            Property::HorizontalAlignment.parse_value("Right"),
            Some(PropertyValue::Alignment(Alignment::End))
        );
        assert_eq!(Property::Margin.parse_value("-1"), None);
        assert_eq!(Property::Visible.parse_value("yes"), None);
    }

    #[test]
    fn apply_uses_setters() {
        let mut tree = LayoutTree::new(Size::new(100.0, 100.0));
        let root = tree.root();
        let stack = tree.create_node(Stack::vertical());
        let panel = tree.create_node(Panel::new(Color::WHITE));
        tree.add_child(root, stack).unwrap();
        tree.add_child(stack, panel).unwrap();

        let mut sheet = StyleSheet::new();
        sheet.set("Stack.Width", "Fit");
        sheet.set("Widget.Margin", "2");
        let table = DefaultTable::builtin();
        let resolved = table.resolve(tree.nodes().widget(stack).kind(), &sheet).unwrap();
        tree.apply_defaults(stack, &resolved);
        assert_eq!(tree.nodes().measure(stack, Axis::Horizontal), Measure::Fit);
        assert_eq!(tree.nodes().margin(stack), 2.0);
        assert!(tree.nodes().pending(stack).has(crate::aspect::LayoutAspect::Width));
    }
}
