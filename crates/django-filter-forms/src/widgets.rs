//! Widget system for rendering filter form controls.
//!
//! A widget extracts a field's raw input from a [`QueryDict`] and renders the
//! matching HTML control. Composite fields (ranges, lookup choices) use a
//! [`MultiWidget`], which reads and renders one sub-widget per part under the
//! names `name_0`, `name_1`, ...

use std::collections::HashMap;
use std::fmt;

use django_filter_core::{QueryDict, SETTINGS};

/// Raw input for one form field, as a widget extracted it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RawValue {
    /// Nothing was submitted.
    #[default]
    None,
    /// A single submitted string.
    Single(String),
    /// Every value submitted under one name.
    Multiple(Vec<String>),
    /// One raw value per sub-widget of a [`MultiWidget`].
    Parts(Vec<RawValue>),
}

static EMPTY_RAW: RawValue = RawValue::None;

impl RawValue {
    /// Returns `true` if no usable input was submitted.
    ///
    /// Composite input is empty when every part is empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::Single(s) => s.is_empty(),
            Self::Multiple(values) => values.iter().all(String::is_empty),
            Self::Parts(parts) => parts.iter().all(Self::is_empty),
        }
    }

    /// Returns the scalar text of this input. For multiple values this is the
    /// last one submitted, as `QueryDict::get` would return.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Single(s) => Some(s),
            Self::Multiple(values) => values.last().map(String::as_str),
            Self::None | Self::Parts(_) => None,
        }
    }

    /// Returns every submitted string. A single value is split on commas.
    pub fn values(&self) -> Vec<String> {
        match self {
            Self::None | Self::Parts(_) => Vec::new(),
            Self::Single(s) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Self::Multiple(values) => values.iter().filter(|v| !v.is_empty()).cloned().collect(),
        }
    }

    /// Returns part `index` of composite input, or an empty value.
    pub fn part(&self, index: usize) -> &Self {
        match self {
            Self::Parts(parts) => parts.get(index).unwrap_or(&EMPTY_RAW),
            _ => &EMPTY_RAW,
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::Single(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::Single(s)
    }
}

/// Enumerates the built-in widget types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetType {
    /// `<input type="text">`.
    TextInput,
    /// `<input type="number">`.
    NumberInput,
    /// `<input type="hidden">`.
    HiddenInput,
    /// `<textarea>`.
    Textarea,
    /// `<input type="checkbox">`.
    CheckboxInput,
    /// `<select>`.
    Select,
    /// `<select>` offering unknown / yes / no.
    NullBooleanSelect,
    /// `<select multiple>`.
    SelectMultiple,
    /// A set of `<input type="checkbox">` elements.
    CheckboxSelectMultiple,
    /// A set of `<input type="radio">` elements.
    RadioSelect,
    /// `<input type="date">`.
    DateInput,
    /// `<input type="datetime-local">`.
    DateTimeInput,
    /// `<input type="time">`.
    TimeInput,
    /// One sub-widget per part of a composite field.
    Multi(Vec<WidgetType>),
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TextInput => "TextInput",
            Self::NumberInput => "NumberInput",
            Self::HiddenInput => "HiddenInput",
            Self::Textarea => "Textarea",
            Self::CheckboxInput => "CheckboxInput",
            Self::Select => "Select",
            Self::NullBooleanSelect => "NullBooleanSelect",
            Self::SelectMultiple => "SelectMultiple",
            Self::CheckboxSelectMultiple => "CheckboxSelectMultiple",
            Self::RadioSelect => "RadioSelect",
            Self::DateInput => "DateInput",
            Self::DateTimeInput => "DateTimeInput",
            Self::TimeInput => "TimeInput",
            Self::Multi(parts) => {
                let names: Vec<String> = parts.iter().map(ToString::to_string).collect();
                return write!(f, "MultiWidget({})", names.join(", "));
            }
        };
        write!(f, "{name}")
    }
}

/// The interface every widget implements.
pub trait Widget: Send + Sync + fmt::Debug {
    /// Returns the widget type enum variant.
    fn widget_type(&self) -> WidgetType;

    /// Renders the widget as an HTML string.
    fn render(&self, name: &str, value: &RawValue, attrs: &HashMap<String, String>) -> String;

    /// Extracts this widget's raw input from submitted data.
    fn value_from_data(&self, data: &QueryDict, name: &str) -> RawValue;

    /// Returns the HTML `id` a `<label>` should target.
    fn id_for_label(&self, id: &str) -> String {
        id.to_string()
    }
}

/// Escapes text for use inside HTML content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Formats an attributes map as ` key="value"`, sorted by key.
fn render_attrs(attrs: &HashMap<String, String>) -> String {
    let mut keys: Vec<&String> = attrs.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|k| format!(r#" {k}="{}""#, escape_html(&attrs[k])))
        .collect()
}

fn single(data: &QueryDict, name: &str) -> RawValue {
    data.get(name).map_or(RawValue::None, RawValue::from)
}

fn multiple(data: &QueryDict, name: &str) -> RawValue {
    let values = data.get_list(name);
    if values.is_empty() {
        RawValue::None
    } else {
        RawValue::Multiple(values.to_vec())
    }
}

fn render_options(choices: &[(String, String)], selected: &[String]) -> String {
    choices
        .iter()
        .map(|(val, label)| {
            let sel = if selected.contains(val) { " selected" } else { "" };
            format!(
                r#"<option value="{}"{sel}>{}</option>"#,
                escape_html(val),
                escape_html(label)
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Built-in widgets
// ---------------------------------------------------------------------------

/// A single `<input>` element of a fixed `type`.
#[derive(Debug, Clone)]
pub struct Input {
    kind: WidgetType,
    input_type: &'static str,
}

impl Input {
    /// `<input type="text">`.
    pub const fn text() -> Self {
        Self { kind: WidgetType::TextInput, input_type: "text" }
    }

    /// `<input type="number">`.
    pub const fn number() -> Self {
        Self { kind: WidgetType::NumberInput, input_type: "number" }
    }

    /// `<input type="hidden">`.
    pub const fn hidden() -> Self {
        Self { kind: WidgetType::HiddenInput, input_type: "hidden" }
    }

    /// `<input type="date">`.
    pub const fn date() -> Self {
        Self { kind: WidgetType::DateInput, input_type: "date" }
    }

    /// `<input type="datetime-local">`.
    pub const fn datetime() -> Self {
        Self { kind: WidgetType::DateTimeInput, input_type: "datetime-local" }
    }

    /// `<input type="time">`.
    pub const fn time() -> Self {
        Self { kind: WidgetType::TimeInput, input_type: "time" }
    }
}

impl Widget for Input {
    fn widget_type(&self) -> WidgetType {
        self.kind.clone()
    }

    fn render(&self, name: &str, value: &RawValue, attrs: &HashMap<String, String>) -> String {
        let val = escape_html(value.as_str().unwrap_or(""));
        format!(
            r#"<input type="{}" name="{name}" value="{val}"{} />"#,
            self.input_type,
            render_attrs(attrs)
        )
    }

    fn value_from_data(&self, data: &QueryDict, name: &str) -> RawValue {
        single(data, name)
    }
}

/// A `<textarea>` widget.
#[derive(Debug, Clone)]
pub struct Textarea;

impl Widget for Textarea {
    fn widget_type(&self) -> WidgetType {
        WidgetType::Textarea
    }

    fn render(&self, name: &str, value: &RawValue, attrs: &HashMap<String, String>) -> String {
        format!(
            r#"<textarea name="{name}"{}>{}</textarea>"#,
            render_attrs(attrs),
            escape_html(value.as_str().unwrap_or(""))
        )
    }

    fn value_from_data(&self, data: &QueryDict, name: &str) -> RawValue {
        single(data, name)
    }
}

/// An `<input type="checkbox">` widget. An unchecked box submits nothing.
#[derive(Debug, Clone)]
pub struct CheckboxInput;

impl Widget for CheckboxInput {
    fn widget_type(&self) -> WidgetType {
        WidgetType::CheckboxInput
    }

    fn render(&self, name: &str, value: &RawValue, attrs: &HashMap<String, String>) -> String {
        let checked = matches!(value.as_str(), Some("true" | "on" | "1"));
        let checked_attr = if checked { " checked" } else { "" };
        format!(
            r#"<input type="checkbox" name="{name}"{checked_attr}{} />"#,
            render_attrs(attrs)
        )
    }

    fn value_from_data(&self, data: &QueryDict, name: &str) -> RawValue {
        single(data, name)
    }
}

/// A `<select>` widget.
#[derive(Debug, Clone)]
pub struct Select {
    /// The available choices as `(value, display_label)` pairs.
    pub choices: Vec<(String, String)>,
}

impl Select {
    /// Creates a new `Select` widget with the given choices.
    pub fn new(choices: Vec<(String, String)>) -> Self {
        Self { choices }
    }
}

impl Widget for Select {
    fn widget_type(&self) -> WidgetType {
        WidgetType::Select
    }

    fn render(&self, name: &str, value: &RawValue, attrs: &HashMap<String, String>) -> String {
        let current: Vec<String> = value.as_str().map(String::from).into_iter().collect();
        format!(
            r#"<select name="{name}"{}>{}</select>"#,
            render_attrs(attrs),
            render_options(&self.choices, &current)
        )
    }

    fn value_from_data(&self, data: &QueryDict, name: &str) -> RawValue {
        single(data, name)
    }
}

/// A `<select>` offering unknown / yes / no, submitted as `1` / `2` / `3`.
///
/// [`value_from_data`](Widget::value_from_data) normalizes the submission to
/// `"true"`, `"false"` or nothing. Option labels come from
/// `Settings::null_boolean_labels`.
#[derive(Debug, Clone, Default)]
pub struct NullBooleanSelect;

impl Widget for NullBooleanSelect {
    fn widget_type(&self) -> WidgetType {
        WidgetType::NullBooleanSelect
    }

    fn render(&self, name: &str, value: &RawValue, attrs: &HashMap<String, String>) -> String {
        let current = match value.as_str() {
            Some("2" | "true" | "True") => "2",
            Some("3" | "false" | "False") => "3",
            _ => "1",
        };
        let [unknown, yes, no] = &SETTINGS.get().null_boolean_labels;
        let choices = vec![
            ("1".to_string(), unknown.clone()),
            ("2".to_string(), yes.clone()),
            ("3".to_string(), no.clone()),
        ];
        format!(
            r#"<select name="{name}"{}>{}</select>"#,
            render_attrs(attrs),
            render_options(&choices, &[current.to_string()])
        )
    }

    fn value_from_data(&self, data: &QueryDict, name: &str) -> RawValue {
        match data.get(name) {
            Some("2" | "true" | "True") => RawValue::from("true"),
            Some("3" | "false" | "False") => RawValue::from("false"),
            _ => RawValue::None,
        }
    }
}

/// A `<select multiple>` widget.
#[derive(Debug, Clone)]
pub struct SelectMultiple {
    /// The available choices as `(value, display_label)` pairs.
    pub choices: Vec<(String, String)>,
}

impl SelectMultiple {
    /// Creates a new `SelectMultiple` widget with the given choices.
    pub fn new(choices: Vec<(String, String)>) -> Self {
        Self { choices }
    }
}

impl Widget for SelectMultiple {
    fn widget_type(&self) -> WidgetType {
        WidgetType::SelectMultiple
    }

    fn render(&self, name: &str, value: &RawValue, attrs: &HashMap<String, String>) -> String {
        format!(
            r#"<select name="{name}" multiple{}>{}</select>"#,
            render_attrs(attrs),
            render_options(&self.choices, &value.values())
        )
    }

    fn value_from_data(&self, data: &QueryDict, name: &str) -> RawValue {
        multiple(data, name)
    }
}

/// A list of labelled `<input>` elements, one per choice.
fn render_choice_inputs(
    input_type: &str,
    name: &str,
    choices: &[(String, String)],
    selected: &[String],
    attrs: &HashMap<String, String>,
) -> String {
    let id_base = attrs.get("id").map_or(name, String::as_str);
    let mut html = String::from("<ul>");
    for (i, (val, label)) in choices.iter().enumerate() {
        let checked = if selected.contains(val) { " checked" } else { "" };
        let option_id = format!("{id_base}_{i}");
        html.push_str(&format!(
            r#"<li><label for="{option_id}"><input type="{input_type}" name="{name}" value="{}" id="{option_id}"{checked} /> {}</label></li>"#,
            escape_html(val),
            escape_html(label)
        ));
    }
    html.push_str("</ul>");
    html
}

/// A set of `<input type="radio">` elements.
#[derive(Debug, Clone)]
pub struct RadioSelect {
    /// The available choices as `(value, display_label)` pairs.
    pub choices: Vec<(String, String)>,
}

impl RadioSelect {
    /// Creates a new `RadioSelect` widget with the given choices.
    pub fn new(choices: Vec<(String, String)>) -> Self {
        Self { choices }
    }
}

impl Widget for RadioSelect {
    fn widget_type(&self) -> WidgetType {
        WidgetType::RadioSelect
    }

    fn render(&self, name: &str, value: &RawValue, attrs: &HashMap<String, String>) -> String {
        let current: Vec<String> = value.as_str().map(String::from).into_iter().collect();
        render_choice_inputs("radio", name, &self.choices, &current, attrs)
    }

    fn value_from_data(&self, data: &QueryDict, name: &str) -> RawValue {
        single(data, name)
    }

    fn id_for_label(&self, id: &str) -> String {
        format!("{id}_0")
    }
}

/// A set of `<input type="checkbox">` elements for multiple selection.
#[derive(Debug, Clone)]
pub struct CheckboxSelectMultiple {
    /// The available choices as `(value, display_label)` pairs.
    pub choices: Vec<(String, String)>,
}

impl CheckboxSelectMultiple {
    /// Creates a new `CheckboxSelectMultiple` widget with the given choices.
    pub fn new(choices: Vec<(String, String)>) -> Self {
        Self { choices }
    }
}

impl Widget for CheckboxSelectMultiple {
    fn widget_type(&self) -> WidgetType {
        WidgetType::CheckboxSelectMultiple
    }

    fn render(&self, name: &str, value: &RawValue, attrs: &HashMap<String, String>) -> String {
        render_choice_inputs("checkbox", name, &self.choices, &value.values(), attrs)
    }

    fn value_from_data(&self, data: &QueryDict, name: &str) -> RawValue {
        multiple(data, name)
    }

    fn id_for_label(&self, id: &str) -> String {
        format!("{id}_0")
    }
}

/// A composite widget: sub-widget `i` reads and renders `name_i`.
#[derive(Debug)]
pub struct MultiWidget {
    /// The sub-widgets, in part order.
    pub widgets: Vec<Box<dyn Widget>>,
}

impl MultiWidget {
    /// Creates a composite widget from its parts.
    pub fn new(widgets: Vec<Box<dyn Widget>>) -> Self {
        Self { widgets }
    }
}

impl Widget for MultiWidget {
    fn widget_type(&self) -> WidgetType {
        WidgetType::Multi(self.widgets.iter().map(|w| w.widget_type()).collect())
    }

    fn render(&self, name: &str, value: &RawValue, attrs: &HashMap<String, String>) -> String {
        self.widgets
            .iter()
            .enumerate()
            .map(|(i, widget)| {
                let mut sub_attrs = attrs.clone();
                if let Some(id) = attrs.get("id") {
                    sub_attrs.insert("id".to_string(), format!("{id}_{i}"));
                }
                widget.render(&format!("{name}_{i}"), value.part(i), &sub_attrs)
            })
            .collect()
    }

    fn value_from_data(&self, data: &QueryDict, name: &str) -> RawValue {
        RawValue::Parts(
            self.widgets
                .iter()
                .enumerate()
                .map(|(i, widget)| widget.value_from_data(data, &format!("{name}_{i}")))
                .collect(),
        )
    }

    fn id_for_label(&self, id: &str) -> String {
        format!("{id}_0")
    }
}

/// Creates a boxed widget from a `WidgetType`, populating choices if
/// applicable. Parts of a `Multi` widget share the same choices.
pub fn create_widget_with_choices(
    widget_type: &WidgetType,
    choices: &[(String, String)],
) -> Box<dyn Widget> {
    match widget_type {
        WidgetType::TextInput => Box::new(Input::text()),
        WidgetType::NumberInput => Box::new(Input::number()),
        WidgetType::HiddenInput => Box::new(Input::hidden()),
        WidgetType::DateInput => Box::new(Input::date()),
        WidgetType::DateTimeInput => Box::new(Input::datetime()),
        WidgetType::TimeInput => Box::new(Input::time()),
        WidgetType::Textarea => Box::new(Textarea),
        WidgetType::CheckboxInput => Box::new(CheckboxInput),
        WidgetType::NullBooleanSelect => Box::new(NullBooleanSelect),
        WidgetType::Select => Box::new(Select::new(choices.to_vec())),
        WidgetType::SelectMultiple => Box::new(SelectMultiple::new(choices.to_vec())),
        WidgetType::RadioSelect => Box::new(RadioSelect::new(choices.to_vec())),
        WidgetType::CheckboxSelectMultiple => {
            Box::new(CheckboxSelectMultiple::new(choices.to_vec()))
        }
        WidgetType::Multi(parts) => Box::new(MultiWidget::new(
            parts
                .iter()
                .map(|part| create_widget_with_choices(part, choices))
                .collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_attrs() -> HashMap<String, String> {
        HashMap::new()
    }

    fn choices() -> Vec<(String, String)> {
        vec![
            ("scifi".to_string(), "Science fiction".to_string()),
            ("romance".to_string(), "Romance".to_string()),
        ]
    }

    #[test]
    fn test_raw_value_emptiness() {
        assert!(RawValue::None.is_empty());
        assert!(RawValue::from("").is_empty());
        assert!(!RawValue::from("x").is_empty());
        assert!(RawValue::Multiple(vec![String::new()]).is_empty());
        assert!(RawValue::Parts(vec![RawValue::None, RawValue::from("")]).is_empty());
        assert!(!RawValue::Parts(vec![RawValue::None, RawValue::from("1")]).is_empty());
    }

    #[test]
    fn test_raw_value_values_and_parts() {
        assert_eq!(RawValue::from("a, b,,c").values(), ["a", "b", "c"]);
        assert_eq!(RawValue::Multiple(vec!["a".into(), "b".into()]).as_str(), Some("b"));
        let parts = RawValue::Parts(vec![RawValue::from("1")]);
        assert_eq!(parts.part(0), &RawValue::from("1"));
        assert_eq!(parts.part(5), &RawValue::None);
        assert_eq!(RawValue::from("x").part(0), &RawValue::None);
    }

    #[test]
    fn test_text_input_render_escapes() {
        let html = Input::text().render("q", &RawValue::from("<b>\"x\""), &empty_attrs());
        assert_eq!(
            html,
            r#"<input type="text" name="q" value="&lt;b&gt;&quot;x&quot;" />"#
        );
    }

    #[test]
    fn test_input_attrs_are_sorted() {
        let mut attrs = HashMap::new();
        attrs.insert("id".to_string(), "id_q".to_string());
        attrs.insert("class".to_string(), "wide".to_string());
        let html = Input::number().render("q", &RawValue::None, &attrs);
        assert_eq!(
            html,
            r#"<input type="number" name="q" value="" class="wide" id="id_q" />"#
        );
    }

    #[test]
    fn test_select_render_marks_selected() {
        let w = Select::new(choices());
        let html = w.render("genre", &RawValue::from("romance"), &empty_attrs());
        assert!(html.starts_with(r#"<select name="genre">"#));
        assert!(html.contains(r#"<option value="romance" selected>Romance</option>"#));
        assert!(html.contains(r#"<option value="scifi">Science fiction</option>"#));
    }

    #[test]
    fn test_select_multiple_reads_every_value() {
        let w = SelectMultiple::new(choices());
        let qd = QueryDict::parse("genre=scifi&genre=romance");
        let raw = w.value_from_data(&qd, "genre");
        assert_eq!(raw, RawValue::Multiple(vec!["scifi".into(), "romance".into()]));
        assert_eq!(w.value_from_data(&QueryDict::parse(""), "genre"), RawValue::None);

        let html = w.render("genre", &raw, &empty_attrs());
        assert!(html.contains(" multiple"));
        assert_eq!(html.matches(" selected").count(), 2);
    }

    #[test]
    fn test_null_boolean_select_normalizes() {
        let w = NullBooleanSelect;
        let read = |qs: &str| w.value_from_data(&QueryDict::parse(qs), "f");
        assert_eq!(read("f=2"), RawValue::from("true"));
        assert_eq!(read("f=true"), RawValue::from("true"));
        assert_eq!(read("f=3"), RawValue::from("false"));
        assert_eq!(read("f=1"), RawValue::None);
        assert_eq!(read("f=maybe"), RawValue::None);
        assert_eq!(read(""), RawValue::None);
    }

    #[test]
    fn test_null_boolean_select_render() {
        let html = NullBooleanSelect.render("f", &RawValue::from("false"), &empty_attrs());
        assert!(html.contains(r#"<option value="1">Unknown</option>"#));
        assert!(html.contains(r#"<option value="3" selected>No</option>"#));
    }

    #[test]
    fn test_checkbox_select_multiple_render() {
        let w = CheckboxSelectMultiple::new(choices());
        let html = w.render("genre", &RawValue::from("scifi"), &empty_attrs());
        assert!(html.contains(r#"id="genre_0" checked"#));
        assert!(!html.contains(r#"id="genre_1" checked"#));
        assert_eq!(w.id_for_label("id_genre"), "id_genre_0");
    }

    #[test]
    fn test_multi_widget_uses_suffixed_names() {
        let w = MultiWidget::new(vec![Box::new(Input::number()), Box::new(Input::number())]);
        let qd = QueryDict::parse("price_0=5&price_1=10");
        let raw = w.value_from_data(&qd, "price");
        assert_eq!(
            raw,
            RawValue::Parts(vec![RawValue::from("5"), RawValue::from("10")])
        );

        let mut attrs = HashMap::new();
        attrs.insert("id".to_string(), "id_price".to_string());
        let html = w.render("price", &raw, &attrs);
        assert!(html.contains(r#"name="price_0" value="5" id="id_price_0""#));
        assert!(html.contains(r#"name="price_1" value="10" id="id_price_1""#));
        assert_eq!(
            w.widget_type(),
            WidgetType::Multi(vec![WidgetType::NumberInput, WidgetType::NumberInput])
        );
    }

    #[test]
    fn test_create_widget_with_choices() {
        let w = create_widget_with_choices(&WidgetType::RadioSelect, &choices());
        assert_eq!(w.widget_type(), WidgetType::RadioSelect);
        let w = create_widget_with_choices(&WidgetType::DateInput, &[]);
        assert!(w.render("d", &RawValue::None, &empty_attrs()).contains(r#"type="date""#));
        let w = create_widget_with_choices(
            &WidgetType::Multi(vec![WidgetType::TextInput, WidgetType::Select]),
            &choices(),
        );
        assert_eq!(w.widget_type().to_string(), "MultiWidget(TextInput, Select)");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a&b<'c'>"), "a&amp;b&lt;&#x27;c&#x27;&gt;");
    }
}
