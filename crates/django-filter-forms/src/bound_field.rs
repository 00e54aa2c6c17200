//! Bound fields: a form field paired with its submitted input and errors.
//!
//! A [`BoundField`] is what a rendered form iterates over. It owns the
//! field's widget instance, so rendering needs nothing else.

use std::collections::HashMap;

use crate::fields::FormFieldDef;
use crate::widgets::{escape_html, RawValue, Widget};

/// A form field bound to data and validation state.
pub struct BoundField {
    /// The field's HTML name attribute (prefixed when the form has a prefix).
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Help text.
    pub help_text: String,
    /// Whether the field is disabled.
    pub disabled: bool,
    /// The raw input submitted for this field.
    pub data: RawValue,
    /// Validation error messages for this field.
    pub errors: Vec<String>,
    /// The widget instance used for rendering.
    pub widget: Box<dyn Widget>,
}

impl BoundField {
    /// Creates a new `BoundField` from a field definition and current state.
    pub fn new(
        field_def: &FormFieldDef,
        data: RawValue,
        errors: Vec<String>,
        prefix: Option<&str>,
    ) -> Self {
        Self {
            name: html_name(prefix, &field_def.name),
            label: field_def.label.clone(),
            help_text: field_def.help_text.clone(),
            disabled: field_def.disabled,
            data,
            errors,
            widget: field_def.make_widget(),
        }
    }

    /// Renders the widget HTML for this bound field.
    pub fn render(&self, extra_attrs: &HashMap<String, String>) -> String {
        let mut attrs = extra_attrs.clone();
        attrs.entry("id".to_string()).or_insert_with(|| self.auto_id());
        if self.disabled {
            attrs.insert("disabled".to_string(), "disabled".to_string());
        }
        self.widget.render(&self.name, &self.data, &attrs)
    }

    /// Renders a `<label>` element for this field.
    pub fn label_tag(&self) -> String {
        let label_id = self.widget.id_for_label(&self.auto_id());
        format!(
            r#"<label for="{label_id}">{}</label>"#,
            escape_html(&self.label)
        )
    }

    /// Returns the auto-generated HTML `id` for this field.
    pub fn auto_id(&self) -> String {
        format!("id_{}", self.name)
    }

    /// Returns `true` if this field has any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Renders the error list as an HTML `<ul>` element.
    pub fn errors_as_ul(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        let items: String = self
            .errors
            .iter()
            .map(|e| format!("<li>{}</li>", escape_html(e)))
            .collect();
        format!(r#"<ul class="errorlist">{items}</ul>"#)
    }
}

/// The name a field's input is submitted under.
pub fn html_name(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) => format!("{p}-{name}"),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FormFieldType;

    #[test]
    fn test_bound_field_render_and_label() {
        let field = FormFieldDef::new("title", FormFieldType::char()).label("Title");
        let bf = BoundField::new(&field, RawValue::from("Dune"), vec![], Some("books"));
        assert_eq!(bf.name, "books-title");
        assert_eq!(
            bf.render(&HashMap::new()),
            r#"<input type="text" name="books-title" value="Dune" id="id_books-title" />"#
        );
        assert_eq!(bf.label_tag(), r#"<label for="id_books-title">Title</label>"#);
    }

    #[test]
    fn test_composite_label_targets_first_part() {
        let field = FormFieldDef::new(
            "price",
            FormFieldType::Range {
                bound: Box::new(FormFieldType::decimal()),
            },
        );
        let bf = BoundField::new(&field, RawValue::None, vec![], None);
        assert_eq!(bf.label_tag(), r#"<label for="id_price_0">price</label>"#);
        assert!(bf.render(&HashMap::new()).contains(r#"name="price_1" value="" id="id_price_1""#));
    }

    #[test]
    fn test_errors_as_ul() {
        let field = FormFieldDef::new("year", FormFieldType::char());
        let bf = BoundField::new(
            &field,
            RawValue::None,
            vec!["Enter a whole number.".to_string()],
            None,
        );
        assert!(bf.has_errors());
        assert_eq!(
            bf.errors_as_ul(),
            r#"<ul class="errorlist"><li>Enter a whole number.</li></ul>"#
        );
    }

    #[test]
    fn test_disabled_attr() {
        let field = FormFieldDef::new("q", FormFieldType::char()).disabled(true);
        let bf = BoundField::new(&field, RawValue::None, vec![], None);
        assert!(bf.render(&HashMap::new()).contains(r#"disabled="disabled""#));
    }
}
