//! Form trait and `BaseForm` implementation.
//!
//! The [`Form`] trait supports async validation, data binding from a
//! [`QueryDict`], and rendering. [`BaseForm`] is the general-purpose
//! implementation built from a list of field definitions; a filter set
//! builds one with a field per filter.

use std::collections::HashMap;

use async_trait::async_trait;
use django_filter_core::QueryDict;
use django_filter_db::Value;

use crate::bound_field::{html_name, BoundField};
use crate::fields::FormFieldDef;
use crate::validation;
use crate::widgets::{escape_html, RawValue};

/// The core form trait. All form types implement this.
///
/// `is_valid()` and `clean()` are async because cross-field validation may
/// need the database.
#[async_trait]
pub trait Form: Send + Sync {
    /// Returns the form's field definitions.
    fn fields(&self) -> &[FormFieldDef];

    /// Returns the form prefix (for namespacing multiple forms on one page).
    fn prefix(&self) -> Option<&str>;

    /// Binds submitted data to this form.
    fn bind(&mut self, data: &QueryDict);

    /// Returns `true` if this form has been bound to data.
    fn is_bound(&self) -> bool;

    /// Validates the form. Returns `true` if valid.
    ///
    /// After calling this, `errors()` and `cleaned_data()` are populated.
    async fn is_valid(&mut self) -> bool;

    /// Returns per-field validation errors.
    fn errors(&self) -> &HashMap<String, Vec<String>>;

    /// Returns the cleaned (validated and coerced) data of every field that
    /// validated.
    fn cleaned_data(&self) -> &HashMap<String, Value>;

    /// Cross-field validation hook. The default implementation does nothing.
    async fn clean(&self) -> Result<(), HashMap<String, Vec<String>>> {
        Ok(())
    }
}

/// A general-purpose form implementation.
pub struct BaseForm {
    field_defs: Vec<FormFieldDef>,
    prefix: Option<String>,
    bound: bool,
    raw_data: HashMap<String, RawValue>,
    errors: HashMap<String, Vec<String>>,
    cleaned_data: HashMap<String, Value>,
}

impl BaseForm {
    /// Creates a new `BaseForm` with the given field definitions.
    pub fn new(fields: Vec<FormFieldDef>) -> Self {
        Self {
            field_defs: fields,
            prefix: None,
            bound: false,
            raw_data: HashMap::new(),
            errors: HashMap::new(),
            cleaned_data: HashMap::new(),
        }
    }

    /// Sets the form prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Looks up a field definition by name.
    pub fn field(&self, name: &str) -> Option<&FormFieldDef> {
        self.field_defs.iter().find(|f| f.name == name)
    }

    /// Returns the raw input bound to a field.
    pub fn raw_value(&self, name: &str) -> &RawValue {
        self.raw_data.get(name).unwrap_or(&RawValue::None)
    }

    /// Returns bound fields for rendering.
    pub fn bound_fields(&self) -> Vec<BoundField> {
        self.field_defs
            .iter()
            .map(|field| {
                let data = self.raw_value(&field.name).clone();
                let errors = self.errors.get(&field.name).cloned().unwrap_or_default();
                BoundField::new(field, data, errors, self.prefix.as_deref())
            })
            .collect()
    }

    /// Records an error against `field` and drops its cleaned value.
    pub fn add_error(&mut self, field: &str, message: impl Into<String>) {
        self.cleaned_data.remove(field);
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Returns the non-field (form-level) errors.
    pub fn non_field_errors(&self) -> &[String] {
        self.errors.get("__all__").map_or(&[], Vec::as_slice)
    }

    /// Renders the form as a sequence of `<p>` elements.
    pub fn as_p(&self) -> String {
        let mut html = String::new();
        for error in self.non_field_errors() {
            html.push_str(&format!(
                r#"<ul class="errorlist nonfield"><li>{}</li></ul>"#,
                escape_html(error)
            ));
        }
        for bf in self.bound_fields() {
            html.push_str(&bf.errors_as_ul());
            html.push_str("<p>");
            html.push_str(&bf.label_tag());
            html.push(' ');
            html.push_str(&bf.render(&HashMap::new()));
            if !bf.help_text.is_empty() {
                html.push_str(&format!(
                    r#" <span class="helptext">{}</span>"#,
                    escape_html(&bf.help_text)
                ));
            }
            html.push_str("</p>");
        }
        html
    }

    /// Summarizes the form as JSON for templates or API responses.
    pub fn as_context(&self) -> serde_json::Value {
        let fields: Vec<serde_json::Value> = self
            .bound_fields()
            .iter()
            .map(|bf| {
                serde_json::json!({
                    "name": bf.name,
                    "label": bf.label,
                    "help_text": bf.help_text,
                    "html": bf.render(&HashMap::new()),
                    "errors": bf.errors,
                })
            })
            .collect();
        serde_json::json!({
            "fields": fields,
            "errors": self.errors,
            "non_field_errors": self.non_field_errors(),
            "is_bound": self.bound,
        })
    }
}

#[async_trait]
impl Form for BaseForm {
    fn fields(&self) -> &[FormFieldDef] {
        &self.field_defs
    }

    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn bind(&mut self, data: &QueryDict) {
        self.bound = true;
        self.raw_data.clear();
        self.errors.clear();
        self.cleaned_data.clear();

        for field in &self.field_defs {
            let name = html_name(self.prefix.as_deref(), &field.name);
            let value = field.make_widget().value_from_data(data, &name);
            self.raw_data.insert(field.name.clone(), value);
        }
    }

    fn is_bound(&self) -> bool {
        self.bound
    }

    async fn is_valid(&mut self) -> bool {
        if !self.bound {
            return false;
        }

        self.errors.clear();
        self.cleaned_data.clear();

        validation::clean_fields(
            &self.field_defs,
            &self.raw_data,
            &mut self.cleaned_data,
            &mut self.errors,
        );

        if let Err(form_errors) = self.clean().await {
            for (key, msgs) in form_errors {
                self.errors.entry(key).or_default().extend(msgs);
            }
        }

        self.errors.is_empty()
    }

    fn errors(&self) -> &HashMap<String, Vec<String>> {
        &self.errors
    }

    fn cleaned_data(&self) -> &HashMap<String, Value> {
        &self.cleaned_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FormFieldType;
    use django_filter_db::LookupType;

    fn make_form() -> BaseForm {
        BaseForm::new(vec![
            FormFieldDef::new("title", FormFieldType::char())
                .required(false)
                .label("Title")
                .help_text("Part of the title"),
            FormFieldDef::new(
                "price",
                FormFieldType::LookupChoice {
                    inner: Box::new(FormFieldType::decimal()),
                    lookups: vec![LookupType::Gt, LookupType::Lt],
                },
            )
            .required(false),
            FormFieldDef::new("in_print", FormFieldType::NullBoolean).required(false),
        ])
    }

    #[tokio::test]
    async fn test_form_unbound() {
        let mut form = make_form();
        assert!(!form.is_bound());
        assert!(!form.is_valid().await);
    }

    #[tokio::test]
    async fn test_bind_reads_through_widgets() {
        let mut form = make_form();
        form.bind(&QueryDict::parse("title=Dune&price_0=10&price_1=lt&in_print=3"));
        assert!(form.is_valid().await);
        let data = form.cleaned_data();
        assert_eq!(data["title"], Value::from("Dune"));
        assert_eq!(
            data["price"],
            Value::List(vec![Value::Float(10.0), Value::from("lt")])
        );
        assert_eq!(data["in_print"], Value::Bool(false));
    }

    #[tokio::test]
    async fn test_invalid_input_keeps_other_fields() {
        let mut form = make_form();
        form.bind(&QueryDict::parse("title=Dune&price_0=ten&price_1=lt"));
        assert!(!form.is_valid().await);
        assert_eq!(form.errors()["price"], ["Enter a number."]);
        assert_eq!(form.cleaned_data()["title"], Value::from("Dune"));
        assert!(!form.cleaned_data().contains_key("price"));
    }

    #[tokio::test]
    async fn test_add_error_after_cleaning() {
        let mut form = make_form();
        form.bind(&QueryDict::parse("title=Dune"));
        assert!(form.is_valid().await);
        form.add_error("title", "Unknown title.");
        assert_eq!(form.errors()["title"], ["Unknown title."]);
        assert!(!form.cleaned_data().contains_key("title"));
        assert!(form.as_p().contains("Unknown title."));
    }

    #[tokio::test]
    async fn test_prefix_namespaces_input() {
        let mut form = make_form().with_prefix("books");
        form.bind(&QueryDict::parse("title=Emma&books-title=Dune"));
        assert!(form.is_valid().await);
        assert_eq!(form.cleaned_data()["title"], Value::from("Dune"));
        assert_eq!(form.prefix(), Some("books"));
    }

    #[tokio::test]
    async fn test_rebinding_clears_state() {
        let mut form = make_form();
        form.bind(&QueryDict::parse("price_0=x&price_1=gt"));
        assert!(!form.is_valid().await);
        form.bind(&QueryDict::parse(""));
        assert!(form.errors().is_empty());
        assert!(form.is_valid().await);
        assert_eq!(form.raw_value("title"), &RawValue::None);
    }

    #[tokio::test]
    async fn test_clean_hook_adds_errors() {
        struct NeedsTitle(BaseForm);

        #[async_trait]
        impl Form for NeedsTitle {
            fn fields(&self) -> &[FormFieldDef] {
                self.0.fields()
            }
            fn prefix(&self) -> Option<&str> {
                self.0.prefix()
            }
            fn bind(&mut self, data: &QueryDict) {
                self.0.bind(data);
            }
            fn is_bound(&self) -> bool {
                self.0.is_bound()
            }
            async fn is_valid(&mut self) -> bool {
                let mut valid = self.0.is_valid().await;
                if let Err(errors) = self.clean().await {
                    for (k, v) in errors {
                        self.0.errors.entry(k).or_default().extend(v);
                    }
                    valid = false;
                }
                valid
            }
            fn errors(&self) -> &HashMap<String, Vec<String>> {
                self.0.errors()
            }
            fn cleaned_data(&self) -> &HashMap<String, Value> {
                self.0.cleaned_data()
            }
            async fn clean(&self) -> Result<(), HashMap<String, Vec<String>>> {
                if self.0.cleaned_data().get("title").map_or(true, Value::is_empty) {
                    let mut errors = HashMap::new();
                    errors.insert("__all__".to_string(), vec!["Give a title.".to_string()]);
                    return Err(errors);
                }
                Ok(())
            }
        }

        let mut form = NeedsTitle(make_form());
        form.bind(&QueryDict::parse(""));
        assert!(!form.is_valid().await);
        assert_eq!(form.0.non_field_errors(), ["Give a title."]);
        assert!(form.0.as_p().contains(r#"<ul class="errorlist nonfield"><li>Give a title.</li></ul>"#));
    }

    #[test]
    fn test_as_p_and_context() {
        let form = make_form();
        let html = form.as_p();
        assert!(html.starts_with(r#"<p><label for="id_title">Title</label> <input type="text""#));
        assert!(html.contains(r#"<span class="helptext">Part of the title</span>"#));
        assert!(html.contains(r#"<select name="price_1" id="id_price_1">"#));

        let ctx = form.as_context();
        assert_eq!(ctx["is_bound"], serde_json::Value::Bool(false));
        assert_eq!(ctx["fields"].as_array().map(Vec::len), Some(3));
        assert_eq!(ctx["fields"][2]["name"], "in_print");
    }
}
