//! Validation pipeline for form processing.
//!
//! 1. Field-level validation (type coercion + per-field constraints)
//! 2. Form-level cross-field validation (async, can hit the database)
//!
//! Errors accumulate rather than short-circuiting, so all validation
//! issues are reported at once.

use std::collections::HashMap;

use django_filter_db::Value;

use crate::fields::{clean_field_value, FormFieldDef};
use crate::form::Form;
use crate::widgets::RawValue;

/// Performs field-level validation for all fields.
///
/// Each field's raw input is cleaned with [`clean_field_value`]; the result
/// lands in `cleaned_data` on success or in `errors` on failure. Disabled
/// fields skip validation and take their initial value.
pub fn clean_fields(
    field_defs: &[FormFieldDef],
    raw_data: &HashMap<String, RawValue>,
    cleaned_data: &mut HashMap<String, Value>,
    errors: &mut HashMap<String, Vec<String>>,
) {
    for field in field_defs {
        if field.disabled {
            if let Some(initial) = &field.initial {
                cleaned_data.insert(field.name.clone(), initial.clone());
            }
            continue;
        }

        let raw = raw_data.get(&field.name).unwrap_or(&RawValue::None);

        match clean_field_value(field, raw) {
            Ok(value) => {
                cleaned_data.insert(field.name.clone(), value);
            }
            Err(field_errors) => {
                errors.insert(field.name.clone(), field_errors);
            }
        }
    }
}

/// Runs the full pipeline and returns the errors as sorted
/// `(field_name, messages)` pairs.
pub async fn full_clean(form: &mut dyn Form) -> Result<(), Vec<(String, Vec<String>)>> {
    if form.is_valid().await {
        Ok(())
    } else {
        let mut errors: Vec<(String, Vec<String>)> = form
            .errors()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        errors.sort_by(|a, b| a.0.cmp(&b.0));
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FormFieldType;
    use crate::form::BaseForm;
    use django_filter_core::QueryDict;

    fn fields() -> Vec<FormFieldDef> {
        vec![
            FormFieldDef::new("title", FormFieldType::char()),
            FormFieldDef::new(
                "year",
                FormFieldType::Integer {
                    min_value: Some(0),
                    max_value: None,
                },
            )
            .required(false),
        ]
    }

    #[test]
    fn test_clean_fields_valid() {
        let mut raw = HashMap::new();
        raw.insert("title".to_string(), RawValue::from("Dune"));
        raw.insert("year".to_string(), RawValue::from("1965"));

        let mut cleaned = HashMap::new();
        let mut errors = HashMap::new();
        clean_fields(&fields(), &raw, &mut cleaned, &mut errors);

        assert!(errors.is_empty());
        assert_eq!(cleaned.get("title"), Some(&Value::from("Dune")));
        assert_eq!(cleaned.get("year"), Some(&Value::Int(1965)));
    }

    #[test]
    fn test_clean_fields_accumulates_errors() {
        let mut raw = HashMap::new();
        raw.insert("year".to_string(), RawValue::from("-1"));

        let mut cleaned = HashMap::new();
        let mut errors = HashMap::new();
        clean_fields(&fields(), &raw, &mut cleaned, &mut errors);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors["title"], ["This field is required."]);
        assert!(errors["year"][0].contains("greater than or equal to 0"));
        assert!(cleaned.is_empty());
    }

    #[test]
    fn test_disabled_field_uses_initial() {
        let defs = vec![FormFieldDef::new("title", FormFieldType::char())
            .disabled(true)
            .initial(Value::from("Emma"))];
        let mut raw = HashMap::new();
        raw.insert("title".to_string(), RawValue::from("Dune"));

        let mut cleaned = HashMap::new();
        let mut errors = HashMap::new();
        clean_fields(&defs, &raw, &mut cleaned, &mut errors);
        assert_eq!(cleaned.get("title"), Some(&Value::from("Emma")));
    }

    #[tokio::test]
    async fn test_full_clean_reports_sorted_errors() {
        let mut form = BaseForm::new(fields());
        form.bind(&QueryDict::parse("year=abc"));
        let errors = full_clean(&mut form).await.unwrap_err();
        let names: Vec<&str> = errors.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["title", "year"]);

        form.bind(&QueryDict::parse("title=Dune"));
        assert!(full_clean(&mut form).await.is_ok());
    }
}
