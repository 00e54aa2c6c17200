//! Integration tests for the QueryDict -> widget -> cleaned data pipeline.

use django_filter_core::QueryDict;
use django_filter_db::{LookupType, Value};
use django_filter_forms::fields::{FormFieldDef, FormFieldType};
use django_filter_forms::form::{BaseForm, Form};
use django_filter_forms::validation::full_clean;
use django_filter_forms::widgets::WidgetType;

// ============================================================================
// Shared helpers
// ============================================================================

/// A search form like the ones filter sets build: every field optional.
fn make_search_form() -> BaseForm {
    BaseForm::new(vec![
        FormFieldDef::new(
            "genre",
            FormFieldType::MultipleChoice {
                choices: vec![
                    ("scifi".to_string(), "Science fiction".to_string()),
                    ("romance".to_string(), "Romance".to_string()),
                ],
            },
        )
        .required(false),
        FormFieldDef::new(
            "price",
            FormFieldType::Range {
                bound: Box::new(FormFieldType::decimal()),
            },
        )
        .required(false),
        FormFieldDef::new(
            "title",
            FormFieldType::LookupChoice {
                inner: Box::new(FormFieldType::char()),
                lookups: LookupType::ALL.to_vec(),
            },
        )
        .required(false),
        FormFieldDef::new("published", FormFieldType::Date).required(false),
    ])
}

async fn clean(qs: &str) -> BaseForm {
    let mut form = make_search_form();
    form.bind(&QueryDict::parse(qs));
    form.is_valid().await;
    form
}

// ============================================================================
// Binding and cleaning
// ============================================================================

#[tokio::test]
async fn test_empty_submission_is_valid() {
    let form = clean("").await;
    assert!(form.errors().is_empty());
    let data = form.cleaned_data();
    assert_eq!(data["genre"], Value::List(vec![]));
    assert_eq!(data["price"], Value::Null);
    assert_eq!(data["title"], Value::Null);
    assert_eq!(data["published"], Value::Null);
}

#[tokio::test]
async fn test_full_submission() {
    let form = clean(
        "genre=scifi&genre=romance&price_0=5&price_1=12.5&title_0=dune&title_1=icontains&published=1965-08-02",
    )
    .await;
    assert!(form.errors().is_empty(), "{:?}", form.errors());
    let data = form.cleaned_data();
    assert_eq!(
        data["genre"],
        Value::List(vec![Value::from("scifi"), Value::from("romance")])
    );
    assert_eq!(
        data["price"],
        Value::List(vec![Value::Float(5.0), Value::Float(12.5)])
    );
    assert_eq!(
        data["title"],
        Value::List(vec![Value::from("dune"), Value::from("icontains")])
    );
    assert!(matches!(data["published"], Value::Date(_)));
}

#[tokio::test]
async fn test_percent_encoded_input() {
    let form = clean("title_0=the%20left%20hand&title_1=startswith").await;
    assert_eq!(
        form.cleaned_data()["title"],
        Value::List(vec![Value::from("the left hand"), Value::from("startswith")])
    );
}

#[tokio::test]
async fn test_errors_are_reported_per_field() {
    let mut form = make_search_form();
    form.bind(&QueryDict::parse(
        "genre=poetry&price_0=cheap&title_0=dune&title_1=soundslike&published=someday",
    ));
    let errors = full_clean(&mut form).await.unwrap_err();
    let fields: Vec<&str> = errors.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(fields, ["genre", "price", "published", "title"]);
}

#[tokio::test]
async fn test_widget_override_changes_how_input_is_read() {
    let mut form = BaseForm::new(vec![FormFieldDef::new(
        "price",
        FormFieldType::Range {
            bound: Box::new(FormFieldType::decimal()),
        },
    )
    .required(false)
    .widget(WidgetType::TextInput)]);
    form.bind(&QueryDict::parse("price=3,7"));
    assert!(form.is_valid().await);
    assert_eq!(
        form.cleaned_data()["price"],
        Value::List(vec![Value::Float(3.0), Value::Float(7.0)])
    );
}

// ============================================================================
// Rendering
// ============================================================================

#[tokio::test]
async fn test_rendering_keeps_submitted_values() {
    let form = clean("genre=romance&price_0=5&title_0=dune&title_1=iexact").await;
    let html = form.as_p();
    assert!(html.contains(r#"<option value="romance" selected>Romance</option>"#));
    assert!(html.contains(r#"name="price_0" value="5""#));
    assert!(html.contains(r#"name="title_0" value="dune""#));
    assert!(html.contains(r#"<option value="iexact" selected>iexact</option>"#));
}

#[tokio::test]
async fn test_rendering_shows_errors() {
    let form = clean("published=someday").await;
    assert!(form
        .as_p()
        .contains(r#"<ul class="errorlist"><li>Enter a valid date.</li></ul><p><label for="id_published">"#));
}
