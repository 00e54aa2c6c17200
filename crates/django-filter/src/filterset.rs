//! Filter sets: an ordered collection of filters bound to request data.
//!
//! A [`FilterSet`] owns a base queryset, the filters declared on it (or
//! generated from a model's metadata), and the form those filters' fields
//! make up. Binding a [`QueryDict`] and awaiting [`FilterSet::qs`] validates
//! the form and applies every filter in order, then the requested ordering.
//!
//! # Examples
//!
//! ```
//! use django_filter::{Filter, FilterSet};
//! use django_filter_core::QueryDict;
//! use django_filter_db::{DatabaseBackendType, LookupType, QuerySet};
//!
//! # block_on(async {
//! let mut fs = FilterSet::builder(QuerySet::new("books"))
//!     .filter(Filter::char("title").lookup_type(LookupType::IContains))
//!     .filter(Filter::number("price").lookup_type(LookupType::Lt))
//!     .build();
//! fs.bind(QueryDict::parse("title=dune&price="));
//! let qs = fs.qs().await.unwrap();
//! assert_eq!(
//!     qs.to_sql(DatabaseBackendType::SQLite).0,
//!     r#"SELECT * FROM "books" WHERE LOWER("title") LIKE LOWER(?) ESCAPE '\'"#
//! );
//! # });
//! # fn block_on(f: impl std::future::Future<Output = ()>) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;

use django_filter_core::logging::filterset_span;
use django_filter_core::{FilterError, FilterResult, QueryDict, StrictMode, ValidationError, SETTINGS};
use django_filter_db::query::lookups::LOOKUP_SEP;
use django_filter_db::{DbExecutor, FieldDef, FieldType, LookupType, Model, OrderBy, QuerySet, Row, Value};
use django_filter_forms::{BaseForm, Form, FormFieldDef, FormFieldType};
use tracing::Instrument;

use crate::filters::Filter;

/// Builds a [`FilterSet`].
#[derive(Debug)]
pub struct FilterSetBuilder {
    queryset: QuerySet,
    generated: Vec<Filter>,
    declared: Vec<Filter>,
    ordering: Vec<(String, String)>,
    order_by_field: Option<String>,
    strict: Option<StrictMode>,
    prefix: Option<String>,
}

impl FilterSetBuilder {
    /// Declares a filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.declared.push(filter);
        self
    }

    /// Generates an `exact` filter for each of `fields` from `M`'s metadata.
    pub fn model_fields<M: Model>(mut self, fields: &[&str]) -> FilterResult<Self> {
        for name in fields {
            let field = model_field::<M>(name)?;
            self.generated.push(filter_for_field(field, LookupType::Exact));
        }
        Ok(self)
    }

    /// Generates one filter per lookup for a field of `M`. The filter for
    /// `exact` reads `field`; the others read `field__lookup`.
    pub fn model_field_lookups<M: Model>(
        mut self,
        field: &str,
        lookups: &[LookupType],
    ) -> FilterResult<Self> {
        let def = model_field::<M>(field)?;
        for lookup in lookups {
            self.generated.push(filter_for_field(def, *lookup));
        }
        Ok(self)
    }

    /// Offers ordering by `fields`, ascending or descending (`-field`),
    /// through the ordering parameter.
    #[must_use]
    pub fn ordering(mut self, fields: &[&str]) -> Self {
        for field in fields {
            let label = field.replace('_', " ");
            self.ordering.push(((*field).to_string(), label.clone()));
            self.ordering
                .push((format!("-{field}"), format!("{label} (descending)")));
        }
        self
    }

    /// Overrides the name of the ordering parameter.
    #[must_use]
    pub fn order_by_field(mut self, name: impl Into<String>) -> Self {
        self.order_by_field = Some(name.into());
        self
    }

    /// Overrides what happens when the bound input fails validation.
    #[must_use]
    pub const fn strict(mut self, strict: StrictMode) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Namespaces every parameter as `prefix-param`.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Finishes the filter set.
    ///
    /// Declared filters replace generated ones reading the same parameter and
    /// follow them in declaration order.
    pub fn build(self) -> FilterSet {
        let settings = SETTINGS.get();
        let mut declared = self.declared;
        declared.sort_by_key(Filter::creation_counter);

        let mut filters: Vec<Filter> = self
            .generated
            .into_iter()
            .filter(|g| !declared.iter().any(|d| d.param_name() == g.param_name()))
            .collect();
        filters.extend(declared);

        let order_by_field = self
            .order_by_field
            .unwrap_or_else(|| settings.order_by_field.clone());

        let mut fields: Vec<FormFieldDef> = filters.iter().map(Filter::form_field).collect();
        if !self.ordering.is_empty() {
            fields.push(
                FormFieldDef::new(
                    order_by_field.clone(),
                    FormFieldType::Choice {
                        choices: self.ordering.clone(),
                    },
                )
                .required(false)
                .label("Ordering"),
            );
        }
        let mut form = BaseForm::new(fields);
        if let Some(prefix) = &self.prefix {
            form = form.with_prefix(prefix.clone());
        }

        FilterSet {
            queryset: self.queryset,
            filters,
            has_ordering: !self.ordering.is_empty(),
            order_by_field,
            strict: self.strict.unwrap_or(settings.strict),
            form,
            cached: None,
        }
    }
}

fn model_field<M: Model>(name: &str) -> FilterResult<&'static FieldDef> {
    M::meta().get_field(name).ok_or_else(|| {
        FilterError::FieldDoesNotExist(format!(
            "{} has no field named '{name}'",
            M::meta().model_name
        ))
    })
}

/// Derives the filter for a model field and lookup.
fn filter_for_field(field: &FieldDef, lookup: LookupType) -> Filter {
    let filter = match &field.field_type {
        _ if field.choices.is_some() => {
            let choices = field
                .choices
                .iter()
                .flatten()
                .map(|(key, label)| (key.to_string(), label.clone()));
            Filter::choice(field.name, choices)
        }
        FieldType::BooleanField | FieldType::NullBooleanField => Filter::boolean(field.name),
        FieldType::DateField => Filter::date(field.name),
        FieldType::DateTimeField => Filter::datetime(field.name),
        FieldType::TimeField => Filter::time(field.name),
        FieldType::ForeignKey { .. } | FieldType::OneToOneField { .. } => {
            Filter::number(field.column.clone()).param(field.name)
        }
        t if t.is_numeric() => Filter::number(field.name),
        _ => Filter::char(field.name),
    };

    let filter = filter.lookup_type(lookup).help_text(field.help_text.clone());
    if lookup == LookupType::Exact {
        filter.default_label(field.label())
    } else {
        filter
            .param(format!("{}{LOOKUP_SEP}{lookup}", field.name))
            .default_label(format!("{} ({lookup})", field.label()))
    }
}

/// An ordered collection of filters over one base queryset.
pub struct FilterSet {
    queryset: QuerySet,
    filters: Vec<Filter>,
    has_ordering: bool,
    order_by_field: String,
    strict: StrictMode,
    form: BaseForm,
    cached: Option<QuerySet>,
}

impl fmt::Debug for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSet")
            .field("table", &self.queryset.table())
            .field("filters", &self.filters)
            .field("order_by_field", &self.order_by_field)
            .field("strict", &self.strict)
            .field("bound", &self.form.is_bound())
            .finish_non_exhaustive()
    }
}

impl FilterSet {
    /// Starts building a filter set over `queryset`.
    pub fn builder(queryset: QuerySet) -> FilterSetBuilder {
        FilterSetBuilder {
            queryset,
            generated: Vec::new(),
            declared: Vec::new(),
            ordering: Vec::new(),
            order_by_field: None,
            strict: None,
            prefix: None,
        }
    }

    /// The filters, in the order they are applied.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Looks a filter up by the parameter it reads.
    pub fn get(&self, param: &str) -> Option<&Filter> {
        self.filters.iter().find(|f| f.param_name() == param)
    }

    /// The unfiltered base queryset.
    pub const fn queryset(&self) -> &QuerySet {
        &self.queryset
    }

    /// The strictness applied to invalid input.
    pub const fn strict_mode(&self) -> StrictMode {
        self.strict
    }

    /// The form made of every filter's field (plus the ordering field).
    pub const fn form(&self) -> &BaseForm {
        &self.form
    }

    /// Binds request data. Drops any cached result.
    pub fn bind(&mut self, data: QueryDict) {
        self.form.bind(&data);
        self.cached = None;
    }

    /// Returns `true` if data was bound.
    pub fn is_bound(&self) -> bool {
        self.form.is_bound()
    }

    /// Validates the bound data.
    pub async fn is_valid(&mut self) -> bool {
        self.form.is_valid().await
    }

    /// Per-parameter validation errors of the last validation.
    pub fn errors(&self) -> &HashMap<String, Vec<String>> {
        self.form.errors()
    }

    /// Returns the filtered queryset.
    ///
    /// Unbound, this is the base queryset. Bound, the form is validated
    /// first; invalid input is handled per [`StrictMode`]. The result is
    /// cached until the next [`bind`](Self::bind).
    pub async fn qs(&mut self) -> FilterResult<QuerySet> {
        if let Some(qs) = &self.cached {
            return Ok(qs.clone());
        }
        let span = filterset_span(self.queryset.table());
        let qs = self.evaluate().instrument(span).await?;
        self.cached = Some(qs.clone());
        Ok(qs)
    }

    async fn evaluate(&mut self) -> FilterResult<QuerySet> {
        if !self.form.is_bound() {
            return Ok(self.queryset.clone());
        }

        if !self.form.is_valid().await {
            if let Some(qs) = self.reject()? {
                return Ok(qs);
            }
        }

        let mut failures = Vec::new();
        let mut qs = self.queryset.clone();
        {
            let cleaned = self.form.cleaned_data();
            for filter in &self.filters {
                let Some(value) = cleaned.get(filter.param_name()) else {
                    continue;
                };
                match filter.filter(qs.clone(), value) {
                    Ok(filtered) => qs = filtered,
                    Err(FilterError::InvalidValue { message, .. }) => {
                        failures.push((filter.param_name().to_string(), message));
                    }
                    Err(e @ FilterError::InvalidLookup(_)) => {
                        failures.push((filter.param_name().to_string(), e.to_string()));
                    }
                    Err(e) => return Err(e),
                }
            }

            if self.has_ordering {
                if let Some(Value::String(order)) = cleaned.get(&self.order_by_field) {
                    if !order.is_empty() {
                        tracing::debug!(%order, "applying ordering");
                        qs = qs.order_by(vec![OrderBy::parse(order)]);
                    }
                }
            }
        }

        if !failures.is_empty() {
            for (param, message) in failures {
                self.form.add_error(&param, message);
            }
            if let Some(qs) = self.reject()? {
                return Ok(qs);
            }
        }
        Ok(qs)
    }

    /// Applies the strictness mode to invalid input. `None` means the
    /// failing filters are skipped and filtering carries on.
    fn reject(&self) -> FilterResult<Option<QuerySet>> {
        tracing::debug!(strict = ?self.strict, errors = self.form.errors().len(), "invalid filter input");
        match self.strict {
            StrictMode::ReturnNone => Ok(Some(self.queryset.clone().none())),
            StrictMode::Raise => Err(FilterError::ValidationError(
                ValidationError::from_form_errors(self.form.errors()),
            )),
            StrictMode::Ignore => Ok(None),
        }
    }

    /// Counts the rows of the filtered queryset.
    pub async fn count(&mut self, db: &dyn DbExecutor) -> FilterResult<i64> {
        self.qs().await?.count(db).await
    }

    /// Fetches the rows of the filtered queryset.
    pub async fn fetch(&mut self, db: &dyn DbExecutor) -> FilterResult<Vec<Row>> {
        self.qs().await?.fetch(db).await
    }

    /// Fetches the filtered queryset as model instances.
    pub async fn fetch_models<M: Model>(&mut self, db: &dyn DbExecutor) -> FilterResult<Vec<M>> {
        self.qs().await?.fetch_models::<M>(db).await
    }
}
