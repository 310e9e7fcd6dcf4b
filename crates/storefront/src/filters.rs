//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Content hash of the stylesheet and script, computed by the build script.
///
/// Usage in templates: `/static/css/main.css?v={{ ""|asset_version }}`
#[askama::filter_fn]
pub fn asset_version(
    _value: impl Display,
    _env: &dyn askama::Values,
) -> askama::Result<&'static str> {
    Ok(env!("ASSET_VERSION"))
}

/// Human label for a category key.
///
/// Usage in templates: `{{ product.category|category_label }}`
#[askama::filter_fn]
pub fn category_label(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(atelier_core::catalog::category_label(&value.to_string()))
}
