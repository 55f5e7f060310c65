//! Python bindings over the process-wide default cleaner.

use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::default_cleaner;

/// Clean a URL: unwrap redirectors, strip tracking params, shorten.
///
/// Parameters
/// ----------
/// url : str
///     The URL to clean.
///
/// Returns
/// -------
/// str
///     The cleaned URL, or `url` unchanged if it is not an absolute URL.
#[pyfunction]
pub fn clean_url(url: &str) -> String {
    default_cleaner().clean(url)
}

/// Clean every link found in free text.
///
/// Returns
/// -------
/// dict
///     {"output": str, "urls_found": int, "urls_modified": int,
///      "params_removed": int}
#[pyfunction]
pub fn clean_text(py: Python<'_>, text: &str) -> PyResult<Py<PyDict>> {
    let report = default_cleaner().clean_text(text);

    let dict = PyDict::new_bound(py);
    dict.set_item("output", report.output)?;
    dict.set_item("urls_found", report.urls_found)?;
    dict.set_item("urls_modified", report.urls_modified)?;
    dict.set_item("params_removed", report.params_removed)?;
    Ok(dict.unbind())
}

/// Check whether a query key is a known tracking parameter.
#[pyfunction]
pub fn is_tracking_param(key: &str) -> bool {
    default_cleaner().is_tracker(key)
}

/// Extract the destination of a known redirector link, one level deep.
#[pyfunction]
pub fn unwrap_redirect(url: &str) -> Option<String> {
    default_cleaner().unwrap_redirect(url)
}
