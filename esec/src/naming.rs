//! File name ↔ environment convention: `<format-extension>[.<environment>]`.

use crate::error::{EsecError, EsecResult};
use esec_format::Format;
use std::path::Path;

/// Environment names are lowercase ASCII letters and digits. The empty
/// name is the default environment.
pub fn validate_environment_name(name: &str) -> EsecResult<()> {
    if name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        Ok(())
    } else {
        Err(EsecError::InvalidEnvironment(name.to_string()))
    }
}

/// File name holding `environment`'s secrets in `format`.
///
/// `file_for_environment(Format::Ejson, "prod")` is `.ejson.prod`; the
/// default environment gets the bare extension.
pub fn file_for_environment(format: Format, environment: &str) -> EsecResult<String> {
    validate_environment_name(environment)?;
    if environment.is_empty() {
        Ok(format.extension().to_string())
    } else {
        Ok(format!("{}.{environment}", format.extension()))
    }
}

/// Environment encoded in a file name's trailing segment.
///
/// A name ending in a format extension belongs to the default environment.
pub fn environment_from_filename(path: &Path) -> EsecResult<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| EsecError::InvalidFilename(path.display().to_string()))?;

    if Format::from_extension_suffix(name).is_some() {
        return Ok(String::new());
    }

    let invalid = || EsecError::InvalidFilename(name.to_string());
    let (stem, environment) = name.rsplit_once('.').ok_or_else(invalid)?;
    if Format::from_extension_suffix(stem).is_none() || environment.is_empty() {
        return Err(invalid());
    }
    validate_environment_name(environment)?;
    Ok(environment.to_string())
}
