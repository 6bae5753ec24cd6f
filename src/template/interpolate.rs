//! Built-in template interpolator
//!
//! Supports the placeholder syntaxes panels commonly use:
//!
//! - `$name`
//! - `${name}` and `${name:format}`
//! - `[[name]]`
//!
//! The time-range variables `__from` and `__to` accept the formats
//! `date:iso` (RFC 3339 with milliseconds) and `date:seconds`; without a
//! format they render as epoch milliseconds.

use chrono::{DateTime, SecondsFormat, Utc};

use super::scope::ScopedVars;
use super::{TemplateError, TemplateResolver};

/// Template resolver backed by a [`ScopedVars`] scope
#[derive(Debug, Clone)]
pub struct VariableInterpolator {
    strict: bool,
}

impl VariableInterpolator {
    /// Create an interpolator that rejects unknown variables
    pub fn new() -> Self {
        Self { strict: true }
    }

    /// Create an interpolator that leaves unknown variables untouched
    pub fn lenient() -> Self {
        Self { strict: false }
    }

    /// Whether unknown variables are an error
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    fn lookup(
        &self,
        name: &str,
        format: Option<&str>,
        scope: &ScopedVars,
        raw: &str,
    ) -> Result<String, TemplateError> {
        if let Some(instant) = time_variable(name, scope) {
            return format_instant(name, instant, format);
        }

        match scope.get(name) {
            Some(var) => match format {
                None | Some("raw") => Ok(var.value.clone()),
                Some("text") => Ok(var.text.clone()),
                Some(other) => Err(TemplateError::UnsupportedFormat {
                    name: name.to_string(),
                    format: other.to_string(),
                }),
            },
            None if self.strict => Err(TemplateError::UnknownVariable(name.to_string())),
            None => Ok(raw.to_string()),
        }
    }
}

impl Default for VariableInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateResolver for VariableInterpolator {
    fn replace(&self, template: &str, scope: &ScopedVars) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find(['$', '[']) {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];

            if let Some(body) = rest.strip_prefix("${") {
                let end = body
                    .find('}')
                    .ok_or_else(|| TemplateError::Unterminated(template.to_string()))?;
                let inner = &body[..end];
                let raw = &rest[..end + 3];
                let (name, format) = match inner.split_once(':') {
                    Some((name, format)) => (name, Some(format)),
                    None => (inner, None),
                };
                out.push_str(&self.lookup(name, format, scope, raw)?);
                rest = &body[end + 1..];
            } else if let Some(body) = rest.strip_prefix("[[") {
                match body.find("]]") {
                    Some(end) => {
                        let name = &body[..end];
                        let raw = &rest[..end + 4];
                        out.push_str(&self.lookup(name, None, scope, raw)?);
                        rest = &body[end + 2..];
                    }
                    None => {
                        out.push_str("[[");
                        rest = body;
                    }
                }
            } else if let Some(body) = rest.strip_prefix('$') {
                let len = body
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(body.len());
                if len == 0 {
                    out.push('$');
                } else {
                    let name = &body[..len];
                    out.push_str(&self.lookup(name, None, scope, &rest[..len + 1])?);
                }
                rest = &body[len..];
            } else {
                // lone '['
                out.push('[');
                rest = &rest[1..];
            }
        }

        out.push_str(rest);
        Ok(out)
    }
}

fn time_variable(name: &str, scope: &ScopedVars) -> Option<DateTime<Utc>> {
    let range = scope.range()?;
    match name {
        "__from" => Some(range.from),
        "__to" => Some(range.to),
        _ => None,
    }
}

fn format_instant(
    name: &str,
    instant: DateTime<Utc>,
    format: Option<&str>,
) -> Result<String, TemplateError> {
    match format {
        None | Some("date:millis") => Ok(instant.timestamp_millis().to_string()),
        Some("date") | Some("date:iso") => {
            Ok(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        Some("date:seconds") => Ok(instant.timestamp().to_string()),
        Some(other) => Err(TemplateError::UnsupportedFormat {
            name: name.to_string(),
            format: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::template::TimeRange;

    fn scope() -> ScopedVars {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        ScopedVars::new()
            .with_var("device", "sensor-1")
            .with_var("site", "north")
            .with_range(TimeRange::new(from, to))
    }

    #[test]
    fn test_all_syntaxes() {
        let interp = VariableInterpolator::new();
        let scope = scope();

        assert_eq!(interp.replace("$device", &scope).unwrap(), "sensor-1");
        assert_eq!(interp.replace("${device}", &scope).unwrap(), "sensor-1");
        assert_eq!(interp.replace("[[device]]", &scope).unwrap(), "sensor-1");
        assert_eq!(
            interp.replace("$site.${device}-raw", &scope).unwrap(),
            "north.sensor-1-raw"
        );
    }

    #[test]
    fn test_time_formats() {
        let interp = VariableInterpolator::new();
        let scope = scope();

        assert_eq!(
            interp.replace("${__from:date:iso}", &scope).unwrap(),
            "2024-01-01T00:00:00.000Z"
        );
        assert_eq!(
            interp.replace("${__to:date:seconds}", &scope).unwrap(),
            "1704070800"
        );
        assert_eq!(interp.replace("$__from", &scope).unwrap(), "1704067200000");
    }

    #[test]
    fn test_plain_text_untouched() {
        let interp = VariableInterpolator::new();

        assert_eq!(
            interp.replace("cost $ [x] done", &ScopedVars::new()).unwrap(),
            "cost $ [x] done"
        );
    }

    #[test]
    fn test_unknown_variable_strict() {
        let interp = VariableInterpolator::new();
        let result = interp.replace("${missing}", &ScopedVars::new());

        assert!(matches!(result, Err(TemplateError::UnknownVariable(name)) if name == "missing"));
    }

    #[test]
    fn test_unknown_variable_lenient() {
        let interp = VariableInterpolator::lenient();

        assert_eq!(
            interp.replace("a/${missing}/[[other]]/$x", &ScopedVars::new()).unwrap(),
            "a/${missing}/[[other]]/$x"
        );
    }

    #[test]
    fn test_time_without_range_is_unknown() {
        let interp = VariableInterpolator::new();
        let result = interp.replace("${__from:date:iso}", &ScopedVars::new());

        assert!(matches!(result, Err(TemplateError::UnknownVariable(_))));
    }

    #[test]
    fn test_unsupported_format() {
        let interp = VariableInterpolator::new();
        let result = interp.replace("${__from:date:YYYY}", &scope());

        assert!(matches!(result, Err(TemplateError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_unterminated() {
        let interp = VariableInterpolator::new();
        let result = interp.replace("topic-${device", &scope());

        assert!(matches!(result, Err(TemplateError::Unterminated(_))));
    }
}
