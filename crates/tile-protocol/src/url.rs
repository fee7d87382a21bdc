//! Query-string assembly and `{placeholder}` substitution.

use std::borrow::Cow;

use tile_common::{ConfigError, ConfigErrorCode};

/// Ordered list of query parameters.
///
/// Keys are compared case-insensitively when overriding, matching how OGC
/// servers treat KVP parameter names.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    params: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter whose value will be percent-encoded.
    pub fn push(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.params.push((key.to_string(), encode_value(&value.into())));
        self
    }

    /// Append a parameter whose value is already URL-safe (placeholders, bbox strings).
    pub fn push_raw(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    /// Replace a parameter with the same (case-insensitive) key, or append it.
    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        let encoded = encode_value(value);
        match self
            .params
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            Some(existing) => existing.1 = encoded,
            None => self.params.push((key.to_string(), encoded)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Render as `k=v&k=v`.
    pub fn to_query_string(&self) -> String {
        let mut out = String::new();
        for (i, (k, v)) in self.params.iter().enumerate() {
            if i > 0 {
                out.push('&');
            }
            out.push_str(k);
            out.push('=');
            out.push_str(v);
        }
        out
    }
}

/// Percent-encode a query value, leaving commas and colons literal.
///
/// Both are legal in a query component and OGC servers expect
/// `LAYERS=a,b` and `CRS=EPSG:3857` unescaped.
pub fn encode_value(value: &str) -> String {
    urlencoding::encode(value)
        .replace("%2C", ",")
        .replace("%3A", ":")
}

/// Join a base URL and a query string, respecting an existing `?`.
pub fn append_query(base: &str, query: &str) -> String {
    if query.is_empty() {
        return base.to_string();
    }
    let separator = if base.ends_with('?') || base.ends_with('&') {
        ""
    } else if base.contains('?') {
        "&"
    } else {
        "?"
    };
    format!("{}{}{}", base, separator, query)
}

/// Strip the query string and fragment from a URL.
pub fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// Replace every `{name}` in `template` for which `lookup` returns a value.
///
/// Unknown placeholders are left untouched. Runs in a single pass and
/// allocates only the output string.
pub fn fill_template<'a, F>(template: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<Cow<'a, str>>,
{
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// True if `template` contains `{name}` (case-insensitive).
pub fn has_placeholder(template: &str, name: &str) -> bool {
    let needle = format!("{{{}}}", name.to_ascii_lowercase());
    template.to_ascii_lowercase().contains(&needle)
}

/// Reject anything but http(s) URLs (e.g. `javascript:`, `file:`, `data:`).
pub fn ensure_http_url(field: &str, url: &str) -> Result<(), ConfigError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::missing(field));
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("https://") || lower.starts_with("http://") {
        Ok(())
    } else {
        Err(ConfigError::new(
            field,
            format!("URL must use http or https: {}", trimmed),
            ConfigErrorCode::UnsafeUrl,
        ))
    }
}
