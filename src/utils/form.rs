use std::collections::HashMap;

use axum::{
    Form, Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use serde_json::Value;

use crate::error::AppError;

/// A file part received in a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Text fields plus at most one file per field name.
///
/// Accepts `multipart/form-data`, JSON objects and urlencoded bodies, so the
/// same handler serves browser forms and API clients. Anything else (or an
/// empty body) yields an empty form and lets field validation report what is
/// missing.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormData {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = FormData::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await?;
                    // Browsers send an empty part when no file was chosen.
                    if data.is_empty() && file_name.is_empty() {
                        continue;
                    }
                    if form.files.contains_key(&name) {
                        return Err(AppError::BadRequest(format!(
                            "Only one file is allowed for field '{}'",
                            name
                        )));
                    }
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            data,
                        },
                    );
                }
                None => {
                    let text = field.text().await?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    pub fn from_json(object: serde_json::Map<String, Value>) -> Self {
        let fields = object
            .into_iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s,
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                Some((key, text))
            })
            .collect();

        Self {
            fields,
            files: HashMap::new(),
        }
    }

    /// Trimmed text value; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Untrimmed value, for secrets such as passwords.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Trimmed text value, or an empty string when absent.
    pub fn text_or_empty(&self, name: &str) -> String {
        self.text(name).unwrap_or_default().to_string()
    }

    /// Parses a checkbox-style boolean. `None` when the field is absent.
    pub fn flag(&self, name: &str) -> Result<Option<bool>, AppError> {
        match self.text(name).map(|v| v.to_ascii_lowercase()) {
            None => Ok(None),
            Some(v) => match v.as_str() {
                "true" | "1" | "on" | "yes" => Ok(Some(true)),
                "false" | "0" | "off" | "no" => Ok(Some(false)),
                _ => Err(AppError::BadRequest(format!("'{}' must be a boolean", name))),
            },
        }
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            FormData::from_multipart(multipart).await
        } else if content_type.starts_with("application/json") {
            let Json(object) = Json::<serde_json::Map<String, Value>>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Ok(FormData::from_json(object))
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Ok(FormData {
                fields,
                files: HashMap::new(),
            })
        } else {
            Ok(FormData::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_form(value: Value) -> FormData {
        match value {
            Value::Object(map) => FormData::from_json(map),
            _ => unreachable!("test input is an object"),
        }
    }

    #[test]
    fn json_values_become_text_fields() {
        let form = json_form(json!({
            "title": "  Hello ",
            "private": true,
            "count": 3,
            "nested": { "ignored": 1 }
        }));

        assert_eq!(form.text("title"), Some("Hello"));
        assert_eq!(form.text("private"), Some("true"));
        assert_eq!(form.text("count"), Some("3"));
        assert_eq!(form.text("nested"), None);
    }

    #[test]
    fn blank_text_is_absent() {
        let form = json_form(json!({ "title": "   " }));
        assert_eq!(form.text("title"), None);
        assert_eq!(form.text_or_empty("title"), "");
    }

    #[test]
    fn flags() {
        let form = json_form(json!({ "a": "on", "b": "False", "c": "maybe" }));
        assert_eq!(form.flag("a").unwrap(), Some(true));
        assert_eq!(form.flag("b").unwrap(), Some(false));
        assert_eq!(form.flag("missing").unwrap(), None);
        assert!(form.flag("c").is_err());
    }
}
