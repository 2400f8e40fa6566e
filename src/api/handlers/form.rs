use axum::{body::Bytes, extract::Multipart};
use std::collections::HashMap;
use tracing::debug;

use super::error::ApiError;
use crate::gate::GateError;

/// Buffered multipart fields by name; a repeated name keeps the last value.
#[derive(Debug, Default)]
pub struct FormFields {
    fields: HashMap<String, Bytes>,
}

impl FormFields {
    /// # Errors
    /// Returns `ApiError::BadRequest` if the multipart stream is malformed.
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut fields = HashMap::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Invalid multipart field {name}: {e}")))?;
            debug!(field = %name, len = bytes.len(), "multipart field");
            fields.insert(name, bytes);
        }

        Ok(Self { fields })
    }

    /// # Errors
    /// `MissingField` if absent, `BadRequest` if not UTF-8.
    pub fn text(&self, name: &'static str) -> Result<String, ApiError> {
        let bytes = self.fields.get(name).ok_or(GateError::MissingField(name))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ApiError::BadRequest(format!("Field {name} must be UTF-8 text")))
    }

    /// # Errors
    /// `MissingField` if absent.
    pub fn bytes(&self, name: &'static str) -> Result<Bytes, ApiError> {
        self.fields
            .get(name)
            .cloned()
            .ok_or_else(|| GateError::MissingField(name).into())
    }
}
