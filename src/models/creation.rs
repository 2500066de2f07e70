//! Creation model: a gallery post with a photo and a short description.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Creation {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub published: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating or fully replacing a creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl CreationRequest {
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        self.description = self.description.trim().to_string();
        self.image = self.image.filter(|url| !url.trim().is_empty());
        Ok(self)
    }
}
