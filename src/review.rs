//! Feedback left by donors and receivers
use super::error::ValidationError;
use super::types::UserRole;
use serde::{Deserialize, Serialize};

/// Feedback left by one party about another. Persisted as submitted.
#[derive(minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub author_name: String,
    #[n(2)]
    pub author_role: UserRole,
    #[n(3)]
    pub target_id: String, // donor or NGO name the review is about
    #[n(4)]
    pub rating: u8,
    #[n(5)]
    pub content: String,
    #[n(6)]
    pub date: String,
    #[n(7)]
    pub is_verified: bool,
}

impl Review {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.author_name.trim().is_empty() {
            return Err(ValidationError::Missing("author"));
        }
        if self.target_id.trim().is_empty() {
            return Err(ValidationError::Missing("target"));
        }
        if self.content.trim().is_empty() {
            return Err(ValidationError::Missing("content"));
        }
        if !(1..=5).contains(&self.rating) {
            return Err(ValidationError::Rating(self.rating));
        }
        Ok(())
    }
}
