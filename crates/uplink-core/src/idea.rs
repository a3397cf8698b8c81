//! Idea submission: the descriptive text the scorer and matcher work from.

use serde::{Deserialize, Serialize};

use crate::{
  ids::{IdeaId, UserId},
  matching::IdeaFeatures,
};

/// An idea as handed to the pipeline by the submission form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaSubmission {
  pub idea_id:     IdeaId,
  pub owner_id:    UserId,
  pub title:       String,
  pub description: String,
  pub category:    Option<String>,
  pub industry:    Option<String>,
  #[serde(default)]
  pub keywords:    Vec<String>,
}

impl IdeaSubmission {
  /// The subset of the submission used for matching.
  pub fn features(&self) -> IdeaFeatures {
    IdeaFeatures {
      idea_id:     self.idea_id,
      title:       self.title.clone(),
      description: self.description.clone(),
      category:    self.category.clone(),
      industry:    self.industry.clone(),
      keywords:    self.keywords.clone(),
    }
  }
}
