use serde::{Deserialize, Serialize};

/// One job listing, normalized from whichever provider returned it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub title: String,
    pub description: String,
    pub employer: String,
    pub city: String,
    pub country: String,
}

impl Posting {
    pub fn has_description(&self) -> bool {
        !self.description.trim().is_empty()
    }
}
