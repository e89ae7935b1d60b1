use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A responder who may be alerted of nearby incidents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Responder {
    pub id: String,
    /// Emergency types this responder handles, such as "Fire" or "Medical".
    pub services: BTreeSet<String>,
    /// Region (state) code the responder operates within.
    pub state: Option<String>,
    pub fcm_token: Option<String>,
}

impl Responder {
    /// Push token of the responder. None means they cannot be reached, which is not an error.
    pub fn push_token(&self) -> Option<&str> {
        crate::non_blank(self.fcm_token.as_deref())
    }

    pub fn offers(&self, service: &str) -> bool {
        self.services.contains(service)
    }
}

/// Profile of a reporting user, keyed on their phone number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub phone_number: String,
    pub fcm_token: Option<String>,
}

impl UserProfile {
    pub fn push_token(&self) -> Option<&str> {
        crate::non_blank(self.fcm_token.as_deref())
    }
}
