//! Commit status request structures

use serde::{Deserialize, Deserializer, Serialize};

/// Decodes JSON `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Identifies the target commit on the remote host.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommitRef {
    #[serde(deserialize_with = "null_as_default")]
    pub org: String,
    #[serde(deserialize_with = "null_as_default")]
    pub repo: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sha: String,
}

/// The status attached to a commit. This is the outbound request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StatusInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub state: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub context: String,
    #[serde(deserialize_with = "null_as_default")]
    pub target_url: String,
}

/// A decoded inbound event. Missing or `null` fields decode as empty strings
/// so that validation can name them.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StatusRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub commit: CommitRef,
    #[serde(deserialize_with = "null_as_default")]
    pub status: StatusInfo,
}

impl StatusRequest {
    /// Required fields in the order they are validated.
    pub fn required_fields(&self) -> [(&'static str, &str); 7] {
        [
            ("org", self.commit.org.as_str()),
            ("repo", self.commit.repo.as_str()),
            ("sha", self.commit.sha.as_str()),
            ("state", self.status.state.as_str()),
            ("description", self.status.description.as_str()),
            ("context", self.status.context.as_str()),
            ("target_url", self.status.target_url.as_str()),
        ]
    }
}
