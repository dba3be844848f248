//! Scripted sandbox capabilities.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::sandbox::{ExternalCapabilities, SandboxError};

/// [`ExternalCapabilities`] answering from fixed data.
///
/// `posts` maps ids to texts; a requested id with no entry fails the fetch.
/// `completion` of `None` makes the reasoning call fail.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCapabilities {
    /// Known posts as `(id, text)` pairs.
    pub posts: Vec<(String, String)>,
    /// Reasoning API answer.
    pub completion: Option<String>,
}

impl ScriptedCapabilities {
    /// Capabilities knowing `posts` and answering `completion`.
    pub fn new(posts: &[(&str, &str)], completion: Option<&str>) -> Self {
        Self {
            posts: posts.iter().map(|(id, text)| (id.to_string(), text.to_string())).collect(),
            completion: completion.map(str::to_string),
        }
    }
}

#[async_trait]
impl ExternalCapabilities for ScriptedCapabilities {
    async fn fetch_posts(
        &self,
        ids: &[String],
        _bearer_token: &SecretString,
    ) -> Result<Vec<String>, SandboxError> {
        ids.iter()
            .map(|id| {
                self.posts
                    .iter()
                    .find(|(known, _)| known == id)
                    .map(|(_, text)| text.clone())
                    .ok_or_else(|| SandboxError::Fetch(format!("post {id} not found")))
            })
            .collect()
    }

    async fn complete(&self, _prompt: &str, _api_key: &SecretString) -> Result<String, SandboxError> {
        self.completion
            .clone()
            .ok_or_else(|| SandboxError::Reasoning("scripted failure".to_string()))
    }
}
