use alloy::{primitives::Bytes, sol_types::SolValue};

use super::SandboxError;
use crate::secrets::SecretBundle;

/// Everything one invocation may read. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct SandboxInputs {
    args: Vec<String>,
    bytes_args: Vec<Bytes>,
    secrets: SecretBundle,
}

impl SandboxInputs {
    /// Creates inputs from raw positional and binary arguments.
    pub fn new(args: Vec<String>, bytes_args: Vec<Bytes>, secrets: SecretBundle) -> Self {
        Self { args, bytes_args, secrets }
    }

    /// Inputs as the consumer contract builds them: the prompt template as the
    /// first string argument and the content ids ABI-encoded as `string[]` in
    /// the first binary argument.
    pub fn for_posts(prompt_template: &str, content_ids: &[String], secrets: SecretBundle) -> Self {
        Self::new(
            vec![prompt_template.to_string()],
            vec![encode_content_ids(content_ids)],
            secrets,
        )
    }

    /// The decrypted secrets.
    pub fn secrets(&self) -> &SecretBundle {
        &self.secrets
    }

    /// The prompt template, `args[0]`.
    pub fn prompt_template(&self) -> Result<&str, SandboxError> {
        self.args
            .first()
            .map(String::as_str)
            .ok_or_else(|| SandboxError::InvalidInput("missing prompt template argument".into()))
    }

    /// The content ids, decoded from `bytesArgs[0]`.
    pub fn content_ids(&self) -> Result<Vec<String>, SandboxError> {
        let raw = self
            .bytes_args
            .first()
            .ok_or_else(|| SandboxError::InvalidInput("missing content id argument".into()))?;
        Vec::<String>::abi_decode(raw)
            .map_err(|e| SandboxError::InvalidInput(format!("content ids are not a string[]: {e}")))
    }
}

/// ABI-encodes content ids as a `string[]`.
pub fn encode_content_ids(content_ids: &[String]) -> Bytes {
    content_ids.to_vec().abi_encode().into()
}
