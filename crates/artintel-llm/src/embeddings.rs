//! Embedding helpers shared by the `embed` and `similar` commands.

use artintel_core::EMBEDDING_DIM;

use crate::client::OllamaClient;
use crate::error::LlmError;

/// Truncate or zero-pad `vector` to exactly `dim` components.
#[must_use]
pub fn fit_to_dim(mut vector: Vec<f32>, dim: usize) -> Vec<f32> {
    if vector.len() != dim {
        tracing::debug!(from = vector.len(), to = dim, "resizing embedding");
        vector.resize(dim, 0.0);
    }
    vector
}

/// Embed `text` and fit the result to the `comments_embedding` column width.
///
/// # Errors
///
/// Returns [`LlmError`] if the model server call fails.
pub async fn embed_for_storage(client: &OllamaClient, text: &str) -> Result<Vec<f32>, LlmError> {
    let vector = client.embed(text).await?;
    Ok(fit_to_dim(vector, EMBEDDING_DIM))
}
