use bytes::Bytes;

use crate::error::ClientError;

/// Pull-based reader over a streamed response body.
///
/// Each call to [`ChunkReader::next_chunk`] waits for the next piece of the
/// body. The sequence is finite and cannot be restarted: once it has ended
/// or failed, every later call returns `Ok(None)`.
pub struct ChunkReader {
    response: Option<reqwest::Response>,
}

impl ChunkReader {
    pub fn new(response: reqwest::Response) -> Self {
        Self { response: Some(response) }
    }

    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, ClientError> {
        let Some(response) = self.response.as_mut() else {
            return Ok(None);
        };

        match response.chunk().await {
            Ok(Some(bytes)) => Ok(Some(bytes)),
            Ok(None) => {
                self.response = None;
                Ok(None)
            }
            Err(e) => {
                // Drop the connection right away
                self.response = None;
                Err(ClientError::Transport(e))
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.response.is_none()
    }
}
