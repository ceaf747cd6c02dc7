use anyhow::{Context, Result};

use super::super::Container;

pub struct CheckController<'a> {
    container: &'a Container,
}

impl<'a> CheckController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn check(&self) -> Result<String> {
        let Some(client) = self.container.openai_client() else {
            return Ok("Mock chat client in use; no API key to verify.".to_string());
        };

        client
            .verify_credentials()
            .await
            .context("API key verification failed")?;
        Ok("API key is valid.".to_string())
    }
}
