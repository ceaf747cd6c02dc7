use anyhow::Result;

use crate::PromptRenderer;

use super::super::Container;

pub struct EntitiesController<'a> {
    container: &'a Container,
}

impl<'a> EntitiesController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn entities(&self) -> Result<String> {
        let entities = self
            .container
            .entity_provider()
            .list_exposed_entities()
            .await?;

        if entities.is_empty() {
            return Ok("No exposed entities.".to_string());
        }

        let mut output = format!("{} exposed entities:\n\n", entities.len());
        output.push_str(&PromptRenderer::render_entities(&entities));
        Ok(output.trim_end().to_string())
    }
}
