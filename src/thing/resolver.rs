//! Template resolution - applies inheritance chains oldest ancestor first

use tracing::{debug, warn};

use crate::entity::Entity;

use super::error::ThingError;
use super::instantiate::Instantiation;
use super::registry::ThingKind;
use super::trail::Trail;

impl<'a> Instantiation<'a> {
    /// Apply `template` and all of its ancestors to `entity` as non-final layers
    ///
    /// The parent chain is walked depth-first before anything is applied, so
    /// the root ancestor lands first and every more specific template
    /// overrides it. An empty name means there is no template.
    pub(crate) fn apply_template_chain(
        &mut self,
        entity: &mut dyn Entity,
        template: &str,
        trail: Option<&Trail<'_>>,
    ) -> Result<(), ThingError> {
        if template.is_empty() {
            return Ok(());
        }

        // Check for circular references
        if let Some(path) = trail.filter(|t| t.contains(template)) {
            let chain = path.chain_to(template);
            warn!(template, %chain, "circular template reference");
            return Err(ThingError::CyclicTemplate { chain });
        }

        let registry = self.registry;
        let Some(def) = registry.lookup(template, &[ThingKind::Template]) else {
            warn!(template, "template not found");
            return Err(ThingError::TemplateNotFound {
                name: template.to_string(),
            });
        };

        let here = Trail::extend(trail, template);
        self.apply_template_chain(entity, def.template(), Some(&here))?;

        debug!(template, "applying template layer");
        self.apply_layer(entity, def, false)
    }
}
