use super::{classify, lookup, ownership_skip};
use batchkit::{Outcome, TargetOperation};
use codesec::{CodeSecurityApi, ConfigurationUpdate};
use std::sync::Arc;

/// Update the name, description or settings of a configuration
pub struct Modify {
    api: Arc<dyn CodeSecurityApi>,
    name: String,
    update: ConfigurationUpdate,
}

impl Modify {
    pub fn new(
        api: Arc<dyn CodeSecurityApi>,
        name: impl Into<String>,
        update: ConfigurationUpdate,
    ) -> Self {
        Self {
            api,
            name: name.into(),
            update,
        }
    }
}

impl TargetOperation for Modify {
    fn process(&self, org: &str) -> Outcome {
        let api = self.api.as_ref();
        if let Some(skip) = ownership_skip(api, org) {
            return skip;
        }

        let id = match lookup(api, org, &self.name) {
            Ok(Some(id)) => id,
            Ok(None) => return Outcome::skipped(format!("'{}' not found", self.name)),
            Err(e) => return Outcome::Failed(e),
        };

        api.update_configuration(org, id, &self.update)
            .map_err(|e| classify(e, "Failed to update configuration"))
            .into()
    }
}
