use super::{classify, lookup, ownership_skip};
use batchkit::{OperationError, Outcome, TargetOperation};
use codesec::{AttachScope, CodeSecurityApi};
use std::sync::Arc;

/// Attach an existing configuration and optionally make it the default
pub struct Apply {
    api: Arc<dyn CodeSecurityApi>,
    name: String,
    scope: Option<AttachScope>,
    set_as_default: bool,
}

impl Apply {
    pub fn new(
        api: Arc<dyn CodeSecurityApi>,
        name: impl Into<String>,
        scope: Option<AttachScope>,
        set_as_default: bool,
    ) -> Self {
        Self {
            api,
            name: name.into(),
            scope,
            set_as_default,
        }
    }

    fn apply(&self, org: &str, id: u64) -> Result<(), OperationError> {
        let api = self.api.as_ref();
        if let Some(scope) = self.scope {
            api.attach_configuration(org, id, scope)
                .map_err(|e| classify(e, "Failed to attach configuration"))?;
        }
        if self.set_as_default {
            api.set_default(org, id)
                .map_err(|e| classify(e, "Failed to set default configuration"))?;
        }
        Ok(())
    }
}

impl TargetOperation for Apply {
    fn process(&self, org: &str) -> Outcome {
        let api = self.api.as_ref();
        if let Some(skip) = ownership_skip(api, org) {
            return skip;
        }

        match lookup(api, org, &self.name) {
            Ok(Some(id)) => self.apply(org, id).into(),
            Ok(None) => Outcome::skipped(format!("'{}' not found", self.name)),
            Err(e) => Outcome::Failed(e),
        }
    }
}
