use super::{classify, lookup, ownership_skip};
use batchkit::{Outcome, TargetOperation};
use codesec::CodeSecurityApi;
use std::sync::Arc;

/// Delete a configuration by name
pub struct Delete {
    api: Arc<dyn CodeSecurityApi>,
    name: String,
}

impl Delete {
    pub fn new(api: Arc<dyn CodeSecurityApi>, name: impl Into<String>) -> Self {
        Self {
            api,
            name: name.into(),
        }
    }
}

impl TargetOperation for Delete {
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

        api.delete_configuration(org, id)
            .map_err(|e| classify(e, "Failed to delete configuration"))
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codesec::{AttachScope, Call, Error, Membership, MockApi};

    #[test]
    fn test_deletes_named_configuration() {
        let mock = MockApi::new();
        mock.add_org("octo-org", Membership::Owner);
        let keep = mock.add_configuration("octo-org", "keep", &[]);
        let id = mock.add_configuration("octo-org", "baseline", &[]);
        mock.attach_configuration("octo-org", id, AttachScope::All)
            .unwrap();

        let op = Delete::new(Arc::new(mock.clone()), "baseline");
        assert!(op.process("octo-org").is_success());

        let org = mock.org("octo-org").unwrap();
        assert_eq!(org.configurations.len(), 1);
        assert_eq!(org.configurations[0].id, keep);
        assert!(org.attachments.is_empty());
    }

    #[test]
    fn test_missing_configuration_is_skipped_every_time() {
        let mock = MockApi::new();
        mock.add_org("octo-org", Membership::Owner);
        let op = Delete::new(Arc::new(mock.clone()), "baseline");

        assert!(op.process("octo-org").is_skipped());
        assert!(op.process("octo-org").is_skipped());
        assert!(mock.calls_to(Call::Delete).is_empty());
    }

    #[test]
    fn test_list_failure_is_an_error() {
        let mock = MockApi::new();
        mock.add_org("octo-org", Membership::Owner);
        mock.fail("octo-org", Call::List, Error::api(403, "Forbidden"));
        let op = Delete::new(Arc::new(mock), "baseline");

        assert!(op.process("octo-org").is_failed());
    }
}
