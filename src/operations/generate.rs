use super::{classify, lookup, ownership_skip};
use batchkit::{OperationError, Outcome, TargetOperation};
use codesec::{AttachScope, CodeSecurityApi, Error, NewConfiguration};
use std::sync::Arc;

/// Create a configuration, then attach it and make it the default
pub struct Generate {
    api: Arc<dyn CodeSecurityApi>,
    config: NewConfiguration,
    scope: Option<AttachScope>,
    set_as_default: bool,
    force: bool,
}

impl Generate {
    pub fn new(api: Arc<dyn CodeSecurityApi>, config: NewConfiguration) -> Self {
        Self {
            api,
            config,
            scope: None,
            set_as_default: false,
            force: false,
        }
    }

    #[must_use]
    pub fn attach(mut self, scope: Option<AttachScope>, set_as_default: bool) -> Self {
        self.scope = scope;
        self.set_as_default = set_as_default;
        self
    }

    /// Replace a configuration that already has the same name
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    fn generate(&self, org: &str) -> Result<(), OperationError> {
        let api = self.api.as_ref();
        let name = &self.config.name;

        if let Some(existing) = lookup(api, org, name)? {
            if !self.force {
                return Err(classify(
                    Error::ConfigurationExists {
                        name: name.clone(),
                        org: org.to_string(),
                    },
                    "Skipping creation",
                ));
            }
            log::info!("Replacing configuration '{name}' ({existing}) in {org}");
            api.delete_configuration(org, existing)
                .map_err(|e| classify(e, "Failed to delete existing configuration"))?;
        }

        let id = api
            .create_configuration(org, &self.config)
            .map_err(|e| classify(e, "Failed to create configuration"))?;
        log::debug!("Created configuration '{name}' ({id}) in {org}");

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

impl TargetOperation for Generate {
    fn process(&self, org: &str) -> Outcome {
        if let Some(skip) = ownership_skip(self.api.as_ref(), org) {
            return skip;
        }
        self.generate(org).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchkit::{BatchOptions, NoProgress, run};
    use codesec::{Call, Membership, MockApi, Settings};

    fn baseline() -> NewConfiguration {
        let mut settings = Settings::new();
        settings.insert("secret_scanning".to_string(), "enabled".to_string());
        NewConfiguration {
            name: "baseline".to_string(),
            description: "Baseline".to_string(),
            settings,
        }
    }

    fn owned(orgs: &[&str]) -> MockApi {
        let mock = MockApi::new();
        for org in orgs {
            mock.add_org(org, Membership::Owner);
        }
        mock
    }

    #[test]
    fn test_creates_attaches_and_sets_default() {
        let mock = owned(&["octo-org"]);
        let op = Generate::new(Arc::new(mock.clone()), baseline())
            .attach(Some(AttachScope::Public), true);

        assert!(op.process("octo-org").is_success());

        let org = mock.org("octo-org").unwrap();
        assert_eq!(org.configurations.len(), 1);
        let id = org.configurations[0].id;
        assert_eq!(org.configurations[0].settings["secret_scanning"], "enabled");
        assert_eq!(org.attachments, vec![(id, AttachScope::Public)]);
        assert_eq!(org.default_configuration, Some(id));
    }

    #[test]
    fn test_scope_none_skips_attach() {
        let mock = owned(&["octo-org"]);
        let op = Generate::new(Arc::new(mock.clone()), baseline());

        assert!(op.process("octo-org").is_success());
        assert!(mock.calls_to(Call::Attach).is_empty());
        assert!(mock.calls_to(Call::SetDefault).is_empty());
    }

    #[test]
    fn test_existing_name_is_skip_equivalent() {
        let mock = owned(&["octo-org"]);
        mock.add_configuration("octo-org", "baseline", &[]);
        let op = Generate::new(Arc::new(mock.clone()), baseline());

        let outcome = op.process("octo-org");
        assert!(matches!(
            outcome,
            Outcome::Failed(OperationError::SkipEquivalent(_))
        ));
        assert!(mock.calls_to(Call::Create).is_empty());
    }

    #[test]
    fn test_force_replaces_existing() {
        let mock = owned(&["octo-org"]);
        let old = mock.add_configuration("octo-org", "baseline", &[]);
        let op = Generate::new(Arc::new(mock.clone()), baseline()).force(true);

        assert!(op.process("octo-org").is_success());
        let org = mock.org("octo-org").unwrap();
        assert_eq!(org.configurations.len(), 1);
        assert_ne!(org.configurations[0].id, old);
    }

    #[test]
    fn test_non_owner_is_skipped_without_writes() {
        let mock = MockApi::new();
        mock.add_org(
            "octo-org",
            Membership::Member {
                role: "member".to_string(),
            },
        );
        let op = Generate::new(Arc::new(mock.clone()), baseline());

        assert!(op.process("octo-org").is_skipped());
        assert!(op.process("octo-org").is_skipped());
        assert!(mock.calls_to(Call::List).is_empty());
    }

    #[test]
    fn test_unavailable_feature_is_fatal() {
        let mock = owned(&["octo-org"]);
        mock.fail(
            "octo-org",
            Call::Create,
            Error::FeatureUnavailable {
                feature: "Dependabot Alerts".to_string(),
                org: "octo-org".to_string(),
            },
        );
        let op = Generate::new(Arc::new(mock), baseline());

        assert!(matches!(
            op.process("octo-org"),
            Outcome::Failed(OperationError::Fatal(_))
        ));
    }

    #[test]
    fn test_batch_over_mixed_orgs() {
        let mock = owned(&["a", "b", "c"]);
        mock.add_configuration("b", "baseline", &[]);
        mock.fail("c", Call::Create, Error::api(500, "Internal Server Error"));
        let targets: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();

        let result = run(
            &targets,
            Arc::new(Generate::new(Arc::new(mock), baseline())),
            &BatchOptions::default(),
            &mut NoProgress,
        );

        // a created, b exists, c server error, d not a member
        assert_eq!(result.success, 1);
        assert_eq!(result.skipped, 2);
        assert_eq!(result.errors, 1);
    }
}
