//! Read-only API wrapper for `--dry-run`
//!
//! Reads go to the real API so membership and lookups behave as in a real
//! run. Writes are logged and reported as successful without being sent.
//! Nothing here prints: workers call these methods, and only the progress
//! consumer owns the terminal.

use codesec::{
    AttachScope, CodeSecurityApi, ConfigurationDetails, ConfigurationUpdate, Membership,
    NewConfiguration, Result, SecurityConfiguration,
};
use std::sync::Arc;

pub struct DryRun {
    inner: Arc<dyn CodeSecurityApi>,
}

impl DryRun {
    pub fn new(inner: Arc<dyn CodeSecurityApi>) -> Self {
        Self { inner }
    }

    fn would(&self, org: &str, action: &str) {
        log::info!("[dry-run] {org}: would {action}");
    }
}

impl CodeSecurityApi for DryRun {
    fn current_user(&self) -> Result<String> {
        self.inner.current_user()
    }

    fn membership(&self, org: &str) -> Result<Membership> {
        self.inner.membership(org)
    }

    fn list_configurations(&self, org: &str) -> Result<Vec<SecurityConfiguration>> {
        self.inner.list_configurations(org)
    }

    fn configuration_details(&self, org: &str, id: u64) -> Result<ConfigurationDetails> {
        self.inner.configuration_details(org, id)
    }

    fn create_configuration(&self, org: &str, config: &NewConfiguration) -> Result<u64> {
        self.would(org, &format!("create '{}'", config.name));
        Ok(0)
    }

    fn update_configuration(
        &self,
        org: &str,
        id: u64,
        update: &ConfigurationUpdate,
    ) -> Result<()> {
        let fields = update.settings.len()
            + usize::from(update.name.is_some())
            + usize::from(update.description.is_some());
        self.would(org, &format!("update configuration {id} ({fields} fields)"));
        Ok(())
    }

    fn delete_configuration(&self, org: &str, id: u64) -> Result<()> {
        self.would(org, &format!("delete configuration {id}"));
        Ok(())
    }

    fn attach_configuration(&self, org: &str, id: u64, scope: AttachScope) -> Result<()> {
        self.would(org, &format!("attach configuration {id} to {scope} repositories"));
        Ok(())
    }

    fn set_default(&self, org: &str, id: u64) -> Result<()> {
        self.would(org, &format!("make configuration {id} the default"));
        Ok(())
    }

    fn enterprise_organizations(&self, enterprise: &str) -> Result<Vec<String>> {
        self.inner.enterprise_organizations(enterprise)
    }
}
