//! API trait and implementations.
//!
//! [`CodeSecurityApi`] is the seam between batch operations and the remote
//! service. [`github::GitHubClient`] talks to a real instance; [`MockApi`]
//! keeps everything in memory for tests.
//!
//! ```
//! use codesec::{CodeSecurityApi, Membership, MockApi, NewConfiguration};
//!
//! let mock = MockApi::new();
//! mock.add_org("octo-org", Membership::Owner);
//!
//! let id = mock
//!     .create_configuration(
//!         "octo-org",
//!         &NewConfiguration {
//!             name: "baseline".to_string(),
//!             description: String::new(),
//!             settings: Default::default(),
//!         },
//!     )
//!     .unwrap();
//! assert_eq!(mock.list_configurations("octo-org").unwrap()[0].id, id);
//! ```

pub mod github;

use crate::error::{Error, Result};
use crate::types::{
    AttachScope, ConfigurationDetails, ConfigurationUpdate, Membership, NewConfiguration,
    SecurityConfiguration,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Remote operations on code security configurations.
///
/// Implementations are shared by every batch worker, so they must be
/// `Send + Sync` and keep no per-call mutable state outside a lock.
pub trait CodeSecurityApi: Send + Sync {
    /// Login of the authenticated user.
    fn current_user(&self) -> Result<String>;

    /// The authenticated user's membership in `org`.
    fn membership(&self, org: &str) -> Result<Membership>;

    fn list_configurations(&self, org: &str) -> Result<Vec<SecurityConfiguration>>;

    fn configuration_details(&self, org: &str, id: u64) -> Result<ConfigurationDetails>;

    /// Create a configuration and return its id.
    ///
    /// # Errors
    ///
    /// Returns `Error::FeatureUnavailable` when the instance rejects a
    /// Dependabot setting the request turns on.
    fn create_configuration(&self, org: &str, config: &NewConfiguration) -> Result<u64>;

    fn update_configuration(&self, org: &str, id: u64, update: &ConfigurationUpdate)
    -> Result<()>;

    fn delete_configuration(&self, org: &str, id: u64) -> Result<()>;

    fn attach_configuration(&self, org: &str, id: u64, scope: AttachScope) -> Result<()>;

    /// Make the configuration the default for new repositories.
    fn set_default(&self, org: &str, id: u64) -> Result<()>;

    /// Logins of every organization in an enterprise.
    fn enterprise_organizations(&self, enterprise: &str) -> Result<Vec<String>>;
}

/// Calls recorded by [`MockApi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Membership,
    List,
    Details,
    Create,
    Update,
    Delete,
    Attach,
    SetDefault,
    Enterprise,
}

/// State of one organization inside [`MockApi`].
#[derive(Debug, Clone)]
pub struct MockOrg {
    pub membership: Membership,
    pub configurations: Vec<ConfigurationDetails>,
    pub attachments: Vec<(u64, AttachScope)>,
    pub default_configuration: Option<u64>,
}

#[derive(Debug, Default)]
struct MockState {
    orgs: HashMap<String, MockOrg>,
    enterprises: HashMap<String, Vec<String>>,
    failures: HashMap<(String, Call), Error>,
    calls: Vec<(Call, String)>,
    next_id: u64,
}

/// In-memory API for testing without network access.
///
/// Unknown organizations behave like the real service: membership is
/// `NotMember` and every other call fails with 404.
#[derive(Debug, Clone, Default)]
pub struct MockApi {
    user: String,
    state: Arc<Mutex<MockState>>,
}

impl MockApi {
    #[must_use]
    pub fn new() -> Self {
        Self {
            user: "octocat".to_string(),
            state: Arc::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register an organization with no configurations.
    pub fn add_org(&self, org: &str, membership: Membership) {
        self.lock().orgs.insert(
            org.to_string(),
            MockOrg {
                membership,
                configurations: Vec::new(),
                attachments: Vec::new(),
                default_configuration: None,
            },
        );
    }

    /// Add an existing configuration and return its id.
    pub fn add_configuration(
        &self,
        org: &str,
        name: &str,
        settings: &[(&str, &str)],
    ) -> u64 {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        if let Some(entry) = state.orgs.get_mut(org) {
            entry.configurations.push(ConfigurationDetails {
                id,
                name: name.to_string(),
                description: format!("{name} description"),
                target_type: "organization".to_string(),
                settings: settings
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            });
        }
        id
    }

    pub fn add_enterprise(&self, slug: &str, orgs: &[&str]) {
        self.lock().enterprises.insert(
            slug.to_string(),
            orgs.iter().map(|o| o.to_string()).collect(),
        );
    }

    /// Make every `call` against `org` fail with `error`.
    pub fn fail(&self, org: &str, call: Call, error: Error) {
        self.lock().failures.insert((org.to_string(), call), error);
    }

    /// Organizations `call` was made against, in call order.
    #[must_use]
    pub fn calls_to(&self, call: Call) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter(|(c, _)| *c == call)
            .map(|(_, org)| org.clone())
            .collect()
    }

    /// Snapshot of an organization's state.
    #[must_use]
    pub fn org(&self, org: &str) -> Option<MockOrg> {
        self.lock().orgs.get(org).cloned()
    }

    /// Record the call, then return the injected failure if there is one.
    fn enter<'a>(&'a self, call: Call, org: &str) -> Result<MutexGuard<'a, MockState>> {
        let mut state = self.lock();
        state.calls.push((call, org.to_string()));
        if let Some(err) = state.failures.get(&(org.to_string(), call)).cloned() {
            return Err(err);
        }
        Ok(state)
    }
}

fn not_found(what: &str) -> Error {
    Error::api(404, format!("{what} not found"))
}

fn org_mut<'a>(state: &'a mut MockState, org: &str) -> Result<&'a mut MockOrg> {
    state.orgs.get_mut(org).ok_or_else(|| not_found(org))
}

fn configuration_mut(entry: &mut MockOrg, id: u64) -> Result<&mut ConfigurationDetails> {
    entry
        .configurations
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| not_found("configuration"))
}

impl CodeSecurityApi for MockApi {
    fn current_user(&self) -> Result<String> {
        Ok(self.user.clone())
    }

    fn membership(&self, org: &str) -> Result<Membership> {
        let state = self.enter(Call::Membership, org)?;
        Ok(state
            .orgs
            .get(org)
            .map_or(Membership::NotMember, |o| o.membership.clone()))
    }

    fn list_configurations(&self, org: &str) -> Result<Vec<SecurityConfiguration>> {
        let mut state = self.enter(Call::List, org)?;
        let entry = org_mut(&mut state, org)?;
        Ok(entry
            .configurations
            .iter()
            .map(ConfigurationDetails::summary)
            .collect())
    }

    fn configuration_details(&self, org: &str, id: u64) -> Result<ConfigurationDetails> {
        let mut state = self.enter(Call::Details, org)?;
        let entry = org_mut(&mut state, org)?;
        configuration_mut(entry, id).map(|c| c.clone())
    }

    fn create_configuration(&self, org: &str, config: &NewConfiguration) -> Result<u64> {
        let mut state = self.enter(Call::Create, org)?;
        state.next_id += 1;
        let id = state.next_id;
        let entry = org_mut(&mut state, org)?;
        if entry.configurations.iter().any(|c| c.name == config.name) {
            return Err(Error::api(422, "Name has already been taken"));
        }
        entry.configurations.push(ConfigurationDetails {
            id,
            name: config.name.clone(),
            description: config.description.clone(),
            target_type: "organization".to_string(),
            settings: config.settings.clone(),
        });
        Ok(id)
    }

    fn update_configuration(
        &self,
        org: &str,
        id: u64,
        update: &ConfigurationUpdate,
    ) -> Result<()> {
        let mut state = self.enter(Call::Update, org)?;
        let entry = org_mut(&mut state, org)?;
        let config = configuration_mut(entry, id)?;
        if let Some(name) = &update.name {
            config.name.clone_from(name);
        }
        if let Some(description) = &update.description {
            config.description.clone_from(description);
        }
        for (key, value) in &update.settings {
            config.settings.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn delete_configuration(&self, org: &str, id: u64) -> Result<()> {
        let mut state = self.enter(Call::Delete, org)?;
        let entry = org_mut(&mut state, org)?;
        configuration_mut(entry, id)?;
        entry.configurations.retain(|c| c.id != id);
        entry.attachments.retain(|(attached, _)| *attached != id);
        if entry.default_configuration == Some(id) {
            entry.default_configuration = None;
        }
        Ok(())
    }

    fn attach_configuration(&self, org: &str, id: u64, scope: AttachScope) -> Result<()> {
        let mut state = self.enter(Call::Attach, org)?;
        let entry = org_mut(&mut state, org)?;
        configuration_mut(entry, id)?;
        entry.attachments.push((id, scope));
        Ok(())
    }

    fn set_default(&self, org: &str, id: u64) -> Result<()> {
        let mut state = self.enter(Call::SetDefault, org)?;
        let entry = org_mut(&mut state, org)?;
        configuration_mut(entry, id)?;
        entry.default_configuration = Some(id);
        Ok(())
    }

    fn enterprise_organizations(&self, enterprise: &str) -> Result<Vec<String>> {
        let state = self.enter(Call::Enterprise, enterprise)?;
        state
            .enterprises
            .get(enterprise)
            .cloned()
            .ok_or_else(|| Error::Other(format!("enterprise '{enterprise}' not found")))
    }
}
