//! The four target operations run by the batch engine
//!
//! Each operation holds a shared API handle plus the parameters of one
//! command, and applies them to a single organization. Every operation
//! first checks that the authenticated user owns the organization.

mod apply;
mod delete;
mod generate;
mod modify;

pub use apply::Apply;
pub use delete::Delete;
pub use generate::Generate;
pub use modify::Modify;

use anyhow::anyhow;
use batchkit::{OperationError, Outcome};
use codesec::{CodeSecurityApi, ErrorCategory, Membership, find_by_name};

/// Map an API error to the category the batch engine counts it by
pub fn classify(err: codesec::Error, action: &str) -> OperationError {
    let category = err.category();
    let err = anyhow!(err).context(action.to_string());
    match category {
        ErrorCategory::Conflict => OperationError::skip_equivalent(err),
        ErrorCategory::Unavailable => OperationError::fatal(err),
        _ => OperationError::ordinary(err),
    }
}

/// Skip reason when the user cannot manage `org`, or `None` if they can
pub fn ownership_skip(api: &dyn CodeSecurityApi, org: &str) -> Option<Outcome> {
    match api.membership(org) {
        Ok(Membership::Owner) => None,
        Ok(Membership::NotMember) => Some(Outcome::skipped("not a member")),
        Ok(Membership::Member { role }) => {
            Some(Outcome::skipped(format!("not an owner (role: {role})")))
        }
        Err(e) => {
            log::debug!("Membership lookup for {org} failed: {e}");
            Some(Outcome::skipped("membership could not be checked"))
        }
    }
}

/// Id of the configuration called `name` in `org`
fn lookup(api: &dyn CodeSecurityApi, org: &str, name: &str) -> Result<Option<u64>, OperationError> {
    let configs = api
        .list_configurations(org)
        .map_err(|e| classify(e, "Failed to list configurations"))?;
    Ok(find_by_name(&configs, name))
}
