//! Collaborator seam for the authenticated business identity.
//!
//! Settlement stamps the business's own sender/receiver block from this
//! provider, never from client input, so a request body cannot spoof the
//! issuing business. The shipped implementation reads the profile from
//! configuration; tests substitute a fixture.

use crate::config::BusinessProfile;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity block occupying one side of an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BusinessIdentity {
    pub name: String,
    pub address: String,
    pub gstin: String,
    pub contact: String,
}

impl From<&BusinessProfile> for BusinessIdentity {
    fn from(profile: &BusinessProfile) -> Self {
        Self {
            name: profile.name.clone(),
            address: profile.address.clone(),
            gstin: profile.gstin.clone(),
            contact: profile.contact.clone(),
        }
    }
}

/// Supplies the authenticated business's identity for the current request.
pub trait IdentityProvider: Send + Sync + 'static {
    fn business_identity(&self) -> BusinessIdentity;
}

/// Identity provider backed by the static business profile in `AppConfig`.
#[derive(Debug, Clone)]
pub struct ConfigIdentityProvider {
    identity: BusinessIdentity,
}

impl ConfigIdentityProvider {
    pub fn new(profile: &BusinessProfile) -> Self {
        Self {
            identity: BusinessIdentity::from(profile),
        }
    }
}

impl IdentityProvider for ConfigIdentityProvider {
    fn business_identity(&self) -> BusinessIdentity {
        self.identity.clone()
    }
}
