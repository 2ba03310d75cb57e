//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod current_identity;
mod identity_provider;
mod registration_store;

#[cfg(test)]
pub use current_identity::MockCurrentIdentity;
pub use current_identity::{CurrentIdentity, FixedIdentity};
#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{
    FixtureIdentityProvider, FixtureIdentityProviderFactory, IdentityChannel, IdentityProvider,
    IdentityProviderError, IdentityProviderFactory,
};
#[cfg(test)]
pub use registration_store::MockRegistrationStore;
pub use registration_store::{
    FixtureRegistrationStore, RegistrationStore, RegistrationStoreError, StoredEntry,
};
