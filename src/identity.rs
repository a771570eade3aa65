//! Patient sign-in and profile completion
//!
//! The backend identifies patients by an opaque identity string obtained by
//! exchanging a Google ID token. The identity and email are cached locally so
//! later runs can skip the exchange.

use crate::backend::{AccountService, BackendError, SignupProfile};
use crate::db::{LocalStore, StoreError, KEY_PROFILE_COMPLETE, KEY_USER_EMAIL, KEY_USER_IDENTITY};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("No identity token provided")]
    MissingToken,
    #[error("Not signed in")]
    NotSignedIn,
    #[error("Sign-in failed: {0}")]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a successful token exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignIn {
    /// Profile already on file
    Existing(String),
    /// Identity issued, profile still to be completed
    NeedsSignup(String),
}

impl SignIn {
    pub fn identity(&self) -> &str {
        match self {
            SignIn::Existing(identity) | SignIn::NeedsSignup(identity) => identity,
        }
    }
}

pub struct IdentityManager<A> {
    accounts: A,
    store: LocalStore,
}

impl<A: AccountService> IdentityManager<A> {
    pub fn new(accounts: A, store: LocalStore) -> Self {
        Self { accounts, store }
    }

    pub async fn sign_in(&self, id_token: &str, email: &str) -> Result<SignIn, IdentityError> {
        let id_token = id_token.trim();
        if id_token.is_empty() {
            return Err(IdentityError::MissingToken);
        }

        let patient = self.accounts.exchange_id_token(id_token).await?;
        self.store.set(KEY_USER_IDENTITY, &patient.identity)?;
        self.store.set(KEY_USER_EMAIL, email.trim())?;
        self.store.set(KEY_PROFILE_COMPLETE, &patient.exists)?;

        tracing::info!(identity = %patient.identity, exists = patient.exists, "Signed in");
        Ok(if patient.exists {
            SignIn::Existing(patient.identity)
        } else {
            SignIn::NeedsSignup(patient.identity)
        })
    }

    /// Submit the patient profile for the cached identity
    pub async fn complete_signup(&self, profile: SignupProfile) -> Result<(), IdentityError> {
        if self.current().is_none() {
            return Err(IdentityError::NotSignedIn);
        }

        let profile = profile.normalized();
        self.accounts.complete_signup(&profile).await?;
        self.store.set(KEY_PROFILE_COMPLETE, &true)?;
        tracing::info!(mail = %profile.mail, "Signup completed");
        Ok(())
    }

    /// Cached identity, if any
    pub fn current(&self) -> Option<String> {
        self.store
            .get::<Option<String>>(KEY_USER_IDENTITY, None)
            .filter(|identity| !identity.is_empty())
    }

    pub fn email(&self) -> Option<String> {
        self.store.get::<Option<String>>(KEY_USER_EMAIL, None)
    }

    pub fn profile_complete(&self) -> bool {
        self.store.get(KEY_PROFILE_COMPLETE, false)
    }

    pub fn sign_out(&self) -> Result<(), IdentityError> {
        for key in [KEY_USER_IDENTITY, KEY_USER_EMAIL, KEY_PROFILE_COMPLETE] {
            self.store.remove(key)?;
        }
        tracing::info!("Signed out");
        Ok(())
    }
}
