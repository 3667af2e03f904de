// Credential lifecycle. The store owns the persisted record and walks the
// state machine below whenever someone asks for credentials:
//
//   NoCredential --Loaded(valid)--> Valid
//   NoCredential --Loaded(expired)--> Expired
//   NoCredential --LoadFailed--> Authorizing
//   Authorizing  --Authorized--> Valid
//   Valid        --TokenExpired--> Expired
//   Expired      --Authorized (refreshed)--> Valid
//   Expired      --RefreshRejected--> Authorizing

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{AuthError, Authorizer, CredentialRecord};
use crate::store::KeyValueStore;

pub const CREDENTIALS_KEY: &str = "gcs_credentials.dat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState {
    NoCredential,
    Authorizing,
    Valid(CredentialRecord),
    Expired(CredentialRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialEvent {
    Loaded(CredentialRecord),
    LoadFailed,
    Authorized(CredentialRecord),
    TokenExpired,
    RefreshRejected,
}

impl CredentialState {
    /// Applies `event`. Events that make no sense in the current state leave
    /// it unchanged.
    pub fn on_event(self, event: CredentialEvent, now: DateTime<Utc>) -> CredentialState {
        use CredentialEvent as E;
        use CredentialState as S;
        match (self, event) {
            (S::NoCredential, E::Loaded(record)) if record.is_expired_at(now) => S::Expired(record),
            (S::NoCredential, E::Loaded(record)) => S::Valid(record),
            (S::NoCredential, E::LoadFailed) => S::Authorizing,
            (S::Authorizing, E::Authorized(record)) => S::Valid(record),
            (S::Valid(record), E::TokenExpired) => S::Expired(record),
            (S::Expired(_), E::Authorized(record)) => S::Valid(record),
            (S::Expired(_), E::RefreshRejected) => S::Authorizing,
            (state, event) => {
                debug!(?state, ?event, "ignored credential event");
                state
            }
        }
    }
}

/// Something that can hand out a bearer token for the next request.
pub trait AccessTokenSource {
    fn access_token(&mut self) -> Result<String, AuthError>;
}

pub struct CredentialStore<S, A> {
    store: S,
    authorizer: A,
    state: CredentialState,
}

impl<S: KeyValueStore, A: Authorizer> CredentialStore<S, A> {
    pub fn new(store: S, authorizer: A) -> Self {
        CredentialStore {
            store,
            authorizer,
            state: CredentialState::NoCredential,
        }
    }

    pub fn state(&self) -> &CredentialState {
        &self.state
    }

    pub fn authorizer(&self) -> &A {
        &self.authorizer
    }

    /// Returns usable credentials, loading, refreshing or authorizing as
    /// needed. Anything newly obtained is persisted before it is returned;
    /// a failed authorization leaves the stored record untouched.
    pub fn get_credentials(&mut self) -> Result<CredentialRecord, AuthError> {
        loop {
            let now = Utc::now();
            if let CredentialState::Valid(record) = &self.state {
                if !record.is_expired_at(now) {
                    return Ok(record.clone());
                }
            }
            let state = std::mem::replace(&mut self.state, CredentialState::NoCredential);
            let outcome = match &state {
                CredentialState::NoCredential => Ok(match self.load() {
                    Some(record) => CredentialEvent::Loaded(record),
                    None => CredentialEvent::LoadFailed,
                }),
                CredentialState::Authorizing => {
                    info!("no valid stored credentials, starting authorization");
                    self.authorizer
                        .authorize()
                        .and_then(|record| self.persist(&record).map(|_| record))
                        .map(CredentialEvent::Authorized)
                }
                CredentialState::Valid(_) => Ok(CredentialEvent::TokenExpired),
                CredentialState::Expired(record) => match self.authorizer.refresh(record) {
                    Ok(refreshed) => {
                        debug!("access token refreshed");
                        self.persist(&refreshed)
                            .map(|_| CredentialEvent::Authorized(refreshed))
                    }
                    Err(e) if e.is_revoked() => {
                        warn!(error = %e, "stored credentials were rejected");
                        Ok(CredentialEvent::RefreshRejected)
                    }
                    Err(e) => Err(e),
                },
            };
            match outcome {
                Ok(event) => self.state = state.on_event(event, now),
                Err(e) => {
                    // A failed authorization starts over on the next call; a
                    // failed refresh keeps the expired record around.
                    self.state = match state {
                        CredentialState::Authorizing => CredentialState::NoCredential,
                        other => other,
                    };
                    return Err(e);
                }
            }
            // A freshly obtained record is handed out even if the server
            // issued it with an expiry inside the skew window.
            if let CredentialState::Valid(record) = &self.state {
                return Ok(record.clone());
            }
        }
    }

    fn load(&self) -> Option<CredentialRecord> {
        let bytes = match self.store.load(CREDENTIALS_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("no stored credentials");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "stored credentials could not be read");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "stored credentials are corrupt, ignoring them");
                None
            }
        }
    }

    fn persist(&self, record: &CredentialRecord) -> Result<(), AuthError> {
        let data = serde_json::to_vec_pretty(record).map_err(AuthError::Encode)?;
        self.store.save(CREDENTIALS_KEY, &data)?;
        Ok(())
    }
}

impl<S: KeyValueStore, A: Authorizer> AccessTokenSource for CredentialStore<S, A> {
    fn access_token(&mut self) -> Result<String, AuthError> {
        self.get_credentials().map(|record| record.access_token)
    }
}
