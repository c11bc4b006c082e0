//! Per-request authentication state.

use crate::assertion::SignedAssertion;

/// Outcome of validating the request's assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected,
}

impl Verdict {
    pub fn is_accepted(self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

impl From<bool> for Verdict {
    fn from(accepted: bool) -> Self {
        if accepted {
            Verdict::Accepted
        } else {
            Verdict::Rejected
        }
    }
}

/// Where a request is in `Unseen -> Extracted -> Validated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthnState {
    Unseen,
    Extracted,
    Validated(Verdict),
}

/// Authentication state owned by a single request.
///
/// Holds the parsed assertion (written once) and the validation verdict
/// (written once). Intentionally not `Clone`: two requests must never share
/// a context.
#[derive(Debug, Default)]
pub struct RequestAuthnContext {
    assertion: Option<SignedAssertion>,
    verdict: Option<Verdict>,
}

impl RequestAuthnContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AuthnState {
        match (&self.assertion, self.verdict) {
            (_, Some(verdict)) => AuthnState::Validated(verdict),
            (Some(_), None) => AuthnState::Extracted,
            (None, None) => AuthnState::Unseen,
        }
    }

    pub fn assertion(&self) -> Option<&SignedAssertion> {
        self.assertion.as_ref()
    }

    /// Return the cached assertion, or store the one produced by `parse`.
    ///
    /// `parse` only runs when nothing is cached; on error nothing is stored.
    pub fn get_or_try_insert_assertion<F, E>(&mut self, parse: F) -> Result<&SignedAssertion, E>
    where
        F: FnOnce() -> Result<SignedAssertion, E>,
    {
        let assertion = match self.assertion.take() {
            Some(cached) => cached,
            None => parse()?,
        };
        Ok(self.assertion.insert(assertion))
    }

    pub fn verdict(&self) -> Option<Verdict> {
        self.verdict
    }

    /// Record the validation outcome. The first recorded verdict is kept.
    pub fn record_verdict(&mut self, verdict: Verdict) -> Verdict {
        *self.verdict.get_or_insert(verdict)
    }
}
