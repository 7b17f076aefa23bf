//! Payment-return reference resolution.
//!
//! After paying on the external payment page the customer is sent back to
//! the gateway with an opaque order reference (e.g. "Self-Order
//! 00003-001-0048-3"). This module decides where to send them next: a
//! self-order config is looked up and the redirect carries its access
//! token so the ordering session resumes without re-authentication.
//!
//! Resolution is best-effort by design. The reference format does not
//! reliably encode a config id, so the lookup is mode-filtered rather than
//! token-keyed, and every input degrades to *some* navigable URL.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::db;
use crate::models::OrderingMode;
use crate::store::{SelfOrderStore, StoreError};

/// Fallback config id when no self-service config exists at all.
pub const DEFAULT_FALLBACK_CONFIG_ID: i64 = 1;

/// Base path of the self-ordering frontend.
pub const DEFAULT_REDIRECT_BASE: &str = "/pos-self";

static REFERENCE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn reference_pattern() -> &'static Regex {
    REFERENCE_PATTERN.get_or_init(|| {
        Regex::new(r"(\d+)-(\d+)-(\d+)").expect("reference pattern is valid")
    })
}

/// Extract the candidate numeric token from a payment reference: the first
/// group of the first `digits-digits-digits` run anywhere in the string.
///
/// The token is advisory context only; it does not key the config lookup.
pub fn extract_reference_token(reference: &str) -> Option<i64> {
    reference_pattern()
        .captures(reference)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

/// Where the customer gets redirected.
#[derive(Debug, Clone, PartialEq)]
pub struct RedirectTarget {
    pub config_id: i64,
    pub access_token: Option<String>,
    /// Fully-built Location header value.
    pub location: String,
}

/// Maps a payment-confirmation reference to a redirect target.
pub struct ReferenceResolver {
    redirect_base: String,
    fallback_config_id: i64,
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::new(DEFAULT_REDIRECT_BASE, DEFAULT_FALLBACK_CONFIG_ID)
    }
}

impl ReferenceResolver {
    pub fn new(redirect_base: impl Into<String>, fallback_config_id: i64) -> Self {
        let mut redirect_base = redirect_base.into();
        while redirect_base.ends_with('/') {
            redirect_base.pop();
        }
        Self {
            redirect_base,
            fallback_config_id,
        }
    }

    /// Build a resolver from deployment settings, falling back to defaults
    /// for anything unset.
    pub fn from_settings(conn: &rusqlite::Connection) -> Self {
        let base = db::get_setting(conn, "resolver", "redirect_base")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_REDIRECT_BASE.to_string());
        let fallback = db::get_setting(conn, "resolver", "fallback_config_id")
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_FALLBACK_CONFIG_ID);
        Self::new(base, fallback)
    }

    /// Resolve a payment reference to a redirect target.
    ///
    /// Picks the first self-service config (mobile or kiosk, lowest id).
    /// With a usable access token the customer lands back in their
    /// session; without one they land on the public products page. When no
    /// config exists at all, the fallback id is used. Only a store read
    /// failure propagates as an error.
    pub fn resolve(
        &self,
        reference: Option<&str>,
        store: &dyn SelfOrderStore,
    ) -> Result<RedirectTarget, StoreError> {
        if let Some(token) = reference.and_then(extract_reference_token) {
            debug!(token, "payment reference carries an order token");
        }

        let config = store
            .list_configs(&[OrderingMode::Mobile, OrderingMode::Kiosk])?
            .into_iter()
            .next();

        let target = match config {
            Some(config) => {
                let token = config.access_token.trim();
                if token.is_empty() {
                    self.products_target(config.id)
                } else {
                    RedirectTarget {
                        config_id: config.id,
                        access_token: Some(token.to_string()),
                        location: format!(
                            "{}/{}?access_token={}",
                            self.redirect_base, config.id, token
                        ),
                    }
                }
            }
            None => self.products_target(self.fallback_config_id),
        };

        debug!(
            config_id = target.config_id,
            has_token = target.access_token.is_some(),
            location = %target.location,
            "resolved payment-return redirect"
        );
        Ok(target)
    }

    fn products_target(&self, config_id: i64) -> RedirectTarget {
        RedirectTarget {
            config_id,
            access_token: None,
            location: format!("{}/{}/products", self.redirect_base, config_id),
        }
    }
}
