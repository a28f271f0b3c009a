//! API origin resolution.
//!
//! A client running in a non-local context must never talk to a loopback
//! origin (a leaked dev setting would otherwise silently break it). In that
//! case the known production origin is used instead.

use std::net::IpAddr;

use reqwest::Url;

/// Resolve the origin requests are sent to.
///
/// - empty or unparsable `configured` → `production`
/// - loopback `configured` while `client_origin` is non-local → `production`
/// - otherwise `configured`, without a trailing slash
#[must_use]
pub fn resolve_origin(configured: &str, client_origin: &str, production: &str) -> String {
    let production = production.trim_end_matches('/').to_string();
    let configured = configured.trim();
    if configured.is_empty() {
        return production;
    }

    let Ok(url) = Url::parse(configured) else {
        tracing::warn!(configured, "unparsable API origin; using production");
        return production;
    };

    let client_is_local = client_origin.trim().is_empty() || is_local(client_origin);
    if is_loopback_url(&url) && !client_is_local {
        tracing::warn!(
            configured,
            client_origin,
            "loopback API origin from a non-local client; using production"
        );
        return production;
    }

    configured.trim_end_matches('/').to_string()
}

/// Whether `origin` points at this machine.
#[must_use]
pub fn is_local(origin: &str) -> bool {
    Url::parse(origin.trim()).is_ok_and(|url| is_loopback_url(&url))
}

fn is_loopback_url(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.eq_ignore_ascii_case("localhost") || host.ends_with(".localhost") {
        return true;
    }
    host.parse::<IpAddr>()
        .is_ok_and(|ip| ip.is_loopback() || ip.is_unspecified())
}
