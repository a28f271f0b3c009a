use alm_config::AuthConfig;

use crate::error::AuthError;
use crate::providers::{
    CookieExchangeProvider, RefreshProvider, SessionProvider, StaticProvider, TokenProvider,
    TokenSource,
};

/// A bearer token together with the source that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub token: String,
    pub source: TokenSource,
}

/// Ordered list of token sources, tried first to last.
pub struct CredentialChain {
    providers: Vec<Box<dyn TokenProvider>>,
}

impl CredentialChain {
    #[must_use]
    pub fn new(providers: Vec<Box<dyn TokenProvider>>) -> Self {
        Self { providers }
    }

    /// Build the standard chain: session → refresh → cookie exchange → test bridge.
    ///
    /// Sources that are not configured are left out. `origin` is the resolved
    /// API origin the cookie exchange path is joined to.
    #[must_use]
    pub fn from_config(config: &AuthConfig, origin: &str, http: &reqwest::Client) -> Self {
        let mut providers: Vec<Box<dyn TokenProvider>> = vec![Box::new(SessionProvider)];

        if config.can_refresh() {
            providers.push(Box::new(RefreshProvider::new(
                http.clone(),
                &config.refresh_url,
                &config.refresh_token,
            )));
        }
        if config.can_exchange_cookie() {
            let url = format!(
                "{}{}",
                origin.trim_end_matches('/'),
                config.cookie_exchange_path
            );
            providers.push(Box::new(CookieExchangeProvider::new(
                http.clone(),
                url,
                &config.session_cookie,
            )));
        }
        if let Some(bridge) = config.test_bridge() {
            providers.push(Box::new(StaticProvider::new(TokenSource::TestBridge, bridge)));
        }

        Self::new(providers)
    }

    /// Sources in resolution order.
    #[must_use]
    pub fn sources(&self) -> Vec<TokenSource> {
        self.providers.iter().map(|p| p.source()).collect()
    }

    /// Resolve the first available bearer token.
    ///
    /// Individual source failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] if every source comes up empty.
    pub async fn resolve(&self) -> Result<ResolvedToken, AuthError> {
        for provider in &self.providers {
            let source = provider.source();
            match provider.token().await {
                Ok(Some(token)) => {
                    tracing::debug!(%source, "resolved bearer token");
                    return Ok(ResolvedToken { token, source });
                }
                Ok(None) => tracing::debug!(%source, "token source empty"),
                Err(error) => tracing::warn!(%source, %error, "token source failed"),
            }
        }
        Err(AuthError::NotAuthenticated)
    }
}

impl std::fmt::Debug for CredentialChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialChain")
            .field("sources", &self.sources())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Failing;

    #[async_trait]
    impl TokenProvider for Failing {
        fn source(&self) -> TokenSource {
            TokenSource::Refresh
        }

        async fn token(&self) -> Result<Option<String>, AuthError> {
            Err(AuthError::Other("boom".into()))
        }
    }

    #[tokio::test]
    async fn failure_falls_through_to_next_source() {
        let chain = CredentialChain::new(vec![
            Box::new(Failing),
            Box::new(StaticProvider::new(TokenSource::TestBridge, "bridge")),
        ]);
        let resolved = chain.resolve().await.unwrap();
        assert_eq!(resolved.source, TokenSource::TestBridge);
        assert_eq!(resolved.token, "bridge");
    }

    #[tokio::test]
    async fn empty_chain_is_unauthenticated() {
        let chain = CredentialChain::new(Vec::new());
        assert!(matches!(
            chain.resolve().await,
            Err(AuthError::NotAuthenticated)
        ));
    }

    #[test]
    fn from_config_orders_sources() {
        let config = AuthConfig {
            refresh_token: "rt".into(),
            refresh_url: "https://auth.example/token".into(),
            session_cookie: "sid=1".into(),
            test_mode: true,
            test_bridge_token: "bridge".into(),
            ..Default::default()
        };
        let chain = CredentialChain::from_config(&config, "https://api.example", &reqwest::Client::new());
        assert_eq!(
            chain.sources(),
            vec![
                TokenSource::Session,
                TokenSource::Refresh,
                TokenSource::CookieExchange,
                TokenSource::TestBridge,
            ]
        );
    }

    #[test]
    fn from_config_skips_unconfigured_sources() {
        let chain = CredentialChain::from_config(
            &AuthConfig::default(),
            "https://api.example",
            &reqwest::Client::new(),
        );
        assert_eq!(chain.sources(), vec![TokenSource::Session]);
    }
}
