//! URL-prefix-scoped token injection.
//!
//! A client holds an [`AuthRegistry`] of `(prefix, provider)` pairs. When a
//! request URL starts with a registered prefix, the provider is asked for a
//! token which is sent verbatim as the `Authorization` header, unless the
//! caller already set one.
//!
//! Token acquisition itself (grant types, caching, refresh) belongs to the
//! [`TokenProvider`] implementation; this module calls it on every eligible
//! request.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::BoxError;
use crate::transport::BoxFuture;

/// Produces the value of the `Authorization` header for matching requests.
///
/// Implement this trait to plug in an OAuth client, a cached credential
/// store or anything else that can hand out tokens.
pub trait TokenProvider: Send + Sync {
    /// Returns the token to send, e.g. `"Bearer eyJ..."`.
    fn token(&self) -> BoxFuture<'_, Result<String, BoxError>>;
}

impl<T: TokenProvider + ?Sized> TokenProvider for Arc<T> {
    fn token(&self) -> BoxFuture<'_, Result<String, BoxError>> {
        (**self).token()
    }
}

/// [`TokenProvider`] that always returns the same token.
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    /// Creates a provider that returns `token` unchanged.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Creates a provider that returns `Bearer {token}`.
    #[must_use]
    pub fn bearer(token: &str) -> Self {
        Self {
            token: format!("Bearer {token}"),
        }
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken").finish_non_exhaustive()
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> BoxFuture<'_, Result<String, BoxError>> {
        let token = self.token.clone();
        Box::pin(async move { Ok(token) })
    }
}

/// [`TokenProvider`] backed by an async callback.
///
/// The callback runs once per eligible request.
pub struct CallbackTokenProvider<F> {
    callback: F,
}

impl<F> fmt::Debug for CallbackTokenProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackTokenProvider")
            .finish_non_exhaustive()
    }
}

impl<F, Fut> CallbackTokenProvider<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, BoxError>> + Send + 'static,
{
    /// Creates a new provider from a callback returning a token future.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F, Fut> TokenProvider for CallbackTokenProvider<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, BoxError>> + Send + 'static,
{
    fn token(&self) -> BoxFuture<'_, Result<String, BoxError>> {
        Box::pin((self.callback)())
    }
}

/// A registered URL prefix and the provider used for requests under it.
#[derive(Clone)]
pub struct AuthBinding {
    prefix: String,
    provider: Arc<dyn TokenProvider>,
}

impl AuthBinding {
    /// Creates a binding for `prefix`.
    pub fn new(prefix: impl Into<String>, provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            prefix: prefix.into(),
            provider,
        }
    }

    /// The URL prefix this binding applies to.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The provider consulted for matching requests.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn TokenProvider> {
        &self.provider
    }

    fn matches(&self, url: &str) -> bool {
        url.starts_with(&self.prefix)
    }
}

impl fmt::Debug for AuthBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthBinding")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of [`AuthBinding`]s owned by one client.
///
/// Registration appends; nothing is deduplicated or replaced. Lookups pick
/// the longest matching prefix, and among prefixes of equal length the one
/// registered last.
#[derive(Debug, Default)]
pub struct AuthRegistry {
    bindings: RwLock<Vec<AuthBinding>>,
}

impl AuthRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a binding.
    pub fn register(&self, binding: AuthBinding) {
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(binding);
    }

    /// Number of registered bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds the binding that applies to `url`, if any.
    ///
    /// The returned binding is a clone so no lock is held while the
    /// provider is awaited.
    #[must_use]
    pub fn resolve(&self, url: &str) -> Option<AuthBinding> {
        let bindings = self
            .bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        // max_by_key yields the last of equally long prefixes, i.e. the newest.
        bindings
            .iter()
            .filter(|binding| binding.matches(url))
            .max_by_key(|binding| binding.prefix.len())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn token_of(binding: &AuthBinding) -> String {
        binding.provider().token().await.unwrap()
    }

    fn registry(entries: &[(&str, &str)]) -> AuthRegistry {
        let registry = AuthRegistry::new();
        for (prefix, token) in entries {
            registry.register(AuthBinding::new(*prefix, Arc::new(StaticToken::new(*token))));
        }
        registry
    }

    #[test]
    fn test_resolve_matches_full_url_prefix() {
        let registry = registry(&[("http://api.example.com/authed/", "t")]);

        assert!(registry.resolve("http://api.example.com/authed/").is_some());
        assert!(registry.resolve("http://api.example.com/authed/subpath").is_some());
        assert!(registry.resolve("http://example.com/").is_none());
        assert!(registry.resolve("http://api.example.com/").is_none());
        assert!(registry.resolve("http://api.example.com/non-authed").is_none());
        assert!(registry.resolve("https://api.example.com/authed/").is_none());
    }

    #[tokio::test]
    async fn test_resolve_prefers_longest_prefix() {
        let registry = registry(&[
            ("http://api.example.com/authed/deep/", "deep"),
            ("http://api.example.com/", "root"),
            ("http://api.example.com/authed/", "authed"),
        ]);

        let binding = registry
            .resolve("http://api.example.com/authed/deep/x")
            .unwrap();
        assert_eq!(token_of(&binding).await, "deep");

        let binding = registry.resolve("http://api.example.com/authed/x").unwrap();
        assert_eq!(token_of(&binding).await, "authed");

        let binding = registry.resolve("http://api.example.com/other").unwrap();
        assert_eq!(token_of(&binding).await, "root");
    }

    #[tokio::test]
    async fn test_resolve_tie_goes_to_latest_registration() {
        let registry = registry(&[
            ("http://api.example.com/", "first"),
            ("http://api.example.com/", "second"),
        ]);
        assert_eq!(registry.len(), 2);

        let binding = registry.resolve("http://api.example.com/x").unwrap();
        assert_eq!(token_of(&binding).await, "second");

        registry.register(AuthBinding::new(
            "http://api.example.com/",
            Arc::new(StaticToken::new("third")),
        ));
        let binding = registry.resolve("http://api.example.com/x").unwrap();
        assert_eq!(token_of(&binding).await, "third");
    }

    #[test]
    fn test_empty_registry_resolves_nothing() {
        let registry = AuthRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.resolve("http://example.com/").is_none());
    }

    #[tokio::test]
    async fn test_static_token_bearer_prefix() {
        let provider = StaticToken::bearer("abc");
        assert_eq!(provider.token().await.unwrap(), "Bearer abc");
        assert!(!format!("{provider:?}").contains("abc"));
    }

    #[tokio::test]
    async fn test_callback_provider_runs_each_call() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let provider = CallbackTokenProvider::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, BoxError>(format!("token-{n}")) }
        });

        assert_eq!(provider.token().await.unwrap(), "token-0");
        assert_eq!(provider.token().await.unwrap(), "token-1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
