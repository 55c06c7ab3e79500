//! The resolution pipeline: repo lookup, cached release resolution, filtering.

use installer_schema::{Query, ResolvedRelease};
use reqwest::Client;
use tracing::info;

use crate::cache::ResultCache;
use crate::error::Result;
use crate::provider::{self, ProviderEndpoints, ReleaseProvider};
use crate::resolver;
use crate::router::Route;

/// Owns the HTTP client and the result cache shared by all requests.
#[derive(Debug)]
pub struct Installer {
    client: Client,
    endpoints: ProviderEndpoints,
    cache: ResultCache,
}

impl Installer {
    /// Build an installer around a configured `reqwest` client.
    pub fn new(client: Client, endpoints: ProviderEndpoints, cache: ResultCache) -> Self {
        Self {
            client,
            endpoints,
            cache,
        }
    }

    /// The result cache.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Resolve a routed request with the client its provider calls for.
    ///
    /// # Errors
    ///
    /// Any routing, upstream or filtering error.
    pub async fn install(&self, route: Route) -> Result<ResolvedRelease> {
        let provider = provider::connect(route.provider, &self.endpoints, self.client.clone())?;
        self.resolve_with(provider.as_ref(), route.query).await
    }

    /// Look up repo visibility, then resolve through the cache.
    ///
    /// Visibility is part of the cache key, so the repo lookup always hits
    /// the provider.
    ///
    /// # Errors
    ///
    /// Any upstream or filtering error.
    pub async fn resolve_with(
        &self,
        provider: &dyn ReleaseProvider,
        mut query: Query,
    ) -> Result<ResolvedRelease> {
        let repo = provider
            .get_repo(&query.user, &query.program, &query.token)
            .await?;
        query.private = repo.private;

        let q = &query;
        let cache = &self.cache;
        cache
            .get_or_resolve(q, move || async move {
                let timestamp = cache.now();
                let release = provider
                    .get_release_assets(&q.user, &q.program, &q.release, &q.token)
                    .await?;
                if q.wants_latest() {
                    info!("detected release: {}", release.version);
                }
                let assets = resolver::filter_assets(release.assets, q)?;
                Ok(ResolvedRelease::new(
                    q.clone(),
                    timestamp,
                    release.version,
                    assets,
                ))
            })
            .await
    }
}
