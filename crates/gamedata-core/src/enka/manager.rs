use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info};
use url::Url;

use crate::api::{FetchClient, RequestOptions};
use crate::assets::{AssetResolver, EnkaAssetResolver};
use crate::cache::SnapshotCache;
use crate::clock::{Clock, SystemClock};
use crate::decode::decode;
use crate::error::{Result, Service, ValidationError};
use crate::models::account::{ApiAccount, ApiAccounts, ApiBuilds};
use crate::models::enka::ApiEnkaData;
use crate::models::{EnkaAccount, EnkaBuild, EnkaData};
use crate::sync::{Event, EventEmitter, ListenerId};

use super::uid::{validate_hash, validate_uid, validate_username};

/// Lower bound for how long a showcase stays cached.
/// Enka.Network asks clients not to refetch a UID before its `ttl` elapses.
const DEFAULT_MIN_TTL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct EnkaOptions {
    /// Entries are cached for the server `ttl`, but never less than this.
    pub min_ttl: Duration,
}

impl Default for EnkaOptions {
    fn default() -> Self {
        Self {
            min_ttl: Duration::from_secs(DEFAULT_MIN_TTL_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnkaEventKind {
    GetNewEnkaData,
}

impl fmt::Display for EnkaEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnkaEventKind::GetNewEnkaData => write!(f, "GET_NEW_ENKA_DATA"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum EnkaEvent {
    /// A UID snapshot was fetched from the network (never sent on cache hits).
    GetNewEnkaData(Arc<EnkaData>),
}

impl Event for EnkaEvent {
    type Kind = EnkaEventKind;

    fn kind(&self) -> EnkaEventKind {
        match self {
            EnkaEvent::GetNewEnkaData(_) => EnkaEventKind::GetNewEnkaData,
        }
    }
}

/// UID-scoped showcase feed backed by a TTL cache.
pub struct EnkaManager {
    client: FetchClient,
    options: EnkaOptions,
    clock: Arc<dyn Clock>,
    cache: Mutex<SnapshotCache<u64, Arc<EnkaData>>>,
    events: EventEmitter<EnkaEvent>,
    assets: Arc<dyn AssetResolver>,
}

impl EnkaManager {
    pub fn new(client: FetchClient) -> Self {
        Self::with_options(client, EnkaOptions::default())
    }

    pub fn with_options(client: FetchClient, options: EnkaOptions) -> Self {
        Self::with_clock(client, options, Arc::new(SystemClock))
    }

    pub fn with_clock(client: FetchClient, options: EnkaOptions, clock: Arc<dyn Clock>) -> Self {
        let assets = Arc::new(EnkaAssetResolver::new(client.config().enka_base_url.clone()));
        Self {
            client,
            options,
            cache: Mutex::new(SnapshotCache::with_clock(Arc::clone(&clock))),
            clock,
            events: EventEmitter::new(),
            assets,
        }
    }

    /// Replace the resolver used by [`asset_url`](Self::asset_url).
    pub fn with_assets(mut self, assets: Arc<dyn AssetResolver>) -> Self {
        self.assets = assets;
        self
    }

    pub fn on<F>(&self, kind: EnkaEventKind, handler: F) -> ListenerId
    where
        F: Fn(&EnkaEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, handler)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    /// Fetch the showcase for `uid`, serving a fresh cached snapshot when
    /// there is one.
    pub async fn fetch_all(&self, uid: u64, options: &RequestOptions) -> Result<Arc<EnkaData>> {
        let uid = validate_uid(uid)?;

        {
            let mut cache = self.lock_cache();
            cache.evict_expired();
            if let Some(cached) = cache.get(&uid) {
                debug!(uid = uid, "Serving showcase from cache");
                return Ok(Arc::clone(cached));
            }
        }

        let url = self.enka_url(&format!("api/uid/{}/", uid))?;
        let body = self.client.request(Service::Enka, url, options).await?;
        let api: ApiEnkaData = decode(&body)?;

        if let Some(ref reported) = api.uid {
            if reported != &uid.to_string() {
                return Err(ValidationError::new(
                    "$.uid",
                    format!("string {:?}", uid.to_string()),
                    format!("string {:?}", reported),
                )
                .into());
            }
        }

        let server_ttl = Duration::from_secs(api.ttl.unwrap_or(0));
        let ttl = server_ttl.max(self.options.min_ttl);
        let data = Arc::new(api.into_enka_data(uid, ttl.as_secs(), self.clock.now())?);

        self.lock_cache().put(uid, Arc::clone(&data), ttl);
        info!(uid = uid, ttl_secs = ttl.as_secs(), characters = data.characters.len(), "Fetched new showcase");

        self.events.emit(&EnkaEvent::GetNewEnkaData(Arc::clone(&data)));
        Ok(data)
    }

    /// Fresh cached snapshot for `uid`, without touching the network.
    pub fn cached(&self, uid: u64) -> Option<Arc<EnkaData>> {
        self.lock_cache().get(&uid).cloned()
    }

    pub fn has_cached(&self, uid: u64) -> bool {
        self.lock_cache().has(&uid)
    }

    /// Drop every snapshot past its next-showcase time.
    pub fn evict_expired(&self) -> usize {
        self.lock_cache().evict_expired()
    }

    pub fn invalidate(&self, uid: u64) -> bool {
        self.lock_cache().invalidate(&uid).is_some()
    }

    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    /// Game accounts linked to an Enka.Network profile, in profile order.
    pub async fn fetch_accounts(
        &self,
        username: &str,
        options: &RequestOptions,
    ) -> Result<Vec<EnkaAccount>> {
        let username = validate_username(username)?;
        let url = self.enka_url(&format!("api/profile/{}/hoyos/", username))?;
        let accounts: ApiAccounts = self.client.get_decoded(Service::Enka, url, options).await?;

        let mut accounts: Vec<EnkaAccount> = accounts
            .0
            .into_values()
            .map(ApiAccount::into_account)
            .collect();
        accounts.sort_by_key(|a| a.order);
        debug!(username = username, count = accounts.len(), "Fetched profile accounts");
        Ok(accounts)
    }

    pub async fn fetch_account(
        &self,
        username: &str,
        hash: &str,
        options: &RequestOptions,
    ) -> Result<EnkaAccount> {
        let username = validate_username(username)?;
        let hash = validate_hash(hash)?;
        let url = self.enka_url(&format!("api/profile/{}/hoyos/{}/", username, hash))?;
        let account: ApiAccount = self.client.get_decoded(Service::Enka, url, options).await?;
        Ok(account.into_account())
    }

    /// Saved builds for one account, ordered by character then display order.
    pub async fn fetch_builds(
        &self,
        username: &str,
        hash: &str,
        options: &RequestOptions,
    ) -> Result<Vec<EnkaBuild>> {
        let username = validate_username(username)?;
        let hash = validate_hash(hash)?;
        let url = self.enka_url(&format!("api/profile/{}/hoyos/{}/builds/", username, hash))?;
        let builds: ApiBuilds = self.client.get_decoded(Service::Enka, url, options).await?;
        Ok(builds.into_builds()?)
    }

    pub fn asset_url(&self, name: &str) -> Option<Url> {
        self.assets.resolve(name)
    }

    fn enka_url(&self, path: &str) -> Result<Url> {
        self.client
            .config()
            .enka_base_url
            .join(path)
            .map_err(|e| ValidationError::new("url", "joinable path", format!("{:?} ({})", path, e)).into())
    }

    fn lock_cache(&self) -> MutexGuard<'_, SnapshotCache<u64, Arc<EnkaData>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ============================================================================
// Tests
// ============================================================================
