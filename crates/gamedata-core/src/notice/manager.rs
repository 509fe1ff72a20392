use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::api::{FetchClient, RequestOptions};
use crate::decode::Decode;
use crate::error::{Result, Service, ValidationError};
use crate::models::notice::{build_notices, ApiAnnContentData, ApiAnnListData, ApiEnvelope};
use crate::models::Notice;
use crate::sync::{detect_changes, ChangeSet, Event, EventEmitter, ListenerId, TrackedCollection};

use super::Language;

/// Shortest accepted refresh interval, in milliseconds.
pub const MIN_UPDATE_INTERVAL_MS: u128 = 60_000;

/// Longest accepted refresh interval, in milliseconds (a signed 32-bit timer).
pub const MAX_UPDATE_INTERVAL_MS: u128 = 2_147_483_647;

const ANN_CONTENT_ENDPOINT: &str = "getAnnContent";
const ANN_LIST_ENDPOINT: &str = "getAnnList";

/// Fixed query parameters sent with every announcement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeUrlParams {
    pub region: String,
    pub level: u32,
    pub uid: u64,
}

impl Default for NoticeUrlParams {
    fn default() -> Self {
        Self {
            region: "os_asia".to_string(),
            level: 55,
            uid: 100000000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NoticeOptions {
    /// Feed language. `None` uses the client's configured language.
    pub language: Option<Language>,
    /// `None` or zero disables the refresh loop.
    pub update_interval: Option<Duration>,
    pub url_params: NoticeUrlParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeEventKind {
    AddNotice,
    RemoveNotice,
}

impl fmt::Display for NoticeEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeEventKind::AddNotice => write!(f, "ADD_NOTICE"),
            NoticeEventKind::RemoveNotice => write!(f, "REMOVE_NOTICE"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum NoticeEvent {
    AddNotice(Notice),
    RemoveNotice(Notice),
}

impl NoticeEvent {
    pub fn notice(&self) -> &Notice {
        match self {
            NoticeEvent::AddNotice(notice) | NoticeEvent::RemoveNotice(notice) => notice,
        }
    }
}

impl Event for NoticeEvent {
    type Kind = NoticeEventKind;

    fn kind(&self) -> NoticeEventKind {
        match self {
            NoticeEvent::AddNotice(_) => NoticeEventKind::AddNotice,
            NoticeEvent::RemoveNotice(_) => NoticeEventKind::RemoveNotice,
        }
    }
}

/// Check a refresh interval. Zero means "no scheduled refresh".
pub fn validate_update_interval(
    interval: Option<Duration>,
) -> Result<Option<Duration>, ValidationError> {
    match interval {
        None => Ok(None),
        Some(interval) if interval.is_zero() => Ok(None),
        Some(interval) => {
            let millis = interval.as_millis();
            if (MIN_UPDATE_INTERVAL_MS..=MAX_UPDATE_INTERVAL_MS).contains(&millis) {
                Ok(Some(interval))
            } else {
                Err(ValidationError::new(
                    "update_interval",
                    format!(
                        "between {} and {} milliseconds",
                        MIN_UPDATE_INTERVAL_MS, MAX_UPDATE_INTERVAL_MS
                    ),
                    format!("{} milliseconds", millis),
                ))
            }
        }
    }
}

/// Announcement feed. Tracks the notices seen on the last successful
/// update and reports additions and removals.
pub struct NoticeManager {
    client: FetchClient,
    language: Language,
    update_interval: Option<Duration>,
    url_params: NoticeUrlParams,
    notices: RwLock<TrackedCollection<u64, Notice>>,
    /// Held from the first request until events are emitted.
    update_lock: tokio::sync::Mutex<()>,
    events: EventEmitter<NoticeEvent>,
}

impl NoticeManager {
    pub fn new(client: FetchClient, options: NoticeOptions) -> Result<Self> {
        let update_interval = validate_update_interval(options.update_interval)?;
        let language = options.language.unwrap_or(client.config().language);

        Ok(Self {
            client,
            language,
            update_interval,
            url_params: options.url_params,
            notices: RwLock::new(TrackedCollection::new()),
            update_lock: tokio::sync::Mutex::new(()),
            events: EventEmitter::new(),
        })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn update_interval(&self) -> Option<Duration> {
        self.update_interval
    }

    pub fn on<F>(&self, kind: NoticeEventKind, handler: F) -> ListenerId
    where
        F: Fn(&NoticeEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, handler)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub async fn update(&self) -> Result<ChangeSet<Notice>> {
        self.update_with(&RequestOptions::new()).await
    }

    /// Fetch the feed, diff it against the last known notices, commit and
    /// emit. On any error nothing is committed and nothing is emitted.
    pub async fn update_with(&self, options: &RequestOptions) -> Result<ChangeSet<Notice>> {
        let _guard = self.update_lock.lock().await;

        let content_url = self.notice_url(ANN_CONTENT_ENDPOINT, self.language)?;
        let list_url = self.notice_url(ANN_LIST_ENDPOINT, self.language)?;
        let en_url = if self.language == Language::EnUs {
            None
        } else {
            Some(self.notice_url(ANN_CONTENT_ENDPOINT, Language::EnUs)?)
        };

        let (contents, en_contents, list) = futures::try_join!(
            self.fetch::<ApiAnnContentData>(content_url, options),
            async {
                match en_url {
                    Some(url) => self.fetch::<ApiAnnContentData>(url, options).await.map(Some),
                    None => Ok(None),
                }
            },
            self.fetch::<ApiAnnListData>(list_url, options),
        )?;

        let notices = build_notices(&list, &contents, en_contents.as_ref())?;
        let next = TrackedCollection::from_items(notices, |notice| notice.id);

        let changes = {
            let mut current = self.notices.write().unwrap_or_else(|e| e.into_inner());
            let changes = detect_changes(&current, &next);
            *current = next;
            changes
        };

        info!(
            language = %self.language,
            added = changes.added.len(),
            removed = changes.removed.len(),
            "Updated notices"
        );

        for notice in &changes.added {
            self.events.emit(&NoticeEvent::AddNotice(notice.clone()));
        }
        for notice in &changes.removed {
            self.events.emit(&NoticeEvent::RemoveNotice(notice.clone()));
        }

        Ok(changes)
    }

    /// Notices known after the last successful update, by id.
    pub fn notices(&self) -> Vec<Notice> {
        self.read_notices().values().cloned().collect()
    }

    pub fn notice(&self, id: u64) -> Option<Notice> {
        self.read_notices().get(&id).cloned()
    }

    pub fn has(&self, id: u64) -> bool {
        self.read_notices().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.read_notices().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_notices().is_empty()
    }

    /// Run `update` every `update_interval` on the tokio runtime. Returns
    /// `None` when no interval is configured. Failed updates are logged and
    /// leave the previous notices in place.
    pub fn spawn_refresh(self: Arc<Self>) -> Option<JoinHandle<()>> {
        let interval = self.update_interval?;

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match self.update().await {
                    Ok(changes) => debug!(changed = changes.len(), "Scheduled notice update finished"),
                    Err(e) => warn!(error = %e, "Scheduled notice update failed"),
                }
            }
        }))
    }

    pub(crate) fn notice_url(&self, endpoint: &str, language: Language) -> Result<Url> {
        let mut url = self
            .client
            .config()
            .notice_base_url
            .join(endpoint)
            .map_err(|e| ValidationError::new("url", "joinable path", format!("{:?} ({})", endpoint, e)))?;

        url.query_pairs_mut()
            .append_pair("game", "hk4e")
            .append_pair("game_biz", "hk4e_global")
            .append_pair("bundle_id", "hk4e_global")
            .append_pair("platform", "pc")
            .append_pair("region", &self.url_params.region)
            .append_pair("level", &self.url_params.level.to_string())
            .append_pair("uid", &self.url_params.uid.to_string())
            .append_pair("lang", language.as_tag());
        Ok(url)
    }

    async fn fetch<T: Decode>(&self, url: Url, options: &RequestOptions) -> Result<T> {
        let envelope: ApiEnvelope<T> = self.client.get_decoded(Service::Notice, url, options).await?;
        envelope.into_data()
    }

    fn read_notices(&self) -> RwLockReadGuard<'_, TrackedCollection<u64, Notice>> {
        self.notices.read().unwrap_or_else(|e| e.into_inner())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::Error;
    use crate::models::notice::fixtures::{ann_content, ann_list};
    use crate::api::{HttpRequest, HttpResponse, Transport};
    use crate::error::BoxError;
    use crate::testing::MockTransport;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    struct Harness {
        mock: MockTransport,
        manager: NoticeManager,
        log: Arc<Mutex<Vec<(NoticeEventKind, u64)>>>,
    }

    impl Harness {
        fn new(language: Language) -> Self {
            let mock = MockTransport::new();
            let client = FetchClient::with_transport(ClientConfig::default(), Arc::new(mock.clone()));
            let manager = NoticeManager::new(
                client,
                NoticeOptions {
                    language: Some(language),
                    ..NoticeOptions::default()
                },
            )
            .unwrap();

            let log = Arc::new(Mutex::new(Vec::new()));
            for kind in [NoticeEventKind::AddNotice, NoticeEventKind::RemoveNotice] {
                let log = Arc::clone(&log);
                manager.on(kind, move |event| {
                    log.lock().unwrap().push((event.kind(), event.notice().id));
                });
            }

            Self { mock, manager, log }
        }

        fn url(&self, endpoint: &str, language: Language) -> String {
            self.manager.notice_url(endpoint, language).unwrap().to_string()
        }

        /// Script the remote feed to list `listed` with content for `detailed`.
        fn serve(&self, listed: &[u64], detailed: &[u64]) {
            let language = self.manager.language();
            self.mock.respond_json(
                &self.url(ANN_LIST_ENDPOINT, language),
                200,
                &ann_list(listed),
            );
            self.mock.respond_json(
                &self.url(ANN_CONTENT_ENDPOINT, language),
                200,
                &ann_content(detailed, "Title"),
            );
            if language != Language::EnUs {
                self.mock.respond_json(
                    &self.url(ANN_CONTENT_ENDPOINT, Language::EnUs),
                    200,
                    &ann_content(detailed, "English"),
                );
            }
        }

        fn events(&self) -> Vec<(NoticeEventKind, u64)> {
            self.log.lock().unwrap().clone()
        }
    }

    /// Answers each URL from a queue of bodies, yielding to the scheduler
    /// before and after the lookup. The last body for a URL repeats.
    #[derive(Clone, Default)]
    struct SequencedTransport {
        routes: Arc<Mutex<HashMap<String, VecDeque<String>>>>,
    }

    impl SequencedTransport {
        fn push(&self, url: &str, body: String) {
            self.routes
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default()
                .push_back(body);
        }
    }

    #[async_trait]
    impl Transport for SequencedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
            tokio::task::yield_now().await;
            let body = {
                let mut routes = self.routes.lock().unwrap();
                let queue = routes
                    .get_mut(request.url.as_str())
                    .ok_or_else(|| format!("no scripted response for {}", request.url))?;
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            };
            tokio::task::yield_now().await;

            let body = body.ok_or("empty response queue")?;
            Ok(HttpResponse {
                status: 200,
                status_text: "OK".to_string(),
                body: body.into_bytes(),
            })
        }
    }

    #[test]
    fn test_update_interval_bounds() {
        let ms = |n: u64| Some(Duration::from_millis(n));
        assert!(validate_update_interval(ms(59_999)).is_err());
        assert!(validate_update_interval(ms(60_000)).is_ok());
        assert!(validate_update_interval(ms(2_147_483_647)).is_ok());
        assert!(validate_update_interval(ms(2_147_483_648)).is_err());

        assert_eq!(validate_update_interval(None).unwrap(), None);
        assert_eq!(validate_update_interval(ms(0)).unwrap(), None);
    }

    #[test]
    fn test_out_of_range_interval_fails_construction() {
        let client = FetchClient::with_transport(ClientConfig::default(), Arc::new(MockTransport::new()));
        let result = NoticeManager::new(
            client,
            NoticeOptions {
                update_interval: Some(Duration::from_millis(59_999)),
                ..NoticeOptions::default()
            },
        );
        match result {
            Err(Error::Validation(e)) => assert_eq!(e.path, "update_interval"),
            Err(other) => panic!("expected validation error, got {other:?}"),
            Ok(_) => panic!("expected validation error"),
        }
    }

    #[test]
    fn test_language_defaults_to_client_config() {
        let config = ClientConfig::default().with_language(Language::JaJp);
        let client = FetchClient::with_transport(config, Arc::new(MockTransport::new()));
        let manager = NoticeManager::new(client, NoticeOptions::default()).unwrap();
        assert_eq!(manager.language(), Language::JaJp);

        let config = ClientConfig::default().with_language(Language::JaJp);
        let client = FetchClient::with_transport(config, Arc::new(MockTransport::new()));
        let manager = NoticeManager::new(
            client,
            NoticeOptions {
                language: Some(Language::EnUs),
                ..NoticeOptions::default()
            },
        )
        .unwrap();
        assert_eq!(manager.language(), Language::EnUs);
    }

    #[test]
    fn test_notice_url_carries_fixed_params() {
        let harness = Harness::new(Language::JaJp);
        assert_eq!(
            harness.url(ANN_LIST_ENDPOINT, Language::JaJp),
            "https://sg-hk4e-api.hoyoverse.com/common/hk4e_global/announcement/api/getAnnList\
             ?game=hk4e&game_biz=hk4e_global&bundle_id=hk4e_global&platform=pc\
             &region=os_asia&level=55&uid=100000000&lang=ja-jp"
        );
    }

    #[tokio::test]
    async fn test_end_to_end_add_and_remove() {
        let harness = Harness::new(Language::EnUs);

        harness.serve(&[1001, 1002], &[1001, 1002]);
        let changes = harness.manager.update().await.unwrap();
        assert_eq!(changes.added.len(), 2);
        assert_eq!(harness.manager.len(), 2);
        assert_eq!(
            harness.events(),
            vec![
                (NoticeEventKind::AddNotice, 1001),
                (NoticeEventKind::AddNotice, 1002)
            ]
        );

        harness.serve(&[1001, 1003], &[1001, 1003]);
        let changes = harness.manager.update().await.unwrap();
        assert_eq!(changes.added.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1003]);
        assert_eq!(changes.removed.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1002]);
        assert_eq!(harness.manager.len(), 2);
        assert!(!harness.manager.has(1002));
        assert!(harness.manager.has(1003));
        assert_eq!(
            harness.events()[2..],
            [
                (NoticeEventKind::AddNotice, 1003),
                (NoticeEventKind::RemoveNotice, 1002)
            ]
        );
    }

    #[tokio::test]
    async fn test_identical_update_emits_nothing() {
        let harness = Harness::new(Language::EnUs);
        harness.serve(&[1001, 1002], &[1001, 1002]);

        harness.manager.update().await.unwrap();
        let changes = harness.manager.update().await.unwrap();
        assert!(changes.is_empty());
        assert_eq!(harness.events().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_content_commits_nothing() {
        let harness = Harness::new(Language::EnUs);
        harness.serve(&[1001, 1002], &[1001]);

        match harness.manager.update().await.unwrap_err() {
            Error::ContentNotFound(e) => assert_eq!(e.key, "1002"),
            other => panic!("expected content not found, got {other:?}"),
        }
        assert!(harness.manager.is_empty());
        assert!(!harness.manager.has(1001));
        assert!(harness.events().is_empty());
    }

    #[tokio::test]
    async fn test_failed_update_preserves_state() {
        let harness = Harness::new(Language::EnUs);
        harness.serve(&[1001, 1002], &[1001, 1002]);
        harness.manager.update().await.unwrap();
        let before = harness.manager.notices();

        // Network failure on the list
        harness.mock.respond_json(&harness.url(ANN_LIST_ENDPOINT, Language::EnUs), 503, "down");
        let err = harness.manager.update().await.unwrap_err();
        assert!(matches!(err, Error::Network(ref e) if e.status == 503));

        // Malformed content
        harness.serve(&[1003], &[1003]);
        harness.mock.respond_json(
            &harness.url(ANN_CONTENT_ENDPOINT, Language::EnUs),
            200,
            r#"{"retcode": 0, "message": "OK", "data": {"list": [{"ann_id": "1003", "title": "x"}]}}"#,
        );
        let err = harness.manager.update().await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        assert_eq!(harness.manager.notices(), before);
        assert_eq!(harness.events().len(), 2);
    }

    #[tokio::test]
    async fn test_secondary_language_fetches_english_titles() {
        let harness = Harness::new(Language::JaJp);
        harness.serve(&[1001], &[1001]);

        harness.manager.update().await.unwrap();
        let notice = harness.manager.notice(1001).unwrap();
        assert_eq!(notice.title, "Title 1001");
        assert_eq!(notice.en_title.as_deref(), Some("English 1001"));
        assert_eq!(harness.mock.request_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_secondary_call_discards_cycle() {
        let harness = Harness::new(Language::JaJp);
        harness.serve(&[1001], &[1001]);
        harness.mock.respond_json(&harness.url(ANN_CONTENT_ENDPOINT, Language::EnUs), 500, "");

        assert!(harness.manager.update().await.is_err());
        assert!(harness.manager.is_empty());
        assert!(harness.events().is_empty());
    }

    #[tokio::test]
    async fn test_english_feed_skips_secondary_call() {
        let harness = Harness::new(Language::EnUs);
        harness.serve(&[1001], &[1001]);

        harness.manager.update().await.unwrap();
        assert_eq!(harness.mock.request_count(), 2);
        assert!(harness.manager.notice(1001).unwrap().en_title.is_none());
    }

    #[tokio::test]
    async fn test_caller_lang_replaces_feed_lang() {
        let harness = Harness::new(Language::EnUs);
        harness.mock.respond_json(
            &harness.url(ANN_LIST_ENDPOINT, Language::JaJp),
            200,
            &ann_list(&[1001]),
        );
        harness.mock.respond_json(
            &harness.url(ANN_CONTENT_ENDPOINT, Language::JaJp),
            200,
            &ann_content(&[1001], "Title"),
        );

        let options = RequestOptions::new().query([("lang", "ja-jp")]);
        harness.manager.update_with(&options).await.unwrap();
        assert!(harness.manager.has(1001));

        let sent = harness.mock.requests();
        assert_eq!(sent.len(), 2);
        for request in &sent {
            let langs: Vec<String> = request
                .url
                .query_pairs()
                .filter(|(key, _)| key == "lang")
                .map(|(_, value)| value.into_owned())
                .collect();
            assert_eq!(langs, vec!["ja-jp".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_concurrent_updates_run_one_cycle_at_a_time() {
        let transport = SequencedTransport::default();
        let client = FetchClient::with_transport(ClientConfig::default(), Arc::new(transport.clone()));
        let manager = NoticeManager::new(
            client,
            NoticeOptions {
                language: Some(Language::EnUs),
                ..NoticeOptions::default()
            },
        )
        .unwrap();

        let list_url = manager.notice_url(ANN_LIST_ENDPOINT, Language::EnUs).unwrap().to_string();
        let content_url = manager.notice_url(ANN_CONTENT_ENDPOINT, Language::EnUs).unwrap().to_string();
        transport.push(&list_url, ann_list(&[1001, 1002]));
        transport.push(&content_url, ann_content(&[1001, 1002], "Title"));
        transport.push(&list_url, ann_list(&[1003]));
        transport.push(&content_url, ann_content(&[1003], "Title"));

        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in [NoticeEventKind::AddNotice, NoticeEventKind::RemoveNotice] {
            let log = Arc::clone(&log);
            manager.on(kind, move |event| {
                log.lock().unwrap().push((event.kind(), event.notice().id));
            });
        }

        let (first, second) = tokio::join!(manager.update(), manager.update());
        first.unwrap();
        second.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                (NoticeEventKind::AddNotice, 1001),
                (NoticeEventKind::AddNotice, 1002),
                (NoticeEventKind::AddNotice, 1003),
                (NoticeEventKind::RemoveNotice, 1001),
                (NoticeEventKind::RemoveNotice, 1002),
            ]
        );
        assert_eq!(manager.notices().iter().map(|n| n.id).collect::<Vec<_>>(), vec![1003]);
    }

    #[tokio::test]
    async fn test_spawn_refresh_requires_interval() {
        let harness = Harness::new(Language::EnUs);
        assert!(Arc::new(harness.manager).spawn_refresh().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_refresh_runs_updates() {
        let mock = MockTransport::new();
        let client = FetchClient::with_transport(ClientConfig::default(), Arc::new(mock.clone()));
        let manager = Arc::new(
            NoticeManager::new(
                client,
                NoticeOptions {
                    update_interval: Some(Duration::from_secs(60)),
                    ..NoticeOptions::default()
                },
            )
            .unwrap(),
        );
        mock.respond_json(
            &manager.notice_url(ANN_LIST_ENDPOINT, Language::EnUs).unwrap().to_string(),
            200,
            &ann_list(&[1001]),
        );
        mock.respond_json(
            &manager.notice_url(ANN_CONTENT_ENDPOINT, Language::EnUs).unwrap().to_string(),
            200,
            &ann_content(&[1001], "Title"),
        );

        let handle = Arc::clone(&manager).spawn_refresh().unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(manager.is_empty());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(manager.has(1001));
        handle.abort();
    }
}
