use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use zap_crypto::{CodeGenerator, CredentialHasher, RandomCodeGenerator, SaltedBlake3Hasher};
use zap_gate::{Denial, GateContext, GateError, ResolutionGate};
use zap_store::{
    ContentObject, ContentStore, InMemoryContentStore, InMemoryZapRepository, StoreError,
    ZapRepository,
};
use zap_types::{ContentKind, ShortCode, Zap, ZapId};

use crate::config::ZapConfig;
use crate::data_url::DataUrl;
use crate::error::{ZapError, ZapResult};
use crate::input::{NewZap, ZapContent};
use crate::qr::{PngQrRenderer, QrImage, QrRenderer};

/// Injected dependencies of a [`ZapController`].
#[derive(Clone)]
pub struct Collaborators {
    pub repository: Arc<dyn ZapRepository>,
    pub content: Arc<dyn ContentStore>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub qr: Arc<dyn QrRenderer>,
    pub codes: Arc<dyn CodeGenerator>,
}

impl Collaborators {
    /// Fully in-process wiring with default parameters.
    pub fn in_memory() -> Self {
        Self {
            repository: Arc::new(InMemoryZapRepository::new()),
            content: Arc::new(InMemoryContentStore::default()),
            hasher: Arc::new(SaltedBlake3Hasher::default()),
            qr: Arc::new(PngQrRenderer::default()),
            codes: Arc::new(RandomCodeGenerator::default()),
        }
    }
}

/// Result of a successful creation.
#[derive(Clone, Debug)]
pub struct CreatedZap {
    pub id: ZapId,
    pub short_code: ShortCode,
    pub content_id: ShortCode,
    pub short_url: String,
    pub qr: QrImage,
    pub kind: ContentKind,
    pub name: Option<String>,
}

/// A resolution attempt.
#[derive(Clone, Debug, Default)]
pub struct ResolveRequest {
    pub short_code: String,
    pub password: Option<String>,
    /// The caller is a browser that should be sent to an error page rather
    /// than handed a structured error.
    pub prefers_interactive: bool,
}

impl ResolveRequest {
    pub fn new(short_code: impl Into<String>) -> Self {
        Self {
            short_code: short_code.into(),
            password: None,
            prefers_interactive: false,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn interactive(mut self) -> Self {
        self.prefers_interactive = true;
        self
    }
}

/// What the caller should hand back to the visitor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Serve these bytes directly.
    Inline { content_type: String, bytes: Bytes },
    /// Send the visitor elsewhere.
    Redirect { location: String },
    /// Resolution failed for an interactive caller; send them to the
    /// frontend error page.
    ErrorPage {
        location: String,
        reason: &'static str,
    },
}

/// Outcome of an expiry sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub content_removed: usize,
}

/// Enforces the zap lifecycle: creation, gated resolution, self-destruct,
/// and expiry sweep.
pub struct ZapController {
    config: ZapConfig,
    repository: Arc<dyn ZapRepository>,
    content: Arc<dyn ContentStore>,
    hasher: Arc<dyn CredentialHasher>,
    qr: Arc<dyn QrRenderer>,
    codes: Arc<dyn CodeGenerator>,
    gate: ResolutionGate,
}

impl ZapController {
    pub fn new(config: ZapConfig, collaborators: Collaborators) -> Self {
        let gate = ResolutionGate::with_default_stages(Arc::clone(&collaborators.hasher));
        Self {
            config,
            repository: collaborators.repository,
            content: collaborators.content,
            hasher: collaborators.hasher,
            qr: collaborators.qr,
            codes: collaborators.codes,
            gate,
        }
    }

    pub fn config(&self) -> &ZapConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<dyn ZapRepository> {
        &self.repository
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Persist a new zap.
    ///
    /// The file (if any) is stored before the record; if anything after that
    /// fails the stored object is deleted again, so a failed creation leaves
    /// neither a record nor an orphaned file.
    pub async fn create(&self, new: NewZap) -> ZapResult<CreatedZap> {
        let NewZap {
            kind,
            name,
            content,
            password,
            view_limit,
            expires_at,
            self_destruct,
        } = new;

        let (content_url, original_url) = match content {
            ZapContent::File(upload) => {
                let mut object = ContentObject::new(upload.bytes, kind);
                object.file_name = upload.file_name;
                object.content_type = upload.content_type;
                let url = self.content.store(object).await.map_err(ZapError::Storage)?;
                tracing::debug!(kind = %kind, url = %url, "content stored");
                (Some(url), None)
            }
            ZapContent::Url(url) => (None, Some(url)),
        };

        let template = Zap {
            id: ZapId::new(),
            short_code: self.codes.generate(),
            content_id: self.codes.generate(),
            kind,
            display_name: name,
            content_url: content_url.clone(),
            original_url,
            password_hash: None,
            view_limit,
            view_count: 0,
            expires_at,
            self_destruct,
            created_at: Utc::now(),
        };

        match self.persist(template, password.as_deref()).await {
            Ok((zap, short_url, qr)) => {
                tracing::info!(
                    id = %zap.id,
                    short_code = %zap.short_code,
                    kind = %zap.kind,
                    protected = zap.is_password_protected(),
                    view_limit = ?zap.view_limit,
                    "zap created"
                );
                Ok(CreatedZap {
                    id: zap.id,
                    short_code: zap.short_code,
                    content_id: zap.content_id,
                    short_url,
                    qr,
                    kind: zap.kind,
                    name: zap.display_name,
                })
            }
            Err(err) => {
                if let Some(url) = content_url {
                    self.discard_content(&url).await;
                }
                Err(err)
            }
        }
    }

    /// Hash the password and insert `zap`, drawing a fresh short code for
    /// every attempt after the first.
    async fn persist(
        &self,
        mut zap: Zap,
        password: Option<&str>,
    ) -> ZapResult<(Zap, String, QrImage)> {
        zap.password_hash = password.map(|p| self.hasher.hash(p)).transpose()?;
        let attempts = self.config.max_code_attempts.max(1);

        for attempt in 1..=attempts {
            if attempt > 1 {
                zap.id = ZapId::new();
                zap.short_code = self.codes.generate();
            }
            let short_url = self.config.short_url(zap.short_code.as_str());
            let qr = self.qr.render(&short_url)?;

            match self.repository.create(&zap).await {
                Ok(stored) => return Ok((stored, short_url, qr)),
                Err(StoreError::DuplicateKey { field, value }) => {
                    tracing::warn!(attempt, field, value = %value, "short code collision");
                }
                Err(e) => return Err(ZapError::Persistence(e)),
            }
        }

        Err(ZapError::DuplicateKey { attempts })
    }

    async fn discard_content(&self, url: &str) {
        match self.content.delete(url).await {
            Ok(_) => tracing::debug!(url, "orphaned content removed"),
            Err(e) => tracing::warn!(url, error = %e, "failed to remove orphaned content"),
        }
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Resolve a short code to content, counting the view.
    ///
    /// Gates run against the loaded record (expiry, then the pre-increment
    /// view limit, then the password). The view is recorded with a
    /// compare-and-swap on the count that was checked; losing that race
    /// reloads and re-evaluates, so two concurrent visitors can never both
    /// consume the last view. The post-increment count is checked again
    /// before content is released.
    ///
    /// Interactive callers get [`Resolution::ErrorPage`] instead of
    /// visitor-facing errors when a frontend is configured.
    pub async fn resolve(&self, request: &ResolveRequest) -> ZapResult<Resolution> {
        match self.resolve_content(request).await {
            Err(err) if request.prefers_interactive => {
                match self.error_page(&request.short_code, &err) {
                    Some(location) => Ok(Resolution::ErrorPage {
                        location,
                        reason: err.redirect_reason().unwrap_or("error"),
                    }),
                    None => Err(err),
                }
            }
            other => other,
        }
    }

    async fn resolve_content(&self, request: &ResolveRequest) -> ZapResult<Resolution> {
        let code =
            ShortCode::parse(request.short_code.as_str()).map_err(|_| ZapError::NotFound)?;
        let mut zap = self.load(&code).await?;
        let attempts = self.config.max_increment_attempts.max(1);

        for attempt in 1..=attempts {
            let context = GateContext::new(Utc::now(), request.password.as_deref());
            let verdict = self.gate.evaluate(&zap, &context).map_err(integrity)?;
            if let Some(denial) = verdict.denial() {
                self.on_denied(&zap, denial).await;
                return Err(denial.into());
            }

            match self.repository.increment_view_count(zap.id, zap.view_count).await {
                Ok(updated) => {
                    if updated.view_limit_exceeded() {
                        self.on_denied(&updated, Denial::ViewLimitReached).await;
                        return Err(ZapError::ViewLimit);
                    }
                    tracing::debug!(
                        short_code = %updated.short_code,
                        view_count = updated.view_count,
                        "view recorded"
                    );
                    return deliver(&updated);
                }
                Err(StoreError::Conflict { .. }) => {
                    tracing::debug!(
                        short_code = %code,
                        attempt,
                        "view count race lost, re-evaluating"
                    );
                    zap = self.load(&code).await?;
                }
                Err(StoreError::NotFound(_)) => return Err(ZapError::NotFound),
                Err(e) => return Err(ZapError::Persistence(e)),
            }
        }

        Err(ZapError::Conflict(code.to_string()))
    }

    /// Frontend error page for an interactive caller, when one applies.
    pub fn error_page(&self, short_code: &str, err: &ZapError) -> Option<String> {
        let reason = err.redirect_reason()?;
        let code = ShortCode::parse(short_code)
            .map(|c| c.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        self.config.error_page(&code, reason)
    }

    async fn load(&self, code: &ShortCode) -> ZapResult<Zap> {
        self.repository
            .find_by_short_code(code)
            .await
            .map_err(ZapError::Persistence)?
            .ok_or(ZapError::NotFound)
    }

    async fn on_denied(&self, zap: &Zap, denial: Denial) {
        let destroy = zap.self_destruct
            && match denial {
                Denial::ViewLimitReached => true,
                Denial::Expired => self.config.self_destruct_on_expiry,
                _ => false,
            };
        if destroy {
            self.destroy(zap, denial).await;
        }
    }

    /// Remove the record and its stored file. Failures are logged; the next
    /// denied visit retries.
    async fn destroy(&self, zap: &Zap, denial: Denial) {
        match self.repository.delete(zap.id).await {
            Ok(true) => {
                tracing::info!(
                    id = %zap.id,
                    short_code = %zap.short_code,
                    reason = denial.as_str(),
                    "zap self-destructed"
                );
            }
            Ok(false) => return,
            Err(e) => {
                tracing::warn!(id = %zap.id, error = %e, "self-destruct failed");
                return;
            }
        }
        if let Some(url) = &zap.content_url {
            self.discard_content(url).await;
        }
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Delete every zap expired at `now`, along with its stored file.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> ZapResult<SweepReport> {
        let expired = self
            .repository
            .delete_expired(now)
            .await
            .map_err(ZapError::Persistence)?;

        let mut report = SweepReport {
            removed: expired.len(),
            content_removed: 0,
        };
        for zap in &expired {
            if let Some(url) = &zap.content_url {
                match self.content.delete(url).await {
                    Ok(true) => report.content_removed += 1,
                    Ok(false) => {}
                    Err(e) => tracing::warn!(
                        id = %zap.id,
                        url = %url,
                        error = %e,
                        "content cleanup failed"
                    ),
                }
            }
        }
        tracing::info!(
            removed = report.removed,
            content_removed = report.content_removed,
            "expired zaps swept"
        );
        Ok(report)
    }
}

fn integrity(err: GateError) -> ZapError {
    ZapError::Integrity(err.to_string())
}

fn deliver(zap: &Zap) -> ZapResult<Resolution> {
    match (&zap.original_url, &zap.content_url) {
        (Some(url), _) if DataUrl::is_data_url(url) => {
            let decoded = DataUrl::parse(url).map_err(|e| {
                tracing::error!(id = %zap.id, error = %e, "stored data URL is undecodable");
                ZapError::Integrity(format!("stored data URL: {e}"))
            })?;
            Ok(Resolution::Inline {
                content_type: decoded.mime,
                bytes: Bytes::from(decoded.bytes),
            })
        }
        (Some(url), _) => Ok(Resolution::Redirect {
            location: url.clone(),
        }),
        (None, Some(url)) => Ok(Resolution::Redirect {
            location: url.clone(),
        }),
        (None, None) => {
            tracing::error!(id = %zap.id, "zap has neither content nor URL");
            Err(ZapError::Integrity(format!("zap {} has no content", zap.id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Duration;
    use zap_store::StoreResult;

    use super::*;
    use crate::input::FileUpload;
    use crate::qr::QrError;

    /// Hands out a fixed sequence of codes, then random ones.
    struct ScriptedCodes {
        script: Mutex<VecDeque<ShortCode>>,
        fallback: RandomCodeGenerator,
    }

    impl ScriptedCodes {
        fn new(codes: &[&str]) -> Self {
            Self {
                script: Mutex::new(codes.iter().map(|c| ShortCode::parse(*c).unwrap()).collect()),
                fallback: RandomCodeGenerator::default(),
            }
        }
    }

    impl CodeGenerator for ScriptedCodes {
        fn generate(&self) -> ShortCode {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.generate())
        }
    }

    struct BrokenQr;

    impl QrRenderer for BrokenQr {
        fn render(&self, _url: &str) -> Result<QrImage, QrError> {
            Err(QrError::Image("disk full".into()))
        }
    }

    /// Repository whose view counter always loses the race.
    struct AlwaysConflicting(InMemoryZapRepository);

    #[async_trait]
    impl ZapRepository for AlwaysConflicting {
        async fn create(&self, zap: &Zap) -> StoreResult<Zap> {
            self.0.create(zap).await
        }
        async fn find_by_short_code(&self, code: &ShortCode) -> StoreResult<Option<Zap>> {
            self.0.find_by_short_code(code).await
        }
        async fn increment_view_count(&self, id: ZapId, expected: u32) -> StoreResult<Zap> {
            Err(StoreError::Conflict { id, expected })
        }
        async fn delete(&self, id: ZapId) -> StoreResult<bool> {
            self.0.delete(id).await
        }
        async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<Zap>> {
            self.0.delete_expired(now).await
        }
    }

    /// Repository that refuses every write.
    struct ReadOnly;

    #[async_trait]
    impl ZapRepository for ReadOnly {
        async fn create(&self, _zap: &Zap) -> StoreResult<Zap> {
            Err(StoreError::Storage("read-only".into()))
        }
        async fn find_by_short_code(&self, _code: &ShortCode) -> StoreResult<Option<Zap>> {
            Ok(None)
        }
        async fn increment_view_count(&self, id: ZapId, _expected: u32) -> StoreResult<Zap> {
            Err(StoreError::NotFound(id))
        }
        async fn delete(&self, _id: ZapId) -> StoreResult<bool> {
            Ok(false)
        }
        async fn delete_expired(&self, _now: DateTime<Utc>) -> StoreResult<Vec<Zap>> {
            Ok(Vec::new())
        }
    }

    struct Harness {
        controller: ZapController,
        repo: Arc<InMemoryZapRepository>,
        content: Arc<InMemoryContentStore>,
    }

    fn collaborators(
        repo: &Arc<InMemoryZapRepository>,
        content: &Arc<InMemoryContentStore>,
        codes: &[&str],
    ) -> Collaborators {
        Collaborators {
            repository: repo.clone(),
            content: content.clone(),
            hasher: Arc::new(SaltedBlake3Hasher::new(8).unwrap()),
            qr: Arc::new(PngQrRenderer::new(64)),
            codes: Arc::new(ScriptedCodes::new(codes)),
        }
    }

    fn harness_with(config: ZapConfig, codes: &[&str]) -> Harness {
        let repo = Arc::new(InMemoryZapRepository::new());
        let content = Arc::new(InMemoryContentStore::default());
        let controller = ZapController::new(config, collaborators(&repo, &content, codes));
        Harness {
            controller,
            repo,
            content,
        }
    }

    fn harness() -> Harness {
        harness_with(ZapConfig::default(), &[])
    }

    fn redirect(url: &str) -> Resolution {
        Resolution::Redirect {
            location: url.to_string(),
        }
    }

    fn upload() -> FileUpload {
        FileUpload::new(&b"%PDF-1.7"[..])
            .with_file_name("report.pdf")
            .with_content_type("application/pdf")
    }

    async fn resolve(h: &Harness, code: &ShortCode) -> ZapResult<Resolution> {
        h.controller.resolve(&ResolveRequest::new(code.as_str())).await
    }

    // --- creation ---------------------------------------------------------

    #[tokio::test]
    async fn create_url_zap() {
        let h = harness_with(ZapConfig::default(), &["abc123", "ref001"]);
        let created = h
            .controller
            .create(NewZap::url("https://example.com"))
            .await
            .unwrap();

        assert_eq!(created.short_code.as_str(), "abc123");
        assert_eq!(created.content_id.as_str(), "ref001");
        assert_eq!(created.short_url, "http://localhost:8080/api/zaps/abc123");
        assert!(created.qr.to_data_uri().starts_with("data:image/png;base64,"));
        assert_eq!(created.kind, ContentKind::Url);

        let stored = h.repo.get(created.id).unwrap();
        assert_eq!(stored.view_count, 0);
        assert_eq!(stored.original_url.as_deref(), Some("https://example.com"));
        assert!(stored.content_url.is_none());
        assert!(h.content.is_empty());
    }

    #[tokio::test]
    async fn create_file_zap_stores_content_first() {
        let h = harness();
        let created = h
            .controller
            .create(NewZap::file(ContentKind::Pdf, upload()).with_password("pw"))
            .await
            .unwrap();

        let stored = h.repo.get(created.id).unwrap();
        let url = stored.content_url.clone().unwrap();
        assert!(url.starts_with("memory://content/image/zaplink_folders/report_"));
        assert!(stored.original_url.is_none());
        let (content_type, bytes) = h.content.get(&url).unwrap();
        assert_eq!(content_type.as_deref(), Some("application/pdf"));
        assert_eq!(&bytes[..], b"%PDF-1.7");
    }

    #[tokio::test]
    async fn password_is_stored_hashed() {
        let h = harness();
        let created = h
            .controller
            .create(NewZap::url("https://e.com").with_password("hunter2"))
            .await
            .unwrap();
        let digest = h.repo.get(created.id).unwrap().password_hash.unwrap();
        assert_ne!(digest, "hunter2");
        assert!(!digest.contains("hunter2"));
    }

    #[tokio::test]
    async fn short_code_collision_is_retried() {
        let codes = ["dup111", "ref001", "dup111", "ref002", "new222"];
        let h = harness_with(ZapConfig::default(), &codes);
        let first = h.controller.create(NewZap::url("https://a.com")).await.unwrap();
        let second = h.controller.create(NewZap::url("https://b.com")).await.unwrap();
        assert_eq!(first.short_code.as_str(), "dup111");
        assert_eq!(second.short_code.as_str(), "new222");
        assert_eq!(h.repo.len(), 2);
    }

    #[tokio::test]
    async fn exhausted_collisions_leave_no_orphan() {
        let codes = ["dup111", "ref001", "dup111", "ref002", "dup111"];
        let h = harness_with(ZapConfig::default(), &codes);
        h.controller.create(NewZap::url("https://a.com")).await.unwrap();
        assert_eq!(h.content.len(), 0);

        let err = h
            .controller
            .create(NewZap::file(ContentKind::Pdf, upload()))
            .await
            .unwrap_err();
        assert!(matches!(err, ZapError::DuplicateKey { attempts: 2 }));
        assert_eq!(h.repo.len(), 1);
        assert!(h.content.is_empty(), "stored file must be cleaned up");
    }

    #[tokio::test]
    async fn persistence_failure_cleans_up_content() {
        let content = Arc::new(InMemoryContentStore::default());
        let controller = ZapController::new(
            ZapConfig::default(),
            Collaborators {
                repository: Arc::new(ReadOnly),
                ..collaborators(&Arc::new(InMemoryZapRepository::new()), &content, &[])
            },
        );
        let err = controller
            .create(NewZap::file(ContentKind::Pdf, upload()))
            .await
            .unwrap_err();
        assert!(matches!(err, ZapError::Persistence(_)));
        assert!(content.is_empty());
    }

    #[tokio::test]
    async fn qr_failure_aborts_before_persisting() {
        let repo = Arc::new(InMemoryZapRepository::new());
        let content = Arc::new(InMemoryContentStore::default());
        let controller = ZapController::new(
            ZapConfig::default(),
            Collaborators {
                qr: Arc::new(BrokenQr),
                ..collaborators(&repo, &content, &[])
            },
        );
        let err = controller
            .create(NewZap::file(ContentKind::Image, upload()))
            .await
            .unwrap_err();
        assert!(matches!(err, ZapError::Qr(_)));
        assert!(repo.is_empty());
        assert!(content.is_empty());
    }

    // --- resolution -------------------------------------------------------

    #[tokio::test]
    async fn resolve_redirects_and_counts() {
        let h = harness();
        let created = h.controller.create(NewZap::url("https://e.com/x")).await.unwrap();

        assert_eq!(resolve(&h, &created.short_code).await.unwrap(), redirect("https://e.com/x"));
        assert_eq!(resolve(&h, &created.short_code).await.unwrap(), redirect("https://e.com/x"));
        assert_eq!(h.repo.get(created.id).unwrap().view_count, 2);
    }

    #[tokio::test]
    async fn resolve_file_redirects_to_content() {
        let h = harness();
        let created = h
            .controller
            .create(NewZap::file(ContentKind::Pdf, upload()))
            .await
            .unwrap();
        let url = h.repo.get(created.id).unwrap().content_url.unwrap();
        assert_eq!(resolve(&h, &created.short_code).await.unwrap(), redirect(&url));
    }

    #[tokio::test]
    async fn data_url_is_served_inline() {
        let h = harness();
        let created = h
            .controller
            .create(NewZap::url("data:image/gif;base64,aGVsbG8="))
            .await
            .unwrap();
        assert_eq!(
            resolve(&h, &created.short_code).await.unwrap(),
            Resolution::Inline {
                content_type: "image/gif".into(),
                bytes: Bytes::from_static(b"hello"),
            }
        );
    }

    #[tokio::test]
    async fn unknown_and_malformed_codes_are_not_found() {
        let h = harness();
        for code in ["zzzzzz", "NOT-A-CODE", ""] {
            let err = h.controller.resolve(&ResolveRequest::new(code)).await.unwrap_err();
            assert!(matches!(err, ZapError::NotFound), "{code:?}");
        }
    }

    #[tokio::test]
    async fn expired_zap_is_denied_without_counting() {
        let h = harness();
        let created = h
            .controller
            .create(NewZap::url("https://e.com").with_expiry(Utc::now() - Duration::seconds(1)))
            .await
            .unwrap();
        let err = resolve(&h, &created.short_code).await.unwrap_err();
        assert!(matches!(err, ZapError::Expired));
        assert_eq!(h.repo.get(created.id).unwrap().view_count, 0);
    }

    #[tokio::test]
    async fn future_expiry_allows_access() {
        let h = harness();
        let created = h
            .controller
            .create(NewZap::url("https://e.com").with_expiry(Utc::now() + Duration::hours(1)))
            .await
            .unwrap();
        assert!(resolve(&h, &created.short_code).await.is_ok());
    }

    #[tokio::test]
    async fn view_limit_allows_exactly_n_views() {
        let h = harness();
        let created = h
            .controller
            .create(NewZap::url("https://e.com").with_view_limit(3))
            .await
            .unwrap();

        for _ in 0..3 {
            resolve(&h, &created.short_code).await.unwrap();
        }
        let err = resolve(&h, &created.short_code).await.unwrap_err();
        assert!(matches!(err, ZapError::ViewLimit));
        let stored = h.repo.get(created.id).unwrap();
        assert_eq!(stored.view_count, 3, "denied attempts are not counted");
    }

    #[tokio::test]
    async fn self_destruct_removes_record_and_file() {
        let h = harness();
        let created = h
            .controller
            .create(
                NewZap::file(ContentKind::Pdf, upload())
                    .with_view_limit(1)
                    .self_destructing(),
            )
            .await
            .unwrap();

        resolve(&h, &created.short_code).await.unwrap();
        assert_eq!(h.content.len(), 1);

        let err = resolve(&h, &created.short_code).await.unwrap_err();
        assert!(matches!(err, ZapError::ViewLimit));
        assert!(h.repo.get(created.id).is_none());
        assert!(h.content.is_empty());

        let err = resolve(&h, &created.short_code).await.unwrap_err();
        assert!(matches!(err, ZapError::NotFound));
    }

    #[tokio::test]
    async fn without_self_destruct_record_survives() {
        let h = harness();
        let created = h
            .controller
            .create(NewZap::url("https://e.com").with_view_limit(1))
            .await
            .unwrap();
        resolve(&h, &created.short_code).await.unwrap();
        assert!(matches!(resolve(&h, &created.short_code).await, Err(ZapError::ViewLimit)));
        assert!(h.repo.get(created.id).is_some());
    }

    #[tokio::test]
    async fn expiry_self_destruct_is_opt_in() {
        let past = Utc::now() - Duration::seconds(5);
        let zap = || NewZap::url("https://e.com").with_expiry(past).self_destructing();

        let h = harness();
        let created = h.controller.create(zap()).await.unwrap();
        assert!(matches!(resolve(&h, &created.short_code).await, Err(ZapError::Expired)));
        assert!(h.repo.get(created.id).is_some());

        let config = ZapConfig {
            self_destruct_on_expiry: true,
            ..Default::default()
        };
        let h = harness_with(config, &[]);
        let created = h.controller.create(zap()).await.unwrap();
        assert!(matches!(resolve(&h, &created.short_code).await, Err(ZapError::Expired)));
        assert!(h.repo.get(created.id).is_none());
    }

    #[tokio::test]
    async fn password_gate() {
        let h = harness();
        let created = h
            .controller
            .create(NewZap::url("https://e.com").with_password("s3cret"))
            .await
            .unwrap();
        let code = created.short_code.as_str();

        let err = h.controller.resolve(&ResolveRequest::new(code)).await.unwrap_err();
        assert!(matches!(err, ZapError::PasswordRequired));
        let err = h
            .controller
            .resolve(&ResolveRequest::new(code).with_password(""))
            .await
            .unwrap_err();
        assert!(matches!(err, ZapError::PasswordRequired));
        let err = h
            .controller
            .resolve(&ResolveRequest::new(code).with_password("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, ZapError::InvalidPassword));
        assert_eq!(h.repo.get(created.id).unwrap().view_count, 0);

        h.controller
            .resolve(&ResolveRequest::new(code).with_password("s3cret"))
            .await
            .unwrap();
        assert_eq!(h.repo.get(created.id).unwrap().view_count, 1);
    }

    #[tokio::test]
    async fn expiry_is_reported_before_password() {
        let h = harness();
        let created = h
            .controller
            .create(
                NewZap::url("https://e.com")
                    .with_password("pw")
                    .with_expiry(Utc::now() - Duration::seconds(1)),
            )
            .await
            .unwrap();
        assert!(matches!(resolve(&h, &created.short_code).await, Err(ZapError::Expired)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_visitors_share_a_single_view() {
        let h = Arc::new(harness());
        let created = h
            .controller
            .create(NewZap::url("https://e.com").with_view_limit(1))
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let h = Arc::clone(&h);
            let code = created.short_code.clone();
            tasks.push(tokio::spawn(async move { resolve(&h, &code).await }));
        }

        let mut granted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => granted += 1,
                Err(ZapError::ViewLimit) | Err(ZapError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(granted, 1);
        assert_eq!(h.repo.get(created.id).unwrap().view_count, 1);
    }

    #[tokio::test]
    async fn persistent_conflicts_surface_after_bounded_retries() {
        let inner = InMemoryZapRepository::new();
        let content = Arc::new(InMemoryContentStore::default());
        let controller = ZapController::new(
            ZapConfig::default(),
            Collaborators {
                repository: Arc::new(AlwaysConflicting(inner)),
                ..collaborators(&Arc::new(InMemoryZapRepository::new()), &content, &[])
            },
        );
        let created = controller.create(NewZap::url("https://e.com")).await.unwrap();
        let err = controller
            .resolve(&ResolveRequest::new(created.short_code.as_str()))
            .await
            .unwrap_err();
        assert!(matches!(err, ZapError::Conflict(ref c) if c == created.short_code.as_str()));
    }

    #[tokio::test]
    async fn corrupt_digest_is_an_integrity_error() {
        let h = harness();
        let mut zap = Zap {
            id: ZapId::new(),
            short_code: ShortCode::parse("bad001").unwrap(),
            content_id: ShortCode::parse("ref001").unwrap(),
            kind: ContentKind::Url,
            display_name: None,
            content_url: None,
            original_url: Some("https://e.com".into()),
            password_hash: Some("plaintext".into()),
            view_limit: None,
            view_count: 0,
            expires_at: None,
            self_destruct: false,
            created_at: Utc::now(),
        };
        h.repo.create(&zap).await.unwrap();
        let err = h
            .controller
            .resolve(&ResolveRequest::new("bad001").with_password("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ZapError::Integrity(_)));

        zap.id = ZapId::new();
        zap.short_code = ShortCode::parse("bad002").unwrap();
        zap.password_hash = None;
        zap.original_url = None;
        h.repo.create(&zap).await.unwrap();
        let err = h.controller.resolve(&ResolveRequest::new("bad002")).await.unwrap_err();
        assert!(matches!(err, ZapError::Integrity(_)));
    }

    // --- error pages & sweep ----------------------------------------------

    #[tokio::test]
    async fn interactive_callers_get_error_pages() {
        let config = ZapConfig {
            frontend_url: Some("https://app.example".into()),
            ..Default::default()
        };
        let h = harness_with(config, &["once11", "ref001"]);
        h.controller
            .create(NewZap::url("https://e.com").with_view_limit(1))
            .await
            .unwrap();
        h.controller.resolve(&ResolveRequest::new("once11")).await.unwrap();

        let page = h
            .controller
            .resolve(&ResolveRequest::new("once11").interactive())
            .await
            .unwrap();
        assert_eq!(
            page,
            Resolution::ErrorPage {
                location: "https://app.example/zaps/once11?error=viewlimit".into(),
                reason: "viewlimit",
            }
        );

        // API callers still see the typed error.
        let err = h.controller.resolve(&ResolveRequest::new("once11")).await.unwrap_err();
        assert!(matches!(err, ZapError::ViewLimit));
    }

    #[tokio::test]
    async fn interactive_without_frontend_is_an_error() {
        let h = harness();
        let err = h
            .controller
            .resolve(&ResolveRequest::new("nope11").interactive())
            .await
            .unwrap_err();
        assert!(matches!(err, ZapError::NotFound));
    }

    #[test]
    fn error_pages() {
        let config = ZapConfig {
            frontend_url: Some("https://app.example".into()),
            ..Default::default()
        };
        let h = harness_with(config, &[]);
        assert_eq!(
            h.controller.error_page("abc123", &ZapError::ViewLimit).as_deref(),
            Some("https://app.example/zaps/abc123?error=viewlimit")
        );
        assert_eq!(
            h.controller.error_page("../x", &ZapError::NotFound).as_deref(),
            Some("https://app.example/zaps/unknown?error=notfound")
        );
        assert_eq!(h.controller.error_page("abc123", &ZapError::Integrity("x".into())), None);
    }

    #[tokio::test]
    async fn sweep_removes_expired_records_and_files() {
        let h = harness();
        let now = Utc::now();
        let expired = h
            .controller
            .create(
                NewZap::file(ContentKind::Pdf, upload()).with_expiry(now - Duration::minutes(1)),
            )
            .await
            .unwrap();
        let live = h
            .controller
            .create(NewZap::url("https://e.com").with_expiry(now + Duration::hours(1)))
            .await
            .unwrap();
        let forever = h.controller.create(NewZap::url("https://f.com")).await.unwrap();

        let report = h.controller.sweep_expired(now).await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                removed: 1,
                content_removed: 1
            }
        );
        assert!(h.repo.get(expired.id).is_none());
        assert!(h.repo.get(live.id).is_some());
        assert!(h.repo.get(forever.id).is_some());
        assert!(h.content.is_empty());
    }
}
