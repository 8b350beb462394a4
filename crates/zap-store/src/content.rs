use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zap_types::ContentKind;

use crate::error::{StoreError, StoreResult};

/// An uploaded file on its way into a [`ContentStore`].
#[derive(Clone, Debug)]
pub struct ContentObject {
    pub bytes: Bytes,
    pub kind: ContentKind,
    /// Client-supplied file name, used only to derive the object key.
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl ContentObject {
    pub fn new(bytes: impl Into<Bytes>, kind: ContentKind) -> Self {
        Self {
            bytes: bytes.into(),
            kind,
            file_name: None,
            content_type: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Durable object storage for uploaded bytes.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist the object and return a URL it can be retrieved from.
    async fn store(&self, object: ContentObject) -> StoreResult<String>;

    /// Remove a previously stored object. Returns `false` for URLs this store
    /// does not own or no longer holds.
    async fn delete(&self, url: &str) -> StoreResult<bool>;
}

/// Storage resource class an upload is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceClass {
    Image,
    Video,
    Raw,
}

impl ResourceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Raw => "raw",
        }
    }
}

/// Upload placement strategy: which resource class and folder an object
/// lands in, and how its key is derived.
///
/// Keys have the form `<basename>_<unix-millis><ext>`, with a `_<n>` suffix
/// on the basename when a backend reports the key as taken.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRouting {
    pub folder: String,
}

impl Default for UploadRouting {
    fn default() -> Self {
        Self {
            folder: "zaplink_folders".into(),
        }
    }
}

impl UploadRouting {
    pub fn resource_class(&self, kind: ContentKind) -> ResourceClass {
        match kind {
            ContentKind::Image | ContentKind::Pdf => ResourceClass::Image,
            ContentKind::Video => ResourceClass::Video,
            _ => ResourceClass::Raw,
        }
    }

    pub fn object_key(&self, file_name: Option<&str>, now: DateTime<Utc>, attempt: u32) -> String {
        let name = file_name.map(str::trim).unwrap_or_default();
        let (base, ext) = match name.rfind('.') {
            Some(dot)
                if dot > 0
                    && dot + 1 < name.len()
                    && name[dot + 1..].bytes().all(|b| b.is_ascii_alphanumeric()) =>
            {
                (&name[..dot], name[dot..].to_ascii_lowercase())
            }
            _ => (name, String::new()),
        };
        let mut base = sanitize(base);
        if base.is_empty() {
            base.push_str("upload");
        }
        let millis = now.timestamp_millis();
        if attempt == 0 {
            format!("{base}_{millis}{ext}")
        } else {
            format!("{base}_{millis}_{attempt}{ext}")
        }
    }

    /// Relative object path: `<resource>/<folder>/<key>`.
    pub fn object_path(&self, object: &ContentObject, now: DateTime<Utc>, attempt: u32) -> String {
        format!(
            "{}/{}/{}",
            self.resource_class(object.kind).as_str(),
            sanitize(&self.folder),
            self.object_key(object.file_name.as_deref(), now, attempt)
        )
    }
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(100)
        .collect()
}

#[derive(Clone, Debug)]
struct StoredContent {
    content_type: Option<String>,
    bytes: Bytes,
}

/// In-memory content store for tests and embedding.
pub struct InMemoryContentStore {
    base_url: String,
    routing: UploadRouting,
    objects: RwLock<HashMap<String, StoredContent>>,
}

impl InMemoryContentStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            routing: UploadRouting::default(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_routing(mut self, routing: UploadRouting) -> Self {
        self.routing = routing;
        self
    }

    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes and content type stored under `url`.
    pub fn get(&self, url: &str) -> Option<(Option<String>, Bytes)> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(url)
            .map(|c| (c.content_type.clone(), c.bytes.clone()))
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new("memory://content")
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn store(&self, object: ContentObject) -> StoreResult<String> {
        let now = Utc::now();
        let mut objects = self.objects.write().expect("lock poisoned");
        for attempt in 0..u32::MAX {
            let path = self.routing.object_path(&object, now, attempt);
            let url = format!("{}/{}", self.base_url, path);
            if !objects.contains_key(&url) {
                objects.insert(
                    url.clone(),
                    StoredContent {
                        content_type: object.content_type.clone(),
                        bytes: object.bytes.clone(),
                    },
                );
                return Ok(url);
            }
        }
        Err(StoreError::Storage("object key space exhausted".into()))
    }

    async fn delete(&self, url: &str) -> StoreResult<bool> {
        Ok(self.objects.write().expect("lock poisoned").remove(url).is_some())
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("base_url", &self.base_url)
            .field("object_count", &self.len())
            .finish()
    }
}
