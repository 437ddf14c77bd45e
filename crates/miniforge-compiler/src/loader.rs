//! Asynchronous loading of every file reachable from an entry point.
//!
//! Fetches run concurrently on the calling task through a
//! [`FuturesUnordered`] set. Each distinct resolved path is fetched and
//! parsed at most once, however many files reference it. The first
//! failure aborts the load and drops the fetches still in flight.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use miniforge_types::ast::{Chunk, Reference};
use miniforge_types::Span;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::error::{BuildError, BuildErrorKind, BuildResult};
use crate::resource::ResourceHandler;

/// Extension tried when a reference does not exist as written.
pub const SOURCE_EXTENSION: &str = ".src";

/// A fetched and parsed source file.
#[derive(Debug, Clone)]
pub struct Resource {
    pub path: String,
    /// SHA-256 of the source text, hex encoded.
    pub id: String,
    pub source: String,
    pub chunk: Chunk,
}

/// Progress of one resolved path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FetchKind {
    /// Parsed source: the entry, imports, includes and native imports.
    Module,
    /// Raw text for `#inject`.
    Text,
}

/// A path to fetch and the reference that asked for it.
struct Request {
    path: String,
    kind: FetchKind,
    origin: Option<(String, Span)>,
}

enum Fetched {
    Module(Resource),
    Text { path: String, text: String },
}

/// Loads a module graph through a [`ResourceHandler`].
pub struct ResourceGraphLoader {
    handler: Arc<dyn ResourceHandler>,
    native_imports: bool,
    /// `(referring path, reference as written)` → resolved path.
    resolved: Mutex<HashMap<(String, String), String>>,
    /// Keyed by path and form: a file may be both injected and parsed.
    states: Mutex<HashMap<(String, FetchKind), LoadState>>,
    modules: Mutex<HashMap<String, Arc<Resource>>>,
    texts: Mutex<HashMap<String, Arc<str>>>,
}

impl ResourceGraphLoader {
    /// `native_imports` makes `import_code("path")` targets part of the
    /// graph.
    pub fn new(handler: Arc<dyn ResourceHandler>, native_imports: bool) -> Self {
        Self {
            handler,
            native_imports,
            resolved: Mutex::new(HashMap::new()),
            states: Mutex::new(HashMap::new()),
            modules: Mutex::new(HashMap::new()),
            texts: Mutex::new(HashMap::new()),
        }
    }

    /// Load `entry` and everything it references. Returns the resolved
    /// entry path.
    pub async fn load(&self, entry: &str) -> BuildResult<String> {
        let entry = self.resolve("", entry).await;
        debug!(entry = %entry, "loading resource graph");

        let mut in_flight = FuturesUnordered::new();
        if self.schedule(&entry, FetchKind::Module) {
            in_flight.push(self.fetch(Request {
                path: entry.clone(),
                kind: FetchKind::Module,
                origin: None,
            }));
        }

        while let Some(fetched) = in_flight.next().await {
            match fetched? {
                Fetched::Module(resource) => {
                    for request in self.references(&resource).await {
                        if self.schedule(&request.path, request.kind) {
                            in_flight.push(self.fetch(request));
                        }
                    }
                    let path = resource.path.clone();
                    self.modules.lock().insert(path.clone(), Arc::new(resource));
                    self.states
                        .lock()
                        .insert((path, FetchKind::Module), LoadState::Ready);
                }
                Fetched::Text { path, text } => {
                    self.texts.lock().insert(path.clone(), Arc::from(text));
                    self.states
                        .lock()
                        .insert((path, FetchKind::Text), LoadState::Ready);
                }
            }
        }

        debug!(
            modules = self.modules.lock().len(),
            texts = self.texts.lock().len(),
            "resource graph loaded"
        );
        Ok(entry)
    }

    /// `true` once every discovered path is loaded.
    pub fn is_success(&self) -> bool {
        let states = self.states.lock();
        !states.is_empty() && states.values().all(|state| *state == LoadState::Ready)
    }

    /// Progress of `path`. A path requested in both forms is ready once
    /// both are.
    pub fn state(&self, path: &str) -> Option<LoadState> {
        let states = self.states.lock();
        [FetchKind::Module, FetchKind::Text]
            .into_iter()
            .filter_map(|kind| states.get(&(path.to_string(), kind)).copied())
            .reduce(|a, b| {
                if a == LoadState::Ready && b == LoadState::Ready {
                    LoadState::Ready
                } else {
                    LoadState::Pending
                }
            })
    }

    /// The parsed module at a resolved path.
    pub fn resource(&self, path: &str) -> Option<Arc<Resource>> {
        self.modules.lock().get(path).cloned()
    }

    /// The injected text at a resolved path.
    pub fn text(&self, path: &str) -> Option<Arc<str>> {
        self.texts.lock().get(path).cloned()
    }

    /// Where `reference`, written in the file at `base`, resolved to.
    pub fn resolved(&self, base: &str, reference: &str) -> Option<String> {
        self.resolved
            .lock()
            .get(&(base.to_string(), reference.to_string()))
            .cloned()
    }

    /// Mark `path` pending in the requested form unless it was already
    /// seen. This map is what keeps a diamond dependency to a single fetch.
    fn schedule(&self, path: &str, kind: FetchKind) -> bool {
        let mut states = self.states.lock();
        let key = (path.to_string(), kind);
        if states.contains_key(&key) {
            return false;
        }
        trace!(path, ?kind, "scheduling fetch");
        states.insert(key, LoadState::Pending);
        true
    }

    async fn fetch(&self, request: Request) -> BuildResult<Fetched> {
        let Request { path, kind, origin } = request;
        let attributed = |kind: BuildErrorKind| match &origin {
            Some((from, span)) => BuildError::new(from.clone(), kind).with_range(*span),
            None => BuildError::new(path.clone(), kind),
        };

        if !self.handler.has(&path).await {
            return Err(attributed(BuildErrorKind::ResourceNotFound(path.clone())));
        }
        let source = self
            .handler
            .get(&path)
            .await
            .map_err(|e| attributed(BuildErrorKind::Fetch(format!("{path}: {e}"))))?;
        trace!(path = %path, bytes = source.len(), "fetched");

        match kind {
            FetchKind::Text => Ok(Fetched::Text { path, text: source }),
            FetchKind::Module => {
                let chunk = miniforge_parser::parse(&source, &path)
                    .map_err(|errors| BuildError::syntax(path.clone(), errors))?;
                Ok(Fetched::Module(Resource {
                    id: content_id(&source),
                    path,
                    source,
                    chunk,
                }))
            }
        }
    }

    /// Resolve every reference made by `resource` into fetch requests.
    async fn references(&self, resource: &Resource) -> Vec<Request> {
        let chunk = &resource.chunk;
        let natives: &[Reference] = if self.native_imports {
            &chunk.native_imports
        } else {
            &[]
        };
        let modules = chunk
            .imports
            .iter()
            .chain(&chunk.includes)
            .chain(natives)
            .map(|reference| (reference, FetchKind::Module));
        let texts = chunk
            .injects
            .iter()
            .map(|reference| (reference, FetchKind::Text));

        let mut requests = Vec::new();
        for (reference, kind) in modules.chain(texts) {
            let path = self.resolve(&resource.path, &reference.path).await;
            requests.push(Request {
                path,
                kind,
                origin: Some((resource.path.clone(), reference.span)),
            });
        }
        requests
    }

    /// Resolve a reference once per `(base, reference)` pair, falling back
    /// to the source extension when the path does not exist as written.
    async fn resolve(&self, base: &str, reference: &str) -> String {
        let key = (base.to_string(), reference.to_string());
        let cached = self.resolved.lock().get(&key).cloned();
        if let Some(path) = cached {
            return path;
        }

        let mut path = self.handler.resolve_relative_path(base, reference);
        if !path.ends_with(SOURCE_EXTENSION) && !self.handler.has(&path).await {
            let with_extension = format!("{path}{SOURCE_EXTENSION}");
            if self.handler.has(&with_extension).await {
                path = with_extension;
            }
        }
        self.resolved.lock().insert(key, path.clone());
        path
    }
}

impl fmt::Debug for ResourceGraphLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceGraphLoader")
            .field("native_imports", &self.native_imports)
            .field("states", &*self.states.lock())
            .finish_non_exhaustive()
    }
}

/// Hex SHA-256 of a source text.
pub fn content_id(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
