//! Topology I/O session
//!
//! One [`TopologyIo`] owns the parsed document of one topology file. Every
//! mutation is applied to the in-memory tree and then written, unless a batch
//! is open; the outermost [`TopologyIo::end_batch`] performs the single write
//! for everything applied inside it.

use crate::config::TopologyIoConfig;
use crate::error::{IoError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::Instant;
use topo_annotations::{AnnotationStore, FsStorage, NodePosition, Storage, TopologyAnnotations};
use topo_model::{LinkIdentity, LinkSaveData, NodeSaveData, Renamed, SaveResult};
use topo_yaml::Document;
use tracing::{debug, error, info, warn};

/// Content a missing topology file starts from
const NEW_TOPOLOGY: &str = "topology:\n  nodes: {}\n";

/// Editing session over one topology file and its annotation sidecar
#[derive(Debug)]
pub struct TopologyIo {
    config: TopologyIoConfig,
    storage: Arc<dyn Storage>,
    annotations: Arc<AnnotationStore>,
    path: PathBuf,
    document: Document,
    /// Open batches; writes are deferred while non-zero
    batch_depth: usize,
    /// In-memory tree changed since the last write
    dirty: bool,
    suppress_until: Option<Instant>,
}

impl TopologyIo {
    /// Open a topology file on the local filesystem
    ///
    /// # Errors
    /// See [`TopologyIo::open_with`]
    pub async fn open(path: impl Into<PathBuf>, config: TopologyIoConfig) -> Result<Self> {
        Self::open_with(path, config, Arc::new(FsStorage)).await
    }

    /// Open a topology file through `storage`
    ///
    /// A missing file opens as a topology with no nodes; the first write
    /// creates it.
    ///
    /// # Errors
    /// - `IoError::Io` if the file cannot be read
    /// - `IoError::Parse` if it is not valid YAML
    pub async fn open_with(
        path: impl Into<PathBuf>,
        config: TopologyIoConfig,
        storage: Arc<dyn Storage>,
    ) -> Result<Self> {
        let path = path.into();
        let annotations = AnnotationStore::with_freshness(storage.clone(), config.annotation_freshness())
            .with_suffix(config.annotation_suffix.clone());
        let document = read_document(storage.as_ref(), &path, config.indent).await?;
        debug!(path = %path.display(), "topology opened");

        Ok(Self {
            config,
            storage,
            annotations: Arc::new(annotations),
            path,
            document,
            batch_depth: 0,
            dirty: false,
            suppress_until: None,
        })
    }

    /// Re-read the topology file, discarding unwritten changes
    ///
    /// Open batches are abandoned and the cached annotations dropped.
    ///
    /// # Errors
    /// Same as [`TopologyIo::open_with`]; the current document is kept on failure
    pub async fn reload(&mut self) -> Result<()> {
        self.document = read_document(self.storage.as_ref(), &self.path, self.config.indent).await?;
        if self.dirty || self.batch_depth > 0 {
            warn!(path = %self.path.display(), batches = self.batch_depth, "reload discarded pending changes");
        }
        self.dirty = false;
        self.batch_depth = 0;
        self.annotations.clear_cache(Some(&self.path)).await;
        debug!(path = %self.path.display(), "topology reloaded");
        Ok(())
    }

    /// Topology file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Session configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TopologyIoConfig {
        &self.config
    }

    /// In-memory document, including changes not yet written
    #[inline]
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Node identifiers in document order
    #[must_use]
    pub fn node_ids(&self) -> Vec<String> {
        topo_model::node_ids(&self.document)
    }

    /// Links read back as typed save data
    #[must_use]
    pub fn links(&self) -> Vec<LinkSaveData> {
        topo_model::read_links(&self.document)
    }

    /// Annotation store shared by this session
    #[inline]
    #[must_use]
    pub fn annotation_store(&self) -> &Arc<AnnotationStore> {
        &self.annotations
    }

    /// Current annotations of this topology
    ///
    /// # Errors
    /// `IoError::Annotation` if the sidecar cannot be read or parsed
    pub async fn load_annotations(&self) -> Result<TopologyAnnotations> {
        Ok(self.annotations.load(&self.path, false).await?)
    }

    /// Whether file-change notifications should currently be treated as our own write
    #[must_use]
    pub fn is_suppressing_external_changes(&self) -> bool {
        self.suppress_until.is_some_and(|until| Instant::now() < until)
    }

    /// Add a node; a position, if given, goes to the sidecar
    pub async fn add_node(&mut self, data: &NodeSaveData) -> SaveResult {
        let kind = self.config.default_kind.clone();
        if let Err(err) = self.apply(|doc| topo_model::add_node(doc, data, &kind)).await {
            return SaveResult::failed(err);
        }
        if let Some(position) = data.position {
            let id = data.target_id().to_string();
            self.cascade("position", move |a| a.set_node_position(&id, position))
                .await;
        }
        SaveResult::ok()
    }

    /// Edit a node, renaming it when `name` differs from `id`
    ///
    /// A rename rewrites the node's links and re-keys its annotations.
    pub async fn edit_node(&mut self, data: &NodeSaveData) -> SaveResult {
        let strict = self.config.strict_edit;
        let renamed = match self.apply(|doc| topo_model::edit_node(doc, data, strict)).await {
            Ok(renamed) => renamed,
            Err(err) => return SaveResult::failed(err),
        };

        let position = data.position;
        let target = data.target_id().to_string();
        if renamed.is_some() || position.is_some() {
            let rename = renamed.clone();
            self.cascade("rename", move |a| {
                if let Some(Renamed { old_id, new_id }) = &rename {
                    a.rename_node(old_id, new_id);
                }
                if let Some(position) = position {
                    a.set_node_position(&target, position);
                }
            })
            .await;
        }

        match renamed {
            Some(renamed) => {
                info!(path = %self.path.display(), old = %renamed.old_id, new = %renamed.new_id, "node renamed");
                SaveResult::renamed(renamed.old_id, renamed.new_id)
            }
            None => SaveResult::ok(),
        }
    }

    /// Delete a node, its links and its annotations
    pub async fn delete_node(&mut self, id: &str) -> SaveResult {
        let pruned = match self.apply(|doc| topo_model::delete_node(doc, id)).await {
            Ok(pruned) => pruned,
            Err(err) => return SaveResult::failed(err),
        };
        debug!(node = %id, links = pruned, "node deleted");

        let id = id.to_string();
        self.cascade("delete", move |a| {
            a.remove_node(&id);
        })
        .await;
        SaveResult::ok()
    }

    /// Add a link
    pub async fn add_link(&mut self, link: &LinkSaveData) -> SaveResult {
        self.apply(|doc| topo_model::add_link(doc, link)).await.into()
    }

    /// Replace the link named by `link.original` (or by its own endpoints)
    pub async fn edit_link(&mut self, link: &LinkSaveData) -> SaveResult {
        self.apply(|doc| topo_model::edit_link(doc, link)).await.into()
    }

    /// Delete every link with the identity's canonical key
    pub async fn delete_link(&mut self, identity: &LinkIdentity) -> SaveResult {
        self.apply(|doc| topo_model::delete_link(doc, identity))
            .await
            .map(|_| ())
            .into()
    }

    /// Record node positions in the sidecar
    pub async fn save_positions(&self, positions: Vec<NodePosition>) -> SaveResult {
        self.modify_annotations(move |a| {
            for NodePosition { id, position } in positions {
                a.set_node_position(&id, position);
            }
        })
        .await
    }

    /// Atomic read-modify-write of this topology's annotations
    pub async fn modify_annotations<F>(&self, apply: F) -> SaveResult
    where
        F: FnOnce(&mut TopologyAnnotations) + Send,
    {
        self.annotations
            .modify(&self.path, apply)
            .await
            .map(|_| ())
            .into()
    }

    /// Open a batch; writes wait for the matching outermost [`end_batch`](Self::end_batch)
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
        debug!(path = %self.path.display(), depth = self.batch_depth, "batch opened");
    }

    /// Close a batch, writing once when the outermost one closes
    pub async fn end_batch(&mut self) -> SaveResult {
        match self.batch_depth {
            0 => {
                warn!(path = %self.path.display(), "end_batch without an open batch");
                SaveResult::ok()
            }
            1 => {
                self.batch_depth = 0;
                self.flush().await
            }
            _ => {
                self.batch_depth -= 1;
                SaveResult::ok()
            }
        }
    }

    /// Write pending changes now, regardless of open batches
    pub async fn flush(&mut self) -> SaveResult {
        self.write().await.map(|_| ()).into()
    }

    /// Apply one operation to the tree, then write unless batching
    ///
    /// Outside a batch a failed write restores the tree, so the caller can
    /// retry the same operation.
    async fn apply<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Document) -> topo_model::Result<T>,
    {
        if self.batch_depth > 0 {
            let value = op(&mut self.document)?;
            self.dirty = true;
            return Ok(value);
        }

        let snapshot = self.document.clone();
        let was_dirty = self.dirty;
        let value = op(&mut self.document)?;
        self.dirty = true;
        if let Err(err) = self.write().await {
            self.document = snapshot;
            self.dirty = was_dirty;
            debug!(path = %self.path.display(), "rolled back unwritten change");
            return Err(err);
        }
        Ok(value)
    }

    /// Serialize and write unless the file already holds the same bytes
    ///
    /// Returns whether a physical write happened.
    async fn write(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        let content = self.document.serialize();
        let on_disk = self
            .storage
            .read(&self.path)
            .await
            .map_err(|err| IoError::io(&self.path, err))?;

        if on_disk.as_deref() == Some(content.as_bytes()) {
            debug!(path = %self.path.display(), "topology unchanged, skipping write");
            self.dirty = false;
            return Ok(false);
        }

        self.suppress_until = Some(Instant::now() + self.config.suppression_window());
        if let Err(err) = self.storage.write(&self.path, content.as_bytes()).await {
            error!(path = %self.path.display(), error = %err, "topology write failed");
            return Err(IoError::io(&self.path, err));
        }
        self.dirty = false;
        info!(path = %self.path.display(), bytes = content.len(), "topology saved");
        Ok(true)
    }

    /// Best-effort annotation follow-up of a committed topology change
    async fn cascade<F>(&self, what: &'static str, apply: F)
    where
        F: FnOnce(&mut TopologyAnnotations) + Send,
    {
        if let Err(err) = self.annotations.modify(&self.path, apply).await {
            warn!(path = %self.path.display(), cascade = what, error = %err, "annotation cascade failed");
        }
    }
}

async fn read_document(storage: &dyn Storage, path: &Path, indent: usize) -> Result<Document> {
    let bytes = storage.read(path).await.map_err(|err| {
        error!(path = %path.display(), error = %err, "topology read failed");
        IoError::io(path, err)
    })?;
    let text = match bytes {
        Some(bytes) => String::from_utf8(bytes).map_err(|err| {
            IoError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        })?,
        None => NEW_TOPOLOGY.to_string(),
    };
    let document = Document::parse(&text).map_err(|source| IoError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(document.with_indent_step(indent))
}
