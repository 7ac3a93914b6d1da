//! Document insert pipeline and per-kind insert hooks.
//!
//! Content kinds register the insert-time behavior they need against a
//! [`HookRegistry`]; the [`DocumentPipeline`] looks hooks up by the inserted
//! document's [`DocKind`] and runs them around the store insert:
//!
//! 1. assign an id if the document has none
//! 2. run every before-insert hook, awaiting each in registration order
//! 3. hand the (possibly mutated) document to the store
//! 4. run every after-insert hook against the stored document
//!
//! Any error aborts the remaining steps. Nothing is rolled back: a failing
//! after-insert hook leaves the document stored.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tbio_docs::{DocKind, Document, DocumentStore, generate_id};
use tracing::debug;

use crate::{ProfileError, RequestContext};

/// Behavior attached to the insert of one document kind.
#[async_trait]
pub trait InsertHook: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Runs before the document is stored and may modify it.
    async fn before_insert(
        &self,
        _ctx: &RequestContext,
        _doc: &mut Document,
    ) -> Result<(), ProfileError> {
        Ok(())
    }

    /// Runs after the document has been stored.
    async fn after_insert(
        &self,
        _ctx: &RequestContext,
        _doc: &Document,
    ) -> Result<(), ProfileError> {
        Ok(())
    }
}

/// Insert hooks keyed by document kind.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<DocKind, Vec<Arc<dyn InsertHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a hook to inserts of `kind`. Hooks run in registration order.
    pub fn register(&mut self, kind: DocKind, hook: Arc<dyn InsertHook>) {
        debug!(?kind, hook = hook.name(), "registered insert hook");
        self.hooks.entry(kind).or_default().push(hook);
    }

    pub fn hooks_for(&self, kind: DocKind) -> &[Arc<dyn InsertHook>] {
        self.hooks.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// The insert path every new document goes through.
pub struct DocumentPipeline {
    store: Arc<dyn DocumentStore>,
    hooks: HookRegistry,
}

impl DocumentPipeline {
    pub fn new(store: Arc<dyn DocumentStore>, hooks: HookRegistry) -> Self {
        Self { store, hooks }
    }

    /// Insert a document, running the hooks registered for its kind.
    pub async fn insert(
        &self,
        ctx: &RequestContext,
        mut doc: Document,
    ) -> Result<Document, ProfileError> {
        if doc.id().is_none() {
            doc.set_id(generate_id());
        }
        let kind = doc.kind();
        let hooks = self.hooks.hooks_for(kind);

        for hook in hooks {
            hook.before_insert(ctx, &mut doc).await?;
        }

        let stored = self.store.insert(doc).await?;

        for hook in hooks {
            hook.after_insert(ctx, &stored).await?;
        }

        debug!(
            id = stored.id().unwrap_or_default(),
            ?kind,
            hooks = hooks.len(),
            "inserted document"
        );
        Ok(stored)
    }
}
