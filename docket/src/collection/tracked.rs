use crate::collection::{Document, FieldPatch, FieldUpdate, Fields};
use crate::common::Value;
use crate::errors::{DocketError, DocketResult, ErrorKind};

/// Where a tracked document stands relative to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// The local view equals the last state read from the store.
    Clean,
    /// Local changes are staged and not yet acknowledged by the store.
    PendingWrite,
    /// The store changed a staged field to a different value, or the
    /// document disappeared, while local changes were pending.
    Conflict,
}

/// How to leave [EntityState::Conflict].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Keep the staged changes and write them again over the remote state.
    KeepLocal,
    /// Drop the staged changes and adopt the remote state.
    TakeRemote,
}

/// A document held by the application together with its unsaved edits.
///
/// Subscriptions deliver full snapshots, so an application that edits a
/// document optimistically needs to know whether a snapshot already
/// contains its own write, is older than it, or contradicts it.
/// `TrackedDocument` answers that with a small state machine:
///
/// ```text
/// Clean --stage--> PendingWrite --confirm/observe(all applied)--> Clean
///                  PendingWrite --reject--> Clean (local edits dropped)
///                  PendingWrite --observe(contradicting)--> Conflict
///                  Conflict --resolve(KeepLocal)--> PendingWrite
///                  Conflict --resolve(TakeRemote)--> Clean
/// ```
#[derive(Debug, Clone)]
pub struct TrackedDocument {
    id: String,
    // last state read from the store; None once the store lost the document
    base: Option<Fields>,
    local: Option<Fields>,
    pending: FieldPatch,
    state: EntityState,
}

impl TrackedDocument {
    /// Starts tracking a document read from the store.
    pub fn new(document: Document) -> Self {
        let id = document.id().to_string();
        let fields = document.into_fields();
        TrackedDocument {
            id,
            base: Some(fields.clone()),
            local: Some(fields),
            pending: FieldPatch::new(),
            state: EntityState::Clean,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    /// The fields as the application should display them, staged edits
    /// included. `None` if the document was deleted from the store.
    pub fn local(&self) -> Option<&Fields> {
        self.local.as_ref()
    }

    /// The last state read from the store.
    pub fn base(&self) -> Option<&Fields> {
        self.base.as_ref()
    }

    /// The staged edits, if any.
    pub fn pending(&self) -> Option<&FieldPatch> {
        if self.pending.is_empty() {
            None
        } else {
            Some(&self.pending)
        }
    }

    /// Stages an edit. Staging on top of pending edits folds them together.
    ///
    /// # Errors
    ///
    /// Fails with [ErrorKind::InvalidArgument] while in conflict and with
    /// [ErrorKind::InvalidFieldName] if the patch names a reserved field.
    pub fn stage(&mut self, patch: FieldPatch) -> DocketResult<()> {
        if self.state == EntityState::Conflict {
            log::error!("Cannot stage changes on {} while it is in conflict", self.id);
            return Err(DocketError::new(
                &format!("Cannot stage changes on {} while it is in conflict", self.id),
                ErrorKind::InvalidArgument,
            ));
        }
        patch.validate()?;

        let mut local = self.local.clone().unwrap_or_default();
        patch.apply(&mut local)?;
        self.local = Some(local);
        self.pending.merge(&patch);
        self.state = EntityState::PendingWrite;
        Ok(())
    }

    /// Marks the staged edits as written.
    pub fn confirm(&mut self) -> DocketResult<()> {
        self.expect_state(EntityState::PendingWrite, "confirm")?;
        self.base = self.local.clone();
        self.pending = FieldPatch::new();
        self.state = EntityState::Clean;
        Ok(())
    }

    /// Drops the staged edits after a failed write.
    pub fn reject(&mut self) -> DocketResult<()> {
        self.expect_state(EntityState::PendingWrite, "reject")?;
        self.local = self.base.clone();
        self.pending = FieldPatch::new();
        self.state = EntityState::Clean;
        Ok(())
    }

    /// Feeds the document's state from a newer snapshot; `None` means the
    /// snapshot no longer contains it.
    pub fn observe(&mut self, remote: Option<&Document>) {
        let remote = remote.map(|doc| doc.fields().clone());
        match self.state {
            EntityState::Clean => {
                self.local = remote.clone();
                self.base = remote;
            }
            EntityState::PendingWrite => match remote {
                None => {
                    log::debug!("{} was deleted while changes were pending", self.id);
                    self.base = None;
                    self.state = EntityState::Conflict;
                }
                Some(remote) => self.observe_while_pending(remote),
            },
            EntityState::Conflict => {
                self.base = remote;
            }
        }
    }

    /// Leaves [EntityState::Conflict].
    pub fn resolve(&mut self, resolution: Resolution) -> DocketResult<()> {
        self.expect_state(EntityState::Conflict, "resolve")?;
        match resolution {
            Resolution::KeepLocal => {
                let mut local = self.base.clone().unwrap_or_default();
                self.pending.apply(&mut local)?;
                self.local = Some(local);
                self.state = EntityState::PendingWrite;
            }
            Resolution::TakeRemote => {
                self.local = self.base.clone();
                self.pending = FieldPatch::new();
                self.state = EntityState::Clean;
            }
        }
        Ok(())
    }

    fn observe_while_pending(&mut self, remote: Fields) {
        let base = self.base.clone().unwrap_or_default();
        let mut all_applied = true;
        let mut contradicted = false;

        for (field, update) in self.pending.iter() {
            let remote_value = remote.get(field);
            let base_value = base.get(field);
            let applied = match update {
                FieldUpdate::Set(value) => remote_value == Some(value),
                FieldUpdate::Delete => remote_value.is_none(),
                FieldUpdate::ServerTimestamp => {
                    matches!(remote_value, Some(Value::Timestamp(_))) && remote_value != base_value
                }
            };
            if applied {
                continue;
            }
            all_applied = false;
            if remote_value != base_value && !matches!(update, FieldUpdate::ServerTimestamp) {
                contradicted = true;
            }
        }

        if contradicted {
            log::debug!("Remote change to {} contradicts pending changes", self.id);
            self.base = Some(remote);
            self.state = EntityState::Conflict;
        } else if all_applied {
            self.local = Some(remote.clone());
            self.base = Some(remote);
            self.pending = FieldPatch::new();
            self.state = EntityState::Clean;
        } else {
            // the snapshot predates our write; keep unrelated remote edits
            let mut local = remote.clone();
            if self.pending.apply(&mut local).is_ok() {
                self.local = Some(local);
            }
            self.base = Some(remote);
        }
    }

    fn expect_state(&self, expected: EntityState, operation: &str) -> DocketResult<()> {
        if self.state != expected {
            log::error!(
                "Cannot {} {} in state {:?}, expected {:?}",
                operation,
                self.id,
                self.state,
                expected
            );
            return Err(DocketError::new(
                &format!(
                    "Cannot {} {} in state {:?}",
                    operation, self.id, self.state
                ),
                ErrorKind::InvalidArgument,
            ));
        }
        Ok(())
    }
}
