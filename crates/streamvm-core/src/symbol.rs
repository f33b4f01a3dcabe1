//! Symbol table: reference-counted resource handle slots.
//!
//! A symbol is a caller-chosen identifier standing in for a resource handle
//! that may not have been computed yet. The table owns every slot; the rest
//! of the engine refers to symbols by identifier only, never by address.
//! Each slot moves through exactly one lifecycle:
//! unresolved, then resolved (payload bound once), then retired (removed
//! when the reference count reaches zero).

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VmError};

/// Caller-chosen identifier for a logical resource handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(u64);

impl SymbolId {
    /// Create a symbol identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw identifier value.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SymbolId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Opaque payload bound to a symbol at resolution.
///
/// The payload is exclusively owned by the defining instruction until
/// resolution; afterwards it is immutable and shared read-only by every
/// instruction that retained the symbol.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Resolution state of a live symbol slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolState {
    /// Declared, payload not yet bound.
    Unresolved,
    /// Payload bound; immutable from here on.
    Resolved,
}

/// One live slot in the table.
struct Slot {
    state: SymbolState,
    /// Readers that have not completed, plus one pending-definition hold
    /// taken at declaration and released when the defining instruction
    /// resolves the symbol.
    refs: usize,
    payload: Option<Payload>,
}

/// Maps symbol identifiers to resource handle slots and tracks liveness.
///
/// Not internally synchronized; the scheduler wraps the table in a mutex
/// and grants exclusive access for the duration of each operation.
#[derive(Default)]
pub struct SymbolTable {
    slots: HashMap<SymbolId, Slot>,
    retired: u64,
}

impl SymbolTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an unresolved slot with reference count 1.
    ///
    /// The initial count is the pending-definition hold, released when the
    /// defining instruction resolves the symbol. An identifier retired
    /// earlier may be declared again; by then nothing can still reference
    /// its previous life.
    pub fn declare(&mut self, id: SymbolId) -> Result<()> {
        if self.slots.contains_key(&id) {
            return Err(VmError::DuplicateSymbol(id));
        }
        self.slots.insert(
            id,
            Slot {
                state: SymbolState::Unresolved,
                refs: 1,
                payload: None,
            },
        );
        Ok(())
    }

    /// Bind a payload to an unresolved symbol.
    ///
    /// Fails with [`VmError::AlreadyResolved`] on a second resolution; the
    /// prior payload is never overwritten.
    pub fn resolve(&mut self, id: SymbolId, payload: Payload) -> Result<()> {
        let slot = self.slots.get_mut(&id).ok_or(VmError::UnknownSymbol(id))?;
        if slot.state != SymbolState::Unresolved {
            return Err(VmError::AlreadyResolved(id));
        }
        slot.state = SymbolState::Resolved;
        slot.payload = Some(payload);
        Ok(())
    }

    /// Remove a declaration that is being rolled back.
    ///
    /// The slot never lived past admission, so removal does not count as
    /// a retirement. Fails once the symbol has been resolved.
    pub fn undeclare(&mut self, id: SymbolId) -> Result<()> {
        let slot = self.slots.get(&id).ok_or(VmError::UnknownSymbol(id))?;
        if slot.state == SymbolState::Resolved {
            return Err(VmError::AlreadyResolved(id));
        }
        self.slots.remove(&id);
        Ok(())
    }

    /// Add a reader hold for a not-yet-completed instruction.
    pub fn retain(&mut self, id: SymbolId) -> Result<()> {
        let slot = self.slots.get_mut(&id).ok_or(VmError::UnknownSymbol(id))?;
        slot.refs += 1;
        Ok(())
    }

    /// Drop one hold; retires (removes) the slot when the count hits zero.
    ///
    /// Returns `true` when this release retired the symbol.
    pub fn release(&mut self, id: SymbolId) -> Result<bool> {
        let slot = self.slots.get_mut(&id).ok_or(VmError::UnknownSymbol(id))?;
        slot.refs -= 1;
        if slot.refs == 0 {
            self.slots.remove(&id);
            self.retired += 1;
            return Ok(true);
        }
        Ok(false)
    }

    /// Whether the symbol's payload has been bound.
    pub fn is_resolved(&self, id: SymbolId) -> Result<bool> {
        let slot = self.slots.get(&id).ok_or(VmError::UnknownSymbol(id))?;
        Ok(slot.state == SymbolState::Resolved)
    }

    /// Shared handle to a resolved symbol's payload.
    pub fn payload(&self, id: SymbolId) -> Result<Payload> {
        let slot = self.slots.get(&id).ok_or(VmError::UnknownSymbol(id))?;
        slot.payload.clone().ok_or(VmError::Unresolved(id))
    }

    /// Current reference count of a live symbol.
    pub fn ref_count(&self, id: SymbolId) -> Result<usize> {
        let slot = self.slots.get(&id).ok_or(VmError::UnknownSymbol(id))?;
        Ok(slot.refs)
    }

    /// Whether the identifier is currently live.
    pub fn contains(&self, id: SymbolId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Number of live symbols.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no symbol is live.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Total symbols retired since construction.
    pub fn retired(&self) -> u64 {
        self.retired
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTable")
            .field("live", &self.slots.len())
            .field("retired", &self.retired)
            .finish()
    }
}
