use thiserror::Error;

use crate::session::SessionId;

use super::Point;

/// Shared point set plus the session currently allowed to change it.
///
/// At most one session holds the document at a time. Every structural
/// mutation names the acting session and is refused unless that session is
/// the holder.
#[derive(Debug, Default)]
pub struct Document {
    points: Vec<Point>,
    holder: Option<SessionId>,
}

/// Errors raised when a mutation is attempted without holding the document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// The acting session does not hold the document.
    #[error("{session} does not hold the graph (holder: {holder:?})")]
    NotHolder {
        /// Session that attempted the mutation.
        session: SessionId,
        /// Session holding the document at the time, if any.
        holder: Option<SessionId>,
    },
}

impl Document {
    /// Creates an empty, unlocked document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the document for `session`.
    ///
    /// Succeeds when the document is unlocked or already held by `session`.
    pub fn try_acquire(&mut self, session: SessionId) -> bool {
        match self.holder {
            None => {
                self.holder = Some(session);
                true
            }
            Some(holder) => holder == session,
        }
    }

    /// Unlocks the document if `session` holds it.
    ///
    /// Returns `true` only when this call cleared the holder.
    pub fn release(&mut self, session: SessionId) -> bool {
        if self.holder == Some(session) {
            self.holder = None;
            true
        } else {
            false
        }
    }

    /// Session currently holding the document.
    #[must_use]
    pub fn holder(&self) -> Option<SessionId> {
        self.holder
    }

    /// Returns `true` while any session holds the document.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.holder.is_some()
    }

    /// Points in insertion order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Removes every point.
    pub fn clear(&mut self, session: SessionId) -> Result<(), DocumentError> {
        self.ensure_holder(session)?;
        self.points.clear();
        Ok(())
    }

    /// Appends a point, keeping duplicates.
    pub fn push(&mut self, session: SessionId, point: Point) -> Result<(), DocumentError> {
        self.ensure_holder(session)?;
        self.points.push(point);
        Ok(())
    }

    /// Removes the first point matching `target` within the coordinate
    /// tolerance. Returns whether a point was removed.
    pub fn remove_matching(
        &mut self,
        session: SessionId,
        target: &Point,
    ) -> Result<bool, DocumentError> {
        self.ensure_holder(session)?;
        let Some(index) = self.points.iter().position(|p| p.approx_eq(target)) else {
            return Ok(false);
        };
        self.points.remove(index);
        Ok(true)
    }

    fn ensure_holder(&self, session: SessionId) -> Result<(), DocumentError> {
        if self.holder == Some(session) {
            Ok(())
        } else {
            Err(DocumentError::NotHolder {
                session,
                holder: self.holder,
            })
        }
    }
}
