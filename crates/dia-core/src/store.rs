//! Annotation store: built-in markers followed by user annotations.
//!
//! Built-ins are immutable and come from the dataset. User annotations are
//! addressed by their index in creation order; each also carries a stable
//! [`AnnotationId`] that survives index shifts on delete. Every mutation bumps
//! the revision and marks the store dirty so the session knows to persist.

use crate::dataset::{BuiltinAnnotation, Dataset};
use crate::error::DiaError;
use crate::id::{AnnotationId, TypeKey};
use crate::model::{Annotation, AnnotationPatch};
use kurbo::Point;

/// A read-only view of one store entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnnotationRef<'a> {
    Builtin {
        annotation: &'a BuiltinAnnotation,
        display_index: u32,
    },
    User {
        index: usize,
        id: AnnotationId,
        annotation: &'a Annotation,
    },
}

impl<'a> AnnotationRef<'a> {
    pub fn position(&self) -> Point {
        match self {
            AnnotationRef::Builtin { annotation, .. } => annotation.position(),
            AnnotationRef::User { annotation, .. } => annotation.position(),
        }
    }

    pub fn kind(&self) -> TypeKey {
        match self {
            AnnotationRef::Builtin { annotation, .. } => annotation.kind,
            AnnotationRef::User { annotation, .. } => annotation.kind,
        }
    }

    pub fn title(&self) -> &'a str {
        match *self {
            AnnotationRef::Builtin { annotation, .. } => &annotation.title,
            AnnotationRef::User { annotation, .. } => &annotation.title,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            AnnotationRef::Builtin { annotation, .. } => &annotation.description,
            AnnotationRef::User { annotation, .. } => &annotation.description,
        }
    }

    /// Number shown on the marker. User annotations count from 1 in list order.
    pub fn display_index(&self) -> u32 {
        match self {
            AnnotationRef::Builtin { display_index, .. } => *display_index,
            AnnotationRef::User { index, .. } => *index as u32 + 1,
        }
    }

    pub fn user_index(&self) -> Option<usize> {
        match self {
            AnnotationRef::User { index, .. } => Some(*index),
            AnnotationRef::Builtin { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnnotationStore {
    builtins: Vec<(AnnotationId, BuiltinAnnotation, u32)>,
    users: Vec<Annotation>,
    user_ids: Vec<AnnotationId>,
    max_users: usize,
    revision: u64,
    dirty: bool,
}

impl AnnotationStore {
    pub fn new(dataset: &Dataset, max_users: usize) -> Self {
        let builtins = dataset
            .markers()
            .zip(dataset.display_indices())
            .map(|(m, n)| (AnnotationId::next(), m.clone(), n))
            .collect();
        Self {
            builtins,
            users: Vec::new(),
            user_ids: Vec::new(),
            max_users,
            revision: 0,
            dirty: false,
        }
    }

    /// Replace the user list with a decoded one. Not a mutation: nothing to persist.
    pub fn load_users(&mut self, users: Vec<Annotation>) {
        let mut users: Vec<Annotation> = users
            .into_iter()
            .filter(|a| match a.validate() {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("not loading {}: {e}", a.title);
                    false
                }
            })
            .collect();
        users.truncate(self.max_users);
        self.user_ids = users.iter().map(|_| AnnotationId::next()).collect();
        self.users = users;
        self.revision += 1;
    }

    /// Every entry: built-ins first in dataset order, then user annotations.
    pub fn all(&self) -> impl Iterator<Item = AnnotationRef<'_>> {
        let builtins = self
            .builtins
            .iter()
            .map(|(_, annotation, display_index)| AnnotationRef::Builtin {
                annotation,
                display_index: *display_index,
            });
        let users = self
            .users
            .iter()
            .zip(&self.user_ids)
            .enumerate()
            .map(|(index, (annotation, id))| AnnotationRef::User {
                index,
                id: *id,
                annotation,
            });
        builtins.chain(users)
    }

    /// `all()` paired with stable ids, for keying render handles.
    pub fn all_with_ids(&self) -> impl Iterator<Item = (AnnotationId, AnnotationRef<'_>)> {
        let builtin_ids = self.builtins.iter().map(|(id, _, _)| *id);
        builtin_ids
            .chain(self.user_ids.iter().copied())
            .zip(self.all())
    }

    pub fn builtin_count(&self) -> usize {
        self.builtins.len()
    }

    /// User annotations in creation order: the persisted subset.
    pub fn users(&self) -> &[Annotation] {
        &self.users
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn max_users(&self) -> usize {
        self.max_users
    }

    pub fn is_full(&self) -> bool {
        self.users.len() >= self.max_users
    }

    pub fn user(&self, index: usize) -> Result<&Annotation, DiaError> {
        self.users.get(index).ok_or(DiaError::IndexOutOfRange {
            index,
            len: self.users.len(),
        })
    }

    pub fn user_id(&self, index: usize) -> Option<AnnotationId> {
        self.user_ids.get(index).copied()
    }

    pub fn index_of(&self, id: AnnotationId) -> Option<usize> {
        self.user_ids.iter().position(|&i| i == id)
    }

    /// Append a user annotation after validating it.
    pub fn add(&mut self, annotation: Annotation) -> Result<AnnotationId, DiaError> {
        if self.is_full() {
            return Err(DiaError::CapacityExceeded {
                max: self.max_users,
            });
        }
        annotation.validate()?;
        let id = AnnotationId::next();
        log::debug!("add user annotation {id} {:?}", annotation.title);
        self.users.push(annotation);
        self.user_ids.push(id);
        self.touch();
        Ok(id)
    }

    /// Apply a patch; the entry is left unchanged if the result is invalid.
    pub fn update(&mut self, index: usize, patch: &AnnotationPatch) -> Result<&Annotation, DiaError> {
        let next = patch.apply(self.user(index)?);
        next.validate()?;
        self.users[index] = next;
        self.touch();
        Ok(&self.users[index])
    }

    pub fn remove(&mut self, index: usize) -> Result<(AnnotationId, Annotation), DiaError> {
        self.user(index)?;
        let annotation = self.users.remove(index);
        let id = self.user_ids.remove(index);
        log::debug!("remove user annotation {id}");
        self.touch();
        Ok((id, annotation))
    }

    /// Remove every user annotation, returning their ids.
    pub fn clear(&mut self) -> Vec<AnnotationId> {
        self.users.clear();
        let ids = std::mem::take(&mut self.user_ids);
        self.touch();
        ids
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.dirty = true;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[cfg(test)]
    fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read and reset the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}
