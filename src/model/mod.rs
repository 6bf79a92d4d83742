pub mod points;
pub mod polyarea;

pub use points::Points;
pub use polyarea::{FaceTag, PolyArea};

use crate::error::{ModelError, Result};

/// A polygonal model: one shared point pool plus tagged faces.
///
/// Faces are lists of pool indices, counter-clockwise viewed from their
/// normal side. Every face carries a [`FaceTag`]; the two sequences stay
/// parallel because [`Model::add_face`] is the only mutator.
#[derive(Debug, Clone, Default)]
pub struct Model {
    /// Shared point pool.
    pub points: Points,
    faces: Vec<Vec<usize>>,
    face_data: Vec<FaceTag>,
}

impl Model {
    /// Creates an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a face and its tag, returning the face index.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::FaceTooSmall` for loops under three vertices and
    /// `ModelError::PointOutOfRange` when the face references a pool entry
    /// that does not exist.
    pub fn add_face(&mut self, face: Vec<usize>, tag: FaceTag) -> Result<usize> {
        if face.len() < 3 {
            return Err(ModelError::FaceTooSmall(face.len()).into());
        }
        for &i in &face {
            if i >= self.points.len() {
                return Err(ModelError::PointOutOfRange {
                    index: i,
                    len: self.points.len(),
                }
                .into());
            }
        }
        let idx = self.faces.len();
        self.faces.push(face);
        self.face_data.push(tag);
        Ok(idx)
    }

    /// Returns a face's vertex loop.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::FaceOutOfRange` if the index does not exist.
    pub fn face(&self, index: usize) -> Result<&[usize]> {
        self.faces.get(index).map(Vec::as_slice).ok_or_else(|| {
            ModelError::FaceOutOfRange {
                index,
                len: self.faces.len(),
            }
            .into()
        })
    }

    /// Returns a face's tag.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::FaceOutOfRange` if the index does not exist.
    pub fn face_tag(&self, index: usize) -> Result<FaceTag> {
        self.face_data.get(index).copied().ok_or_else(|| {
            ModelError::FaceOutOfRange {
                index,
                len: self.faces.len(),
            }
            .into()
        })
    }

    /// All face loops, indexed by face index.
    #[must_use]
    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    /// Number of faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}
