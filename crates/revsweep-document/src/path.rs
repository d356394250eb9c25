//! Tree paths and the document ids derived from them.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An absolute path in the content tree, e.g. `/a/b`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path(String);

impl Path {
    /// Parse an absolute path. The root is `/`; other paths must not end
    /// with `/` or contain empty segments.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path == "/" {
            return Ok(Path(path));
        }
        if !path.starts_with('/') || path[1..].split('/').any(str::is_empty) {
            return Err(StoreError::InvalidPath(path));
        }
        Ok(Path(path))
    }

    /// The root path `/`.
    pub fn root() -> Self {
        Path("/".to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of segments; the root has depth 0.
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.matches('/').count()
        }
    }

    /// The last segment, empty for the root.
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => "",
        }
    }

    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Path::root()),
            Some(idx) => Some(Path(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// The ancestor (or self) at the given depth, `None` if `depth` is
    /// greater than the depth of this path.
    pub fn ancestor_at_depth(&self, depth: usize) -> Option<Path> {
        let own = self.depth();
        if depth > own {
            return None;
        }
        if depth == 0 {
            return Some(Path::root());
        }
        let end = self
            .0
            .match_indices('/')
            .nth(depth)
            .map(|(idx, _)| idx)
            .unwrap_or(self.0.len());
        Some(Path(self.0[..end].to_string()))
    }

    /// A child of this path.
    pub fn child(&self, name: &str) -> Result<Path> {
        if name.is_empty() || name.contains('/') {
            return Err(StoreError::InvalidPath(format!("{}/{}", self.0, name)));
        }
        if self.is_root() {
            Ok(Path(format!("/{}", name)))
        } else {
            Ok(Path(format!("{}/{}", self.0, name)))
        }
    }

    /// The document id for this path: `<depth>:<path>`.
    pub fn to_id(&self) -> String {
        format!("{}:{}", self.depth(), self.0)
    }

    /// Parse a document id back into its path, verifying the depth prefix.
    pub fn from_id(id: &str) -> Result<Path> {
        let (depth, path) = id
            .split_once(':')
            .ok_or_else(|| StoreError::InvalidId(id.to_string()))?;
        let depth: usize = depth
            .parse()
            .map_err(|_| StoreError::InvalidId(id.to_string()))?;
        let path = Path::new(path)?;
        if path.depth() != depth {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(path)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Path {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self> {
        Path::new(value)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.0
    }
}
