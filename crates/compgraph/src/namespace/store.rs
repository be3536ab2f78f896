//! Write-once hierarchical store addressed by dot-delimited paths

use indexmap::IndexMap;

/// Separator between path segments
pub const SEPARATOR: char = '.';

/// A single slot in a [`Namespace`]
#[derive(Debug, Clone)]
enum Entry<T> {
    Branch(Namespace<T>),
    Leaf(T),
}

/// Borrowed view of whatever lives at a path
#[derive(Debug)]
pub enum NamespaceRef<'a, T> {
    /// A leaf value
    Leaf(&'a T),
    /// A container holding further paths
    Branch(&'a Namespace<T>),
}

/// Hierarchical mapping from dotted paths to leaf values.
///
/// Each leaf can be written exactly once. Intermediate segments are created
/// on demand and must never collide with an existing leaf.
#[derive(Debug, Clone)]
pub struct Namespace<T> {
    entries: IndexMap<String, Entry<T>>,
}

impl<T> Default for Namespace<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<T> Namespace<T> {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` at `path`.
    ///
    /// Fails if the path is malformed, if any prefix of it is already a
    /// leaf, or if the final key is already occupied.
    pub fn set(&mut self, path: &str, value: T) -> Result<(), NamespaceError> {
        let segments = split_path(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| NamespaceError::InvalidPath(path.to_string()))?;

        let mut current = self;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = current
                .entries
                .entry((*segment).to_string())
                .or_insert_with(|| Entry::Branch(Namespace::new()));

            current = match entry {
                Entry::Branch(branch) => branch,
                Entry::Leaf(_) => {
                    return Err(NamespaceError::Structure {
                        path: path.to_string(),
                        leaf: join_path(&parents[..=depth]),
                    })
                }
            };
        }

        if current.entries.contains_key(*last) {
            return Err(NamespaceError::Collision(path.to_string()));
        }

        current.entries.insert((*last).to_string(), Entry::Leaf(value));
        Ok(())
    }

    /// Look up a leaf value. Absent paths, malformed paths and containers
    /// all yield `None`.
    pub fn get(&self, path: &str) -> Option<&T> {
        match self.lookup(path)? {
            NamespaceRef::Leaf(value) => Some(value),
            NamespaceRef::Branch(_) => None,
        }
    }

    /// Look up a container
    pub fn get_branch(&self, path: &str) -> Option<&Namespace<T>> {
        match self.lookup(path)? {
            NamespaceRef::Branch(branch) => Some(branch),
            NamespaceRef::Leaf(_) => None,
        }
    }

    /// Look up whatever lives at `path`
    pub fn lookup(&self, path: &str) -> Option<NamespaceRef<'_, T>> {
        let segments = split_path(path).ok()?;
        let mut current = NamespaceRef::Branch(self);

        for segment in segments {
            current = match current {
                NamespaceRef::Branch(branch) => match branch.entries.get(segment)? {
                    Entry::Branch(inner) => NamespaceRef::Branch(inner),
                    Entry::Leaf(value) => NamespaceRef::Leaf(value),
                },
                NamespaceRef::Leaf(_) => return None,
            };
        }

        Some(current)
    }

    /// Strict accessor: like [`Namespace::get`] but explains why a path
    /// could not be resolved to a leaf.
    pub fn require(&self, path: &str) -> Result<&T, NamespaceError> {
        let segments = split_path(path)?;
        let mut current = self;

        for (depth, segment) in segments.iter().enumerate() {
            let is_last = depth + 1 == segments.len();
            match current.entries.get(*segment) {
                None => {
                    return Err(NamespaceError::NotFound {
                        path: path.to_string(),
                        segment: join_path(&segments[..=depth]),
                    })
                }
                Some(Entry::Leaf(value)) if is_last => return Ok(value),
                Some(Entry::Leaf(_)) => {
                    return Err(NamespaceError::Structure {
                        path: path.to_string(),
                        leaf: join_path(&segments[..=depth]),
                    })
                }
                Some(Entry::Branch(_)) if is_last => {
                    return Err(NamespaceError::NotALeaf(path.to_string()))
                }
                Some(Entry::Branch(branch)) => current = branch,
            }
        }

        Err(NamespaceError::InvalidPath(path.to_string()))
    }

    /// Whether a leaf or container exists at `path`
    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Names of the direct children, in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of leaves in the whole tree
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Depth-first iteration over `(full path, leaf)` pairs in insertion
    /// order. Containers are never yielded.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            stack: vec![(String::new(), self.entries.iter())],
        }
    }
}

impl<'a, T> IntoIterator for &'a Namespace<T> {
    type Item = (String, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy depth-first iterator over the leaves of a [`Namespace`]
pub struct Iter<'a, T> {
    stack: Vec<(String, indexmap::map::Iter<'a, String, Entry<T>>)>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (String, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (prefix, entries) = self.stack.last_mut()?;
            let Some((key, entry)) = entries.next() else {
                self.stack.pop();
                continue;
            };

            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}{}{}", prefix, SEPARATOR, key)
            };

            match entry {
                Entry::Leaf(value) => return Some((path, value)),
                Entry::Branch(branch) => self.stack.push((path, branch.entries.iter())),
            }
        }
    }
}

fn split_path(path: &str) -> Result<Vec<&str>, NamespaceError> {
    let segments: Vec<&str> = path.split(SEPARATOR).collect();
    if path.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return Err(NamespaceError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

fn join_path(segments: &[&str]) -> String {
    segments.join(".")
}

/// Errors raised by [`Namespace`] operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    #[error("Invalid namespace path: '{0}'")]
    InvalidPath(String),

    #[error("Cannot traverse '{path}': '{leaf}' holds a value, not a namespace")]
    Structure { path: String, leaf: String },

    #[error("Namespace '{0}' is already set")]
    Collision(String),

    #[error("Namespace '{path}' not found (missing '{segment}')")]
    NotFound { path: String, segment: String },

    #[error("Namespace '{0}' is a container, not a value")]
    NotALeaf(String),
}
