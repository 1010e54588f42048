use std::fmt;

/// Path separator.
pub const SEPARATOR: char = '/';

/// A normalized path through the link graph.
///
/// A leading separator makes the path absolute (resolved from the root
/// group); otherwise it is resolved from a caller-supplied starting group.
/// Repeated separators collapse and `.` components are dropped. `..` has no
/// special meaning and is treated as an ordinary link name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectPath {
    absolute: bool,
    components: Vec<String>,
}

impl ObjectPath {
    /// Parse and normalize a path string.
    pub fn parse(path: &str) -> Self {
        let absolute = path.starts_with(SEPARATOR);
        let components = path
            .split(SEPARATOR)
            .filter(|c| !c.is_empty() && *c != ".")
            .map(str::to_string)
            .collect();
        Self {
            absolute,
            components,
        }
    }

    /// The root group's path, `/`.
    pub fn root() -> Self {
        Self {
            absolute: true,
            components: Vec::new(),
        }
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Returns `true` for `/` and for the empty relative path.
    pub fn is_self(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// The last component, if any.
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// The path without its last component. `None` for `/` and `""`.
    pub fn parent(&self) -> Option<ObjectPath> {
        if self.components.is_empty() {
            return None;
        }
        Some(Self {
            absolute: self.absolute,
            components: self.components[..self.components.len() - 1].to_vec(),
        })
    }

    /// Append one component.
    pub fn join(&self, name: &str) -> ObjectPath {
        let mut components = self.components.clone();
        components.push(name.to_string());
        Self {
            absolute: self.absolute,
            components,
        }
    }

    /// Render the first `n` components, used in error messages.
    pub fn prefix(&self, n: usize) -> String {
        let n = n.min(self.components.len());
        let body = self.components[..n].join("/");
        if self.absolute {
            format!("/{body}")
        } else {
            body
        }
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix(self.components.len()))
    }
}
