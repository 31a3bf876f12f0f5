//! Working path operations
//!
//! The path is always absolute and never carries a trailing `/` unless it is
//! exactly `/`. Commands that take a path parameter enter the child, act on
//! the resulting path, then roll back with [`WorkingPath::rollback`].

use crate::error::NavigateError;

#[derive(Debug, Clone)]
pub struct WorkingPath {
    path: String,
    max_len: usize,
}

impl WorkingPath {
    pub fn new(max_len: usize) -> Self {
        Self {
            path: "/".to_string(),
            max_len,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    pub fn reset(&mut self) {
        self.path.clear();
        self.path.push('/');
    }

    /// Replaces the path with `name` if it is absolute, otherwise appends it
    /// as a child. Trailing separators are stripped. Leaves the path untouched
    /// if the result would exceed the configured maximum.
    pub fn open_child(&mut self, name: &str) -> Result<(), NavigateError> {
        let mut next = if name.starts_with('/') {
            name.to_string()
        } else {
            let mut joined = self.path.clone();
            if joined.len() > 1 {
                joined.push('/');
            }
            joined.push_str(name);
            joined
        };

        while next.len() > 1 && next.ends_with('/') {
            next.pop();
        }

        if next.len() > self.max_len {
            return Err(NavigateError::PathTooLong(next.len()));
        }

        self.path = next;
        Ok(())
    }

    /// Moves to the parent directory (CDUP). The root is its own parent.
    pub fn close_child(&mut self) {
        match self.path.rfind('/') {
            Some(0) | None => self.reset(),
            Some(idx) => self.path.truncate(idx),
        }
    }

    /// Removes exactly `name` plus its separator, inverting a relative
    /// `open_child(name)`.
    pub fn return_to_previous(&mut self, name: &str) {
        let keep = self.path.len().saturating_sub(name.len());
        if !self.path.is_char_boundary(keep) {
            self.reset();
            return;
        }

        self.path.truncate(keep);
        if self.path.len() > 1 && self.path.ends_with('/') {
            self.path.pop();
        }
        if self.path.is_empty() {
            self.reset();
        }
    }

    /// Undoes `open_child(name)`. Plain components are stripped in place;
    /// anything else (absolute, nested, trailing slash) restores `previous`.
    pub fn rollback(&mut self, name: &str, previous: &str) {
        if is_plain_component(name) {
            self.return_to_previous(name);
        } else {
            self.path.clear();
            self.path.push_str(previous);
        }
    }
}

fn is_plain_component(name: &str) -> bool {
    !name.is_empty() && !name.contains('/')
}
