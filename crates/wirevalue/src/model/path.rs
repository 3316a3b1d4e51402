//! Structured locations inside a decoded document.
//!
//! Decoders keep a [`Path`] of the node currently being decoded and snapshot
//! it into every error they raise.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::error::{ErrorKind, PathError};
use crate::model::{Type, Value, ValueKind};

/// One step from a container to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Object attribute.
    Attr(String),
    /// List or tuple element.
    Index(usize),
    /// Map entry or set element, keyed by the key or element value itself.
    Key(Value),
}

impl PathStep {
    /// Placeholder step for a set element whose value is not decoded yet.
    pub fn set_element(elem: &Type) -> PathStep {
        PathStep::Key(Value::unknown(elem.clone()))
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Attr(name) => write!(f, ".{name}"),
            PathStep::Index(i) => write!(f, "[{i}]"),
            PathStep::Key(key) => match key.kind() {
                ValueKind::String(s) => write!(f, "[{s:?}]"),
                ValueKind::Number(n) => write!(f, "[{n}]"),
                ValueKind::Bool(b) => write!(f, "[{b}]"),
                ValueKind::Unknown => f.write_str("[?]"),
                ValueKind::Null => f.write_str("[null]"),
                ValueKind::Seq(_) | ValueKind::Map(_) => {
                    write!(f, "[{}]", key.ty().friendly_name())
                }
            },
        }
    }
}

/// Renders a sequence of steps, e.g. `.x[0]["k"]`.
pub fn render_steps(steps: &[PathStep]) -> String {
    steps.iter().map(ToString::to_string).collect()
}

/// Mutable stack of path steps owned by a single decode call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push(&mut self, step: PathStep) {
        self.steps.push(step);
    }

    pub fn push_attr(&mut self, name: impl Into<String>) {
        self.push(PathStep::Attr(name.into()));
    }

    pub fn push_index(&mut self, index: usize) {
        self.push(PathStep::Index(index));
    }

    pub fn push_key(&mut self, key: Value) {
        self.push(PathStep::Key(key));
    }

    /// Removes the most recently pushed step.
    ///
    /// # Panics
    ///
    /// Panics if the path is empty: every pop must pair with an earlier push.
    pub fn pop(&mut self) -> PathStep {
        match self.steps.pop() {
            Some(step) => step,
            None => panic!("Path::pop called on an empty path"),
        }
    }

    /// Builds an error carrying a snapshot of the current path.
    pub fn error(&self, kind: ErrorKind, message: impl Into<String>) -> PathError {
        PathError {
            path: self.steps.clone(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_steps(&self.steps))
    }
}

/// Anything that owns a [`Path`] it descends with.
pub(crate) trait Tracked {
    fn path_mut(&mut self) -> &mut Path;
}

/// Pushes a step on creation and pops it on drop.
///
/// Derefs to the tracked owner, so a child decode runs through the guard and
/// an early `?` return still unwinds the path.
pub(crate) struct Descend<'a, T: Tracked> {
    owner: &'a mut T,
}

impl<'a, T: Tracked> Descend<'a, T> {
    pub(crate) fn new(owner: &'a mut T, step: PathStep) -> Self {
        owner.path_mut().push(step);
        Self { owner }
    }
}

impl<T: Tracked> Deref for Descend<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.owner
    }
}

impl<T: Tracked> DerefMut for Descend<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.owner
    }
}

impl<T: Tracked> Drop for Descend<'_, T> {
    fn drop(&mut self) {
        self.owner.path_mut().pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Walker {
        path: Path,
    }

    impl Tracked for Walker {
        fn path_mut(&mut self) -> &mut Path {
            &mut self.path
        }
    }

    impl Walker {
        fn fail_at_depth(&mut self, depth: usize) -> Result<(), PathError> {
            if depth == 0 {
                return Err(self.path.error(ErrorKind::ValueMismatch, "boom"));
            }
            let mut child = Descend::new(self, PathStep::Index(depth));
            child.fail_at_depth(depth - 1)?;
            Ok(())
        }
    }

    #[test]
    fn test_descend_pops_on_error() {
        let mut walker = Walker { path: Path::new() };
        let err = walker.fail_at_depth(3).unwrap_err();
        assert_eq!(
            err.path,
            vec![PathStep::Index(3), PathStep::Index(2), PathStep::Index(1)]
        );
        assert!(walker.path.is_empty());
    }

    #[test]
    fn test_error_snapshot_is_detached() {
        let mut path = Path::new();
        path.push_attr("x");
        let err = path.error(ErrorKind::StructuralMismatch, "bad");
        path.push_index(4);
        path.pop();
        path.pop();
        assert_eq!(err.path, vec![PathStep::Attr("x".to_string())]);
    }

    #[test]
    fn test_render() {
        let mut path = Path::new();
        path.push_attr("x");
        path.push_index(0);
        path.push_key(Value::string("k"));
        path.push(PathStep::set_element(&Type::String));
        assert_eq!(path.to_string(), r#".x[0]["k"][?]"#);
    }

    #[test]
    #[should_panic(expected = "empty path")]
    fn test_pop_empty_panics() {
        Path::new().pop();
    }
}
