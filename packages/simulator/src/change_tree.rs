//! Change trees describe one random edit of a document.
//!
//! A change list holds one entry per child of a node: either a code for the
//! child itself or a nested list for the child's own children. In JSON a
//! tree reads like `[0, [2, 0], 3]`.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type ChangeList = Vec<ChangeTree>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeTree {
    Code(u8),
    Nested(ChangeList),
}

/// What a change code does to the child it is assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    None,
    /// Set a random synthetic attribute
    ModifyAttribute,
    /// Insert a new node before the child
    InsertBefore,
    Delete,
    /// Insert a new node, then delete the child
    Replace,
    /// Only valid as the single entry of the root list: append a comment
    /// to the root
    RootComment,
}

impl ChangeKind {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::ModifyAttribute),
            2 => Some(Self::InsertBefore),
            3 => Some(Self::Delete),
            4 => Some(Self::Replace),
            5 => Some(Self::RootComment),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::ModifyAttribute => 1,
            Self::InsertBefore => 2,
            Self::Delete => 3,
            Self::Replace => 4,
            Self::RootComment => 5,
        }
    }
}

/// Change list for the root-level edit
pub fn root_comment() -> ChangeList {
    vec![ChangeTree::Code(ChangeKind::RootComment.code())]
}

pub fn is_root_comment(changes: &[ChangeTree]) -> bool {
    matches!(changes, [ChangeTree::Code(5)])
}

/// True when some entry, at any depth, is a non-zero code
pub fn has_change_markers(changes: &[ChangeTree]) -> bool {
    changes.iter().any(|change| match change {
        ChangeTree::Code(code) => *code > 0,
        ChangeTree::Nested(nested) => has_change_markers(nested),
    })
}

/// Compact JSON form, as used in reports
pub struct DisplayChanges<'a>(pub &'a [ChangeTree]);

impl fmt::Display for DisplayChanges<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, change) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match change {
                ChangeTree::Code(code) => write!(f, "{}", code)?,
                ChangeTree::Nested(nested) => write!(f, "{}", DisplayChanges(nested))?,
            }
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let changes: ChangeList = serde_json::from_str("[0,[2,0],3]").unwrap();
        assert_eq!(
            changes,
            vec![
                ChangeTree::Code(0),
                ChangeTree::Nested(vec![ChangeTree::Code(2), ChangeTree::Code(0)]),
                ChangeTree::Code(3),
            ]
        );
        assert_eq!(serde_json::to_string(&changes).unwrap(), "[0,[2,0],3]");
        assert_eq!(DisplayChanges(&changes).to_string(), "[0,[2,0],3]");
    }

    #[test]
    fn test_change_markers() {
        assert!(!has_change_markers(&[]));
        assert!(!has_change_markers(&[
            ChangeTree::Code(0),
            ChangeTree::Nested(vec![ChangeTree::Code(0)])
        ]));
        assert!(has_change_markers(&[
            ChangeTree::Code(0),
            ChangeTree::Nested(vec![ChangeTree::Code(4)])
        ]));
    }

    #[test]
    fn test_codes() {
        for code in 0..=5 {
            assert_eq!(ChangeKind::from_code(code).map(ChangeKind::code), Some(code));
        }
        assert_eq!(ChangeKind::from_code(6), None);
        assert!(is_root_comment(&root_comment()));
    }
}
