//! Conventional commit categories.

use std::fmt;
use std::str::FromStr;

use crate::error::AcpError;

/// Closed set of change categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Test,
    Chore,
    Revert,
}

impl Category {
    /// Every category, in menu order.
    pub const ALL: [Category; 8] = [
        Category::Feat,
        Category::Fix,
        Category::Docs,
        Category::Style,
        Category::Refactor,
        Category::Test,
        Category::Chore,
        Category::Revert,
    ];

    /// Short code used as the commit message prefix.
    pub fn code(&self) -> &'static str {
        match self {
            Category::Feat => "feat",
            Category::Fix => "fix",
            Category::Docs => "docs",
            Category::Style => "style",
            Category::Refactor => "refactor",
            Category::Test => "test",
            Category::Chore => "chore",
            Category::Revert => "revert",
        }
    }

    /// Label shown in selection menus.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Feat => "feat ✨",
            Category::Fix => "fix 🐛",
            Category::Docs => "docs 📝",
            Category::Style => "style 💎",
            Category::Refactor => "refactor ♻️",
            Category::Test => "test 🧪",
            Category::Chore => "chore 📦",
            Category::Revert => "revert ⏪",
        }
    }

    fn valid_codes() -> String {
        Self::ALL
            .iter()
            .map(|c| c.code())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Category {
    type Err = AcpError;

    /// Parse a short code, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.code() == wanted)
            .ok_or_else(|| {
                AcpError::config(format!("Invalid commit type: {}", s.trim()))
                    .with_suggestion(format!("Valid types are: {}", Self::valid_codes()))
            })
    }
}
