use crate::error::StorageError;
use std::fs::OpenOptions;
use std::str::FromStr;

/// fopen-style access mode requested by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write {
        /// Handle may also be read from
        read: bool,
        /// Start from an empty file
        truncate: bool,
        /// Every write goes to the end
        append: bool,
    },
}

impl OpenMode {
    /// Parse `r`, `w`, `a`, `x`, `c` with optional `+`. One `b` or `t` flag is
    /// ignored when it follows the base letter, either side of the `+`.
    /// `x` behaves like `c`: the staged copy always exists already.
    pub fn parse(mode: &str) -> Option<Self> {
        let mut chars = mode.chars();
        let base = chars.next()?;
        let plus = match chars.as_str() {
            "" | "b" | "t" => false,
            "+" | "b+" | "t+" | "+b" | "+t" => true,
            _ => return None,
        };
        let mode = match (base, plus) {
            ('r', false) => OpenMode::Read,
            ('r' | 'x' | 'c', true) => OpenMode::Write {
                read: true,
                truncate: false,
                append: false,
            },
            ('x' | 'c', false) => OpenMode::Write {
                read: false,
                truncate: false,
                append: false,
            },
            ('w', false) => OpenMode::Write {
                read: false,
                truncate: true,
                append: false,
            },
            ('w', true) => OpenMode::Write {
                read: true,
                truncate: true,
                append: false,
            },
            ('a', false) => OpenMode::Write {
                read: false,
                truncate: false,
                append: true,
            },
            ('a', true) => OpenMode::Write {
                read: true,
                truncate: false,
                append: true,
            },
            _ => return None,
        };
        Some(mode)
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, OpenMode::Read)
    }

    /// Options for opening the staged local copy
    pub fn open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match *self {
            OpenMode::Read => {
                options.read(true);
            }
            OpenMode::Write {
                read,
                truncate,
                append,
            } => {
                options.read(read).truncate(truncate);
                if append {
                    options.append(true);
                } else {
                    options.write(true);
                }
            }
        }
        options
    }
}

impl FromStr for OpenMode {
    type Err = StorageError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        Self::parse(mode).ok_or_else(|| StorageError::InvalidMode(mode.to_string()))
    }
}
