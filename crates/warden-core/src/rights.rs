//! The rights alphabet and its set representation
//!
//! A right is addressed by a single letter (`r`, `w`, `x`, `a`) in command
//! payloads and query parameters. Each right maps to exactly one pair of
//! document fields, one for users and one for groups.

use std::fmt;

/// One of the four rights a principal can hold on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Right {
    Read,
    Write,
    Execute,
    Administrate,
}

impl Right {
    pub const ALL: [Right; 4] = [
        Right::Read,
        Right::Write,
        Right::Execute,
        Right::Administrate,
    ];

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'r' => Some(Right::Read),
            'w' => Some(Right::Write),
            'x' => Some(Right::Execute),
            'a' => Some(Right::Administrate),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Right::Read => 'r',
            Right::Write => 'w',
            Right::Execute => 'x',
            Right::Administrate => 'a',
        }
    }

    /// Document field holding the user ids granted this right.
    pub fn user_field(&self) -> &'static str {
        match self {
            Right::Read => "read_users",
            Right::Write => "write_users",
            Right::Execute => "execute_users",
            Right::Administrate => "admin_users",
        }
    }

    /// Document field holding the group ids granted this right.
    pub fn group_field(&self) -> &'static str {
        match self {
            Right::Read => "read_groups",
            Right::Write => "write_groups",
            Right::Execute => "execute_groups",
            Right::Administrate => "admin_groups",
        }
    }

    fn bit(&self) -> u8 {
        match self {
            Right::Read => 0b0001,
            Right::Write => 0b0010,
            Right::Execute => 0b0100,
            Right::Administrate => 0b1000,
        }
    }
}

/// A small set of rights, parsed from a letter string such as `"ra"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RightSet(u8);

impl RightSet {
    pub const EMPTY: RightSet = RightSet(0);

    /// The full `rwxa` set.
    pub fn all() -> Self {
        let mut set = RightSet::EMPTY;
        for right in Right::ALL {
            set.insert(right);
        }
        set
    }

    /// Parses a letter string. Letters outside the alphabet are ignored.
    pub fn parse(letters: &str) -> Self {
        let mut set = RightSet::EMPTY;
        for letter in letters.chars() {
            if let Some(right) = Right::from_letter(letter) {
                set.insert(right);
            }
        }
        set
    }

    pub fn insert(&mut self, right: Right) {
        self.0 |= right.bit();
    }

    pub fn contains(&self, right: Right) -> bool {
        self.0 & right.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Right> + '_ {
        Right::ALL.into_iter().filter(|r| self.contains(*r))
    }
}

impl fmt::Display for RightSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for right in self.iter() {
            write!(f, "{}", right.letter())?;
        }
        Ok(())
    }
}

impl FromIterator<Right> for RightSet {
    fn from_iter<T: IntoIterator<Item = Right>>(iter: T) -> Self {
        let mut set = RightSet::EMPTY;
        for right in iter {
            set.insert(right);
        }
        set
    }
}
