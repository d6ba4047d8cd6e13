use serde::{Deserialize, Serialize};

/// forward vs. backward(reverse) strand of a feature
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Backward,
}

impl Strand {
    /// `+` or `-`; anything else is not a usable strand
    pub fn parse(val: &str) -> Option<Self> {
        match val {
            "+" => Some(Strand::Forward),
            "-" => Some(Strand::Backward),
            _ => None,
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let x: Box<str> = (*self).into();
        write!(f, "{}", x)
    }
}

impl From<Strand> for Box<str> {
    fn from(strand: Strand) -> Self {
        match strand {
            Strand::Forward => Box::from("+"),
            Strand::Backward => Box::from("-"),
        }
    }
}
