use std::fmt;

/// Final answer of the engine.
///
/// `Sat` means a feasible path reaches the failure block (the program is
/// unsafe and a trace is available); `Unsat` means no bounded execution
/// does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Sat,
    Unsat,
    Unknown(String),
}

impl Verdict {
    pub fn is_sat(&self) -> bool {
        matches!(self, Verdict::Sat)
    }

    pub fn is_unsat(&self) -> bool {
        matches!(self, Verdict::Unsat)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Sat => write!(f, "sat"),
            Verdict::Unsat => write!(f, "unsat"),
            Verdict::Unknown(reason) => write!(f, "unknown ({reason})"),
        }
    }
}
