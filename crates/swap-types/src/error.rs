/// Validation error for ledger values parsed from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    InvalidAddress(String),
    InvalidTokenId(String),
}

impl std::fmt::Display for TypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAddress(s) => write!(f, "invalid address: {s}"),
            Self::InvalidTokenId(s) => write!(f, "invalid token id: {s}"),
        }
    }
}

impl std::error::Error for TypeError {}
