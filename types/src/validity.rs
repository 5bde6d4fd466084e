use thiserror::Error as ThisError;

/// Opaque tag used by the transaction pool to order dependent transactions.
pub type TransactionTag = Vec<u8>;

/// Ordering hint for the pool. Higher is better.
pub type TransactionPriority = u64;

/// Number of blocks a validation result stays good for.
pub type TransactionLongevity = u64;

/// The transaction can never become valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum InvalidTransaction {
    #[error("call cannot be dispatched")]
    Call,
    #[error("unable to pay fees")]
    Payment,
    #[error("transaction not yet valid")]
    Future,
    #[error("transaction is outdated")]
    Stale,
    #[error("bad proof")]
    BadProof,
    #[error("birth block is no longer known")]
    AncientBirthBlock,
    #[error("transaction would exhaust the block limits")]
    ExhaustsResources,
    #[error("mandatory dispatch failed")]
    BadMandatory,
    #[error("mandatory dispatch cannot be submitted as a transaction")]
    MandatoryDispatch,
    #[error("invalid signing address")]
    BadSigner,
    #[error("custom invalid transaction ({0})")]
    Custom(u8),
}

/// Validity cannot be determined right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum UnknownTransaction {
    #[error("could not look up required information")]
    CannotLookup,
    #[error("no validator for unsigned transaction")]
    NoUnsignedValidator,
    #[error("custom unknown transaction ({0})")]
    Custom(u8),
}

/// Rejection reason returned by any phase of the extension chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum TransactionValidityError {
    #[error("invalid transaction: {0}")]
    Invalid(#[from] InvalidTransaction),
    #[error("unknown transaction validity: {0}")]
    Unknown(#[from] UnknownTransaction),
}

impl TransactionValidityError {
    pub fn exhausted_resources(&self) -> bool {
        matches!(self, Self::Invalid(InvalidTransaction::ExhaustsResources))
    }

    pub fn was_mandatory(&self) -> bool {
        matches!(self, Self::Invalid(InvalidTransaction::BadMandatory))
    }
}

pub type TransactionValidity = Result<ValidTransaction, TransactionValidityError>;

/// Information the pool needs to admit and order a valid transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidTransaction {
    pub priority: TransactionPriority,
    /// Tags that must be provided by other transactions before this one.
    pub requires: Vec<TransactionTag>,
    /// Tags this transaction provides once included.
    pub provides: Vec<TransactionTag>,
    pub longevity: TransactionLongevity,
    pub propagate: bool,
}

impl Default for ValidTransaction {
    fn default() -> Self {
        Self {
            priority: 0,
            requires: Vec::new(),
            provides: Vec::new(),
            longevity: TransactionLongevity::MAX,
            propagate: true,
        }
    }
}

impl ValidTransaction {
    /// Merge two results: tags concatenate, priorities add (saturating),
    /// longevity takes the tighter bound, and both must agree to propagate.
    pub fn combine_with(mut self, mut other: ValidTransaction) -> Self {
        self.priority = self.priority.saturating_add(other.priority);
        self.requires.append(&mut other.requires);
        self.provides.append(&mut other.provides);
        self.longevity = self.longevity.min(other.longevity);
        self.propagate = self.propagate && other.propagate;
        self
    }
}
