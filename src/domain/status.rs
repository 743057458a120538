//! Onboarding status code model
//!
//! Vehicle onboarding progresses through six phases (submit, decode,
//! vendor-validate, mint-submit, vendor-connect, mint), each with four
//! possible outcomes. The persisted representation is a single integer:
//! tens digit = phase, ones digit = outcome, plus the terminal value 93
//! for overall success. Any other integer renders as "Unknown".
//!
//! No transitions are enforced here; this is a label/predicate layer over
//! a value written by callers.

/// Terminal value for a fully onboarded vehicle, outside the phase/outcome scheme.
pub const STATUS_SUCCESS: i32 = 93;

/// Onboarding workflow phase (tens digit of the legacy code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Submit,
    Decode,
    VendorValidation,
    MintSubmit,
    Connect,
    Mint,
}

impl Phase {
    const ALL: [Phase; 6] = [
        Phase::Submit,
        Phase::Decode,
        Phase::VendorValidation,
        Phase::MintSubmit,
        Phase::Connect,
        Phase::Mint,
    ];

    fn tens(self) -> i32 {
        match self {
            Phase::Submit => 0,
            Phase::Decode => 1,
            Phase::VendorValidation => 2,
            Phase::MintSubmit => 3,
            Phase::Connect => 4,
            Phase::Mint => 5,
        }
    }

    fn from_tens(tens: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.tens() == tens)
    }

    fn label(self) -> &'static str {
        match self {
            Phase::Submit => "VerificationSubmit",
            Phase::Decode => "Decoding",
            Phase::VendorValidation => "VendorValidation",
            Phase::MintSubmit => "MintSubmit",
            Phase::Connect => "Connect",
            Phase::Mint => "Mint",
        }
    }
}

/// Per-phase outcome (ones digit of the legacy code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Unknown,
    Pending,
    Failure,
    Success,
}

impl Outcome {
    const ALL: [Outcome; 4] =
        [Outcome::Unknown, Outcome::Pending, Outcome::Failure, Outcome::Success];

    fn ones(self) -> i32 {
        match self {
            Outcome::Unknown => 0,
            Outcome::Pending => 1,
            Outcome::Failure => 2,
            Outcome::Success => 3,
        }
    }

    fn from_ones(ones: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.ones() == ones)
    }

    fn label(self) -> &'static str {
        match self {
            Outcome::Unknown => "Unknown",
            Outcome::Pending => "Pending",
            Outcome::Failure => "Failure",
            Outcome::Success => "Success",
        }
    }
}

/// Typed onboarding status with encode/decode to the legacy integer domain.
///
/// The valid integer domain is exactly the 24 phase/outcome combinations
/// plus [`STATUS_SUCCESS`]. Everything else decodes to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnboardingStatus {
    Stage { phase: Phase, outcome: Outcome },
    Done,
}

impl OnboardingStatus {
    pub fn stage(phase: Phase, outcome: Outcome) -> Self {
        OnboardingStatus::Stage { phase, outcome }
    }

    /// Encode to the persisted integer.
    pub fn code(self) -> i32 {
        match self {
            OnboardingStatus::Stage { phase, outcome } => phase.tens() * 10 + outcome.ones(),
            OnboardingStatus::Done => STATUS_SUCCESS,
        }
    }

    /// Decode from a persisted integer. Returns `None` for anything outside
    /// the valid domain.
    pub fn from_code(code: i32) -> Option<Self> {
        if code == STATUS_SUCCESS {
            return Some(OnboardingStatus::Done);
        }
        if !(0..=59).contains(&code) {
            return None;
        }
        let phase = Phase::from_tens(code / 10)?;
        let outcome = Outcome::from_ones(code % 10)?;
        Some(OnboardingStatus::Stage { phase, outcome })
    }

    pub fn label(self) -> String {
        match self {
            OnboardingStatus::Stage { phase, outcome } => {
                format!("{}{}", phase.label(), outcome.label())
            }
            OnboardingStatus::Done => "Success".to_string(),
        }
    }
}

// Threshold codes used by the predicates below.
const VENDOR_VALIDATION_SUCCESS: i32 = 23;
const MINT_SUBMIT_UNKNOWN: i32 = 30;
const MINT_SUCCESS: i32 = 53;

/// Vehicle has passed vendor validation.
pub fn is_verified(code: i32) -> bool {
    code >= VENDOR_VALIDATION_SUCCESS
}

/// Vehicle has been minted.
pub fn is_minted(code: i32) -> bool {
    code >= MINT_SUCCESS
}

/// Every phase's failure slot ends in 2.
pub fn is_failure(code: i32) -> bool {
    code % 10 == 2
}

pub fn is_pending(code: i32) -> bool {
    code > 0 && code < STATUS_SUCCESS
}

/// Strictly greater than the mint-submit-unknown value.
pub fn is_mint_pending(code: i32) -> bool {
    code > MINT_SUBMIT_UNKNOWN && code < STATUS_SUCCESS
}

pub fn general_status(code: i32) -> &'static str {
    if code == STATUS_SUCCESS {
        return "Success";
    }
    if is_failure(code) {
        return "Failure";
    }
    if is_pending(code) {
        return "Pending";
    }
    "Unknown"
}

pub fn verification_status(code: i32) -> &'static str {
    if is_verified(code) {
        return "Success";
    }
    if is_failure(code) {
        return "Failure";
    }
    if is_pending(code) {
        return "Pending";
    }
    "Unknown"
}

/// Full per-phase label, or "Unknown" for any value outside the valid domain.
pub fn detailed_status(code: i32) -> String {
    match OnboardingStatus::from_code(code) {
        Some(status) => status.label(),
        None => "Unknown".to_string(),
    }
}
