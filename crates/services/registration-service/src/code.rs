//! Verification code generation.

use std::collections::VecDeque;

use parking_lot::Mutex;
use rand::{rngs::OsRng, Rng};

use domain::{VerificationCode, VERIFICATION_CODE_MAX, VERIFICATION_CODE_MIN};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Produces six digit verification codes.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> VerificationCode;
}

/// Uniform codes in [100000, 999999] drawn from the OS CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> VerificationCode {
        let value = OsRng.gen_range(VERIFICATION_CODE_MIN..=VERIFICATION_CODE_MAX);
        VerificationCode::from_number(value)
            .unwrap_or_else(|_| unreachable!("gen_range stays within the code range"))
    }
}

/// Hands out a fixed sequence of codes, falling back to random ones when drained.
#[derive(Debug, Default)]
pub struct SequenceCodeGenerator {
    codes: Mutex<VecDeque<VerificationCode>>,
}

impl SequenceCodeGenerator {
    /// # Panics
    /// Panics if any entry is not exactly six digits.
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes = codes
            .into_iter()
            .map(|c| VerificationCode::parse(c.as_ref()).expect("fixture codes are six digits"))
            .collect();
        Self {
            codes: Mutex::new(codes),
        }
    }
}

impl CodeGenerator for SequenceCodeGenerator {
    fn generate(&self) -> VerificationCode {
        self.codes
            .lock()
            .pop_front()
            .unwrap_or_else(|| RandomCodeGenerator.generate())
    }
}
