//! # Homomorphic Operation Kinds and Input Types

use serde::{Deserialize, Serialize};

/// Homomorphic comparison over two encrypted integers, yielding an
/// encrypted boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// `lhs == rhs`
    Eq,
    /// `lhs != rhs`
    Ne,
    /// `lhs > rhs`
    Gt,
    /// `lhs >= rhs`
    Ge,
    /// `lhs < rhs`
    Lt,
    /// `lhs <= rhs`
    Le,
}

impl CompareOp {
    /// Apply the comparison to plaintexts. Used only by the mock backend
    /// and the test oracle.
    pub fn apply(self, lhs: u8, rhs: u8) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
        }
    }
}

/// Homomorphic boolean combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOp {
    /// Conjunction.
    And,
    /// Disjunction.
    Or,
    /// Exclusive or.
    Xor,
}

impl LogicOp {
    /// Apply the combination to plaintexts.
    pub fn apply(self, lhs: bool, rhs: bool) -> bool {
        match self {
            Self::And => lhs && rhs,
            Self::Or => lhs || rhs,
            Self::Xor => lhs ^ rhs,
        }
    }
}

/// Homomorphic 8-bit arithmetic. Wraps modulo 256, like the encrypted
/// integer types it models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithOp {
    /// Wrapping addition.
    Add,
    /// Wrapping subtraction.
    Sub,
}

impl ArithOp {
    /// Apply the operation to plaintexts.
    pub fn apply(self, lhs: u8, rhs: u8) -> u8 {
        match self {
            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
        }
    }
}

/// An externally produced ciphertext together with its proof of
/// well-formedness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedInput {
    /// Opaque ciphertext bytes.
    pub ciphertext: Vec<u8>,
    /// Proof binding the ciphertext to a context.
    pub proof: Vec<u8>,
}

/// Public bound on the plaintext of a submitted 8-bit value.
///
/// The coprocessor enforces the bound during its typed conversion; the
/// engine never sees the plaintext it constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConstraint {
    /// Inclusive lower bound.
    pub min: u8,
    /// Inclusive upper bound.
    pub max: u8,
}

impl InputConstraint {
    /// Whether `value` satisfies the bound.
    pub fn admits(&self, value: u8) -> bool {
        self.min <= value && value <= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn compare_semantics() {
        assert!(CompareOp::Ge.apply(18, 18));
        assert!(!CompareOp::Gt.apply(18, 18));
        assert!(CompareOp::Le.apply(17, 18));
        assert!(CompareOp::Ne.apply(1, 2));
        assert!(!CompareOp::Lt.apply(5, 5));
        assert!(CompareOp::Eq.apply(7, 7));
    }

    #[test]
    fn arith_wraps() {
        assert_eq!(ArithOp::Add.apply(250, 10), 4);
        assert_eq!(ArithOp::Sub.apply(3, 5), 254);
    }

    #[test]
    fn logic_truth_table() {
        assert!(LogicOp::And.apply(true, true));
        assert!(!LogicOp::And.apply(true, false));
        assert!(LogicOp::Or.apply(false, true));
        assert!(!LogicOp::Xor.apply(true, true));
    }

    #[test]
    fn constraint_is_inclusive() {
        let c = InputConstraint { min: 1, max: 120 };
        assert!(c.admits(1));
        assert!(c.admits(120));
        assert!(!c.admits(0));
        assert!(!c.admits(121));
    }

    proptest! {
        #[test]
        fn compare_agrees_with_integer_ordering(lhs: u8, rhs: u8) {
            prop_assert_eq!(CompareOp::Eq.apply(lhs, rhs), lhs == rhs);
            prop_assert_eq!(CompareOp::Ne.apply(lhs, rhs), lhs != rhs);
            prop_assert_eq!(CompareOp::Gt.apply(lhs, rhs), lhs > rhs);
            prop_assert_eq!(CompareOp::Ge.apply(lhs, rhs), lhs >= rhs);
            prop_assert_eq!(CompareOp::Lt.apply(lhs, rhs), lhs < rhs);
            prop_assert_eq!(CompareOp::Le.apply(lhs, rhs), lhs <= rhs);
        }

        #[test]
        fn wrapping_sub_undoes_add(lhs: u8, rhs: u8) {
            prop_assert_eq!(ArithOp::Sub.apply(ArithOp::Add.apply(lhs, rhs), rhs), lhs);
        }
    }
}
