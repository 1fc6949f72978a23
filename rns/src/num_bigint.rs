use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed};

/// Floor and round-to-nearest division, which BigInt's `/` (truncating)
/// does not provide.
pub trait Div {
    fn div_floor(&self, other: &Self) -> Self;
    fn div_round(&self, other: &Self) -> Self;
}

impl Div for BigInt {
    fn div_floor(&self, other: &Self) -> Self {
        Integer::div_floor(self, other)
    }

    fn div_round(&self, other: &Self) -> Self {
        let (quo, rem) = self.div_rem(other);
        if (&rem << 1u8).abs() >= other.abs() {
            if self.sign() == other.sign() {
                return quo + BigInt::one();
            }
            return quo - BigInt::one();
        }
        quo
    }
}
