//! Ring identifier arithmetic.
//!
//! An [`Identifier`] is a non-negative integer on a ring of size 2^M, where M
//! ("ring bits") is a start-time constant shared by every node of a
//! deployment (see [`Config::ring_bits`]). Identifiers are derived by hashing
//! a UTF-8 string with SHA-1 and reducing the full 160 bit digest modulo 2^M,
//! so raising M never changes the digest an address or key hashes to, only
//! how much of it is kept.
//!
//! [`Config::ring_bits`]: ../../config/struct.Config.html

use bigint::U256;
use ring::digest;
use std::fmt;

/// Width in bits of the content hash this implementation standardizes on.
pub const HASH_BITS: u32 = 160;

/// An identifier on a ring of size 2^M.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Identifier(U256);

impl Identifier {
    /// The identifier zero, the start of the ring.
    pub fn zero() -> Self {
        Identifier(U256::zero())
    }

    /// Hashes `input` with SHA-1 and reduces the result modulo 2^`m`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use chord::routing::identifier::Identifier;
    /// let a = Identifier::hash(b"127.0.0.1:8080", 8);
    /// let b = Identifier::hash(b"127.0.0.1:8080", 8);
    /// assert_eq!(a, b);
    /// ```
    pub fn hash(input: &[u8], m: u32) -> Self {
        let digest = digest::digest(&digest::SHA1, input);
        let raw = U256::from_big_endian(digest.as_ref());
        Identifier(reduce(raw, m))
    }

    /// Builds an identifier directly from a big-endian byte string.
    ///
    /// The value is not reduced; callers that need a value on a particular
    /// ring should call [`Identifier::reduced`] afterwards.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Identifier(U256::from_big_endian(bytes))
    }

    /// Returns this identifier reduced modulo 2^`m`.
    pub fn reduced(&self, m: u32) -> Self {
        Identifier(reduce(self.0, m))
    }

    /// Returns `(self + 2^i) mod 2^m`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use chord::routing::identifier::Identifier;
    /// let zero = Identifier::zero();
    /// let one = zero.add_pow2(0, 3);
    /// let two = zero.add_pow2(1, 3);
    /// assert_ne!(one, two);
    /// ```
    pub fn add_pow2(&self, i: u32, m: u32) -> Self {
        let offset = U256::one() << (i as usize);
        let sum = self.0.overflowing_add(offset).0;
        Identifier(reduce(sum, m))
    }

    /// Decides whether `x` lies on the half-open arc `(a, b]`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use chord::routing::identifier::Identifier;
    /// let a = Identifier::zero();
    /// let five = a.add_pow2(0, 3).add_pow2(2, 3); // 0 + 1 + 4 = 5
    /// assert!(Identifier::between(&five, &a, &five));
    /// assert!(!Identifier::between(&a, &a, &five));
    /// ```
    pub fn between(x: &Identifier, a: &Identifier, b: &Identifier) -> bool {
        if a.0 < b.0 {
            a.0 < x.0 && x.0 <= b.0
        } else {
            x.0 > a.0 || x.0 <= b.0
        }
    }

    /// Returns the raw bytes of this identifier, trimmed of leading zeros
    /// (but never empty — the zero identifier encodes as a single zero byte).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut full = [0u8; 32];
        self.0.to_big_endian(&mut full);

        let first_nonzero = full.iter().position(|&b| b != 0);
        match first_nonzero {
            Some(i) => full[i..].to_vec(),
            None => vec![0],
        }
    }
}

fn reduce(value: U256, m: u32) -> U256 {
    if m >= 256 {
        return value;
    }

    let modulus = U256::one() << (m as usize);
    value % modulus
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in self.to_bytes() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_natural_order() {
        let zero = Identifier::zero();
        let five = zero.add_pow2(0, 3).add_pow2(2, 3);
        let seven = zero.add_pow2(0, 3).add_pow2(1, 3).add_pow2(2, 3);

        // (0, 7] on an 8-identifier ring: natural order, zero < seven.
        assert!(Identifier::between(&five, &zero, &seven));
        assert!(Identifier::between(&seven, &zero, &seven));
        assert!(!Identifier::between(&zero, &zero, &seven));
    }

    #[test]
    fn between_wrap_around() {
        let zero = Identifier::zero();
        let three = zero.add_pow2(0, 3).add_pow2(1, 3);
        let two = zero.add_pow2(1, 3);

        // (3, 2] wraps: true for x > 3 or x <= 2.
        assert!(Identifier::between(&zero, &three, &two));
        assert!(Identifier::between(&two, &three, &two));
        assert!(!Identifier::between(&three, &three, &two));
    }

    #[test]
    fn between_full_ring_minus_self() {
        let zero = Identifier::zero();
        let one = zero.add_pow2(0, 3);

        // a == b: full ring minus {a}.
        assert!(Identifier::between(&zero, &one, &one));
        assert!(!Identifier::between(&one, &one, &one));
    }

    #[test]
    fn add_pow2_wraps_modulo_ring_size() {
        let zero = Identifier::zero();
        let m = 3;

        // 2^3 == 8 == 0 mod 8.
        let eight = zero.add_pow2(3, m);
        assert_eq!(eight, zero);
    }

    #[test]
    fn hash_is_deterministic_and_reduced() {
        let m = 3;
        let id = Identifier::hash(b"node-a", m);

        // Reducing an already-reduced identifier is a no-op.
        assert_eq!(id, id.reduced(m));
    }

    #[test]
    fn raising_m_keeps_the_same_underlying_digest() {
        let narrow = Identifier::hash(b"node-a", 3);
        let wide = Identifier::hash(b"node-a", 160);

        assert_eq!(narrow, wide.reduced(3));
    }
}
