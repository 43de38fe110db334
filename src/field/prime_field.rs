//! Prime field implementation over the SKS keyserver modulus.
//! Provides deterministic arithmetic with a canonical representative in `[0, P)`.

use core::fmt;

use ruint::aliases::U256;

/// The SKS reconciliation prime, `530512889551602322505127520352579437339`.
///
/// Every reconciling peer must agree on this modulus bit-exactly; it is a
/// fixed property of the wire format, not a configuration knob.
pub const P_SKS: U256 = U256::from_limbs([
    0xc91f_85d9_30a5_431b,
    0x8f1d_10e4_878b_1fdf,
    0x0000_0000_0000_0001,
    0x0000_0000_0000_0000,
]);

/// Bit length of [`P_SKS`]. Navigation bitstrings have exactly this length.
pub const P_SKS_BITS: usize = 129;

/// Canonical serialized width of a field element: `ceil(P_SKS_BITS / 8)`.
pub const ZP_BYTES: usize = 17;

/// Field element represented as a canonical value modulo [`P_SKS`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Zp {
    /// Canonical representative in the range `[0, P_SKS)`.
    value: U256,
}

/// Arithmetic failure surfaced by field operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    /// The multiplicative inverse of zero was requested.
    ZeroInverse,
}

impl fmt::Display for ArithmeticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithmeticError::ZeroInverse => write!(f, "multiplicative inverse of zero"),
        }
    }
}

impl std::error::Error for ArithmeticError {}

/// Error raised when decoding a field element from bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZpDecodeError {
    /// The byte string encodes a value of more than 256 bits.
    Overflow,
    /// The decoded value is not the canonical representative (`>= P_SKS`).
    NonCanonical,
}

impl fmt::Display for ZpDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZpDecodeError::Overflow => {
                write!(f, "field element decode failed: value exceeds 256 bits")
            }
            ZpDecodeError::NonCanonical => {
                write!(f, "field element decode failed: non-canonical input")
            }
        }
    }
}

impl std::error::Error for ZpDecodeError {}

impl Zp {
    /// The additive identity.
    pub const ZERO: Zp = Zp { value: U256::ZERO };

    /// The multiplicative identity.
    pub const ONE: Zp = Zp {
        value: U256::from_limbs([1, 0, 0, 0]),
    };

    /// Constructs an element from a raw integer reduced modulo [`P_SKS`].
    pub fn new(value: U256) -> Self {
        Self {
            value: value % P_SKS,
        }
    }

    /// Returns the additive identity.
    pub const fn zero() -> Self {
        Self::ZERO
    }

    /// Returns the multiplicative identity.
    pub const fn one() -> Self {
        Self::ONE
    }

    /// Exposes the canonical representative.
    pub const fn to_uint(&self) -> U256 {
        self.value
    }

    /// Returns `true` for the additive identity.
    pub fn is_zero(&self) -> bool {
        self.value == U256::ZERO
    }

    /// Computes the modular sum of two elements.
    pub fn add(&self, other: &Self) -> Self {
        Self {
            value: self.value.add_mod(other.value, P_SKS),
        }
    }

    /// Computes the modular difference `self - other`.
    pub fn sub(&self, other: &Self) -> Self {
        Self {
            value: self.value.add_mod(P_SKS - other.value, P_SKS),
        }
    }

    /// Computes the modular product of two elements.
    pub fn mul(&self, other: &Self) -> Self {
        Self {
            value: self.value.mul_mod(other.value, P_SKS),
        }
    }

    /// Returns the additive inverse.
    pub fn neg(&self) -> Self {
        Self {
            value: (P_SKS - self.value) % P_SKS,
        }
    }

    /// Computes the multiplicative inverse of a non-zero element.
    pub fn inv(&self) -> Result<Self, ArithmeticError> {
        if self.is_zero() {
            return Err(ArithmeticError::ZeroInverse);
        }
        let value = self
            .value
            .inv_mod(P_SKS)
            .ok_or(ArithmeticError::ZeroInverse)?;
        Ok(Self { value })
    }

    /// Serializes the canonical representative as [`ZP_BYTES`] little-endian
    /// bytes. This is the byte form shared with reconciling peers and the
    /// source of the navigation bitstring.
    pub fn to_le_bytes(&self) -> [u8; ZP_BYTES] {
        let wide: [u8; 32] = self.value.to_le_bytes();
        let mut out = [0u8; ZP_BYTES];
        out.copy_from_slice(&wide[..ZP_BYTES]);
        out
    }

    /// Decodes a canonical little-endian byte string produced by
    /// [`Zp::to_le_bytes`]. Non-canonical values are rejected rather than
    /// reduced, so the byte form stays bijective across peers.
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self, ZpDecodeError> {
        let value = U256::try_from_le_slice(bytes).ok_or(ZpDecodeError::Overflow)?;
        if value >= P_SKS {
            return Err(ZpDecodeError::NonCanonical);
        }
        Ok(Self { value })
    }
}

impl From<u64> for Zp {
    fn from(value: u64) -> Self {
        // u64 values are always below the 129-bit modulus.
        Self {
            value: U256::from(value),
        }
    }
}

impl fmt::Debug for Zp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Zp").field(&self.value).finish()
    }
}

impl fmt::Display for Zp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
