// SPDX-License-Identifier: Apache-2.0

//! Literal values carried by IR `literal` nodes.

use bitvec::vec::BitVec;

use crate::ir::Type;
use crate::translation_error::TranslationError;

/// Fixed-width bit pattern; index 0 is the least significant bit (LSb).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct IrBits {
    bits: BitVec,
}

impl IrBits {
    /// Converts a `&[bool]` slice into a bits value.
    ///
    /// ```
    /// use xlsynth_z3::IrBits;
    ///
    /// let bools = vec![true, false, true, false]; // LSB is bools[0]
    /// let ir_bits = IrBits::from_lsb_is_0(&bools);
    /// assert_eq!(ir_bits.get_bit_count(), 4);
    /// assert_eq!(ir_bits.to_u64().unwrap(), 5);
    /// ```
    pub fn from_lsb_is_0(bits: &[bool]) -> Self {
        IrBits {
            bits: bits.iter().copied().collect(),
        }
    }

    /// Turns a boolean slice into a bits value under the assumption that
    /// index 0 in the slice is the most significant bit (MSb).
    pub fn from_msb_is_0(bits: &[bool]) -> Self {
        IrBits {
            bits: bits.iter().rev().copied().collect(),
        }
    }

    pub fn make_ubits(bit_count: usize, value: u64) -> Result<Self, TranslationError> {
        if bit_count < 64 && (value >> bit_count) != 0 {
            return Err(TranslationError::InvalidOperand(format!(
                "value {} does not fit in bits[{}]",
                value, bit_count
            )));
        }
        Ok(IrBits {
            bits: (0..bit_count)
                .map(|i| i < 64 && (value >> i) & 1 == 1)
                .collect(),
        })
    }

    pub fn make_sbits(bit_count: usize, value: i64) -> Result<Self, TranslationError> {
        let fits = match bit_count {
            0 => value == 0,
            1..=63 => {
                let bound = 1i64 << (bit_count - 1);
                value >= -bound && value < bound
            }
            _ => true,
        };
        if !fits {
            return Err(TranslationError::InvalidOperand(format!(
                "value {} does not fit in signed bits[{}]",
                value, bit_count
            )));
        }
        Ok(IrBits {
            bits: (0..bit_count)
                .map(|i| if i < 64 { (value >> i) & 1 == 1 } else { value < 0 })
                .collect(),
        })
    }

    pub fn all_ones(bit_count: usize) -> Self {
        IrBits {
            bits: std::iter::repeat(true).take(bit_count).collect(),
        }
    }

    pub fn u32(value: u32) -> Self {
        IrBits {
            bits: (0..32).map(|i| (value >> i) & 1 == 1).collect(),
        }
    }

    pub fn get_bit_count(&self) -> usize {
        self.bits.len()
    }

    /// Note: index 0 is the least significant bit (LSb).
    pub fn get_bit(&self, index: usize) -> Result<bool, TranslationError> {
        match self.bits.get(index) {
            Some(bit) => Ok(*bit),
            None => Err(TranslationError::InvalidArgument(format!(
                "Index {} out of bounds for {}",
                index, self
            ))),
        }
    }

    pub fn iter_lsb_to_msb(&self) -> impl Iterator<Item = bool> + '_ {
        self.bits.iter().by_vals()
    }

    pub fn to_bools_lsb_is_0(&self) -> Vec<bool> {
        self.iter_lsb_to_msb().collect()
    }

    pub fn to_u64(&self) -> Result<u64, TranslationError> {
        let mut result = 0u64;
        for (i, bit) in self.iter_lsb_to_msb().enumerate() {
            if !bit {
                continue;
            }
            if i >= 64 {
                return Err(TranslationError::InvalidArgument(format!(
                    "{} does not fit in a u64",
                    self
                )));
            }
            result |= 1u64 << i;
        }
        Ok(result)
    }
}

impl std::fmt::Display for IrBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bits[{}]:", self.get_bit_count())?;
        match self.to_u64() {
            Ok(value) => write!(f, "{}", value),
            Err(_) => {
                write!(f, "0b")?;
                for bit in self.bits.iter().by_vals().rev() {
                    write!(f, "{}", if bit { '1' } else { '0' })?;
                }
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for IrBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

/// A structured literal; its shape mirrors `ir::Type`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum IrValue {
    Bits(IrBits),
    Array(Vec<IrValue>),
    Tuple(Vec<IrValue>),
}

impl IrValue {
    pub fn make_ubits(bit_count: usize, value: u64) -> Result<Self, TranslationError> {
        IrBits::make_ubits(bit_count, value).map(IrValue::Bits)
    }

    pub fn make_sbits(bit_count: usize, value: i64) -> Result<Self, TranslationError> {
        IrBits::make_sbits(bit_count, value).map(IrValue::Bits)
    }

    pub fn u32(value: u32) -> Self {
        IrValue::Bits(IrBits::u32(value))
    }

    pub fn bool(value: bool) -> Self {
        IrValue::Bits(IrBits::from_lsb_is_0(&[value]))
    }

    pub fn make_tuple(elements: &[IrValue]) -> Self {
        IrValue::Tuple(elements.to_vec())
    }

    /// Arrays must be non-empty and homogeneous.
    pub fn make_array(elements: &[IrValue]) -> Result<Self, TranslationError> {
        let first = match elements.first() {
            Some(first) => first.get_type()?,
            None => {
                return Err(TranslationError::InvalidOperand(
                    "arrays must have at least one element".to_string(),
                ));
            }
        };
        for element in elements.iter().skip(1) {
            let ty = element.get_type()?;
            if ty != first {
                return Err(TranslationError::InvalidOperand(format!(
                    "array element types differ: {} vs {}",
                    first, ty
                )));
            }
        }
        Ok(IrValue::Array(elements.to_vec()))
    }

    /// Infers the IR type this value conforms to.
    pub fn get_type(&self) -> Result<Type, TranslationError> {
        match self {
            IrValue::Bits(bits) => Ok(Type::Bits(bits.get_bit_count())),
            IrValue::Tuple(elements) => {
                let mut types = Vec::with_capacity(elements.len());
                for element in elements {
                    types.push(Box::new(element.get_type()?));
                }
                Ok(Type::Tuple(types))
            }
            IrValue::Array(elements) => match elements.first() {
                Some(first) => Ok(Type::new_array(first.get_type()?, elements.len())),
                None => Err(TranslationError::InvalidOperand(
                    "cannot infer the type of an empty array".to_string(),
                )),
            },
        }
    }
}

impl std::fmt::Display for IrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IrValue::Bits(bits) => write!(f, "{}", bits),
            IrValue::Array(elements) | IrValue::Tuple(elements) => {
                let (open, close) = if matches!(self, IrValue::Array(_)) {
                    ("[", "]")
                } else {
                    ("(", ")")
                };
                write!(f, "{}", open)?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "{}", close)
            }
        }
    }
}
