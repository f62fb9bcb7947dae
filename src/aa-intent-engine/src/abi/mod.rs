//! Canonical EVM call encoding (head/tail, 32-byte words) over a closed set of types.

mod encoder;

use alloy_primitives::{I256, U256};

use crate::{
    errors::{malformed, Result, ValidationError},
    hash::keccak256,
};

pub use encoder::{encode, encode_types};

/// Supported ABI types. Widths outside the enumerated set are rejected by [`AbiType::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbiType {
    Address,
    /// `uintN`, N in 8..=256 step 8.
    Uint(u16),
    /// `intN`, N in 8..=256 step 8.
    Int(u16),
    Bool,
    String,
    Bytes,
    /// `bytesN`, N in 1..=32.
    FixedBytes(u8),
    /// Dynamic-length `T[]`.
    Array(Box<AbiType>),
}

impl AbiType {
    pub fn uint(bits: u16) -> Result<Self> {
        let ty = AbiType::Uint(bits);
        ty.validate()?;
        Ok(ty)
    }

    pub fn int(bits: u16) -> Result<Self> {
        let ty = AbiType::Int(bits);
        ty.validate()?;
        Ok(ty)
    }

    pub fn fixed_bytes(len: u8) -> Result<Self> {
        let ty = AbiType::FixedBytes(len);
        ty.validate()?;
        Ok(ty)
    }

    pub fn array(elem: AbiType) -> Result<Self> {
        let ty = AbiType::Array(Box::new(elem));
        ty.validate()?;
        Ok(ty)
    }

    /// Parse a canonical Solidity type name such as `uint48`, `bytes4` or `string[]`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let unsupported = || ValidationError::UnsupportedType(s.to_string());

        if let Some(inner) = s.strip_suffix("[]") {
            return AbiType::array(AbiType::parse(inner)?);
        }

        let ty = match s {
            "address" => AbiType::Address,
            "bool" => AbiType::Bool,
            "string" => AbiType::String,
            "bytes" => AbiType::Bytes,
            "uint" => AbiType::Uint(256),
            "int" => AbiType::Int(256),
            _ => {
                let (prefix, digits) = ["uint", "int", "bytes"]
                    .into_iter()
                    .find_map(|prefix| s.strip_prefix(prefix).map(|d| (prefix, d)))
                    .ok_or_else(unsupported)?;
                if digits.is_empty() || digits.starts_with('0') || digits.len() > 3 {
                    return Err(unsupported().into());
                }
                let n: u16 = digits.parse().map_err(|_| unsupported())?;
                match prefix {
                    "uint" => AbiType::Uint(n),
                    "int" => AbiType::Int(n),
                    _ => AbiType::FixedBytes(u8::try_from(n).map_err(|_| unsupported())?),
                }
            }
        };
        ty.validate()?;
        Ok(ty)
    }

    /// Reject widths outside the supported set, recursively.
    pub fn validate(&self) -> Result<()> {
        let ok = match self {
            AbiType::Uint(bits) | AbiType::Int(bits) => *bits >= 8 && *bits <= 256 && bits % 8 == 0,
            AbiType::FixedBytes(n) => *n >= 1 && *n <= 32,
            AbiType::Array(elem) => return elem.validate(),
            AbiType::Address | AbiType::Bool | AbiType::String | AbiType::Bytes => true,
        };
        if !ok {
            return Err(ValidationError::UnsupportedType(self.canonical()).into());
        }
        Ok(())
    }

    /// Types whose payload lives in the tail.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, AbiType::String | AbiType::Bytes | AbiType::Array(_))
    }

    /// Canonical name as used in function signatures.
    pub fn canonical(&self) -> String {
        match self {
            AbiType::Address => "address".into(),
            AbiType::Uint(bits) => format!("uint{bits}"),
            AbiType::Int(bits) => format!("int{bits}"),
            AbiType::Bool => "bool".into(),
            AbiType::String => "string".into(),
            AbiType::Bytes => "bytes".into(),
            AbiType::FixedBytes(n) => format!("bytes{n}"),
            AbiType::Array(elem) => format!("{}[]", elem.canonical()),
        }
    }
}

/// A value to encode. It must match its declared [`AbiType`] exactly; nothing is coerced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbiValue {
    /// `0x`-prefixed 20-byte hex, any case.
    Address(String),
    Uint(U256),
    Int(I256),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    FixedBytes(Vec<u8>),
    Array(Vec<AbiValue>),
}

impl AbiValue {
    pub fn address(s: impl Into<String>) -> Self {
        AbiValue::Address(s.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        AbiValue::String(s.into())
    }

    pub fn uint(v: impl Into<U256>) -> Self {
        AbiValue::Uint(v.into())
    }
}

/// One declared parameter of an encode call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    pub ty: AbiType,
    pub position: usize,
}

impl ParameterSpec {
    pub fn new(position: usize, name: impl Into<String>, ty: AbiType) -> Self {
        Self {
            name: name.into(),
            ty,
            position,
        }
    }
}

/// Build an ordered parameter list from `(name, type)` pairs.
pub fn params(fields: &[(&str, AbiType)]) -> Vec<ParameterSpec> {
    fields
        .iter()
        .enumerate()
        .map(|(i, (name, ty))| ParameterSpec::new(i, *name, ty.clone()))
        .collect()
}

/// 4-byte function selector: `keccak256(name(type,...))[..4]`.
pub fn selector(name: &str, types: &[AbiType]) -> [u8; 4] {
    let joined = types
        .iter()
        .map(AbiType::canonical)
        .collect::<Vec<_>>()
        .join(",");
    let digest = keccak256(format!("{name}({joined})"));
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

/// Selector from a full signature string such as `transfer(address,uint256)`.
///
/// Types are parsed (and therefore validated) before hashing; parameter names are not allowed.
pub fn selector_of_signature(signature: &str) -> Result<[u8; 4]> {
    let signature = signature.trim();
    let open = signature
        .find('(')
        .ok_or_else(|| malformed(format!("signature `{signature}`: missing `(`")))?;
    let inner = signature[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| malformed(format!("signature `{signature}`: missing `)`")))?;
    let name = &signature[..open];
    if name.is_empty() {
        return Err(malformed("signature has no function name"));
    }
    let types = if inner.trim().is_empty() {
        Vec::new()
    } else {
        inner
            .split(',')
            .map(AbiType::parse)
            .collect::<Result<Vec<_>>>()?
    };
    Ok(selector(name, &types))
}

/// Prefix an encoded tuple with a single offset word (`0x20`), i.e. encode it as one dynamic value.
pub fn with_offset_prefix(encoded: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 + encoded.len());
    let mut word = [0u8; 32];
    word[31] = 0x20;
    out.extend_from_slice(&word);
    out.extend(encoded);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    #[test]
    fn test_transfer_selector_vector() {
        assert_eq!(
            selector("transfer", &[AbiType::Address, AbiType::Uint(256)]),
            [0xa9, 0x05, 0x9c, 0xbb]
        );
        assert_eq!(
            selector_of_signature("transfer(address,uint256)").unwrap(),
            [0xa9, 0x05, 0x9c, 0xbb]
        );
        // `uint` is an alias, rendered canonically before hashing.
        assert_eq!(
            selector_of_signature("transfer(address, uint)").unwrap(),
            [0xa9, 0x05, 0x9c, 0xbb]
        );
    }

    #[test]
    fn test_parse_round_trips_canonical_names() {
        for name in ["address", "bool", "uint48", "int8", "bytes4", "bytes32", "string[]", "bytes[][]"] {
            assert_eq!(AbiType::parse(name).unwrap().canonical(), name);
        }
    }

    #[test]
    fn test_parse_rejects_unsupported_widths() {
        for name in ["uint7", "uint264", "int0", "bytes0", "bytes33", "uint08", "fixed128x18", "tuple", "bytes4[2]"] {
            let err = AbiType::parse(name).unwrap_err();
            assert!(
                matches!(err, Error::Validation(ValidationError::UnsupportedType(_))),
                "{name}: {err:?}"
            );
        }
        assert!(AbiType::uint(12).is_err());
        assert!(AbiType::array(AbiType::FixedBytes(40)).is_err());
    }

    #[test]
    fn test_with_offset_prefix() {
        let wrapped = with_offset_prefix(vec![0xaa; 32]);
        assert_eq!(wrapped.len(), 64);
        assert_eq!(wrapped[31], 0x20);
        assert!(wrapped[..31].iter().all(|b| *b == 0));
    }
}
