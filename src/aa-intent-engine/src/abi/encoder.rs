use alloy_primitives::{I256, U256};

use super::{AbiType, AbiValue, ParameterSpec};
use crate::{
    errors::{overflow, Result, ValidationError},
    utils::bytes::{left_pad, parse_address},
};

/// Encode `values` against the declared parameter list, in `position` order.
///
/// Types and arity are validated before anything is written; the output is all-or-nothing.
pub fn encode(params: &[ParameterSpec], values: &[AbiValue]) -> Result<Vec<u8>> {
    if params.len() != values.len() {
        return Err(ValidationError::ArityMismatch {
            expected: params.len(),
            actual: values.len(),
        }
        .into());
    }
    let mut seen = vec![false; params.len()];
    for p in params {
        match seen.get_mut(p.position) {
            Some(slot) if !*slot => *slot = true,
            _ => return Err(ValidationError::InvalidPosition(p.position).into()),
        }
    }
    for p in params {
        p.ty.validate()?;
    }

    let mut ordered: Vec<(&ParameterSpec, &AbiValue)> = params.iter().zip(values).collect();
    ordered.sort_by_key(|(p, _)| p.position);
    let (types, values): (Vec<&AbiType>, Vec<&AbiValue>) =
        ordered.into_iter().map(|(p, v)| (&p.ty, v)).unzip();

    encode_sequence(&types, &values)
}

/// Same as [`encode`] for an anonymous type list.
pub fn encode_types(types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>> {
    if types.len() != values.len() {
        return Err(ValidationError::ArityMismatch {
            expected: types.len(),
            actual: values.len(),
        }
        .into());
    }
    for ty in types {
        ty.validate()?;
    }
    let types: Vec<&AbiType> = types.iter().collect();
    let values: Vec<&AbiValue> = values.iter().collect();
    encode_sequence(&types, &values)
}

/// Head/tail encoding of a sequence. Every supported static type occupies exactly one head word.
fn encode_sequence(types: &[&AbiType], values: &[&AbiValue]) -> Result<Vec<u8>> {
    let head_len = 32 * types.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (position, (ty, value)) in types.iter().zip(values).enumerate() {
        if ty.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            encode_dynamic(ty, value, position, &mut tail)?;
        } else {
            head.extend_from_slice(&encode_static(ty, value, position)?);
        }
    }

    head.extend(tail);
    Ok(head)
}

fn encode_static(ty: &AbiType, value: &AbiValue, position: usize) -> Result<[u8; 32]> {
    match (ty, value) {
        (AbiType::Address, AbiValue::Address(s)) => {
            let addr = parse_address(s, &format!("address at position {position}"))?;
            left_pad::<32>(&addr, "address")
        }
        (AbiType::Uint(bits), AbiValue::Uint(v)) => {
            if v.bit_len() > *bits as usize {
                return Err(overflow(format!("uint{bits} at position {position}"), *bits as usize / 8));
            }
            Ok(v.to_be_bytes::<32>())
        }
        (AbiType::Int(bits), AbiValue::Int(v)) => {
            if !int_fits(v, *bits) {
                return Err(overflow(format!("int{bits} at position {position}"), *bits as usize / 8));
            }
            Ok(v.into_raw().to_be_bytes::<32>())
        }
        (AbiType::Bool, AbiValue::Bool(b)) => {
            let mut word = [0u8; 32];
            word[31] = u8::from(*b);
            Ok(word)
        }
        (AbiType::FixedBytes(n), AbiValue::FixedBytes(bytes)) => {
            let n = *n as usize;
            if bytes.len() > n {
                return Err(overflow(format!("bytes{n} at position {position}"), n));
            }
            let mut word = [0u8; 32];
            word[..bytes.len()].copy_from_slice(bytes);
            Ok(word)
        }
        _ => Err(mismatch(ty, position)),
    }
}

fn encode_dynamic(ty: &AbiType, value: &AbiValue, position: usize, out: &mut Vec<u8>) -> Result<()> {
    match (ty, value) {
        (AbiType::String, AbiValue::String(s)) => {
            push_padded(out, s.as_bytes());
            Ok(())
        }
        (AbiType::Bytes, AbiValue::Bytes(b)) => {
            push_padded(out, b);
            Ok(())
        }
        (AbiType::Array(elem), AbiValue::Array(items)) => {
            let types: Vec<&AbiType> = items.iter().map(|_| elem.as_ref()).collect();
            let values: Vec<&AbiValue> = items.iter().collect();
            let body = encode_sequence(&types, &values).map_err(|e| relabel(e, position))?;
            out.extend_from_slice(&usize_word(items.len()));
            out.extend(body);
            Ok(())
        }
        _ => Err(mismatch(ty, position)),
    }
}

/// Length word followed by the payload right-padded to a word boundary.
fn push_padded(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&usize_word(data.len()));
    out.extend_from_slice(data);
    let rem = data.len() % 32;
    if rem != 0 {
        out.resize(out.len() + 32 - rem, 0);
    }
}

fn usize_word(n: usize) -> [u8; 32] {
    U256::from(n).to_be_bytes::<32>()
}

/// Two's-complement range check: every bit above `bits - 1` must equal the sign bit.
fn int_fits(v: &I256, bits: u16) -> bool {
    if bits >= 256 {
        return true;
    }
    let raw = v.into_raw();
    let upper = if v.is_negative() { !raw } else { raw };
    (upper >> (bits as usize - 1)) == U256::ZERO
}

fn mismatch(ty: &AbiType, position: usize) -> crate::errors::Error {
    ValidationError::TypeMismatch {
        position,
        expected: ty.canonical(),
    }
    .into()
}

/// Array elements report the position of the enclosing parameter.
fn relabel(err: crate::errors::Error, position: usize) -> crate::errors::Error {
    match err {
        crate::errors::Error::Validation(ValidationError::TypeMismatch { expected, .. }) => {
            ValidationError::TypeMismatch { position, expected }.into()
        }
        other => other,
    }
}
