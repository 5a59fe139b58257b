// Copyright 2019 Stichting Organism
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! secp256k1 point and scalar tooling.
//!
//! Thin helpers over `k256` arithmetic. Points are carried as
//! `ProjectivePoint`, where the identity stands in for "infinity";
//! callers decide whether infinity is an error.

use k256::elliptic_curve::group::Group;
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::point::{AffineCoordinates, DecompressPoint};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::{AffinePoint, FieldBytes, ProjectivePoint, Scalar, U256};
use subtle::{Choice, ConditionallySelectable};

use crate::errors::SignerError;

/// Length of a compressed point.
pub const COMPRESSED_POINT_LENGTH: usize = 33;

/// Length of an x-only point.
pub const XONLY_POINT_LENGTH: usize = 32;

/// Length of an uncompressed point.
pub const UNCOMPRESSED_POINT_LENGTH: usize = 65;

/// Length of a serialized scalar.
pub const SCALAR_LENGTH: usize = 32;

/// Reduce 32 big endian bytes modulo the curve order.
pub fn scalar_reduce(bytes: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(*bytes))
}

/// Parse a 32 byte big endian scalar, rejecting values `>= n`.
pub fn scalar_from_bytes(bytes: &[u8]) -> Result<Scalar, SignerError> {
    if bytes.len() != SCALAR_LENGTH {
        return Err(SignerError::BytesLength {
            name: "Scalar",
            length: SCALAR_LENGTH,
        });
    }
    let mut repr = [0u8; SCALAR_LENGTH];
    repr.copy_from_slice(bytes);
    Option::from(Scalar::from_repr(FieldBytes::from(repr))).ok_or(SignerError::ScalarFormat)
}

/// Parse a scalar that must also be non zero.
pub fn secret_scalar_from_bytes(bytes: &[u8]) -> Result<Scalar, SignerError> {
    let s = scalar_from_bytes(bytes)?;
    if is_zero(&s) {
        return Err(SignerError::ScalarFormat);
    }
    Ok(s)
}

/// Big endian encoding of a scalar.
pub fn scalar_to_bytes(s: &Scalar) -> [u8; 32] {
    s.to_bytes().into()
}

/// Whether a scalar is zero.
pub fn is_zero(s: &Scalar) -> bool {
    bool::from(s.is_zero())
}

/// Negate `s` when `flip` is set.
pub fn scalar_negate_if(s: &Scalar, flip: Choice) -> Scalar {
    Scalar::conditional_select(s, &(-*s), flip)
}

/// Parse a compressed (33 byte) or uncompressed (65 byte) point.
pub fn point_from_bytes(bytes: &[u8]) -> Result<ProjectivePoint, SignerError> {
    match bytes.len() {
        COMPRESSED_POINT_LENGTH | UNCOMPRESSED_POINT_LENGTH => {
            k256::PublicKey::from_sec1_bytes(bytes)
                .map(|pk| pk.to_projective())
                .map_err(|_| SignerError::PointDecompression)
        }
        _ => Err(SignerError::BytesLength {
            name: "PublicKey",
            length: COMPRESSED_POINT_LENGTH,
        }),
    }
}

/// Parse a compressed point where 33 zero bytes encode infinity.
pub fn point_from_bytes_ext(bytes: &[u8]) -> Result<ProjectivePoint, SignerError> {
    if bytes.len() == COMPRESSED_POINT_LENGTH && bytes.iter().all(|b| *b == 0) {
        return Ok(ProjectivePoint::IDENTITY);
    }
    point_from_bytes(bytes)
}

/// Lift an x coordinate to the point with even Y.
pub fn lift_x(x: &[u8]) -> Result<ProjectivePoint, SignerError> {
    if x.len() != XONLY_POINT_LENGTH {
        return Err(SignerError::BytesLength {
            name: "XOnlyPublicKey",
            length: XONLY_POINT_LENGTH,
        });
    }
    let mut repr = [0u8; XONLY_POINT_LENGTH];
    repr.copy_from_slice(x);
    let affine: Option<AffinePoint> = AffinePoint::decompress(&FieldBytes::from(repr), Choice::from(0)).into();
    affine
        .map(ProjectivePoint::from)
        .ok_or(SignerError::PointDecompression)
}

/// Whether 32 bytes are the x coordinate of a curve point.
pub fn is_xonly_point(x: &[u8]) -> bool {
    lift_x(x).is_ok()
}

/// Whether bytes are a valid compressed or uncompressed point.
pub fn is_point(bytes: &[u8]) -> bool {
    point_from_bytes(bytes).is_ok()
}

/// Compressed encoding; infinity encodes as 33 zero bytes.
pub fn serialize_compressed(p: &ProjectivePoint) -> [u8; 33] {
    let mut out = [0u8; COMPRESSED_POINT_LENGTH];
    if is_infinity(p) {
        return out;
    }
    let encoded = p.to_affine().to_encoded_point(true);
    out.copy_from_slice(encoded.as_bytes());
    out
}

/// X coordinate of a point.
pub fn serialize_xonly(p: &ProjectivePoint) -> [u8; 32] {
    p.to_affine().x().into()
}

/// Whether the point has an even Y coordinate.
pub fn has_even_y(p: &ProjectivePoint) -> bool {
    !bool::from(p.to_affine().y_is_odd())
}

/// Choice set when the point has an odd Y coordinate.
pub fn odd_y(p: &ProjectivePoint) -> Choice {
    p.to_affine().y_is_odd()
}

/// Whether the point is the identity.
pub fn is_infinity(p: &ProjectivePoint) -> bool {
    bool::from(p.is_identity())
}

/// Negate `p` when `flip` is set.
pub fn negate_if(p: &ProjectivePoint, flip: Choice) -> ProjectivePoint {
    ProjectivePoint::conditional_select(p, &(-*p), flip)
}

/// `s * G`
pub fn mul_g(s: &Scalar) -> ProjectivePoint {
    ProjectivePoint::GENERATOR * *s
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn infinity_round_trips_as_zero_bytes() {
        let bytes = serialize_compressed(&ProjectivePoint::IDENTITY);
        assert_eq!(bytes, [0u8; 33]);
        let p = point_from_bytes_ext(&bytes).unwrap();
        assert!(is_infinity(&p));
        assert!(point_from_bytes(&bytes).is_err());
    }

    #[test]
    fn lift_x_is_even() {
        let g = ProjectivePoint::GENERATOR;
        let x = serialize_xonly(&g);
        let lifted = lift_x(&x).unwrap();
        assert!(has_even_y(&lifted));
        assert_eq!(serialize_xonly(&lifted), x);
    }

    #[test]
    fn compressed_round_trip() {
        let p = mul_g(&Scalar::from(7u64));
        let bytes = serialize_compressed(&p);
        assert_eq!(point_from_bytes(&bytes).unwrap(), p);
    }

    #[test]
    fn scalar_rejects_order() {
        // n itself is not a valid scalar encoding
        let n = hex::decode("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141").unwrap();
        assert_eq!(scalar_from_bytes(&n), Err(SignerError::ScalarFormat));
        assert!(secret_scalar_from_bytes(&[0u8; 32]).is_err());
    }

    #[test]
    fn negation_flips_parity() {
        let p = mul_g(&Scalar::from(3u64));
        let q = negate_if(&p, Choice::from(1));
        assert_ne!(has_even_y(&p), has_even_y(&q));
        assert_eq!(serialize_xonly(&p), serialize_xonly(&q));
    }
}
