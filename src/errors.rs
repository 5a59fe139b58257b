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

//! Errors which may occur when aggregating keys, signing, building taptrees
//! or classifying input scripts.

use thiserror::Error;

/// Represents an error in key aggregation, nonce handling, signing, or verification.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum MuSigError {
    /// A tweak is not a valid scalar, i.e. it is not below the curve order.
    #[error("Tweak is not a valid scalar")]
    InvalidTweak,

    /// Aggregation or tweaking collapsed to the point at infinity.
    #[error("Point at infinity")]
    PointAtInfinity,

    /// No secret nonce is stored for the given public nonce.
    #[error("No secret nonce found for the public nonce")]
    MissingNonce,

    /// A secret nonce with the same public nonce is already stored.
    #[error("Public nonce is already in use")]
    NonceReuse,

    /// A public or aggregate nonce failed to decode.
    #[error("Invalid nonce encoding")]
    InvalidNonce,

    /// The nonce store holds as many secret nonces as it is allowed to.
    #[error("Nonce store is full")]
    NonceStoreFull,

    /// A derived nonce scalar was zero.
    #[error("Derived nonce scalar is zero")]
    ZeroNonce,

    /// A partial signature did not verify.
    #[error("Partial signature of {signer} failed to verify")]
    InvalidPartialSignature {
        /// Hex of the compressed key of the signer whose share failed
        signer: String,
    },

    /// The public key is not part of the aggregated key set.
    #[error("Public key is not part of the key set")]
    KeyNotInSet,

    /// The secret key does not belong to the public key committed in the secret nonce.
    #[error("Secret key does not match the secret nonce")]
    SecretKeyMismatch,

    /// Key aggregation needs at least one key.
    #[error("Key set is empty")]
    EmptyKeySet,

    /// Partial signatures carry different sighash suffixes.
    #[error("Partial signatures have mixed sighash types")]
    MixedSighashTypes,

    /// A ceremony was asked to track a key that appears more than once.
    #[error("Public key appears more than once in the key set")]
    DuplicateKey,

    /// There are too many parties in the MuSig signature
    #[error("There are too many parties in the MuSig signature")]
    TooManyParticipants,

    /// The ceremony was driven with an event its current state does not accept.
    #[error("Invalid transition out of {state}")]
    InvalidTransition {
        /// Name of the state the ceremony was in
        state: &'static str,
    },
}

/// Errors building or checking taptrees, tweaks and control blocks.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum TaprootError {
    /// The internal key is not a valid x-only point.
    #[error("Invalid internal key")]
    InvalidInternalKey,

    /// The tap tweak hash is not below the curve order, or tweaking hit infinity.
    #[error("Invalid tap tweak")]
    InvalidTweak,

    /// A control block length is not `33 + 32 * m`.
    #[error("Invalid control block length {length}")]
    InvalidControlBlockLength {
        /// Offending length
        length: usize,
    },

    /// The leaf version collides with the annex marker.
    #[error("Invalid leaf version {version:#04x}")]
    InvalidLeafVersion {
        /// Offending leaf version
        version: u8,
    },

    /// The declared depths need more leaves than were given.
    #[error("Not enough leaves for the declared depths")]
    InsufficientLeaves,

    /// Leaves remain after the tree was completed.
    #[error("Too many leaves for the declared depths")]
    ExcessLeaves,

    /// A leaf sits deeper than the consensus limit.
    #[error("Leaf depth {depth} exceeds the maximum")]
    DepthTooLarge {
        /// Offending depth
        depth: usize,
    },

    /// A tree was requested from no scripts.
    #[error("Cannot build a tree without any scripts")]
    EmptyTree,

    /// Scripts and weights have different lengths.
    #[error("Expected {scripts} weights, got {weights}")]
    WeightMismatch {
        /// Number of scripts
        scripts: usize,
        /// Number of weights
        weights: usize,
    },

    /// A leaf index is not part of the tree.
    #[error("No leaf at index {index}")]
    UnknownLeaf {
        /// Offending index
        index: usize,
    },
}

/// Why a decompiled script did not fit a candidate pattern.
///
/// These are values to be tried against the next candidate, not failures.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum MatchError {
    /// Element count differs from the pattern.
    #[error("Length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        /// Pattern length
        expected: usize,
        /// Script length
        got: usize,
    },

    /// An element differs from a fixed opcode in the pattern.
    #[error("Unexpected element at {index}")]
    UnexpectedElement {
        /// Element position
        index: usize,
    },

    /// An element is not a public key of the expected width.
    #[error("Invalid public key at {index}")]
    InvalidPubkey {
        /// Element position
        index: usize,
    },

    /// An element is neither a signature nor a placeholder.
    #[error("Invalid signature at {index}")]
    InvalidSignature {
        /// Element position
        index: usize,
    },

    /// An element is not a well formed control block.
    #[error("Invalid control block at {index}")]
    InvalidControlBlock {
        /// Element position
        index: usize,
    },

    /// A nested script failed to decompile.
    #[error("Could not decompile nested script at {index}")]
    Decompile {
        /// Element position
        index: usize,
    },
}

/// Errors classifying input or output scripts.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// No candidate shape matched.
    #[error("Unrecognized script shape")]
    UnrecognizedScriptShape,

    /// A parsed script was asked for a variant it is not.
    #[error("Expected {expected}, got {got}")]
    UnexpectedVariant {
        /// Requested variant
        expected: &'static str,
        /// Actual variant
        got: &'static str,
    },

    /// An unknown script type name.
    #[error("Unknown script type {0}")]
    UnknownScriptType(String),

    /// The script bytes are not a valid script.
    #[error("Could not decompile script")]
    Decompile,

    /// The script does not have the shape required by the script type.
    #[error("Script does not match {script_type}")]
    ShapeMismatch {
        /// Requested script type
        script_type: &'static str,
        /// Why the pattern failed
        reason: MatchError,
    },
}

/// Internal errors.  Most application-level developers will likely not
/// need to pay any attention to these.
#[derive(Eq, PartialEq, Debug, Error, Clone)]
pub enum SignerError {
    /// Invalid point provided.
    #[error("Cannot decode secp256k1 point")]
    PointDecompression,

    /// Invalid scalar provided.
    #[error("Scalar is not below the curve order")]
    ScalarFormat,

    /// Invalid length provided.
    #[error("{name} must be {length} bytes in length")]
    BytesLength {
        /// Identifies the type returning the error
        name: &'static str,
        /// Expected length
        length: usize,
    },

    /// The verification equation wasn't satisfied
    #[error("Verification equation was not satisfied")]
    Verify,

    /// Musig
    #[error("MuSig protocol violated: {kind}")]
    MuSig {
        /// Underlying protocol error
        kind: MuSigError,
    },

    /// Taproot
    #[error("Taproot: {kind}")]
    Taproot {
        /// Underlying taproot error
        kind: TaprootError,
    },

    /// Script classification
    #[error("Script parse: {kind}")]
    Parse {
        /// Underlying parse error
        kind: ParseError,
    },
}

/// Helper function to convert a musig error into a signer error
pub fn from_musig(err: MuSigError) -> SignerError {
    SignerError::MuSig { kind: err }
}

impl From<MuSigError> for SignerError {
    fn from(kind: MuSigError) -> SignerError {
        from_musig(kind)
    }
}

impl From<TaprootError> for SignerError {
    fn from(kind: TaprootError) -> SignerError {
        SignerError::Taproot { kind }
    }
}

impl From<ParseError> for SignerError {
    fn from(kind: ParseError) -> SignerError {
        SignerError::Parse { kind }
    }
}

/// Convert `SignerError` into `::serde::de::Error` aka `SerdeError`
///
/// We should do this with `From` but right now the orphan rules prohibit
/// `impl From<SignerError> for E where E: ::serde::de::Error`.
pub(crate) fn serde_error_from_signer_error<E>(err: SignerError) -> E
where
    E: ::serde::de::Error,
{
    match err {
        SignerError::PointDecompression => E::custom("secp256k1 point decoding failed"),
        SignerError::ScalarFormat => E::custom("scalar is not below the curve order"),
        SignerError::BytesLength { name, length } => {
            E::custom(format_args!("{} must be {} bytes", name, length))
        }
        other => E::custom(other),
    }
}
