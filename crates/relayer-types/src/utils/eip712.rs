//! EIP-712 codec for swap intents.
//!
//! These helpers provide:
//! - Domain separator computation from `eip712Domain()` fields, with and without salt
//! - SwapIntent struct hash computation
//! - Final digest computation (0x1901 || domainSeparator || structHash)
//! - Signer recovery from a 65-byte signature over a digest

use alloy_primitives::{keccak256, Address, Signature, B256, U256};
use thiserror::Error;

use crate::delivery::Eip712DomainFields;
use crate::intent::SwapIntent;

pub const DOMAIN_TYPE: &str =
	"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
pub const DOMAIN_TYPE_WITH_SALT: &str =
	"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract,bytes32 salt)";
/// Canonical SwapIntent type string. The settlement exposes its hash as
/// `SWAP_INTENT_TYPEHASH()`; the relayer always uses the on-chain value.
pub const SWAP_INTENT_TYPE: &str = "SwapIntent(address signer,address adapter,address tokenIn,address tokenOut,uint256 amountIn,uint256 minAmountOut,uint256 deadline,uint256 nonce,bytes adapterData)";

/// Errors from signature parsing and recovery.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
	#[error("Invalid signature format: {0}")]
	InvalidFormat(String),
	#[error("Signature recovery failed: {0}")]
	RecoveryFailed(String),
}

/// Computes the domain separator for the settlement's EIP-712 domain.
///
/// The salt is folded in whenever [`Eip712DomainFields::has_salt`] holds,
/// using the six-field domain type; otherwise the five-field type is used.
pub fn compute_domain_separator(domain: &Eip712DomainFields) -> B256 {
	let with_salt = domain.has_salt();
	let type_hash = keccak256(if with_salt {
		DOMAIN_TYPE_WITH_SALT.as_bytes()
	} else {
		DOMAIN_TYPE.as_bytes()
	});

	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&type_hash);
	enc.push_b256(&keccak256(domain.name.as_bytes()));
	enc.push_b256(&keccak256(domain.version.as_bytes()));
	enc.push_u256(domain.chain_id);
	enc.push_address(&domain.verifying_contract);
	if with_salt {
		enc.push_b256(&domain.salt);
	}
	keccak256(enc.finish())
}

/// Computes the SwapIntent struct hash under the given type hash.
///
/// `adapter_data` is dynamic and therefore enters the encoding as its keccak.
pub fn compute_struct_hash(type_hash: &B256, intent: &SwapIntent) -> B256 {
	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(type_hash);
	enc.push_address(&intent.signer);
	enc.push_address(&intent.adapter);
	enc.push_address(&intent.token_in);
	enc.push_address(&intent.token_out);
	enc.push_u256(intent.amount_in);
	enc.push_u256(intent.min_amount_out);
	enc.push_u256(intent.deadline);
	enc.push_u256(intent.nonce);
	enc.push_b256(&keccak256(&intent.adapter_data));
	keccak256(enc.finish())
}

/// Compute the final EIP-712 digest: keccak256(0x1901 || domainSeparator || structHash).
pub fn compute_final_digest(domain_separator: &B256, struct_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_separator.as_slice());
	out.extend_from_slice(struct_hash.as_slice());
	keccak256(out)
}

/// Digest a signer must sign to authorize `intent` under `domain`.
pub fn compute_intent_digest(
	domain: &Eip712DomainFields,
	type_hash: &B256,
	intent: &SwapIntent,
) -> B256 {
	compute_final_digest(
		&compute_domain_separator(domain),
		&compute_struct_hash(type_hash, intent),
	)
}

/// Recovers the address that produced `signature` over `digest`.
///
/// The signature must be 65 bytes `r || s || v`; `v` may be 0/1 or 27/28.
pub fn recover_signer(digest: &B256, signature: &[u8]) -> Result<Address, SignatureError> {
	if signature.len() != 65 {
		return Err(SignatureError::InvalidFormat(format!(
			"expected 65 bytes, got {}",
			signature.len()
		)));
	}

	let sig =
		Signature::try_from(signature).map_err(|e| SignatureError::InvalidFormat(e.to_string()))?;

	sig.recover_address_from_prehash(digest)
		.map_err(|e| SignatureError::RecoveryFailed(e.to_string()))
}

/// Minimal ABI encoder for the static words used in EIP-712 hashing.
pub struct Eip712AbiEncoder {
	buf: Vec<u8>,
}

impl Default for Eip712AbiEncoder {
	fn default() -> Self {
		Self::new()
	}
}

impl Eip712AbiEncoder {
	pub fn new() -> Self {
		Self { buf: Vec::new() }
	}

	pub fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	pub fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u256(&mut self, v: U256) {
		self.buf.extend_from_slice(&v.to_be_bytes::<32>());
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}
