//! String formatting utilities.

/// Removes "0x" or "0X" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Hides secrets embedded in an RPC URL before it is logged.
///
/// Hosted RPC providers put the API key in the path after `/v2/`, and some
/// endpoints carry basic-auth userinfo. Both are replaced with `REDACTED`.
pub fn redact_rpc_url(url: &str) -> String {
	let mut redacted = match url.find("://") {
		Some(scheme_end) => {
			let after_scheme = &url[scheme_end + 3..];
			let authority_end = after_scheme.find('/').unwrap_or(after_scheme.len());
			match after_scheme[..authority_end].rfind('@') {
				Some(at_pos) => format!(
					"{}[REDACTED]@{}",
					&url[..scheme_end + 3],
					&after_scheme[at_pos + 1..]
				),
				None => url.to_string(),
			}
		},
		None => url.to_string(),
	};

	if let Some(pos) = redacted.find("/v2/") {
		let key_start = pos + 4;
		let key_end = redacted[key_start..]
			.find(['/', '?'])
			.map(|i| key_start + i)
			.unwrap_or(redacted.len());
		if key_end > key_start {
			redacted.replace_range(key_start..key_end, "REDACTED");
		}
	}
	redacted
}
