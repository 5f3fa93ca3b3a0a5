use ethers_core::types::U256;

/// Render `amount` scaled down by `base` without losing precision.
///
/// `base` is the token's display format as published by the token registry (for example
/// `10^18`). Bases that are not a power of ten are not scalable in decimal and yield the raw
/// integer.
pub fn format_token_amount(amount: U256, base: U256) -> String {
	let Some(decimals) = decimal_exponent(base) else {
		return amount.to_string();
	};
	if decimals == 0 {
		return amount.to_string();
	}

	let whole = amount / base;
	let fraction = (amount % base).to_string();
	format!("{}.{:0>width$}", whole, fraction, width = decimals)
}

fn decimal_exponent(base: U256) -> Option<usize> {
	if base.is_zero() {
		return None;
	}
	let digits = base.to_string();
	let (leading, zeros) = digits.split_at(1);
	(leading == "1" && zeros.bytes().all(|b| b == b'0')).then_some(zeros.len())
}
