use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Token quantity in the token's smallest unit, tagged with the token's
/// decimals. Arithmetic stays on the raw integer; decimals only matter for
/// parsing and display.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct TokenAmount {
    raw: U256,
    decimals: u8,
}

impl TokenAmount {
    pub const USDC_DECIMALS: u8 = 6;

    #[inline]
    pub fn from_raw(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    #[inline]
    pub fn zero(decimals: u8) -> Self {
        Self::from_raw(U256::ZERO, decimals)
    }

    /// Whole units, e.g. `from_whole(3, 6)` is 3_000_000 raw.
    pub fn from_whole(whole: u64, decimals: u8) -> Option<Self> {
        let raw = U256::from(whole).checked_mul(Self::unit(decimals))?;
        Some(Self::from_raw(raw, decimals))
    }

    /// Parse a decimal string such as `"1.5"`. Fractions longer than the
    /// token's decimals are rejected rather than rounded.
    pub fn parse(value: &str, decimals: u8) -> Option<Self> {
        let value = value.trim();
        let (integral, fraction) = match value.split_once('.') {
            Some((i, f)) => (i, f),
            None => (value, ""),
        };

        if integral.is_empty() && fraction.is_empty() {
            return None;
        }
        if fraction.len() > decimals as usize {
            return None;
        }
        if !integral.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }

        let integral = if integral.is_empty() {
            U256::ZERO
        } else {
            U256::from_str_radix(integral, 10).ok()?
        };
        let fraction_scaled = if fraction.is_empty() {
            U256::ZERO
        } else {
            let padded = format!("{:0<width$}", fraction, width = decimals as usize);
            U256::from_str_radix(&padded, 10).ok()?
        };

        let raw = integral
            .checked_mul(Self::unit(decimals))?
            .checked_add(fraction_scaled)?;
        Some(Self::from_raw(raw, decimals))
    }

    #[inline]
    pub fn raw(&self) -> U256 {
        self.raw
    }

    #[inline]
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    pub fn checked_mul_count(self, count: u64) -> Option<Self> {
        let raw = self.raw.checked_mul(U256::from(count))?;
        Some(Self::from_raw(raw, self.decimals))
    }

    #[inline]
    fn unit(decimals: u8) -> U256 {
        U256::from(10u64).pow(U256::from(decimals))
    }
}

impl core::fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let unit = Self::unit(self.decimals);
        let integral = self.raw / unit;
        let fraction = self.raw % unit;

        if self.decimals == 0 {
            return write!(f, "{}", integral);
        }

        let max_scale_len = self.decimals as usize;
        let frac_str = format!(
            "{:0>max_scale_len$}",
            fraction.to_string(),
            max_scale_len = max_scale_len
        );

        let final_frac_str = match f.precision() {
            Some(p) => {
                let len = p.min(max_scale_len);
                frac_str[0..len].to_string()
            }
            None => {
                let trimmed = frac_str.trim_end_matches('0');
                if trimmed.is_empty() {
                    "0".to_string()
                } else {
                    trimmed.to_string()
                }
            }
        };

        write!(f, "{}.{}", integral, final_frac_str)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_whole() {
        let three = TokenAmount::from_whole(3, TokenAmount::USDC_DECIMALS).unwrap();
        assert_eq!(three.raw(), U256::from(3_000_000u64));
        assert_eq!(three.decimals(), 6);
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            TokenAmount::parse("1.5", 6).unwrap().raw(),
            U256::from(1_500_000u64)
        );
        assert_eq!(TokenAmount::parse("42", 6).unwrap().raw(), U256::from(42_000_000u64));
        assert_eq!(TokenAmount::parse(".25", 2).unwrap().raw(), U256::from(25u64));
        assert!(TokenAmount::parse("0.0000001", 6).is_none());
        assert!(TokenAmount::parse("1,5", 6).is_none());
        assert!(TokenAmount::parse("", 6).is_none());
        assert!(TokenAmount::parse("-1", 6).is_none());
    }

    #[test]
    fn test_display() {
        let amount = TokenAmount::from_raw(U256::from(3_250_000u64), 6);
        assert_eq!(amount.to_string(), "3.25");
        assert_eq!(format!("{:.2}", amount), "3.25");
        assert_eq!(format!("{:.1}", amount), "3.2");
        assert_eq!(TokenAmount::zero(6).to_string(), "0.0");
        assert_eq!(TokenAmount::from_raw(U256::from(7u64), 0).to_string(), "7");
    }

    #[test]
    fn test_checked_mul_count() {
        let price = TokenAmount::from_whole(1, 6).unwrap();
        assert_eq!(
            price.checked_mul_count(10_000).unwrap().raw(),
            U256::from(10_000_000_000u64)
        );
        let max = TokenAmount::from_raw(U256::MAX, 6);
        assert!(max.checked_mul_count(2).is_none());
    }
}
