use alloy::primitives::U256;
use fastnum::{
    UD128, bint,
    decimal::{Context, RoundingMode, UnsignedDecimal},
};

/// Fixed-point to decimal converter.
#[derive(Clone, Copy, Debug, Default)]
pub struct Converter {
    decimals: i32,
}

impl Converter {
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals: decimals as i32,
        }
    }

    pub fn decimals(&self) -> u8 {
        self.decimals as u8
    }

    /// Converts on-chain fixed-point value into decimal, `None` if the value
    /// does not fit into `N`-word decimal.
    pub fn from_unsigned<const N: usize>(&self, value: U256) -> Option<UnsignedDecimal<N>> {
        let unscaled = bint::UInt::<N>::from_le_slice(value.as_le_slice())?;
        Some(UnsignedDecimal::<N>::from_parts(
            unscaled,
            -self.decimals,
            Context::default().with_rounding_mode(RoundingMode::Floor),
        ))
    }

    pub fn to_unsigned<const N: usize>(&self, value: UnsignedDecimal<N>) -> U256 {
        let rescaled = value.rescale(self.decimals as i16);
        U256::from_le_slice(rescaled.digits().to_radix_le(256).as_slice())
    }
}

/// Parses a floating point value reported by an off-chain feed into a decimal.
///
/// Negative, NaN and infinite values are rejected.
pub fn decimal_from_f64(value: f64) -> Option<UD128> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    UD128::from_str(&value.to_string(), Context::default()).ok()
}

/// Serde adapter rendering integers as decimal strings, the way GraphQL
/// `BigInt` values are transferred.
pub mod decimal_string {
    use std::{fmt::Display, str::FromStr};

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use fastnum::udec128;

    use super::*;

    #[test]
    fn test_numeric_converter_from_unsigned() {
        assert_eq!(
            Converter::new(0).from_unsigned(U256::from(1234567890)),
            Some(udec128!(1234567890))
        );
        assert_eq!(
            Converter::new(6).from_unsigned(U256::from(1234567890)),
            Some(udec128!(1234.56789))
        );
        assert_eq!(
            Converter::new(18).from_unsigned(U256::from(3_150_000_000_000_000_000u128)),
            Some(udec128!(3.15))
        );
    }

    #[test]
    fn test_numeric_converter_from_unsigned_out_of_range() {
        let conv = Converter::new(18);
        assert_eq!(conv.from_unsigned::<2>(U256::MAX), None);
        assert_eq!(conv.from_unsigned::<2>(U256::from(1u8) << 128), None);
        assert!(conv.from_unsigned::<2>(U256::from(u128::MAX)).is_some());
    }

    #[test]
    fn test_numeric_converter_to_unsigned() {
        assert_eq!(
            Converter::new(0).to_unsigned(udec128!(1234567890)),
            U256::from(1234567890)
        );
        assert_eq!(
            Converter::new(6).to_unsigned(udec128!(1234.56789)),
            U256::from(1234567890)
        );
        assert_eq!(
            Converter::new(18).to_unsigned(udec128!(3.15)),
            U256::from(3_150_000_000_000_000_000u128)
        );
    }

    #[test]
    fn test_decimal_from_f64() {
        assert_eq!(decimal_from_f64(3.125), Some(udec128!(3.125)));
        assert_eq!(decimal_from_f64(0.0), Some(udec128!(0)));
        assert_eq!(decimal_from_f64(-1.0), None);
        assert_eq!(decimal_from_f64(f64::NAN), None);
    }

    #[test]
    fn test_decimal_string_serde() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Row {
            #[serde(with = "decimal_string")]
            value: U256,
            #[serde(with = "decimal_string")]
            block: u64,
        }

        let row = Row {
            value: U256::from(234),
            block: 17,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"value":"234","block":"17"}"#);
        assert_eq!(serde_json::from_str::<Row>(&json).unwrap(), row);
    }
}
