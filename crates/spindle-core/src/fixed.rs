use fixed::types::I32F32;

/// Q32.32 fixed-point used for cash amounts so that win totals are exact and
/// identical across platforms.
pub type Fixed64 = I32F32;

/// Coin wins are whole coins.
pub type Coins = i64;

/// Convert an f64 to Fixed64. Use only at load time, never during play.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and reporting.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Cash value of a coin win at the given bet per coin.
///
/// Saturates instead of wrapping on overflow.
#[inline]
pub fn coins_to_cash(coins: Coins, cash_per_coin: Fixed64) -> Fixed64 {
    let coins = Fixed64::saturating_from_num(coins);
    coins.saturating_mul(cash_per_coin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed64_basic_arithmetic() {
        let a = f64_to_fixed64(1.5);
        let b = f64_to_fixed64(2.0);
        assert_eq!(fixed64_to_f64(a + b), 3.5);
    }

    #[test]
    fn coins_to_cash_multiplies() {
        let cash = coins_to_cash(40, f64_to_fixed64(0.25));
        assert_eq!(cash, Fixed64::from_num(10));
    }

    #[test]
    fn coins_to_cash_zero_bet() {
        assert_eq!(coins_to_cash(1_000, Fixed64::ZERO), Fixed64::ZERO);
    }

    #[test]
    fn coins_to_cash_saturates() {
        let cash = coins_to_cash(i64::MAX, Fixed64::from_num(1000));
        assert_eq!(cash, Fixed64::MAX);
    }
}
