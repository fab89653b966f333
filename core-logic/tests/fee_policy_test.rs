use core_logic::{FeeConfig, FeePolicy, GasLimit, MULTIPLIER_SCALE};

#[test]
fn test_fee_is_deterministic() {
    let config = FeeConfig {
        multiplier: 1.0001,
        ..Default::default()
    };
    let first = FeePolicy::new(&config).compute_fee(5_000_000_123).unwrap();
    for _ in 0..100 {
        let again = FeePolicy::new(&config).compute_fee(5_000_000_123).unwrap();
        assert_eq!(again, first);
    }
}

#[test]
fn test_default_multiplier_bumps_price() {
    let policy = FeePolicy::new(&FeeConfig::default());
    let quote = policy.compute_fee(3_000_000_000).unwrap();
    // 1.0001 x 3 gwei
    assert_eq!(quote.gas_price, 3_000_300_000);
}

#[test]
fn test_fixed_point_truncates() {
    let policy = FeePolicy::new(&FeeConfig {
        multiplier: 1.0001,
        ..Default::default()
    });
    // 7 * 10001 / 10000 = 7.0007 -> 7
    assert_eq!(policy.compute_fee(7).unwrap().gas_price, 7);
    assert_eq!(policy.scaled_multiplier(), 10_001);
    assert_eq!(MULTIPLIER_SCALE, 10_000);
}

#[test]
fn test_multiplier_below_one() {
    let policy = FeePolicy::new(&FeeConfig {
        multiplier: 0.5,
        ..Default::default()
    });
    assert_eq!(policy.compute_fee(1_000).unwrap().gas_price, 500);
}

#[test]
fn test_zero_suggested_price_is_allowed() {
    let policy = FeePolicy::new(&FeeConfig {
        multiplier: 3.0,
        ..Default::default()
    });
    let quote = policy.compute_fee(0).unwrap();
    assert_eq!(quote.gas_price, 0);
    assert_eq!(quote.gas_limit, GasLimit::Estimate);
}

#[test]
fn test_fixed_gas_limit_skips_estimation() {
    let policy = FeePolicy::new(&FeeConfig {
        fixed_gas_limit: 8_000_000,
        ..Default::default()
    });
    assert_eq!(
        policy.compute_fee(1).unwrap().gas_limit,
        GasLimit::Fixed(8_000_000)
    );
}

#[test]
fn test_custom_buffer_percent() {
    let policy = FeePolicy::new(&FeeConfig {
        gas_buffer_percent: 50,
        ..Default::default()
    });
    assert_eq!(policy.buffered_limit(21_000).unwrap(), 31_500);

    let no_buffer = FeePolicy::new(&FeeConfig {
        gas_buffer_percent: 0,
        ..Default::default()
    });
    assert_eq!(no_buffer.buffered_limit(21_000).unwrap(), 21_000);
}

#[test]
fn test_buffer_overflow_is_reported() {
    let policy = FeePolicy::new(&FeeConfig::default());
    assert!(policy.buffered_limit(u64::MAX).is_err());
}
