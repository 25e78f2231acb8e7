use chrono::Utc;
use coursepay::domain::coupon::{Coupon, DiscountType};
use coursepay::domain::money::Money;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

fn random_coupon(rng: &mut StdRng) -> Coupon {
    let discount_type = if rng.gen_bool(0.5) {
        DiscountType::Percentage
    } else {
        DiscountType::Fixed
    };
    let discount_value = match discount_type {
        DiscountType::Percentage => Decimal::from(rng.gen_range(1..=100u32)),
        DiscountType::Fixed => Decimal::from(rng.gen_range(1_000..=2_000_000u64)),
    };
    Coupon {
        id: 1,
        code: "RANDOM".to_string(),
        description: String::new(),
        discount_type,
        discount_value,
        min_order_amount: Money::from_whole_units(rng.gen_range(0..=200_000)),
        max_discount_amount: rng
            .gen_bool(0.6)
            .then(|| Money::from_whole_units(rng.gen_range(0..=500_000))),
        usage_limit: None,
        used_count: 0,
        valid_from: None,
        valid_to: None,
        is_active: true,
    }
}

#[test]
fn test_discounts_respect_cap_and_floor() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let now = Utc::now();

    for _ in 0..5_000 {
        let coupon = random_coupon(&mut rng);
        // Cents exercise the exact decimal path.
        let total = Money::new(Decimal::new(rng.gen_range(0..=300_000_000i64), 2)).unwrap();

        match coupon.evaluate(total, now) {
            Ok(quote) => {
                assert!(total >= coupon.min_order_amount);
                if let Some(cap) = coupon.max_discount_amount {
                    assert!(quote.discount_amount <= cap, "{coupon:?} on {total}");
                }
                assert!(quote.final_price >= Money::ZERO);
                assert!(quote.final_price <= total);
                let expected = if quote.discount_amount >= total {
                    Money::ZERO
                } else {
                    Money::new(total.value() - quote.discount_amount.value()).unwrap()
                };
                assert_eq!(quote.final_price, expected);
            }
            Err(_) => assert!(total < coupon.min_order_amount),
        }
    }
}

#[test]
fn test_percentage_discount_is_proportional_below_cap() {
    let mut rng = StdRng::seed_from_u64(7);
    let now = Utc::now();

    for _ in 0..1_000 {
        let mut coupon = random_coupon(&mut rng);
        coupon.discount_type = DiscountType::Percentage;
        coupon.discount_value = Decimal::from(rng.gen_range(1..=100u32));
        coupon.max_discount_amount = None;
        coupon.min_order_amount = Money::ZERO;

        let total = Money::from_whole_units(rng.gen_range(0..=10_000_000));
        let quote = coupon.evaluate(total, now).unwrap();
        assert_eq!(
            quote.discount_amount.value(),
            total.value() * coupon.discount_value / Decimal::ONE_HUNDRED
        );
    }
}
