//! Property-based tests for the universal invariants: arbitrary sequences of
//! orders, cancels, and direct transfers should never break conservation,
//! non-negativity, or book ordering, regardless of what the sequence is.

use std::collections::BTreeMap;

use exchange_core::{Exchange, OrderType, Side};
use proptest::prelude::*;

const USERS: [u64; 4] = [1, 2, 3, 4];
const SYMBOLS: [&str; 2] = ["A", "B"];
const STARTING_BALANCE: u64 = 10_000;
const STARTING_SHARES: u64 = 200;

#[derive(Debug, Clone)]
enum Op {
    PlaceOrder {
        symbol: &'static str,
        user: u64,
        side: Side,
        order_type: OrderType,
        quantity: u64,
        limit_price: Option<u64>,
    },
    Cancel {
        symbol: &'static str,
        user: u64,
        side: Side,
        price: u64,
    },
    TransferMoney {
        from: u64,
        to: u64,
        amount: u64,
    },
    TransferStock {
        symbol: &'static str,
        from: u64,
        to: u64,
        quantity: u64,
    },
    CleanInvalid,
}

fn user_strategy() -> impl Strategy<Value = u64> {
    prop::sample::select(&USERS[..])
}

fn symbol_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(&SYMBOLS[..])
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Bid), Just(Side::Ask)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (
            symbol_strategy(),
            user_strategy(),
            side_strategy(),
            prop::bool::ANY,
            1u64..=50,
            1u64..=120,
        )
            .prop_map(
                |(symbol, user, side, is_limit, quantity, price)| Op::PlaceOrder {
                    symbol,
                    user,
                    side,
                    order_type: if is_limit {
                        OrderType::Limit
                    } else {
                        OrderType::Market
                    },
                    quantity,
                    limit_price: if is_limit { Some(price) } else { None },
                }
            ),
        1 => (symbol_strategy(), user_strategy(), side_strategy(), 1u64..=120)
            .prop_map(|(symbol, user, side, price)| Op::Cancel {
                symbol,
                user,
                side,
                price,
            }),
        1 => (user_strategy(), user_strategy(), 1u64..=200)
            .prop_map(|(from, to, amount)| Op::TransferMoney { from, to, amount }),
        1 => (symbol_strategy(), user_strategy(), user_strategy(), 1u64..=50)
            .prop_map(|(symbol, from, to, quantity)| Op::TransferStock {
                symbol,
                from,
                to,
                quantity,
            }),
        1 => Just(Op::CleanInvalid),
    ]
}

fn apply(ex: &mut Exchange, op: &Op) {
    match *op {
        Op::PlaceOrder {
            symbol,
            user,
            side,
            order_type,
            quantity,
            limit_price,
        } => {
            let _ = ex.place_order(symbol, user, side, order_type, quantity, limit_price);
        }
        Op::Cancel {
            symbol,
            user,
            side,
            price,
        } => {
            let _ = ex.cancel_order(symbol, user, side, price);
        }
        Op::TransferMoney { from, to, amount } => {
            let _ = ex.transfer_money(from, to, amount);
        }
        Op::TransferStock {
            symbol,
            from,
            to,
            quantity,
        } => {
            let _ = ex.transfer_stock(from, to, symbol, quantity);
        }
        Op::CleanInvalid => ex.clean_invalid_orders(),
    }
}

fn fresh_exchange() -> Exchange {
    let mut ex = Exchange::new();
    for &user in &USERS {
        ex.add_user(user, STARTING_BALANCE).unwrap();
    }
    for &symbol in &SYMBOLS {
        ex.ipo_stock(symbol, 10_000, Some(50)).unwrap();
        for &user in &USERS {
            ex.transfer_stock(exchange_core::MARKET_USER_ID, user, symbol, STARTING_SHARES)
                .unwrap();
        }
    }
    ex
}

fn assert_book_well_formed(ex: &Exchange, symbol: &str) {
    let snapshot = ex.get_stock_orders(symbol).unwrap();
    for level in &snapshot.bids {
        assert!(!level.orders.is_empty(), "empty bid level left in book");
        for &(_, qty) in &level.orders {
            assert!(qty > 0, "zero-quantity resting order");
        }
    }
    for level in &snapshot.asks {
        assert!(!level.orders.is_empty(), "empty ask level left in book");
        for &(_, qty) in &level.orders {
            assert!(qty > 0, "zero-quantity resting order");
        }
    }
    let bid_prices: Vec<u64> = snapshot.bids.iter().map(|l| l.price).collect();
    let mut sorted_desc = bid_prices.clone();
    sorted_desc.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(bid_prices, sorted_desc, "bids not ordered best-first");

    let ask_prices: Vec<u64> = snapshot.asks.iter().map(|l| l.price).collect();
    let mut sorted_asc = ask_prices.clone();
    sorted_asc.sort_unstable();
    assert_eq!(ask_prices, sorted_asc, "asks not ordered best-first");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn cash_and_share_totals_are_conserved_across_any_operation_sequence(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut ex = fresh_exchange();
        let (cash0, shares0) = ex.verify_conservation();

        for op in &ops {
            apply(&mut ex, op);
            let (cash1, shares1) = ex.verify_conservation();
            prop_assert_eq!(cash0, cash1);
            prop_assert_eq!(&shares0, &shares1);
            for &symbol in &SYMBOLS {
                assert_book_well_formed(&ex, symbol);
            }
        }
    }

    #[test]
    fn clean_invalid_orders_is_idempotent(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut ex = fresh_exchange();
        for op in &ops {
            apply(&mut ex, op);
        }
        ex.clean_invalid_orders();
        let mut after_one: BTreeMap<&str, _> = BTreeMap::new();
        for &symbol in &SYMBOLS {
            after_one.insert(symbol, ex.get_stock_orders(symbol).unwrap());
        }
        ex.clean_invalid_orders();
        for &symbol in &SYMBOLS {
            prop_assert_eq!(&ex.get_stock_orders(symbol).unwrap(), after_one.get(symbol).unwrap());
        }
    }

    #[test]
    fn cancel_then_cancel_again_never_double_removes(
        user in user_strategy(),
        side in side_strategy(),
        price in 1u64..=120,
    ) {
        let mut ex = fresh_exchange();
        let symbol = SYMBOLS[0];
        let _ = ex.place_order(symbol, user, side, OrderType::Limit, 5, Some(price));
        let first = ex.cancel_order(symbol, user, side, price);
        let second = ex.cancel_order(symbol, user, side, price);
        if first.is_ok() {
            prop_assert!(second.is_err());
        }
    }
}
