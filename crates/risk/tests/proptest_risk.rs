use common::{OrderKind, OrderSide, Position};
use proptest::prelude::*;
use risk::{BracketOrder, PositionLedger, RiskConfig};

const SYMBOLS: [&str; 3] = ["ETHUSDT", "BTCUSDT", "SOLUSDT"];

#[derive(Debug, Clone)]
enum Op {
    Open { symbol: usize, long: bool, entry: f64 },
    Clear { symbol: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..SYMBOLS.len(), any::<bool>(), 1.0f64..100_000.0)
            .prop_map(|(symbol, long, entry)| Op::Open { symbol, long, entry }),
        (0..SYMBOLS.len()).prop_map(|symbol| Op::Clear { symbol }),
    ]
}

proptest! {
    /// Bracket prices always straddle the entry on the correct sides.
    #[test]
    fn bracket_prices_are_ordered(
        entry in 0.0001f64..1_000_000.0,
        stop_loss_pct in 0.0001f64..0.5,
        take_profit_pct in 0.0001f64..0.5,
        long in any::<bool>(),
    ) {
        let cfg = RiskConfig { stop_loss_pct, take_profit_pct, ..RiskConfig::default() };
        let side = if long { OrderSide::Buy } else { OrderSide::Sell };
        let (stop, target) = cfg.bracket_prices(side, entry);
        prop_assert!(BracketOrder::new(side, 1.0, entry, stop, target, "e").is_ok());

        let bracket = BracketOrder::new(side, 1.0, entry, stop, target, "e").unwrap();
        prop_assert_eq!(bracket.triggered_by(stop), Some(OrderKind::Stop));
        prop_assert_eq!(bracket.triggered_by(target), Some(OrderKind::TakeProfit));
        prop_assert_eq!(bracket.triggered_by(entry), None);
    }

    /// Position and bracket presence agree after every mutation.
    #[test]
    fn ledger_position_matches_bracket(ops in prop::collection::vec(op(), 0..64)) {
        let cfg = RiskConfig::default();
        let mut ledger = PositionLedger::new();

        for op in ops {
            match op {
                Op::Open { symbol, long, entry } => {
                    let side = if long { OrderSide::Buy } else { OrderSide::Sell };
                    let (stop, target) = cfg.bracket_prices(side, entry);
                    let size = cfg.position_size(entry);
                    let bracket = BracketOrder::new(side, size, entry, stop, target, "e").unwrap();
                    let was_open = ledger.get(SYMBOLS[symbol]).is_some();
                    let result = ledger.set_open(SYMBOLS[symbol], bracket);
                    prop_assert_eq!(result.is_err(), was_open);
                }
                Op::Clear { symbol } => {
                    ledger.clear(SYMBOLS[symbol]);
                    prop_assert_eq!(ledger.position(SYMBOLS[symbol]), Position::Flat);
                }
            }

            for symbol in SYMBOLS {
                let flat = ledger.position(symbol) == Position::Flat;
                prop_assert_eq!(flat, ledger.get(symbol).is_none());
            }
            prop_assert!(ledger.check_invariants().is_ok());
        }
    }
}
