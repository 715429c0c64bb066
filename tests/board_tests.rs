use search_core::board::Board;
use search_core::tt::{BoundType, TranspositionTable};

#[test]
fn perft_positions() {
    struct TestPosition {
        name: &'static str,
        fen: &'static str,
        depths: &'static [(usize, u64)],
    }

    const TEST_POSITIONS: &[TestPosition] = &[
        TestPosition {
            name: "Initial Position",
            fen: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            depths: &[(1, 20), (2, 400), (3, 8902), (4, 197281)],
        },
        TestPosition {
            name: "Kiwipete",
            fen: "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            depths: &[(1, 48), (2, 2039), (3, 97862)],
        },
    ];

    for position in TEST_POSITIONS {
        let mut board = Board::from_fen(position.fen);
        for &(depth, expected) in position.depths {
            let nodes = board.perft(depth);
            assert_eq!(
                nodes, expected,
                "Perft failed for {} at depth {}",
                position.name, depth
            );
        }
    }
}

#[test]
fn test_transposition_table_store_probe_prefers_depth() {
    let tt = TranspositionTable::new(1);
    let hash = 0xdead_beef_u64;

    tt.store(hash, 1, 100, BoundType::Exact, None, 1);
    let entry = tt.probe(hash).expect("entry missing");
    assert_eq!(entry.depth(), 1);

    tt.store(hash, 5, 200, BoundType::Exact, None, 1);
    let entry = tt.probe(hash).expect("entry missing after deeper store");
    assert_eq!(entry.depth(), 5);
}
