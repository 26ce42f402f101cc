//! Property tests for reader navigation invariants.

use core_state::{LineReader, NavOutcome, ReaderConfig};
use core_text::{CellMeasure, View};
use proptest::prelude::*;

fn prose() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            "[a-z]{1,9}",
            Just(" ".to_string()),
            Just("\n".to_string()),
            Just(", ".to_string()),
            Just(". ".to_string()),
            Just("你好".to_string()),
            Just("。".to_string()),
            Just("“".to_string()),
            Just("”".to_string()),
        ],
        1..80,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    // Advancing to the end visits lines that tile the document exactly.
    #[test]
    fn forward_walk_tiles_document(raw in prose(), width in 1u32..30) {
        let mut reader = LineReader::new();
        reader.load(&raw);
        prop_assume!(!reader.is_empty());
        let view = View::new(width, &CellMeasure);
        let mut rebuilt = String::new();
        let mut last = reader.current_offset();
        loop {
            let line = reader.current_line(&view).to_string();
            match reader.advance(&view) {
                NavOutcome::Moved => {
                    prop_assert!(reader.current_offset() > last);
                    last = reader.current_offset();
                    rebuilt.push_str(&line);
                }
                NavOutcome::ReachedEnd => break,
                NavOutcome::ReachedStart => prop_assert!(false),
            }
        }
        rebuilt.push_str(reader.current_tail());
        prop_assert_eq!(rebuilt.as_str(), reader.document().as_str());
    }

    // With stable width, retreat undoes advance exactly.
    #[test]
    fn retreat_inverts_advance(raw in prose(), width in 1u32..30, steps in 1usize..20) {
        let mut reader = LineReader::new();
        reader.load(&raw);
        let view = View::new(width, &CellMeasure);
        let mut starts = vec![reader.current_offset()];
        for _ in 0..steps {
            if reader.advance(&view) != NavOutcome::Moved {
                break;
            }
            starts.push(reader.current_offset());
        }
        starts.pop();
        while let Some(expected) = starts.pop() {
            prop_assert_eq!(reader.retreat(&view), NavOutcome::Moved);
            prop_assert_eq!(reader.current_offset(), expected);
        }
        prop_assert_eq!(reader.retreat(&view), NavOutcome::ReachedStart);
    }

    // Once the bounded history runs out, retreat estimates and keeps moving
    // strictly back until the start.
    #[test]
    fn retreat_past_evicted_history(
        raw in prose(),
        width in 1u32..30,
        capacity in 1usize..4,
        steps in 1usize..20,
    ) {
        let mut reader = LineReader::with_config(ReaderConfig {
            history_capacity: capacity,
            ..ReaderConfig::default()
        });
        reader.load(&raw);
        let view = View::new(width, &CellMeasure);
        let mut starts = vec![reader.current_offset()];
        for _ in 0..steps {
            if reader.advance(&view) != NavOutcome::Moved {
                break;
            }
            starts.push(reader.current_offset());
        }
        starts.pop();
        let moves = starts.len();
        prop_assert_eq!(reader.history_evictions(), moves.saturating_sub(capacity) as u64);

        for _ in 0..moves.min(capacity) {
            let expected = starts.pop();
            prop_assert_eq!(reader.retreat(&view), NavOutcome::Moved);
            prop_assert_eq!(Some(reader.current_offset()), expected);
        }
        prop_assert_eq!(reader.slow_path_retreats(), 0);

        let mut before = reader.current_offset();
        let mut estimated = 0u64;
        while before > 0 {
            prop_assert_eq!(reader.retreat(&view), NavOutcome::Moved);
            prop_assert!(reader.current_offset() < before);
            before = reader.current_offset();
            estimated += 1;
        }
        prop_assert_eq!(reader.slow_path_retreats(), estimated);
        prop_assert_eq!(reader.retreat(&view), NavOutcome::ReachedStart);
    }

    // Estimated retreats always land strictly earlier and in range.
    #[test]
    fn estimated_retreat_moves_back(raw in prose(), width in 1u32..30, at in 0.0f64..1.0) {
        let mut reader = LineReader::new();
        reader.load(&raw);
        prop_assume!(!reader.is_empty());
        let view = View::new(width, &CellMeasure);
        reader.seek_to_progress(at);
        let before = reader.current_offset();
        let outcome = reader.retreat(&view);
        if before == 0 {
            prop_assert_eq!(outcome, NavOutcome::ReachedStart);
        } else {
            prop_assert_eq!(outcome, NavOutcome::Moved);
            prop_assert!(reader.current_offset() < before);
        }
    }

    #[test]
    fn seek_clamps_into_document(raw in prose(), index in any::<i64>()) {
        let mut reader = LineReader::new();
        reader.load(&raw);
        reader.seek_to_offset(index);
        let pos = reader.current_offset();
        if reader.is_empty() {
            prop_assert_eq!(pos, 0);
        } else {
            prop_assert!(pos < reader.len());
        }
        let progress = reader.progress();
        prop_assert!((0.0..1.0).contains(&progress));
    }

    #[test]
    fn last_line_is_final(raw in prose(), width in 1u32..30) {
        let mut reader = LineReader::new();
        reader.load(&raw);
        prop_assume!(!reader.is_empty());
        let view = View::new(width, &CellMeasure);
        reader.last_line(&view);
        prop_assert!(reader.current_offset() < reader.len());
        prop_assert_eq!(reader.advance(&view), NavOutcome::ReachedEnd);
    }
}
