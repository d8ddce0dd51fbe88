//! Property-based tests for ordering under backpressure

use proptest::prelude::*;
use reshape_engine::{TransformOptions, UnmappedFields};
use reshape_io::{readable_stream_from, CollectSink, ObjectStream};
use serde_json::{json, Value};
use std::rc::Rc;

fn passthrough() -> TransformOptions {
    TransformOptions::builder("root")
        .unmapped(UnmappedFields::KeepSourceKey)
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn every_item_arrives_in_order(count in 0usize..40, limit in 1usize..8) {
        let items: Vec<Value> = (0..count).map(|n| json!({ "n": n })).collect();
        let stream = ObjectStream::new(readable_stream_from(items.clone()), passthrough());
        let sink = stream
            .pipe(Rc::new(CollectSink::with_high_water_mark(limit)))
            .unwrap();

        let mut drains = 0;
        while !sink.is_ended() {
            prop_assert!(drains <= count + 1);
            sink.drain();
            drains += 1;
        }

        prop_assert_eq!(sink.items(), items);
        prop_assert!(!stream.is_piped());
    }
}
