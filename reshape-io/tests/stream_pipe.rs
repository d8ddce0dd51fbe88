//! Sink adapter lifecycle: binding, forwarding, teardown and backpressure

use reshape_engine::{EventKind, Hook, TransformOptions, UnmappedFields};
use reshape_io::{
    readable_stream_from, transform_iterable, transform_objects, CollectSink, NdjsonSink,
    NdjsonSource, ObjectStream, PipeStatus, PushSink, SinkEvent, SinkEventKind, StreamError,
    UnpipeInfo,
};
use reshape_test_utils::{fixtures, TestDataGenerator};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

fn passthrough() -> TransformOptions {
    TransformOptions::builder("root")
        .unmapped(UnmappedFields::KeepSourceKey)
        .build()
        .unwrap()
}

fn numbered(count: usize) -> Vec<Value> {
    (0..count).map(|n| json!({ "n": n })).collect()
}

fn event_log(sink: &CollectSink) -> Rc<RefCell<Vec<&'static str>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for (kind, label) in [
        (SinkEventKind::Pipe, "pipe"),
        (SinkEventKind::Unpipe, "unpipe"),
        (SinkEventKind::Finish, "finish"),
        (SinkEventKind::Close, "close"),
        (SinkEventKind::Error, "error"),
    ] {
        let log = Rc::clone(&log);
        sink.events().on(kind, move |_| log.borrow_mut().push(label));
    }
    log
}

#[test]
fn single_sink_receives_every_item_then_end() {
    let stream = ObjectStream::new(readable_stream_from(numbered(5)), passthrough());
    let sink = Rc::new(CollectSink::new());
    let log = event_log(&sink);

    stream.pipe(Rc::clone(&sink)).unwrap();

    assert_eq!(sink.items(), numbered(5));
    assert!(sink.is_ended());
    assert_eq!(*log.borrow(), vec!["pipe", "finish", "unpipe"]);
    assert_eq!(stream.pipe_status(), PipeStatus::TornDown);
}

#[test]
fn second_bind_fails_while_first_is_active() {
    let stream = ObjectStream::new(readable_stream_from(numbered(3)), passthrough());
    let first = stream
        .pipe(Rc::new(CollectSink::with_high_water_mark(1)))
        .unwrap();
    assert!(stream.is_piped());

    let err = stream.pipe(Rc::new(CollectSink::new())).unwrap_err();
    assert!(matches!(
        err,
        StreamError::DestinationAlreadyBound { stream: id } if id == stream.id()
    ));
    assert!(err.to_string().contains("already piped"));

    // The first binding keeps flowing
    first.drain();
    first.drain();
    first.drain();
    assert_eq!(first.items(), numbered(3));
    assert!(first.is_ended());
}

#[test]
fn rebinding_after_teardown_is_allowed() {
    let stream = ObjectStream::new(readable_stream_from(numbered(4)), passthrough());
    let first = stream
        .pipe(Rc::new(CollectSink::with_high_water_mark(2)))
        .unwrap();
    assert_eq!(first.len(), 2);

    stream.unpipe();
    assert_eq!(stream.pipe_status(), PipeStatus::TornDown);

    let second = stream.pipe(Rc::new(CollectSink::new())).unwrap();
    assert_eq!(second.items(), numbered(4)[2..].to_vec());
    assert!(second.is_ended());
    assert!(!first.is_ended());
}

#[test]
fn backpressure_pauses_until_drain() {
    let stream = ObjectStream::new(readable_stream_from(numbered(5)), passthrough());
    let sink = stream
        .pipe(Rc::new(CollectSink::with_high_water_mark(2)))
        .unwrap();

    assert_eq!(sink.len(), 2);
    assert!(stream.is_piped());

    sink.drain();
    assert_eq!(sink.len(), 4);

    sink.drain();
    assert_eq!(sink.items(), numbered(5));
    assert!(sink.is_ended());
    assert!(!stream.is_piped());
}

#[test]
fn sink_close_tears_down_once() {
    let stream = ObjectStream::new(readable_stream_from(numbered(3)), passthrough());
    let sink = Rc::new(CollectSink::with_high_water_mark(1));
    let log = event_log(&sink);
    stream.pipe(Rc::clone(&sink)).unwrap();

    sink.events().emit(&SinkEvent::Close);
    sink.events().emit(&SinkEvent::Close);

    assert_eq!(stream.pipe_status(), PipeStatus::TornDown);
    assert_eq!(stream.hub().listener_count(EventKind::Data), 0);
    assert_eq!(stream.hub().listener_count(EventKind::End), 0);
    assert_eq!(*log.borrow(), vec!["pipe", "close", "unpipe", "close"]);

    // Drain after teardown no longer pumps
    sink.drain();
    assert_eq!(sink.len(), 1);
}

#[test]
fn sink_error_tears_down_without_reraising() {
    let stream = ObjectStream::new(readable_stream_from(numbered(3)), passthrough());
    let sink = stream
        .pipe(Rc::new(CollectSink::with_high_water_mark(1)))
        .unwrap();

    sink.events().emit(&SinkEvent::Error("downstream broke".into()));

    assert!(!stream.is_piped());
    assert_eq!(sink.events().listener_count(SinkEventKind::Drain), 0);
    assert_eq!(sink.events().listener_count(SinkEventKind::Error), 0);
}

#[test]
fn external_unpipe_signal_is_honoured_once() {
    let stream = ObjectStream::new(readable_stream_from(numbered(3)), passthrough());
    let sink = stream
        .pipe(Rc::new(CollectSink::with_high_water_mark(1)))
        .unwrap();

    let claimed = UnpipeInfo::new();
    assert!(claimed.claim());
    sink.events()
        .emit(&SinkEvent::Unpipe(stream.id(), Rc::clone(&claimed)));
    assert!(stream.is_piped());

    let fresh = UnpipeInfo::new();
    sink.events()
        .emit(&SinkEvent::Unpipe(stream.id(), Rc::clone(&fresh)));
    assert!(fresh.has_unpiped());
    assert!(!stream.is_piped());
}

#[test]
fn unpipe_is_idempotent() {
    let stream = ObjectStream::new(readable_stream_from(numbered(3)), passthrough());
    let sink = Rc::new(CollectSink::with_high_water_mark(1));
    let log = event_log(&sink);
    stream.pipe(Rc::clone(&sink)).unwrap();

    stream.unpipe();
    stream.unpipe();

    assert_eq!(*log.borrow(), vec!["pipe", "unpipe"]);
    assert_eq!(stream.pipe_status(), PipeStatus::TornDown);
}

#[test]
fn null_item_ends_piped_stream() {
    let stream = ObjectStream::new(
        readable_stream_from(vec![json!({"a": 1}), Value::Null, json!({"a": 2})]),
        passthrough(),
    );
    let ends = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&ends);
    stream.on(Hook::end(move || *counter.borrow_mut() += 1));

    let sink = stream.pipe(Rc::new(CollectSink::new())).unwrap();

    assert_eq!(sink.items(), vec![json!({"a": 1})]);
    assert!(sink.is_ended());
    assert_eq!(*ends.borrow(), 1);
}

#[test]
fn source_error_is_reported_on_sink() {
    let source = NdjsonSource::new(Cursor::new("{\"a\":1}\nnot json\n"));
    let stream = ObjectStream::new(source, passthrough());
    let sink = Rc::new(CollectSink::new());
    let errors = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&errors);
    sink.events().on(SinkEventKind::Error, move |event| {
        if let SinkEvent::Error(message) = event {
            log.borrow_mut().push(message.clone());
        }
    });

    stream.pipe(Rc::clone(&sink)).unwrap();

    assert_eq!(sink.items(), vec![json!({"a": 1})]);
    assert!(!sink.is_ended());
    assert_eq!(errors.borrow().len(), 1);
    assert!(errors.borrow()[0].contains("line 2"));
    assert!(!stream.is_piped());
}

#[test]
fn ndjson_round_trip_through_pipe() {
    let input = "{\"first\":\"Ada\"}\n\n{\"first\":\"Grace\"}\n";
    let options = TransformOptions::builder("person")
        .field_maps(vec![reshape_engine::FieldMapEntry::new(
            "first",
            "name.given",
            "person",
        )])
        .build()
        .unwrap();

    let stream = ObjectStream::new(NdjsonSource::new(Cursor::new(input)), options);
    let sink = stream.pipe(Rc::new(NdjsonSink::new(Vec::new()))).unwrap();

    assert_eq!(sink.written(), 2);
    let out = String::from_utf8(sink.take_writer().unwrap()).unwrap();
    assert_eq!(
        out,
        "{\"name\":{\"given\":\"Ada\"}}\n{\"name\":{\"given\":\"Grace\"}}\n"
    );
}

#[test]
fn animal_fixture_through_transform_objects() {
    let options = TransformOptions::builder(fixtures::ROOT_NAME)
        .field_maps(fixtures::field_maps())
        .skip_props(fixtures::SKIP_PROPS)
        .classifier(fixtures::classifier())
        .on_object_name(|name, tag, _| {
            let next = if fixtures::NAMED_TAGS.contains(&tag.as_str()) {
                tag.as_str()
            } else {
                name
            };
            Some(next.to_string())
        })
        .on_fold(|fold, _, tag| tag.is(fixtures::FLATTEN_TAG).then(|| fold.clone().flatten()))
        .build()
        .unwrap();

    let out = transform_objects(vec![fixtures::record(), fixtures::record()], options).unwrap();
    assert_eq!(out, vec![fixtures::expected(), fixtures::expected()]);
}

#[test]
fn transform_iterable_is_lazy() {
    let records = TestDataGenerator::large_record_set(10);
    let mut iter = transform_iterable(records, passthrough());

    assert_eq!(iter.stream().emitted(), 0);
    let first = iter.next().unwrap().unwrap();
    assert_eq!(first["id"], json!(0));
    assert_eq!(iter.stream().emitted(), 1);
    assert_eq!(iter.count(), 9);
}

#[test]
fn sink_trait_objects_can_be_piped() {
    struct Counting {
        count: RefCell<usize>,
        events: reshape_io::SinkEvents,
    }

    impl PushSink for Counting {
        fn write(&self, _: &Value) -> bool {
            *self.count.borrow_mut() += 1;
            true
        }

        fn end(&self) {
            self.events.emit(&SinkEvent::Close);
        }

        fn events(&self) -> &reshape_io::SinkEvents {
            &self.events
        }
    }

    let stream = ObjectStream::new(readable_stream_from(numbered(7)), passthrough());
    let sink = stream
        .pipe(Rc::new(Counting {
            count: RefCell::new(0),
            events: reshape_io::SinkEvents::new(),
        }))
        .unwrap();

    assert_eq!(*sink.count.borrow(), 7);
    assert!(!stream.is_piped());
}

#[test]
fn drain_emitted_during_write_keeps_pumping() {
    struct EagerDrain {
        items: RefCell<Vec<Value>>,
        ended: RefCell<bool>,
        events: reshape_io::SinkEvents,
    }

    impl PushSink for EagerDrain {
        fn write(&self, item: &Value) -> bool {
            self.items.borrow_mut().push(item.clone());
            self.events.emit(&SinkEvent::Drain);
            false
        }

        fn end(&self) {
            *self.ended.borrow_mut() = true;
            self.events.emit(&SinkEvent::Finish);
        }

        fn events(&self) -> &reshape_io::SinkEvents {
            &self.events
        }
    }

    let stream = ObjectStream::new(readable_stream_from(numbered(4)), passthrough());
    let sink = stream
        .pipe(Rc::new(EagerDrain {
            items: RefCell::new(Vec::new()),
            ended: RefCell::new(false),
            events: reshape_io::SinkEvents::new(),
        }))
        .unwrap();

    assert_eq!(*sink.items.borrow(), numbered(4));
    assert!(*sink.ended.borrow());
    assert!(!stream.is_piped());
}
