use mt32drv_core::{EventQueue, QueuedEvent, SysEx};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;

#[test]
fn dequeue_all_preserves_submission_order() {
    let queue = EventQueue::new();
    let sysex = SysEx::classify(&[0xF0, 0x41, 0xF7])
        .expect("non-empty")
        .into_owned();

    queue.enqueue(QueuedEvent::Short(0x90));
    queue.enqueue(QueuedEvent::SysEx(sysex.clone()));
    queue.enqueue(QueuedEvent::Short(0x80));
    assert_eq!(queue.len(), 3);

    assert_eq!(
        queue.dequeue_all(),
        vec![
            QueuedEvent::Short(0x90),
            QueuedEvent::SysEx(sysex),
            QueuedEvent::Short(0x80),
        ]
    );
    assert!(queue.is_empty());
    assert_eq!(queue.dequeue_all(), Vec::new());
}

#[test]
fn dequeue_into_reuses_the_buffer() {
    let queue = EventQueue::new();
    let mut buffer = vec![QueuedEvent::Short(0xFF)];

    queue.enqueue(QueuedEvent::Short(1));
    queue.enqueue(QueuedEvent::Short(2));
    queue.dequeue_into(&mut buffer);

    assert_eq!(buffer, vec![QueuedEvent::Short(1), QueuedEvent::Short(2)]);
    assert!(queue.is_empty());
}

#[test]
fn concurrent_producers_keep_per_producer_order() {
    let queue = Arc::new(EventQueue::new());
    let producers: Vec<_> = (0..4u32)
        .map(|producer| {
            let queue = queue.clone();
            thread::spawn(move || {
                for seq in 0..500u32 {
                    queue.enqueue(QueuedEvent::Short(producer << 16 | seq));
                }
            })
        })
        .collect();

    let mut drained = Vec::new();
    while producers.iter().any(|p| !p.is_finished()) {
        drained.extend(queue.dequeue_all());
    }
    for producer in producers {
        producer.join().expect("producer thread");
    }
    drained.extend(queue.dequeue_all());

    assert_eq!(drained.len(), 2000);
    let mut last = [None::<u32>; 4];
    for event in drained {
        let QueuedEvent::Short(word) = event else {
            panic!("unexpected event");
        };
        let producer = (word >> 16) as usize;
        let seq = word & 0xFFFF;
        if let Some(prev) = last[producer] {
            assert!(seq > prev, "producer {} out of order", producer);
        }
        last[producer] = Some(seq);
    }
}
