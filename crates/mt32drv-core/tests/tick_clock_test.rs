use mt32drv_core::TickClock;
use pretty_assertions::assert_eq;

#[test]
fn first_tick_is_due_before_any_frames() {
    let mut clock = TickClock::new(32_000, 10_000).expect("valid rates");
    assert_eq!(clock.frames_until_tick(512), 0);
    assert!(clock.advance(0));
    assert_eq!(clock.frames_until_tick(512), 3);
}

#[test]
fn fractional_ticks_do_not_drift() {
    let mut clock = TickClock::new(32_000, 10_000).expect("valid rates");
    assert!((clock.samples_per_tick() - 3.2).abs() < 1e-4);

    let mut ticks = 0;
    let mut rendered = 0;
    while rendered < 32_000 {
        let step = clock.frames_until_tick(32_000 - rendered);
        rendered += step;
        if clock.advance(step) {
            ticks += 1;
        }
    }
    // One second of frames plus the initial tick.
    assert!((10_000..=10_001).contains(&ticks), "ticks = {}", ticks);
}

#[test]
fn segments_are_capped_by_the_request() {
    let mut clock = TickClock::new(32_000, 100).expect("valid rates");
    clock.advance(0);
    assert_eq!(clock.frames_until_tick(64), 64);
    assert!(!clock.advance(64));
    assert_eq!(clock.frames_until_tick(1000), 320 - 64);
}

#[test]
fn rejects_unusable_frequencies() {
    assert!(TickClock::new(32_000, 0).is_none());
    assert!(TickClock::new(32_000, 64_000).is_none());
    assert!(TickClock::new(32_000, 32_000).is_some());
}
