use mt32drv_core::{
    build_control_message, checksum, pitch_bend_range_message, OwnedSysEx, SysEx,
    BENDER_RANGE_ADDRESS,
};
use pretty_assertions::assert_eq;

#[test]
fn pitch_bend_range_frame_layout() {
    let frame = pitch_bend_range_message(2, 12);
    assert_eq!(frame.len(), 9);
    assert_eq!(&frame[..4], &[0x41, 0x02, 0x16, 0x12]);
    assert_eq!(&frame[4..7], &BENDER_RANGE_ADDRESS);
    assert_eq!(frame[7], 12);
    assert_eq!(frame[8], checksum(&frame[4..8]));
}

#[test]
fn address_payload_and_checksum_sum_to_a_multiple_of_128() {
    for range in [0u8, 1, 2, 12, 24, 30, 127] {
        let frame = pitch_bend_range_message(0, range);
        let sum: u32 = frame[4..].iter().map(|b| *b as u32).sum();
        assert_eq!(sum % 128, 0, "range {}", range);
    }
}

#[test]
fn out_of_range_pitch_bend_is_still_encoded() {
    let frame = pitch_bend_range_message(0, 30);
    assert_eq!(frame[7], 30);
    assert_eq!(frame[8], checksum(&[0x00, 0x00, 0x04, 30]));
}

#[test]
fn checksum_edge_values() {
    assert_eq!(checksum(&[]), 0);
    assert_eq!(checksum(&[0x00, 0x00, 0x04, 0x0C]), 0x70);
    assert_eq!(checksum(&[0x40, 0x40]), 0);
    assert_eq!(checksum(&[0x7F]), 1);
}

#[test]
fn control_message_carries_device_channel_and_payload() {
    let frame = build_control_message(0x10, [0x20, 0x00, 0x00], b"HELLO");
    assert_eq!(&frame[..7], &[0x41, 0x10, 0x16, 0x12, 0x20, 0x00, 0x00]);
    assert_eq!(&frame[7..12], b"HELLO");
    assert_eq!(frame.len(), 13);
}

#[test]
fn classify_routes_by_first_byte() {
    let framed = [0xF0, 0x41, 0x10, 0xF7];
    let unframed = [0x41, 0x10, 0x16];

    assert_eq!(SysEx::classify(&framed), Some(SysEx::Framed(&framed[..])));
    assert_eq!(SysEx::classify(&unframed), Some(SysEx::Unframed(&unframed[..])));
    assert_eq!(SysEx::classify(&[]), None);
}

#[test]
fn owned_copy_keeps_its_routing() {
    let owned: OwnedSysEx = SysEx::classify(&[0xF0, 0x01, 0xF7])
        .expect("non-empty")
        .into_owned();
    assert!(owned.as_sysex().is_framed());
    assert_eq!(owned.as_sysex().bytes(), &[0xF0, 0x01, 0xF7]);
    assert_eq!(owned.len(), 3);

    let owned = SysEx::classify(&[0x41]).expect("non-empty").into_owned();
    assert!(!owned.as_sysex().is_framed());
}
