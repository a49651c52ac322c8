use super::*;

#[test]
fn sync_hdr_wire_layout() {
    let mut buf = PktBuf::new();
    buf.set_sync_hdr(SyncHdr {
        src: 0x1234,
        epoch: 0xABCD,
    });
    assert_eq!(&buf.raw()[..S_HDR_LEN], &[0x01, 0x34, 0x12, 0xCD, 0xAB]);
    assert_eq!(buf.kind(), KIND_SYNC);

    let hdr = buf.sync_hdr();
    assert_eq!(hdr.src, 0x1234);
    assert_eq!(hdr.epoch, 0xABCD);
}

#[test]
fn ack_hdr_wire_layout() {
    let mut buf = PktBuf::new();
    buf.set_ack_hdr(AckHdr::new(0x0102, 7, Cmd::Sleep));
    assert_eq!(&buf.raw()[..A_HDR_LEN], &[0x03, 0x02, 0x01, 7, 0x22]);

    let hdr = buf.ack_hdr();
    assert_eq!(hdr.epoch, 0x0102);
    assert_eq!(hdr.n_ta, 7);
    assert_eq!(hdr.cmd(), Some(Cmd::Sleep));

    buf.set_ack_hdr(AckHdr::new(1, 0, Cmd::Awake));
    assert_eq!(buf.raw()[4], 0x11);
    assert_eq!(buf.ack_hdr().cmd(), Some(Cmd::Awake));
}

#[test]
fn unknown_cmd_rejects() {
    let mut buf = PktBuf::new();
    buf.set_ack_hdr(AckHdr {
        epoch: 1,
        n_ta: 0,
        cmd_raw: 0x33,
    });
    assert_eq!(buf.ack_hdr().cmd(), None);
}

#[test]
fn payload_window_follows_header() {
    let mut buf = PktBuf::new();
    buf.set_kind(KIND_DATA);
    buf.payload_mut(T_HDR_LEN, 4).copy_from_slice(&[9, 8, 7, 6]);
    assert_eq!(buf.payload(T_HDR_LEN, 4), &[9, 8, 7, 6]);
    assert_eq!(buf.raw()[1..5], [9, 8, 7, 6]);
}

#[test]
fn zero_clears_everything() {
    let mut buf = PktBuf::new();
    buf.set_ack_hdr(AckHdr::new(9, 3, Cmd::Awake));
    buf.payload_mut(A_HDR_LEN, 8).fill(0xFF);
    assert!(!buf.is_zeroed());
    buf.zero();
    assert!(buf.is_zeroed());
}
