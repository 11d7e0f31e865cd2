use crate::*;

fn sample_parcel() -> Parcel {
    let destination = GlobalAddress::new(LocalityId(3), 17);
    let args = encode(&(42u32, String::from("item"))).unwrap();
    Parcel::new(destination, "distributed-set/add-item", args)
        .with_return_path(ReturnPath::new(LocalityId(1), 9))
}

// ============================================================================
//  ADDRESSES
// ============================================================================

#[test]
fn test_invalid_address_is_not_valid() {
    assert!(!GlobalAddress::INVALID.is_valid());
    assert!(!GlobalAddress::default().is_valid());
    assert!(GlobalAddress::new(LocalityId(0), 5).is_valid());
}

#[test]
fn test_locality_address_is_reserved_slot() {
    let locality = LocalityId(2);
    let gid = locality.address();
    assert!(gid.is_locality());
    assert_eq!(gid.locality, locality);
    assert!(!GlobalAddress::new(locality, 1).is_locality());
    assert!(!GlobalAddress::INVALID.is_locality());
}

#[test]
fn test_address_display() {
    assert_eq!(GlobalAddress::new(LocalityId(1), 7).to_string(), "{1:7}");
    assert_eq!(GlobalAddress::INVALID.to_string(), "{invalid}");
    assert_eq!(LocalityId(4).to_string(), "locality-4");
}

#[test]
fn test_addresses_order_by_locality_first() {
    let a = GlobalAddress::new(LocalityId(0), 99);
    let b = GlobalAddress::new(LocalityId(1), 1);
    assert!(a < b);
}

// ============================================================================
//  FRAMES
// ============================================================================

#[test]
fn test_parcel_frame_roundtrip() -> anyhow::Result<()> {
    let parcel = sample_parcel();
    let bytes = Frame::from(parcel.clone()).encode()?;

    let Frame::Parcel(decoded) = Frame::decode(&bytes)? else {
        panic!("expected a parcel frame");
    };
    assert_eq!(decoded, parcel);

    let (n, s): (u32, String) = decode(&decoded.args)?;
    assert_eq!(n, 42);
    assert_eq!(s, "item");
    Ok(())
}

#[test]
fn test_reply_carries_action_fault_verbatim() -> anyhow::Result<()> {
    let fault = ActionFault::new("already-initialized", "init called twice");
    let reply = sample_parcel()
        .reply(Outcome::Failed(FailureReason::Action(fault.clone())))
        .expect("parcel has a return path");

    let bytes = Frame::from(reply).encode()?;
    let Frame::Reply(decoded) = Frame::decode(&bytes)? else {
        panic!("expected a reply frame");
    };

    assert_eq!(decoded.return_path, ReturnPath::new(LocalityId(1), 9));
    assert_eq!(decoded.outcome, Outcome::Failed(FailureReason::Action(fault)));
    Ok(())
}

#[test]
fn test_fire_and_forget_parcel_has_no_reply() {
    let parcel = Parcel::new(GlobalAddress::new(LocalityId(0), 1), "noop", Vec::new());
    assert!(parcel.reply(Outcome::Value(Vec::new())).is_none());
}

#[test]
fn test_framed_len_matches_encoding() -> anyhow::Result<()> {
    let parcel = sample_parcel();
    let framed = parcel.framed_len()?;
    assert_eq!(framed, Frame::from(parcel.clone()).encode()?.len());

    // invocation ids have a fixed width, so any id frames to the same size
    let renumbered = parcel.with_return_path(ReturnPath::new(LocalityId(1), u64::MAX));
    assert_eq!(renumbered.framed_len()?, framed);
    Ok(())
}

#[test]
fn test_frame_destination() {
    let parcel = sample_parcel();
    let reply = parcel.reply(Outcome::Value(Vec::new())).unwrap();
    assert_eq!(Frame::from(parcel).destination(), LocalityId(3));
    assert_eq!(Frame::from(reply).destination(), LocalityId(1));
}

#[test]
fn test_malformed_frame_is_decode_error() {
    let err = Frame::decode(&[0xFF, 0xFF, 0xFF]).unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[test]
fn test_trailing_bytes_rejected() {
    let mut bytes = encode(&7u64).unwrap();
    bytes.push(0);
    assert!(matches!(decode::<u64>(&bytes), Err(Error::Decode(_))));
}

#[test]
fn test_codec_error_maps_to_failure_reason() {
    let reason = FailureReason::from(Error::Decode("bad args".into()));
    assert_eq!(reason, FailureReason::Decode("bad args".into()));
    assert_eq!(reason.to_string(), "remote decode error: bad args");
}
