//! Codec tests for oscwire core
//!
//! Covers the wire layout of messages and bundles, malformed input
//! handling and interoperability with an independent OSC implementation.

use oscwire_core::endpoint::ANY_ENDPOINT;
use oscwire_core::stream::{StreamReader, StreamWriter};
use oscwire_core::{
    codec, Bundle, Error, Message, OscValue, Packet, Rgba, BUNDLE_TAG,
};
use rosc::{OscBundle, OscColor, OscMessage, OscPacket, OscTime, OscType};

fn message(path: &str) -> Message {
    Message::with_path(path).expect("valid path")
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_single_float_message_roundtrip() {
    let msg = message("/synth/1/freq").with_argument(440.0f32);

    let encoded = codec::encode(&Packet::from(msg.clone())).expect("encode failed");
    let decoded = codec::decode(&encoded, ANY_ENDPOINT).expect("decode failed");

    match decoded {
        Packet::Message(m) => {
            assert_eq!(m.address().full_path(), "/synth/1/freq");
            assert_eq!(m.arguments(), &[OscValue::Float(440.0)]);
        }
        _ => panic!("Expected Message"),
    }
}

#[test]
fn test_bundle_roundtrip_preserves_order_and_size() {
    let a = message("/light/1").with_argument(1.0f32).with_argument("on");
    let b = message("/light/2").with_argument(0i32).with_argument(true);
    let packet = Packet::from(Bundle::new(12345).with_packet(a.clone()).with_packet(b.clone()));

    let encoded = codec::encode(&packet).expect("encode failed");

    let mut reader = StreamReader::new(&encoded);
    let decoded = Packet::read(&mut reader, ANY_ENDPOINT).expect("decode failed");
    assert_eq!(reader.position(), encoded.len());

    let bundle = decoded.as_bundle().expect("Expected Bundle");
    assert_eq!(bundle.time_tag(), 12345);
    assert_eq!(bundle.packets(), &[Packet::Message(a), Packet::Message(b)]);
    assert_eq!(decoded, packet);
}

#[test]
fn test_unrecognized_leading_bytes() {
    let junk = [0x12u8, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0, 0, 0, 0, 0];
    assert_eq!(
        codec::decode(&junk, ANY_ENDPOINT),
        Err(Error::UnrecognizedPacket)
    );
    assert_eq!(codec::decode(&[], ANY_ENDPOINT), Err(Error::UnrecognizedPacket));
}

#[test]
fn test_short_child_length_is_framing_error() {
    let child = message("/a/b").with_argument(1.5f32).with_argument(2i32);
    let mut child_bytes = StreamWriter::new();
    child.write(&mut child_bytes).unwrap();

    let mut w = StreamWriter::new();
    w.write_raw(BUNDLE_TAG);
    w.write_time_tag(1);
    w.write_i32(child_bytes.position() as i32 - 4);
    w.write_raw(child_bytes.as_slice());

    let result = codec::decode(w.as_slice(), ANY_ENDPOINT);
    assert!(
        matches!(result, Err(Error::BundleFraming(_))),
        "got {:?}",
        result
    );
}

#[test]
fn test_long_child_length_is_framing_error() {
    let mut w = StreamWriter::new();
    w.write_raw(BUNDLE_TAG);
    w.write_time_tag(1);
    w.write_i32(400);
    w.write_string("/a").unwrap();
    w.write_string(",").unwrap();

    assert!(matches!(
        codec::decode(w.as_slice(), ANY_ENDPOINT),
        Err(Error::BundleFraming(_))
    ));
}

#[test]
fn test_child_with_trailing_slack_is_framing_error() {
    let mut w = StreamWriter::new();
    w.write_raw(BUNDLE_TAG);
    w.write_time_tag(1);
    w.write_i32(12);
    w.write_string("/a").unwrap();
    w.write_string(",").unwrap();
    w.write_i32(99);

    assert!(matches!(
        codec::decode(w.as_slice(), ANY_ENDPOINT),
        Err(Error::BundleFraming(_))
    ));
}

#[test]
fn test_bad_magic() {
    let mut w = StreamWriter::new();
    w.write_raw(b"#bundle\0");
    let mut bytes = w.as_slice().to_vec();
    bytes.extend_from_slice(&[0, 0, 0]);
    // truncated time tag
    assert!(matches!(
        codec::decode(&bytes, ANY_ENDPOINT),
        Err(Error::BundleFraming(_))
    ));

    let mut reader = StreamReader::new(b"#bundlX\0\0\0\0\0\0\0\0\x01");
    assert!(matches!(
        Bundle::read(&mut reader, ANY_ENDPOINT, false),
        Err(Error::BundleFraming(_))
    ));
}

#[test]
fn test_truncated_message_does_not_panic() {
    let msg = message("/a/b/c").with_argument("a longer string value").with_argument(3i64);
    let encoded = codec::encode(&Packet::from(msg)).unwrap();
    for cut in 0..encoded.len() {
        let _ = codec::decode(&encoded[..cut], ANY_ENDPOINT);
        let _ = codec::decode_lossy(&encoded[..cut], ANY_ENDPOINT);
    }
}

#[test]
fn test_deep_nesting_is_bounded() {
    let mut packet = Packet::from(message("/leaf"));
    for _ in 0..100 {
        packet = Bundle::immediate().with_packet(packet).into();
    }
    let encoded = codec::encode(&packet).unwrap();
    assert!(matches!(
        codec::decode(&encoded, ANY_ENDPOINT),
        Err(Error::BundleFraming(_))
    ));
}

// ============================================================================
// Nesting and argument coverage
// ============================================================================

#[test]
fn test_nested_bundle_roundtrip() {
    let inner = Bundle::new(99)
        .with_packet(message("/inner/a").with_argument(OscValue::Nil))
        .with_packet(message("/inner/b").with_argument(OscValue::Blob(vec![1, 2, 3])));
    let outer = Bundle::new(42)
        .with_packet(message("/outer").with_argument(-1i32))
        .with_packet(inner)
        .with_packet(Bundle::new(0));
    let packet = Packet::from(outer);

    let encoded = codec::encode(&packet).unwrap();
    assert_eq!(encoded.len() % 4, 0);
    assert_eq!(codec::decode(&encoded, ANY_ENDPOINT).unwrap(), packet);
}

#[test]
fn test_all_argument_types_roundtrip() {
    let msg = message("/types")
        .with_argument(OscValue::Blob(vec![0xFF; 5]))
        .with_argument(true)
        .with_argument(false)
        .with_argument(OscValue::Char(b'q'))
        .with_argument(Rgba::new(1, 2, 3, 4))
        .with_argument(1.0e300f64)
        .with_argument(-0.125f32)
        .with_argument(i32::MIN)
        .with_argument(i64::MAX)
        .with_argument(OscValue::Nil)
        .with_argument("")
        .with_argument(OscValue::TimeTag(1))
        .with_argument(OscValue::Infinitum);
    assert_eq!(msg.type_tags(), ",bTFcrdfihNstI");

    let packet = Packet::from(msg);
    let encoded = codec::encode(&packet).unwrap();
    assert_eq!(codec::decode(&encoded, ANY_ENDPOINT).unwrap(), packet);
}

#[test]
fn test_message_without_arguments() {
    let packet = Packet::from(message("/ping"));
    let encoded = codec::encode(&packet).unwrap();
    assert_eq!(encoded.as_ref(), b"/ping\0\0\0,\0\0\0");
    assert_eq!(codec::decode(&encoded, ANY_ENDPOINT).unwrap(), packet);
}

#[test]
fn test_pattern_message_not_encoded() {
    let packet = Packet::from(message("/mixer/*/volume"));
    assert!(matches!(
        codec::encode(&packet),
        Err(Error::MalformedAddress(_))
    ));
}

// ============================================================================
// Interoperability
// ============================================================================

#[test]
fn test_rosc_decodes_our_message() {
    let msg = message("/mix/ch3/fader")
        .with_argument(0.75f32)
        .with_argument(3i32)
        .with_argument("label")
        .with_argument(OscValue::Blob(vec![9, 9]))
        .with_argument(7i64)
        .with_argument(2.5f64)
        .with_argument(true)
        .with_argument(OscValue::Nil)
        .with_argument(Rgba::new(10, 20, 30, 40));
    let encoded = codec::encode(&Packet::from(msg)).unwrap();

    let (rest, packet) = rosc::decoder::decode_udp(&encoded).expect("rosc decode failed");
    assert!(rest.is_empty());
    match packet {
        OscPacket::Message(m) => {
            assert_eq!(m.addr, "/mix/ch3/fader");
            assert_eq!(
                m.args,
                vec![
                    OscType::Float(0.75),
                    OscType::Int(3),
                    OscType::String("label".to_string()),
                    OscType::Blob(vec![9, 9]),
                    OscType::Long(7),
                    OscType::Double(2.5),
                    OscType::Bool(true),
                    OscType::Nil,
                    OscType::Color(OscColor {
                        red: 10,
                        green: 20,
                        blue: 30,
                        alpha: 40
                    }),
                ]
            );
        }
        _ => panic!("Expected Message"),
    }
}

#[test]
fn test_we_decode_rosc_bundle() {
    let packet = OscPacket::Bundle(OscBundle {
        timetag: OscTime::from((1, 2)),
        content: vec![
            OscPacket::Message(OscMessage {
                addr: "/a".to_string(),
                args: vec![OscType::Int(1), OscType::String("xy".to_string())],
            }),
            OscPacket::Bundle(OscBundle {
                timetag: OscTime::from((0, 1)),
                content: vec![OscPacket::Message(OscMessage {
                    addr: "/b/c".to_string(),
                    args: vec![OscType::Bool(false), OscType::Inf],
                })],
            }),
        ],
    });
    let bytes = rosc::encoder::encode(&packet).expect("rosc encode failed");

    let decoded = codec::decode(&bytes, ANY_ENDPOINT).expect("decode failed");
    let bundle = decoded.as_bundle().expect("Expected Bundle");
    assert_eq!(bundle.time_tag(), (1u64 << 32) | 2);

    let messages: Vec<&Message> = bundle.messages().collect();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].address().full_path(), "/a");
    assert_eq!(messages[0].int32_at(0), Some(1));
    assert_eq!(messages[0].string_at(1), Some("xy"));
    assert_eq!(messages[1].address().full_path(), "/b/c");
    assert_eq!(
        messages[1].arguments(),
        &[OscValue::Bool(false), OscValue::Infinitum]
    );
}

#[test]
fn test_bytes_match_rosc_exactly() {
    let ours = message("/x/yz")
        .with_argument(1i32)
        .with_argument("abc")
        .with_argument(OscValue::Blob(vec![1, 2, 3, 4, 5]));
    let theirs = OscPacket::Message(OscMessage {
        addr: "/x/yz".to_string(),
        args: vec![
            OscType::Int(1),
            OscType::String("abc".to_string()),
            OscType::Blob(vec![1, 2, 3, 4, 5]),
        ],
    });

    let ours = codec::encode(&Packet::from(ours)).unwrap();
    let theirs = rosc::encoder::encode(&theirs).unwrap();
    assert_eq!(ours.as_ref(), theirs.as_slice());
}
