//! Address tests for oscwire core
//!
//! Pattern matching against realistic address spaces, plus the string and
//! serde conversions used by configuration files.

use oscwire_core::{Message, OscAddress, OscValue};

fn addr(s: &str) -> OscAddress {
    s.parse().expect("valid address")
}

#[test]
fn test_mixer_address_space() {
    let targets: Vec<OscAddress> = (1..=8)
        .flat_map(|ch| {
            vec![
                addr(&format!("/mixer/channel{}/volume", ch)),
                addr(&format!("/mixer/channel{}/pan", ch)),
            ]
        })
        .collect();

    let count = |pattern: &str| {
        let pattern = addr(pattern);
        targets.iter().filter(|t| pattern.matches(t)).count()
    };

    assert_eq!(count("/mixer/*/volume"), 8);
    assert_eq!(count("/mixer/channel[1-4]/*"), 8);
    assert_eq!(count("/mixer/channel?/{volume,pan}"), 16);
    assert_eq!(count("/mixer/channel1/volume"), 1);
    assert_eq!(count("/mixer/*"), 0);
    assert_eq!(count("/mixer/**"), 16);
}

#[test]
fn test_numbered_channels() {
    let a = addr("/mixer/channel/12");
    assert_eq!(a.numeric_prefix(), Some((12, true)));
    assert_eq!(a.numeric_suffix(), Some((12, true)));

    let b = addr("/mixer/fader7");
    assert_eq!(b.numeric_suffix(), Some((7, false)));
    assert_eq!(b.numeric_prefix(), None);
}

#[test]
fn test_build_address_incrementally() {
    let mut a = OscAddress::new();
    assert!(!a.is_valid_path());

    a.push_container("synth").unwrap();
    a.push_container("1").unwrap();
    a.set_method("freq").unwrap();
    assert!(a.is_valid_path());
    assert_eq!(a, addr("/synth/1/freq"));
    assert_eq!(a.container_path(), "/synth/1");

    let base = addr("/synth");
    let leaf = addr("/2/gain");
    assert_eq!((&base / &leaf).full_path(), "/synth/2/gain");
}

#[test]
fn test_string_conversions() {
    let a = OscAddress::try_from("/a/b").unwrap();
    assert_eq!(a.to_string(), "/a/b");
    assert_eq!(String::from(a.clone()), "/a/b");
    assert_eq!(OscAddress::try_from("/a/b".to_string()).unwrap(), a);
    assert!(OscAddress::try_from("a/b").is_err());
    assert!("/".parse::<OscAddress>().is_err());
}

#[test]
fn test_address_serde_as_string() {
    let a = addr("/mixer/*/volume");
    let json = serde_json::to_string(&a).unwrap();
    assert_eq!(json, "\"/mixer/*/volume\"");

    let back: OscAddress = serde_json::from_str(&json).unwrap();
    assert_eq!(back, a);
    assert!(back.is_valid_pattern());
    assert!(!back.is_valid_path());

    assert!(serde_json::from_str::<OscAddress>("\"no-slash\"").is_err());
}

#[test]
fn test_message_serde() {
    let msg = Message::with_path("/synth/1/freq")
        .unwrap()
        .with_argument(440.0f32)
        .with_argument("sine")
        .with_argument(OscValue::Nil);

    let json = serde_json::to_string(&msg).unwrap();
    let back: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(back, msg);
}
