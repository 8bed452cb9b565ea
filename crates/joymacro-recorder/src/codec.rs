//! Macro text format
//!
//! A macro is stored as its events in chronological order, one
//! `<t>:<tag>,<device>,<slot>,[<value>,]` line each. There is no header: the
//! target devices are the device ids that appear in the stream.

use crate::session::Macro;
use joymacro_core::{DeviceId, Error, InputEvent, Result};
use std::collections::BTreeSet;
use tracing::warn;

/// How to treat lines that fail to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Skip bad lines, keep the rest
    #[default]
    Lenient,
    /// Fail the whole decode on the first bad line
    Strict,
}

/// Result of decoding a macro
#[derive(Debug, Clone)]
pub struct Decoded {
    pub events: Vec<InputEvent>,
    pub devices: BTreeSet<DeviceId>,
    /// Malformed lines dropped under [`Strictness::Lenient`]
    pub skipped: usize,
}

impl Decoded {
    pub fn into_macro(self) -> Macro {
        Macro::from_events(self.events).with_devices(self.devices)
    }
}

pub fn encode(events: &[InputEvent]) -> String {
    events.iter().map(InputEvent::to_line).collect()
}

pub fn encode_macro(m: &Macro) -> String {
    encode(m.events())
}

pub fn decode<S: AsRef<str>>(lines: &[S], strictness: Strictness) -> Result<Decoded> {
    let mut events = Vec::new();
    let mut skipped = 0;

    for (n, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<InputEvent>() {
            Ok(e) => events.push(e),
            Err(e) if strictness == Strictness::Strict => {
                return Err(Error {
                    message: format!("line {}: {}", n + 1, e.message),
                    ..e
                });
            }
            Err(e) => {
                warn!(line = n + 1, "skipping malformed event: {}", e.message);
                skipped += 1;
            }
        }
    }

    let devices = events.iter().map(|e| e.device).collect();
    Ok(Decoded {
        events,
        devices,
        skipped,
    })
}

pub fn decode_str(text: &str, strictness: Strictness) -> Result<Decoded> {
    let lines: Vec<&str> = text.lines().collect();
    decode(&lines, strictness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use joymacro_core::{ErrorCode, EventKind};

    fn sample() -> Vec<InputEvent> {
        vec![
            InputEvent::press(0, 3).at(0),
            InputEvent::axis_change(1, 2, 0.125).at(60),
            InputEvent::pov_change(1, 270).at(80),
            InputEvent::release(0, 3).at(200),
        ]
    }

    #[test]
    fn encode_is_one_line_per_event() {
        let text = encode(&sample());
        assert_eq!(
            text,
            "0:press,0,3,\n60:axis,1,2,0.125,\n80:POV,1,0,270,\n200:release,0,3,\n"
        );
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn decode_inverts_encode() {
        let events = sample();
        let decoded = decode_str(&encode(&events), Strictness::Strict).unwrap();
        assert_eq!(decoded.skipped, 0);
        assert_eq!(decoded.events.len(), events.len());
        for (a, b) in decoded.events.iter().zip(&events) {
            assert!(a.identical(b));
        }
        assert_eq!(decoded.events[0].value(), None);
        assert_eq!(decoded.devices.into_iter().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn lenient_skips_bad_lines() {
        let text = "0:press,0,3,\nnot an event\n\n5:axis,0,1,oops,\n200:release,0,3,\n";
        let decoded = decode_str(text, Strictness::Lenient).unwrap();
        assert_eq!(decoded.skipped, 2);
        let kinds: Vec<_> = decoded.events.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![EventKind::Press, EventKind::Release]);
    }

    #[test]
    fn strict_reports_line_number() {
        let text = "0:press,0,3,\n\n7:axis,0,1,\n";
        let err = decode_str(text, Strictness::Strict).unwrap_err();
        assert_eq!(err.code, ErrorCode::ParseFailure);
        assert!(err.message.starts_with("line 3:"), "{}", err.message);
    }

    #[test]
    fn decoded_macro_is_playable() {
        let m = decode_str(&encode(&sample()), Strictness::Lenient)
            .unwrap()
            .into_macro();
        assert_eq!(m.len(), 4);
        assert_eq!(m.duration_ms(), 200);
        assert!(m.devices().contains(&1));
    }
}
