//! Pickle protocol 2 encoding of `[(name, (time, value)), ...]`, as read by
//! carbon's pickle receiver.

use thiserror::Error;

use crate::{MetricValue, Sample};

const PROTO: u8 = 0x80;
const PROTOCOL_VERSION: u8 = 2;
const EMPTY_LIST: u8 = b']';
const MARK: u8 = b'(';
const APPEND: u8 = b'a';
const APPENDS: u8 = b'e';
const BINUNICODE: u8 = b'X';
const BININT: u8 = b'J';
const BININT1: u8 = b'K';
const BININT2: u8 = b'M';
const LONG1: u8 = 0x8a;
const BINFLOAT: u8 = b'G';
const TUPLE2: u8 = 0x86;
const STOP: u8 = b'.';

/// Items per `APPENDS` run
const BATCH_SIZE: usize = 1000;

pub const FRAME_HEADER_SIZE: usize = 4;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("metric name of {0} bytes is too long")]
    KeyTooLong(usize),
    #[error("payload of {0} bytes does not fit a frame")]
    PayloadTooLarge(usize),
}

pub fn encode_samples(buf: &mut Vec<u8>, key: &str, samples: &[Sample]) -> Result<(), CodecError> {
    let key_len = u32::try_from(key.len()).map_err(|_| CodecError::KeyTooLong(key.len()))?;
    buf.extend_from_slice(&[PROTO, PROTOCOL_VERSION, EMPTY_LIST]);
    for chunk in samples.chunks(BATCH_SIZE) {
        if let [sample] = chunk {
            encode_entry(buf, key, key_len, *sample);
            buf.push(APPEND);
            continue;
        }
        buf.push(MARK);
        for sample in chunk {
            encode_entry(buf, key, key_len, *sample);
        }
        buf.push(APPENDS);
    }
    buf.push(STOP);
    Ok(())
}

fn encode_entry(buf: &mut Vec<u8>, key: &str, key_len: u32, sample: Sample) {
    buf.push(BINUNICODE);
    buf.extend_from_slice(&key_len.to_le_bytes());
    buf.extend_from_slice(key.as_bytes());
    encode_int(buf, sample.time);
    match sample.value {
        MetricValue::Integer(v) => encode_int(buf, v),
        MetricValue::Float(v) => {
            buf.push(BINFLOAT);
            buf.extend_from_slice(&v.to_be_bytes());
        }
    }
    buf.push(TUPLE2);
    buf.push(TUPLE2);
}

/// Smallest integer opcode that holds `v`.
pub fn encode_int(buf: &mut Vec<u8>, v: i64) {
    if let Ok(v) = u8::try_from(v) {
        buf.extend_from_slice(&[BININT1, v]);
    } else if let Ok(v) = u16::try_from(v) {
        buf.push(BININT2);
        buf.extend_from_slice(&v.to_le_bytes());
    } else if let Ok(v) = i32::try_from(v) {
        buf.push(BININT);
        buf.extend_from_slice(&v.to_le_bytes());
    } else {
        let mut bytes = v.to_le_bytes().to_vec();
        // trim redundant sign-extension bytes
        while let [.., prev, last] = bytes[..] {
            let redundant =
                (last == 0x00 && prev & 0x80 == 0) || (last == 0xff && prev & 0x80 != 0);
            if !redundant {
                break;
            }
            bytes.pop();
        }
        buf.push(LONG1);
        // at most 8 bytes
        buf.push(bytes.len() as u8);
        buf.extend_from_slice(&bytes);
    }
}

pub fn encode_payload_len(len: u32) -> [u8; FRAME_HEADER_SIZE] {
    len.to_be_bytes()
}
pub fn decode_payload_len(buf: [u8; FRAME_HEADER_SIZE]) -> u32 {
    u32::from_be_bytes(buf)
}

/// Length-prefixed frame around an encoded payload.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    let len =
        u32::try_from(payload.len()).map_err(|_| CodecError::PayloadTooLarge(payload.len()))?;
    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&encode_payload_len(len));
    frame.extend_from_slice(payload);
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(key: &str, samples: &[Sample]) -> Vec<u8> {
        let mut buf = vec![];
        encode_samples(&mut buf, key, samples).unwrap();
        buf
    }

    #[test]
    fn empty_list() {
        assert_eq!(encode("a", &[]), b"\x80\x02].");
    }

    #[test]
    fn single_entry_uses_append() {
        let sample = Sample {
            time: 1,
            value: MetricValue::Integer(2),
        };
        let expected = b"\x80\x02]X\x01\x00\x00\x00aK\x01K\x02\x86\x86a.";
        assert_eq!(encode("a", &[sample]), expected);
    }

    #[test]
    fn many_entries_use_mark_appends() {
        let samples = [
            Sample {
                time: 1_700_000_000,
                value: MetricValue::Float(70.5),
            },
            Sample {
                time: 1_700_086_400,
                value: MetricValue::Float(71.0),
            },
        ];
        let buf = encode("f.w", &samples);
        assert_eq!(&buf[..4], b"\x80\x02](");
        assert_eq!(buf[buf.len() - 2..], *b"e.");

        let mut entry = b"X\x03\x00\x00\x00f.wJ".to_vec();
        entry.extend_from_slice(&1_700_000_000_i32.to_le_bytes());
        entry.push(b'G');
        entry.extend_from_slice(&70.5_f64.to_be_bytes());
        entry.extend_from_slice(b"\x86\x86");
        assert_eq!(&buf[4..4 + entry.len()], &entry[..]);
    }

    #[test]
    fn large_batches_are_split() {
        let samples = vec![
            Sample {
                time: 0,
                value: MetricValue::Integer(0),
            };
            BATCH_SIZE + 1
        ];
        let buf = encode("a", &samples);
        assert_eq!(buf.iter().filter(|&&b| b == MARK).count(), 1);
        assert_eq!(buf[buf.len() - 2], APPEND);
    }

    #[test]
    fn integer_widths() {
        let cases: [(i64, &[u8]); 7] = [
            (255, b"K\xff"),
            (256, b"M\x00\x01"),
            (65_536, b"J\x00\x00\x01\x00"),
            (-1, b"J\xff\xff\xff\xff"),
            (1 << 31, b"\x8a\x05\x00\x00\x00\x80\x00"),
            (-(1 << 31) - 1, b"\x8a\x05\xff\xff\xff\x7f\xff"),
            (i64::MAX, b"\x8a\x08\xff\xff\xff\xff\xff\xff\xff\x7f"),
        ];
        for (v, expected) in cases {
            let mut buf = vec![];
            encode_int(&mut buf, v);
            assert_eq!(buf, expected, "{v}");
        }
    }

    #[test]
    fn frame_prefix_is_big_endian() {
        let frame = encode_frame(b"abc").unwrap();
        assert_eq!(frame, b"\x00\x00\x00\x03abc");
        assert_eq!(decode_payload_len([0, 0, 1, 0]), 256);
    }
}
