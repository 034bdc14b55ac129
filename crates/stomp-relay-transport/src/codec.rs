//! A minimal STOMP frame codec for the default TCP client adapter.
//!
//! Byte-level STOMP framing sits outside the relay core's own concerns: the
//! core is generic over any `TcpClient` implementation and never reaches into
//! this codec directly. It exists so the default `TcpClient` has something
//! real to decode.
//!
//! Frame grammar (STOMP 1.2, simplified): `COMMAND\n(header:value\n)*\n` body
//! `\0`, or a bare `\n` for a heartbeat.

use bytes::{Buf, BufMut, BytesMut};
use stomp_relay_protocol::{HeaderAccessor, Message, StompCommand};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::TransportError;

#[derive(Debug, Default)]
pub struct StompFrameCodec;

impl Decoder for StompFrameCodec {
    type Item = Message;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, TransportError> {
        if src.is_empty() {
            return Ok(None);
        }

        // A lone leading newline is the heartbeat frame.
        if src[0] == b'\n' {
            src.advance(1);
            return Ok(Some(Message::heartbeat_frame()));
        }

        let Some(frame_end) = src.iter().position(|&b| b == b'\0') else {
            return Ok(None);
        };
        let frame_bytes = src.split_to(frame_end);
        src.advance(1); // consume the trailing NUL

        let Some(header_end) = frame_bytes.windows(2).position(|w| w == b"\n\n") else {
            return Err(TransportError::ConfigurationError(
                "malformed frame: no header terminator".into(),
            ));
        };
        let head = &frame_bytes[..header_end];
        let body = frame_bytes[header_end + 2..].to_vec();

        let mut lines = head.split(|&b| b == b'\n');
        let command_line = lines.next().unwrap_or(&[]);
        let command_str = String::from_utf8_lossy(command_line);
        let Some(command) = StompCommand::parse(command_str.trim()) else {
            return Err(TransportError::ConfigurationError(format!(
                "unrecognized STOMP command: {command_str}"
            )));
        };

        let mut headers = HeaderAccessor::new();
        headers
            .set_command(command)
            .expect("freshly created accessor is never sealed");
        for line in lines {
            if line.is_empty() {
                continue;
            }
            if let Some(idx) = line.iter().position(|&b| b == b':') {
                let key = String::from_utf8_lossy(&line[..idx]).into_owned();
                let value = String::from_utf8_lossy(&line[idx + 1..]).into_owned();
                headers
                    .set(key, value)
                    .expect("freshly created accessor is never sealed");
            }
        }

        Ok(Some(Message::new(body, headers)))
    }
}

impl Encoder<Message> for StompFrameCodec {
    type Error = TransportError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), TransportError> {
        if msg.is_heartbeat() {
            dst.put_u8(b'\n');
            return Ok(());
        }

        let command = msg.command().ok_or_else(|| {
            TransportError::ConfigurationError("cannot encode a frame with no command".into())
        })?;
        dst.put_slice(command.as_str().as_bytes());
        dst.put_u8(b'\n');
        for (key, value) in msg.headers.iter() {
            dst.put_slice(key.as_bytes());
            dst.put_u8(b':');
            dst.put_slice(value.as_bytes());
            dst.put_u8(b'\n');
        }
        dst.put_u8(b'\n');
        dst.put_slice(&msg.payload);
        dst.put_u8(b'\0');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_send_frame() {
        let mut headers = HeaderAccessor::new();
        headers.set_command(StompCommand::Send).unwrap();
        headers.set("destination", "/topic/x").unwrap();
        headers.set_session_id("A").unwrap();
        let msg = Message::new(&b"hi"[..], headers);

        let mut buf = BytesMut::new();
        let mut codec = StompFrameCodec;
        codec.encode(msg, &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.command(), Some(StompCommand::Send));
        assert_eq!(decoded.headers.destination(), Some("/topic/x"));
        assert_eq!(&decoded.payload[..], b"hi");
    }

    #[test]
    fn decodes_a_heartbeat() {
        let mut buf = BytesMut::from(&b"\n"[..]);
        let mut codec = StompFrameCodec;
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert!(decoded.is_heartbeat());
    }

    #[test]
    fn waits_for_a_complete_frame() {
        let mut buf = BytesMut::from(&b"CONNECTED\nversion:1.2\n\n"[..]);
        let mut codec = StompFrameCodec;
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }
}
