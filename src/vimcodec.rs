//! VIMCodec
//!
//! Rust Tokio Codec for communicating with the editor

use std::collections::HashMap;
use std::io;

use crate::debugger::{DebuggerCmd, SourcePosition, StepKind};
use crate::server::{DebugError, DebugErrorKind, Request, RequestCmd, SendMsg, ServerCmd};

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

#[derive(Debug)]
pub struct DebugErrorWithId {
    debug_error: DebugError,
    id: u64,
}

impl DebugErrorWithId {
    pub fn new(kind: DebugErrorKind, id: u64, error_string: String, debug_string: String) -> Self {
        DebugErrorWithId {
            id,
            debug_error: DebugError::new(kind, error_string, debug_string),
        }
    }

    pub fn get_id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> DebugErrorKind {
        self.debug_error.kind()
    }

    pub fn get_error_string(&self) -> &str {
        self.debug_error.get_error_string()
    }

    pub fn get_debug_string(&self) -> &str {
        self.debug_error.get_debug_string()
    }
}

impl From<io::Error> for DebugErrorWithId {
    fn from(err: io::Error) -> DebugErrorWithId {
        DebugErrorWithId::new(
            DebugErrorKind::GenericError,
            0,
            "Generic error".to_string(),
            format!("Generic error {}", err),
        )
    }
}

type Result<T> = std::result::Result<T, DebugErrorWithId>;

type Args = HashMap<String, serde_json::Value>;

/// Decodes requests and encodes responses sent by or to the editor over its socket
///
/// Given a request of the form
/// ```text
/// [1,{"cmd":"breakpoint","file":"Tab.pde","line":3}]
/// ```
/// it decodes this into a `Request` with an `id` of `1` and a `DebuggerCmd::Breakpoint` at line
/// index 2 of `Tab.pde`, lines are 1-based on the wire.
#[derive(Debug, Default)]
pub struct VimCodec {}

impl VimCodec {
    pub fn new() -> Self {
        VimCodec {}
    }

    /// Get and remove a `file` and 1-based `line` from the arguments
    fn get_file_location(&self, args: &mut Args, id: u64) -> Result<SourcePosition> {
        let file = self.get_string("file", args, id)?;
        let line = match args.remove("line") {
            Some(t) => match t.as_u64() {
                Some(0) | None => {
                    return Err(DebugErrorWithId::new(
                        DebugErrorKind::RequestSyntaxError,
                        id,
                        "Badly specified 'line'".to_string(),
                        format!("Badly specified 'line': {}", t),
                    ));
                }
                Some(t) => t,
            },
            None => {
                return Err(DebugErrorWithId::new(
                    DebugErrorKind::RequestSyntaxError,
                    id,
                    "Can't understand request".to_string(),
                    "Need to specify a line number".to_string(),
                ));
            }
        };

        Ok(SourcePosition::new(file, (line - 1) as usize))
    }

    /// Get and remove the key specified from the arguments as a String
    fn get_string(&self, key: &str, args: &mut Args, id: u64) -> Result<String> {
        match args.remove(key) {
            Some(s) => match s {
                serde_json::Value::String(s) => Ok(s),
                _ => Err(DebugErrorWithId::new(
                    DebugErrorKind::RequestSyntaxError,
                    id,
                    format!("Badly specified string '{}'", key),
                    format!("Badly specified string '{}': {}", key, s),
                )),
            },
            None => Err(DebugErrorWithId::new(
                DebugErrorKind::RequestSyntaxError,
                id,
                "Can't understand request".to_string(),
                format!("Need to specify a '{}'", key),
            )),
        }
    }

    /// Get and remove the key specified from the arguments as an i64
    fn get_i64(&self, key: &str, args: &mut Args, id: u64) -> Result<i64> {
        match args.remove(key) {
            Some(k) => match k.as_i64() {
                Some(i) => Ok(i),
                None => Err(DebugErrorWithId::new(
                    DebugErrorKind::RequestSyntaxError,
                    id,
                    format!("Badly specified 64-bit integer '{}'", key),
                    format!("Badly specified 64-bit integer '{}': {}", key, &k),
                )),
            },
            None => Err(DebugErrorWithId::new(
                DebugErrorKind::RequestSyntaxError,
                id,
                "Can't understand request".to_string(),
                format!("Need to specify a '{}'", key),
            )),
        }
    }

    /// Get and remove the key specified from the arguments as a usize
    fn get_usize(&self, key: &str, args: &mut Args, id: u64) -> Result<usize> {
        match args.remove(key) {
            Some(k) => match k.as_u64() {
                Some(i) => Ok(i as usize),
                None => Err(DebugErrorWithId::new(
                    DebugErrorKind::RequestSyntaxError,
                    id,
                    format!("Badly specified unsigned integer '{}'", key),
                    format!("Badly specified unsigned integer '{}': {}", key, &k),
                )),
            },
            None => Err(DebugErrorWithId::new(
                DebugErrorKind::RequestSyntaxError,
                id,
                "Can't understand request".to_string(),
                format!("Need to specify a '{}'", key),
            )),
        }
    }

    fn decode_cmd(&self, cmd: &str, args: &mut Args, id: u64) -> Result<RequestCmd> {
        let cmd = match cmd {
            "ping" => RequestCmd::ServerCmd(ServerCmd::Ping),
            "pings" => RequestCmd::ServerCmd(ServerCmd::Pings),
            "start" => RequestCmd::DebuggerCmd(DebuggerCmd::Start),
            "stop" => RequestCmd::DebuggerCmd(DebuggerCmd::Stop),
            "continue" => RequestCmd::DebuggerCmd(DebuggerCmd::Continue),
            "stepOver" => RequestCmd::DebuggerCmd(DebuggerCmd::Step(StepKind::Over)),
            "stepIn" => RequestCmd::DebuggerCmd(DebuggerCmd::Step(StepKind::Into)),
            "stepOut" => RequestCmd::DebuggerCmd(DebuggerCmd::Step(StepKind::Out)),
            "breakpoint" => {
                let pos = self.get_file_location(args, id)?;
                RequestCmd::DebuggerCmd(DebuggerCmd::Breakpoint(pos))
            }
            "unbreakpoint" => {
                let pos = self.get_file_location(args, id)?;
                RequestCmd::DebuggerCmd(DebuggerCmd::Unbreakpoint(pos))
            }
            "toggleBreakpoint" => {
                let pos = match args.contains_key("file") || args.contains_key("line") {
                    true => Some(self.get_file_location(args, id)?),
                    false => None,
                };
                RequestCmd::DebuggerCmd(DebuggerCmd::ToggleBreakpoint(pos))
            }
            "listBreakpoints" => RequestCmd::DebuggerCmd(DebuggerCmd::ListBreakpoints),
            "cursor" => {
                let pos = self.get_file_location(args, id)?;
                RequestCmd::DebuggerCmd(DebuggerCmd::Cursor(pos))
            }
            "open" => {
                let file = self.get_string("file", args, id)?;
                let text = self.get_string("text", args, id)?;
                RequestCmd::DebuggerCmd(DebuggerCmd::Open(file, text))
            }
            "insert" => {
                let file = self.get_string("file", args, id)?;
                let offset = self.get_usize("offset", args, id)?;
                let text = self.get_string("text", args, id)?;
                RequestCmd::DebuggerCmd(DebuggerCmd::Insert(file, offset, text))
            }
            "remove" => {
                let file = self.get_string("file", args, id)?;
                let offset = self.get_usize("offset", args, id)?;
                let length = self.get_usize("length", args, id)?;
                RequestCmd::DebuggerCmd(DebuggerCmd::Remove(file, offset, length))
            }
            "getConfig" => {
                let key = self.get_string("key", args, id)?;
                RequestCmd::ServerCmd(ServerCmd::GetConfig(key))
            }
            "setConfig" => {
                let key = self.get_string("key", args, id)?;
                let value = self.get_i64("value", args, id)?;
                RequestCmd::ServerCmd(ServerCmd::SetConfig(key, value))
            }
            _ => {
                return Err(DebugErrorWithId::new(
                    DebugErrorKind::RequestSyntaxError,
                    id,
                    "Command unknown".to_string(),
                    format!("Command unknown: '{}'", cmd),
                ));
            }
        };

        Ok(cmd)
    }
}

impl Decoder for VimCodec {
    type Item = Request;
    type Error = DebugErrorWithId;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.is_empty() {
            return Ok(None);
        }

        let req = src.clone();
        let req_str = String::from_utf8_lossy(&req[..])
            .trim_matches(char::from(0))
            .to_string();

        let mut stream =
            serde_json::Deserializer::from_slice(&req[..]).into_iter::<serde_json::Value>();

        let mut v = match stream.next() {
            Some(Ok(t)) => t,
            Some(Err(e)) => {
                if let serde_json::error::Category::Eof = e.classify() {
                    return Ok(None);
                }

                src.advance(src.len());

                return Err(DebugErrorWithId::new(
                    DebugErrorKind::RequestSyntaxError,
                    0,
                    "Must be valid JSON".to_string(),
                    format!("Can't read '{}': {}", req_str, e),
                ));
            }
            None => {
                return Ok(None);
            }
        };

        src.advance(stream.byte_offset());

        let len = match v.as_array() {
            Some(a) => a.len(),
            None => {
                return Err(DebugErrorWithId::new(
                    DebugErrorKind::RequestSyntaxError,
                    0,
                    "Not an array, invalid JSON".to_string(),
                    format!("Can't read '{}': Must be an array", req_str),
                ));
            }
        };

        if len == 0 {
            return Err(DebugErrorWithId::new(
                DebugErrorKind::RequestSyntaxError,
                0,
                "Array must have 2 elements, invalid JSON".to_string(),
                format!("Can't read '{}': Array should have 2 elements", req_str),
            ));
        }

        let id = v[0].take();
        let id: u64 = match serde_json::from_value(id.clone()) {
            Ok(s) => s,
            Err(e) => {
                return Err(DebugErrorWithId::new(
                    DebugErrorKind::RequestSyntaxError,
                    0,
                    "Can't read id".to_string(),
                    format!("Can't read '{}': {}", id, e),
                ));
            }
        };

        if len != 2 {
            return Err(DebugErrorWithId::new(
                DebugErrorKind::RequestSyntaxError,
                id,
                "Array must have 2 elements, invalid JSON".to_string(),
                format!("Can't read '{}': Array should have 2 elements", req_str),
            ));
        }

        let mut args: Args = match serde_json::from_value(v[1].take()) {
            Ok(args) => args,
            Err(e) => {
                return Err(DebugErrorWithId::new(
                    DebugErrorKind::RequestSyntaxError,
                    id,
                    "Can't read 2nd argument as dictionary".to_string(),
                    format!("Can't read '{}': {}", req_str, e),
                ));
            }
        };

        let cmd: String = match args.remove("cmd") {
            Some(serde_json::Value::String(s)) => s,
            Some(s) => {
                return Err(DebugErrorWithId::new(
                    DebugErrorKind::RequestSyntaxError,
                    id,
                    "Can't find command".to_string(),
                    format!("Can't find command '{}': cmd {} not a string", req_str, s),
                ));
            }
            None => {
                return Err(DebugErrorWithId::new(
                    DebugErrorKind::RequestSyntaxError,
                    id,
                    "Can't find command".to_string(),
                    format!(
                        "Can't find command '{}': Need a cmd in 2nd object",
                        req_str
                    ),
                ));
            }
        };

        let cmd = self.decode_cmd(&cmd, &mut args, id)?;

        if !args.is_empty() {
            let mut args_left: Vec<String> = args.keys().cloned().collect();
            args_left.sort();
            return Err(DebugErrorWithId::new(
                DebugErrorKind::RequestSyntaxError,
                id,
                "Bad arguments".to_string(),
                format!("Bad arguments: {:?}", args_left),
            ));
        }

        Ok(Some(Request::new(id, cmd)))
    }
}

impl Encoder<SendMsg> for VimCodec {
    type Error = DebugError;

    fn encode(&mut self, msg: SendMsg, buf: &mut BytesMut) -> crate::Result<()> {
        let encoded = match msg {
            SendMsg::Response(resp) => serde_json::to_string(&(resp.id(), resp.resp())),
            SendMsg::Notification(notification) => {
                serde_json::to_string(&("call", notification.cmd(), notification.args()))
            }
        };

        let encoded = match encoded {
            Ok(s) => s + "\n",
            Err(e) => {
                return Err(DebugError::new(
                    DebugErrorKind::GenericError,
                    "Can't encode message".to_string(),
                    format!("Can't encode message: {}", e),
                ));
            }
        };

        buf.reserve(encoded.len());
        buf.put(encoded.as_bytes());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::debugger::{DebuggerCmd, SourcePosition, StepKind};
    use crate::server::{
        DebugErrorKind, Notification, RequestCmd, Response, SendMsg, ServerCmd,
    };

    use bytes::{BufMut, BytesMut};
    use tokio_util::codec::{Decoder, Encoder};

    fn decode(s: &str) -> RequestCmd {
        let mut codec = super::VimCodec::new();
        let mut buf = BytesMut::new();
        buf.put(s.as_bytes());

        codec.decode(&mut buf).unwrap().unwrap().cmd().clone()
    }

    fn decode_err(s: &str) -> super::DebugErrorWithId {
        let mut codec = super::VimCodec::new();
        let mut buf = BytesMut::new();
        buf.put(s.as_bytes());

        codec.decode(&mut buf).unwrap_err()
    }

    #[test]
    fn check_simple_json_decoding() {
        let mut codec = super::VimCodec::new();
        let mut buf = BytesMut::new();
        buf.reserve(21);
        let s = r#"[123,{"cmd":"start"}]"#;
        buf.put(s.as_bytes());

        let request = codec.decode(&mut buf).unwrap().unwrap();

        assert_eq!(123, request.id());
        assert_eq!(&RequestCmd::DebuggerCmd(DebuggerCmd::Start), request.cmd());
    }

    #[test]
    fn check_two_simple_json_decoding() {
        let mut codec = super::VimCodec::new();
        let mut buf = BytesMut::new();
        let s = r#"[123,{"cmd":"start"}][124,{"cmd":"ping"}]"#;
        buf.put(s.as_bytes());

        let request = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(123, request.id());
        assert_eq!(&RequestCmd::DebuggerCmd(DebuggerCmd::Start), request.cmd());

        let request = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(124, request.id());
        assert_eq!(&RequestCmd::ServerCmd(ServerCmd::Ping), request.cmd());

        assert_eq!(None, codec.decode(&mut buf).unwrap());
    }

    #[test]
    fn check_two_buffers_json_decodings() {
        let mut codec = super::VimCodec::new();
        let mut buf = BytesMut::new();
        let s = r#"[123,{"cmd":"sta"#;
        buf.put(s.as_bytes());

        assert_eq!(None, codec.decode(&mut buf).unwrap());

        let s = r#"rt"}]"#;
        buf.put(s.as_bytes());

        let request = codec.decode(&mut buf).unwrap().unwrap();

        assert_eq!(123, request.id());
        assert_eq!(&RequestCmd::DebuggerCmd(DebuggerCmd::Start), request.cmd());
    }

    #[test]
    fn check_breakpoint_line_is_one_based() {
        assert_eq!(
            decode(r#"[1,{"cmd":"breakpoint","file":"Tab.pde","line":3}]"#),
            RequestCmd::DebuggerCmd(DebuggerCmd::Breakpoint(SourcePosition::new(
                "Tab.pde".to_string(),
                2
            )))
        );
    }

    #[test]
    fn check_step_commands() {
        assert_eq!(
            decode(r#"[1,{"cmd":"stepOver"}]"#),
            RequestCmd::DebuggerCmd(DebuggerCmd::Step(StepKind::Over))
        );
        assert_eq!(
            decode(r#"[1,{"cmd":"stepIn"}]"#),
            RequestCmd::DebuggerCmd(DebuggerCmd::Step(StepKind::Into))
        );
        assert_eq!(
            decode(r#"[1,{"cmd":"stepOut"}]"#),
            RequestCmd::DebuggerCmd(DebuggerCmd::Step(StepKind::Out))
        );
    }

    #[test]
    fn check_toggle_breakpoint_with_and_without_location() {
        assert_eq!(
            decode(r#"[1,{"cmd":"toggleBreakpoint"}]"#),
            RequestCmd::DebuggerCmd(DebuggerCmd::ToggleBreakpoint(None))
        );
        assert_eq!(
            decode(r#"[1,{"cmd":"toggleBreakpoint","file":"A.pde","line":1}]"#),
            RequestCmd::DebuggerCmd(DebuggerCmd::ToggleBreakpoint(Some(SourcePosition::new(
                "A.pde".to_string(),
                0
            ))))
        );
    }

    #[test]
    fn check_buffer_commands() {
        assert_eq!(
            decode(r#"[1,{"cmd":"open","file":"A.pde","text":"int x;"}]"#),
            RequestCmd::DebuggerCmd(DebuggerCmd::Open(
                "A.pde".to_string(),
                "int x;".to_string()
            ))
        );
        assert_eq!(
            decode(r#"[1,{"cmd":"insert","file":"A.pde","offset":4,"text":"y"}]"#),
            RequestCmd::DebuggerCmd(DebuggerCmd::Insert(
                "A.pde".to_string(),
                4,
                "y".to_string()
            ))
        );
        assert_eq!(
            decode(r#"[1,{"cmd":"remove","file":"A.pde","offset":4,"length":2}]"#),
            RequestCmd::DebuggerCmd(DebuggerCmd::Remove("A.pde".to_string(), 4, 2))
        );
    }

    #[test]
    fn check_config_commands() {
        assert_eq!(
            decode(r#"[1,{"cmd":"getConfig","key":"FieldDepth"}]"#),
            RequestCmd::ServerCmd(ServerCmd::GetConfig("FieldDepth".to_string()))
        );
        assert_eq!(
            decode(r#"[1,{"cmd":"setConfig","key":"FieldDepth","value":2}]"#),
            RequestCmd::ServerCmd(ServerCmd::SetConfig("FieldDepth".to_string(), 2))
        );
    }

    #[test]
    fn check_bad_requests() {
        let e = decode_err(r#"{"cmd":"start"}"#);
        assert_eq!(e.get_id(), 0);
        assert_eq!(e.get_error_string(), "Not an array, invalid JSON");

        let e = decode_err(r#"[5,{"cmd":"fly"}]"#);
        assert_eq!(e.get_id(), 5);
        assert_eq!(e.kind(), DebugErrorKind::RequestSyntaxError);
        assert_eq!(e.get_debug_string(), "Command unknown: 'fly'");

        let e = decode_err(r#"[6,{"cmd":"start","extra":1}]"#);
        assert_eq!(e.get_id(), 6);
        assert_eq!(e.get_debug_string(), r#"Bad arguments: ["extra"]"#);

        let e = decode_err(r#"[7,{"cmd":"breakpoint","file":"A.pde","line":0}]"#);
        assert_eq!(e.get_error_string(), "Badly specified 'line'");

        let e = decode_err(r#"[8,{"cmd":"breakpoint","line":2}]"#);
        assert_eq!(e.get_debug_string(), "Need to specify a 'file'");

        let e = decode_err(r#"[9,{"file":"A.pde"}]"#);
        assert_eq!(e.get_error_string(), "Can't find command");

        let e = decode_err(r#"[10]"#);
        assert_eq!(e.get_id(), 10);

        let e = decode_err(r#"[1,{"cmd":"start"}}"#);
        assert_eq!(e.get_error_string(), "Must be valid JSON");
    }

    #[test]
    fn check_json_encoding_response() {
        let mut codec = super::VimCodec::new();
        let resp = SendMsg::Response(Response::new(123, serde_json::json!({"ping":"pong"})));
        let mut buf = BytesMut::new();
        codec.encode(resp, &mut buf).unwrap();

        let mut expected = BytesMut::new();
        let s = format!("{}{}", r#"[123,{"ping":"pong"}]"#, "\n");
        expected.put(s.as_bytes());

        assert_eq!(expected, buf);
    }

    #[test]
    fn check_json_encoding_notify() {
        let mut codec = super::VimCodec::new();
        let resp = SendMsg::Notification(Notification::new(
            "cmd_test".to_string(),
            vec![serde_json::json!("test"), serde_json::json!(1)],
        ));
        let mut buf = BytesMut::new();
        codec.encode(resp, &mut buf).unwrap();

        let mut expected = BytesMut::new();
        let s = format!("{}{}", r#"["call","cmd_test",["test",1]]"#, "\n");
        expected.put(s.as_bytes());

        assert_eq!(expected, buf);
    }
}
