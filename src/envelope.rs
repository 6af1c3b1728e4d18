//! The wire envelope: the self-describing RPC frame exchanged over any
//! channel.
//!
//! `parse`/`emit` tolerate any field order and absent optional fields on
//! the way in, and produce a canonical field set on the way out. JSON is
//! the encoding; the rest of the router treats frames as opaque bytes, so
//! only this module touches `serde_json` directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CodecError;

/// Current envelope version.
pub const VERSION: u32 = 2;

/// The body of an envelope: exactly one of a request, a success reply, or
/// an error reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// A request naming a method to invoke, with optional arguments.
    Request {
        /// Method name; never empty for a parsed request.
        method: String,
        /// Request payload, if any.
        args: Option<Value>,
    },
    /// A successful reply.
    Success {
        /// Handler result payload, if any.
        result: Option<Value>,
    },
    /// An error reply.
    Error {
        /// Nonzero error code.
        code: i32,
        /// Optional human-readable message.
        message: Option<String>,
    },
}

/// A parsed or to-be-emitted wire frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Envelope version; always [`VERSION`] for frames this crate emits.
    pub version: u32,
    /// Correlation id; 0 means "no reply expected".
    pub id: i64,
    /// Identity of the sender.
    pub src: String,
    /// Identity of the intended recipient; empty means "the peer on the
    /// other end of this channel".
    pub dst: String,
    /// Opaque correlation token, echoed verbatim on replies.
    pub tag: String,
    /// The envelope's body.
    pub body: Body,
}

fn is_zero(id: &i64) -> bool { *id == 0 }

#[derive(Debug, Serialize, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "v")]
    version: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    id: i64,
    src: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    dst: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    args: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<RawError>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawError {
    code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl Envelope {
    /// Parse a frame from its wire bytes.
    ///
    /// A frame is classified by method presence alone, matching the
    /// original's `mg_rpc_ch_info`-driven dispatch: any frame naming a
    /// method is a request, and every other frame is a response, even one
    /// carrying neither `result` nor `error` (an empty success reply).
    ///
    /// # Errors
    /// Returns [`CodecError::Malformed`] if the bytes are not a valid
    /// encoding of the envelope shape, and [`CodecError::ConflictingBody`]
    /// if a frame names a method and also carries a `result`/`error`.
    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        let raw: RawEnvelope = serde_json::from_slice(bytes)?;
        let has_method = raw.method.as_deref().is_some_and(|m| !m.is_empty());
        let body = if has_method {
            if raw.result.is_some() || raw.error.is_some() {
                return Err(CodecError::ConflictingBody);
            }
            Body::Request { method: raw.method.unwrap_or_default(), args: raw.args }
        } else {
            match raw.error {
                Some(err) => Body::Error { code: err.code, message: err.message },
                None => Body::Success { result: raw.result },
            }
        };
        Ok(Self {
            version: raw.version,
            id: raw.id,
            src: raw.src,
            dst: raw.dst,
            tag: raw.tag,
            body,
        })
    }

    /// Emit this envelope to its canonical wire bytes.
    ///
    /// # Errors
    /// Returns [`CodecError::Malformed`] if the payload cannot be
    /// serialized (for example, a `result`/`args` value containing a
    /// non-finite float).
    pub fn emit(&self) -> Result<Vec<u8>, CodecError> {
        let (method, args, result, error) = match &self.body {
            Body::Request { method, args } => (Some(method.clone()), args.clone(), None, None),
            Body::Success { result } => (None, None, result.clone(), None),
            Body::Error { code, message } => (
                None,
                None,
                None,
                Some(RawError { code: *code, message: message.clone() }),
            ),
        };
        let raw = RawEnvelope {
            version: self.version,
            id: self.id,
            src: self.src.clone(),
            dst: self.dst.clone(),
            tag: self.tag.clone(),
            method,
            args,
            result,
            error,
        };
        Ok(serde_json::to_vec(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::{Body, Envelope, VERSION};

    #[rstest]
    fn parses_request_with_args() {
        let bytes = br#"{"v":2,"id":7,"src":"A","method":"Echo","args":{"x":1}}"#;
        let env = Envelope::parse(bytes).expect("parse");
        assert_eq!(env.id, 7);
        assert_eq!(env.src, "A");
        assert_eq!(
            env.body,
            Body::Request { method: "Echo".to_owned(), args: Some(json!({"x": 1})) }
        );
    }

    #[rstest]
    fn parses_error_reply() {
        let bytes = br#"{"v":2,"id":9,"src":"A","error":{"code":404,"message":"No handler for Missing"}}"#;
        let env = Envelope::parse(bytes).expect("parse");
        assert_eq!(
            env.body,
            Body::Error { code: 404, message: Some("No handler for Missing".to_owned()) }
        );
    }

    #[rstest]
    fn rejects_both_method_and_result() {
        let bytes = br#"{"v":2,"id":1,"src":"A","method":"X","result":{}}"#;
        assert!(Envelope::parse(bytes).is_err());
    }

    #[rstest]
    fn method_less_frame_with_no_result_or_error_is_an_empty_success() {
        let bytes = br#"{"v":2,"id":1,"src":"A"}"#;
        let env = Envelope::parse(bytes).expect("parse");
        assert_eq!(env.body, Body::Success { result: None });
    }

    #[rstest]
    fn emit_omits_empty_optional_fields() {
        let env = Envelope {
            version: VERSION,
            id: 0,
            src: "node".to_owned(),
            dst: String::new(),
            tag: String::new(),
            body: Body::Success { result: None },
        };
        let bytes = env.emit().expect("emit");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("valid json");
        let obj = value.as_object().expect("object");
        assert!(!obj.contains_key("id"));
        assert!(!obj.contains_key("dst"));
        assert!(!obj.contains_key("tag"));
        assert!(!obj.contains_key("result"));
        assert!(!obj.contains_key("method"));
    }

    #[rstest]
    fn emit_includes_nonzero_id_and_nonempty_dst_tag() {
        let env = Envelope {
            version: VERSION,
            id: 42,
            src: "node".to_owned(),
            dst: "peer".to_owned(),
            tag: "corr-1".to_owned(),
            body: Body::Request { method: "Echo".to_owned(), args: None },
        };
        let bytes = env.emit().expect("emit");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("valid json");
        assert_eq!(value["id"], 42);
        assert_eq!(value["dst"], "peer");
        assert_eq!(value["tag"], "corr-1");
        assert_eq!(value["method"], "Echo");
    }

    #[rstest]
    fn round_trips_through_parse_and_emit() {
        let env = Envelope {
            version: VERSION,
            id: 7,
            src: "A".to_owned(),
            dst: "B".to_owned(),
            tag: "t".to_owned(),
            body: Body::Request { method: "Echo".to_owned(), args: Some(json!({"x": 1})) },
        };
        let bytes = env.emit().expect("emit");
        let parsed = Envelope::parse(&bytes).expect("parse");
        assert_eq!(parsed, env);
    }
}
