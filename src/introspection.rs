//! Built-in introspection handlers: `RPC.List` and `RPC.Describe`.
//!
//! Registered together by [`crate::router::RouterHandle::add_list_handler`].
//! `RPC.Hello` is deliberately not registered here; see the module docs on
//! [`crate::router`] for why.

use serde::Deserialize;

use crate::handler::HandlerFn;

/// Well-known method name: lists registered methods.
pub const RPC_LIST: &str = "RPC.List";
/// Well-known method name: describes a single registered method.
pub const RPC_DESCRIBE: &str = "RPC.Describe";
/// Well-known method name reserved for peer liveness probes. Not
/// auto-registered; see [`crate::router`].
pub const RPC_HELLO: &str = "RPC.Hello";

#[derive(Deserialize)]
struct DescribeArgs {
    name: Option<String>,
}

/// Build the `RPC.List` handler: returns all registered method names, in
/// registration order, to trusted callers only.
#[must_use]
pub fn list_handler() -> HandlerFn {
    Box::new(|handle, req, info, _args| {
        if !info.channel_is_trusted {
            handle.respond_error(req, 403, Some("unauthorized".to_owned()));
            return;
        }
        let methods = handle.list_methods();
        handle.respond_success(req, Some(serde_json::json!(methods)));
    })
}

/// Build the `RPC.Describe` handler: returns `{name, args_fmt}` for a
/// named method, to trusted callers only.
#[must_use]
pub fn describe_handler() -> HandlerFn {
    Box::new(|handle, req, info, args| {
        if !info.channel_is_trusted {
            handle.respond_error(req, 403, Some("unauthorized".to_owned()));
            return;
        }
        let name = serde_json::from_slice::<DescribeArgs>(args).ok().and_then(|a| a.name);
        let Some(name) = name else {
            handle.respond_error(req, 400, Some("missing name".to_owned()));
            return;
        };
        match handle.describe_method(&name) {
            Some(args_fmt) => {
                handle.respond_success(req, Some(serde_json::json!({ "name": name, "args_fmt": args_fmt })));
            }
            None => handle.respond_error(req, 404, Some(format!("No handler for {name}"))),
        }
    })
}
