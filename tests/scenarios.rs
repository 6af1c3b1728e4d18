//! Direct translations of the literal end-to-end scenarios (S1, S2, S4, S5)
//! plus the remaining testable properties not already covered by
//! `routing.rs` and `queue_backpressure.rs` (#6 correlation edge cases, #7
//! busy/ready, #8 unknown method, #9 trust gating).

use std::{cell::RefCell, rc::Rc};

use mrpc::{
    channels::loopback::LoopbackChannel,
    config::RouterConfig,
    request_table::CallResult,
    router::{CallOptions, RouterHandle},
};
use serde_json::json;

fn router(identity: &str) -> RouterHandle {
    RouterHandle::new(RouterConfig::new(identity, 8))
}

#[test]
fn scenario_s1_echo() {
    let r = router("node");
    r.add_handler(
        "Echo",
        "",
        Box::new(|handle, req, _info, args| {
            let value: serde_json::Value = serde_json::from_slice(args).unwrap_or(serde_json::Value::Null);
            handle.respond_success(req, Some(value));
        }),
    )
    .expect("register Echo");
    let (chan, peer) = LoopbackChannel::pair();
    let id = r.add_channel("A", false, Box::new(chan));
    r.on_channel_open(id);

    r.on_frame_received(id, br#"{"v":2,"id":7,"src":"A","method":"Echo","args":{"x":1}}"#);

    let sent = peer.take_sent().expect("reply sent");
    let value: serde_json::Value = serde_json::from_slice(&sent).expect("valid json");
    assert_eq!(value["id"], 7);
    assert_eq!(value["dst"], "A");
    assert_eq!(value["result"], json!({"x": 1}));
}

#[test]
fn scenario_s2_unknown_method() {
    let r = router("node");
    let (chan, peer) = LoopbackChannel::pair();
    let id = r.add_channel("A", false, Box::new(chan));
    r.on_channel_open(id);

    r.on_frame_received(id, br#"{"v":2,"id":9,"src":"A","method":"Missing"}"#);

    let sent = peer.take_sent().expect("reply sent");
    let value: serde_json::Value = serde_json::from_slice(&sent).expect("valid json");
    assert_eq!(value["id"], 9);
    assert_eq!(value["error"]["code"], 404);
    assert_eq!(value["error"]["message"], "No handler for Missing");
}

#[test]
fn scenario_s4_correlation() {
    let r = router("node");
    let (chan, peer) = LoopbackChannel::pair();
    let id = r.add_channel("B", false, Box::new(chan));
    r.on_channel_open(id);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = Rc::clone(&seen);
    let dispatched = r.call(
        "Ping",
        CallOptions { dst: "B".to_owned(), tag: String::new() },
        None,
        Some(Box::new(move |result, _info| {
            seen_clone.borrow_mut().push(result);
        })),
    );
    assert!(dispatched);
    let sent = peer.take_sent().expect("call sent");
    let request: serde_json::Value = serde_json::from_slice(&sent).expect("valid json");
    let call_id = request["id"].as_i64().expect("id");

    let reply = format!(r#"{{"v":2,"id":{call_id},"src":"B","result":{{"ok":true}}}}"#);
    r.on_frame_received(id, reply.as_bytes());

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    match &seen[0] {
        CallResult::Success(Some(value)) => assert_eq!(*value, json!({"ok": true})),
        other => panic!("expected a success payload, got a different result: {other:?}"),
    }
}

#[test]
fn empty_success_reply_still_completes_the_request() {
    let r = router("node");
    let (chan, peer) = LoopbackChannel::pair();
    let id = r.add_channel("B", false, Box::new(chan));
    r.on_channel_open(id);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = Rc::clone(&seen);
    let dispatched = r.call(
        "Ping",
        CallOptions { dst: "B".to_owned(), tag: String::new() },
        None,
        Some(Box::new(move |result, _info| {
            seen_clone.borrow_mut().push(result);
        })),
    );
    assert!(dispatched);
    let sent = peer.take_sent().expect("call sent");
    let request: serde_json::Value = serde_json::from_slice(&sent).expect("valid json");
    let call_id = request["id"].as_i64().expect("id");

    // A bare reply naming neither `result` nor `error` is still a valid,
    // method-less response and must complete the request.
    let reply = format!(r#"{{"v":2,"id":{call_id},"src":"B"}}"#);
    r.on_frame_received(id, reply.as_bytes());

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    match &seen[0] {
        CallResult::Success(None) => {}
        other => panic!("expected an empty success payload, got a different result: {other:?}"),
    }
}

#[test]
fn property_6_no_callback_invocation_without_a_reply() {
    let r = router("node");
    let (chan, _peer) = LoopbackChannel::pair();
    let id = r.add_channel("B", false, Box::new(chan));
    r.on_channel_open(id);

    let calls = Rc::new(RefCell::new(0));
    let calls_clone = Rc::clone(&calls);
    r.call(
        "Ping",
        CallOptions { dst: "B".to_owned(), tag: String::new() },
        None,
        Some(Box::new(move |_result, _info| {
            *calls_clone.borrow_mut() += 1;
        })),
    );
    // No reply ever arrives.
    assert_eq!(*calls.borrow(), 0);
}

#[test]
fn property_6_calls_without_a_callback_never_panic_on_reply() {
    let r = router("node");
    let (chan, peer) = LoopbackChannel::pair();
    let id = r.add_channel("B", false, Box::new(chan));
    r.on_channel_open(id);

    let dispatched = r.call("Ping", CallOptions { dst: "B".to_owned(), tag: String::new() }, None, None);
    assert!(dispatched);
    let sent = peer.take_sent().expect("call sent");
    let request: serde_json::Value = serde_json::from_slice(&sent).expect("valid json");
    let call_id = request["id"].as_i64().expect("id");

    let reply = format!(r#"{{"v":2,"id":{call_id},"src":"B","result":null}}"#);
    r.on_frame_received(id, reply.as_bytes());
}

#[test]
fn property_7_busy_channel_queues_then_drains_on_frame_sent() {
    let r = RouterHandle::new(RouterConfig::new("node", 4));
    let (chan, peer) = LoopbackChannel::pair();
    let id = r.add_channel("B", false, Box::new(chan));
    r.on_channel_open(id);

    assert!(r.call("First", CallOptions { dst: "B".to_owned(), tag: String::new() }, None, None));
    assert!(peer.take_sent().is_some());
    assert!(r.call("Second", CallOptions { dst: "B".to_owned(), tag: String::new() }, None, None));
    assert!(peer.take_sent().is_none(), "channel is InFlight, second call must queue");

    r.on_frame_sent(id, true);
    let second = peer.take_sent().expect("queued frame drained on FrameSent");
    let value: serde_json::Value = serde_json::from_slice(&second).expect("valid json");
    assert_eq!(value["method"], "Second");
}

#[test]
fn property_9_trust_gates_rpc_list() {
    let r = router("node");
    r.add_list_handler().expect("register introspection");

    let (untrusted, untrusted_peer) = LoopbackChannel::pair();
    let untrusted_id = r.add_channel("U", false, Box::new(untrusted));
    r.on_channel_open(untrusted_id);
    r.on_frame_received(untrusted_id, br#"{"v":2,"id":1,"src":"U","method":"RPC.List"}"#);
    let sent = untrusted_peer.take_sent().expect("reply sent");
    let value: serde_json::Value = serde_json::from_slice(&sent).expect("valid json");
    assert_eq!(value["error"]["code"], 403);
}

#[test]
fn scenario_s5_list_authorization() {
    let r = router("node");
    r.add_list_handler().expect("register introspection");

    let (untrusted, untrusted_peer) = LoopbackChannel::pair();
    let untrusted_id = r.add_channel("U", false, Box::new(untrusted));
    r.on_channel_open(untrusted_id);
    r.on_frame_received(untrusted_id, br#"{"v":2,"id":1,"src":"U","method":"RPC.List"}"#);
    let sent = untrusted_peer.take_sent().expect("reply sent");
    let value: serde_json::Value = serde_json::from_slice(&sent).expect("valid json");
    assert_eq!(value["error"]["code"], 403);

    let (trusted, trusted_peer) = LoopbackChannel::pair();
    let trusted_id = r.add_channel("T", true, Box::new(trusted));
    r.on_channel_open(trusted_id);
    r.on_frame_received(trusted_id, br#"{"v":2,"id":2,"src":"T","method":"RPC.List"}"#);
    let sent = trusted_peer.take_sent().expect("reply sent");
    let value: serde_json::Value = serde_json::from_slice(&sent).expect("valid json");
    let methods = value["result"].as_array().expect("array result");
    let names: Vec<&str> = methods.iter().filter_map(serde_json::Value::as_str).collect();
    assert!(names.contains(&"RPC.List"));
    assert!(names.contains(&"RPC.Describe"));
}

#[test]
fn rpc_describe_reports_args_fmt_and_gates_unknown_names() {
    let r = router("node");
    r.add_list_handler().expect("register introspection");
    r.add_handler("Echo", "{value: any}", Box::new(|_h, req, _info, _args| {
        // Never invoked in this test, but must be registered for Describe.
        drop(req);
    }))
    .expect("register Echo");

    let (trusted, trusted_peer) = LoopbackChannel::pair();
    let id = r.add_channel("T", true, Box::new(trusted));
    r.on_channel_open(id);

    r.on_frame_received(id, br#"{"v":2,"id":1,"src":"T","method":"RPC.Describe","args":{"name":"Echo"}}"#);
    let sent = trusted_peer.take_sent().expect("reply sent");
    let value: serde_json::Value = serde_json::from_slice(&sent).expect("valid json");
    assert_eq!(value["result"]["name"], "Echo");
    assert_eq!(value["result"]["args_fmt"], "{value: any}");

    r.on_frame_sent(id, true);
    r.on_frame_received(id, br#"{"v":2,"id":2,"src":"T","method":"RPC.Describe","args":{"name":"Nope"}}"#);
    let sent = trusted_peer.take_sent().expect("reply sent");
    let value: serde_json::Value = serde_json::from_slice(&sent).expect("valid json");
    assert_eq!(value["error"]["code"], 404);
}
