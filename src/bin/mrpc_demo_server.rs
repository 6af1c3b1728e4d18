//! A minimal TCP server exercising [`mrpc::router::RouterHandle`] end to
//! end: accepts connections, wires each into the router as an untrusted
//! TCP channel, and answers `RPC.Hello` plus the built-in introspection
//! methods.

use anyhow::Context;
use clap::Parser;
use mrpc::{
    channel::Channel,
    config::RouterConfig,
    demo::{cli::AppConfig, tcp_channel::TcpChannel},
    router::RouterHandle,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Installed briefly while a channel's id is known but its real transport
/// (which needs that id to report events) has not yet been constructed.
struct PlaceholderChannel;

impl Channel for PlaceholderChannel {
    fn connect(&mut self) {}
    fn close(&mut self) {}

    fn send_frame(&mut self, _frame: &[u8]) -> bool {
        warn!("dropped frame sent to a channel still being wired up");
        false
    }

    fn channel_type(&self) -> &str { "tcp-pending" }
    fn is_persistent(&self) -> bool { false }
}

fn install_hello_handler(router: &RouterHandle, identity: &str) {
    let identity = identity.to_owned();
    router
        .add_handler(
            "RPC.Hello",
            "",
            Box::new(move |handle, req, _info, _args| {
                handle.respond_success(req, Some(serde_json::json!({ "id": identity })));
            }),
        )
        .expect("RPC.Hello is registered exactly once at startup");
}

async fn accept_loop(listener: TcpListener, router: RouterHandle) -> anyhow::Result<()> {
    loop {
        let (stream, peer_addr) = listener.accept().await.context("accept failed")?;
        info!(%peer_addr, "accepted connection");

        let channel_id = router.add_channel("", false, Box::new(PlaceholderChannel));
        let real = TcpChannel::spawn(stream, router.clone(), channel_id);
        router.replace_channel(channel_id, Box::new(real));
        router.on_channel_open(channel_id);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let config = AppConfig::parse();

    let router = RouterHandle::new(RouterConfig::new(config.identity.clone(), config.max_queue_size));
    router.add_list_handler().expect("introspection handlers are registered exactly once at startup");
    install_hello_handler(&router, &config.identity);

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().context("build runtime")?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, async move {
        let listener = TcpListener::bind(&config.bind).await.with_context(|| format!("bind {}", config.bind))?;
        info!(bind = %config.bind, identity = %config.identity, "mrpc demo server listening");
        accept_loop(listener, router).await
    })
}
