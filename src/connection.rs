//! Handle connections from editors, passing requests to the debug session and sending responses
//! and notifications back.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use futures::prelude::*;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::codec::Decoder;

use crate::debugger::{DebuggerCmd, SessionState};
use crate::notifier::log_msg;
use crate::server::{LogLevel, Notification, Request, RequestCmd, Response, SendMsg, ServerCmd};
use crate::session::DebugSession;
use crate::util::serde_json_merge;
use crate::view::NotifierView;
use crate::vimcodec::VimCodec;

/// Listen for editors on `connection_addr` until the listener fails.
///
/// `notifier_rx` must be the receiving end of the channel the session and the view were created
/// with, everything sent on it goes to every connected editor.
pub async fn run(
    connection_addr: SocketAddr,
    session: DebugSession,
    view: Arc<NotifierView>,
    notifier_tx: UnboundedSender<Notification>,
    notifier_rx: UnboundedReceiver<Notification>,
) -> io::Result<()> {
    let tcp_listener = TcpListener::bind(&connection_addr).await?;

    log_msg(
        &notifier_tx,
        LogLevel::INFO,
        &format!("Listening on {}", &connection_addr),
    );

    let mut server = Server::new(tcp_listener, session, view, notifier_tx);
    server.run(notifier_rx).await
}

pub struct Server {
    tcp_listener: TcpListener,
    listeners: Arc<Mutex<Vec<UnboundedSender<SendMsg>>>>,
    connection_response: ConnectionResponse,
}

impl Server {
    pub fn new(
        tcp_listener: TcpListener,
        session: DebugSession,
        view: Arc<NotifierView>,
        notifier_tx: UnboundedSender<Notification>,
    ) -> Self {
        Server {
            tcp_listener,
            listeners: Arc::new(Mutex::new(vec![])),
            connection_response: ConnectionResponse::new(session, view, notifier_tx),
        }
    }

    /// Process a TCP listener.
    pub async fn run(&mut self, mut notifier_rx: UnboundedReceiver<Notification>) -> io::Result<()> {
        let listeners = self.listeners.clone();

        tokio::spawn(async move {
            while let Some(msg) = notifier_rx.recv().await {
                // Connections that have gone away are dropped here
                listeners
                    .lock()
                    .unwrap()
                    .retain(|listener| listener.send(SendMsg::Notification(msg.clone())).is_ok());
            }
        });

        loop {
            let (socket, _) = self.tcp_listener.accept().await?;
            self.handle(socket);
        }
    }

    /// Process a TCP socket connection.
    ///
    /// Fully sets up a new socket connection including listening for requests and sending
    /// responses.
    fn handle(&mut self, stream: TcpStream) {
        let (mut connection_tx, mut connection_rx) = VimCodec::new().framed(stream).split();

        // Both responses to requests and notifications of events go through here
        let (tx, mut rx) = mpsc::unbounded_channel();

        self.add_listener(tx.clone());

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if connection_tx.send(msg).await.is_err() {
                    break;
                }
            }
        });

        let connection_response = self.connection_response.clone();

        tokio::spawn(async move {
            while let Some(req) = connection_rx.next().await {
                let resp = match req {
                    Ok(req) => {
                        let id = req.id();
                        let connection_response = connection_response.clone();
                        // Session calls block on the remote process
                        match tokio::task::spawn_blocking(move || {
                            connection_response.get_response(&req)
                        })
                        .await
                        {
                            Ok(resp) => resp,
                            Err(e) => Response::new(
                                id,
                                error_json("Request failed", &format!("Request failed: {}", e)),
                            ),
                        }
                    }
                    Err(e) => Response::new(
                        e.get_id(),
                        error_json(e.get_error_string(), e.get_debug_string()),
                    ),
                };

                if tx.send(SendMsg::Response(resp)).is_err() {
                    break;
                }
            }
        });
    }

    /// Add a socket as a listener that will be notified of any events that happen in the
    /// session asynchronously like hitting a breakpoint
    fn add_listener(&mut self, sender: UnboundedSender<SendMsg>) {
        self.listeners.lock().unwrap().push(sender);
    }
}

fn error_json(error: &str, debug: &str) -> serde_json::Value {
    serde_json::json!({"status":"ERROR","error":error,"debug":debug})
}

fn state_name(state: SessionState) -> &'static str {
    match state {
        SessionState::Stopped => "stopped",
        SessionState::Launching => "launching",
        SessionState::Running => "running",
        SessionState::Paused => "paused",
    }
}

#[derive(Clone)]
struct ConnectionResponse {
    session: DebugSession,
    view: Arc<NotifierView>,
    notifier_tx: UnboundedSender<Notification>,
}

impl ConnectionResponse {
    fn new(
        session: DebugSession,
        view: Arc<NotifierView>,
        notifier_tx: UnboundedSender<Notification>,
    ) -> Self {
        ConnectionResponse {
            session,
            view,
            notifier_tx,
        }
    }

    /// Process a Request and figure out the response.
    fn get_response(&self, request: &Request) -> Response {
        let json_response = match request.cmd() {
            RequestCmd::ServerCmd(cmd) => match cmd {
                ServerCmd::Ping => self.ping(),
                ServerCmd::Pings => self.pings(),
                ServerCmd::GetConfig(key) => self.get_config(key),
                ServerCmd::SetConfig(key, value) => self.set_config(key, *value),
            },
            RequestCmd::DebuggerCmd(cmd) => match self.debugger_cmd(cmd) {
                Ok(msg) => {
                    let mut ret = serde_json::json!({"status":"OK"});
                    serde_json_merge(&mut ret, msg);
                    ret
                }
                Err(e) => error_json(e.get_error_string(), e.get_debug_string()),
            },
        };

        Response::new(request.id(), json_response)
    }

    fn debugger_cmd(&self, cmd: &DebuggerCmd) -> crate::Result<serde_json::Value> {
        let session = &self.session;

        match cmd {
            DebuggerCmd::Start => session.start(),
            DebuggerCmd::Stop => session.stop(),
            DebuggerCmd::Continue => session.continue_(),
            DebuggerCmd::Step(kind) => session.step(*kind),
            DebuggerCmd::Breakpoint(pos) => {
                session.set_breakpoint(pos.clone());
            }
            DebuggerCmd::Unbreakpoint(pos) => {
                let removed = session.remove_breakpoint(pos);
                return Ok(serde_json::json!({ "removed": removed }));
            }
            DebuggerCmd::ToggleBreakpoint(pos) => {
                let set = match pos {
                    Some(pos) => session.toggle_breakpoint(pos.clone()),
                    None => match session.toggle_breakpoint_at_cursor() {
                        Some(set) => set,
                        None => {
                            return Ok(error_json(
                                "No cursor position",
                                "Can't toggle a breakpoint without a cursor position",
                            ))
                        }
                    },
                };
                return Ok(serde_json::json!({ "set": set }));
            }
            DebuggerCmd::ListBreakpoints => {
                let breakpoints: Vec<serde_json::Value> = session
                    .list_breakpoints()
                    .iter()
                    .map(|pos| serde_json::json!({"file": pos.file(), "line": pos.line_num()}))
                    .collect();
                return Ok(serde_json::json!({ "breakpoints": breakpoints }));
            }
            DebuggerCmd::Cursor(pos) => self.view.set_cursor(pos.clone()),
            DebuggerCmd::Open(file, text) => {
                session.open_buffer(file, text);
            }
            DebuggerCmd::Insert(file, offset, text) => session.insert(file, *offset, text)?,
            DebuggerCmd::Remove(file, offset, len) => session.remove(file, *offset, *len)?,
        };

        Ok(serde_json::json!({ "state": state_name(session.state()) }))
    }

    fn ping(&self) -> serde_json::Value {
        serde_json::json!({"status":"OK","ping":"pong"})
    }

    fn pings(&self) -> serde_json::Value {
        log_msg(&self.notifier_tx, LogLevel::INFO, "pong");

        serde_json::json!({"status":"OK"})
    }

    fn get_config(&self, key: &str) -> serde_json::Value {
        match self.session.get_config(key) {
            Some(v) => serde_json::json!({"status":"OK","value":v}),
            None => error_json(
                "Config item not found",
                &format!("Config item not found: {}", key),
            ),
        }
    }

    fn set_config(&self, key: &str, value: i64) -> serde_json::Value {
        match self.session.set_config(key, value) {
            true => serde_json::json!({"status":"OK"}),
            false => error_json(
                "Config item not found",
                &format!("Config item not found: {}", key),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpStream;
    use tokio::sync::mpsc;

    use super::ConnectionResponse;
    use crate::debugger::{DebuggerCmd, SourcePosition};
    use crate::remote::mock::{MockBuild, MockLaunch};
    use crate::server::{Request, RequestCmd, ServerCmd};
    use crate::session::DebugSession;
    use crate::util::get_unused_localhost_port;
    use crate::view::NotifierView;

    fn connection_response() -> ConnectionResponse {
        let (tx, _rx) = mpsc::unbounded_channel();
        let view = Arc::new(NotifierView::new(tx.clone()));
        let session = DebugSession::new(
            Box::new(MockBuild::new()),
            Box::new(MockLaunch::new(vec![])),
            view.clone(),
            tx.clone(),
        );
        ConnectionResponse::new(session, view, tx)
    }

    fn respond(connection_response: &ConnectionResponse, cmd: RequestCmd) -> serde_json::Value {
        connection_response
            .get_response(&Request::new(1, cmd))
            .resp()
            .clone()
    }

    #[test]
    fn check_ping() {
        let cr = connection_response();
        assert_eq!(
            respond(&cr, RequestCmd::ServerCmd(ServerCmd::Ping)),
            serde_json::json!({"status":"OK","ping":"pong"})
        );
    }

    #[test]
    fn check_config_requests() {
        let cr = connection_response();

        assert_eq!(
            respond(
                &cr,
                RequestCmd::ServerCmd(ServerCmd::GetConfig("MaxStackFrames".to_string()))
            ),
            serde_json::json!({"status":"OK","value":64})
        );
        assert_eq!(
            respond(
                &cr,
                RequestCmd::ServerCmd(ServerCmd::SetConfig("Nope".to_string(), 1))
            )["status"],
            serde_json::json!("ERROR")
        );
    }

    #[test]
    fn check_breakpoint_requests() {
        let cr = connection_response();
        let pos = SourcePosition::new("A.pde".to_string(), 1);

        respond(
            &cr,
            RequestCmd::DebuggerCmd(DebuggerCmd::Open(
                "A.pde".to_string(),
                "void setup() {\n  size(100, 100);\n}".to_string(),
            )),
        );
        let resp = respond(&cr, RequestCmd::DebuggerCmd(DebuggerCmd::Breakpoint(pos.clone())));
        assert_eq!(resp, serde_json::json!({"status":"OK","state":"stopped"}));

        assert_eq!(
            respond(&cr, RequestCmd::DebuggerCmd(DebuggerCmd::ListBreakpoints)),
            serde_json::json!({"status":"OK","breakpoints":[{"file":"A.pde","line":2}]})
        );

        assert_eq!(
            respond(&cr, RequestCmd::DebuggerCmd(DebuggerCmd::ToggleBreakpoint(None)))["status"],
            serde_json::json!("ERROR")
        );

        respond(&cr, RequestCmd::DebuggerCmd(DebuggerCmd::Cursor(pos)));
        assert_eq!(
            respond(&cr, RequestCmd::DebuggerCmd(DebuggerCmd::ToggleBreakpoint(None))),
            serde_json::json!({"status":"OK","set":false})
        );
    }

    #[test]
    fn check_edit_errors_are_reported() {
        let cr = connection_response();

        let resp = respond(
            &cr,
            RequestCmd::DebuggerCmd(DebuggerCmd::Insert("A.pde".to_string(), 0, "x".to_string())),
        );

        assert_eq!(resp["status"], serde_json::json!("ERROR"));
        assert_eq!(resp["error"], serde_json::json!("No such file"));
    }

    #[test]
    fn check_start_failure_is_still_ok() {
        let cr = connection_response();

        assert_eq!(
            respond(&cr, RequestCmd::DebuggerCmd(DebuggerCmd::Start)),
            serde_json::json!({"status":"OK","state":"stopped"})
        );
    }

    async fn connect(addr: SocketAddr) -> TcpStream {
        for _ in 0..100 {
            if let Ok(stream) = TcpStream::connect(addr).await {
                return stream;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Can't connect to {}", addr);
    }

    #[tokio::test]
    async fn check_socket_round_trip() {
        let port = get_unused_localhost_port().unwrap();
        let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let view = Arc::new(NotifierView::new(tx.clone()));
        let session = DebugSession::new(
            Box::new(MockBuild::new()),
            Box::new(MockLaunch::new(vec![])),
            view.clone(),
            tx.clone(),
        );

        tokio::spawn(super::run(addr, session, view, tx, rx));

        let stream = connect(addr).await;
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();

        write
            .write_all(br#"[1,{"cmd":"ping"}][2,{"cmd":"fly"}]"#)
            .await
            .unwrap();

        let mut responses = vec![];
        while responses.len() < 2 {
            let line = lines.next_line().await.unwrap().unwrap();
            let json: serde_json::Value = serde_json::from_str(&line).unwrap();
            // Skip notifications, only responses start with an id
            if json[0].is_u64() {
                responses.push(json);
            }
        }

        assert_eq!(
            responses[0],
            serde_json::json!([1, {"status":"OK","ping":"pong"}])
        );
        assert_eq!(responses[1][0], serde_json::json!(2));
        assert_eq!(responses[1][1]["status"], serde_json::json!("ERROR"));
        assert_eq!(responses[1][1]["error"], serde_json::json!("Command unknown"));
    }
}
