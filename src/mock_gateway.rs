use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub enum Reply {
    Json(u16, &'static str),
    /// Reads the request, then closes the connection without answering.
    HangUp,
}

/// Serves one canned reply per connection, in order, and records request paths.
pub struct MockGateway {
    pub base_url: String,
    handle: JoinHandle<Vec<String>>,
}

impl MockGateway {
    pub async fn start(replies: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock gateway");
        let addr = listener.local_addr().expect("mock gateway addr");
        let handle = tokio::spawn(async move {
            let mut paths = Vec::new();
            for reply in replies {
                let (mut stream, _) = listener.accept().await.expect("accept");
                paths.push(read_request_path(&mut stream).await);
                match reply {
                    Reply::HangUp => drop(stream),
                    Reply::Json(status, body) => {
                        let response = format!(
                            "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                            body.len()
                        );
                        stream.write_all(response.as_bytes()).await.expect("write reply");
                        let _ = stream.shutdown().await;
                    }
                }
            }
            paths
        });
        Self {
            base_url: format!("http://{addr}/v1"),
            handle,
        }
    }

    /// Waits until every reply was served.
    pub async fn requests(self) -> Vec<String> {
        self.handle.await.expect("mock gateway task")
    }
}

async fn read_request_path(stream: &mut TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = stream.read(&mut chunk).await.expect("read request");
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
        let text = String::from_utf8_lossy(&buffer);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if buffer.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buffer)
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string()
}
