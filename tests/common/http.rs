//! Loopback HTTP server standing in for a CKAN endpoint

use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub type Query = HashMap<String, String>;

/// Running stub; remembers the query string of every request
pub struct StubServer {
    pub url: String,
    requests: Arc<Mutex<Vec<Query>>>,
}

impl StubServer {
    /// Queries received so far, in arrival order
    pub fn requests(&self) -> Vec<Query> {
        self.requests.lock().unwrap().clone()
    }
}

fn parse_query(request: &str) -> Query {
    request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|target| target.split_once('?'))
        .map(|(_, q)| {
            q.split('&')
                .filter_map(|pair| pair.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Answer every GET with `respond(query)` as a 200 JSON body
pub async fn spawn_stub<F>(respond: F) -> StubServer
where
    F: Fn(&Query) -> String + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let seen = requests.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let respond = respond.clone();
            let seen = seen.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }

                let query = parse_query(&String::from_utf8_lossy(&buf));
                let body = respond(&query);
                seen.lock().unwrap().push(query);

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    StubServer {
        url: format!("http://{addr}/api/3/action/datastore_search"),
        requests,
    }
}

/// CKAN `datastore_search` page over `rows`, honouring `limit` and `offset`
pub fn ckan_page(query: &Query, fields: &[&str], rows: &[serde_json::Value]) -> String {
    let limit: usize = query
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(rows.len());
    let offset: usize = query
        .get("offset")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let records: Vec<_> = rows.iter().skip(offset).take(limit).cloned().collect();
    let fields: Vec<_> = fields.iter().map(|id| json!({ "id": id })).collect();

    json!({
        "success": true,
        "result": {
            "fields": fields,
            "records": records,
        }
    })
    .to_string()
}
