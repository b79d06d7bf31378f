//! Drives many concurrent WebSocket clients through the join and typing flow
//! so the hub's registration and broadcast paths can be watched under load.

use std::env;
use std::time::Duration;

use futures::SinkExt;
use serde_json::json;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const DEFAULT_URL: &str = "ws://localhost:8080/ws";
const DEFAULT_CLIENTS: usize = 50;
const UPDATES_PER_CLIENT: u32 = 5;
const UPDATE_INTERVAL: Duration = Duration::from_millis(100);

/// Connect `WSLOAD_CLIENTS` clients to `WSLOAD_URL` and run each through a
/// join plus a burst of typing updates.
pub async fn run() -> anyhow::Result<()> {
    let url = env::var("WSLOAD_URL").unwrap_or_else(|_| DEFAULT_URL.into());
    let clients = env::var("WSLOAD_CLIENTS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_CLIENTS);

    println!("connecting {clients} clients to {url}");

    let mut tasks = Vec::with_capacity(clients);
    for id in 0..clients {
        tasks.push(tokio::spawn(run_client(url.clone(), id)));
    }

    let mut failures = 0usize;
    for task in tasks {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                failures += 1;
                eprintln!("client error: {err}");
            }
            Err(err) => {
                failures += 1;
                eprintln!("client task panicked: {err}");
            }
        }
    }

    println!("load run complete; {failures} of {clients} clients failed");
    Ok(())
}

async fn run_client(url: String, id: usize) -> anyhow::Result<()> {
    let (mut socket, _response) = connect_async(url.as_str()).await?;

    let user_id = format!("load_user_{id}");
    let join = json!({
        "type": "join_lobby",
        "payload": { "user_id": user_id, "room_id": "global_arena" }
    });
    socket.send(Message::text(join.to_string())).await?;

    for step in 0..UPDATES_PER_CLIENT {
        let update = json!({
            "type": "typing_update",
            "payload": {
                "user_id": user_id,
                "room_id": "global_arena",
                "wpm": 60 + step,
                "accuracy": 95.0,
                "progress": step * 20,
            }
        });
        socket.send(Message::text(update.to_string())).await?;
        sleep(UPDATE_INTERVAL).await;
    }

    socket.close(None).await?;
    Ok(())
}
