//! Load test for the pocket server.
//!
//! Spawns multiple fake WebSocket clients that:
//! - Connect to the server
//! - Periodically click at random table positions
//! - Receive and count positions_delta and scoreboard messages
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N      Number of clients to spawn (default: 100)
//!   --duration S     Test duration in seconds (default: 30)
//!   --click-rate R   Clicks per second per client (default: 2)
//!   --url URL        Server URL (default: ws://127.0.0.1:9001/ws)

use futures_util::{SinkExt, StreamExt};
use pocket_shared::protocol::{ClientMsg, ServerMsg};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

// === Metrics ===

#[derive(Default)]
struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    positions_received: AtomicU64,
    scoreboards_received: AtomicU64,
    scored_received: AtomicU64,
    clicks_sent: AtomicU64,
    errors: AtomicU64,
    total_bodies_seen: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

// === Client task ===

async fn run_client(
    client_id: u32,
    url: String,
    click_rate: f64,
    duration: Duration,
    metrics: Arc<Metrics>,
) {
    let connect_start = Instant::now();

    let (mut ws, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    metrics
        .latency_sum_ms
        .fetch_add(connect_start.elapsed().as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    // Wait for welcome message before doing anything else
    let welcome = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                    if let Ok(ServerMsg::Welcome(welcome)) = serde_json::from_str(&text) {
                        return Some(welcome);
                    }
                }
                Ok(Message::Close(_)) | Err(_) => return None,
                _ => {}
            }
        }
        None
    })
    .await;

    let canvas = match welcome {
        Ok(Some(welcome)) => {
            if client_id < 3 {
                eprintln!("Client {} welcomed as {}", client_id, welcome.self_id);
            }
            welcome.config.canvas_size
        }
        Ok(None) | Err(_) => {
            if client_id < 3 {
                eprintln!("Client {} failed to get welcome", client_id);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            metrics.connected.fetch_sub(1, Ordering::Relaxed);
            return;
        }
    };

    let click_interval = if click_rate > 0.0 {
        Duration::from_secs_f64(1.0 / click_rate)
    } else {
        Duration::from_secs(3600) // Effectively never
    };

    let mut click_timer = tokio::time::interval(click_interval);
    click_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let test_end = Instant::now() + duration;
    let mut rng = ChaCha8Rng::seed_from_u64(client_id as u64 * 12345 + 67890);

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = click_timer.tick() => {
                let msg = ClientMsg::Click {
                    x: rng.gen_range(0.0..canvas),
                    y: rng.gen_range(0.0..canvas),
                };
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(_) => continue,
                };
                if ws.send(Message::Text(json.into())).await.is_ok() {
                    metrics.clicks_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match serde_json::from_str::<ServerMsg>(&text) {
                            Ok(ServerMsg::PositionsDelta(delta)) => {
                                metrics.positions_received.fetch_add(1, Ordering::Relaxed);
                                metrics.total_bodies_seen.fetch_add(delta.positions.len() as u64, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::Scoreboard(_)) => {
                                metrics.scoreboards_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::Scored(_)) => {
                                metrics.scored_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(_) => {}
                            Err(_) => {
                                metrics.errors.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_clients: u32 = 100;
    let mut duration_secs: u64 = 30;
    let mut click_rate: f64 = 2.0;
    let mut url = "ws://127.0.0.1:9001/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_clients = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(100);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--click-rate" => {
                i += 1;
                click_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(2.0);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Pocket Server Load Test ===");
    println!("Clients: {}", num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Click rate: {}/s per client", click_rate);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::default());
    let duration = Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(num_clients as usize);

    println!("Spawning {} clients...", num_clients);
    let spawn_start = Instant::now();

    for client_id in 0..num_clients {
        let url = url.clone();
        let metrics = Arc::clone(&metrics);

        handles.push(tokio::spawn(async move {
            run_client(client_id, url, click_rate, duration, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();

        loop {
            interval.tick().await;
            let elapsed = start.elapsed().as_secs();
            if elapsed >= duration_secs + 5 {
                break;
            }

            println!(
                "[{:3}s] connected={}, msgs={}, positions={}, scoreboards={}, scored={}, clicks={}, errors={}",
                elapsed,
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.positions_received.load(Ordering::Relaxed),
                metrics_clone.scoreboards_received.load(Ordering::Relaxed),
                metrics_clone.scored_received.load(Ordering::Relaxed),
                metrics_clone.clicks_sent.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }

    stats_handle.abort();

    // Final stats
    println!();
    println!("=== Final Results ===");
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let positions = metrics.positions_received.load(Ordering::Relaxed);
    let bodies = metrics.total_bodies_seen.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!("Total messages received: {}", msgs);
    println!("Total positions_delta messages: {}", positions);
    println!(
        "Total scoreboard messages: {}",
        metrics.scoreboards_received.load(Ordering::Relaxed)
    );
    println!(
        "Total scored messages: {}",
        metrics.scored_received.load(Ordering::Relaxed)
    );
    println!("Total clicks sent: {}", metrics.clicks_sent.load(Ordering::Relaxed));
    println!("Total errors: {}", metrics.errors.load(Ordering::Relaxed));
    println!(
        "Average bodies per table: {}",
        if positions > 0 { bodies / positions } else { 0 }
    );

    if latency_count > 0 {
        println!("Average connect latency: {}ms", latency_sum / latency_count);
    }

    let positions_per_client = positions as f64 / num_clients.max(1) as f64;
    let expected = duration_secs as f64 * 8.0; // 8 Hz positions cadence

    println!();
    println!("Messages/sec (total): {:.0}", msgs as f64 / duration_secs.max(1) as f64);
    println!("Positions per client: {:.1}", positions_per_client);
    println!("Expected positions per client: {:.1}", expected);
    if expected > 0.0 {
        println!("Delivery rate: {:.1}%", positions_per_client / expected * 100.0);
    }
}
