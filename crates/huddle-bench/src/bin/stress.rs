//! End-to-end stress test for Huddle.
//!
//! Opens many TCP clients against a running server, logs each one in as one
//! of the bench users, sends a handful of random commands with random pauses
//! and exits. Every line the server sends back is counted.
//!
//! ```bash
//! huddle &
//! stress [clients] [addr]
//! ```

use huddle_bench::{credentials_for, random_command};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Barrier;

const SERVER_ADDR: &str = "127.0.0.1:12345";
const DEFAULT_CLIENTS: usize = 1000;
const COMMANDS_PER_CLIENT: usize = 5;
const STAGGER_MS: u64 = 5;
const PAUSE_MS: std::ops::RangeInclusive<u64> = 500..=1500;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Default)]
struct Counters {
    logged_in: AtomicU64,
    failed: AtomicU64,
    commands_sent: AtomicU64,
    lines_received: AtomicU64,
}

struct Session {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let num_clients = args
        .get(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_CLIENTS);
    let addr = args.get(2).cloned().unwrap_or_else(|| SERVER_ADDR.to_string());

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Huddle End-to-End Stress Test                   ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Make sure the server is running: cargo run --release        ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("📊 {} clients against {}", num_clients, addr);

    let counters = Arc::new(Counters::default());
    let barrier = Arc::new(Barrier::new(num_clients + 1));
    let mut handles = Vec::with_capacity(num_clients);

    for index in 0..num_clients {
        let counters = Arc::clone(&counters);
        let barrier = Arc::clone(&barrier);
        let addr = addr.clone();

        handles.push(tokio::spawn(async move {
            run_client(index, &addr, counters, barrier).await;
        }));
        tokio::time::sleep(Duration::from_millis(STAGGER_MS)).await;
    }

    // Every client reaches the barrier, logged in or not
    barrier.wait().await;
    println!(
        "✓ {} logged in, {} failed",
        counters.logged_in.load(Ordering::SeqCst),
        counters.failed.load(Ordering::SeqCst)
    );

    let start = Instant::now();
    for handle in handles {
        if let Err(e) = handle.await {
            eprintln!("Client task failed: {}", e);
        }
    }
    let elapsed = start.elapsed();

    let sent = counters.commands_sent.load(Ordering::SeqCst);
    let received = counters.lines_received.load(Ordering::SeqCst);

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                         RESULTS                              ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!(
        "║  Clients:              {:>10}                           ║",
        num_clients
    );
    println!(
        "║  Logged In:            {:>10}                           ║",
        counters.logged_in.load(Ordering::SeqCst)
    );
    println!(
        "║  Duration:             {:>10.2}s                          ║",
        elapsed.as_secs_f64()
    );
    println!(
        "║  Commands Sent:        {:>10}                           ║",
        sent
    );
    println!(
        "║  Lines Received:       {:>10}                           ║",
        received
    );
    println!(
        "║  Received/s:           {:>10.0}                           ║",
        received as f64 / elapsed.as_secs_f64()
    );
    println!("╚══════════════════════════════════════════════════════════════╝");
}

async fn run_client(index: usize, addr: &str, counters: Arc<Counters>, barrier: Arc<Barrier>) {
    let (username, password) = credentials_for(index);
    let session = login(addr, username, password).await;

    match &session {
        Ok(_) => counters.logged_in.fetch_add(1, Ordering::Relaxed),
        Err(e) => {
            eprintln!("[Client {}] {} could not log in: {}", index, username, e);
            counters.failed.fetch_add(1, Ordering::Relaxed)
        }
    };

    barrier.wait().await;

    if let Ok(session) = session {
        if let Err(e) = chat(session, &counters).await {
            eprintln!("[Client {}] {}", index, e);
        }
    }
}

async fn login(addr: &str, username: &str, password: &str) -> Result<Session, BoxError> {
    let (read, mut writer) = TcpStream::connect(addr).await?.into_split();
    let mut lines = BufReader::new(read).lines();

    expect_line(&mut lines, "Enter username: ").await?;
    writer.write_all(format!("{username}\n").as_bytes()).await?;
    expect_line(&mut lines, "Enter password: ").await?;
    writer.write_all(format!("{password}\n").as_bytes()).await?;
    expect_line(&mut lines, "Authentication successful!").await?;

    Ok(Session { lines, writer })
}

async fn expect_line(
    lines: &mut Lines<BufReader<OwnedReadHalf>>,
    expected: &str,
) -> Result<(), BoxError> {
    match lines.next_line().await? {
        Some(line) if line == expected => Ok(()),
        Some(line) => Err(format!("expected {expected:?}, got {line:?}").into()),
        None => Err("server closed the connection".into()),
    }
}

async fn chat(session: Session, counters: &Arc<Counters>) -> Result<(), BoxError> {
    let Session { mut lines, mut writer } = session;

    // Count everything the server relays until it closes the connection
    let recv_counters = Arc::clone(counters);
    let recv_task = tokio::spawn(async move {
        while let Ok(Some(_line)) = lines.next_line().await {
            recv_counters.lines_received.fetch_add(1, Ordering::Relaxed);
        }
    });

    let mut rng = StdRng::from_entropy();
    for _ in 0..COMMANDS_PER_CLIENT {
        let command = random_command(&mut rng);
        writer.write_all(format!("{command}\n").as_bytes()).await?;
        counters.commands_sent.fetch_add(1, Ordering::Relaxed);

        let pause = rng.gen_range(PAUSE_MS);
        tokio::time::sleep(Duration::from_millis(pause)).await;
    }

    writer.write_all(b"/exit\n").await?;
    recv_task.await?;
    Ok(())
}
