// Cybermetrics client entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open the session store, restore a previous sign-in if possible
// 4. Build the HTTP gateway
// 5. Create mpsc channels
// 6. Spawn the app logic task
// 7. Run the line-oriented console surface until quit
// 8. Cleanup on exit

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};

use cybermetrics::app::{self, AppState};
use cybermetrics::auth::AuthSession;
use cybermetrics::config;
use cybermetrics::gateway::HttpGateway;
use cybermetrics::player::{FieldPosition, PlayerCard, PlayerId};
use cybermetrics::protocol::{AppSnapshot, UiUpdate, UserCommand};
use cybermetrics::session::SqliteSessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Cybermetrics client starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: api={}, debounce={}ms",
        config.api.base_url, config.search.debounce_ms
    );

    // 3. Session store + gateway
    let store = Arc::new(
        SqliteSessionStore::open(&config.session_db_path)
            .context("failed to open session store")?,
    );
    info!("Session store opened at {}", config.session_db_path);

    let gateway = Arc::new(
        HttpGateway::from_config(&config.api).context("failed to build HTTP gateway")?,
    );

    // 4. Restore a previous sign-in, if the stored token still verifies
    let auth = AuthSession::new(gateway.clone(), store.clone());
    match auth.restore().await {
        Ok(Some((profile, token))) => {
            gateway.set_token(Some(token));
            println!("Signed in as {}", profile.email.as_deref().unwrap_or(&profile.user_id));
        }
        Ok(None) => println!("Not signed in. Use `login <email> <password>` to sign in."),
        Err(e) => error!("session restore failed: {e}"),
    }

    // 5. Create mpsc channels
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (engine_tx, engine_rx) = mpsc::channel(256);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let state = AppState::new(
        gateway.clone(),
        Duration::from_millis(config.search.debounce_ms),
        engine_tx,
    );

    // 6. Spawn the app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, engine_rx, ui_tx, state).await {
            error!("Application loop error: {}", e);
        }
    });

    // Snapshot printer: every applied command or event pushes a fresh
    // snapshot; render each one as a short status block.
    let render_handle = tokio::spawn(render_loop(ui_rx));

    // 7. Console surface (blocking until the user quits)
    info!("Application ready");
    if let Err(e) = console_loop(cmd_tx, auth, gateway).await {
        error!("Console error: {}", e);
    }

    // 8. Cleanup: wait for the app task to finish (with timeout)
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;
    render_handle.abort();

    info!("Cybermetrics client shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (the terminal is the user surface).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("cybermetrics.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cybermetrics=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

async fn render_loop(mut ui_rx: mpsc::Receiver<UiUpdate>) {
    while let Some(UiUpdate::Snapshot(snapshot)) = ui_rx.recv().await {
        render(&snapshot);
    }
}

fn render(s: &AppSnapshot) {
    if let Some(err) = s
        .roster_error
        .as_deref()
        .or(s.search_error.as_deref())
        .or(s.recommend_error.as_deref())
        .or(s.weakness_error.as_deref())
        .or(s.value_error.as_deref())
    {
        println!("! {err}");
    }

    match s.mode {
        cybermetrics::protocol::DisplayMode::Search => {
            println!("-- search results for {:?} --", s.query.trim());
            for card in &s.search_results {
                println!("  [{}] {}", card.id, card.name);
            }
        }
        cybermetrics::protocol::DisplayMode::Recommendations => {
            println!("-- recommended pickups --");
            for card in &s.recommendations {
                println!("  [{}] {}", card.id, card.name);
            }
        }
        cybermetrics::protocol::DisplayMode::Idle => {}
    }

    println!(
        "team: {} saved, {} assigned{}",
        s.players.len(),
        s.lineup.filled_count(),
        if s.weakness_loading { " (weakness updating...)" } else { "" },
    );
    if let Some(current) = &s.weakness_current {
        let (stat, value) = current.weakest_stat();
        match &s.weakness_baseline {
            Some(baseline) => {
                let (base_stat, base_value) = baseline.weakest_stat();
                println!(
                    "weakest stat: {stat} ({value:+.2}), baseline: {base_stat} ({base_value:+.2})"
                );
            }
            None => println!("weakest stat: {stat} ({value:+.2})"),
        }
    }
    for score in &s.value_scores {
        println!(
            "  value [{}] {}: {:+.1} (adj {:+.1})",
            score.id, score.name, score.value_score, score.adjustment_score
        );
    }
}

// ---------------------------------------------------------------------------
// Console surface
// ---------------------------------------------------------------------------

const HELP: &str = "\
commands:
  search <text>              search players as you type
  save <id> <name>           save a player to your team
  remove <id>                remove a saved player
  assign <id> <pos|bench>    assign a saved player (P C 1B 2B 3B SS LF CF RF DH)
  place <id> <pos> <name>    drag a player onto a field slot (saves if needed)
  recs                       recommendations for your current roster
  values                     value scores for your saved players
  baseline                   freeze the current weakness vector as baseline
  roster                     re-list saved players from the server
  login <email> <password>
  signup <email> <password> <display name>
  logout
  quit";

async fn console_loop(
    cmd_tx: mpsc::Sender<UserCommand>,
    auth: AuthSession,
    gateway: Arc<HttpGateway>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (verb, rest) = match line.split_once(' ') {
            Some((v, r)) => (v, r.trim()),
            None => (line, ""),
        };

        match verb {
            "quit" | "q" => {
                cmd_tx.send(UserCommand::Quit).await?;
                break;
            }
            "help" => println!("{HELP}"),
            "search" => cmd_tx.send(UserCommand::QueryChanged(rest.to_string())).await?,
            "save" => {
                if let Some((id, name)) = parse_id_and(rest) {
                    cmd_tx
                        .send(UserCommand::SavePlayer(card(id, name)))
                        .await?;
                } else {
                    println!("usage: save <id> <name>");
                }
            }
            "remove" => match rest.parse::<PlayerId>() {
                Ok(id) => cmd_tx.send(UserCommand::RemovePlayer(id)).await?,
                Err(_) => println!("usage: remove <id>"),
            },
            "assign" => {
                if let Some((id, pos_str)) = parse_id_and(rest) {
                    let position = if pos_str.eq_ignore_ascii_case("bench") {
                        None
                    } else {
                        match FieldPosition::from_code(pos_str) {
                            Some(p) => Some(p),
                            None => {
                                println!("unknown position {pos_str:?}");
                                continue;
                            }
                        }
                    };
                    cmd_tx
                        .send(UserCommand::AssignPosition { id, position })
                        .await?;
                } else {
                    println!("usage: assign <id> <pos|bench>");
                }
            }
            "place" => {
                let Some((id, rest)) = parse_id_and(rest) else {
                    println!("usage: place <id> <pos> <name>");
                    continue;
                };
                let Some((pos_str, name)) = rest.split_once(' ') else {
                    println!("usage: place <id> <pos> <name>");
                    continue;
                };
                let Some(position) = FieldPosition::from_code(pos_str) else {
                    println!("unknown position {pos_str:?}");
                    continue;
                };
                cmd_tx
                    .send(UserCommand::PrepareDrag {
                        player: card(id, name.trim()),
                        from: None,
                    })
                    .await?;
                cmd_tx.send(UserCommand::Drop(position)).await?;
            }
            "recs" => cmd_tx.send(UserCommand::RequestRecommendations).await?,
            "values" => cmd_tx.send(UserCommand::RequestValueScores).await?,
            "baseline" => cmd_tx.send(UserCommand::SetBaseline).await?,
            "roster" => cmd_tx.send(UserCommand::RefreshRoster).await?,
            "login" => match rest.split_once(' ') {
                Some((email, password)) => match auth.login(email, password.trim()).await {
                    Ok((profile, token)) => {
                        gateway.set_token(Some(token));
                        println!(
                            "Signed in as {}",
                            profile.email.as_deref().unwrap_or(&profile.user_id)
                        );
                        cmd_tx.send(UserCommand::RefreshRoster).await?;
                    }
                    Err(e) => println!("login failed: {e}"),
                },
                None => println!("usage: login <email> <password>"),
            },
            "signup" => {
                let mut parts = rest.splitn(3, ' ');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(email), Some(password), Some(name)) => {
                        match auth.signup(email, password, name).await {
                            Ok((profile, token)) => {
                                gateway.set_token(Some(token));
                                println!(
                                    "Account created for {}",
                                    profile.email.as_deref().unwrap_or(&profile.user_id)
                                );
                                cmd_tx.send(UserCommand::RefreshRoster).await?;
                            }
                            Err(e) => println!("signup failed: {e}"),
                        }
                    }
                    _ => println!("usage: signup <email> <password> <display name>"),
                }
            }
            "logout" => {
                if let Err(e) = auth.logout() {
                    println!("logout failed: {e}");
                } else {
                    gateway.set_token(None);
                    println!("Signed out.");
                }
            }
            other => println!("unknown command {other:?} (try `help`)"),
        }
    }

    Ok(())
}

fn parse_id_and(rest: &str) -> Option<(PlayerId, &str)> {
    let (id, tail) = rest.split_once(' ')?;
    Some((id.parse().ok()?, tail.trim()))
}

fn card(id: PlayerId, name: &str) -> PlayerCard {
    PlayerCard {
        id,
        name: name.to_string(),
        image_url: None,
        years_active: None,
    }
}
