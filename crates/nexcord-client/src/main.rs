use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use nexcord_api::{ApiClient, Session, auth};
use nexcord_client::{ClientConfig, Console, Dispatcher, Input, Notice, ViewUpdate};
use nexcord_gateway as gateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so they don't interleave with the transcript
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nexcord=info,nexcord_sync=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env()?;

    let session = match (&config.token, config.credentials()) {
        (Some(token), _) => Session::from_token(token.clone()).context("NEXCORD_TOKEN is not a valid token")?,
        (None, Some((email, password))) => auth::login(&config.api, email, password)
            .await
            .with_context(|| format!("login as {} failed", email))?,
        (None, None) => bail!("set NEXCORD_TOKEN, or NEXCORD_EMAIL and NEXCORD_PASSWORD"),
    };
    info!("Signed in as {} ({})", session.display_name(), session.user_id);

    let client = ApiClient::new(&config.api, session.clone())?;

    // Without a live session the client still works, it just doesn't see
    // other users' messages until the next fetch.
    let (gateway, events) = match gateway::connect(&config.gateway, &session).await {
        Ok((gw, events)) => (Some(gw), Some(events)),
        Err(e) => {
            warn!("Live updates unavailable: {}", e);
            (None, None)
        }
    };

    let (view_tx, mut view_rx) = mpsc::unbounded_channel();
    let (input_tx, input_rx) = mpsc::unbounded_channel();

    let dispatcher = Dispatcher::new(
        Arc::new(client),
        config.sync.clone(),
        gateway.as_ref().map(|gw| gw.commands()),
        view_tx,
    );
    let loop_task = tokio::spawn(dispatcher.run(input_rx, events));

    let mut console = Console::new();
    let mut stdout = std::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    writeln!(stdout, "Type /help for commands.")?;

    loop {
        tokio::select! {
            update = view_rx.recv() => {
                let Some(update) = update else { break };
                console.render(update, &mut stdout)?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    let _ = input_tx.send(Input::Quit);
                    break;
                };
                match console.parse(&line) {
                    Ok(Some(input)) => {
                        let quit = input == Input::Quit;
                        let _ = input_tx.send(input);
                        if quit {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(text) => console.render(ViewUpdate::Notice(Notice::Info(text)), &mut stdout)?,
                }
            }
        }
    }

    drop(input_tx);
    if let Err(e) = loop_task.await {
        warn!("Dispatcher task failed: {}", e);
    }
    if let Some(gw) = gateway {
        gw.shutdown().await;
    }

    info!("Bye");
    Ok(())
}
