//! `listen` and `replay`: drive a local showcase session from relay events or
//! a recorded message log.

use std::{path::Path, sync::Arc};

use {
    anyhow::{Context, Result},
    serde_json::Value,
    talkshop_catalog::CatalogSearch,
    talkshop_config::TalkShopConfig,
    talkshop_showcase::{Assistant, RelaySubscriber, ViewState},
    tokio::io::{AsyncBufReadExt, BufReader},
    tracing::{info, warn},
};

fn assistant(config: &TalkShopConfig) -> Result<Assistant> {
    let catalog: Arc<dyn CatalogSearch> = talkshop_catalog::from_config(&config.catalog)?;
    Ok(Assistant::new(catalog, &config.showcase))
}

/// Subscribe to a relay and apply every event to a local session until the
/// relay closes the stream or ctrl-c.
pub async fn listen(config: &TalkShopConfig, relay: &str, conversation_id: &str) -> Result<()> {
    let assistant = Arc::new(assistant(config)?);
    let subscriber = RelaySubscriber::new(relay, conversation_id);

    let mut changes = assistant.view().subscribe();
    let watcher = tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let state = changes.borrow_and_update().clone();
            log_view(&state);
        }
    });

    let handler = Arc::clone(&assistant);
    let run = subscriber.run(move |event| {
        let received = handler.handle_message(&event);
        if let Some(ticket) = received.ticket {
            tokio::spawn(async move {
                if let Ok(outcome) = ticket.await {
                    tracing::debug!(?outcome, "dispatch finished");
                }
            });
        }
    });

    let result = tokio::select! {
        delivered = run => delivered
            .map(|delivered| info!(delivered, "relay stream ended"))
            .with_context(|| format!("listening on {}", subscriber.url())),
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Ok(())
        },
    };
    watcher.abort();
    result
}

fn log_view(state: &ViewState) {
    info!(
        showcase = state.showcase.kind(),
        products = state.showcase.products().len(),
        focused = state.focused_product_id.as_deref().unwrap_or("-"),
        cart_count = state.cart_count,
        cart_success = state.cart_success,
        "view changed"
    );
}

/// Feed a JSONL file of data-channel messages through the assistant, waiting
/// for each dispatch before reading the next line.
pub async fn replay_file(config: &TalkShopConfig, path: &Path) -> Result<ViewState> {
    let assistant = assistant(config)?;
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut line_number = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        let message: Value = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(error) => {
                warn!(line = line_number, %error, "skipping unparsable line");
                continue;
            },
        };
        let received = assistant.handle_message(&message);
        if let Some(ticket) = received.ticket {
            let outcome = ticket.await.context("dispatcher stopped")?;
            info!(line = line_number, ?outcome, "replayed tool call");
        }
    }
    Ok(assistant.view().snapshot())
}

pub async fn replay(config: &TalkShopConfig, path: &Path) -> Result<()> {
    let state = replay_file(config, path).await?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
