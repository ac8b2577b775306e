//! # Interactive Call Session
//!
//! Hosts one [`CallSessionStore`] for the duration of a `call` command. Inbound events are printed
//! and applied as they arrive; for streams that accept frames, stdin lines are pushed as frames.
use crate::formatter::{FormattedString, History};
use anyhow::Context;
use colored::*;
use rpcdeck_core::grpc::GrpcTransport;
use rpcdeck_core::metadata::MetadataEntry;
use rpcdeck_core::session::{CallRequest, CallSessionStore, InboundEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

/// What is left of a session once it is over.
pub struct Outcome {
    /// The body the call was opened with.
    pub request_body: serde_json::Value,
    pub response_metadata: Vec<MetadataEntry>,
}

enum Input {
    Frame(serde_json::Value),
    Stop,
    History,
    Quit,
}

pub async fn run(
    transport: GrpcTransport,
    mut events: UnboundedReceiver<InboundEvent>,
    request: CallRequest,
) -> anyhow::Result<Outcome> {
    let id = request.id.clone();
    let mode = request.mode;
    let mut store = CallSessionStore::new(transport);

    store
        .send(request)
        .await
        .with_context(|| format!("Failed to call '{id}'"))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut reading = mode.accepts_frames();

    if reading {
        eprintln!(
            "{}",
            "Type one JSON frame per line, or :stop, :history, :quit".dimmed()
        );
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let ended = matches!(event, InboundEvent::End { .. });

                if let InboundEvent::Data(data) = &event {
                    println!("{}", FormattedString::from(data));
                }
                store.apply(event);

                if ended {
                    break;
                }
            }
            line = lines.next_line(), if reading => {
                let input = match line.context("Failed to read stdin")? {
                    Some(line) if line.trim().is_empty() => continue,
                    Some(line) => match parse_input(&line) {
                        Ok(input) => input,
                        Err(err) => {
                            eprintln!("{}", FormattedString::from(err));
                            continue;
                        }
                    },
                    None => Input::Stop,
                };

                match input {
                    Input::Frame(body) => {
                        let frame = CallRequest {
                            id: id.clone(),
                            mode,
                            body,
                            metadata: vec![],
                        };
                        if let Err(err) = store.push(frame).await {
                            eprintln!("{}", FormattedString::from(anyhow::Error::from(err)));
                        }
                    }
                    Input::Stop => {
                        reading = false;
                        store.stop(&id).await?;
                    }
                    Input::History => println!(
                        "{}",
                        FormattedString::from(History(
                            store.request_session(&id),
                            store.response_session(&id)
                        ))
                    ),
                    Input::Quit => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!(method = %id, "Interrupted");
                break;
            }
        }
    }

    let outcome = Outcome {
        request_body: store
            .request_session(&id)
            .and_then(|session| session.streams().back().cloned())
            .unwrap_or_default(),
        response_metadata: store
            .response_session(&id)
            .map(|session| session.metadata().to_vec())
            .unwrap_or_default(),
    };

    store
        .shutdown()
        .await
        .context("Failed to cancel running calls")?;

    Ok(outcome)
}

fn parse_input(line: &str) -> anyhow::Result<Input> {
    match line.trim() {
        ":stop" => Ok(Input::Stop),
        ":history" => Ok(Input::History),
        ":quit" => Ok(Input::Quit),
        other => serde_json::from_str(other)
            .map(Input::Frame)
            .context("Frames must be JSON values"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert!(matches!(parse_input(" :stop "), Ok(Input::Stop)));
        assert!(matches!(parse_input(":history"), Ok(Input::History)));
        assert!(matches!(parse_input(":quit"), Ok(Input::Quit)));
        assert!(
            matches!(parse_input(r#"{"message": "hi"}"#), Ok(Input::Frame(body)) if body["message"] == "hi")
        );
        assert!(parse_input("{not json").is_err());
    }
}
