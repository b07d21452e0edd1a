//! Terminal chat session.

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use crate::config::ClientArgs;
use crate::error::ClientError;
use crate::message::{ChatEvent, Message};
use crate::types::{RoomCode, Username};

use super::api::{validate_username, RelayApi};
use super::input::{parse_input, Input};
use super::presence::OnlineUsers;
use super::render::{random_color, Renderer};

/// Identity of the local user for the whole session
struct Me {
    username: Username,
    room_code: RoomCode,
    color: i32,
}

impl Me {
    fn join(&self) -> ChatEvent {
        ChatEvent::join(&self.username, self.color, &self.room_code)
    }

    fn leave(&self) -> ChatEvent {
        ChatEvent::leave(&self.username, self.color, &self.room_code)
    }

    fn say(&self, to: String, content: String) -> ChatEvent {
        ChatEvent::chat(Message::new(
            self.username.as_str(),
            content,
            self.color,
            to,
            &self.room_code,
        ))
    }
}

async fn send_event<S>(write: &mut S, event: &ChatEvent) -> Result<(), ClientError>
where
    S: Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    write.send(WsMessage::Text(event.encode()?.into())).await?;
    Ok(())
}

/// Validate, connect, replay history, then chat until Ctrl+C, `/quit`,
/// end of input, or the server going away.
pub async fn run_client(args: ClientArgs) -> Result<(), ClientError> {
    let room_code = RoomCode::parse(args.room)?;
    let api = RelayApi::new(args.addr);
    let username = validate_username(&api, &room_code, &args.user).await?;

    let me = Me {
        username,
        room_code,
        color: random_color(),
    };

    let url = api.ws_url(&me.username, &me.room_code, me.color)?;
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    info!("Connected to {}", url);

    let mut online = OnlineUsers::new(api.online_users(&me.room_code).await?);
    if !online.is_empty() {
        info!("{} already online in {}", online.len(), me.room_code);
    }
    let renderer = Renderer::new(me.username.as_str());
    for event in api.history(&me.room_code).await? {
        if let Some(line) = renderer.render(&event) {
            println!("{}", line);
        }
    }

    let (mut write, mut read) = ws_stream.split();
    send_event(&mut write, &me.join()).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => match ChatEvent::decode(&text) {
                    Ok(event) => {
                        online.apply(&event);
                        if let Some(line) = renderer.render(&event) {
                            println!("{}", line);
                        }
                    }
                    Err(e) => warn!("Parsing error: {}", e),
                },
                Some(Ok(WsMessage::Close(_))) | None => {
                    info!("Server closed the connection");
                    return Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            line = lines.next_line() => match parse_input(line?.as_deref().unwrap_or("/quit")) {
                Input::Empty => {}
                Input::Users => println!("{}", renderer.render_users(online.users())),
                Input::Quit => break,
                Input::Message { to, content } => {
                    send_event(&mut write, &me.say(to, content)).await?;
                }
            },
            _ = &mut interrupt => {
                info!("interrupt");
                break;
            }
        }
    }

    send_event(&mut write, &me.leave()).await?;
    write.send(WsMessage::Close(None)).await?;
    debug!("Close frame sent");
    Ok(())
}
