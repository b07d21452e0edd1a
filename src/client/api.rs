//! HTTP side of the client: the relay's query endpoints and the
//! WebSocket URL.

use reqwest::Url;

use crate::directory::DirectoryEntry;
use crate::error::{ClientError, ValidationError};
use crate::message::{ChatEvent, UsernameCheck, UsernameValidity};
use crate::types::{RoomCode, Username};

/// Thin client for the relay's REST endpoints
#[derive(Debug, Clone)]
pub struct RelayApi {
    http: reqwest::Client,
    addr: String,
}

impl RelayApi {
    /// `addr` is `host:port`, as given to the server
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            addr: addr.into(),
        }
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Users currently online in `room_code`
    pub async fn online_users(&self, room_code: &RoomCode) -> Result<Vec<DirectoryEntry>, ClientError> {
        let users = self
            .http
            .get(self.http_url(&format!("/online-users/{}", room_code)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(users)
    }

    /// Room history, oldest first
    pub async fn history(&self, room_code: &RoomCode) -> Result<Vec<ChatEvent>, ClientError> {
        let events = self
            .http
            .get(self.http_url(&format!("/chat/{}", room_code)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(events)
    }

    /// Ask the server whether `username` is free in `room_code`
    pub async fn is_username_available(
        &self,
        room_code: &RoomCode,
        username: &Username,
    ) -> Result<bool, ClientError> {
        let answer: UsernameValidity = self
            .http
            .post(self.http_url(&format!("/valid-username/{}", room_code)))
            .json(&UsernameCheck {
                username: username.to_string(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(answer.valid)
    }

    /// WebSocket endpoint for joining `room_code` as `username`
    pub fn ws_url(
        &self,
        username: &Username,
        room_code: &RoomCode,
        color: i32,
    ) -> Result<Url, ClientError> {
        let mut url = Url::parse(&format!("ws://{}/ws", self.addr))
            .map_err(|e| ClientError::InvalidAddress(format!("{}: {}", self.addr, e)))?;
        url.query_pairs_mut()
            .append_pair("username", username.as_str())
            .append_pair("room", room_code.as_str())
            .append_pair("color", &color.to_string());
        Ok(url)
    }
}

/// Check a username locally, then against the server.
///
/// The server answer is a point-in-time check; registration itself is
/// what finally decides.
pub async fn validate_username(
    api: &RelayApi,
    room_code: &RoomCode,
    name: &str,
) -> Result<Username, ClientError> {
    let username = Username::parse(name)?;
    if !api.is_username_available(room_code, &username).await? {
        return Err(ValidationError::UsernameTaken.into());
    }
    Ok(username)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url_escapes_query() {
        let api = RelayApi::new("localhost:5000");
        let url = api
            .ws_url(
                &Username::parse("a&b=c").unwrap(),
                &RoomCode::parse("alpha").unwrap(),
                -3,
            )
            .unwrap();
        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.path(), "/ws");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("username".to_string(), "a&b=c".to_string()),
                ("room".to_string(), "alpha".to_string()),
                ("color".to_string(), "-3".to_string()),
            ]
        );
    }

    #[test]
    fn test_ws_url_rejects_bad_address() {
        let api = RelayApi::new("not a host");
        let result = api.ws_url(
            &Username::parse("a").unwrap(),
            &RoomCode::parse("alpha").unwrap(),
            0,
        );
        assert!(matches!(result, Err(ClientError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_validate_username_fails_locally_first() {
        // unreachable address: the local check must fail before any request
        let api = RelayApi::new("127.0.0.1:1");
        let room = RoomCode::parse("alpha").unwrap();
        assert!(matches!(
            validate_username(&api, &room, "two words").await,
            Err(ClientError::Validation(_))
        ));
        assert!(matches!(
            validate_username(&api, &room, "").await,
            Err(ClientError::Validation(_))
        ));
    }
}
