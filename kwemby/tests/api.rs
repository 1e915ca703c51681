use kwemby::{ApiOptions, DeviceInfo, EmbyClient, EmbyError};
use kwsession::{
    AuthInfo, ClientError, MediaItem, MediaServerClient, ServerIdentity, SessionSnapshot,
    SessionState,
};
use mockito::{Matcher, Server};
use serde_json::json;

fn options() -> ApiOptions {
    ApiOptions {
        device: DeviceInfo {
            client: "Emby Web".into(),
            device: "Test".into(),
            device_id: "dev-1".into(),
            version: "4.8.0".into(),
        },
        ..ApiOptions::default()
    }
}

fn auth() -> AuthInfo {
    AuthInfo {
        token: "tok-123".into(),
        user_id: "u1".into(),
        user_name: Some("alice".into()),
    }
}

fn snapshot(endpoint: &str, position: u64) -> SessionSnapshot {
    SessionSnapshot {
        server: "emby".into(),
        endpoint: endpoint.into(),
        session_token: "play-abc".into(),
        auth: auth(),
        media: MediaItem {
            id: "42".into(),
            name: "Movie".into(),
            runtime_seconds: 6000,
        },
        position,
        state: SessionState::Playing,
    }
}

#[tokio::test]
async fn authenticate_sends_credentials_and_device() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/Users/AuthenticateByName")
        .match_header(
            "X-Emby-Authorization",
            Matcher::Regex(r#"Client="Emby Web".*DeviceId="dev-1""#.into()),
        )
        .match_body(Matcher::Json(json!({"Username": "alice", "Pw": "secret"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"AccessToken":"tok-123","User":{"Id":"u1","Name":"alice"}}"#)
        .create_async()
        .await;

    let client = EmbyClient::new(&server.url(), options())?;
    let identity = ServerIdentity::new(server.url(), "alice", "secret");
    let info = client.authenticate(&identity).await?;

    mock.assert_async().await;
    assert_eq!(info, auth());
    Ok(())
}

#[tokio::test]
async fn rejected_login_is_unauthorized() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/Users/AuthenticateByName")
        .with_status(401)
        .with_body("Invalid username or password")
        .create_async()
        .await;

    let client = EmbyClient::new(&server.url(), options())?;
    let identity = ServerIdentity::new(server.url(), "alice", "wrong");
    let err = client.authenticate(&identity).await.unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized(_)));
    Ok(())
}

#[tokio::test]
async fn list_items_queries_movies_with_token() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/Users/u1/Items")
        .match_header("X-MediaBrowser-Token", "tok-123")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("Recursive".into(), "true".into()),
            Matcher::UrlEncoded("IncludeItemTypes".into(), "Movie".into()),
            Matcher::UrlEncoded("Limit".into(), "50".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "Items": [
                    {"Id": "a", "Name": "Known", "RunTimeTicks": 54_000_000_000u64},
                    {"Id": "b", "Name": "Unknown length"}
                ],
                "TotalRecordCount": 2
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = EmbyClient::new(&server.url(), options())?;
    let items = client.list_items(&auth()).await?;

    mock.assert_async().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].runtime_seconds, 5400);
    assert_eq!(items[1].runtime_seconds, 7200);
    assert_eq!(items[1].name, "Unknown length");
    Ok(())
}

#[tokio::test]
async fn malformed_listing_is_decode_error() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/Users/u1/Items")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let client = EmbyClient::new(&server.url(), options())?;
    let err = client.list_items(&auth()).await.unwrap_err();

    assert!(matches!(err, ClientError::Decode(_)));
    Ok(())
}

#[tokio::test]
async fn playback_reports_carry_session_and_position() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let start = server
        .mock("POST", "/Sessions/Playing")
        .match_header("X-MediaBrowser-Token", "tok-123")
        .match_body(Matcher::PartialJson(json!({
            "ItemId": "42",
            "PlaySessionId": "play-abc",
            "PlayMethod": "DirectPlay",
            "PositionTicks": 0
        })))
        .with_status(204)
        .create_async()
        .await;
    let progress = server
        .mock("POST", "/Sessions/Playing/Progress")
        .match_body(Matcher::PartialJson(json!({
            "PlaySessionId": "play-abc",
            "PositionTicks": 450_000_000u64,
            "IsPaused": true
        })))
        .with_status(204)
        .create_async()
        .await;
    let stop = server
        .mock("POST", "/Sessions/Playing/Stopped")
        .match_body(Matcher::PartialJson(json!({
            "PositionTicks": 450_000_000u64,
            "Failed": false,
            "NextMediaType": "Video"
        })))
        .with_status(204)
        .create_async()
        .await;
    let user_data = server
        .mock("POST", "/Users/u1/Items/42/UserData")
        .match_body(Matcher::PartialJson(json!({
            "PlaybackPositionTicks": 450_000_000u64
        })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let client = EmbyClient::new(&server.url(), options())?;
    let session = snapshot(&server.url(), 45);

    client.push_playback_start(&session).await?;
    client.push_progress(&session, true).await?;
    client.push_stop(&session).await?;
    client.push_user_data_position(&session).await?;

    start.assert_async().await;
    progress.assert_async().await;
    stop.assert_async().await;
    user_data.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn server_error_maps_to_status() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/Sessions/Playing/Progress")
        .with_status(500)
        .create_async()
        .await;

    let client = EmbyClient::new(&server.url(), options())?;
    let err = client
        .push_progress(&snapshot(&server.url(), 60), false)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Status { code: 500, .. }));
    Ok(())
}

#[tokio::test]
async fn resume_position_is_read_from_user_data() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/Users/u1/Items/42")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "Id": "42",
                "Name": "Movie",
                "UserData": {"PlaybackPositionTicks": 450_000_000u64, "Played": false}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = EmbyClient::new(&server.url(), options())?;
    let position = client
        .fetch_resume_position(&snapshot(&server.url(), 45))
        .await?;

    assert_eq!(position, 45);
    Ok(())
}

#[tokio::test]
async fn missing_item_is_not_found() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/Users/u1/Items/404")
        .with_status(404)
        .create_async()
        .await;

    let client = EmbyClient::new(&server.url(), options())?;
    let err = client.api().item(&auth(), "404").await.unwrap_err();

    assert!(matches!(err, EmbyError::NotFound(_)));
    Ok(())
}
