use serde_json::{json, Value};
use std::time::Duration;
use tycoon_web::server::{ServerConfig, WebServer};
use warp::hyper::{self, Body, Client as HyperClient, Request};

type HttpClient = HyperClient<hyper::client::HttpConnector>;

async fn post_json(client: &HttpClient, uri: &str, body: Value) -> (hyper::StatusCode, Value) {
    let uri: hyper::Uri = uri.parse().expect("parse uri");
    let request = Request::builder()
        .method(hyper::Method::POST)
        .uri(uri)
        .header(hyper::header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");

    let response = client.request(request).await.expect("issue request");
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body())
        .await
        .expect("read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse json body")
    };
    (status, value)
}

async fn get_json(client: &HttpClient, uri: &str) -> (hyper::StatusCode, Value) {
    let uri: hyper::Uri = uri.parse().expect("parse uri");
    let response = client.get(uri).await.expect("issue request");
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body())
        .await
        .expect("read body");
    let value = serde_json::from_slice(&bytes).expect("parse json body");
    (status, value)
}

fn current_player(room: &Value) -> Value {
    let turn = room["currentTurn"].as_u64().expect("currentTurn") as usize;
    room["players"][turn].clone()
}

#[tokio::test]
async fn room_api_lifecycle() {
    let server = WebServer::new(ServerConfig::for_tests());
    let handle = server.start().await.expect("start server");
    let address = handle.address();
    let client = HyperClient::new();

    tokio::time::sleep(Duration::from_millis(20)).await;

    // Create a room.
    let (status, created) = post_json(
        &client,
        &format!("http://{address}/api/rooms"),
        json!({ "playerName": "Alice" }),
    )
    .await;
    assert_eq!(status, hyper::StatusCode::CREATED);
    let room_id = created["roomId"].as_str().expect("roomId").to_string();
    assert_eq!(room_id.len(), 6);
    let alice = created["playerId"].as_str().expect("playerId").to_string();

    // It shows up in the lobby listing, without any hands.
    let (status, lobby) = get_json(&client, &format!("http://{address}/api/rooms")).await;
    assert_eq!(status, hyper::StatusCode::OK);
    let rooms = lobby.as_array().expect("array");
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["id"], room_id.as_str());
    assert_eq!(rooms[0]["phase"], "waiting");
    assert_eq!(rooms[0]["playerCount"], 1);
    assert!(rooms[0].get("players").is_none());

    // Three more players join.
    let mut player_ids = vec![alice.clone()];
    for name in ["Bob", "Carol", "Dave"] {
        let (status, joined) = post_json(
            &client,
            &format!("http://{address}/api/rooms/{room_id}/join"),
            json!({ "playerName": name }),
        )
        .await;
        assert_eq!(status, hyper::StatusCode::OK, "{name} joins");
        player_ids.push(joined["playerId"].as_str().expect("playerId").to_string());
    }

    // A fifth seat does not exist.
    let (status, error) = post_json(
        &client,
        &format!("http://{address}/api/rooms/{room_id}/join"),
        json!({ "playerName": "Eve" }),
    )
    .await;
    assert_eq!(status, hyper::StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "room_full");

    // Start deals thirteen cards each.
    let (status, room) = post_json(
        &client,
        &format!("http://{address}/api/rooms/{room_id}/start"),
        Value::Null,
    )
    .await;
    assert_eq!(status, hyper::StatusCode::OK);
    assert_eq!(room["phase"], "playing");
    let players = room["players"].as_array().expect("players");
    assert_eq!(players.len(), 4);
    for player in players {
        assert_eq!(player["cardsRemaining"], 13);
        assert_eq!(player["hand"].as_array().expect("hand").len(), 13);
    }

    // The opener holds the lowest card; hands come back sorted.
    let opener = current_player(&room);
    let opener_id = opener["id"].as_str().expect("id").to_string();
    let lowest = opener["hand"][0].clone();
    assert_eq!(lowest["value"], 3);

    // Nobody else may move first.
    let bystander = player_ids
        .iter()
        .find(|id| **id != opener_id)
        .expect("three others");
    let (status, error) = post_json(
        &client,
        &format!("http://{address}/api/rooms/{room_id}/pass"),
        json!({ "playerId": bystander }),
    )
    .await;
    assert_eq!(status, hyper::StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "not_your_turn");

    // A card the opener does not hold is rejected.
    let (status, error) = post_json(
        &client,
        &format!("http://{address}/api/rooms/{room_id}/play"),
        json!({ "playerId": opener_id, "cardIds": ["no-such-card"] }),
    )
    .await;
    assert_eq!(status, hyper::StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "invalid_play");

    // The opening play is accepted and recorded.
    let (status, room) = post_json(
        &client,
        &format!("http://{address}/api/rooms/{room_id}/play"),
        json!({ "playerId": opener_id, "cardIds": [lowest["id"]] }),
    )
    .await;
    assert_eq!(status, hyper::StatusCode::OK);
    assert_eq!(room["playArea"].as_array().expect("playArea").len(), 1);
    assert_eq!(room["lastPlay"]["cards"][0]["value"], 3);
    assert_eq!(room["currentRoundWinner"], opener_id.as_str());

    // The next player passes.
    let next_id = current_player(&room)["id"]
        .as_str()
        .expect("id")
        .to_string();
    assert_ne!(next_id, opener_id);
    let (status, room) = post_json(
        &client,
        &format!("http://{address}/api/rooms/{room_id}/pass"),
        json!({ "playerId": next_id }),
    )
    .await;
    assert_eq!(status, hyper::StatusCode::OK);
    assert!(room["passedPlayers"]
        .as_array()
        .expect("passedPlayers")
        .iter()
        .any(|id| id == next_id.as_str()));

    // Snapshots poll cleanly.
    let (status, room) = get_json(&client, &format!("http://{address}/api/rooms/{room_id}")).await;
    assert_eq!(status, hyper::StatusCode::OK);
    assert_eq!(room["phase"], "playing");
    assert_eq!(room["roundNumber"], 1);

    // A departing player frees nothing until the room empties.
    let (status, _) = post_json(
        &client,
        &format!("http://{address}/api/rooms/{room_id}/leave"),
        json!({ "playerId": player_ids[3] }),
    )
    .await;
    assert_eq!(status, hyper::StatusCode::NO_CONTENT);
    let (status, _) = get_json(&client, &format!("http://{address}/api/rooms/{room_id}")).await;
    assert_eq!(status, hyper::StatusCode::OK);

    tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
        .await
        .expect("shutdown timed out")
        .expect("shutdown failed");
}

#[tokio::test]
async fn unknown_rooms_return_not_found() {
    let server = WebServer::new(ServerConfig::for_tests());
    let handle = server.start().await.expect("start server");
    let address = handle.address();
    let client = HyperClient::new();

    tokio::time::sleep(Duration::from_millis(20)).await;

    let (status, error) = get_json(&client, &format!("http://{address}/api/rooms/NOSUCH")).await;
    assert_eq!(status, hyper::StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "room_not_found");
    assert_eq!(error["details"]["roomId"], "NOSUCH");

    let (status, error) = post_json(
        &client,
        &format!("http://{address}/api/rooms/NOSUCH/join"),
        json!({ "playerName": "Bob" }),
    )
    .await;
    assert_eq!(status, hyper::StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "room_not_found");

    let (status, health) = get_json(&client, &format!("http://{address}/health")).await;
    assert_eq!(status, hyper::StatusCode::OK);
    assert_eq!(health["status"], "ok");

    tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
        .await
        .expect("shutdown timed out")
        .expect("shutdown failed");
}
