//! Integration tests for pmonowplaying

use pmonowplaying::{
    Error, IcyStreamSource, LivePageSource, MetadataResolver, NowPlaying, NowPlayingSource,
    ResolverWorker, ScheduleSource, WorkerCommand, UNKNOWN_ARTIST,
};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const METAINT: usize = 16;

/// Build an ICY wire body: audio payload, length byte, padded metadata block
fn icy_body(metadata: &str, trailing_audio: usize) -> Vec<u8> {
    let mut block = metadata.as_bytes().to_vec();
    let units = block.len().div_ceil(16);
    block.resize(units * 16, 0);

    let mut body = vec![0xAA; METAINT];
    body.push(units as u8);
    body.extend_from_slice(&block);
    body.extend(vec![0xBB; trailing_audio]);
    body
}

fn schedule_json(title: &str, artist: Option<&str>) -> serde_json::Value {
    let mut item = json!({ "title": title });
    if let Some(artist) = artist {
        item["artist"] = json!(artist);
    }
    json!({
        "schedule": [
            { "title": "Some earlier show" },
            { "nowOnAirItem": item }
        ]
    })
}

#[tokio::test]
async fn icy_source_decodes_in_band_metadata() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stream.mp3"))
        .and(header("Icy-MetaData", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("icy-metaint", METAINT.to_string().as_str())
                .set_body_bytes(icy_body("StreamTitle='Song A';StreamUrl='Artist A';", 0)),
        )
        .mount(&mock_server)
        .await;

    let mut source =
        IcyStreamSource::new(reqwest::Client::new(), format!("{}/stream.mp3", mock_server.uri()))
            .unwrap();

    let now = source.attempt().await.unwrap().unwrap();
    assert_eq!(now, NowPlaying::new("Song A", "Artist A"));
}

#[tokio::test]
async fn icy_source_without_metaint_goes_quiet_without_reconnecting() {
    let mock_server = MockServer::start().await;

    // A stream with no icy-metaint header never carries in-band metadata;
    // the source must not reconnect on every tick.
    Mock::given(method("GET"))
        .and(path("/stream.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xAA; 64]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut source =
        IcyStreamSource::new(reqwest::Client::new(), format!("{}/stream.mp3", mock_server.uri()))
            .unwrap();

    assert!(source.attempt().await.unwrap().is_none());
    assert!(source.attempt().await.unwrap().is_none());
    assert!(source.attempt().await.unwrap().is_none());
}

#[tokio::test]
async fn icy_source_reconnects_after_a_truncated_stream() {
    let mock_server = MockServer::start().await;

    // Body ends right after one metadata block: the second attempt hits EOF
    // mid-payload, the third one gets a fresh connection.
    Mock::given(method("GET"))
        .and(path("/stream.mp3"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("icy-metaint", METAINT.to_string().as_str())
                .set_body_bytes(icy_body("StreamTitle='Song A';", 4)),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut source =
        IcyStreamSource::new(reqwest::Client::new(), format!("{}/stream.mp3", mock_server.uri()))
            .unwrap();

    assert_eq!(source.attempt().await.unwrap().unwrap().title, "Song A");
    assert!(matches!(
        source.attempt().await.unwrap_err(),
        Error::Connection(_)
    ));
    assert_eq!(source.attempt().await.unwrap().unwrap().title, "Song A");
}

#[tokio::test]
async fn schedule_source_extracts_the_on_air_entry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/channels/live"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(schedule_json("Song B", Some("Artist B"))),
        )
        .mount(&mock_server)
        .await;

    let mut source =
        ScheduleSource::new(reqwest::Client::new(), format!("{}/channels/live", mock_server.uri()))
            .unwrap();

    let now = source.attempt().await.unwrap().unwrap();
    assert_eq!(now, NowPlaying::new("Song B", "Artist B"));
}

#[tokio::test]
async fn schedule_source_defaults_a_missing_artist() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/channels/live"))
        .respond_with(ResponseTemplate::new(200).set_body_json(schedule_json("Song B", None)))
        .mount(&mock_server)
        .await;

    let mut source =
        ScheduleSource::new(reqwest::Client::new(), format!("{}/channels/live", mock_server.uri()))
            .unwrap();

    let now = source.attempt().await.unwrap().unwrap();
    assert_eq!(now, NowPlaying::new("Song B", UNKNOWN_ARTIST));
}

#[tokio::test]
async fn schedule_source_reports_absence_without_an_on_air_entry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/channels/live"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "schedule": [{ "title": "x" }] })),
        )
        .mount(&mock_server)
        .await;

    let mut source =
        ScheduleSource::new(reqwest::Client::new(), format!("{}/channels/live", mock_server.uri()))
            .unwrap();

    assert!(source.attempt().await.unwrap().is_none());
}

#[tokio::test]
async fn schedule_source_fails_on_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/channels/live"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let mut source =
        ScheduleSource::new(reqwest::Client::new(), format!("{}/channels/live", mock_server.uri()))
            .unwrap();

    assert!(matches!(
        source.attempt().await.unwrap_err(),
        Error::ApiError(_)
    ));
}

#[tokio::test]
async fn page_source_scrapes_the_two_selectors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/live"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                 <span class="main-title">Song C</span>
                 <span class="sub-title">Artist C</span>
               </body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    let mut source =
        LivePageSource::new(reqwest::Client::new(), format!("{}/live", mock_server.uri())).unwrap();

    let now = source.attempt().await.unwrap().unwrap();
    assert_eq!(now, NowPlaying::new("Song C", "Artist C"));
}

#[tokio::test]
async fn stream_source_outranks_the_schedule_api() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stream.mp3"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("icy-metaint", METAINT.to_string().as_str())
                .set_body_bytes(icy_body("StreamTitle='From Stream';", 0)),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/channels/live"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(schedule_json("From Schedule", Some("Artist"))),
        )
        .mount(&mock_server)
        .await;

    let client = reqwest::Client::new();
    let mut resolver = MetadataResolver::new(vec![
        Box::new(
            IcyStreamSource::new(client.clone(), format!("{}/stream.mp3", mock_server.uri()))
                .unwrap(),
        ),
        Box::new(
            ScheduleSource::new(client, format!("{}/channels/live", mock_server.uri())).unwrap(),
        ),
    ]);

    let event = resolver.resolve().await.unwrap();
    assert_eq!(event.current.title, "From Stream");
}

#[tokio::test]
async fn worker_polls_deduplicates_and_shuts_down() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/channels/live"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(schedule_json("Song A", Some("Artist A"))),
        )
        .mount(&mock_server)
        .await;

    let source =
        ScheduleSource::new(reqwest::Client::new(), format!("{}/channels/live", mock_server.uri()))
            .unwrap();
    let resolver = MetadataResolver::new(vec![Box::new(source)]);

    let (events_tx, mut events_rx) = mpsc::channel(8);
    let (worker, commands) =
        ResolverWorker::spawn(resolver, Duration::from_millis(20), events_tx);

    let event = tokio::time::timeout(Duration::from_secs(5), events_rx.recv())
        .await
        .expect("timed out waiting for first change event")
        .expect("worker dropped the event channel");
    assert_eq!(event.previous, None);
    assert_eq!(event.current, NowPlaying::new("Song A", "Artist A"));

    // The same value keeps resolving; no further events may arrive
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(events_rx.try_recv().is_err());

    commands.send(WorkerCommand::Shutdown).await.unwrap();
    worker.wait().await.unwrap();
}

#[tokio::test]
async fn refresh_command_triggers_an_immediate_cycle() {
    let mock_server = MockServer::start().await;

    // First poll sees Song A, every later one sees Song B
    Mock::given(method("GET"))
        .and(path("/channels/live"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(schedule_json("Song A", Some("Artist A"))),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/channels/live"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(schedule_json("Song B", Some("Artist B"))),
        )
        .mount(&mock_server)
        .await;

    let source =
        ScheduleSource::new(reqwest::Client::new(), format!("{}/channels/live", mock_server.uri()))
            .unwrap();
    let resolver = MetadataResolver::new(vec![Box::new(source)]);

    let (events_tx, mut events_rx) = mpsc::channel(8);
    // Cadence far beyond the test duration: only the startup tick and the
    // explicit refresh can resolve
    let (worker, commands) =
        ResolverWorker::spawn(resolver, Duration::from_secs(3600), events_tx);

    let first = tokio::time::timeout(Duration::from_secs(5), events_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.current, NowPlaying::new("Song A", "Artist A"));

    commands.send(WorkerCommand::Refresh).await.unwrap();
    let second = tokio::time::timeout(Duration::from_secs(5), events_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.previous, Some(NowPlaying::new("Song A", "Artist A")));
    assert_eq!(second.current, NowPlaying::new("Song B", "Artist B"));

    commands.send(WorkerCommand::Shutdown).await.unwrap();
    worker.wait().await.unwrap();
}
