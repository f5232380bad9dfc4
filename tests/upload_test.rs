//! Upload API integration tests.

mod common;

use common::{count_entries, is_generated_name, test_payload, video_form, TestServer};
use reqwest::multipart;
use serde_json::Value;

#[tokio::test]
async fn test_index_reports_running() {
    let server = TestServer::start_upload().await;

    let response = server
        .client()
        .get(server.url("/"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Video host server is running.");
}

#[tokio::test]
async fn test_upload_round_trip() {
    let server = TestServer::start_upload().await;
    let client = server.client();

    let data = test_payload(10 * 1024 * 1024);

    let response = client
        .post(server.url("/upload"))
        .multipart(video_form(data.clone(), "My Clip #1.MOV", "video/mp4"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.expect("Failed to parse JSON");

    let filename = json["filename"].as_str().unwrap();
    let (timestamp, rest) = filename.split_once('_').unwrap();
    assert!(timestamp.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(rest, "My_Clip__1.MOV");
    assert!(is_generated_name(filename));

    assert_eq!(json["size"], 10 * 1024 * 1024);
    assert_eq!(
        json["url"].as_str().unwrap(),
        server.url(&format!("/uploads/{}", filename))
    );

    // Fetch it back
    let served = client
        .get(json["url"].as_str().unwrap())
        .send()
        .await
        .expect("Failed to fetch");

    assert_eq!(served.status(), 200);
    let body = served.bytes().await.unwrap();
    assert_eq!(body.len(), data.len());
    assert!(body.as_ref() == data.as_slice());
}

#[tokio::test]
async fn test_upload_invalid_file_type() {
    let server = TestServer::start_upload().await;

    let response = server
        .client()
        .post(server.url("/upload"))
        .multipart(video_form(b"not a video".to_vec(), "notes.txt", "text/plain"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 415);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["code"], "invalid_file_type");

    assert_eq!(count_entries(&server.upload_dir()), 0);
    assert_eq!(count_entries(&server.temp_dir()), 0);
}

#[tokio::test]
async fn test_upload_accepts_every_allowed_type() {
    let server = TestServer::start_upload().await;
    let client = server.client();

    for (mime, name) in [
        ("video/mp4", "a.mp4"),
        ("video/webm", "b.webm"),
        ("video/ogg", "c.ogg"),
        ("video/quicktime", "d.mov"),
        ("video/x-matroska", "e.mkv"),
    ] {
        let response = client
            .post(server.url("/upload"))
            .multipart(video_form(test_payload(64), name, mime))
            .send()
            .await
            .expect("Failed to send request");

        assert_eq!(response.status(), 200, "{} rejected", mime);
    }

    assert_eq!(count_entries(&server.upload_dir()), 5);
}

#[tokio::test]
async fn test_upload_without_file() {
    let server = TestServer::start_upload().await;

    let form = multipart::Form::new().text("title", "no video here");

    let response = server
        .client()
        .post(server.url("/upload"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["error"], "No file uploaded");
}

#[tokio::test]
async fn test_upload_wrong_field_name() {
    let server = TestServer::start_upload().await;

    let form = multipart::Form::new().part(
        "file",
        multipart::Part::bytes(test_payload(16))
            .file_name("clip.mp4")
            .mime_str("video/mp4")
            .unwrap(),
    );

    let response = server
        .client()
        .post(server.url("/upload"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    assert_eq!(count_entries(&server.upload_dir()), 0);
}

#[tokio::test]
async fn test_upload_size_boundary() {
    let server = TestServer::start_upload_with(|config| {
        config.upload.max_upload_size = 4096;
    })
    .await;
    let client = server.client();

    // Exactly at the ceiling
    let response = client
        .post(server.url("/upload"))
        .multipart(video_form(test_payload(4096), "fits.mp4", "video/mp4"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["size"], 4096);

    // One byte over
    let response = client
        .post(server.url("/upload"))
        .multipart(video_form(test_payload(4097), "too-big.mp4", "video/mp4"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 413);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["code"], "file_too_large");

    // Only the accepted file was published, nothing left in staging
    assert_eq!(count_entries(&server.upload_dir()), 1);
    assert_eq!(count_entries(&server.temp_dir()), 0);
}

#[tokio::test]
async fn test_upload_far_over_limit_is_json() {
    let server = TestServer::start_upload_with(|config| {
        config.upload.max_upload_size = 4096;
    })
    .await;

    // Declared length exceeds the body limit, so this is refused before
    // the handler runs
    let response = server
        .client()
        .post(server.url("/upload"))
        .multipart(video_form(
            test_payload(2 * 1024 * 1024),
            "huge.mp4",
            "video/mp4",
        ))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 413);
    let json: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["code"], "file_too_large");
    assert_eq!(json["status"], 413);

    assert_eq!(count_entries(&server.upload_dir()), 0);
    assert_eq!(count_entries(&server.temp_dir()), 0);
}

#[tokio::test]
async fn test_upload_uses_configured_base_url() {
    let server = TestServer::start_upload_with(|config| {
        config.server.public_base_url = Some("https://videos.example.com".to_string());
    })
    .await;

    let response = server
        .client()
        .post(server.url("/upload"))
        .multipart(video_form(test_payload(32), "clip.webm", "video/webm"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    let filename = json["filename"].as_str().unwrap();

    assert_eq!(
        json["url"].as_str().unwrap(),
        format!("https://videos.example.com/uploads/{}", filename)
    );
}

#[tokio::test]
async fn test_upload_name_without_extension_gets_mp4() {
    let server = TestServer::start_upload().await;

    let response = server
        .client()
        .post(server.url("/upload"))
        .multipart(video_form(test_payload(32), "recording", "video/webm"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    let filename = json["filename"].as_str().unwrap();

    assert!(filename.ends_with("_recording.mp4"), "got {}", filename);
}

#[tokio::test]
async fn test_upload_traversal_name_stays_in_upload_dir() {
    let server = TestServer::start_upload().await;

    let response = server
        .client()
        .post(server.url("/upload"))
        .multipart(video_form(test_payload(32), "../../escape.mp4", "video/mp4"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    let filename = json["filename"].as_str().unwrap();

    assert!(is_generated_name(filename));
    assert!(server.upload_dir().join(filename).is_file());
    assert!(!server.data_dir.path().join("escape.mp4").exists());
}
