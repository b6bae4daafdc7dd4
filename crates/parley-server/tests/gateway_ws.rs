//! End-to-end gateway behavior over a real client WebSocket, with all
//! backend services faked on unix sockets.

mod support;

use parley_types::{Frame, Turn};
use std::sync::atomic::Ordering;
use std::time::Duration;
use support::*;

#[tokio::test]
async fn voice_input_becomes_a_spoken_answered_reply() {
    let dir = tempfile::tempdir().unwrap();
    spawn_fake_transcribe(dir.path());
    spawn_fake_synthesize(dir.path());
    let generation_calls = spawn_fake_generation(dir.path());

    let state = test_state(dir.path());
    let addr = spawn_gateway(state.clone()).await;
    let mut client = connect_client(addr).await;
    settle().await;

    send_frame(&mut client, &Frame::VoiceInput(vec![1, 2, 3, 4])).await;

    // The recognized text, the generated reply, and the synthesized
    // audio all come back as broadcasts. Generation and synthesis may
    // arrive in either order.
    let (mut transcription, mut generation, mut synthesis) = (None, None, None);
    while transcription.is_none() || generation.is_none() || synthesis.is_none() {
        match next_frame(&mut client).await {
            Frame::TranscriptionResult(text) => transcription = Some(text),
            Frame::GenerationResult(text) => generation = Some(text),
            Frame::SynthesisResult(audio) => synthesis = Some(audio),
            other => panic!("unexpected client-bound frame: {other:?}"),
        }
    }
    assert_eq!(transcription.as_deref(), Some("heard:4"));
    assert_eq!(generation.as_deref(), Some("ok"));
    assert_eq!(synthesis.as_deref(), Some(b"pcm:ok".as_slice()));

    // The transcript ends up answered, and the answered turn stops the
    // reply loop from generating again.
    assert_eq!(state.history.get(), vec![Turn::new("heard:4", "ok")]);
    tokio::time::sleep(FAST * 3).await;
    assert_eq!(generation_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transcriptions_are_broadcast_to_every_session() {
    let dir = tempfile::tempdir().unwrap();
    spawn_fake_transcribe(dir.path());
    spawn_fake_synthesize(dir.path());
    // No generation service: pending turns stay pending, which keeps
    // this test about the broadcast path only.

    let state = test_state(dir.path());
    let addr = spawn_gateway(state.clone()).await;
    let mut speaker = connect_client(addr).await;
    let mut listener = connect_client(addr).await;
    settle().await;

    send_frame(&mut speaker, &Frame::VoiceInput(vec![0u8; 7])).await;

    assert_eq!(
        next_frame(&mut speaker).await,
        Frame::TranscriptionResult("heard:7".to_string())
    );
    assert_eq!(
        next_frame(&mut listener).await,
        Frame::TranscriptionResult("heard:7".to_string())
    );
}

#[tokio::test]
async fn junk_frames_are_ignored_without_effect() {
    let dir = tempfile::tempdir().unwrap();
    spawn_fake_transcribe(dir.path());
    spawn_fake_synthesize(dir.path());

    let state = test_state(dir.path());
    let addr = spawn_gateway(state.clone()).await;
    let mut client = connect_client(addr).await;
    settle().await;

    send_frame(&mut client, &Frame::VoiceInput(vec![9, 9])).await;

    // An unknown tag, an empty frame, and a gateway-bound kind a client
    // has no business sending: all dropped silently.
    let junk = [
        vec![0xff, 1, 2, 3],
        Vec::new(),
        Frame::GenerationResult("spoofed".to_string()).encode(),
    ];
    for bytes in junk {
        use futures_util::SinkExt;
        client
            .send(tokio_tungstenite::tungstenite::Message::Binary(bytes.into()))
            .await
            .unwrap();
    }

    // The session is still healthy: real voice input still flows.
    assert_eq!(
        next_frame(&mut client).await,
        Frame::TranscriptionResult("heard:2".to_string())
    );
    send_frame(&mut client, &Frame::VoiceInput(vec![5, 5, 5])).await;
    assert_eq!(
        next_frame(&mut client).await,
        Frame::TranscriptionResult("heard:3".to_string())
    );

    // Junk mutated nothing: the transcript holds only recognized text.
    assert_eq!(state.history.get(), vec![Turn::pending("heard:2heard:3")]);
}

#[tokio::test]
async fn disconnect_releases_the_session() {
    let dir = tempfile::tempdir().unwrap();
    spawn_fake_transcribe(dir.path());
    spawn_fake_synthesize(dir.path());

    let state = test_state(dir.path());
    let addr = spawn_gateway(state.clone()).await;

    let mut client = connect_client(addr).await;
    tokio::time::timeout(WAIT, async {
        while state.registry.len().await != 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("session never registered");

    use futures_util::SinkExt;
    client.close(None).await.unwrap();

    tokio::time::timeout(WAIT, async {
        while !state.registry.is_empty().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("session never left the registry");
}
