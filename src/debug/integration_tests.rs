// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Broker and stream wired together the way a server connection uses them.

use crate::debug::{pump_events, DebugEvent, EventBroker, NodeStatus, HEARTBEAT_FRAME};
use crate::errors::StreamError;
use crate::traits::WriterSink;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

async fn wait_for_subscribers<E: crate::traits::BrokerEvent>(broker: &EventBroker<E>, count: usize) {
    for _ in 0..200 {
        if broker.subscriber_count() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("subscriber count never reached {count}");
}

fn next_list(task_id: i64) -> DebugEvent {
    DebugEvent::NodeNextList {
        task_id,
        name: "Main".to_string(),
        next_list: vec!["Battle".to_string(), "Home".to_string()],
        status: NodeStatus::Starting,
    }
}

#[tokio::test]
async fn test_pump_forwards_hello_and_events_then_cancels() {
    let broker = EventBroker::<DebugEvent>::unbounded();
    let (mut tx, mut rx) = mpsc::channel::<String>(16);
    let cancel = CancellationToken::new();

    let pump = {
        let broker = broker.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { pump_events(&broker, &mut tx, Duration::from_secs(5), cancel).await })
    };

    let hello = rx.recv().await.unwrap();
    assert!(hello.starts_with("data: {\"type\":\"hello\",\"timestamp\":"));
    wait_for_subscribers(&broker, 1).await;

    broker.publish(&next_list(1));
    let frame = rx.recv().await.unwrap();
    let payload: Value = serde_json::from_str(frame.trim_start_matches("data: ").trim_end()).unwrap();
    assert_eq!(payload["type"], "node_next_list");
    assert_eq!(payload["task_id"], 1);

    cancel.cancel();
    let sent = pump.await.unwrap().unwrap();
    assert_eq!(sent, 2);
    assert_eq!(broker.subscriber_count(), 0);
}

#[tokio::test]
async fn test_pump_emits_heartbeats_when_idle() {
    let broker = EventBroker::<Value>::unbounded();
    let (mut tx, mut rx) = mpsc::channel::<String>(16);
    let cancel = CancellationToken::new();

    let pump = {
        let broker = broker.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { pump_events(&broker, &mut tx, Duration::from_millis(10), cancel).await })
    };

    rx.recv().await.unwrap();
    assert_eq!(rx.recv().await.unwrap(), HEARTBEAT_FRAME);

    cancel.cancel();
    pump.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_pump_releases_subscription_when_client_disconnects() {
    let broker = EventBroker::<DebugEvent>::unbounded();
    let (mut tx, rx) = mpsc::channel::<String>(16);
    drop(rx);

    let result = pump_events(&broker, &mut tx, Duration::from_secs(5), CancellationToken::new()).await;

    assert!(matches!(result, Err(StreamError::SinkClosed)));
    assert_eq!(broker.subscriber_count(), 0);
}

#[tokio::test]
async fn test_two_streams_see_the_same_events() {
    let broker = EventBroker::<DebugEvent>::bounded(8);
    let cancel = CancellationToken::new();
    let mut sinks = Vec::new();
    let mut pumps = Vec::new();

    for _ in 0..2 {
        let (mut tx, rx) = mpsc::channel::<String>(16);
        sinks.push(rx);
        let broker = broker.clone();
        let cancel = cancel.clone();
        pumps.push(tokio::spawn(async move {
            pump_events(&broker, &mut tx, Duration::from_secs(5), cancel).await
        }));
    }
    wait_for_subscribers(&broker, 2).await;

    assert_eq!(broker.publish(&next_list(9)), 2);
    for rx in &mut sinks {
        rx.recv().await.unwrap();
        let frame = rx.recv().await.unwrap();
        assert!(frame.contains("\"task_id\":9"));
    }

    cancel.cancel();
    for pump in pumps {
        pump.await.unwrap().unwrap();
    }
    assert_eq!(broker.subscriber_count(), 0);
}

#[tokio::test]
async fn test_writer_sink_receives_sse_text() {
    let broker = EventBroker::<DebugEvent>::unbounded();
    let (client, server) = tokio::io::duplex(4096);

    let pump = {
        let broker = broker.clone();
        tokio::spawn(async move {
            let mut sink = WriterSink::new(server);
            pump_events(&broker, &mut sink, Duration::from_secs(5), CancellationToken::new()).await
        })
    };
    wait_for_subscribers(&broker, 1).await;
    broker.publish(&next_list(3));
    broker.close();
    pump.await.unwrap().unwrap();

    let mut text = String::new();
    let mut client = client;
    tokio::io::AsyncReadExt::read_to_string(&mut client, &mut text).await.unwrap();
    let frames: Vec<&str> = text.split_terminator("\n\n").collect();
    assert_eq!(frames.len(), 2);
    assert!(frames[1].contains("\"type\":\"node_next_list\""));
}

#[tokio::test]
async fn test_close_flushes_every_published_event() {
    let broker = EventBroker::<DebugEvent>::unbounded();

    let pump = {
        let broker = broker.clone();
        tokio::spawn(async move {
            let mut sink = WriterSink::new(Vec::<u8>::new());
            let sent = pump_events(&broker, &mut sink, Duration::from_secs(5), CancellationToken::new()).await;
            sent.map(|sent| (sent, sink.into_inner()))
        })
    };
    wait_for_subscribers(&broker, 1).await;

    for task_id in 1..=3 {
        assert_eq!(broker.publish(&next_list(task_id)), 1);
    }
    assert_eq!(broker.close(), 1);

    let (sent, written) = pump.await.unwrap().unwrap();
    assert_eq!(sent, 4);
    let text = String::from_utf8(written).unwrap();
    let frames: Vec<&str> = text.split_terminator("\n\n").collect();
    assert_eq!(frames.len(), 4);
    for (frame, task_id) in frames[1..].iter().zip(1..=3) {
        assert!(frame.contains(&format!("\"task_id\":{task_id}")));
    }
    assert_eq!(broker.subscriber_count(), 0);
}
