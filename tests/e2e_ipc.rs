use orch_e2e_tests::setup;
use orch_engine::domain::{ChannelType, DomainError, EndpointId, IpcMessage, MessageKind};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn ping(from: &str, to: &str) -> IpcMessage {
    IpcMessage::new(MessageKind::Custom("ping".to_string()), from, to, json!({ "n": 1 }))
}

#[tokio::test]
async fn test_e2e_message_without_channel_is_rejected_then_delivered_once() {
    let env = setup();
    let ipc = env.registry.ipc();

    let err = ipc.send_message(ping("renderer-a", "gpu")).unwrap_err();
    assert!(matches!(err, DomainError::NoChannel { .. }));

    let channel = ipc.create_channel(
        "renderer-gpu",
        ChannelType::Data,
        [EndpointId::new("renderer-a"), EndpointId::new("gpu")],
    );
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = delivered.clone();
    let _subscription = ipc
        .subscribe(&channel.id, move |message| {
            assert_eq!(message.payload["n"], 1);
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    assert_eq!(ipc.send_message(ping("renderer-a", "gpu")).unwrap(), 1);
    assert_eq!(delivered.load(Ordering::SeqCst), 1);

    // Routing is symmetric
    assert_eq!(ipc.send_message(ping("gpu", "renderer-a")).unwrap(), 1);
    assert_eq!(delivered.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_e2e_request_reply_round_trip() {
    let env = setup();
    let ipc = env.registry.ipc().clone();

    let channel = ipc.create_channel(
        "main-ai",
        ChannelType::Ai,
        [EndpointId::main(), EndpointId::new("ai-worker")],
    );
    assert!(channel.secure);

    let (_subscription, mut inbox) = ipc.subscribe_queue(&channel.id).unwrap();
    let responder = ipc.clone();
    let worker = tokio::spawn(async move {
        while let Some(message) = inbox.recv().await {
            if message.requires_response {
                let answer = json!({ "summary": format!("{} chars", message.payload["text"]) });
                responder
                    .reply(&message, MessageKind::Reply, answer)
                    .unwrap();
                break;
            }
        }
    });

    let request = IpcMessage::new(
        MessageKind::Custom("summarize".to_string()),
        EndpointId::main(),
        "ai-worker",
        json!({ "text": "hello" }),
    );
    let request_id = request.id;
    let reply = ipc
        .request(request, Some(Duration::from_secs(2)))
        .await
        .unwrap();

    assert_eq!(reply.kind, MessageKind::Reply);
    assert_eq!(reply.correlation_id, Some(request_id));
    assert_eq!(reply.to, EndpointId::main());
    assert_eq!(ipc.pending_requests(), 0);
    worker.await.unwrap();
}

#[tokio::test]
async fn test_e2e_request_times_out_without_responder() {
    let env = setup();
    let ipc = env.registry.ipc();
    ipc.create_channel(
        "main-net",
        ChannelType::Control,
        [EndpointId::main(), EndpointId::new("network")],
    );

    let err = ipc
        .request(
            IpcMessage::new(MessageKind::Trim, EndpointId::main(), "network", json!({})),
            Some(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::IpcTimeout { timeout_ms: 50, .. }));
    assert_eq!(ipc.pending_requests(), 0);
}

#[tokio::test]
async fn test_e2e_destroyed_channel_stops_routing() {
    let env = setup();
    let ipc = env.registry.ipc();
    let channel = ipc.create_channel(
        "a-b",
        ChannelType::Data,
        [EndpointId::new("a"), EndpointId::new("b")],
    );
    let subscription = ipc.subscribe(&channel.id, |_| {}).unwrap();
    assert_eq!(ipc.subscriber_count(&channel.id).unwrap(), 1);

    ipc.destroy_channel(&channel.id).unwrap();

    assert!(ipc.get_channel(&channel.id).is_none());
    assert!(!subscription.unsubscribe());
    assert!(matches!(
        ipc.send_message(ping("a", "b")),
        Err(DomainError::NoChannel { .. })
    ));
}

#[tokio::test]
async fn test_e2e_tab_suspension_is_signalled_on_control_channel() {
    let env = setup();
    let tab = env.open_tab("https://docs.example").await;
    let process = env
        .processes()
        .get_process_info(&tab.process_id())
        .await
        .unwrap();

    let ipc = env.registry.ipc();
    let (_subscription, mut inbox) = ipc.subscribe_queue(&process.control_channel_id()).unwrap();

    assert!(env.orchestrator().suspend_tab(&tab.id()).await.unwrap());

    let mut kinds = Vec::new();
    while let Ok(message) = inbox.try_recv() {
        assert_eq!(message.from, EndpointId::main());
        assert_eq!(message.to, EndpointId::from(tab.process_id()));
        kinds.push(message.kind);
    }
    assert!(kinds.contains(&MessageKind::Suspend));
}
