use weft::prelude::*;
use weft::timeline::StreamItemKind;
use weft_types::{AskUserOption, AskUserRequest, AskUserResponse};

fn client() -> WorkflowClient {
    WorkflowClient::new("http://localhost:8000")
}

fn events_snapshot() -> Vec<AgentEvent> {
    vec![
        AgentEvent::AgentStart {
            agent: Some("writer_agent".to_string()),
            content: String::new(),
            timestamp: 10,
            conversation_id: Some(1),
        },
        AgentEvent::Message {
            agent: Some("writer_agent".to_string()),
            content: "标题: 历史\n标签: #旧".to_string(),
            timestamp: 20,
        },
        AgentEvent::AgentEnd {
            agent: Some("writer_agent".to_string()),
            content: String::new(),
            timestamp: 30,
        },
    ]
}

fn ask_request() -> AskUserRequest {
    AskUserRequest {
        question: "继续吗?".to_string(),
        options: vec![AskUserOption {
            id: "approve".to_string(),
            label: "继续".to_string(),
            ..Default::default()
        }],
        thread_id: "t-7".to_string(),
        ..Default::default()
    }
}

#[test]
fn test_history_with_unanswered_ask_reopens_dialog() {
    let mut assistant = ChatMessage::assistant("写到一半");
    assistant.events = Some(events_snapshot());
    assistant.ask_user = Some(ask_request());
    let messages = vec![ChatMessage::user("写一篇"), assistant];

    let conversation = Conversation::from_history(client(), messages);
    assert!(conversation.dialog().is_open);
    assert_eq!(conversation.dialog().thread_id, "t-7");
    assert_eq!(conversation.hitl_phase(), HitlPhase::AwaitingUser);
    assert!(!conversation.is_streaming());
}

#[test]
fn test_history_with_answered_ask_stays_closed() {
    let mut assistant = ChatMessage::assistant("写到一半");
    assistant.events = Some(events_snapshot());
    assistant.ask_user = Some(ask_request());

    let mut context = serde_json::Map::new();
    context.insert("threadId".to_string(), serde_json::json!("t-7"));
    let answer = ChatMessage::ask_answer(AskUserResponse {
        selected_ids: vec!["approve".to_string()],
        selected_labels: vec!["继续".to_string()],
        custom_input: None,
        context: Some(context),
    });

    let conversation =
        Conversation::from_history(client(), vec![ChatMessage::user("写一篇"), assistant, answer]);
    assert!(!conversation.dialog().is_open);
    assert_eq!(conversation.hitl_phase(), HitlPhase::Idle);
}

#[test]
fn test_timeline_rebuilds_from_history_snapshot() {
    let mut assistant = ChatMessage::assistant("标题: 历史");
    assistant.events = Some(events_snapshot());
    let conversation =
        Conversation::from_history(client(), vec![ChatMessage::user("写一篇"), assistant]);

    let timeline = conversation.timeline();
    assert!(timeline.has_outputs);
    let group = &timeline.current_stage.groups[0];
    assert_eq!(group.agent_key, "writer_agent");
    assert_eq!(group.items[0].kind, StreamItemKind::Content);
    assert_eq!(group.items[0].payload["title"], serde_json::json!("历史"));
}

#[test]
fn test_dismiss_leaves_run_paused_and_phase_idle() {
    let mut assistant = ChatMessage::assistant("写到一半");
    assistant.events = Some(events_snapshot());
    assistant.ask_user = Some(ask_request());
    let mut conversation =
        Conversation::from_history(client(), vec![ChatMessage::user("写一篇"), assistant]);

    conversation.dismiss();
    assert!(!conversation.dialog().is_open);
    assert_eq!(conversation.hitl_phase(), HitlPhase::Idle);
}
