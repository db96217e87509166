use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use multimodal_main::{
    attachment::{Attachment, AttachmentPolicy},
    chat::{BusyFlag, RequestBuilder, EMPTY_RESPONSE_APOLOGY},
    conversation::DEFAULT_GREETING,
    models::{Part, Request, Response, Role},
    ChatError, ChatSession, ContentGenerator, Message, Reply, SendOutcome,
};
use serde_json::json;

/// Answers every request with a fixed outcome and records what it was sent.
#[derive(Clone, Default)]
struct FakeModel {
    requests: Arc<Mutex<Vec<Request>>>,
    calls: Arc<AtomicUsize>,
    busy_seen: Arc<Mutex<Vec<bool>>>,
    busy: Arc<OnceLock<BusyFlag>>,
    outcome: Outcome,
}

#[derive(Clone, Default)]
enum Outcome {
    #[default]
    Echo,
    Text(&'static str),
    Empty,
    Fail(&'static str),
}

impl FakeModel {
    fn answering(outcome: Outcome) -> Self {
        Self {
            outcome,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> Request {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

fn text_response(text: &str) -> Response {
    serde_json::from_value(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    }))
    .unwrap()
}

#[async_trait]
impl ContentGenerator for FakeModel {
    async fn generate(&self, request: &Request) -> Result<Response, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(busy) = self.busy.get() {
            self.busy_seen.lock().unwrap().push(busy.is_busy());
        }

        match self.outcome {
            Outcome::Echo => {
                let turn = request.contents.len();
                Ok(text_response(&format!("reply {turn}")))
            }
            Outcome::Text(text) => Ok(text_response(text)),
            Outcome::Empty => Ok(serde_json::from_value(json!({ "candidates": [] })).unwrap()),
            Outcome::Fail(message) => Err(ChatError::new(message)),
        }
    }
}

fn session(model: &FakeModel) -> ChatSession<FakeModel> {
    let session = ChatSession::with_parts(
        model.clone(),
        RequestBuilder::new("You are a test persona."),
        AttachmentPolicy::default(),
    );
    model.busy.set(session.busy()).ok();
    session
}

fn image(name: &str, bytes: &[u8]) -> Attachment {
    Attachment::from_bytes(name, "image/png", bytes, &AttachmentPolicy::default()).unwrap()
}

#[tokio::test]
async fn empty_input_is_a_no_op() {
    let model = FakeModel::default();
    let mut chat = session(&model);

    assert_eq!(chat.send("").await, SendOutcome::Ignored);
    assert_eq!(chat.send("   \n\t").await, SendOutcome::Ignored);

    assert_eq!(chat.conversation().len(), 1);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn successful_reply_is_appended_once() {
    let model = FakeModel::answering(Outcome::Text("X"));
    let mut chat = session(&model);

    let outcome = chat.send("  hello  ").await;

    assert_eq!(outcome, SendOutcome::Replied(Reply::Text("X".into())));
    let messages = chat.conversation().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1], Message::user(vec![Part::text("hello")]));
    assert_eq!(messages[2], Message::model_text("X"));
    assert!(chat.error().is_none());
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn failure_is_appended_as_model_message_and_clears_busy() {
    let model = FakeModel::answering(Outcome::Fail("Y: upstream unavailable"));
    let mut chat = session(&model);

    let outcome = chat.send("hello").await;

    assert!(matches!(outcome, SendOutcome::Replied(reply) if reply.is_failure()));
    assert_eq!(chat.conversation().len(), 3);
    let last = chat.conversation().last().unwrap();
    assert_eq!(last.role(), Role::Model);
    assert!(last.text().contains("Y: upstream unavailable"));
    assert!(last.text().starts_with("Error: "));
    assert!(chat.error().unwrap().contains("Y: upstream unavailable"));
    assert!(!chat.is_busy());
}

#[tokio::test]
async fn empty_reply_falls_back_to_apology() {
    let model = FakeModel::answering(Outcome::Empty);
    let mut chat = session(&model);

    chat.send("hello").await;

    assert_eq!(
        chat.conversation().last().unwrap(),
        &Message::model_text(EMPTY_RESPONSE_APOLOGY)
    );
    assert!(chat.error().is_none());
}

#[tokio::test]
async fn busy_flag_is_set_only_during_the_call() {
    let model = FakeModel::default();
    let mut chat = session(&model);

    assert!(!chat.is_busy());
    chat.send("one").await;
    chat.send("two").await;

    assert_eq!(*model.busy_seen.lock().unwrap(), vec![true, true]);
    assert!(!chat.is_busy());
}

#[tokio::test]
async fn send_while_busy_does_nothing() {
    let model = FakeModel::default();
    let mut chat = session(&model);
    let busy = chat.busy();
    let guard = busy.acquire().unwrap();

    assert_eq!(chat.send("hello").await, SendOutcome::Busy);
    assert!(!chat.can_send("hello"));
    assert_eq!(chat.conversation().len(), 1);
    assert_eq!(model.calls(), 0);

    drop(guard);
    assert!(matches!(chat.send("hello").await, SendOutcome::Replied(_)));
}

#[tokio::test]
async fn greeting_is_never_sent_and_history_grows_by_one_turn() {
    let model = FakeModel::default();
    let mut chat = session(&model);

    for turn in 0..4 {
        let history_len = chat.conversation().len();
        chat.send(&format!("question {turn}")).await;

        let request = model.last_request();
        assert_eq!(request.contents.len(), history_len - 1 + 1);
        assert_eq!(request.contents[0].role, Some(Role::User));
        assert!(request
            .contents
            .iter()
            .flat_map(|content| &content.parts)
            .all(|part| part.as_text() != Some(DEFAULT_GREETING)));
        let instruction = request.system_instruction.unwrap();
        assert_eq!(instruction.role, None);
        assert_eq!(instruction.parts, vec![Part::text("You are a test persona.")]);
    }
}

#[tokio::test]
async fn image_goes_before_text_and_is_consumed() {
    let model = FakeModel::default();
    let mut chat = session(&model);

    chat.attach(image("cat.png", b"cat pixels"));
    assert_eq!(chat.previews().live(), 1);
    chat.send("what is this?").await;

    let request = model.last_request();
    let parts = &request.contents.last().unwrap().parts;
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0], image("cat.png", b"cat pixels").to_part());
    assert_eq!(parts[1].as_text(), Some("what is this?"));
    assert!(chat.pending_attachment().is_none());
    assert_eq!(chat.previews().live(), 0);

    chat.send("and now?").await;
    let request = model.last_request();
    assert!(!request.contents.last().unwrap().parts[0].is_inline_data());
}

#[tokio::test]
async fn image_alone_can_be_sent() {
    let model = FakeModel::default();
    let mut chat = session(&model);

    chat.attach(image("cat.png", b"cat pixels"));
    assert!(chat.can_send(""));
    chat.send("").await;

    let binding = model.last_request();
    let parts = &binding.contents.last().unwrap().parts;
    assert_eq!(parts.len(), 1);
    assert!(parts[0].is_inline_data());
}

#[tokio::test]
async fn removed_attachment_is_never_sent() {
    let model = FakeModel::default();
    let mut chat = session(&model);

    chat.attach(image("first.png", b"first"));
    chat.attach(image("second.png", b"second"));
    assert_eq!(chat.previews().live(), 1);
    assert!(chat.remove_attachment());
    assert_eq!(chat.previews().live(), 0);

    assert_eq!(chat.send("").await, SendOutcome::Ignored);
    chat.send("text only").await;

    let requests = model.requests.lock().unwrap();
    assert!(requests
        .iter()
        .flat_map(|request| &request.contents)
        .flat_map(|content| &content.parts)
        .all(|part| !part.is_inline_data()));
}

#[tokio::test]
async fn attached_file_round_trips_to_the_request() {
    let bytes: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
    let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
    file.write_all(&bytes).unwrap();

    let model = FakeModel::default();
    let mut chat = session(&model);
    let label = chat.attach_file(file.path()).await.unwrap().label().to_string();
    assert!(label.contains("image/jpeg"));

    chat.send("describe").await;

    let request = model.last_request();
    let Part::InlineData { inline_data } = &request.contents.last().unwrap().parts[0] else {
        panic!("expected the image first");
    };
    assert_eq!(inline_data.mime_type, "image/jpeg");
    let sent = Attachment::from_bytes("x.jpg", "image/jpeg", &bytes, &AttachmentPolicy::default())
        .unwrap();
    assert_eq!(inline_data.data, sent.data());
    assert_eq!(sent.decode().unwrap(), bytes);
}

#[tokio::test]
async fn failed_attach_keeps_previous_attachment() {
    let model = FakeModel::default();
    let mut chat = session(&model);
    chat.attach(image("keep.png", b"keep"));

    let err = chat.attach_file("/no/such/file.png").await.unwrap_err();

    assert!(matches!(err, ChatError::Attachment(_)));
    assert_eq!(chat.pending_attachment().unwrap().name(), "keep.png");
    assert_eq!(chat.previews().live(), 1);
}

#[tokio::test]
async fn roles_alternate_in_the_conversation() {
    let model = FakeModel::default();
    let mut chat = session(&model);

    chat.send("a").await;
    chat.send("b").await;

    let roles: Vec<_> = chat
        .conversation()
        .messages()
        .iter()
        .map(Message::role)
        .collect();
    assert_eq!(
        roles,
        [Role::Model, Role::User, Role::Model, Role::User, Role::Model]
    );
}
