//! Mock Provider Tests
//!
//! Tests using mockall for the Provider trait to verify
//! that the trait can be mocked and that `generate` sits on top of `chat`.

use async_trait::async_trait;
use mockall::mock;
use reactant_provider::{ChatParams, ChatResponse, Message, Provider, ProviderError};

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

#[tokio::test]
async fn test_mock_provider_chat_returns_success() {
    let mut mock = MockProvider::new();

    mock.expect_chat()
        .times(1)
        .returning(|_| Ok(ChatResponse::text("Hello from mock!")));

    let response = mock.chat(ChatParams::default()).await.unwrap();
    assert_eq!(response.content, Some("Hello from mock!".to_string()));
}

#[tokio::test]
async fn test_mock_provider_generate_uses_chat() {
    let mut mock = MockProvider::new();

    mock.expect_chat()
        .times(1)
        .withf(|params| params.messages.len() == 2 && params.messages[0].role == "system")
        .returning(|_| Ok(ChatResponse::text("Thought: hi\nAction: Finish[hi]")));

    let params = ChatParams {
        model: "test-model".to_string(),
        messages: vec![Message::system("rules"), Message::user("hi")],
        ..Default::default()
    };

    let text = mock.generate(params).await.unwrap();
    assert!(text.contains("Finish[hi]"));
}

#[tokio::test]
async fn test_mock_provider_generate_propagates_error() {
    let mut mock = MockProvider::new();

    mock.expect_chat().times(1).returning(|_| {
        Err(ProviderError::Api {
            status: 500,
            message: "overloaded".to_string(),
        })
    });

    let result = mock.generate(ChatParams::default()).await;
    match result {
        Err(ProviderError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "overloaded");
        }
        _ => panic!("Expected Api error"),
    }
}

#[tokio::test]
async fn test_mock_provider_multiple_calls() {
    let mut mock = MockProvider::new();

    mock.expect_chat().times(3).returning(|params| {
        let content = params
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(ChatResponse::text(format!("Echo: {}", content)))
    });

    for i in 0..3 {
        let params = ChatParams {
            messages: vec![Message::user(format!("Message {}", i))],
            ..Default::default()
        };
        let text = mock.generate(params).await.unwrap();
        assert_eq!(text, format!("Echo: Message {}", i));
    }
}

#[test]
fn test_mock_provider_metadata() {
    let mut mock = MockProvider::new();

    mock.expect_default_model()
        .returning(|| "mock-model-v1".to_string());
    mock.expect_is_configured().returning(|| true);

    assert_eq!(mock.default_model(), "mock-model-v1");
    assert!(mock.is_configured());
}

#[test]
fn test_mock_provider_blank_reply_is_empty_response() {
    let mut mock = MockProvider::new();

    mock.expect_chat()
        .times(1)
        .returning(|_| Ok(ChatResponse::text("  \n ")));

    let result = tokio_test::block_on(mock.generate(ChatParams::default()));
    assert!(matches!(result, Err(ProviderError::EmptyResponse)));
}
