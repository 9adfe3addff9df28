//! 页面端入口：发送就绪信号、接收重命名请求并交给标题解析器
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::dom::Document;
use crate::message::{BackgroundMessage, RenameReceiver, RenameRequest, RenameResponse};
use crate::resolver::TitleResolver;

pub struct ContentScript<D: Document> {
    resolver: TitleResolver<D>,
}

impl<D: Document> ContentScript<D> {
    pub fn new(document: D) -> Self {
        Self {
            resolver: TitleResolver::new(document),
        }
    }

    pub fn resolver(&self) -> &TitleResolver<D> {
        &self.resolver
    }

    /// 页面加载后发往后台的就绪信号
    pub fn ready_signal() -> Value {
        BackgroundMessage::ReadyToReceiveRenameRequest.to_json()
    }

    /// 处理一条未类型化的消息，无法识别的消息直接回复失败
    pub async fn on_message(&self, message: &Value) -> RenameResponse {
        match RenameRequest::parse(message) {
            Some(request) => self.resolver.handle(request).await,
            None => {
                let kind = message.get("type").cloned().unwrap_or_default();
                warn!("不支持的消息类型：{}", kind);
                RenameResponse::failure("Unsupported message type")
            }
        }
    }

    /// 依次处理通道中的请求，直到后台断开
    pub async fn serve(&self, mut receiver: RenameReceiver) {
        info!("页面端开始接收重命名请求");
        while let Some(envelope) = receiver.recv().await {
            let response = self.resolver.handle(envelope.request.clone()).await;
            if !envelope.respond(response) {
                debug!("后台已放弃等待回复");
            }
        }
        self.resolver.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::PageDocument;
    use crate::message::{ResolutionResult, channel, READY_TO_RECEIVE_RENAME_REQUEST};
    use serde_json::json;

    const PAGE: &str = "<html><head><title>Old</title></head><body><p id=\"headline\">News</p></body></html>";

    #[test]
    fn test_ready_signal() {
        assert_eq!(
            ContentScript::<PageDocument>::ready_signal(),
            json!({ "type": READY_TO_RECEIVE_RENAME_REQUEST })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_message() {
        let script = ContentScript::new(PageDocument::parse(PAGE));

        let response = script
            .on_message(&json!({ "type": "element_id", "value": "headline", "observeTitleChanges": false }))
            .await;
        assert!(response.is_success());
        assert_eq!(script.resolver().document().title(), "News");

        let response = script.on_message(&json!({ "type": "UnsupportedType", "value": "x" })).await;
        assert_eq!(response.result, ResolutionResult::Failure);
        assert_eq!(response.message.as_deref(), Some("Unsupported message type"));

        // 没有 type 字段的载荷同样回复失败
        let response = script.on_message(&json!("element_id")).await;
        assert_eq!(response.result, ResolutionResult::Failure);
        assert_eq!(script.resolver().document().title(), "News");
    }

    #[tokio::test(start_paused = true)]
    async fn test_serve_replies_once_per_request() {
        let document = PageDocument::parse(PAGE);
        let (client, receiver) = channel();
        let server = tokio::spawn(async move {
            let script = ContentScript::new(document);
            script.serve(receiver).await;
        });

        let ok = client
            .send(RenameRequest::parse(&json!({ "type": "fixed", "value": "Pinned" })).unwrap())
            .await
            .unwrap();
        assert!(ok.is_success());

        let missing = client
            .send(RenameRequest::parse(&json!({ "type": "class_id", "value": "none", "attempts": 1, "interval": 10 })).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.message.as_deref(), Some("Element not found within timeout period"));

        drop(client);
        server.await.unwrap();
    }
}
