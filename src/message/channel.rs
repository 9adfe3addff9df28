//! 请求/响应通道：每个请求对应一个一次性回复（oneshot），保证恰好回复一次

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::{RenameRequest, RenameResponse};
use crate::error::{RulinameError, RulinameResult};

/// 页面端收到的请求信封，`respond` 消耗自身，只能回复一次
#[derive(Debug)]
pub struct RenameEnvelope {
    pub request: RenameRequest,
    responder: oneshot::Sender<RenameResponse>,
}

impl RenameEnvelope {
    /// 回复请求，发起方已放弃等待时返回 `false`
    pub fn respond(self, response: RenameResponse) -> bool {
        self.responder.send(response).is_ok()
    }
}

/// 后台端：发送请求并等待回复
#[derive(Debug, Clone)]
pub struct RenameClient {
    tx: mpsc::UnboundedSender<RenameEnvelope>,
}

impl RenameClient {
    pub async fn send(&self, request: RenameRequest) -> RulinameResult<RenameResponse> {
        let (responder, reply) = oneshot::channel();
        self.tx
            .send(RenameEnvelope { request, responder })
            .map_err(|_| RulinameError::ChannelClosed("页面端已断开".to_string()))?;

        reply
            .await
            .map_err(|_| RulinameError::ChannelClosed("页面端未回复即丢弃了请求".to_string()))
    }
}

/// 页面端：按到达顺序接收请求
#[derive(Debug)]
pub struct RenameReceiver {
    rx: mpsc::UnboundedReceiver<RenameEnvelope>,
}

impl RenameReceiver {
    pub async fn recv(&mut self) -> Option<RenameEnvelope> {
        let envelope = self.rx.recv().await;
        if envelope.is_none() {
            debug!("请求通道已关闭");
        }
        envelope
    }
}

pub fn channel() -> (RenameClient, RenameReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RenameClient { tx }, RenameReceiver { rx })
}
