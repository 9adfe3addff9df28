//! 标题解析器：按重命名请求查找元素、应用标题并按需守护

use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

use super::guard::TitleGuard;
use crate::dom::{Document, Element};
use crate::error::{RulinameError, RulinameResult};
use crate::message::{RenameRequest, RenameResponse};
use crate::rule::RenameDefinition;
use crate::utils::preview_compact;

/// 解析器所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Idle,
    Polling,
    Resolved,
    Exhausted,
    Guarding,
}

/// 每个页面一个解析器，新请求会取代上一个请求的守护
pub struct TitleResolver<D: Document> {
    document: D,
    phase: Mutex<ResolverState>,
    guard: Mutex<Option<TitleGuard>>,
}

impl<D: Document> TitleResolver<D> {
    pub fn new(document: D) -> Self {
        Self {
            document,
            phase: Mutex::new(ResolverState::Idle),
            guard: Mutex::new(None),
        }
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn state(&self) -> ResolverState {
        let guarding = self
            .guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(TitleGuard::is_active);
        if guarding {
            return ResolverState::Guarding;
        }
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 当前守护已恢复标题的次数，没有守护时为 `None`
    pub fn guard_corrections(&self) -> Option<u32> {
        self.guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(TitleGuard::corrections)
    }

    /// 查找标题来源元素
    /// 立即尝试一次，未命中则每隔 `interval` 重试，每次失败消耗一次 `attempts`，
    /// 耗尽后返回 `NotFound`。固定标题不查询页面，也不消耗次数
    pub async fn resolve_element(&self, request: &mut RenameRequest) -> RulinameResult<Element> {
        let definition = request.definition()?;
        self.set_phase(ResolverState::Polling);

        let outcome = self.poll(&definition, request).await;
        self.set_phase(match outcome {
            Ok(_) => ResolverState::Resolved,
            Err(_) => ResolverState::Exhausted,
        });
        outcome
    }

    async fn poll(&self, definition: &RenameDefinition, request: &mut RenameRequest) -> RulinameResult<Element> {
        if let Some(element) = self.lookup(definition)? {
            return Ok(element);
        }

        while request.attempts > 0 {
            tokio::time::sleep(request.interval()).await;
            if let Some(element) = self.lookup(definition)? {
                return Ok(element);
            }
            request.attempts -= 1;
            debug!("未找到元素 {}，剩余尝试次数：{}", definition.value(), request.attempts);
        }

        Err(RulinameError::NotFound)
    }

    fn lookup(&self, definition: &RenameDefinition) -> RulinameResult<Option<Element>> {
        match definition {
            RenameDefinition::Fixed(value) => Ok(Some(Element::container(value.as_str()))),
            RenameDefinition::ElementId(id) => Ok(self.document.element_by_id(id)),
            RenameDefinition::ClassId(class) => Ok(self.document.element_by_class_attr(class)),
            RenameDefinition::CustomQuery(selector) => self.document.query_selector(selector),
        }
    }

    /// 把元素的渲染文本写为页面标题，返回写入的标题
    pub fn apply_title(&self, element: &Element) -> String {
        let title = element.text_content();
        self.document.set_title(&title);
        info!("标题已应用：{}", preview_compact(&title, 80));
        title
    }

    /// 请求要求观察标题时启动守护，取代已有的守护
    /// 守护任务通过 `tokio::spawn` 启动，必须在 tokio 运行时内调用
    pub fn maybe_guard(&self, request: &RenameRequest, applied_title: String) {
        let mut guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
        if !request.observe_title_changes {
            return;
        }

        *guard = Some(TitleGuard::spawn(
            self.document.clone(),
            applied_title,
            request.max_title_renaming,
        ));
    }

    /// 停止守护，回到空闲状态（页面导航离开时调用）
    pub fn teardown(&self) {
        self.stop_guard();
        self.set_phase(ResolverState::Idle);
    }

    /// 处理一个重命名请求，无论成功与否都只产生一个回复
    pub async fn handle(&self, mut request: RenameRequest) -> RenameResponse {
        self.stop_guard();

        match self.resolve_element(&mut request).await {
            Ok(element) => {
                let title = self.apply_title(&element);
                self.maybe_guard(&request, title);
                RenameResponse::success()
            }
            Err(e) => {
                warn!("重命名失败：{}", e);
                RenameResponse::failure(e.to_string())
            }
        }
    }

    fn stop_guard(&self) {
        if let Some(guard) = self.guard.lock().unwrap_or_else(PoisonError::into_inner).take() {
            guard.stop();
        }
    }

    fn set_phase(&self, state: ResolverState) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}
