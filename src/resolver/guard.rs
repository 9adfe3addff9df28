//! 标题守护：标题被页面脚本改写后恢复为已应用的标题，恢复次数有上限

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::dom::{Document, TitleObserver};

/// 运行中的守护任务，丢弃即停止
#[derive(Debug)]
pub struct TitleGuard {
    task: JoinHandle<()>,
    corrections: Arc<AtomicU32>,
}

impl TitleGuard {
    /// 安装观察者并启动守护，必须在 tokio 运行时内调用
    /// 观察者在返回前已安装，此后的任何改写都会被看到
    pub fn spawn<D: Document>(document: D, applied_title: String, max_title_renaming: u32) -> Self {
        let observer = document.observe_title();
        let corrections = Arc::new(AtomicU32::new(0));
        let task = tokio::spawn(watch(
            document,
            observer,
            applied_title,
            max_title_renaming,
            Arc::clone(&corrections),
        ));

        Self { task, corrections }
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// 已恢复标题的次数
    pub fn corrections(&self) -> u32 {
        self.corrections.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for TitleGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn watch<D: Document>(
    document: D,
    mut observer: TitleObserver,
    applied_title: String,
    mut remaining: u32,
    corrections: Arc<AtomicU32>,
) {
    while observer.changed().await.is_some() {
        // 以当前标题为准，连续多次改写只需恢复一次
        if document.title() == applied_title {
            continue;
        }

        if remaining == 0 {
            info!("标题恢复次数已用完，停止守护，保留页面标题：{}", document.title());
            break;
        }

        remaining -= 1;
        let count = corrections.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("标题被改写，第{}次恢复，剩余{}次", count, remaining);
        document.set_title(&applied_title);
    }
}
