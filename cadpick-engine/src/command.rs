use std::collections::HashMap;

use cadpick_core::document::Document;
use tracing::info;

use crate::editor::Editor;
use crate::pick_report::PickReportCommand;
use crate::transaction::TransactionManager;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    /// 成功但没有需要汇报的内容，例如用户取消了选择。
    pub fn silent() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

/// 单次命令调用期间借出的宿主服务。文档只读借用。
pub struct CommandContext<'a> {
    pub document: &'a Document,
    pub editor: &'a mut dyn Editor,
    pub transactions: &'a TransactionManager,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(PickReportCommand);
        bus
    }

    /// 注册命令；命令名应为大写，重复注册时后者覆盖前者。
    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    /// 按名称分发命令，名称不区分大小写。
    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let key = request.name.trim().to_ascii_uppercase();
        if let Some(handler) = self.handlers.get(key.as_str()) {
            info!(command = handler.name(), "执行命令");
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("Unknown command \"{}\".", request.name.trim()))
        }
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers
            .contains_key(name.trim().to_ascii_uppercase().as_str())
    }

    /// 已注册命令名，按字母排序。
    pub fn available_commands(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}
