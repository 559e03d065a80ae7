use std::io::{BufRead, Write};

use cadpick_engine::command::{CommandBus, CommandContext, CommandRequest, CommandResponse};
use cadpick_engine::transaction::TransactionManager;
use tracing::{info, warn};

use crate::console::ConsoleEditor;
use crate::errors::FrontendError;
use crate::loader::{DocumentSource, LoadedDocument};

/// 一次会话的统计。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub commands_run: usize,
    pub failures: usize,
}

/// 文档概览：来源、可用命令以及每个实体一行。
pub fn describe_document(loaded: &LoadedDocument, bus: &CommandBus) -> Vec<String> {
    let mut lines = Vec::new();
    match &loaded.source {
        DocumentSource::Dxf(path) => lines.push(format!("Drawing: {}", path.display())),
        DocumentSource::Demo => lines.push("Drawing: built-in demo".to_string()),
    }
    lines.push(format!("Commands: {}", bus.available_commands().join(", ")));
    for (id, entity) in loaded.document.entities() {
        lines.push(format!(
            "  #{} {} [{}]",
            id.get(),
            entity.class_name(),
            entity.layer_name()
        ));
    }
    lines
}

/// 交互式命令循环。`QUIT`、`EXIT` 或输入结束时退出。
pub fn run_session<R: BufRead, W: Write>(
    loaded: &LoadedDocument,
    bus: &CommandBus,
    editor: &mut ConsoleEditor<R, W>,
) -> Result<SessionSummary, FrontendError> {
    let document = &loaded.document;
    info!(
        entities = document.entities().count(),
        layers = document.layers().count(),
        "控制台会话开始"
    );
    for line in describe_document(loaded, bus) {
        editor.write_line(&line)?;
    }

    let transactions = TransactionManager::new();
    let mut summary = SessionSummary::default();
    while let Some(input) = editor.read_command()? {
        let Some(request) = parse_request(&input) else {
            continue;
        };
        if matches!(request.name.to_ascii_uppercase().as_str(), "QUIT" | "EXIT") {
            break;
        }
        let response = dispatch(bus, &request, loaded, editor, &transactions);
        summary.commands_run += 1;
        if !response.success {
            summary.failures += 1;
        }
        report(editor, &request, &response)?;
    }
    editor.end_line()?;

    if transactions.active_count() > 0 {
        warn!(active = transactions.active_count(), "会话结束时仍有未结束的事务");
    }
    info!(
        commands = summary.commands_run,
        failures = summary.failures,
        "控制台会话结束"
    );
    Ok(summary)
}

/// 只执行一条命令，失败时返回错误。
pub fn run_single_command<R: BufRead, W: Write>(
    loaded: &LoadedDocument,
    bus: &CommandBus,
    editor: &mut ConsoleEditor<R, W>,
    command: &str,
) -> Result<(), FrontendError> {
    let request = parse_request(command)
        .ok_or_else(|| FrontendError::CommandFailed("empty command".to_string()))?;
    let transactions = TransactionManager::new();
    let response = dispatch(bus, &request, loaded, editor, &transactions);
    report(editor, &request, &response)?;
    editor.end_line()?;
    if response.success {
        Ok(())
    } else {
        Err(FrontendError::CommandFailed(
            response.message.unwrap_or_else(|| request.name.clone()),
        ))
    }
}

fn parse_request(input: &str) -> Option<CommandRequest> {
    let mut parts = input.split_whitespace();
    let name = parts.next()?;
    Some(CommandRequest {
        name: name.to_string(),
        args: parts.map(str::to_string).collect(),
    })
}

fn dispatch<R: BufRead, W: Write>(
    bus: &CommandBus,
    request: &CommandRequest,
    loaded: &LoadedDocument,
    editor: &mut ConsoleEditor<R, W>,
    transactions: &TransactionManager,
) -> CommandResponse {
    let mut context = CommandContext {
        document: &loaded.document,
        editor,
        transactions,
    };
    bus.dispatch(request, &mut context)
}

fn report<R: BufRead, W: Write>(
    editor: &mut ConsoleEditor<R, W>,
    request: &CommandRequest,
    response: &CommandResponse,
) -> Result<(), FrontendError> {
    match (&response.message, response.success) {
        (Some(message), true) => {
            editor.write_line(&format!("[{}] {message}", request.name.to_ascii_uppercase()))?
        }
        (Some(message), false) => {
            warn!(command = %request.name, %message, "命令执行失败");
            editor.write_line(message)?
        }
        (None, _) => {}
    }
    Ok(())
}
