pub mod cli;
pub mod console;
pub mod errors;
pub mod loader;

use std::io;
use std::path::Path;

use cadpick_engine::command::CommandBus;
use console::ConsoleEditor;
use errors::FrontendError;
use tracing::info;

/// 在标准输入输出上运行控制台前端。
///
/// 给出 `command` 时只执行这一条命令，否则进入交互循环。
pub fn run_console(dxf_path: Option<&Path>, command: Option<&str>) -> Result<(), FrontendError> {
    let loaded = loader::load_document_or_demo(dxf_path);
    let bus = CommandBus::new();
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut editor = ConsoleEditor::new(stdin.lock(), stdout.lock());

    match command {
        Some(command) => {
            info!(command, "执行单条命令");
            cli::run_single_command(&loaded, &bus, &mut editor, command)
        }
        None => cli::run_session(&loaded, &bus, &mut editor).map(|_| ()),
    }
}
