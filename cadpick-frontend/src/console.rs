use std::io::{self, BufRead, Write};

use cadpick_core::document::{Document, EntityId};
use cadpick_engine::editor::{
    Editor, PromptSelectionOptions, PromptSelectionResult, PromptStatus, collect_selection,
};
use cadpick_engine::filter::SelectionFilter;
use tracing::{debug, warn};

/// 命令行提示符。
pub const COMMAND_PROMPT: &str = "Command: ";

/// 基于行输入的编辑器：提示写到输出流，从输入流逐行读取回答。
///
/// 选择输入的写法：空行、`ESC` 或输入结束表示取消；`ALL` 选中全部实体；
/// 其余按空格或逗号分隔的实体 ID 解析。
pub struct ConsoleEditor<R, W> {
    input: R,
    output: W,
    /// 提示已输出但尚未换行。
    line_open: bool,
}

impl<R: BufRead, W: Write> ConsoleEditor<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            line_open: false,
        }
    }

    /// 输出命令提示符并读取一行；输入结束时返回 `None`。
    pub fn read_command(&mut self) -> io::Result<Option<String>> {
        self.prompt(COMMAND_PROMPT)?;
        self.read_answer()
    }

    /// 输出完整的一行。
    pub fn write_line(&mut self, text: &str) -> io::Result<()> {
        if self.line_open {
            writeln!(self.output)?;
            self.line_open = false;
        }
        writeln!(self.output, "{text}")?;
        self.output.flush()
    }

    /// 若提示所在行尚未结束则补一个换行。
    pub fn end_line(&mut self) -> io::Result<()> {
        if self.line_open {
            writeln!(self.output)?;
            self.line_open = false;
        }
        self.output.flush()
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn prompt(&mut self, text: &str) -> io::Result<()> {
        if self.line_open {
            writeln!(self.output)?;
        }
        write!(self.output, "{text}")?;
        self.output.flush()?;
        self.line_open = true;
        Ok(())
    }

    fn read_answer(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

impl<R: BufRead, W: Write> Editor for ConsoleEditor<R, W> {
    fn get_selection(
        &mut self,
        document: &Document,
        options: &PromptSelectionOptions,
        filter: &SelectionFilter,
    ) -> PromptSelectionResult {
        if let Err(err) = self.prompt(&options.message_for_adding) {
            warn!(error = %err, "输出选择提示失败");
            return PromptSelectionResult::with_status(PromptStatus::Error);
        }
        let answer = match self.read_answer() {
            Ok(Some(answer)) => answer,
            Ok(None) => return PromptSelectionResult::with_status(PromptStatus::Cancel),
            Err(err) => {
                warn!(error = %err, "读取选择输入失败");
                return PromptSelectionResult::with_status(PromptStatus::Error);
            }
        };

        match parse_picks(&answer) {
            PickInput::Cancel => PromptSelectionResult::with_status(PromptStatus::Cancel),
            PickInput::All => {
                let ids: Vec<EntityId> = document.entities().map(|(id, _)| *id).collect();
                collect_selection(document, ids, options, filter)
            }
            PickInput::Ids(ids) => collect_selection(document, ids, options, filter),
            PickInput::Invalid(token) => {
                debug!(token = %token, "无法识别的实体 ID");
                PromptSelectionResult::with_status(PromptStatus::Error)
            }
        }
    }

    fn write_message(&mut self, message: &str) {
        if let Err(err) = self.write_line(message) {
            warn!(error = %err, "输出消息失败");
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum PickInput {
    Cancel,
    All,
    Ids(Vec<EntityId>),
    Invalid(String),
}

fn parse_picks(answer: &str) -> PickInput {
    let answer = answer.trim();
    if answer.is_empty() || answer.eq_ignore_ascii_case("ESC") {
        return PickInput::Cancel;
    }
    if answer.eq_ignore_ascii_case("ALL") {
        return PickInput::All;
    }

    let mut ids = Vec::new();
    for token in answer
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
    {
        match token.parse::<u64>() {
            Ok(raw) => ids.push(EntityId::new(raw)),
            Err(_) => return PickInput::Invalid(token.to_string()),
        }
    }
    PickInput::Ids(ids)
}
