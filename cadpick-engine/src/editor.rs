use std::collections::{HashSet, VecDeque};

use cadpick_core::document::{Document, EntityId};
use tracing::debug;

use crate::filter::SelectionFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStatus {
    Ok,
    /// 用户按 ESC 取消。
    Cancel,
    /// 选择失败或没有选中任何实体。
    Error,
}

#[derive(Debug, Clone)]
pub struct PromptSelectionOptions {
    pub message_for_adding: String,
    pub allow_duplicates: bool,
    pub single_only: bool,
}

impl PromptSelectionOptions {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message_for_adding: message.into(),
            ..Self::default()
        }
    }
}

impl Default for PromptSelectionOptions {
    fn default() -> Self {
        Self {
            message_for_adding: "Select objects: ".to_string(),
            allow_duplicates: false,
            single_only: false,
        }
    }
}

/// 一次选择得到的实体 ID，保持拾取顺序。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: Vec<EntityId>,
}

impl SelectionSet {
    #[inline]
    pub fn new(ids: Vec<EntityId>) -> Self {
        Self { ids }
    }

    #[inline]
    pub fn object_ids(&self) -> &[EntityId] {
        &self.ids
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.ids.iter().copied()
    }
}

/// 选择提示的结果。仅当 `status` 为 `Ok` 时 `value` 才有内容。
#[derive(Debug, Clone)]
pub struct PromptSelectionResult {
    pub status: PromptStatus,
    pub value: Option<SelectionSet>,
}

impl PromptSelectionResult {
    pub fn ok(selection: SelectionSet) -> Self {
        Self {
            status: PromptStatus::Ok,
            value: Some(selection),
        }
    }

    pub fn with_status(status: PromptStatus) -> Self {
        Self {
            status,
            value: None,
        }
    }
}

/// 命令与用户交互的通道：交互式选择以及命令行回显。
pub trait Editor {
    fn get_selection(
        &mut self,
        document: &Document,
        options: &PromptSelectionOptions,
        filter: &SelectionFilter,
    ) -> PromptSelectionResult;

    /// 输出一条消息，每次调用占一行。
    fn write_message(&mut self, message: &str);
}

/// 所有编辑器共用的拾取规则：
/// 丢弃无效/已删除以及被过滤器排除的实体，按选项去重或只保留第一个，
/// 结果为空时返回 `PromptStatus::Error`。
pub fn collect_selection<I>(
    document: &Document,
    candidates: I,
    options: &PromptSelectionOptions,
    filter: &SelectionFilter,
) -> PromptSelectionResult
where
    I: IntoIterator<Item = EntityId>,
{
    let mut picked = Vec::new();
    let mut seen = HashSet::new();
    for id in candidates {
        let Some(entity) = document.entity(id) else {
            debug!(id = id.get(), "忽略无效或已删除的实体");
            continue;
        };
        if !filter.matches(entity) {
            debug!(id = id.get(), kind = entity.dxf_name(), "实体被选择过滤器排除");
            continue;
        }
        if !options.allow_duplicates && !seen.insert(id) {
            continue;
        }
        picked.push(id);
        if options.single_only {
            break;
        }
    }

    if picked.is_empty() {
        PromptSelectionResult::with_status(PromptStatus::Error)
    } else {
        PromptSelectionResult::ok(SelectionSet::new(picked))
    }
}

/// 预先编排好的一次选择应答。
#[derive(Debug, Clone)]
pub enum ScriptedPick {
    Ids(Vec<EntityId>),
    All,
    Cancel,
    Fail,
    /// 原样返回 ID，不经过过滤器与有效性检查。
    Unfiltered(Vec<EntityId>),
}

/// 按脚本应答选择提示的编辑器，并记录所有提示与输出消息。
/// 脚本耗尽后的提示视为取消。
#[derive(Debug, Default)]
pub struct ScriptedEditor {
    script: VecDeque<ScriptedPick>,
    prompts: Vec<String>,
    messages: Vec<String>,
}

impl ScriptedEditor {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = ScriptedPick>,
    {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    #[inline]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }
}

impl Editor for ScriptedEditor {
    fn get_selection(
        &mut self,
        document: &Document,
        options: &PromptSelectionOptions,
        filter: &SelectionFilter,
    ) -> PromptSelectionResult {
        self.prompts.push(options.message_for_adding.clone());
        match self.script.pop_front() {
            Some(ScriptedPick::Ids(ids)) => collect_selection(document, ids, options, filter),
            Some(ScriptedPick::All) => collect_selection(
                document,
                document.entities().map(|(id, _)| *id),
                options,
                filter,
            ),
            Some(ScriptedPick::Unfiltered(ids)) if !ids.is_empty() => {
                PromptSelectionResult::ok(SelectionSet::new(ids))
            }
            Some(ScriptedPick::Unfiltered(_)) | Some(ScriptedPick::Fail) => {
                PromptSelectionResult::with_status(PromptStatus::Error)
            }
            Some(ScriptedPick::Cancel) | None => {
                PromptSelectionResult::with_status(PromptStatus::Cancel)
            }
        }
    }

    fn write_message(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}
